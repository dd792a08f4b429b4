// src/server/proxy.rs

//! The hot request path: virtual-host routing, cache lookup, hit serving,
//! and miss forwarding with response capture.
//!
//! Capture must hand control back quickly so the response streams to the
//! client without waiting on the cache; the actual store write is deferred
//! through the worker pool, whose bounded submission is the back-pressure
//! on a burst of origin responses.

use super::context::CacheServer;
use super::control;
use crate::core::admission::RejectReason;
use crate::core::fingerprint::Fingerprint;
use crate::core::record::CacheRecord;
use crate::core::{CONTROL_HOST, UpstreamHost, encoding};
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode, header};
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Headers that must not travel across the proxy boundary in either
/// direction.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Builds the single-router application: every request funnels through the
/// virtual-host dispatch in `handle`.
pub fn router(state: Arc<CacheServer>) -> Router {
    Router::new().fallback(handle).with_state(state)
}

async fn handle(
    State(state): State<Arc<CacheServer>>,
    req: Request<Body>,
) -> Response<Body> {
    let Some(host) = effective_host(&req) else {
        return status_response(StatusCode::NOT_FOUND);
    };

    if host == CONTROL_HOST {
        return control::dispatch(&state, req).await;
    }

    let Some(upstream) = UpstreamHost::from_host_header(&host) else {
        return status_response(StatusCode::NOT_FOUND);
    };

    let started = Instant::now();
    state.counters.record_request(upstream);

    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let raw_query = req.uri().query().map(str::to_string);
    let fingerprint =
        Fingerprint::from_request(&method, &host, &path, raw_query.as_deref(), &state.config);

    let cached = match state.store.get(fingerprint.shard, &fingerprint.digest).await {
        Ok(found) => found,
        Err(e) => {
            // A failing shard serves as a miss rather than an outage.
            warn!("store lookup failed for {}: {e}", fingerprint.digest);
            None
        }
    };

    let (response, cache_tag) = match cached {
        Some(record) => (
            serve_hit(&state, upstream, record, req.headers()),
            " (Cached)",
        ),
        None => (
            forward_miss(&state, upstream, &fingerprint, req).await,
            " (Not cached)",
        ),
    };

    if state.config.response_time_logging_enabled {
        info!(
            "Elapsed : http://{host}{path}{cache_tag}, {:?}",
            started.elapsed()
        );
    }

    response
}

/// Serves a response straight from a cache record: stored Cache-Control and
/// Etag are replayed, Age reflects time since capture, and the marker
/// header tags the response as a hit. Bodies are gzipped at serve time for
/// accepting clients, never for the image host.
pub fn serve_hit(
    state: &CacheServer,
    upstream: UpstreamHost,
    record: CacheRecord,
    request_headers: &HeaderMap,
) -> Response<Body> {
    let mut headers = HeaderMap::new();
    for (name, stored) in [
        (header::CACHE_CONTROL, "Cache-Control"),
        (header::ETAG, "Etag"),
    ] {
        if let Some(value) = record.header(stored)
            && let Ok(value) = HeaderValue::from_str(value)
        {
            headers.insert(name, value);
        }
    }
    headers.insert(header::AGE, HeaderValue::from(record.age_seconds(Utc::now())));
    headers.insert(HeaderName::from_static("jnlee"), HeaderValue::from_static("HIT"));

    let mut body = record.body;
    if state.config.gzip_enabled
        && upstream != UpstreamHost::Image
        && accepts_gzip(request_headers)
    {
        match encoding::gzip_compress(&body) {
            Ok(compressed) => {
                body = compressed;
                headers.insert(
                    header::CONTENT_ENCODING,
                    HeaderValue::from_static("gzip"),
                );
            }
            Err(e) => warn!("failed to gzip cached body: {e}"),
        }
    }

    state.counters.record_hit(upstream);

    let mut response = Response::new(Body::from(body));
    *response.headers_mut() = headers;
    response
}

/// Forwards a miss to the upstream origin and captures the response for
/// possible caching before relaying the original bytes to the client.
async fn forward_miss(
    state: &Arc<CacheServer>,
    upstream: UpstreamHost,
    fingerprint: &Fingerprint,
    req: Request<Body>,
) -> Response<Body> {
    let origin_base = match upstream {
        UpstreamHost::Global => &state.config.global_origin,
        UpstreamHost::Image => &state.config.image_origin,
    };
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let target = format!("{origin_base}{path_and_query}");

    let (parts, request_body) = req.into_parts();
    let request_body = axum::body::to_bytes(request_body, usize::MAX)
        .await
        .unwrap_or_default();

    let mut forward_headers = parts.headers;
    strip_hop_by_hop(&mut forward_headers);
    // reqwest derives Host from the target URL.
    forward_headers.remove(header::HOST);

    let upstream_response = match state
        .http_client
        .request(parts.method.clone(), target.clone())
        .headers(forward_headers)
        .body(request_body)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!("upstream request to {target} failed: {e}");
            return status_response(StatusCode::BAD_GATEWAY);
        }
    };

    let status = upstream_response.status();
    let mut response_headers = upstream_response.headers().clone();
    let response_body = match upstream_response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("failed to read upstream body from {target}: {e}");
            return status_response(StatusCode::BAD_GATEWAY);
        }
    };

    capture_response(
        state,
        upstream,
        fingerprint,
        status.as_u16(),
        parts.method.as_str(),
        &response_headers,
        &response_body,
        &target,
    )
    .await;

    strip_hop_by_hop(&mut response_headers);
    let mut response = Response::new(Body::from(response_body));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    response
}

/// The response-capture step run on every forwarded response: admission,
/// decompression for storage, and the deferred store write. The client
/// always receives the original wire bytes regardless of the outcome here.
#[allow(clippy::too_many_arguments)]
pub async fn capture_response(
    state: &Arc<CacheServer>,
    upstream: UpstreamHost,
    fingerprint: &Fingerprint,
    status: u16,
    method: &str,
    headers: &HeaderMap,
    body: &Bytes,
    url: &str,
) {
    let cache_control = header_str(headers, header::CACHE_CONTROL);
    let content_type = header_str(headers, header::CONTENT_TYPE);

    if let Err(reason) = state.admission.check_headers(
        &fingerprint.canonical,
        status,
        method,
        cache_control,
        content_type,
    ) {
        state.counters.record_rejection(reason);
        match reason {
            RejectReason::CacheException => info!("Cache Exception : {}", fingerprint.canonical),
            RejectReason::StatusError => {
                info!("CheckHeader : status not ok ({status}) : {url}")
            }
            RejectReason::MethodError => info!("Method not cacheable ({method}) : {url}"),
            RejectReason::CacheControlError => info!(
                "CheckHeader : Cache-Control not allowed ({}) : {url}",
                cache_control.unwrap_or_default()
            ),
            RejectReason::ContentTypeError => info!(
                "CheckHeader : Content-Type not allowed ({}) : {url}",
                content_type.unwrap_or_default()
            ),
            RejectReason::FilesizeError => {}
        }
        return;
    }

    // Bodies are stored decompressed regardless of the wire encoding.
    let mut stored_body = body.clone();
    if upstream == UpstreamHost::Global
        && header_str(headers, header::CONTENT_ENCODING) == Some("gzip")
    {
        match encoding::gzip_decompress(body) {
            Ok(inflated) => stored_body = inflated,
            Err(e) => {
                warn!("failed to decompress origin body for {url}: {e}; not caching");
                return;
            }
        }
    }

    if let Err(reason) = state.admission.check_size(stored_body.len()) {
        state.counters.record_rejection(reason);
        info!(
            "File size over. Do not cache : {url} ({} bytes)",
            stored_body.len()
        );
        return;
    }

    let now = Utc::now();
    let record = CacheRecord {
        headers: header_multimap(headers),
        body: stored_body,
        url: url.to_string(),
        host: upstream.name().to_string(),
        blob_path: None,
        cached_at: now,
        expires_at: crate::core::admission::expiration_from_cache_control(cache_control, now),
    };

    let store = state.store.clone();
    let counters = state.counters.clone();
    let shard = fingerprint.shard;
    let digest = fingerprint.digest.clone();
    state
        .pool
        .submit(async move {
            match store.set(shard, &digest, record).await {
                Ok(()) => counters.record_cached_file(),
                Err(e) => warn!("cache write for {digest} failed: {e}"),
            }
        })
        .await;
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Whether the client advertised gzip support.
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("gzip"))
}

/// Snapshot of a header map as the verbatim multi-map the record stores.
pub fn header_multimap(headers: &HeaderMap) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            map.entry(name.as_str().to_string())
                .or_default()
                .push(value.to_string());
        }
    }
    map
}

pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

pub fn status_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

/// The effective host: the URL host when the request line carried an
/// absolute form, else the Host header.
fn effective_host(req: &Request<Body>) -> Option<String> {
    if let Some(host) = req.uri().host() {
        return Some(host.to_string());
    }
    req.headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
