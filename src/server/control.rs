// src/server/control.rs

//! The operational control plane: status pages and selective purge, served
//! on the control virtual host.

use super::context::CacheServer;
use super::html;
use super::proxy::status_response;
use crate::core::IMAGE_HOST;
use crate::core::counters::CounterSnapshot;
use axum::body::Body;
use axum::http::{HeaderValue, Method, Request, Response, StatusCode, header};
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use url::form_urlencoded;

pub async fn dispatch(state: &Arc<CacheServer>, req: Request<Body>) -> Response<Body> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/statuspage") => status_page(state, false).await,
        (&Method::GET, "/statuspage-with-image") => status_page(state, true).await,
        (&Method::DELETE, "/purge") => purge(state, req.uri().query().unwrap_or("")).await,
        _ => status_response(StatusCode::NOT_FOUND),
    }
}

async fn status_page(state: &Arc<CacheServer>, with_images: bool) -> Response<Body> {
    let snapshot = state.counters.snapshot();

    let hits = vec![
        html::HitRow::new("Global", snapshot.global_hits, snapshot.global_requests),
        html::HitRow::new("Image", snapshot.image_hits, snapshot.image_requests),
        html::HitRow::new(
            "Total",
            snapshot.global_hits + snapshot.image_hits,
            snapshot.global_requests + snapshot.image_requests,
        ),
    ];

    let (global_urls, image_urls) = match state.store.get_all().await {
        Ok(entries) => {
            let mut global = Vec::new();
            let mut image = Vec::new();
            for (_, _, record) in entries {
                if record.host == IMAGE_HOST {
                    image.push(record.url);
                } else {
                    global.push(record.url);
                }
            }
            global.sort();
            image.sort();
            (global, image)
        }
        Err(e) => {
            warn!("status listing failed: {e}");
            (Vec::new(), Vec::new())
        }
    };

    let page = html::StatusPage {
        hits,
        config: config_rows(&state.config.path),
        reasons: reason_rows(&snapshot),
        global_urls,
        image_urls,
        with_images,
    };

    let mut response = Response::new(Body::from(html::render_status_page(&page)));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

/// The config section displays the file exactly as it sits on disk.
fn config_rows(path: &Path) -> Vec<(String, String)> {
    let Ok(raw) = std::fs::read_to_string(path) else {
        warn!("could not read config file {} for display", path.display());
        return Vec::new();
    };
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

fn reason_rows(snapshot: &CounterSnapshot) -> Vec<(String, u64)> {
    vec![
        ("File size over".to_string(), snapshot.filesize_error),
        ("Cache exception".to_string(), snapshot.cache_exception),
        ("Status code".to_string(), snapshot.status_error),
        ("Method".to_string(), snapshot.method_error),
        ("Cache-Control".to_string(), snapshot.cache_control_error),
        ("Content-Type".to_string(), snapshot.content_type_error),
    ]
}

async fn purge(state: &Arc<CacheServer>, query: &str) -> Response<Body> {
    let pattern = form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "pattern")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();

    let regex = match Regex::new(&pattern) {
        Ok(regex) => regex,
        Err(e) => {
            warn!("invalid purge pattern {pattern:?}: {e}");
            return status_response(StatusCode::BAD_REQUEST);
        }
    };

    match state.store.purge_matching(&regex).await {
        Ok(purged) => {
            for url in &purged {
                info!("Purge) cache removed : {url}");
            }
            Response::new(Body::from(format!(
                "Purge Success! ({} items)\n",
                purged.len()
            )))
        }
        Err(e) => {
            warn!("purge failed: {e}");
            status_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
