// src/core/fingerprint.rs

//! Canonicalizes a request into a stable fingerprint and derives the record
//! digest and shard index from it. The shard formula is deliberately
//! trivial; it must stay byte-compatible with the historical on-disk and
//! redis layouts, so do not "improve" it.

use crate::config::Config;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use url::form_urlencoded;

/// Number of partitions of the key space.
pub const SHARD_COUNT: usize = 255;

/// The canonical identity of a cacheable request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// The canonical string `method || host || path || querySuffix`.
    pub canonical: String,
    /// Lowercase sha-256 hex of the canonical string; the record key.
    pub digest: String,
    /// Shard index in `[0, SHARD_COUNT)`.
    pub shard: usize,
}

impl Fingerprint {
    /// Builds the fingerprint for a request. `host` is the effective host:
    /// the URL host when the request line carried one, else the Host header.
    pub fn from_request(
        method: &str,
        host: &str,
        path: &str,
        raw_query: Option<&str>,
        config: &Config,
    ) -> Self {
        let suffix = canonical_query(raw_query.unwrap_or(""), config);
        Self::from_canonical(format!("{method}{host}{path}{suffix}"))
    }

    /// Derives digest and shard from an already-canonical string.
    pub fn from_canonical(canonical: String) -> Self {
        let hash = Sha256::digest(canonical.as_bytes());
        let shard = shard_of(&hash);
        Self {
            canonical,
            digest: hex::encode(hash),
            shard,
        }
    }
}

/// Shard index of a digest: the byte sum of the raw 32 digest bytes modulo
/// [`SHARD_COUNT`].
pub fn shard_of(digest: &[u8]) -> usize {
    digest.iter().map(|b| *b as usize).sum::<usize>() % SHARD_COUNT
}

/// Canonicalizes the query string according to the configured mode.
///
/// Ignore mode (or a query with no parseable pairs) yields no suffix at all.
/// Sorting mode re-encodes with keys ascending, values in request order, and
/// empty values dropped. The fallback mode keeps raw `k=v` pairs with a
/// non-empty value, in request order, without re-encoding.
fn canonical_query(raw: &str, config: &Config) -> String {
    let mut pairs = form_urlencoded::parse(raw.as_bytes()).peekable();
    if config.query_ignore_enabled || pairs.peek().is_none() {
        return String::new();
    }

    if config.query_sorting_enabled {
        let mut sorted: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in pairs {
            if !value.is_empty() {
                sorted
                    .entry(key.into_owned())
                    .or_default()
                    .push(value.into_owned());
            }
        }
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, values) in &sorted {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        return format!("?{}", serializer.finish());
    }

    let kept: Vec<&str> = raw
        .split('&')
        .filter(|piece| piece.split_once('=').is_some_and(|(_, value)| !value.is_empty()))
        .collect();
    format!("?{}", kept.join("&"))
}
