// src/core/record.rs

//! Defines the stored cache unit.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// A single cached response. Records are created by the write path, written
/// whole, and replaced whole on re-cache; nothing mutates one in place.
///
/// The JSON form of this struct is the remote backend's wire format, body
/// bytes included.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheRecord {
    /// Response headers as received from the origin, stored verbatim.
    pub headers: HashMap<String, Vec<String>>,
    /// Uncompressed response body. Empty in file-backend index entries,
    /// where the blob at `blob_path` is authoritative.
    pub body: Bytes,
    /// The original absolute request URL, used for purge matching and the
    /// status listing.
    pub url: String,
    /// Upstream host the record was fetched from.
    pub host: String,
    /// Filesystem path of the body blob (file backend only).
    #[serde(default)]
    pub blob_path: Option<PathBuf>,
    /// Wall-clock instant the record was produced.
    pub cached_at: DateTime<Utc>,
    /// Instant after which the record is stale. `None` is the zero value:
    /// immediately stale.
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheRecord {
    /// Whether the record is past its expiration at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at < now,
            None => true,
        }
    }

    /// Whole seconds since the record was cached, saturated at zero so a
    /// wall-clock jump can never produce a negative Age header.
    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.cached_at)
            .num_seconds()
            .max(0)
    }

    /// First value of a stored response header, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}
