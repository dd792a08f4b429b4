// src/core/admission.rs

//! The response-admission policy: decides whether an upstream response may
//! be cached, and derives its expiration from Cache-Control.

use crate::config::Config;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};

/// Cache-Control directives that forbid storing a response. Matched as
/// literal substrings of the header value, exactly as the origin sent it.
const CACHE_CONTROL_DENYLIST: [&str; 4] =
    ["no-store", "no-cache", "proxy-revalidate", "private"];

/// Content-Type prefixes that are allowed into the cache.
const CONTENT_TYPE_ALLOWLIST: [&str; 2] = ["text/", "image/"];

static MAX_AGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"max-age=(\d+)").unwrap());

/// Why a response was not admitted into the cache. Each variant maps onto
/// one of the "reason not cached" counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    CacheException,
    StatusError,
    MethodError,
    CacheControlError,
    ContentTypeError,
    FilesizeError,
}

/// The compiled admission policy. Exception patterns are compiled once at
/// configuration load, never per response.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    exceptions: RegexSet,
    max_file_size: i64,
}

impl AdmissionPolicy {
    pub fn new(exceptions: RegexSet, max_file_size: i64) -> Self {
        Self {
            exceptions,
            max_file_size,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.exception_matcher.clone(), config.max_file_size)
    }

    /// Header-level admission checks, in policy order. Runs before the body
    /// is read; the size check happens separately once the decompressed
    /// length is known.
    pub fn check_headers(
        &self,
        fingerprint: &str,
        status: u16,
        method: &str,
        cache_control: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<(), RejectReason> {
        if self.exceptions.is_match(fingerprint) {
            return Err(RejectReason::CacheException);
        }
        if status != 200 {
            return Err(RejectReason::StatusError);
        }
        if !matches!(method, "GET" | "HEAD") {
            return Err(RejectReason::MethodError);
        }
        if !cache_control_allows_store(cache_control.unwrap_or("")) {
            return Err(RejectReason::CacheControlError);
        }
        if !content_type_allows_store(content_type.unwrap_or("")) {
            return Err(RejectReason::ContentTypeError);
        }
        Ok(())
    }

    /// Enforces the decompressed-body size cap.
    pub fn check_size(&self, body_len: usize) -> Result<(), RejectReason> {
        if body_len as i64 > self.max_file_size {
            return Err(RejectReason::FilesizeError);
        }
        Ok(())
    }
}

/// True when none of the denylisted directives appear anywhere in the
/// Cache-Control value.
pub fn cache_control_allows_store(cache_control: &str) -> bool {
    !CACHE_CONTROL_DENYLIST
        .iter()
        .any(|directive| cache_control.contains(directive))
}

/// True when the Content-Type begins with an allowlisted prefix.
pub fn content_type_allows_store(content_type: &str) -> bool {
    CONTENT_TYPE_ALLOWLIST
        .iter()
        .any(|prefix| content_type.starts_with(prefix))
}

/// Expiration derived from Cache-Control: `now + max-age` when the header
/// carries one, otherwise the zero value (immediately stale, reaped by the
/// next sweep).
pub fn expiration_from_cache_control(
    cache_control: Option<&str>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let value = cache_control?;
    let captures = MAX_AGE_RE.captures(value)?;
    let seconds: i64 = captures[1].parse().ok()?;
    now.checked_add_signed(Duration::seconds(seconds))
}
