// src/core/errors.rs

//! Defines the primary error type for the entire application.

use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing all possible failures within the server.
/// Store and upstream failures surface through this type instead of aborting
/// the process; callers decide whether to skip, retry, or report.
#[derive(Error, Debug)]
pub enum CachefrontError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Record encoding error: {0}")]
    Encoding(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for CachefrontError {
    fn from(e: std::io::Error) -> Self {
        CachefrontError::Io(Arc::new(e))
    }
}

impl From<reqwest::Error> for CachefrontError {
    fn from(e: reqwest::Error) -> Self {
        CachefrontError::HttpClient(e.to_string())
    }
}

impl From<redis::RedisError> for CachefrontError {
    fn from(e: redis::RedisError) -> Self {
        CachefrontError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for CachefrontError {
    fn from(e: serde_json::Error) -> Self {
        CachefrontError::Encoding(format!("JSON serialization/deserialization error: {e}"))
    }
}

impl From<regex::Error> for CachefrontError {
    fn from(e: regex::Error) -> Self {
        CachefrontError::InvalidPattern(e.to_string())
    }
}
