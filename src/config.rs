// src/config.rs

//! Manages server configuration: loading, resolving defaults, and
//! compiling the cache-exception matcher.

use anyhow::{Context, Result, bail};
use regex::RegexSet;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Selects which backend holds the cache index.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    #[default]
    File,
    Redis,
}

/// A raw representation of the config file before validation and resolution.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawConfig {
    #[serde(default = "default_max_file_size")]
    max_file_size: i64,
    #[serde(default)]
    gzip_enabled: bool,
    #[serde(default)]
    cache_exceptions: Vec<String>,
    #[serde(default)]
    query_ignore_enabled: bool,
    #[serde(default)]
    query_sorting_enabled: bool,
    #[serde(default)]
    response_time_logging_enabled: bool,
    #[serde(default = "default_cleanup_frequency")]
    cleanup_frequency: u64,
    #[serde(default)]
    store_type: StoreType,
    #[serde(default = "default_listen_addr")]
    listen_addr: String,
    #[serde(default = "default_store_root")]
    store_root: PathBuf,
    #[serde(default = "default_redis_addr")]
    redis_addr: String,
    #[serde(default = "default_global_origin")]
    global_origin: String,
    #[serde(default = "default_image_origin")]
    image_origin: String,
    #[serde(default)]
    dev_boot_wipe: bool,
    #[serde(default = "default_log_level")]
    log_level: String,
}

fn default_max_file_size() -> i64 {
    10 * 1024 * 1024 // 10 MB
}
fn default_cleanup_frequency() -> u64 {
    60
}
fn default_listen_addr() -> String {
    "0.0.0.0:80".to_string()
}
fn default_store_root() -> PathBuf {
    PathBuf::from("./wcs")
}
fn default_redis_addr() -> String {
    "redis://192.168.0.89:6379".to_string()
}
fn default_global_origin() -> String {
    "http://global.gmarket.co.kr".to_string()
}
fn default_image_origin() -> String {
    "http://image.gmarket.co.kr".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

/// The resolved, immutable server configuration. Loaded once at startup;
/// nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where the file was loaded from; the status page displays it verbatim.
    pub path: PathBuf,
    /// Responses whose decompressed body exceeds this many bytes are not cached.
    pub max_file_size: i64,
    /// Gzip hit responses at serve time for clients that accept it.
    pub gzip_enabled: bool,
    /// Source patterns of the exception matcher, kept for display.
    pub cache_exceptions: Vec<String>,
    /// Requests whose fingerprint matches are never cached. Compiled once here.
    pub exception_matcher: RegexSet,
    pub query_ignore_enabled: bool,
    pub query_sorting_enabled: bool,
    pub response_time_logging_enabled: bool,
    /// Seconds between expiry sweeps.
    pub cleanup_frequency: u64,
    pub store_type: StoreType,
    pub listen_addr: String,
    /// Root of the on-disk layout (blob directories and the log file).
    pub store_root: PathBuf,
    pub redis_addr: String,
    /// Upstream base URL for the global content origin.
    pub global_origin: String,
    /// Upstream base URL for the image origin.
    pub image_origin: String,
    /// Wipes blob directories, the log file, and (redis) the remote
    /// database at startup. Development only.
    pub dev_boot_wipe: bool,
    pub log_level: String,
}

impl Config {
    /// Loads and validates the JSON configuration file.
    pub fn from_file(path: &str) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file \"{path}\""))?;
        let raw: RawConfig =
            serde_json::from_str(&data).context("config file is not valid JSON")?;
        Self::resolve(raw, PathBuf::from(path))
    }

    fn resolve(raw: RawConfig, path: PathBuf) -> Result<Self> {
        if raw.max_file_size < 0 {
            bail!("MaxFileSize must not be negative");
        }
        if raw.cleanup_frequency == 0 {
            bail!("CleanupFrequency must be at least 1 second");
        }
        let exception_matcher = RegexSet::new(&raw.cache_exceptions)
            .context("invalid pattern in CacheExceptions")?;

        Ok(Self {
            path,
            max_file_size: raw.max_file_size,
            gzip_enabled: raw.gzip_enabled,
            cache_exceptions: raw.cache_exceptions,
            exception_matcher,
            query_ignore_enabled: raw.query_ignore_enabled,
            query_sorting_enabled: raw.query_sorting_enabled,
            response_time_logging_enabled: raw.response_time_logging_enabled,
            cleanup_frequency: raw.cleanup_frequency,
            store_type: raw.store_type,
            listen_addr: raw.listen_addr,
            store_root: raw.store_root,
            redis_addr: raw.redis_addr,
            global_origin: raw.global_origin,
            image_origin: raw.image_origin,
            dev_boot_wipe: raw.dev_boot_wipe,
            log_level: raw.log_level,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("config.json"),
            max_file_size: default_max_file_size(),
            gzip_enabled: false,
            cache_exceptions: Vec::new(),
            exception_matcher: RegexSet::empty(),
            query_ignore_enabled: false,
            query_sorting_enabled: false,
            response_time_logging_enabled: false,
            cleanup_frequency: default_cleanup_frequency(),
            store_type: StoreType::File,
            listen_addr: default_listen_addr(),
            store_root: default_store_root(),
            redis_addr: default_redis_addr(),
            global_origin: default_global_origin(),
            image_origin: default_image_origin(),
            dev_boot_wipe: false,
            log_level: default_log_level(),
        }
    }
}
