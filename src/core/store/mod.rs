// src/core/store/mod.rs

//! The polymorphic cache store: a sharded key→record map with concurrent
//! reads, exclusive writes, and full-scan iteration. Two interchangeable
//! backends exist; the request path, maintenance, and control plane depend
//! only on the trait, and backend selection happens once from config.

pub mod file;
pub mod redis;

pub use file::FileStore;
pub use redis::RedisStore;

use crate::config::{Config, StoreType};
use crate::core::CachefrontError;
use crate::core::record::CacheRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::Arc;

/// One full-scan entry: shard index, record digest, record metadata.
pub type StoreEntry = (usize, String, CacheRecord);

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Prepares the backend for use (directories, connections).
    async fn init(&self) -> Result<(), CachefrontError>;

    /// Releases backend resources.
    async fn close(&self);

    /// Removes every record and blob plus the on-disk log file, and flushes
    /// the remote database on the redis backend. Development and test use.
    async fn clear(&self) -> Result<(), CachefrontError>;

    /// Looks up a record by shard and digest. File-backed bodies are read
    /// from disk before the shard lock is released.
    async fn get(
        &self,
        shard: usize,
        digest: &str,
    ) -> Result<Option<CacheRecord>, CachefrontError>;

    /// Iterates every record, shard by shard. Not a global snapshot:
    /// writers may interleave between shards.
    async fn get_all(&self) -> Result<Vec<StoreEntry>, CachefrontError>;

    /// Inserts or replaces a record.
    async fn set(
        &self,
        shard: usize,
        digest: &str,
        record: CacheRecord,
    ) -> Result<(), CachefrontError>;

    /// Removes a record and its blob, if present.
    async fn del(&self, shard: usize, digest: &str) -> Result<(), CachefrontError>;

    /// Removes every record expired at `now`, returning the URLs that were
    /// dropped. On the file backend each shard stays exclusively locked for
    /// the whole of its own iteration.
    async fn sweep_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, CachefrontError>;

    /// Removes every record whose URL matches `pattern`, returning the
    /// purged URLs. Same locking discipline as the expiry sweep.
    async fn purge_matching(
        &self,
        pattern: &Regex,
    ) -> Result<Vec<String>, CachefrontError>;
}

/// Builds and initializes the backend selected by the configuration.
pub async fn open_store(config: &Config) -> Result<Arc<dyn CacheStore>, CachefrontError> {
    let store: Arc<dyn CacheStore> = match config.store_type {
        StoreType::File => Arc::new(FileStore::new(&config.store_root)),
        StoreType::Redis => {
            Arc::new(RedisStore::connect(&config.redis_addr, &config.store_root).await?)
        }
    };
    store.init().await?;
    Ok(store)
}
