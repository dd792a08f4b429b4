// src/core/store/redis.rs

//! The remote hash-field backend. Shards map to hash keys named by their
//! decimal index, records to fields named by their digest, values to the
//! record's JSON encoding. No local locking is layered on top: per-field
//! atomicity is whatever the remote store provides for HSET/HDEL.

use super::{CacheStore, StoreEntry};
use crate::core::CachefrontError;
use crate::core::fingerprint::SHARD_COUNT;
use crate::core::record::CacheRecord;
use crate::core::store::file::{BODY_DIR, IMAGE_DIR, LOG_FILE};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct RedisStore {
    conn: ConnectionManager,
    root: PathBuf,
}

impl RedisStore {
    /// Opens a managed connection to the remote store. The manager
    /// reconnects on failure, so one connection serves the whole process.
    pub async fn connect(addr: &str, root: &Path) -> Result<Self, CachefrontError> {
        let client = redis::Client::open(addr)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            root: root.to_path_buf(),
        })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn init(&self) -> Result<(), CachefrontError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn close(&self) {}

    async fn clear(&self) -> Result<(), CachefrontError> {
        let mut conn = self.conn.clone();
        redis::cmd("FLUSHDB").query_async::<_, ()>(&mut conn).await?;
        // Local blob directories may be left over from a file-backend run;
        // a cleared store means both are gone.
        for dir in [BODY_DIR, IMAGE_DIR] {
            match tokio::fs::remove_dir_all(self.root.join(dir)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        match tokio::fs::remove_file(self.root.join(LOG_FILE)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn get(
        &self,
        shard: usize,
        digest: &str,
    ) -> Result<Option<CacheRecord>, CachefrontError> {
        let mut conn = self.conn.clone();
        let key = shard.to_string();
        let exists: bool = conn.hexists(&key, digest).await?;
        if !exists {
            return Ok(None);
        }
        let raw: String = conn.hget(&key, digest).await?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn get_all(&self) -> Result<Vec<StoreEntry>, CachefrontError> {
        let mut conn = self.conn.clone();
        let mut entries = Vec::new();
        for shard in 0..SHARD_COUNT {
            let fields: HashMap<String, String> =
                conn.hgetall(shard.to_string()).await?;
            for (digest, raw) in fields {
                let record: CacheRecord = serde_json::from_str(&raw)?;
                entries.push((shard, digest, record));
            }
        }
        Ok(entries)
    }

    async fn set(
        &self,
        shard: usize,
        digest: &str,
        record: CacheRecord,
    ) -> Result<(), CachefrontError> {
        let raw = serde_json::to_string(&record)?;
        let mut conn = self.conn.clone();
        let _: () = conn.hset(shard.to_string(), digest, raw).await?;
        Ok(())
    }

    async fn del(&self, shard: usize, digest: &str) -> Result<(), CachefrontError> {
        let mut conn = self.conn.clone();
        let _: () = conn.hdel(shard.to_string(), digest).await?;
        Ok(())
    }

    async fn sweep_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, CachefrontError> {
        let mut removed = Vec::new();
        for (shard, digest, record) in self.get_all().await? {
            if record.is_expired(now) {
                self.del(shard, &digest).await?;
                removed.push(record.url);
            }
        }
        Ok(removed)
    }

    async fn purge_matching(
        &self,
        pattern: &Regex,
    ) -> Result<Vec<String>, CachefrontError> {
        let mut purged = Vec::new();
        for (shard, digest, record) in self.get_all().await? {
            if pattern.is_match(&record.url) {
                self.del(shard, &digest).await?;
                purged.push(record.url);
            }
        }
        Ok(purged)
    }
}
