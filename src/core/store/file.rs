// src/core/store/file.rs

//! The in-memory index + on-disk blob backend. The index is a fixed array
//! of 255 shards, each owning a reader-writer lock and a digest→record map;
//! bodies live as blobs in per-host directories keyed by digest. The locks
//! are async because they are held across blob I/O: a reader keeps its
//! shard read-locked while the blob is read, so a concurrent delete cannot
//! unlink the file mid-read.

use super::{CacheStore, StoreEntry};
use crate::core::fingerprint::SHARD_COUNT;
use crate::core::record::CacheRecord;
use crate::core::{CachefrontError, IMAGE_HOST};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::warn;

/// Blob directory for non-image bodies.
pub const BODY_DIR: &str = "log_body";
/// Blob directory for image bodies.
pub const IMAGE_DIR: &str = "log_image";
/// Append-only log file name under the store root; removed by `clear`.
pub const LOG_FILE: &str = "log_file.txt";

type Shard = RwLock<HashMap<String, CacheRecord>>;

pub struct FileStore {
    shards: Vec<Shard>,
    root: PathBuf,
}

impl FileStore {
    /// Creates an empty store rooted at `root`. The index always starts
    /// empty; whatever blobs a previous run left behind are not re-indexed.
    pub fn new(root: &Path) -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self {
            shards,
            root: root.to_path_buf(),
        }
    }

    /// Blob location for a record: image and plain bodies live in separate
    /// directories under the store root.
    fn blob_path(&self, host: &str, digest: &str) -> PathBuf {
        let dir = if host == IMAGE_HOST { IMAGE_DIR } else { BODY_DIR };
        self.root.join(dir).join(digest)
    }

    /// Unlinks a record's blob. A missing file is tolerated; the entry may
    /// never have been flushed or a previous wipe already removed it.
    async fn remove_blob(record: &CacheRecord) {
        if let Some(path) = &record.blob_path
            && let Err(e) = tokio::fs::remove_file(path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("failed to remove blob {}: {e}", path.display());
        }
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn init(&self) -> Result<(), CachefrontError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn close(&self) {}

    async fn clear(&self) -> Result<(), CachefrontError> {
        for shard in &self.shards {
            shard.write().await.clear();
        }
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
        let guard = self.shards[shard].read().await;
        let Some(record) = guard.get(digest) else {
            return Ok(None);
        };
        let mut record = record.clone();
        // The read lock stays held while the blob is read; a concurrent Del
        // cannot unlink the file underneath us.
        if let Some(path) = &record.blob_path {
            record.body = Bytes::from(tokio::fs::read(path).await?);
        }
        Ok(Some(record))
    }

    async fn get_all(&self) -> Result<Vec<StoreEntry>, CachefrontError> {
        let mut entries = Vec::new();
        for (shard_index, shard) in self.shards.iter().enumerate() {
            let guard = shard.read().await;
            for (digest, record) in guard.iter() {
                entries.push((shard_index, digest.clone(), record.clone()));
            }
        }
        Ok(entries)
    }

    async fn set(
        &self,
        shard: usize,
        digest: &str,
        mut record: CacheRecord,
    ) -> Result<(), CachefrontError> {
        let path = self.blob_path(&record.host, digest);
        let mut guard = self.shards[shard].write().await;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        write_blob(&path, &record.body).await?;
        // The index holds metadata only; the blob file is authoritative for
        // the body. Inserting after the write completes means a concurrent
        // reader sees either the old record or a fully written new one.
        record.blob_path = Some(path);
        record.body = Bytes::new();
        guard.insert(digest.to_string(), record);
        Ok(())
    }

    async fn del(&self, shard: usize, digest: &str) -> Result<(), CachefrontError> {
        let mut guard = self.shards[shard].write().await;
        if let Some(record) = guard.get(digest) {
            Self::remove_blob(record).await;
            guard.remove(digest);
        }
        Ok(())
    }

    async fn sweep_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, CachefrontError> {
        let mut removed = Vec::new();
        for shard in &self.shards {
            let mut guard = shard.write().await;
            let expired: Vec<String> = guard
                .iter()
                .filter(|(_, record)| record.is_expired(now))
                .map(|(digest, _)| digest.clone())
                .collect();
            for digest in expired {
                if let Some(record) = guard.remove(&digest) {
                    Self::remove_blob(&record).await;
                    removed.push(record.url);
                }
            }
        }
        Ok(removed)
    }

    async fn purge_matching(
        &self,
        pattern: &Regex,
    ) -> Result<Vec<String>, CachefrontError> {
        let mut purged = Vec::new();
        for shard in &self.shards {
            let mut guard = shard.write().await;
            let matching: Vec<String> = guard
                .iter()
                .filter(|(_, record)| pattern.is_match(&record.url))
                .map(|(digest, _)| digest.clone())
                .collect();
            for digest in matching {
                if let Some(record) = guard.remove(&digest) {
                    Self::remove_blob(&record).await;
                    purged.push(record.url);
                }
            }
        }
        Ok(purged)
    }
}

/// Writes a blob with the historical 0644 mode.
async fn write_blob(path: &Path, body: &[u8]) -> Result<(), CachefrontError> {
    #[cfg(unix)]
    let mut file = {
        use std::os::unix::fs::OpenOptionsExt;
        tokio::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .mode(0o644)
            .open(path)
            .await?
    };
    #[cfg(not(unix))]
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)
        .await?;
    file.write_all(body).await?;
    Ok(())
}
