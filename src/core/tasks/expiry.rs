// src/core/tasks/expiry.rs

//! A background task that periodically removes expired records from the
//! store. It coexists with live reads and writes: the store's own locking
//! keeps each shard consistent, and a failing sweep is logged and retried
//! on the next tick rather than taking the server down.

use crate::core::store::CacheStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

pub struct ExpirySweeper {
    store: Arc<dyn CacheStore>,
    frequency: Duration,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn CacheStore>, frequency: Duration) -> Self {
        Self { store, frequency }
    }

    /// The main run loop for the sweeper.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Expiry sweep task started.");
        let mut interval = tokio::time::interval(self.frequency);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep().await;
                }
                _ = shutdown_rx.recv() => {
                    info!("Expiry sweep task shutting down.");
                    return;
                }
            }
        }
    }

    async fn sweep(&self) {
        match self.store.sweep_expired(Utc::now()).await {
            Ok(removed) => {
                for url in &removed {
                    info!("Expired) cache removed : {url}");
                }
                info!("Cleanup expired items ({} removed)", removed.len());
            }
            Err(e) => warn!("expiry sweep failed: {e}"),
        }
    }
}
