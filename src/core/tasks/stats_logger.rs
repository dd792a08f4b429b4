// src/core/tasks/stats_logger.rs

//! Logs and resets the per-second cache traffic counters.

use crate::core::counters::Counters;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

pub struct StatsLogger {
    counters: Arc<Counters>,
}

impl StatsLogger {
    pub fn new(counters: Arc<Counters>) -> Self {
        Self { counters }
    }

    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let (cached_file, send_cache) = self.counters.drain_per_second();
                    info!("Cached File Number = {cached_file}, Send cache file number = {send_cache}");
                }
                _ = shutdown_rx.recv() => return,
            }
        }
    }
}
