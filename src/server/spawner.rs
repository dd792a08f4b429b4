// src/server/spawner.rs

//! Spawns the server's long-running background tasks.

use super::context::CacheServer;
use crate::core::tasks::expiry::ExpirySweeper;
use crate::core::tasks::stats_logger::StatsLogger;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::info;

pub fn spawn_all(
    state: &Arc<CacheServer>,
    shutdown_tx: &broadcast::Sender<()>,
    background_tasks: &mut JoinSet<()>,
) {
    let sweeper = ExpirySweeper::new(
        state.store.clone(),
        Duration::from_secs(state.config.cleanup_frequency),
    );
    let shutdown_rx_sweep = shutdown_tx.subscribe();
    background_tasks.spawn(async move {
        sweeper.run(shutdown_rx_sweep).await;
    });

    let stats = StatsLogger::new(state.counters.clone());
    let shutdown_rx_stats = shutdown_tx.subscribe();
    background_tasks.spawn(async move {
        stats.run(shutdown_rx_stats).await;
    });

    info!("All background tasks have been spawned.");
}
