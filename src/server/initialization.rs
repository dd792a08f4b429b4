// src/server/initialization.rs

//! Performs one-time server setup: backend selection, upstream client
//! construction, and listener binding.

use super::context::{CacheServer, ServerContext};
use crate::config::Config;
use crate::core::admission::AdmissionPolicy;
use crate::core::counters::Counters;
use crate::core::store;
use crate::core::workerpool::{WORKER_COUNT, WorkerPool};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{info, warn};

pub async fn setup(config: Config) -> Result<ServerContext> {
    let config = Arc::new(config);

    let store = store::open_store(&config)
        .await
        .context("failed to open the cache store backend")?;

    if config.dev_boot_wipe {
        warn!("DevBootWipe is enabled; clearing all cached state at startup.");
        store.clear().await.context("boot wipe failed")?;
    }

    // The proxy must observe the on-the-wire bytes: no transparent
    // decompression, no redirect following.
    let http_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build the upstream HTTP client")?;

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!("Listening on {}", config.listen_addr);

    let state = Arc::new(CacheServer {
        admission: AdmissionPolicy::from_config(&config),
        counters: Arc::new(Counters::new()),
        pool: Arc::new(WorkerPool::new(WORKER_COUNT)),
        store,
        http_client,
        config,
    });

    let (shutdown_tx, _) = broadcast::channel(1);

    Ok(ServerContext {
        state,
        listener,
        shutdown_tx,
        background_tasks: JoinSet::new(),
    })
}
