// src/server/mod.rs

use crate::config::Config;
use anyhow::Result;
use tracing::info;

pub mod context;
pub mod control;
pub mod html;
pub mod initialization;
pub mod proxy;
pub mod spawner;

pub use context::CacheServer;

/// The main server startup function, orchestrating all setup phases.
pub async fn run(config: Config) -> Result<()> {
    // 1. Initialize server state: store backend, worker pool, listener.
    let ctx = initialization::setup(config).await?;

    let context::ServerContext {
        state,
        listener,
        shutdown_tx,
        mut background_tasks,
    } = ctx;

    // 2. Spawn the background maintenance tasks.
    spawner::spawn_all(&state, &shutdown_tx, &mut background_tasks);

    // 3. Serve until a shutdown signal arrives.
    let app = proxy::router(state.clone());
    let serve_shutdown_tx = shutdown_tx.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received.");
            let _ = serve_shutdown_tx.send(());
        })
        .await?;

    state.store.close().await;
    background_tasks.shutdown().await;
    Ok(())
}
