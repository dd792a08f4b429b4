// src/server/context.rs

use crate::config::Config;
use crate::core::admission::AdmissionPolicy;
use crate::core::counters::Counters;
use crate::core::store::CacheStore;
use crate::core::workerpool::WorkerPool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

/// The explicit server context threaded through request handling. Replaces
/// process-wide singletons, so startup ordering stays trivial and tests can
/// build one per case.
pub struct CacheServer {
    pub config: Arc<Config>,
    pub store: Arc<dyn CacheStore>,
    pub counters: Arc<Counters>,
    pub pool: Arc<WorkerPool>,
    pub admission: AdmissionPolicy,
    pub http_client: reqwest::Client,
}

/// Holds all the initialized state required to run the server's main loop.
pub struct ServerContext {
    pub state: Arc<CacheServer>,
    pub listener: TcpListener,
    pub shutdown_tx: broadcast::Sender<()>,
    pub background_tasks: JoinSet<()>,
}
