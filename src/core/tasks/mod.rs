// src/core/tasks/mod.rs

//! Long-running background tasks that support the server's core
//! functionality: the TTL expiry sweep and the per-second counter logger.

pub mod expiry;
pub mod stats_logger;
