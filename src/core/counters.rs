// src/core/counters.rs

//! Monotonic, thread-safe tallies for observability. All mutation goes
//! through a single coarse critical section so grouped increments stay
//! consistent with each other; none of the sections span I/O.

use crate::core::UpstreamHost;
use crate::core::admission::RejectReason;
use parking_lot::Mutex;

/// A point-in-time copy of every tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Cache hits served, reset each second by the stats logger.
    pub send_cache: u64,
    /// Cache writes completed, reset each second by the stats logger.
    pub cached_file: u64,
    pub global_hits: u64,
    pub global_requests: u64,
    pub image_hits: u64,
    pub image_requests: u64,
    // Reasons a response was not cached.
    pub filesize_error: u64,
    pub cache_exception: u64,
    pub status_error: u64,
    pub method_error: u64,
    pub cache_control_error: u64,
    pub content_type_error: u64,
}

/// The shared counter set.
#[derive(Debug, Default)]
pub struct Counters {
    inner: Mutex<CounterSnapshot>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tallies an inbound request against its upstream host.
    pub fn record_request(&self, host: UpstreamHost) {
        let mut inner = self.inner.lock();
        match host {
            UpstreamHost::Global => inner.global_requests += 1,
            UpstreamHost::Image => inner.image_requests += 1,
        }
    }

    /// Tallies a cache hit. The per-host hit counter and `send_cache` move
    /// together under the one lock.
    pub fn record_hit(&self, host: UpstreamHost) {
        let mut inner = self.inner.lock();
        match host {
            UpstreamHost::Global => inner.global_hits += 1,
            UpstreamHost::Image => inner.image_hits += 1,
        }
        inner.send_cache += 1;
    }

    /// Tallies a completed cache write.
    pub fn record_cached_file(&self) {
        self.inner.lock().cached_file += 1;
    }

    /// Tallies an admission rejection under its reason.
    pub fn record_rejection(&self, reason: RejectReason) {
        let mut inner = self.inner.lock();
        match reason {
            RejectReason::FilesizeError => inner.filesize_error += 1,
            RejectReason::CacheException => inner.cache_exception += 1,
            RejectReason::StatusError => inner.status_error += 1,
            RejectReason::MethodError => inner.method_error += 1,
            RejectReason::CacheControlError => inner.cache_control_error += 1,
            RejectReason::ContentTypeError => inner.content_type_error += 1,
        }
    }

    /// A copy of all tallies.
    pub fn snapshot(&self) -> CounterSnapshot {
        *self.inner.lock()
    }

    /// Reads and resets the per-second pair `(cached_file, send_cache)`,
    /// under the same lock the increments take.
    pub fn drain_per_second(&self) -> (u64, u64) {
        let mut inner = self.inner.lock();
        let drained = (inner.cached_file, inner.send_cache);
        inner.cached_file = 0;
        inner.send_cache = 0;
        drained
    }
}
