// src/core/workerpool.rs

//! A fixed pool of workers fed by a rendezvous-style channel. Submission
//! waits until a worker can take the task, which back-pressures the response
//! pipeline when cache writes pile up faster than they drain.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

/// Number of long-lived cache-write workers.
pub const WORKER_COUNT: usize = 255;

type Task = BoxFuture<'static, ()>;

/// Bounded-concurrency executor for deferred cache writes.
pub struct WorkerPool {
    tx: mpsc::Sender<Task>,
}

impl WorkerPool {
    /// Spawns `workers` tasks draining a single-slot channel. Dropping the
    /// pool closes the channel; workers finish their current task and exit.
    pub fn new(workers: usize) -> Self {
        let (tx, rx) = mpsc::channel::<Task>(1);
        let rx = Arc::new(Mutex::new(rx));
        for worker_id in 0..workers {
            let rx = rx.clone();
            tokio::spawn(async move {
                loop {
                    // The receiver lock is released before the task runs,
                    // so idle workers can pick up the next submission.
                    let task = rx.lock().await.recv().await;
                    match task {
                        Some(task) => task.await,
                        None => break,
                    }
                }
                debug!("cache write worker {worker_id} exiting");
            });
        }
        Self { tx }
    }

    /// Hands a task to the pool, waiting until a worker accepts it. Tasks
    /// handle their own failures; the pool reports nothing back.
    pub async fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.tx.send(Box::pin(task)).await.is_err() {
            warn!("worker pool is shut down; dropping cache write task");
        }
    }
}
