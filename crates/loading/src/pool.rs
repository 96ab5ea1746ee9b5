//! Background worker capability.
//!
//! The loading pipeline only depends on [`Executor`]; the production
//! implementation is a fixed-size pool of blocking threads on a tokio
//! runtime. Load tasks enqueue follow-up work from inside a worker, which is
//! why a pool smaller than [`MIN_WORKERS`] is refused.

use std::fmt;

use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};
use tripaint_config::{MIN_WORKERS, WorkerConfig};

use crate::error::PoolError;

/// A unit of background work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks off the controlling thread
pub trait Executor: Send + Sync {
    /// Queue a task; it runs on some worker thread, in no particular order
    fn enqueue(&self, task: Task);

    fn worker_count(&self) -> usize;
}

/// Fixed pool of blocking worker threads
pub struct WorkerPool {
    runtime: Runtime,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self, PoolError> {
        if workers < MIN_WORKERS {
            return Err(PoolError::TooFewWorkers {
                requested: workers,
                min: MIN_WORKERS,
            });
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name("tripaint-worker")
            .build()?;

        info!("Worker pool started with {} workers", workers);
        Ok(Self { runtime, workers })
    }

    pub fn from_config(config: &WorkerConfig) -> Result<Self, PoolError> {
        Self::new(config.resolved_worker_count())
    }
}

impl Executor for WorkerPool {
    fn enqueue(&self, task: Task) {
        debug!("Worker pool: task enqueued");
        // Detached; results travel back through the controller queue
        drop(self.runtime.spawn_blocking(task));
    }

    fn worker_count(&self) -> usize {
        self.workers
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish()
    }
}
