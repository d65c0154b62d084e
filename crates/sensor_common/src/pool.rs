//! Bounded worker pool.
//!
//! Fixed width, FIFO task queue, blocking join. Every input gets exactly one
//! output slot and results come back in input order regardless of which task
//! finished first.

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Default number of simultaneous in-flight tasks
pub const DEFAULT_POOL_WIDTH: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The task panicked or was aborted before filling its slot
    #[error("worker task failed before producing a result")]
    TaskFailed,

    #[error("worker pool closed")]
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    width: usize,
}

impl WorkerPool {
    pub fn new(width: usize) -> Self {
        Self { width: width.max(1) }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Run `task` once per input with at most `width` tasks in flight.
    ///
    /// Returns one result per input, in input order. Awaits until every task
    /// has finished.
    pub async fn run<I, T, F, Fut>(&self, inputs: I, task: F) -> Vec<Result<T, PoolError>>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.width));
        let mut join_set = JoinSet::new();
        let mut slots: Vec<Option<Result<T, PoolError>>> = Vec::new();

        for (index, input) in inputs.into_iter().enumerate() {
            slots.push(None);
            let semaphore = semaphore.clone();
            let work = task(input);

            join_set.spawn(async move {
                // Queued tasks wait here until a slot frees
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (index, Err(PoolError::Closed)),
                };
                (index, Ok(work.await))
            });
        }

        debug!("Dispatched {} tasks on pool of width {}", slots.len(), self.width);

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => warn!("Worker task lost: {}", e),
            }
        }

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or(Err(PoolError::TaskFailed)))
            .collect()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_WIDTH)
    }
}
