//! Detached background work with captured failures.
//!
//! Cache writes that must not delay the caller run here. Failures and panics
//! are logged and counted; they never propagate to whoever spawned the task.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use swcache_core::Error;
use tokio::task::{JoinError, JoinSet};

#[derive(Debug, Default)]
struct Inner {
    tasks: Mutex<JoinSet<()>>,
    failures: AtomicU64,
}

impl Inner {
    fn record(&self, joined: Result<(), JoinError>) {
        if let Err(e) = joined {
            self.failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, "background task panicked");
        }
    }

    /// Collect every task that already finished.
    fn reap(&self, tasks: &mut JoinSet<()>) {
        while let Some(joined) = tasks.try_join_next() {
            self.record(joined);
        }
    }
}

/// Tracker for detached tasks.
///
/// Cloning shares the tracker. Dropping it does not cancel anything.
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    inner: Arc<Inner>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` on the current runtime.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, label: &'static str, task: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.reap(&mut tasks);
        tasks.spawn(async move {
            if let Err(e) = task.await {
                inner.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(task = label, error = %e, "background task failed");
            }
        });
    }

    /// Number of tasks that have not finished yet.
    pub fn in_flight(&self) -> usize {
        let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.reap(&mut tasks);
        tasks.len()
    }

    /// Number of tasks that failed or panicked.
    pub fn failures(&self) -> u64 {
        let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.reap(&mut tasks);
        self.inner.failures.load(Ordering::Relaxed)
    }

    /// Wait for every task spawned so far, including ones spawned while draining.
    pub async fn drain(&self) {
        loop {
            let mut pending = {
                let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
                std::mem::take(&mut *tasks)
            };
            if pending.is_empty() {
                return;
            }
            while let Some(joined) = pending.join_next().await {
                self.inner.record(joined);
            }
        }
    }
}
