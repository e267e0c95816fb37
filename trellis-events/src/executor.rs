//! Background execution for async dispatch

use crate::error::{RouterError, Result};
use once_cell::sync::OnceCell;
use std::fmt;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::debug;

enum Source {
    /// Runtime supplied by the host application
    Shared(Handle),
    /// Runtime created on the first async publish and owned by the router
    Owned {
        workers: usize,
        thread_name: String,
        runtime: OnceCell<Runtime>,
    },
}

/// Runs async dispatch jobs on tokio's blocking pool.
///
/// Handlers are synchronous and may block, so each dispatch job goes through
/// `spawn_blocking` rather than occupying an async worker.
pub(crate) struct AsyncExecutor {
    source: Source,
}

impl AsyncExecutor {
    pub(crate) fn shared(handle: Handle) -> Self {
        Self {
            source: Source::Shared(handle),
        }
    }

    pub(crate) fn owned(workers: usize, thread_name: impl Into<String>) -> Self {
        Self {
            source: Source::Owned {
                workers: workers.max(1),
                thread_name: thread_name.into(),
                runtime: OnceCell::new(),
            },
        }
    }

    fn handle(&self) -> Result<Handle> {
        match &self.source {
            Source::Shared(handle) => Ok(handle.clone()),
            Source::Owned {
                workers,
                thread_name,
                runtime,
            } => runtime
                .get_or_try_init(|| {
                    debug!(
                        "Starting event worker runtime with {} blocking threads",
                        workers
                    );
                    Builder::new_multi_thread()
                        .worker_threads(1)
                        .max_blocking_threads(*workers)
                        .thread_name(thread_name.clone())
                        .build()
                        .map_err(|e| RouterError::Executor(e.to_string()))
                })
                .map(|rt| rt.handle().clone()),
        }
    }

    /// Queue `job` and return immediately
    pub(crate) fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        // Completion is observed by the handlers themselves
        drop(self.handle()?.spawn_blocking(job));
        Ok(())
    }
}

impl Drop for AsyncExecutor {
    fn drop(&mut self) {
        if let Source::Owned { runtime, .. } = &mut self.source {
            if let Some(runtime) = runtime.take() {
                // A plain drop panics when it happens inside an async context
                runtime.shutdown_background();
            }
        }
    }
}

impl fmt::Debug for AsyncExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Source::Shared(_) => f.write_str("AsyncExecutor::Shared"),
            Source::Owned { workers, .. } => f
                .debug_struct("AsyncExecutor::Owned")
                .field("workers", workers)
                .finish(),
        }
    }
}
