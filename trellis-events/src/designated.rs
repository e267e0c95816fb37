//! Designated-thread collaborator used by the outside dispatch mode.
//!
//! The host application owns the designated thread (a UI thread, a main
//! loop, an actor). The router only needs to ask whether the current thread
//! is that thread and to hand it a task and wait for the task to finish.

use crate::error::{DesignatedThreadError, panic_message};
use parking_lot::Mutex;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, warn};

/// Work item handed to a designated thread
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A thread the host application designates for outside dispatch.
pub trait DesignatedThread: Send + Sync {
    /// Whether the calling thread is the designated one
    fn is_designated_thread(&self) -> bool;

    /// Run `task` on the designated thread and block until it has finished.
    ///
    /// Never called from the designated thread itself.
    fn run_and_wait(&self, task: Task) -> Result<(), DesignatedThreadError>;
}

struct Job {
    task: Task,
    done: mpsc::SyncSender<Result<(), String>>,
}

/// A dedicated named thread draining a job queue.
///
/// Suitable for hosts without an event loop of their own, and for tests.
pub struct DedicatedThread {
    name: String,
    thread_id: ThreadId,
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DedicatedThread {
    /// Spawn the thread
    pub fn spawn(name: impl Into<String>) -> Result<Self, DesignatedThreadError> {
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<Job>();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                while let Ok(Job { task, done }) = receiver.recv() {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(task))
                        .map_err(|payload| panic_message(payload.as_ref()));
                    // The waiting side may have given up; nothing to do then
                    let _ = done.send(outcome);
                }
            })
            .map_err(|e| DesignatedThreadError::Unavailable(e.to_string()))?;

        debug!("Started designated thread '{}'", name);

        Ok(Self {
            name,
            thread_id: handle.thread().id(),
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Thread name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the dedicated thread
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Stop accepting work and wait for queued jobs to drain.
    ///
    /// Calling this from the dedicated thread only closes the queue.
    pub fn shutdown(&self) {
        self.sender.lock().take();

        if thread::current().id() == self.thread_id {
            return;
        }
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                warn!("Designated thread '{}' terminated abnormally", self.name);
            }
        }
    }
}

impl DesignatedThread for DedicatedThread {
    fn is_designated_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    fn run_and_wait(&self, task: Task) -> Result<(), DesignatedThreadError> {
        let (done_tx, done_rx) = mpsc::sync_channel(1);

        {
            let sender = self.sender.lock();
            let sender = sender.as_ref().ok_or_else(|| {
                DesignatedThreadError::Unavailable(format!("'{}' has been shut down", self.name))
            })?;
            sender
                .send(Job { task, done: done_tx })
                .map_err(|_| DesignatedThreadError::Disconnected)?;
        }

        match done_rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(DesignatedThreadError::TaskPanicked(message)),
            Err(_) => Err(DesignatedThreadError::Disconnected),
        }
    }
}

impl Drop for DedicatedThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for DedicatedThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DedicatedThread")
            .field("name", &self.name)
            .field("thread_id", &self.thread_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_runs_task_on_dedicated_thread() {
        let designated = DedicatedThread::spawn("test-designated").unwrap();
        assert!(!designated.is_designated_thread());

        let observed = Arc::new(Mutex::new(None));
        let slot = observed.clone();
        designated
            .run_and_wait(Box::new(move || {
                *slot.lock() = thread::current().name().map(str::to_string);
            }))
            .unwrap();

        assert_eq!(observed.lock().as_deref(), Some("test-designated"));
    }

    #[test]
    fn test_run_and_wait_blocks_until_done() {
        let designated = DedicatedThread::spawn("test-wait").unwrap();
        let finished = Arc::new(AtomicBool::new(false));

        let flag = finished.clone();
        designated
            .run_and_wait(Box::new(move || {
                thread::sleep(std::time::Duration::from_millis(20));
                flag.store(true, Ordering::SeqCst);
            }))
            .unwrap();

        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_task_panic_is_reported() {
        let designated = DedicatedThread::spawn("test-panic").unwrap();

        let err = designated
            .run_and_wait(Box::new(|| panic!("task blew up")))
            .unwrap_err();
        assert!(matches!(err, DesignatedThreadError::TaskPanicked(ref m) if m == "task blew up"));

        // The thread survives a panicking task
        designated.run_and_wait(Box::new(|| {})).unwrap();
    }

    #[test]
    fn test_shutdown_rejects_new_work() {
        let designated = DedicatedThread::spawn("test-shutdown").unwrap();
        designated.shutdown();

        let err = designated.run_and_wait(Box::new(|| {})).unwrap_err();
        assert!(matches!(err, DesignatedThreadError::Unavailable(_)));
    }
}
