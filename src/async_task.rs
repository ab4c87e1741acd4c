//! Worker threads for remote calls.
//!
//! Views never block the UI loop on a data source. Each remote call is handed to a
//! [`TaskManager`], which runs it on its own thread and delivers the result over a
//! channel. The owning view drains that channel from its `poll()` method, so every
//! state change still happens on the UI thread. Results arrive in completion
//! order, not spawn order.
//!
//! ```no_run
//! use std::time::Duration;
//! use warden::async_task::TaskManager;
//!
//! let mut tasks: TaskManager<Result<u32, String>> = TaskManager::new();
//! tasks.spawn(|| Ok(42));
//!
//! // Non-blocking, once per tick of the UI loop
//! if let Some(Ok(value)) = tasks.try_recv() {
//!     println!("loaded {value}");
//! }
//! // Tests wait instead
//! let _ = tasks.recv_timeout(Duration::from_secs(1));
//! ```

use std::thread;
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};

/// Runs jobs on worker threads and collects their results.
///
/// Tracks how many jobs have been spawned but not yet received.
pub struct TaskManager<R> {
    sender: Sender<R>,
    receiver: Receiver<R>,
    pending: usize,
}

impl<R: Send + 'static> TaskManager<R> {
    /// Create a new task manager
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            pending: 0,
        }
    }

    /// Spawn a background job
    ///
    /// Returns immediately; result can be polled with `try_recv()`
    pub fn spawn<F>(&mut self, job: F)
    where
        F: FnOnce() -> R + Send + 'static,
    {
        self.pending += 1;
        let sender = self.sender.clone();

        thread::spawn(move || {
            // The receiver lives as long as the manager; a dropped view just
            // discards the result.
            let _ = sender.send(job());
        });
    }

    /// Check if there's a completed job result
    ///
    /// Returns `Some(result)` if a job completed, `None` if nothing is pending or
    /// every pending job is still running
    pub fn try_recv(&mut self) -> Option<R> {
        if self.pending == 0 {
            return None;
        }

        match self.receiver.try_recv() {
            Ok(result) => {
                self.pending -= 1;
                Some(result)
            }
            Err(_) => None,
        }
    }

    /// Wait up to `timeout` for the next completed job
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<R> {
        if self.pending == 0 {
            return None;
        }

        match self.receiver.recv_timeout(timeout) {
            Ok(result) => {
                self.pending -= 1;
                Some(result)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Get number of pending jobs
    pub fn pending_count(&self) -> usize {
        self.pending
    }

    /// Check if any jobs are currently pending
    pub fn has_pending(&self) -> bool {
        self.pending > 0
    }
}

impl<R: Send + 'static> Default for TaskManager<R> {
    fn default() -> Self {
        Self::new()
    }
}
