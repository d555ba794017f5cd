//! Background task execution on rayon.
//!
//! Each spawned task gets its own bounded channel and cancel flag, wrapped in
//! a [`PendingTask`] handle owned by whoever spawned it:
//!
//! ```ignore
//! let executor = TaskExecutor::default_threads();
//!
//! // Queue work (non-blocking)
//! let task = executor.spawn(move || expensive_computation());
//!
//! // Poll each tick
//! match task.try_take() {
//!   TaskPoll::Ready(output) => use_result(output.value),
//!   TaskPoll::Pending => {}
//!   TaskPoll::Lost => log_and_forget(),
//! }
//! ```
//!
//! Cancellation is cooperative: the flag is checked before the work starts
//! and again before the result is sent. A cancelled task never delivers.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, TryRecvError};
use web_time::Instant;

/// A finished task's value and how long the work took.
#[derive(Debug)]
pub struct TaskOutput<T> {
  pub value: T,
  pub elapsed_us: u64,
}

/// Result of [`PendingTask::try_take`].
#[derive(Debug)]
pub enum TaskPoll<T> {
  /// Still queued or running.
  Pending,
  /// Finished; the output has been taken.
  Ready(TaskOutput<T>),
  /// Will never deliver: cancelled, panicked, or already taken.
  Lost,
}

/// Handle to one spawned task.
pub struct PendingTask<T> {
  receiver: Receiver<TaskOutput<T>>,
  cancelled: Arc<AtomicBool>,
}

impl<T> PendingTask<T> {
  /// Take the result if it is ready (non-blocking).
  pub fn try_take(&self) -> TaskPoll<T> {
    match self.receiver.try_recv() {
      Ok(output) => TaskPoll::Ready(output),
      Err(TryRecvError::Empty) => TaskPoll::Pending,
      Err(TryRecvError::Disconnected) => TaskPoll::Lost,
    }
  }

  /// Block until the task delivers. `None` if it never will.
  pub fn wait(&self) -> Option<TaskOutput<T>> {
    self.receiver.recv().ok()
  }

  /// Ask the task not to run, or not to deliver if already running.
  pub fn cancel(&self) {
    self.cancelled.store(true, Ordering::Release);
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::Acquire)
  }
}

impl<T> std::fmt::Debug for PendingTask<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PendingTask")
      .field("cancelled", &self.is_cancelled())
      .field("ready", &!self.receiver.is_empty())
      .finish()
  }
}

/// Task executor on rayon: a dedicated pool, or the global pool.
#[derive(Clone)]
pub struct TaskExecutor {
  pool: Option<Arc<rayon::ThreadPool>>,
  /// Tasks queued or running.
  pending: Arc<AtomicUsize>,
}

impl TaskExecutor {
  /// Create an executor with `num_threads` dedicated workers.
  ///
  /// `0` uses rayon's global pool. If the dedicated pool cannot be built the
  /// global pool is used instead.
  pub fn new(num_threads: usize) -> Self {
    let pool = if num_threads == 0 {
      None
    } else {
      match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("galaxy-gen-{i}"))
        .build()
      {
        Ok(pool) => Some(Arc::new(pool)),
        Err(err) => {
          tracing::warn!(%err, num_threads, "falling back to the global rayon pool");
          None
        }
      }
    };
    Self {
      pool,
      pending: Arc::new(AtomicUsize::new(0)),
    }
  }

  /// Executor on rayon's global pool.
  pub fn default_threads() -> Self {
    Self::new(0)
  }

  /// Spawn `work` in the background (non-blocking).
  pub fn spawn<F, T>(&self, work: F) -> PendingTask<T>
  where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
  {
    let (sender, receiver) = crossbeam_channel::bounded(1);
    let cancelled = Arc::new(AtomicBool::new(false));
    let pending = Arc::clone(&self.pending);
    pending.fetch_add(1, Ordering::Relaxed);

    let flag = Arc::clone(&cancelled);
    let job = move || {
      if flag.load(Ordering::Acquire) {
        pending.fetch_sub(1, Ordering::Relaxed);
        return;
      }

      let start = Instant::now();
      let result = catch_unwind(AssertUnwindSafe(work));
      let elapsed_us = start.elapsed().as_micros() as u64;
      pending.fetch_sub(1, Ordering::Relaxed);

      match result {
        Ok(value) if !flag.load(Ordering::Acquire) => {
          // The receiver may already be gone; nothing to do then.
          let _ = sender.send(TaskOutput { value, elapsed_us });
        }
        Ok(_) => {}
        Err(_) => tracing::error!("background task panicked"),
      }
    };

    match &self.pool {
      Some(pool) => pool.spawn(job),
      None => rayon::spawn(job),
    }

    PendingTask {
      receiver,
      cancelled,
    }
  }

  /// Worker threads available to this executor.
  pub fn num_threads(&self) -> usize {
    match &self.pool {
      Some(pool) => pool.current_num_threads(),
      None => rayon::current_num_threads(),
    }
  }

  /// Tasks currently queued or running.
  pub fn pending_count(&self) -> usize {
    self.pending.load(Ordering::Relaxed)
  }
}

impl Default for TaskExecutor {
  fn default() -> Self {
    Self::default_threads()
  }
}

impl std::fmt::Debug for TaskExecutor {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TaskExecutor")
      .field("dedicated_pool", &self.pool.is_some())
      .field("pending", &self.pending_count())
      .finish()
  }
}

// =============================================================================
// Tests
// =============================================================================
