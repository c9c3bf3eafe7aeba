//! Worker thread implementation

use crate::core::{CancellationReason, CancellationToken, Result, SharedCounter, ThreadError};
use crate::pool::config::IterationHook;
use crossbeam_channel::Receiver;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::{span, Level};

/// Statistics for a worker thread
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Increments this worker has applied so far
    pub increments: AtomicU64,
    /// Time spent in the increment loop (microseconds)
    pub elapsed_us: AtomicU64,
    /// Whether the worker stopped because of cancellation
    pub cancelled: AtomicBool,
    /// Whether the worker left its loop normally
    pub finished: AtomicBool,
}

impl WorkerStats {
    /// Create new worker statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Get increments applied so far
    pub fn get_increments(&self) -> u64 {
        self.increments.load(Ordering::Relaxed)
    }

    /// Get time spent in the increment loop in microseconds
    pub fn get_elapsed_us(&self) -> u64 {
        self.elapsed_us.load(Ordering::Relaxed)
    }

    /// Whether the worker observed cancellation
    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Whether the worker left its loop without panicking
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Take a plain-value copy of these statistics
    pub fn snapshot(&self, worker_id: usize) -> WorkerStatSnapshot {
        WorkerStatSnapshot {
            worker_id,
            increments: self.get_increments(),
            elapsed_us: self.get_elapsed_us(),
            cancelled: self.was_cancelled(),
            finished: self.is_finished(),
        }
    }
}

/// Point-in-time copy of [`WorkerStats`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerStatSnapshot {
    /// Worker the statistics belong to
    pub worker_id: usize,
    /// Increments applied
    pub increments: u64,
    /// Time spent in the increment loop (microseconds)
    pub elapsed_us: u64,
    /// Whether the worker stopped because of cancellation
    pub cancelled: bool,
    /// Whether the worker left its loop without panicking
    pub finished: bool,
}

/// Value a worker thread hands back through its join handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOutcome {
    /// Worker that produced the outcome
    pub worker_id: usize,
    /// Increments the worker applied
    pub increments: u64,
    /// Whether the worker stopped early because of cancellation
    pub cancelled: bool,
}

/// Everything a worker needs for its run, moved onto the worker thread
pub(crate) struct WorkerTask {
    pub(crate) iterations: u64,
    pub(crate) counter: Arc<SharedCounter>,
    pub(crate) token: CancellationToken,
    pub(crate) start_gate: Receiver<()>,
    pub(crate) iteration_delay: Option<Duration>,
    pub(crate) yield_between_iterations: bool,
    /// Run timeout, measured from the moment the gate opens
    pub(crate) cancel_after: Option<Duration>,
    pub(crate) hook: Option<IterationHook>,
}

/// A worker thread applying increments to a shared counter
#[derive(Debug)]
pub struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<WorkerOutcome>>,
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a worker thread for `task`
    ///
    /// The thread blocks on the task's start gate until the gate's sender is
    /// dropped, then runs its increment loop.
    pub(crate) fn spawn(
        id: usize,
        name_prefix: &str,
        stack_size: Option<usize>,
        task: WorkerTask,
    ) -> Result<Self> {
        let stats = Arc::new(WorkerStats::new());
        let stats_clone = Arc::clone(&stats);

        let mut builder = thread::Builder::new().name(format!("{}-{}", name_prefix, id));
        if let Some(bytes) = stack_size {
            builder = builder.stack_size(bytes);
        }

        let thread = builder
            .spawn(move || Self::run(id, task, &stats_clone))
            .map_err(|e| ThreadError::spawn_with_source(id, e.to_string(), e))?;

        Ok(Self {
            id,
            thread: Some(thread),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Join the worker thread and collect its outcome
    ///
    /// A worker that panicked is reported as [`ThreadError::JoinError`]
    /// carrying the panic message.
    pub fn join(mut self) -> Result<WorkerOutcome> {
        let thread = self
            .thread
            .take()
            .ok_or_else(|| ThreadError::join(self.id, "Worker was already detached"))?;

        thread.join().map_err(|panic_info| {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            ThreadError::join(self.id, format!("Worker panicked: {}", panic_msg))
        })
    }

    /// Let the worker run to completion without ever being joined.
    ///
    /// Its outcome and any panic are lost; only its statistics stay readable
    /// through handles taken with [`stats`](Self::stats).
    pub fn detach(mut self) {
        // Dropping the handle detaches the OS thread
        drop(self.thread.take());
    }

    /// Main worker loop
    fn run(id: usize, task: WorkerTask, stats: &WorkerStats) -> WorkerOutcome {
        #[cfg(feature = "tracing")]
        let worker_span = span!(Level::DEBUG, "worker", id = id);
        #[cfg(feature = "tracing")]
        let _guard = worker_span.enter();

        // Err means the gate sender is gone: everyone has been spawned
        let _ = task.start_gate.recv();
        log::trace!("worker {} started", id);

        let start = Instant::now();
        let deadline = task.cancel_after.map(|timeout| (start + timeout, timeout));
        let mut done = 0u64;
        let mut cancelled = false;

        for iteration in 0..task.iterations {
            if let Some((at, timeout)) = deadline {
                if Instant::now() >= at {
                    task.token
                        .cancel_with_reason(CancellationReason::Timeout(timeout));
                }
            }
            if task.token.is_cancelled() {
                cancelled = true;
                break;
            }

            task.counter.increment();
            done += 1;
            stats.increments.store(done, Ordering::Relaxed);

            if let Some(hook) = &task.hook {
                hook(id, iteration);
            }
            if task.yield_between_iterations {
                thread::yield_now();
            }
            if let Some(delay) = task.iteration_delay {
                thread::sleep(delay);
            }
        }

        stats
            .elapsed_us
            .store(start.elapsed().as_micros() as u64, Ordering::Relaxed);
        stats.cancelled.store(cancelled, Ordering::Relaxed);
        stats.finished.store(true, Ordering::Release);

        if cancelled {
            log::debug!(
                "worker {} cancelled after {}/{} increments",
                id,
                done,
                task.iterations
            );
        } else {
            log::trace!("worker {} finished {} increments", id, done);
        }

        WorkerOutcome {
            worker_id: id,
            increments: done,
            cancelled,
        }
    }
}
