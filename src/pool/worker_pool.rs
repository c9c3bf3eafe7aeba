//! Worker pool implementation

use crate::core::{
    CancellationReason, CancellationToken, CoordinationPolicy, Result, SharedCounter, ThreadError,
};
use crate::pool::config::WorkerPoolConfig;
use crate::pool::report::RunReport;
use crate::pool::worker::{Worker, WorkerOutcome, WorkerStats, WorkerTask};
use chrono::Utc;
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Lifecycle of a [`WorkerPool`]
///
/// ```text
/// Created ──run()──────────▶ Running ──▶ Joined
///    └──────spawn_detached()──────────▶ Detached
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolState {
    /// Configured, no threads spawned yet
    Created,
    /// Workers are spawned and the caller is waiting on them
    Running,
    /// Every worker has been joined (or the run failed)
    Joined,
    /// Workers were spawned without join handles
    Detached,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolState::Created => "created",
            PoolState::Running => "running",
            PoolState::Joined => "joined",
            PoolState::Detached => "detached",
        };
        f.write_str(name)
    }
}

/// A single-use pool of worker threads incrementing one shared counter
///
/// Every pool runs exactly once. [`run`](Self::run) spawns the workers,
/// blocks until all of them are joined and returns the final count; a second
/// call fails with [`ThreadError::InvalidState`].
///
/// # Cancellation
///
/// Workers check the pool's [`CancellationToken`] between increments. Cancel
/// it from another thread (or configure
/// [`with_cancel_after`](WorkerPoolConfig::with_cancel_after)) and `run`
/// returns the partial count once every worker has stopped.
///
/// # Example
///
/// ```rust
/// use rust_worker_harness::prelude::*;
///
/// # fn main() -> Result<()> {
/// let config = WorkerPoolConfig::new(4, 10_000).with_policy(CoordinationPolicy::Locked);
/// let pool = WorkerPool::with_config(config)?;
///
/// assert_eq!(pool.run()?, 40_000);
/// assert_eq!(pool.state(), PoolState::Joined);
/// assert!(pool.run().is_err());
/// # Ok(())
/// # }
/// ```
pub struct WorkerPool {
    id: Uuid,
    config: WorkerPoolConfig,
    state: RwLock<PoolState>,
    counter: Arc<SharedCounter>,
    token: CancellationToken,
    stats: RwLock<Vec<Arc<WorkerStats>>>,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("state", &*self.state.read())
            .field("counter", &self.counter.get())
            .finish()
    }
}

impl WorkerPool {
    /// Create a pool with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(WorkerPoolConfig::default())
    }

    /// Create a pool with `num_workers` workers and default iterations
    pub fn with_workers(num_workers: usize) -> Result<Self> {
        let mut config = WorkerPoolConfig::default();
        config.num_workers = num_workers;
        Self::with_config(config)
    }

    /// Create a pool with custom configuration
    pub fn with_config(config: WorkerPoolConfig) -> Result<Self> {
        config.validate()?;

        let token = match config.parent_token() {
            Some(parent) => parent.child(),
            None => CancellationToken::new(),
        };

        Ok(Self {
            id: Uuid::new_v4(),
            counter: Arc::new(SharedCounter::new(config.policy)),
            config,
            state: RwLock::new(PoolState::Created),
            token,
            stats: RwLock::new(Vec::new()),
        })
    }

    /// Run every worker to completion and return the final counter value
    ///
    /// # Errors
    ///
    /// - `ThreadError::InvalidState` - the pool already ran or was detached
    /// - `ThreadError::SpawnError` - a worker thread could not be created
    /// - `ThreadError::JoinError` - a worker terminated abnormally
    pub fn run(&self) -> Result<u64> {
        self.run_with_report().map(|report| report.final_count)
    }

    /// Run every worker to completion and return the full [`RunReport`]
    pub fn run_with_report(&self) -> Result<RunReport> {
        self.begin()?;

        if self.config.num_workers == 0 {
            let now = Utc::now();
            *self.state.write() = PoolState::Joined;
            return Ok(self.build_report(&[], now, now));
        }

        let (workers, gate) = self.spawn_workers()?;
        let started_at = Utc::now();
        self.release(gate);

        // Join everyone before reporting so no worker outlives the run
        let mut outcomes = Vec::with_capacity(workers.len());
        let mut first_error = None;
        for worker in workers {
            match worker.join() {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    log::error!("pool {}: {}", self.id, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        let finished_at = Utc::now();
        *self.state.write() = PoolState::Joined;

        if let Some(e) = first_error {
            return Err(e);
        }

        let report = self.build_report(&outcomes, started_at, finished_at);
        log::info!(
            "pool {} joined {} workers ({}): {}/{} increments",
            self.id,
            report.workers,
            report.policy,
            report.final_count,
            report.expected
        );
        if report.lost_updates() > 0 {
            log::debug!("pool {} lost {} updates", self.id, report.lost_updates());
        }
        Ok(report)
    }

    /// Spawn every worker without keeping its join handle
    ///
    /// The call returns as soon as the workers are released. Their results,
    /// panics and completion are not reported; only [`counter`](Self::counter),
    /// [`get_stats`](Self::get_stats) and the cancellation token stay usable.
    pub fn spawn_detached(&self) -> Result<()> {
        self.begin()?;

        if self.config.num_workers == 0 {
            *self.state.write() = PoolState::Detached;
            return Ok(());
        }

        let (workers, gate) = self.spawn_workers()?;
        self.release(gate);
        workers.into_iter().for_each(Worker::detach);
        *self.state.write() = PoolState::Detached;

        log::info!(
            "pool {} detached {} workers ({})",
            self.id,
            self.config.num_workers,
            self.config.policy
        );
        Ok(())
    }

    fn begin(&self) -> Result<()> {
        let mut state = self.state.write();
        if *state != PoolState::Created {
            return Err(ThreadError::invalid_state(self.id, *state));
        }
        *state = PoolState::Running;
        Ok(())
    }

    /// Spawn all workers parked behind a start gate.
    ///
    /// On failure the workers already spawned are cancelled and joined, and
    /// the pool ends up `Joined`.
    fn spawn_workers(&self) -> Result<(Vec<Worker>, Sender<()>)> {
        let (gate_tx, gate_rx) = bounded::<()>(0);
        let mut workers = Vec::with_capacity(self.config.num_workers);

        for id in 0..self.config.num_workers {
            let task = WorkerTask {
                iterations: self.config.iterations_per_worker,
                counter: Arc::clone(&self.counter),
                token: self.token.clone(),
                start_gate: gate_rx.clone(),
                iteration_delay: self.config.iteration_delay,
                yield_between_iterations: self.config.yield_between_iterations,
                cancel_after: self.config.cancel_after,
                hook: self.config.iteration_hook().cloned(),
            };

            match Worker::spawn(
                id,
                &self.config.thread_name_prefix,
                self.config.stack_size,
                task,
            ) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    log::error!("pool {}: {}", self.id, e);
                    self.token
                        .cancel_with_reason(CancellationReason::SpawnFailed);
                    drop(gate_tx);
                    for worker in workers {
                        if let Err(join_err) = worker.join() {
                            log::warn!("pool {}: {}", self.id, join_err);
                        }
                    }
                    *self.state.write() = PoolState::Joined;
                    return Err(e);
                }
            }
        }

        *self.stats.write() = workers.iter().map(|w| w.stats()).collect();
        Ok((workers, gate_tx))
    }

    fn release(&self, gate: Sender<()>) {
        log::debug!(
            "pool {} releasing {} workers x {} iterations ({})",
            self.id,
            self.config.num_workers,
            self.config.iterations_per_worker,
            self.config.policy
        );
        drop(gate);
    }

    fn build_report(
        &self,
        outcomes: &[WorkerOutcome],
        started_at: chrono::DateTime<Utc>,
        finished_at: chrono::DateTime<Utc>,
    ) -> RunReport {
        let cancelled = outcomes.iter().any(|o| o.cancelled);
        let worker_stats = self
            .stats
            .read()
            .iter()
            .enumerate()
            .map(|(id, stats)| stats.snapshot(id))
            .collect();

        RunReport {
            pool_id: self.id,
            policy: self.config.policy,
            workers: self.config.num_workers,
            iterations_per_worker: self.config.iterations_per_worker,
            expected: self.config.expected_total(),
            final_count: self.counter.get(),
            increments_applied: outcomes.iter().map(|o| o.increments).sum(),
            cancelled,
            cancellation_reason: if cancelled { self.token.reason() } else { None },
            started_at,
            finished_at,
            worker_stats,
        }
    }

    /// Get the pool's unique ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the pool configuration
    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Get the current lifecycle state
    pub fn state(&self) -> PoolState {
        *self.state.read()
    }

    /// Check if workers are currently running under `run`
    pub fn is_running(&self) -> bool {
        self.state() == PoolState::Running
    }

    /// Get the number of worker threads
    pub fn num_workers(&self) -> usize {
        self.config.num_workers
    }

    /// Get increments performed by each worker
    pub fn iterations_per_worker(&self) -> u64 {
        self.config.iterations_per_worker
    }

    /// Get the coordination policy
    pub fn policy(&self) -> CoordinationPolicy {
        self.config.policy
    }

    /// Shared handle to the pool's counter
    pub fn counter(&self) -> Arc<SharedCounter> {
        Arc::clone(&self.counter)
    }

    /// A clone of the token every worker checks between increments
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Ask every worker to stop at its next iteration boundary
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Get statistics for all workers of the current run
    pub fn get_stats(&self) -> Vec<Arc<WorkerStats>> {
        self.stats.read().clone()
    }

    /// Get total increments the workers report having applied
    pub fn total_increments(&self) -> u64 {
        self.stats.read().iter().map(|s| s.get_increments()).sum()
    }
}

/// Run `workers` threads doing `iterations` increments each under `policy`
/// and return the final count.
///
/// ```rust
/// use rust_worker_harness::{run, CoordinationPolicy};
///
/// assert_eq!(run(2, 100_000, CoordinationPolicy::Atomic).unwrap(), 200_000);
/// assert_eq!(run(5, 1, CoordinationPolicy::Locked).unwrap(), 5);
/// ```
pub fn run(workers: usize, iterations: u64, policy: CoordinationPolicy) -> Result<u64> {
    let config = WorkerPoolConfig::new(workers, iterations).with_policy(policy);
    WorkerPool::with_config(config)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_pool_creation() {
        let pool = WorkerPool::with_workers(4).expect("Failed to create pool");
        assert_eq!(pool.state(), PoolState::Created);
        assert!(!pool.is_running());
        assert_eq!(pool.num_workers(), 4);
        assert_eq!(pool.policy(), CoordinationPolicy::Atomic);
        assert!(pool.get_stats().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = WorkerPoolConfig::new(2, 10).with_thread_name_prefix("");
        assert!(matches!(
            WorkerPool::with_config(config),
            Err(ThreadError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_zero_workers_returns_zero() {
        let pool = WorkerPool::with_config(WorkerPoolConfig::new(0, 1_000))
            .expect("Failed to create pool");
        let report = pool.run_with_report().expect("Run failed");

        assert_eq!(report.final_count, 0);
        assert_eq!(report.workers, 0);
        assert!(report.worker_stats.is_empty());
        assert_eq!(pool.state(), PoolState::Joined);
    }

    #[test]
    fn test_exact_policies() {
        for policy in [CoordinationPolicy::Locked, CoordinationPolicy::Atomic] {
            for _ in 0..5 {
                assert_eq!(run(4, 25_000, policy).expect("Run failed"), 100_000);
            }
        }
    }

    #[test]
    fn test_five_single_increment_workers() {
        assert_eq!(run(5, 1, CoordinationPolicy::Locked).expect("Run failed"), 5);
    }

    #[test]
    fn test_run_twice_is_invalid_state() {
        let pool = WorkerPool::with_config(WorkerPoolConfig::new(2, 10))
            .expect("Failed to create pool");
        assert_eq!(pool.run().expect("First run failed"), 20);

        let err = pool.run().unwrap_err();
        assert!(matches!(
            err,
            ThreadError::InvalidState {
                state: PoolState::Joined,
                ..
            }
        ));
    }

    #[test]
    fn test_report_matches_stats() {
        let config =
            WorkerPoolConfig::new(3, 1_000).with_policy(CoordinationPolicy::Locked);
        let pool = WorkerPool::with_config(config).expect("Failed to create pool");
        let report = pool.run_with_report().expect("Run failed");

        assert_eq!(report.expected, 3_000);
        assert_eq!(report.final_count, 3_000);
        assert_eq!(report.increments_applied, 3_000);
        assert!(report.is_consistent());
        assert!(!report.cancelled);
        assert_eq!(report.cancellation_reason, None);
        assert_eq!(report.worker_stats.len(), 3);
        assert!(report.worker_stats.iter().all(|s| s.increments == 1_000));
        assert_eq!(pool.total_increments(), 3_000);
        assert!(report.finished_at >= report.started_at);
    }

    #[test]
    fn test_cancel_mid_run() {
        let config = WorkerPoolConfig::new(2, 10_000)
            .with_iteration_delay(Duration::from_millis(1));
        let pool = WorkerPool::with_config(config).expect("Failed to create pool");
        let token = pool.cancellation_token();

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            token.cancel();
        });

        let report = pool.run_with_report().expect("Run failed");
        canceller.join().expect("Canceller panicked");

        assert!(report.cancelled);
        assert_eq!(report.cancellation_reason, Some(CancellationReason::Manual));
        assert!(report.final_count < report.expected);
        assert_eq!(report.final_count, report.increments_applied);
    }

    #[test]
    fn test_cancel_after_timeout() {
        let config = WorkerPoolConfig::new(2, 10_000)
            .with_iteration_delay(Duration::from_millis(1))
            .with_cancel_after(Duration::from_millis(30));
        let pool = WorkerPool::with_config(config).expect("Failed to create pool");

        let report = pool.run_with_report().expect("Run failed");
        assert!(report.cancelled);
        assert_eq!(
            report.cancellation_reason,
            Some(CancellationReason::Timeout(Duration::from_millis(30)))
        );
        assert!(report.final_count < report.expected);
    }

    #[test]
    fn test_cancelled_before_run() {
        let pool = WorkerPool::with_config(WorkerPoolConfig::new(3, 1_000))
            .expect("Failed to create pool");
        pool.cancel();

        let report = pool.run_with_report().expect("Run failed");
        assert_eq!(report.final_count, 0);
        assert!(report.cancelled);
        assert_eq!(pool.state(), PoolState::Joined);
    }

    #[test]
    fn test_panicking_worker_is_join_error() {
        let config = WorkerPoolConfig::new(3, 100).with_iteration_hook(|worker, iteration| {
            if worker == 1 && iteration == 10 {
                panic!("worker one gave up");
            }
        });
        let pool = WorkerPool::with_config(config).expect("Failed to create pool");

        let err = pool.run().unwrap_err();
        assert!(matches!(err, ThreadError::JoinError { thread_id: 1, .. }));
        assert!(err.to_string().contains("worker one gave up"));
        assert_eq!(pool.state(), PoolState::Joined);

        // The healthy workers were still joined and finished their work
        let stats = pool.get_stats();
        assert!(stats[0].is_finished());
        assert!(!stats[1].is_finished());
        assert!(stats[2].is_finished());
        assert_eq!(pool.counter().get(), 100 + 11 + 100);
    }

    #[test]
    fn test_lowest_failed_worker_is_reported() {
        let config = WorkerPoolConfig::new(3, 50).with_iteration_hook(|worker, iteration| {
            if worker > 0 && iteration == 0 {
                panic!("worker {} gave up", worker);
            }
        });
        let pool = WorkerPool::with_config(config).expect("Failed to create pool");

        let err = pool.run().unwrap_err();
        assert!(matches!(err, ThreadError::JoinError { thread_id: 1, .. }));
        assert!(err.to_string().contains("worker 1 gave up"));

        // Every worker was joined, not just the ones before the first failure
        let stats = pool.get_stats();
        assert!(stats[0].is_finished());
        assert!(!stats[1].is_finished());
        assert!(!stats[2].is_finished());
        assert_eq!(pool.counter().get(), 50 + 1 + 1);
        assert_eq!(pool.state(), PoolState::Joined);
    }

    #[test]
    fn test_parent_token_cancels_run() {
        let parent = CancellationToken::new();
        let config = WorkerPoolConfig::new(2, 10_000)
            .with_iteration_delay(Duration::from_millis(1))
            .with_parent_token(&parent);
        let pool = WorkerPool::with_config(config).expect("Failed to create pool");

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(40));
            parent.cancel();
        });

        let report = pool.run_with_report().expect("Run failed");
        canceller.join().expect("Canceller panicked");

        assert!(report.cancelled);
        assert_eq!(
            report.cancellation_reason,
            Some(CancellationReason::ParentCancelled)
        );
        assert!(report.final_count < report.expected);
    }

    #[test]
    fn test_pool_cancel_leaves_parent_alone() {
        let parent = CancellationToken::new();
        let pool = WorkerPool::with_config(WorkerPoolConfig::new(1, 1).with_parent_token(&parent))
            .expect("Failed to create pool");

        pool.cancel();
        assert!(pool.cancellation_token().is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_detached_workers_complete() {
        let pool = WorkerPool::with_config(WorkerPoolConfig::new(3, 5_000))
            .expect("Failed to create pool");
        pool.spawn_detached().expect("Failed to spawn detached");
        assert_eq!(pool.state(), PoolState::Detached);

        let counter = pool.counter();
        for _ in 0..500 {
            if counter.get() == 15_000 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(counter.get(), 15_000);

        assert!(matches!(
            pool.run(),
            Err(ThreadError::InvalidState {
                state: PoolState::Detached,
                ..
            })
        ));
    }

    #[cfg(all(target_os = "linux", target_env = "gnu", target_pointer_width = "64"))]
    #[test]
    fn test_spawn_failure_is_reported() {
        // No system can map a stack this large
        let config = WorkerPoolConfig::new(2, 10).with_stack_size(1 << 62);
        let pool = WorkerPool::with_config(config).expect("Failed to create pool");

        let err = pool.run().unwrap_err();
        assert!(matches!(err, ThreadError::SpawnError { thread_id: 0, .. }));
        assert_eq!(pool.state(), PoolState::Joined);
        assert_eq!(
            pool.cancellation_token().reason(),
            Some(CancellationReason::SpawnFailed)
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PoolState::Created.to_string(), "created");
        assert_eq!(PoolState::Detached.to_string(), "detached");
    }
}
