//! Configuration for worker pools.

use crate::core::{CancellationToken, CoordinationPolicy, Result, ThreadError};
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked on a worker thread after each increment.
///
/// Arguments are the worker id and the zero-based iteration number.
pub type IterationHook = Arc<dyn Fn(usize, u64) + Send + Sync>;

/// Configuration for a worker pool
///
/// # Example
///
/// ```rust
/// use rust_worker_harness::{CoordinationPolicy, WorkerPoolConfig};
/// use std::time::Duration;
///
/// let config = WorkerPoolConfig::new(4, 10_000)
///     .with_policy(CoordinationPolicy::Locked)
///     .with_thread_name_prefix("counter")
///     .with_cancel_after(Duration::from_secs(5));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker threads (0 = run completes immediately)
    pub num_workers: usize,
    /// Increments performed by each worker
    pub iterations_per_worker: u64,
    /// How increments are coordinated
    pub policy: CoordinationPolicy,
    /// Thread name prefix; threads are named `{prefix}-{id}`
    pub thread_name_prefix: String,
    /// Stack size for worker threads (None = platform default)
    pub stack_size: Option<usize>,
    /// Sleep after every increment
    pub iteration_delay: Option<Duration>,
    /// Yield the CPU after every increment
    pub yield_between_iterations: bool,
    /// Cancel the run automatically after this long
    pub cancel_after: Option<Duration>,
    parent_token: Option<CancellationToken>,
    iteration_hook: Option<IterationHook>,
}

impl std::fmt::Debug for WorkerPoolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPoolConfig")
            .field("num_workers", &self.num_workers)
            .field("iterations_per_worker", &self.iterations_per_worker)
            .field("policy", &self.policy)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .field("stack_size", &self.stack_size)
            .field("iteration_delay", &self.iteration_delay)
            .field("yield_between_iterations", &self.yield_between_iterations)
            .field("cancel_after", &self.cancel_after)
            .field("parent_token", &self.parent_token)
            .field(
                "iteration_hook",
                &self.iteration_hook.as_ref().map(|_| "<hook>"),
            )
            .finish()
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            iterations_per_worker: 100_000,
            policy: CoordinationPolicy::default(),
            thread_name_prefix: "worker".to_string(),
            stack_size: None,
            iteration_delay: None,
            yield_between_iterations: false,
            cancel_after: None,
            parent_token: None,
            iteration_hook: None,
        }
    }
}

impl WorkerPoolConfig {
    /// Create a configuration with the given worker and iteration counts
    #[must_use]
    pub fn new(num_workers: usize, iterations_per_worker: u64) -> Self {
        Self {
            num_workers,
            iterations_per_worker,
            ..Default::default()
        }
    }

    /// Set the coordination policy
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_policy(mut self, policy: CoordinationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the stack size of every worker thread in bytes
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Sleep for `delay` after every increment.
    ///
    /// Slows workers down enough that cancellation lands mid-run.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_iteration_delay(mut self, delay: Duration) -> Self {
        self.iteration_delay = Some(delay);
        self
    }

    /// Yield the CPU after every increment
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_yield_between_iterations(mut self, enable: bool) -> Self {
        self.yield_between_iterations = enable;
        self
    }

    /// Cancel the run automatically once `timeout` has elapsed.
    ///
    /// Workers stop at their next iteration boundary and the run returns the
    /// partial count.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_cancel_after(mut self, timeout: Duration) -> Self {
        self.cancel_after = Some(timeout);
        self
    }

    /// Run the pool on a child of `parent`.
    ///
    /// Cancelling the parent stops the run with reason
    /// [`ParentCancelled`](crate::CancellationReason::ParentCancelled);
    /// cancelling the pool leaves the parent untouched.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_parent_token(mut self, parent: &CancellationToken) -> Self {
        self.parent_token = Some(parent.clone());
        self
    }

    /// Install a callback that runs on the worker thread after each increment.
    ///
    /// A panic inside the hook terminates that worker; the pool reports it as
    /// [`ThreadError::JoinError`].
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_iteration_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize, u64) + Send + Sync + 'static,
    {
        self.iteration_hook = Some(Arc::new(hook));
        self
    }

    pub(crate) fn iteration_hook(&self) -> Option<&IterationHook> {
        self.iteration_hook.as_ref()
    }

    pub(crate) fn parent_token(&self) -> Option<&CancellationToken> {
        self.parent_token.as_ref()
    }

    /// Total increments a fully completed run performs
    pub fn expected_total(&self) -> u64 {
        (self.num_workers as u64).saturating_mul(self.iterations_per_worker)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.thread_name_prefix.is_empty() {
            return Err(ThreadError::invalid_config(
                "thread_name_prefix",
                "Thread name prefix must not be empty",
            ));
        }
        if self.stack_size == Some(0) {
            return Err(ThreadError::invalid_config(
                "stack_size",
                "Stack size must be greater than 0",
            ));
        }
        if self.iteration_delay.is_some_and(|d| d.is_zero()) {
            return Err(ThreadError::invalid_config(
                "iteration_delay",
                "Iteration delay must be non-zero",
            ));
        }
        if self.cancel_after.is_some_and(|d| d.is_zero()) {
            return Err(ThreadError::invalid_config(
                "cancel_after",
                "Cancellation timeout must be non-zero",
            ));
        }
        Ok(())
    }
}
