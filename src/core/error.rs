//! Error types for the worker harness

use crate::pool::PoolState;

/// Result type for worker harness operations
pub type Result<T> = std::result::Result<T, ThreadError>;

/// Errors that can occur while configuring or running a worker pool
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ThreadError {
    /// Failed to spawn a worker thread with details
    #[error("Failed to spawn worker thread #{thread_id}: {message}")]
    SpawnError {
        /// ID of the thread that failed to spawn
        thread_id: usize,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// A worker thread terminated abnormally
    #[error("Failed to join worker thread #{thread_id}: {message}")]
    JoinError {
        /// ID of the thread that failed to join
        thread_id: usize,
        /// Error message
        message: String,
    },

    /// The pool is not in a state that allows the requested operation
    #[error("Worker pool {pool_id} cannot run from state {state}")]
    InvalidState {
        /// ID of the pool
        pool_id: String,
        /// State the pool was in
        state: PoolState,
    },

    /// Invalid configuration with parameter
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },

    /// Unknown coordination policy name
    #[error("Unknown coordination policy '{0}' (expected locked, atomic or unsync)")]
    InvalidPolicy(String),

    /// A run report could not be serialized
    #[error("Failed to serialize run report: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ThreadError {
    /// Create a spawn error
    pub fn spawn(thread_id: usize, message: impl Into<String>) -> Self {
        ThreadError::SpawnError {
            thread_id,
            message: message.into(),
            source: None,
        }
    }

    /// Create a spawn error with source
    pub fn spawn_with_source(
        thread_id: usize,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        ThreadError::SpawnError {
            thread_id,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a join error
    pub fn join(thread_id: usize, message: impl Into<String>) -> Self {
        ThreadError::JoinError {
            thread_id,
            message: message.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(pool_id: impl ToString, state: PoolState) -> Self {
        ThreadError::InvalidState {
            pool_id: pool_id.to_string(),
            state,
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        ThreadError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create an invalid policy error
    pub fn invalid_policy(name: impl Into<String>) -> Self {
        ThreadError::InvalidPolicy(name.into())
    }

    /// Whether this error came from the operating system refusing a thread
    pub fn is_spawn_error(&self) -> bool {
        matches!(self, ThreadError::SpawnError { .. })
    }
}
