//! Convenient re-exports for common types and traits

pub use crate::core::{
    CancellationReason, CancellationToken, CoordinationPolicy, Result, SharedCounter, ThreadError,
};
pub use crate::pool::{PoolState, RunReport, WorkerPool, WorkerPoolConfig, WorkerStats};
