//! # Rust Worker Harness
//!
//! A bounded worker-thread harness: spawn a fixed number of threads, have
//! each one increment a shared counter a fixed number of times, join them
//! all and look at the total.
//!
//! ## Features
//!
//! - **Coordination policies**: lock-based, atomic, or deliberately
//!   unsynchronized increments
//! - **Join semantics**: `run` blocks until every worker is joined, worker
//!   panics surface as errors
//! - **Detached mode**: fire-and-forget workers without join handles
//! - **Cooperative cancellation**: workers stop at iteration boundaries,
//!   manually or after a timeout
//! - **Run reports**: per-worker statistics and lost-update counts,
//!   serializable to JSON
//!
//! ## Quick Start
//!
//! ```rust
//! use rust_worker_harness::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let count = rust_worker_harness::run(2, 100_000, CoordinationPolicy::Atomic)?;
//! assert_eq!(count, 200_000);
//! # Ok(())
//! # }
//! ```
//!
//! ## Pool Configuration
//!
//! ```rust
//! use rust_worker_harness::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let config = WorkerPoolConfig::new(8, 10_000)
//!     .with_policy(CoordinationPolicy::Locked)
//!     .with_thread_name_prefix("counter");
//!
//! let pool = WorkerPool::with_config(config)?;
//! let report = pool.run_with_report()?;
//! assert_eq!(report.final_count, 80_000);
//! assert_eq!(report.lost_updates(), 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Lost Updates
//!
//! ```rust
//! use rust_worker_harness::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let count = rust_worker_harness::run(2, 100_000, CoordinationPolicy::Unsynchronized)?;
//! // Racy: anything up to 200_000, usually less
//! assert!(count <= 200_000);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod pool;
pub mod prelude;

pub use crate::core::{
    CancellationReason, CancellationToken, CoordinationPolicy, Result, SharedCounter, ThreadError,
};
pub use crate::pool::{
    run, PoolState, RunReport, WorkerPool, WorkerPoolConfig, WorkerStatSnapshot, WorkerStats,
};
