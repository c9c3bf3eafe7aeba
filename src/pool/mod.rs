//! Worker pool, worker threads and run reports

pub mod config;
pub mod report;
pub mod worker;
pub mod worker_pool;

pub use config::{IterationHook, WorkerPoolConfig};
pub use report::RunReport;
pub use worker::{Worker, WorkerOutcome, WorkerStatSnapshot, WorkerStats};
pub use worker_pool::{run, PoolState, WorkerPool};
