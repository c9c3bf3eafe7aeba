//! Core types for the worker harness

pub mod cancellation;
pub mod counter;
pub mod error;
pub mod policy;

pub use cancellation::{CancellationReason, CancellationToken};
pub use counter::SharedCounter;
pub use error::{Result, ThreadError};
pub use policy::CoordinationPolicy;
