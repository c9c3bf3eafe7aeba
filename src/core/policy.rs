//! Coordination policies for shared counter increments

use crate::core::error::{Result, ThreadError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How concurrent increments to the shared counter are coordinated
///
/// # Example
///
/// ```rust
/// use rust_worker_harness::CoordinationPolicy;
///
/// let policy: CoordinationPolicy = "locked".parse().unwrap();
/// assert_eq!(policy, CoordinationPolicy::Locked);
/// assert!(policy.is_exact());
/// assert!(!CoordinationPolicy::Unsynchronized.is_exact());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinationPolicy {
    /// Every increment takes an exclusive lock around the read-modify-write
    Locked,
    /// Every increment is a single atomic fetch-and-add
    #[default]
    Atomic,
    /// Increments are a separate load and store with no coordination.
    ///
    /// Concurrent workers overwrite each other's updates, so the final count
    /// is usually lower than expected. This is the intended outcome.
    #[serde(rename = "unsync", alias = "unsynchronized")]
    Unsynchronized,
}

impl CoordinationPolicy {
    /// All policies, in display order
    pub const ALL: [CoordinationPolicy; 3] = [
        CoordinationPolicy::Locked,
        CoordinationPolicy::Atomic,
        CoordinationPolicy::Unsynchronized,
    ];

    /// Short name used on the command line and in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinationPolicy::Locked => "locked",
            CoordinationPolicy::Atomic => "atomic",
            CoordinationPolicy::Unsynchronized => "unsync",
        }
    }

    /// Whether the policy guarantees a final count of exactly workers x iterations
    pub fn is_exact(&self) -> bool {
        !matches!(self, CoordinationPolicy::Unsynchronized)
    }
}

impl fmt::Display for CoordinationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoordinationPolicy {
    type Err = ThreadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "locked" | "lock" | "mutex" => Ok(CoordinationPolicy::Locked),
            "atomic" => Ok(CoordinationPolicy::Atomic),
            "unsync" | "unsynchronized" | "none" => Ok(CoordinationPolicy::Unsynchronized),
            _ => Err(ThreadError::invalid_policy(s)),
        }
    }
}
