//! Shared counter with a per-policy representation

use crate::core::policy::CoordinationPolicy;
use crossbeam_utils::CachePadded;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

enum Cell {
    Locked(Mutex<u64>),
    Atomic(CachePadded<AtomicU64>),
    // Plain load/store pairs on an atomic: updates race and get lost,
    // but every read still sees a whole value.
    Unsynchronized(CachePadded<AtomicU64>),
}

/// An integer counter shared by every worker of a pool
///
/// The storage is chosen by the [`CoordinationPolicy`] at construction and
/// cannot change afterwards.
///
/// # Example
///
/// ```rust
/// use rust_worker_harness::{CoordinationPolicy, SharedCounter};
///
/// let counter = SharedCounter::new(CoordinationPolicy::Locked);
/// counter.increment();
/// counter.increment();
/// assert_eq!(counter.get(), 2);
/// ```
pub struct SharedCounter {
    policy: CoordinationPolicy,
    cell: Cell,
}

impl std::fmt::Debug for SharedCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCounter")
            .field("policy", &self.policy)
            .field("value", &self.get())
            .finish()
    }
}

impl SharedCounter {
    /// Create a zeroed counter for the given policy
    pub fn new(policy: CoordinationPolicy) -> Self {
        let cell = match policy {
            CoordinationPolicy::Locked => Cell::Locked(Mutex::new(0)),
            CoordinationPolicy::Atomic => Cell::Atomic(CachePadded::new(AtomicU64::new(0))),
            CoordinationPolicy::Unsynchronized => {
                Cell::Unsynchronized(CachePadded::new(AtomicU64::new(0)))
            }
        };
        Self { policy, cell }
    }

    /// The policy this counter was built for
    pub fn policy(&self) -> CoordinationPolicy {
        self.policy
    }

    /// Apply one increment using the counter's policy
    #[inline]
    pub fn increment(&self) {
        match &self.cell {
            Cell::Locked(value) => {
                let mut guard = value.lock();
                *guard = guard.wrapping_add(1);
            }
            Cell::Atomic(value) => {
                value.fetch_add(1, Ordering::Relaxed);
            }
            Cell::Unsynchronized(value) => {
                let current = value.load(Ordering::Relaxed);
                value.store(current.wrapping_add(1), Ordering::Relaxed);
            }
        }
    }

    /// Read the current value
    pub fn get(&self) -> u64 {
        match &self.cell {
            Cell::Locked(value) => *value.lock(),
            Cell::Atomic(value) | Cell::Unsynchronized(value) => value.load(Ordering::Acquire),
        }
    }
}
