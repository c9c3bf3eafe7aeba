//! Cooperative cancellation for worker loops
//!
//! Workers never get killed from the outside. Instead every worker holds a
//! [`CancellationToken`] and checks it between iterations, so a cancelled
//! worker always stops at an iteration boundary and the shared counter is
//! left holding a whole, partially-incremented value.
//!
//! Tokens form a tree: a pool configured with a parent token runs on a child
//! of it, so one parent can stop several pools at once.
//!
//! # Example
//!
//! ```rust
//! use rust_worker_harness::CancellationToken;
//!
//! let parent = CancellationToken::new();
//! let child1 = parent.child();
//! let child2 = parent.child();
//!
//! // Cancel parent - all children are also cancelled
//! parent.cancel();
//!
//! assert!(parent.is_cancelled());
//! assert!(child1.is_cancelled());
//! assert!(child2.is_cancelled());
//! ```

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Reason for cancellation
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CancellationReason {
    /// Explicitly cancelled via `cancel()`
    Manual,
    /// Cancelled because the configured run timeout expired
    Timeout(Duration),
    /// Cancelled because the parent token was cancelled
    ParentCancelled,
    /// Cancelled because a sibling worker could not be started
    SpawnFailed,
}

impl std::fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancellationReason::Manual => write!(f, "manually cancelled"),
            CancellationReason::Timeout(d) => write!(f, "timeout after {:?}", d),
            CancellationReason::ParentCancelled => write!(f, "parent was cancelled"),
            CancellationReason::SpawnFailed => write!(f, "worker spawn failed"),
        }
    }
}

struct CancellationTokenInner {
    cancelled: AtomicBool,
    /// Weak so that dropped children are not kept alive by the parent
    children: RwLock<Vec<Weak<CancellationTokenInner>>>,
    reason: RwLock<Option<CancellationReason>>,
}

impl CancellationTokenInner {
    fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            children: RwLock::new(Vec::new()),
            reason: RwLock::new(None),
        }
    }
}

/// A thread-safe cancellation flag shared between a pool and its workers
///
/// # Example
///
/// ```rust
/// use rust_worker_harness::CancellationToken;
/// use std::thread;
/// use std::time::Duration;
///
/// let token = CancellationToken::new();
/// let token_clone = token.clone();
///
/// let handle = thread::spawn(move || {
///     for _ in 0..100 {
///         if token_clone.is_cancelled() {
///             return "Cancelled";
///         }
///         thread::sleep(Duration::from_millis(10));
///     }
///     "Completed"
/// });
///
/// thread::sleep(Duration::from_millis(50));
/// token.cancel();
///
/// assert_eq!(handle.join().unwrap(), "Cancelled");
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<CancellationTokenInner>,
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

impl CancellationToken {
    /// Create a new cancellation token (not cancelled)
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancellationTokenInner::new()),
        }
    }

    /// Creates a child token linked to this parent
    ///
    /// The child is cancelled when the parent is cancelled. If the parent is
    /// already cancelled, the child starts out cancelled.
    pub fn child(&self) -> Self {
        let child = CancellationToken {
            inner: Arc::new(CancellationTokenInner::new()),
        };

        {
            let mut children = self.inner.children.write();
            children.retain(|weak| weak.strong_count() > 0);
            children.push(Arc::downgrade(&child.inner));
        }

        if self.is_cancelled() {
            child.cancel_with_reason(CancellationReason::ParentCancelled);
        }

        child
    }

    /// Cancel this token with default reason (Manual)
    ///
    /// Idempotent. Only the first call sets the reason.
    pub fn cancel(&self) {
        self.cancel_with_reason(CancellationReason::Manual);
    }

    /// Cancel this token and all of its children with a specific reason
    pub fn cancel_with_reason(&self, reason: CancellationReason) {
        // Reason is written before the flag is published
        {
            let mut slot = self.inner.reason.write();
            if slot.is_some() {
                return;
            }
            *slot = Some(reason);
        }
        self.inner.cancelled.store(true, Ordering::Release);

        let children = self.inner.children.read();
        for child_weak in children.iter() {
            if let Some(child_inner) = child_weak.upgrade() {
                CancellationToken { inner: child_inner }
                    .cancel_with_reason(CancellationReason::ParentCancelled);
            }
        }
    }

    /// Check if this token has been cancelled
    ///
    /// Lock-free, suitable for checking on every loop iteration.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Returns the cancellation reason, `None` if not cancelled
    pub fn reason(&self) -> Option<CancellationReason> {
        self.inner.reason.read().clone()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
