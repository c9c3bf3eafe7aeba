//! Summary of a completed pool run

use crate::core::{CancellationReason, CoordinationPolicy, Result};
use crate::pool::worker::WorkerStatSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// What a joined run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Pool that performed the run
    pub pool_id: Uuid,
    /// Coordination policy in effect
    pub policy: CoordinationPolicy,
    /// Number of workers spawned
    pub workers: usize,
    /// Increments each worker was asked to perform
    pub iterations_per_worker: u64,
    /// workers x iterations_per_worker
    pub expected: u64,
    /// Counter value after every worker was joined
    pub final_count: u64,
    /// Sum of increments the workers report having applied
    pub increments_applied: u64,
    /// Whether the run was cut short by cancellation
    pub cancelled: bool,
    /// Why the run was cancelled, if it was
    pub cancellation_reason: Option<CancellationReason>,
    /// When the workers were released
    pub started_at: DateTime<Utc>,
    /// When the last worker was joined
    pub finished_at: DateTime<Utc>,
    /// Per-worker statistics, ordered by worker id
    pub worker_stats: Vec<WorkerStatSnapshot>,
}

impl RunReport {
    /// Increments that were applied but are missing from the final count.
    ///
    /// Always zero for exact policies; the visible race under
    /// [`CoordinationPolicy::Unsynchronized`].
    pub fn lost_updates(&self) -> u64 {
        self.increments_applied.saturating_sub(self.final_count)
    }

    /// Whether the final count matches what the workers applied
    pub fn is_consistent(&self) -> bool {
        self.final_count == self.increments_applied
    }

    /// Wall-clock duration of the run in milliseconds
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Render the report as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
