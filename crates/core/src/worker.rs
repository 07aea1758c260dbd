//! Per-worker assignment and lifecycle handle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One worker's slice of the overall VU budget. `run_plan` is not embedded
/// directly (it would duplicate the whole plan N times); callers that need
/// plan context alongside an assignment keep `RunPlan` and
/// `[WorkerAssignment]` side by side, as the Orchestrator does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerAssignment {
    pub worker_index: usize,
    pub worker_count: usize,
    pub vus_for_worker: i64,
}

/// A worker's lifecycle state. Tagged variant, not a bare string, per the
/// Design Notes; serializes to a stable `snake_case` tag at the blob/
/// manifest boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Pending,
    Provisioning,
    Running,
    Succeeded,
    Failed,
    FailedToStart,
    Cancelled,
}

impl WorkerState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::FailedToStart | Self::Cancelled
        )
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Opaque provider-assigned identifier for a provisioned container group,
/// plus its observed lifecycle state. Owned exclusively by the Container
/// Manager; every other component only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerHandle {
    pub worker_index: usize,
    pub provider_id: Option<String>,
    pub state: WorkerState,
    pub created_at: DateTime<Utc>,
    pub last_observed_at: DateTime<Utc>,
    pub exit_code: Option<i32>,
    pub last_error: Option<String>,
}

impl WorkerHandle {
    #[must_use]
    pub fn pending(worker_index: usize, now: DateTime<Utc>) -> Self {
        Self {
            worker_index,
            provider_id: None,
            state: WorkerState::Pending,
            created_at: now,
            last_observed_at: now,
            exit_code: None,
            last_error: None,
        }
    }

    pub fn transition(&mut self, state: WorkerState, now: DateTime<Utc>) {
        self.state = state;
        self.last_observed_at = now;
    }
}
