//! The orchestrator's top-level error, wrapping every per-crate error
//! enum following the workspace's one-error-enum-per-crate convention.

use loadtest_core::InvalidPlan;

/// Surfaces only before a [`crate::RunOutcome`] can be produced at all —
/// everything else (provider failures, partial aggregation, blob
/// unavailability) is absorbed into the outcome instead of propagated as
/// an error.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    InvalidPlan(#[from] InvalidPlan),
}
