//! Error taxonomy for plan compilation and workload distribution.
//!
//! Every other crate in the workspace defines its own `thiserror` enum for
//! its own concern (`BlobError`, `ProviderError`, `AggregatorError`, ...);
//! `crates/orchestrator` stitches them together into one top-level error.

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid plan: {}", .violations.join("; "))]
pub struct InvalidPlan {
    /// Every failing constraint, not just the first one encountered.
    pub violations: Vec<String>,
}

impl InvalidPlan {
    #[must_use]
    pub fn new(violations: Vec<String>) -> Self {
        debug_assert!(!violations.is_empty(), "InvalidPlan requires a violation");
        Self { violations }
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum InvalidDistribution {
    #[error("total_vus must be >= 1, got {0}")]
    TotalVusNotPositive(i64),
    #[error("per_worker_vus must be >= 1, got {0}")]
    PerWorkerVusNotPositive(i64),
}
