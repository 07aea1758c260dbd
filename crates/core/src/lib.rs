//! Shared data model, plan compilation, and workload distribution for the
//! load-test orchestrator.

pub mod distribute;
pub mod error;
pub mod plan;
pub mod worker;

pub use distribute::distribute;
pub use error::{InvalidDistribution, InvalidPlan};
pub use plan::{PlanRequest, ResourceShape, RunPlan, TestKind};
pub use worker::{WorkerAssignment, WorkerHandle, WorkerState};

/// The single cancellation token threaded through every long-latency
/// operation in the orchestrator. Re-exported from one place so every
/// crate in the workspace shares the same type.
pub use tokio_util::sync::CancellationToken;
