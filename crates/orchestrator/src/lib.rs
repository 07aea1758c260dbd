//! The top-level Orchestrator: wires Plan Compiler -> Workload
//! Distributor -> Container Manager -> Result Aggregator -> Metrics
//! Analyzer into a single `Orchestrator::run(request) -> RunOutcome`
//! entry point.
//!
//! Generic over both capability traits, the same way
//! `loadtest_container::ContainerManager` is, so the binary can plug in
//! `DockerContainerClient`/`S3BlobClient` while tests plug in
//! `FakeContainerClient`/`InMemoryBlobClient`.

mod error;
mod outcome;

use std::sync::Arc;

use loadtest_analyze::{Context, analyze};
use loadtest_blob::{BlobClient, BlobName};
use loadtest_container::{ContainerClient, ContainerManager};
use loadtest_core::{CancellationToken, PlanRequest, RunPlan, WorkerAssignment, compile, distribute};
use tokio::time::sleep;
use tracing::{info, warn};

pub use error::OrchestratorError;
pub use outcome::{RunOutcome, RunStatus, exit_code};

pub struct Orchestrator<C, B> {
    container: Arc<C>,
    blob: Arc<B>,
}

impl<C, B> Orchestrator<C, B>
where
    C: ContainerClient + 'static,
    B: BlobClient + 'static,
{
    pub fn new(container: Arc<C>, blob: Arc<B>) -> Self {
        Self { container, blob }
    }

    /// Compiles `request`, distributes VUs, drives every worker through
    /// the Container Manager, aggregates whatever results exist, and
    /// grades the result. Races all-workers-terminal against `cancel`
    /// and a hard deadline; on deadline expiry the token is tripped so
    /// the run is treated the same as an explicit cancellation.
    pub async fn run(
        &self,
        request: PlanRequest,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, OrchestratorError> {
        let plan = compile(request)?;
        info!(run_id = %plan.run_id, total_vus = plan.total_vus, "plan compiled");

        let assignments = distribute(plan.total_vus, plan.per_worker_vus)
            .expect("compile() already validated total_vus/per_worker_vus >= 1");

        Ok(self.run_plan(&plan, &assignments, cancel).await)
    }

    /// The same pipeline as [`Self::run`] minus plan compilation, exposed
    /// so callers that already hold a compiled [`RunPlan`] (e.g. tests
    /// that need to know `run_id` ahead of time to script a fake
    /// provider) can drive it directly.
    pub async fn run_plan(
        &self,
        plan: &RunPlan,
        assignments: &[WorkerAssignment],
        cancel: CancellationToken,
    ) -> RunOutcome {
        let hard_deadline = plan.hard_deadline();
        let manager = ContainerManager::new(Arc::clone(&self.container), Arc::clone(&self.blob));

        // Pinned so the losing `select!` branch never drops the in-flight
        // run: dropping it would abandon its spawned per-worker tasks
        // mid-teardown. On deadline expiry we instead trip the token and
        // keep awaiting the same future until the manager unwinds itself.
        let manager_fut = manager.run(plan, assignments, cancel.clone());
        tokio::pin!(manager_fut);

        let manager_outcome = tokio::select! {
            biased;
            outcome = &mut manager_fut => outcome,
            () = sleep(hard_deadline) => {
                warn!(run_id = %plan.run_id, ?hard_deadline, "hard deadline exceeded, cancelling run");
                cancel.cancel();
                manager_fut.await
            }
        };

        let deadline_tripped = cancel.is_cancelled();

        let aggregation = loadtest_aggregate::aggregate(plan, &manager_outcome.handles, self.blob.as_ref()).await;

        let context = Context {
            test_kind: plan.test_kind,
            target_url: plan.target_url.clone(),
            duration_s: plan.duration_secs() as f64,
            total_vus: plan.total_vus,
            worker_count: assignments.len(),
            successful_workers: aggregation.manifest.successful_workers,
            cancelled: deadline_tripped,
        };
        let mut report = analyze(&aggregation.summary, &context);

        if deadline_tripped && !report.findings.iter().any(|f| f.category == "cancelled") {
            report.findings.insert(
                0,
                loadtest_analyze::Finding {
                    severity: loadtest_analyze::Severity::Low,
                    category: "cancelled".to_owned(),
                    title: "Run was cancelled".to_owned(),
                    detail: "the run was cancelled before every worker reached a terminal state"
                        .to_owned(),
                    supporting_metrics: Vec::new(),
                    recommended_action: "re-run once the cancellation trigger is understood"
                        .to_owned(),
                },
            );
        }

        let status = RunStatus::from_counts(
            aggregation.manifest.successful_workers,
            assignments.len(),
            deadline_tripped,
        );

        if let Some(upload_error) = &aggregation.upload_error {
            warn!(run_id = %plan.run_id, error = %upload_error, "final summary upload failed");
        }

        let report_bytes =
            serde_json::to_vec(&report).expect("PerformanceReport serialization cannot fail");
        let report_upload_error = self
            .blob
            .put(
                &plan.blob_namespace,
                BlobName::performance_report(&plan.run_id).as_str(),
                report_bytes.into(),
            )
            .await
            .err();
        if let Some(err) = &report_upload_error {
            warn!(run_id = %plan.run_id, error = %err, "performance report upload failed");
        }

        let orchestrator_error = aggregation
            .upload_error
            .map(|e| e.to_string())
            .or_else(|| report_upload_error.map(|e| e.to_string()));

        RunOutcome {
            run_id: plan.run_id.clone(),
            status,
            terminal_worker_states: manager_outcome.handles,
            canonical_summary_location: BlobName::aggregated_summary(&plan.run_id).to_string(),
            manifest: aggregation.manifest,
            report,
            orchestrator_error,
        }
    }
}
