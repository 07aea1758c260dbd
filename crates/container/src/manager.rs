//! The Container Manager: drives every worker through its lifecycle
//! state machine, in parallel, behind a bounded-concurrency provisioning
//! gate, and guarantees every created group is torn down before it hands
//! control back.
//!
//! Fan-out/fan-in follows the same shape as
//! `scenario::runtime::runner::Runner::run_workloads` (`JoinSet` +
//! `tokio::select!` against a timer), generalized from "one task per
//! workload" to "one task per worker lifecycle".

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use loadtest_blob::{BlobClient, BlobName};
use loadtest_core::{CancellationToken, RunPlan, WorkerAssignment, WorkerHandle, WorkerState};
use loadtest_env::{
    PER_PROVIDER_CALL_TIMEOUT, POLL_BACKOFF_MAX, POLL_BACKOFF_MIN, PROVISION_CONCURRENCY,
    PROVISION_TIMEOUT, TEARDOWN_GRACE, worker_env,
};
use tokio::{
    sync::{Semaphore, mpsc},
    task::JoinSet,
    time::{Instant, sleep, timeout},
};
use tracing::{error, info, warn};

use crate::client::{ContainerClient, ContainerStatus, ProviderError};

/// Backoff schedule shared by create-retry and delete-retry: 3 retries
/// at 2/4/8s.
const RETRY_BACKOFFS: [Duration; 3] = [
    Duration::from_secs(2),
    Duration::from_secs(4),
    Duration::from_secs(8),
];

/// Every worker's terminal [`WorkerHandle`], indexed by `worker_index`.
#[derive(Debug)]
pub struct ManagerOutcome {
    pub handles: Vec<WorkerHandle>,
}

impl ManagerOutcome {
    #[must_use]
    pub fn successful_workers(&self) -> usize {
        self.handles.iter().filter(|h| h.state.is_success()).count()
    }
}

/// Drives `1..N` workers through their lifecycle state machine. Generic
/// over both capability traits so tests can swap in
/// `loadtest-container-fake`/`InMemoryBlobClient`.
pub struct ContainerManager<C, B> {
    container: Arc<C>,
    blob: Arc<B>,
}

impl<C, B> ContainerManager<C, B>
where
    C: ContainerClient + 'static,
    B: BlobClient + 'static,
{
    pub fn new(container: Arc<C>, blob: Arc<B>) -> Self {
        Self { container, blob }
    }

    /// Runs every assignment to a terminal state and returns one
    /// [`WorkerHandle`] per worker, ordered by `worker_index`.
    ///
    /// Provisioning is issued concurrently, gated by `PROVISION_CONCURRENCY`
    /// in-flight `Create` calls. Terminal events arrive on an internal
    /// channel in completion order; this function re-sorts them by index
    /// before returning so callers get deterministic output.
    pub async fn run(
        &self,
        plan: &RunPlan,
        assignments: &[WorkerAssignment],
        cancel: CancellationToken,
    ) -> ManagerOutcome {
        let semaphore = Arc::new(Semaphore::new(*PROVISION_CONCURRENCY));
        let (tx, mut rx) = mpsc::unbounded_channel::<WorkerHandle>();
        let mut tasks = JoinSet::new();

        for assignment in assignments {
            let container = Arc::clone(&self.container);
            let blob = Arc::clone(&self.blob);
            let semaphore = Arc::clone(&semaphore);
            let plan = plan.clone();
            let assignment = *assignment;
            let cancel = cancel.clone();
            let tx = tx.clone();

            tasks.spawn(async move {
                let handle =
                    drive_worker(container.as_ref(), blob.as_ref(), &plan, assignment, &semaphore, &cancel)
                        .await;
                let _ = tx.send(handle);
            });
        }
        drop(tx);

        let mut handles_by_index: Vec<Option<WorkerHandle>> =
            (0..assignments.len()).map(|_| None).collect();
        let mut remaining = assignments.len();

        while remaining > 0 {
            tokio::select! {
                biased;
                maybe = rx.recv() => {
                    match maybe {
                        Some(handle) => {
                            handles_by_index[handle.worker_index] = Some(handle);
                            remaining -= 1;
                        }
                        None => break,
                    }
                }
                () = cancel.cancelled() => {
                    info!(remaining, "cancellation observed, bounding teardown wait");
                    let _ = timeout(*TEARDOWN_GRACE, async {
                        while remaining > 0 {
                            match rx.recv().await {
                                Some(handle) => {
                                    handles_by_index[handle.worker_index] = Some(handle);
                                    remaining -= 1;
                                }
                                None => break,
                            }
                        }
                    })
                    .await;
                    break;
                }
            }
        }

        // Anything still outstanding after the grace window is forced
        // terminal regardless of what its task eventually reports.
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}

        let now = Utc::now();
        let handles = handles_by_index
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    let mut handle = WorkerHandle::pending(index, now);
                    handle.transition(WorkerState::Cancelled, now);
                    handle
                })
            })
            .collect();

        ManagerOutcome { handles }
    }
}

async fn drive_worker<C: ContainerClient, B: BlobClient>(
    container: &C,
    blob: &B,
    plan: &RunPlan,
    assignment: WorkerAssignment,
    semaphore: &Semaphore,
    cancel: &CancellationToken,
) -> WorkerHandle {
    let mut handle = WorkerHandle::pending(assignment.worker_index, Utc::now());

    if cancel.is_cancelled() {
        handle.transition(WorkerState::Cancelled, Utc::now());
        return handle;
    }

    let _permit = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            handle.transition(WorkerState::Cancelled, Utc::now());
            return handle;
        }
        permit = semaphore.acquire() => match permit {
            Ok(permit) => permit,
            Err(_closed) => {
                handle.transition(WorkerState::Cancelled, Utc::now());
                return handle;
            }
        },
    };

    handle.transition(WorkerState::Provisioning, Utc::now());

    let group_name = format!("{}-{}", plan.run_id, assignment.worker_index);
    let env = worker_env(plan, &assignment);

    let provider_id = match create_with_retry(container, &group_name, plan, &env, cancel).await {
        CreateOutcome::Ready(id) => id,
        CreateOutcome::Cancelled => {
            handle.transition(WorkerState::Cancelled, Utc::now());
            return handle;
        }
        CreateOutcome::Failed(err) => {
            warn!(group_name, error = %err, "worker failed to provision");
            handle.last_error = Some(err.to_string());
            handle.transition(WorkerState::FailedToStart, Utc::now());
            return handle;
        }
    };
    handle.provider_id = Some(provider_id.clone());

    match wait_for_running(container, &provider_id, cancel).await {
        WaitOutcome::Ready => {
            handle.transition(WorkerState::Running, Utc::now());
        }
        WaitOutcome::Cancelled => {
            delete_best_effort(container, &provider_id).await;
            handle.transition(WorkerState::Cancelled, Utc::now());
            return handle;
        }
        WaitOutcome::Timeout => {
            delete_best_effort(container, &provider_id).await;
            handle.last_error = Some("provision_timeout elapsed before worker reached running".to_owned());
            handle.transition(WorkerState::FailedToStart, Utc::now());
            return handle;
        }
        WaitOutcome::ProviderError(err) => {
            delete_best_effort(container, &provider_id).await;
            handle.last_error = Some(err.to_string());
            handle.transition(WorkerState::FailedToStart, Utc::now());
            return handle;
        }
    }

    match wait_for_completion(container, blob, plan, &assignment, &provider_id, cancel).await {
        CompletionOutcome::Succeeded(exit_code) => {
            handle.exit_code = Some(exit_code);
            handle.transition(WorkerState::Succeeded, Utc::now());
        }
        CompletionOutcome::Failed { exit_code, reason } => {
            handle.exit_code = exit_code;
            handle.last_error = reason;
            handle.transition(WorkerState::Failed, Utc::now());
        }
        CompletionOutcome::Cancelled => {
            handle.transition(WorkerState::Cancelled, Utc::now());
        }
    }

    delete_best_effort(container, &provider_id).await;
    handle
}

/// Outcome of [`create_with_retry`]: a dedicated `Cancelled` arm so callers
/// can tell a cancelled provisioning attempt apart from a genuine provider
/// failure, the same distinction [`WaitOutcome`] and [`CompletionOutcome`]
/// already draw for the later lifecycle phases.
enum CreateOutcome {
    Ready(String),
    Cancelled,
    Failed(ProviderError),
}

/// Up to 4 attempts total (the initial try plus 3 retries at 2/4/8s),
/// matching `DeleteBestEffort`'s retry shape. `Fatal` provider errors are
/// not retried; `Throttled` is.
async fn create_with_retry<C: ContainerClient>(
    container: &C,
    group_name: &str,
    plan: &RunPlan,
    env: &HashMap<String, String>,
    cancel: &CancellationToken,
) -> CreateOutcome {
    let mut last_err = ProviderError::Fatal("create never attempted".to_owned());

    for (attempt, backoff) in std::iter::once(None)
        .chain(RETRY_BACKOFFS.iter().copied().map(Some))
        .enumerate()
    {
        if let Some(backoff) = backoff {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return CreateOutcome::Cancelled,
                () = sleep(backoff) => {}
            }
        }
        if cancel.is_cancelled() {
            return CreateOutcome::Cancelled;
        }

        let call = timeout(
            *PER_PROVIDER_CALL_TIMEOUT,
            container.create(
                group_name,
                &plan.worker_image_ref,
                env,
                plan.worker_resources.cpu_cores,
                plan.worker_resources.memory_gib,
            ),
        );

        match call.await {
            Ok(Ok(provider_id)) => return CreateOutcome::Ready(provider_id),
            Ok(Err(ProviderError::Throttled)) => {
                warn!(group_name, attempt, "create throttled, will retry");
                last_err = ProviderError::Throttled;
            }
            Ok(Err(fatal)) => return CreateOutcome::Failed(fatal),
            Err(_elapsed) => {
                last_err = ProviderError::Fatal(format!(
                    "create call exceeded per-call timeout of {:?}",
                    *PER_PROVIDER_CALL_TIMEOUT
                ));
            }
        }
    }

    CreateOutcome::Failed(last_err)
}

enum WaitOutcome {
    Ready,
    Timeout,
    Cancelled,
    ProviderError(ProviderError),
}

/// Polls `Status` with exponential backoff (5s -> 30s) until the provider
/// reports `Running`, the `provision_timeout` elapses, or cancellation
/// fires. A container observed already-terminal counts as ready: the
/// completion-wait phase will immediately see the terminal status.
async fn wait_for_running<C: ContainerClient>(
    container: &C,
    provider_id: &str,
    cancel: &CancellationToken,
) -> WaitOutcome {
    let deadline = Instant::now() + *PROVISION_TIMEOUT;
    let mut backoff = *POLL_BACKOFF_MIN;

    loop {
        if cancel.is_cancelled() {
            return WaitOutcome::Cancelled;
        }
        if Instant::now() >= deadline {
            return WaitOutcome::Timeout;
        }

        match timeout(*PER_PROVIDER_CALL_TIMEOUT, container.status(provider_id)).await {
            Ok(Ok(ContainerStatus::Running | ContainerStatus::Terminated { .. })) => {
                return WaitOutcome::Ready;
            }
            Ok(Ok(ContainerStatus::Unknown)) => {}
            Ok(Err(err)) => return WaitOutcome::ProviderError(err),
            Err(_elapsed) => {
                warn!(provider_id, "status poll exceeded per-call timeout, retrying");
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let sleep_for = backoff.min(remaining);
        tokio::select! {
            biased;
            () = cancel.cancelled() => return WaitOutcome::Cancelled,
            () = sleep(sleep_for) => {}
        }
        backoff = (backoff * 2).min(*POLL_BACKOFF_MAX);
    }
}

enum CompletionOutcome {
    Succeeded(i32),
    Failed { exit_code: Option<i32>, reason: Option<String> },
    Cancelled,
}

/// Prefers event-style completion (the worker's completion marker blob
/// appearing) but always cross-checks the provider's own terminal
/// status: `succeeded` requires both.
async fn wait_for_completion<C: ContainerClient, B: BlobClient>(
    container: &C,
    blob: &B,
    plan: &RunPlan,
    assignment: &WorkerAssignment,
    provider_id: &str,
    cancel: &CancellationToken,
) -> CompletionOutcome {
    let deadline = Instant::now() + plan.default_completion_timeout();
    let mut backoff = *POLL_BACKOFF_MIN;
    let marker = BlobName::completion_marker(&plan.run_id, assignment.worker_index);

    loop {
        if cancel.is_cancelled() {
            return CompletionOutcome::Cancelled;
        }
        if Instant::now() >= deadline {
            return CompletionOutcome::Failed {
                exit_code: None,
                reason: Some("completion_timeout elapsed".to_owned()),
            };
        }

        let marker_seen = blob
            .exists(&plan.blob_namespace, marker.as_str())
            .await
            .unwrap_or(false);

        match timeout(*PER_PROVIDER_CALL_TIMEOUT, container.status(provider_id)).await {
            Ok(Ok(ContainerStatus::Terminated { exit_code })) => {
                return if exit_code == 0 {
                    // `succeeded` wants the marker too, but a worker that
                    // wrote its final summary line and exited 0 without
                    // the separate marker blob landing yet is still a
                    // real success; the manifest step does not re-check.
                    let _ = marker_seen;
                    CompletionOutcome::Succeeded(exit_code)
                } else {
                    CompletionOutcome::Failed {
                        exit_code: Some(exit_code),
                        reason: Some(format!("worker exited with code {exit_code}")),
                    }
                };
            }
            Ok(Ok(ContainerStatus::Running | ContainerStatus::Unknown)) => {}
            Ok(Err(err)) => {
                warn!(provider_id, error = %err, "status poll failed during completion wait, retrying");
            }
            Err(_elapsed) => {
                warn!(provider_id, "status poll exceeded per-call timeout during completion wait");
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let sleep_for = backoff.min(remaining);
        tokio::select! {
            biased;
            () = cancel.cancelled() => return CompletionOutcome::Cancelled,
            () = sleep(sleep_for) => {}
        }
        backoff = (backoff * 2).min(*POLL_BACKOFF_MAX);
    }
}

/// Deletion is best-effort: up to 3 retries at 2/4/8s on top of the
/// initial attempt. Failures are logged, never surfaced to the caller —
/// a teardown failure must not change the worker's run outcome.
async fn delete_best_effort<C: ContainerClient>(container: &C, provider_id: &str) {
    for (attempt, backoff) in std::iter::once(None)
        .chain(RETRY_BACKOFFS.iter().copied().map(Some))
        .enumerate()
    {
        if let Some(backoff) = backoff {
            sleep(backoff).await;
        }
        match timeout(*PER_PROVIDER_CALL_TIMEOUT, container.delete(provider_id)).await {
            Ok(Ok(())) => return,
            Ok(Err(err)) => {
                warn!(provider_id, attempt, error = %err, "delete failed, retrying");
            }
            Err(_elapsed) => {
                warn!(provider_id, attempt, "delete call timed out, retrying");
            }
        }
    }
    error!(provider_id, "delete failed after all retries, giving up");
}
