//! End-to-end scenarios, driven against `FakeContainerClient` +
//! `InMemoryBlobClient` rather than a live provider/object store, so a
//! lifecycle state machine can be exercised deterministically without a
//! Docker daemon or object store.

use std::{collections::HashMap, sync::Arc};

use bytes::Bytes;
use loadtest_blob::{BlobClient, BlobName, InMemoryBlobClient};
use loadtest_container_fake::{FakeContainerClient, WorkerScript};
use loadtest_core::{CancellationToken, PlanRequest, ResourceShape, TestKind, WorkerState, compile, distribute};
use loadtest_orchestrator::{Orchestrator, RunStatus, exit_code};

fn request(total_vus: i64, per_worker_vus: i64, duration: &str) -> PlanRequest {
    PlanRequest {
        target_url: "https://example.com".to_owned(),
        test_kind: TestKind::Protocol,
        total_vus,
        duration: duration.to_owned(),
        per_worker_vus,
        worker_resources: ResourceShape {
            cpu_cores: 1.0,
            memory_gib: 1.0,
        },
        worker_image_ref: "registry.example.com/loadtest-worker:1.0".to_owned(),
        blob_namespace: "ns".to_owned(),
        env_overrides: HashMap::new(),
    }
}

fn points_body(count: usize, start: f64, end: f64) -> Bytes {
    let mut body = String::new();
    for i in 0..count {
        let value = if count <= 1 {
            start
        } else {
            start + (end - start) * (i as f64 / (count - 1) as f64)
        };
        body.push_str(&format!(
            r#"{{"kind":"Point","metric":"http_req_duration","data":{{"time":"2026-01-01T00:00:00Z","value":{value},"tags":{{}}}}}}"#
        ));
        body.push('\n');
        body.push_str(
            r#"{"kind":"Point","metric":"http_reqs","data":{"time":"2026-01-01T00:00:00Z","value":1,"tags":{}}}"#,
        );
        body.push('\n');
    }
    Bytes::from(body)
}

/// Scenario 1: both workers succeed, 300 samples each, 100..400ms range.
/// Expected: `worker_count=2`, `http_req_duration.count=600`, grade A, no
/// `server_processing` finding.
#[tokio::test(start_paused = true)]
async fn scenario_one_two_healthy_workers_grade_a() {
    let plan = compile(request(10, 5, "1m")).unwrap();
    let assignments = distribute(plan.total_vus, plan.per_worker_vus).unwrap();
    assert_eq!(assignments.len(), 2);

    let container = Arc::new(FakeContainerClient::new());
    let blob = Arc::new(InMemoryBlobClient::new());
    for assignment in &assignments {
        let group_name = format!("{}-{}", plan.run_id, assignment.worker_index);
        container.script(group_name, WorkerScript::succeeds()).await;
        blob.put(
            &plan.blob_namespace,
            BlobName::summary(&plan.run_id, assignment.worker_index).as_str(),
            points_body(300, 100.0, 400.0),
        )
        .await
        .unwrap();
    }

    let orchestrator = Orchestrator::new(Arc::clone(&container), Arc::clone(&blob));
    let outcome = orchestrator.run_plan(&plan, &assignments, CancellationToken::new()).await;

    assert_eq!(outcome.status, RunStatus::Ok);
    assert_eq!(exit_code(&outcome), 0);
    assert_eq!(outcome.manifest.worker_count, 2);
    let duration_stats = outcome.report.canonical_summary.get("http_req_duration").unwrap();
    assert_eq!(duration_stats.count, 600);
    assert!((duration_stats.min - 100.0).abs() < 1.0);
    assert!((duration_stats.max - 400.0).abs() < 1.0);
    assert_eq!(outcome.report.grade, loadtest_analyze::Grade::A);
    assert!(!outcome.report.findings.iter().any(|f| f.category == "server_processing"));

    let report_bytes = blob
        .get(&plan.blob_namespace, BlobName::performance_report(&plan.run_id).as_str())
        .await
        .unwrap();
    let reuploaded: loadtest_analyze::PerformanceReport = serde_json::from_slice(&report_bytes).unwrap();
    assert_eq!(reuploaded.grade, outcome.report.grade);
}

/// Scenario 2: worker 0 and 1 succeed (150 samples each, p95=1500ms),
/// worker 2 fails to start. Expected: degraded, exit 2, worker_dropout
/// finding, manifest `successful_workers=2`.
#[tokio::test(start_paused = true)]
async fn scenario_two_one_worker_fails_to_start_is_degraded() {
    let plan = compile(request(3, 1, "30s")).unwrap();
    let assignments = distribute(plan.total_vus, plan.per_worker_vus).unwrap();
    assert_eq!(assignments.len(), 3);

    let container = Arc::new(FakeContainerClient::new());
    let blob = Arc::new(InMemoryBlobClient::new());

    for (index, script) in [
        (0usize, WorkerScript::succeeds()),
        (1, WorkerScript::succeeds()),
        (2, WorkerScript::never_starts()),
    ] {
        container.script(format!("{}-{index}", plan.run_id), script).await;
    }
    for index in [0usize, 1] {
        blob.put(
            &plan.blob_namespace,
            BlobName::summary(&plan.run_id, index).as_str(),
            points_body(150, 1500.0, 1500.0),
        )
        .await
        .unwrap();
    }

    let orchestrator = Orchestrator::new(Arc::clone(&container), Arc::clone(&blob));
    let outcome = orchestrator.run_plan(&plan, &assignments, CancellationToken::new()).await;

    assert_eq!(outcome.status, RunStatus::Degraded);
    assert_eq!(exit_code(&outcome), 2);
    assert_eq!(outcome.manifest.successful_workers, 2);
    assert!(outcome.manifest.partial);
    assert!(outcome.report.findings.iter().any(|f| f.category == "worker_dropout"));
}

/// Scenario 3: cancellation fires immediately. Expected: all workers
/// `cancelled`, exit 4, report still present.
#[tokio::test(start_paused = true)]
async fn scenario_three_immediate_cancellation_yields_exit_four() {
    let plan = compile(request(3, 1, "30s")).unwrap();
    let assignments = distribute(plan.total_vus, plan.per_worker_vus).unwrap();

    let container = Arc::new(FakeContainerClient::new());
    let blob = Arc::new(InMemoryBlobClient::new());
    for assignment in &assignments {
        container
            .script(format!("{}-{}", plan.run_id, assignment.worker_index), WorkerScript::runs_forever())
            .await;
    }

    let orchestrator = Orchestrator::new(container, blob);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = orchestrator.run_plan(&plan, &assignments, cancel).await;

    assert_eq!(outcome.status, RunStatus::Cancelled);
    assert_eq!(exit_code(&outcome), 4);
    assert!(outcome.terminal_worker_states.iter().all(|h| h.state == WorkerState::Cancelled));
    assert_eq!(outcome.report.findings.len(), 1);
    assert_eq!(outcome.report.findings[0].category, "cancelled");
}

/// Scenario 4: assignment invariant, `[total_vus=5, per_worker_vus=2]`
/// yields `[2, 2, 1]`.
#[test]
fn scenario_four_assignment_shape() {
    let assignments = distribute(5, 2).unwrap();
    let vus: Vec<i64> = assignments.iter().map(|a| a.vus_for_worker).collect();
    assert_eq!(vus, vec![2, 2, 1]);
}

/// An invalid plan never reaches the Container Manager; the orchestrator
/// returns `OrchestratorError::InvalidPlan` instead of a `RunOutcome`.
#[tokio::test]
async fn invalid_plan_is_rejected_before_any_provisioning() {
    let container = Arc::new(FakeContainerClient::new());
    let blob = Arc::new(InMemoryBlobClient::new());
    let orchestrator = Orchestrator::new(container, blob);

    let mut plan_request = request(10, 5, "1m");
    plan_request.total_vus = 0;

    let err = orchestrator
        .run(plan_request, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, loadtest_orchestrator::OrchestratorError::InvalidPlan(_)));
}

/// All workers fail to start: outcome `failed`, exit code 3, empty
/// summary, one `no_successful_workers` finding.
#[tokio::test(start_paused = true)]
async fn all_workers_fail_to_start_yields_exit_three() {
    let plan = compile(request(2, 1, "10s")).unwrap();
    let assignments = distribute(plan.total_vus, plan.per_worker_vus).unwrap();

    let container = Arc::new(FakeContainerClient::new());
    let blob = Arc::new(InMemoryBlobClient::new());
    for assignment in &assignments {
        container
            .script(format!("{}-{}", plan.run_id, assignment.worker_index), WorkerScript::never_starts())
            .await;
    }

    let orchestrator = Orchestrator::new(container, blob);
    let outcome = orchestrator.run_plan(&plan, &assignments, CancellationToken::new()).await;

    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(exit_code(&outcome), 3);
    assert_eq!(outcome.report.canonical_summary.total_samples(), 0);
    assert!(outcome.report.findings.iter().any(|f| f.category == "no_successful_workers"));
}
