//! The Result Aggregator: pulls each worker's result object, merges its
//! samples into shared per-metric accumulators, and uploads the
//! canonical summary and manifest.

use std::collections::BTreeMap;

use bytes::Bytes;
use loadtest_blob::{BlobClient, BlobError, BlobName};
use loadtest_core::{RunPlan, WorkerHandle, WorkerState};
use tracing::warn;

use crate::{
    accumulator::MetricAccumulator,
    record::RawRecord,
    types::{CanonicalSummary, RunManifest, WorkerManifestEntry},
};

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("blob store unreachable: {0}")]
    BlobUnavailable(#[from] BlobError),
}

/// Result of one aggregation pass. `upload_error` is surfaced separately
/// from a hard failure: a blob-store error on the final upload must not
/// prevent the in-memory summary/manifest from being returned to the
/// caller.
#[derive(Debug)]
pub struct AggregationOutcome {
    pub summary: CanonicalSummary,
    pub manifest: RunManifest,
    pub upload_error: Option<AggregatorError>,
}

/// Fetches and merges every eligible worker's result object, in ascending
/// `worker_index` order, so merge output is deterministic regardless of
/// completion order. Workers not in `Succeeded`/`Failed` never produced
/// data worth reading and are recorded `missing` in the manifest without
/// a fetch attempt.
pub async fn aggregate<B: BlobClient>(
    plan: &RunPlan,
    handles: &[WorkerHandle],
    blob: &B,
) -> AggregationOutcome {
    let mut ordered: Vec<&WorkerHandle> = handles.iter().collect();
    ordered.sort_by_key(|handle| handle.worker_index);

    let mut accumulators: BTreeMap<String, MetricAccumulator> = BTreeMap::new();
    let mut workers = Vec::with_capacity(ordered.len());

    for handle in ordered {
        workers.push(merge_one_worker(plan, handle, blob, &mut accumulators).await);
    }

    let summary = CanonicalSummary {
        metrics: accumulators.into_iter().map(|(name, acc)| (name, acc.finish())).collect(),
    };

    let successful_workers = handles.iter().filter(|h| h.state.is_success()).count();
    let worker_count = handles.len();
    let partial = successful_workers < worker_count;

    let manifest = RunManifest {
        run_id: plan.run_id.clone(),
        workers,
        partial,
        successful_workers,
        worker_count,
    };

    let upload_error = upload(plan, blob, &summary, &manifest).await.err();

    AggregationOutcome { summary, manifest, upload_error }
}

async fn merge_one_worker<B: BlobClient>(
    plan: &RunPlan,
    handle: &WorkerHandle,
    blob: &B,
    accumulators: &mut BTreeMap<String, MetricAccumulator>,
) -> WorkerManifestEntry {
    let blob_name = BlobName::summary(&plan.run_id, handle.worker_index);
    let eligible = matches!(handle.state, WorkerState::Succeeded | WorkerState::Failed);

    if !eligible {
        return WorkerManifestEntry {
            index: handle.worker_index,
            status: handle.state,
            summary_blob: blob_name.to_string(),
            size_bytes: 0,
            sample_count: 0,
            malformed_lines: 0,
            started_at: handle.created_at,
            ended_at: handle.last_observed_at,
            missing: true,
        };
    }

    let bytes = match blob.get(&plan.blob_namespace, blob_name.as_str()).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(worker_index = handle.worker_index, error = %err, "worker summary object missing or unreadable");
            return WorkerManifestEntry {
                index: handle.worker_index,
                status: handle.state,
                summary_blob: blob_name.to_string(),
                size_bytes: 0,
                sample_count: 0,
                malformed_lines: 0,
                started_at: handle.created_at,
                ended_at: handle.last_observed_at,
                missing: true,
            };
        }
    };

    let size_bytes = bytes.len() as u64;
    let mut sample_count = 0u64;
    let mut malformed_lines = 0u64;

    for line in bytes.split(|&byte| byte == b'\n') {
        if line.is_empty() {
            continue;
        }
        match serde_json::from_slice::<RawRecord>(line) {
            Ok(RawRecord::Point { metric, data }) => {
                accumulators.entry(metric).or_default().record(data.value);
                sample_count += 1;
            }
            Ok(RawRecord::Metric { .. } | RawRecord::Completion { .. }) => {}
            Err(_) => malformed_lines += 1,
        }
    }

    WorkerManifestEntry {
        index: handle.worker_index,
        status: handle.state,
        summary_blob: blob_name.to_string(),
        size_bytes,
        sample_count,
        malformed_lines,
        started_at: handle.created_at,
        ended_at: handle.last_observed_at,
        missing: false,
    }
}

async fn upload<B: BlobClient>(
    plan: &RunPlan,
    blob: &B,
    summary: &CanonicalSummary,
    manifest: &RunManifest,
) -> Result<(), AggregatorError> {
    let summary_bytes =
        serde_json::to_vec(summary).expect("CanonicalSummary serialization cannot fail");
    blob.put(
        &plan.blob_namespace,
        BlobName::aggregated_summary(&plan.run_id).as_str(),
        Bytes::from(summary_bytes),
    )
    .await?;

    let manifest_bytes =
        serde_json::to_vec(manifest).expect("RunManifest serialization cannot fail");
    blob.put(
        &plan.blob_namespace,
        BlobName::manifest(&plan.run_id).as_str(),
        Bytes::from(manifest_bytes),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use loadtest_blob::InMemoryBlobClient;
    use loadtest_core::{PlanRequest, ResourceShape, TestKind, compile};

    use super::*;

    fn test_plan() -> RunPlan {
        compile(PlanRequest {
            target_url: "https://example.com".to_owned(),
            test_kind: TestKind::Protocol,
            total_vus: 10,
            duration: "1m".to_owned(),
            per_worker_vus: 5,
            worker_resources: ResourceShape { cpu_cores: 1.0, memory_gib: 1.0 },
            worker_image_ref: "img:1".to_owned(),
            blob_namespace: "ns".to_owned(),
            env_overrides: HashMap::new(),
        })
        .unwrap()
    }

    fn succeeded_handle(index: usize) -> WorkerHandle {
        let now = Utc::now();
        let mut handle = WorkerHandle::pending(index, now);
        handle.transition(WorkerState::Succeeded, now);
        handle
    }

    fn point_line(metric: &str, value: f64) -> String {
        format!(
            r#"{{"kind":"Point","metric":"{metric}","data":{{"time":"2026-01-01T00:00:00Z","value":{value},"tags":{{}}}}}}"#
        )
    }

    #[tokio::test]
    async fn merges_two_workers_counts_match_scenario_one() {
        let plan = test_plan();
        let blob = InMemoryBlobClient::new();

        for worker in 0..2 {
            let mut body = String::new();
            for sample in 0..300 {
                let value = 100.0 + (sample as f64 / 299.0) * 300.0;
                body.push_str(&point_line("http_req_duration", value));
                body.push('\n');
            }
            blob.put(
                &plan.blob_namespace,
                BlobName::summary(&plan.run_id, worker).as_str(),
                Bytes::from(body),
            )
            .await
            .unwrap();
        }

        let handles = vec![succeeded_handle(0), succeeded_handle(1)];
        let outcome = aggregate(&plan, &handles, &blob).await;

        let stats = outcome.summary.get("http_req_duration").unwrap();
        assert_eq!(stats.count, 600);
        assert!((stats.min - 100.0).abs() < 1.0);
        assert!((stats.max - 400.0).abs() < 1.0);
        assert!(outcome.upload_error.is_none());
        assert!(!outcome.manifest.partial);
    }

    #[tokio::test]
    async fn missing_worker_is_tolerated_and_marked_partial() {
        let plan = test_plan();
        let blob = InMemoryBlobClient::new();
        blob.put(
            &plan.blob_namespace,
            BlobName::summary(&plan.run_id, 0).as_str(),
            Bytes::from(point_line("http_req_duration", 42.0) + "\n"),
        )
        .await
        .unwrap();

        let mut failed_to_start = WorkerHandle::pending(1, Utc::now());
        failed_to_start.transition(WorkerState::FailedToStart, Utc::now());
        let handles = vec![succeeded_handle(0), failed_to_start];

        let outcome = aggregate(&plan, &handles, &blob).await;

        assert!(outcome.manifest.partial);
        assert_eq!(outcome.manifest.successful_workers, 1);
        assert!(outcome.manifest.workers[1].missing);
        assert_eq!(outcome.summary.get("http_req_duration").unwrap().count, 1);
    }

    #[tokio::test]
    async fn malformed_lines_are_counted_not_fatal() {
        let plan = test_plan();
        let blob = InMemoryBlobClient::new();
        let mut body = point_line("http_req_duration", 1.0);
        body.push('\n');
        body.push_str("not json at all\n");
        blob.put(
            &plan.blob_namespace,
            BlobName::summary(&plan.run_id, 0).as_str(),
            Bytes::from(body),
        )
        .await
        .unwrap();

        let handles = vec![succeeded_handle(0)];
        let outcome = aggregate(&plan, &handles, &blob).await;

        assert_eq!(outcome.manifest.workers[0].malformed_lines, 1);
        assert_eq!(outcome.manifest.workers[0].sample_count, 1);
    }

    #[tokio::test]
    async fn empty_handle_set_yields_empty_summary_without_crash() {
        let plan = test_plan();
        let blob = InMemoryBlobClient::new();
        let mut failed_to_start = WorkerHandle::pending(0, Utc::now());
        failed_to_start.transition(WorkerState::FailedToStart, Utc::now());

        let outcome = aggregate(&plan, &[failed_to_start], &blob).await;

        assert_eq!(outcome.summary.total_samples(), 0);
        assert_eq!(outcome.manifest.successful_workers, 0);
    }

    #[tokio::test]
    async fn upload_then_redownload_round_trips_structurally() {
        let plan = test_plan();
        let blob = InMemoryBlobClient::new();
        blob.put(
            &plan.blob_namespace,
            BlobName::summary(&plan.run_id, 0).as_str(),
            Bytes::from(point_line("http_reqs", 1.0) + "\n"),
        )
        .await
        .unwrap();

        let handles = vec![succeeded_handle(0)];
        let outcome = aggregate(&plan, &handles, &blob).await;

        let downloaded = blob
            .get(&plan.blob_namespace, BlobName::aggregated_summary(&plan.run_id).as_str())
            .await
            .unwrap();
        let reparsed: CanonicalSummary = serde_json::from_slice(&downloaded).unwrap();
        assert_eq!(reparsed.get("http_reqs").unwrap().count, outcome.summary.get("http_reqs").unwrap().count);
    }
}
