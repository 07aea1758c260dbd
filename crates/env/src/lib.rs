//! Environment-variable plumbing: the worker injection contract and the
//! orchestrator's own tuning knobs, read with the same
//! `env::var(...).ok()` / cached-`Duration` idiom the rest of the
//! workspace uses for configuration.

use std::{collections::HashMap, env, sync::LazyLock, time::Duration};

use loadtest_core::{RunPlan, WorkerAssignment};

/// Builds the `WORKER_INDEX`/`WORKER_COUNT`/... environment for one
/// worker. `env_overrides` from the plan are layered in last so they
/// take precedence over nothing else (there is no other source of truth
/// for those keys).
#[must_use]
pub fn worker_env(plan: &RunPlan, assignment: &WorkerAssignment) -> HashMap<String, String> {
    let mut vars = HashMap::with_capacity(8 + plan.env_overrides.len());
    vars.insert("WORKER_INDEX".to_owned(), assignment.worker_index.to_string());
    vars.insert("WORKER_COUNT".to_owned(), assignment.worker_count.to_string());
    vars.insert("TOTAL_VUS".to_owned(), plan.total_vus.to_string());
    vars.insert("VUS".to_owned(), assignment.vus_for_worker.to_string());
    vars.insert("DURATION".to_owned(), plan.duration_secs().to_string());
    vars.insert("RUN_ID".to_owned(), plan.run_id.clone());
    vars.insert(
        "TEST_TYPE".to_owned(),
        match plan.test_kind {
            loadtest_core::TestKind::Protocol => "protocol".to_owned(),
            loadtest_core::TestKind::Browser => "browser".to_owned(),
        },
    );
    vars.insert("TARGET_URL".to_owned(), plan.target_url.clone());
    vars.insert("BLOB_NAMESPACE".to_owned(), plan.blob_namespace.clone());
    for (key, value) in &plan.env_overrides {
        vars.insert(key.clone(), value.clone());
    }
    vars
}

fn env_duration_secs(var: &str, default: Duration) -> Duration {
    env::var(var)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn env_usize(var: &str, default: usize) -> usize {
    env::var(var)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

/// Time allotted for a worker to go from `provisioning` to `running`.
pub static PROVISION_TIMEOUT: LazyLock<Duration> =
    LazyLock::new(|| env_duration_secs("LOADTEST_PROVISION_TIMEOUT_SECS", Duration::from_secs(300)));

/// Upper bound on how long the Container Manager waits for accepted
/// `Delete` calls during cancellation teardown.
pub static TEARDOWN_GRACE: LazyLock<Duration> =
    LazyLock::new(|| env_duration_secs("LOADTEST_TEARDOWN_GRACE_SECS", Duration::from_secs(60)));

/// Timeout applied to each individual provider call (Create/Status/Delete/
/// Logs).
pub static PER_PROVIDER_CALL_TIMEOUT: LazyLock<Duration> = LazyLock::new(|| {
    env_duration_secs("LOADTEST_PROVIDER_CALL_TIMEOUT_SECS", Duration::from_secs(30))
});

/// Maximum number of in-flight `Create` calls, to avoid provider
/// throttling.
pub static PROVISION_CONCURRENCY: LazyLock<usize> =
    LazyLock::new(|| env_usize("LOADTEST_PROVISION_CONCURRENCY", 32));

/// Status-poll backoff: starting interval.
pub static POLL_BACKOFF_MIN: LazyLock<Duration> =
    LazyLock::new(|| env_duration_secs("LOADTEST_POLL_BACKOFF_MIN_SECS", Duration::from_secs(5)));

/// Status-poll backoff: interval ceiling.
pub static POLL_BACKOFF_MAX: LazyLock<Duration> =
    LazyLock::new(|| env_duration_secs("LOADTEST_POLL_BACKOFF_MAX_SECS", Duration::from_secs(30)));
