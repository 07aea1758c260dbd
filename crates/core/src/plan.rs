//! The compiled, validated test plan and the Plan Compiler.

use std::{collections::HashMap, time::Duration};

use chrono::Utc;
use rand::Rng as _;
use serde::{Deserialize, Serialize};

use crate::error::InvalidPlan;

/// Caller-facing, not-yet-validated request. Parsing this from YAML/CLI
/// flags is out of scope for this crate; callers are expected to construct
/// it themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub target_url: String,
    pub test_kind: TestKind,
    pub total_vus: i64,
    /// e.g. "2m", matching `^\d+[smhd]$`.
    pub duration: String,
    pub per_worker_vus: i64,
    pub worker_resources: ResourceShape,
    pub worker_image_ref: String,
    pub blob_namespace: String,
    #[serde(default)]
    pub env_overrides: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Protocol,
    Browser,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceShape {
    pub cpu_cores: f64,
    pub memory_gib: f64,
}

/// The compiled, validated test plan. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPlan {
    pub run_id: String,
    pub target_url: String,
    pub test_kind: TestKind,
    pub total_vus: i64,
    pub duration: Duration,
    pub per_worker_vus: i64,
    pub worker_resources: ResourceShape,
    pub worker_image_ref: String,
    pub blob_namespace: String,
    pub env_overrides: HashMap<String, String>,
    pub created_at: chrono::DateTime<Utc>,
}

impl RunPlan {
    #[must_use]
    pub fn duration_secs(&self) -> u64 {
        self.duration.as_secs()
    }

    /// `max(10 min, duration * 4)`.
    #[must_use]
    pub fn hard_deadline(&self) -> Duration {
        let floor = Duration::from_secs(600);
        let scaled = self.duration.saturating_mul(4);
        scaled.max(floor)
    }

    /// `duration * 3 + 10 min`, the default `completion_timeout`.
    #[must_use]
    pub fn default_completion_timeout(&self) -> Duration {
        self.duration.saturating_mul(3) + Duration::from_secs(600)
    }
}

/// Validates a [`PlanRequest`] and compiles it into a [`RunPlan`].
///
/// Collects every failing constraint rather than stopping at the first one.
pub fn compile(request: PlanRequest) -> Result<RunPlan, InvalidPlan> {
    let mut violations = Vec::new();

    if !is_well_formed_http_url(&request.target_url) {
        violations.push(format!(
            "target_url must be a well-formed http(s) URL, got {:?}",
            request.target_url
        ));
    }
    if request.total_vus < 1 {
        violations.push(format!(
            "total_vus must be >= 1, got {}",
            request.total_vus
        ));
    }
    if request.per_worker_vus < 1 {
        violations.push(format!(
            "per_worker_vus must be >= 1, got {}",
            request.per_worker_vus
        ));
    }
    let duration = parse_duration(&request.duration);
    if duration.is_none() {
        violations.push(format!(
            "duration must match ^\\d+[smhd]$, got {:?}",
            request.duration
        ));
    }
    if request.worker_resources.cpu_cores <= 0.0 {
        violations.push(format!(
            "worker_resources.cpu_cores must be positive, got {}",
            request.worker_resources.cpu_cores
        ));
    }
    if request.worker_resources.memory_gib <= 0.0 {
        violations.push(format!(
            "worker_resources.memory_gib must be positive, got {}",
            request.worker_resources.memory_gib
        ));
    }
    if request.worker_image_ref.trim().is_empty() {
        violations.push("worker_image_ref must not be empty".to_owned());
    }
    if request.blob_namespace.trim().is_empty() {
        violations.push("blob_namespace must not be empty".to_owned());
    }

    if !violations.is_empty() {
        return Err(InvalidPlan::new(violations));
    }

    Ok(RunPlan {
        run_id: generate_run_id(),
        target_url: request.target_url,
        test_kind: request.test_kind,
        total_vus: request.total_vus,
        duration: duration.expect("validated above"),
        per_worker_vus: request.per_worker_vus,
        worker_resources: request.worker_resources,
        worker_image_ref: request.worker_image_ref,
        blob_namespace: request.blob_namespace,
        env_overrides: request.env_overrides,
        created_at: Utc::now(),
    })
}

fn is_well_formed_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(rest) => !rest.trim().is_empty() && !rest.starts_with('/'),
        None => false,
    }
}

/// Parses `^\d+[smhd]$` into a [`Duration`]. No regex crate needed for a
/// pattern this small.
fn parse_duration(value: &str) -> Option<Duration> {
    let (digits, unit) = value.split_at_checked(value.len().checked_sub(1)?)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;
    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        _ => return None,
    };
    Some(Duration::from_secs(amount.checked_mul(multiplier)?))
}

/// `<unix-seconds-base36><6 random alphanumeric chars>`, URL-safe.
fn generate_run_id() -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("run-{:x}-{suffix}", Utc::now().timestamp())
}
