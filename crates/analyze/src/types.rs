//! The Metrics Analyzer's output data model: `Finding` and
//! `PerformanceReport`.

use loadtest_aggregate::CanonicalSummary;
use loadtest_core::TestKind;
use serde::{Deserialize, Serialize};

/// Everything the grading algorithm needs beyond the summary itself.
/// Assembled by the Orchestrator from `RunPlan` + `RunManifest`.
#[derive(Debug, Clone)]
pub struct Context {
    pub test_kind: TestKind,
    pub target_url: String,
    pub duration_s: f64,
    pub total_vus: i64,
    pub worker_count: usize,
    pub successful_workers: usize,
    /// Set when the orchestrator already knows the run was cancelled (or
    /// its hard deadline tripped). Suppresses the analyzer's own
    /// empty-summary finding, since the caller adds a `cancelled` finding
    /// of its own and an empty aggregation is the expected shape of a
    /// cancelled run, not a distinct failure to diagnose.
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Deduction-amount threshold rule: `>= 20` is high, `>= 10` is
    /// medium, otherwise low.
    #[must_use]
    pub fn from_deduction(deduction: i32) -> Self {
        if deduction >= 20 {
            Self::High
        } else if deduction >= 10 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Lower rank sorts first; used to order high -> low.
    const fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub category: String,
    pub title: String,
    pub detail: String,
    pub supporting_metrics: Vec<String>,
    pub recommended_action: String,
}

impl Finding {
    fn sort_key(&self) -> (u8, &str) {
        (self.severity.rank(), self.category.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    #[must_use]
    pub fn from_score(score: u32) -> Self {
        match score {
            90..=u32::MAX => Self::A,
            80..=89 => Self::B,
            70..=79 => Self::C,
            60..=69 => Self::D,
            _ => Self::F,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseStat {
    pub mean: f64,
    pub p95: f64,
}

/// Mean/p95 of each `http_req_*` phase metric.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingsBreakdown {
    pub blocked: Option<PhaseStat>,
    pub connecting: Option<PhaseStat>,
    pub tls_handshaking: Option<PhaseStat>,
    pub sending: Option<PhaseStat>,
    pub waiting: Option<PhaseStat>,
    pub receiving: Option<PhaseStat>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceBreakdown {
    pub peak_vus: Option<f64>,
    pub total_iterations: Option<f64>,
    pub iteration_rate_per_s: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub grade: Grade,
    pub score: u32,
    pub canonical_summary: CanonicalSummary,
    pub findings: Vec<Finding>,
    pub timings_breakdown: TimingsBreakdown,
    pub resource_breakdown: ResourceBreakdown,
}

pub(crate) fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}
