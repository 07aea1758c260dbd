//! [`RunOutcome`] and the exit-code mapping used by the CLI binary.

use loadtest_aggregate::RunManifest;
use loadtest_analyze::PerformanceReport;
use loadtest_core::WorkerHandle;
use serde::{Deserialize, Serialize};

/// The run's overall disposition, derived from worker terminal states
/// plus cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Degraded,
    Failed,
    Cancelled,
}

impl RunStatus {
    /// `successful_workers == 0` -> failed; `< worker_count` -> degraded;
    /// otherwise ok. Cancellation overrides everything else.
    #[must_use]
    pub fn from_counts(successful_workers: usize, worker_count: usize, cancelled: bool) -> Self {
        if cancelled {
            return Self::Cancelled;
        }
        if successful_workers == 0 {
            Self::Failed
        } else if successful_workers < worker_count {
            Self::Degraded
        } else {
            Self::Ok
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub status: RunStatus,
    pub terminal_worker_states: Vec<WorkerHandle>,
    pub canonical_summary_location: String,
    pub manifest: RunManifest,
    pub report: PerformanceReport,
    /// Set when a non-fatal infrastructure error occurred during the run
    /// (e.g. the final summary upload failed) — the run still completes
    /// and the in-memory report is still returned.
    pub orchestrator_error: Option<String>,
}

/// `0` ok, `2` degraded, `3` failed, `4` cancelled. `5` (invalid plan)
/// and `6` (infrastructure error) are not representable here — they
/// occur before a [`RunOutcome`] exists and are mapped separately by the
/// binary entry point.
#[must_use]
pub fn exit_code(outcome: &RunOutcome) -> i32 {
    match outcome.status {
        RunStatus::Ok => 0,
        RunStatus::Degraded => 2,
        RunStatus::Failed => 3,
        RunStatus::Cancelled => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_succeed_is_ok() {
        assert_eq!(RunStatus::from_counts(3, 3, false), RunStatus::Ok);
    }

    #[test]
    fn partial_success_is_degraded() {
        assert_eq!(RunStatus::from_counts(2, 3, false), RunStatus::Degraded);
    }

    #[test]
    fn zero_success_is_failed() {
        assert_eq!(RunStatus::from_counts(0, 3, false), RunStatus::Failed);
    }

    #[test]
    fn cancellation_overrides_counts() {
        assert_eq!(RunStatus::from_counts(3, 3, true), RunStatus::Cancelled);
    }

    #[test]
    fn exit_codes_match_status_mapping() {
        let base = |status| RunOutcome {
            run_id: "run-x".to_owned(),
            status,
            terminal_worker_states: Vec::new(),
            canonical_summary_location: "run-x/aggregated_summary.json".to_owned(),
            manifest: RunManifest {
                run_id: "run-x".to_owned(),
                workers: Vec::new(),
                partial: false,
                successful_workers: 0,
                worker_count: 0,
            },
            report: loadtest_analyze::analyze(
                &loadtest_aggregate::CanonicalSummary::default(),
                &loadtest_analyze::Context {
                    test_kind: loadtest_core::TestKind::Protocol,
                    target_url: String::new(),
                    duration_s: 1.0,
                    total_vus: 1,
                    worker_count: 0,
                    successful_workers: 0,
                    cancelled: false,
                },
            ),
            orchestrator_error: None,
        };
        assert_eq!(exit_code(&base(RunStatus::Ok)), 0);
        assert_eq!(exit_code(&base(RunStatus::Degraded)), 2);
        assert_eq!(exit_code(&base(RunStatus::Failed)), 3);
        assert_eq!(exit_code(&base(RunStatus::Cancelled)), 4);
    }
}
