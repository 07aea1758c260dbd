//! `analyze`: the single entry point of the Metrics Analyzer. Purely
//! deterministic in `(CanonicalSummary, Context) -> PerformanceReport` —
//! the same inputs always produce the same report.

use loadtest_aggregate::CanonicalSummary;
use loadtest_core::TestKind;

use crate::{
    catalogue::recommended_action,
    grading::{browser_deductions, protocol_deductions},
    types::{
        Context, Finding, Grade, PerformanceReport, PhaseStat, ResourceBreakdown, Severity,
        TimingsBreakdown, sort_findings,
    },
};

#[must_use]
pub fn analyze(summary: &CanonicalSummary, context: &Context) -> PerformanceReport {
    let mut findings = Vec::new();

    if summary.total_samples() == 0 {
        if !context.cancelled {
            let (category, title, detail) = if context.successful_workers == 0 {
                (
                    "no_successful_workers",
                    "No worker succeeded",
                    format!(
                        "0 of {} workers reached a successful terminal state",
                        context.worker_count
                    ),
                )
            } else {
                (
                    "no_samples",
                    "No samples collected",
                    "the canonical summary contains zero samples across every metric".to_owned(),
                )
            };
            findings.push(Finding {
                severity: Severity::High,
                category: category.to_owned(),
                title: title.to_owned(),
                detail,
                supporting_metrics: Vec::new(),
                recommended_action: recommended_action(category).to_owned(),
            });
        }
        return PerformanceReport {
            grade: Grade::F,
            score: 0,
            canonical_summary: summary.clone(),
            findings,
            timings_breakdown: TimingsBreakdown::default(),
            resource_breakdown: ResourceBreakdown::default(),
        };
    }

    if context.successful_workers == 0 {
        findings.push(Finding {
            severity: Severity::High,
            category: "no_successful_workers".to_owned(),
            title: "No worker succeeded".to_owned(),
            detail: format!("0 of {} workers reached a successful terminal state", context.worker_count),
            supporting_metrics: Vec::new(),
            recommended_action: recommended_action("no_successful_workers").to_owned(),
        });
    } else if context.successful_workers < context.worker_count {
        findings.push(Finding {
            severity: Severity::Medium,
            category: "worker_dropout".to_owned(),
            title: "Not every worker completed".to_owned(),
            detail: format!(
                "{} of {} workers reached a successful terminal state",
                context.successful_workers, context.worker_count
            ),
            supporting_metrics: Vec::new(),
            recommended_action: recommended_action("worker_dropout").to_owned(),
        });
    }

    let deduction = match context.test_kind {
        TestKind::Protocol => protocol_deductions(summary, context, &mut findings),
        TestKind::Browser => browser_deductions(summary, &mut findings),
    };

    let score = (100 - deduction).max(0) as u32;
    let grade = Grade::from_score(score);

    sort_findings(&mut findings);

    PerformanceReport {
        grade,
        score,
        canonical_summary: summary.clone(),
        findings,
        timings_breakdown: timings_breakdown(summary),
        resource_breakdown: resource_breakdown(summary),
    }
}

/// Mean/p95 of each `http_req_*` phase metric.
fn timings_breakdown(summary: &CanonicalSummary) -> TimingsBreakdown {
    let phase = |name: &str| {
        summary.get(name).map(|stats| PhaseStat { mean: stats.mean, p95: stats.percentiles.p95 })
    };
    TimingsBreakdown {
        blocked: phase("http_req_blocked"),
        connecting: phase("http_req_connecting"),
        tls_handshaking: phase("http_req_tls_handshaking"),
        sending: phase("http_req_sending"),
        waiting: phase("http_req_waiting"),
        receiving: phase("http_req_receiving"),
    }
}

fn resource_breakdown(summary: &CanonicalSummary) -> ResourceBreakdown {
    let peak_vus = summary.get("vus").map(|stats| stats.max);
    let total_iterations = summary.get("iterations").map(|stats| stats.sum);
    let iteration_rate_per_s = summary.get("iterations").and_then(|stats| {
        if stats.count == 0 {
            None
        } else {
            Some(stats.sum / stats.count as f64)
        }
    });
    ResourceBreakdown { peak_vus, total_iterations, iteration_rate_per_s }
}
