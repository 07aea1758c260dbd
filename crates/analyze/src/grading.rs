//! The grading algorithm: deterministic deductions from a base score of
//! 100, one [`Finding`] per deduction, floored at 0.

use loadtest_aggregate::CanonicalSummary;

use crate::{
    catalogue::recommended_action,
    types::{Context, Finding, Severity},
};

const KIB: f64 = 1024.0;

fn finding(deduction: i32, category: &str, title: &str, detail: String, metrics: &[&str]) -> Finding {
    Finding {
        severity: Severity::from_deduction(deduction),
        category: category.to_owned(),
        title: title.to_owned(),
        detail,
        supporting_metrics: metrics.iter().map(|m| (*m).to_owned()).collect(),
        recommended_action: recommended_action(category).to_owned(),
    }
}

/// Returns the total deduction and appends one [`Finding`] per rule that
/// triggered.
pub(crate) fn protocol_deductions(
    summary: &CanonicalSummary,
    context: &Context,
    findings: &mut Vec<Finding>,
) -> i32 {
    let mut total = 0;

    if let Some(duration) = summary.get("http_req_duration") {
        let p95 = duration.percentiles.p95;
        let deduction = if p95 > 5000.0 {
            35
        } else if p95 > 2000.0 {
            20
        } else {
            0
        };
        if deduction > 0 {
            total += deduction;
            findings.push(finding(
                deduction,
                "server_processing",
                "Request latency exceeds acceptable bounds",
                format!("http_req_duration p95 is {p95:.1}ms, above the {}ms threshold", if p95 > 5000.0 { 5000 } else { 2000 }),
                &["http_req_duration.p95"],
            ));
        }
    }

    if let Some(failed) = summary.get("http_req_failed") {
        let rate = failed.mean;
        let deduction = if rate > 0.10 {
            40
        } else if rate > 0.05 {
            25
        } else if rate > 0.01 {
            10
        } else {
            0
        };
        if deduction > 0 {
            total += deduction;
            findings.push(finding(
                deduction,
                "error_rate",
                "Elevated request failure rate",
                format!("http_req_failed mean is {:.2}%, above threshold", rate * 100.0),
                &["http_req_failed.mean"],
            ));
        }
    }

    if let Some(reqs) = summary.get("http_reqs") {
        if context.duration_s > 0.0 {
            let rps = reqs.count as f64 / context.duration_s;
            if rps < 10.0 && context.total_vus >= 25 {
                total += 15;
                findings.push(finding(
                    15,
                    "throughput",
                    "Throughput far below requested concurrency",
                    format!(
                        "achieved {rps:.2} req/s against {} requested VUs",
                        context.total_vus
                    ),
                    &["http_reqs.count"],
                ));
            }
        }
    }

    if let Some(waiting) = summary.get("http_req_waiting") {
        if waiting.mean > 400.0 {
            total += 10;
            findings.push(finding(
                10,
                "server_processing",
                "Server think time is the dominant latency component",
                format!("http_req_waiting mean is {:.1}ms, above 400ms", waiting.mean),
                &["http_req_waiting.mean"],
            ));
        }
    }

    if let (Some(received), Some(reqs)) = (summary.get("data_received"), summary.get("http_reqs")) {
        if reqs.count > 0 {
            let avg_payload_bytes = received.sum / reqs.count as f64;
            if avg_payload_bytes > 200.0 * KIB {
                total += 5;
                findings.push(finding(
                    5,
                    "payload_size",
                    "Average response payload is larger than expected",
                    format!(
                        "average response is {:.1} KiB per request, above 200 KiB",
                        avg_payload_bytes / KIB
                    ),
                    &["data_received", "http_reqs"],
                ));
            }
        }
    }

    total
}

pub(crate) fn browser_deductions(summary: &CanonicalSummary, findings: &mut Vec<Finding>) -> i32 {
    let mut total = 0;

    if let Some(lcp) = summary.get("largest_contentful_paint") {
        let p75 = lcp.percentiles.p75;
        let deduction = if p75 > 4000.0 {
            35
        } else if p75 > 2500.0 {
            20
        } else {
            0
        };
        if deduction > 0 {
            total += deduction;
            findings.push(finding(
                deduction,
                "core_web_vitals",
                "Largest Contentful Paint exceeds recommended bound",
                format!("LCP p75 is {p75:.0}ms"),
                &["largest_contentful_paint.p75"],
            ));
        }
    }

    if let Some(cls) = summary.get("cumulative_layout_shift") {
        let p75 = cls.percentiles.p75;
        // Both bands apply as independent deductions: -10 past 0.1, a
        // further -10 past 0.25.
        if p75 > 0.1 {
            total += 10;
            findings.push(finding(
                10,
                "core_web_vitals",
                "Cumulative Layout Shift exceeds 0.1",
                format!("CLS p75 is {p75:.3}"),
                &["cumulative_layout_shift.p75"],
            ));
        }
        if p75 > 0.25 {
            total += 10;
            findings.push(finding(
                10,
                "core_web_vitals",
                "Cumulative Layout Shift exceeds 0.25",
                format!("CLS p75 is {p75:.3}, well past the 0.1 threshold"),
                &["cumulative_layout_shift.p75"],
            ));
        }
    }

    if let Some(fid) = summary.get("first_input_delay") {
        let p75 = fid.percentiles.p75;
        let deduction = if p75 > 300.0 {
            20
        } else if p75 > 100.0 {
            10
        } else {
            0
        };
        if deduction > 0 {
            total += deduction;
            findings.push(finding(
                deduction,
                "core_web_vitals",
                "First Input Delay exceeds recommended bound",
                format!("FID p75 is {p75:.0}ms"),
                &["first_input_delay.p75"],
            ));
        }
    }

    total
}
