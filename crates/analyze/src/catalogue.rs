//! Static recommended-action catalogue, keyed by finding category. A
//! `match` stands in for a `HashMap<&'static str, &'static str>` —
//! equivalent lookup, no allocation, no `LazyLock` needed for a table
//! this small.

pub(crate) fn recommended_action(category: &str) -> &'static str {
    match category {
        "server_processing" => {
            "Server think time dominates request latency; profile the \
             target's request handlers and backing datastore before \
             adding more virtual users."
        }
        "error_rate" => {
            "Investigate the failing endpoints directly (status codes, \
             timeouts) before re-running at this concurrency; a high \
             error rate invalidates downstream latency numbers."
        }
        "throughput" => {
            "Achieved throughput is far below what the requested VU count \
             should sustain; check for client-side connection limits or \
             a target-side rate limiter before scaling further."
        }
        "core_web_vitals" => {
            "One or more Core Web Vitals exceeded the recommended \
             threshold; capture a trace for a representative page load \
             and attribute the regression to a specific render phase."
        }
        "payload_size" => {
            "Average response payload size is larger than expected for \
             this workload; consider compression or pagination before \
             the next run."
        }
        "worker_dropout" => {
            "One or more workers did not complete; inspect their logs \
             before trusting the aggregated result as representative of \
             the full requested VU count."
        }
        "no_successful_workers" => {
            "No worker produced any data; check image provisioning and \
             the target's reachability from the worker network before \
             retrying."
        }
        "no_samples" => {
            "No samples were collected at all; verify the worker image \
             actually emits summary records before re-running."
        }
        _ => "No specific remediation is catalogued for this category.",
    }
}
