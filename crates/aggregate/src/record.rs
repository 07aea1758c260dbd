//! The on-the-wire shape of a worker's newline-delimited summary file.
//! One JSON object per line; `Metric`/`Completion` lines parse but carry
//! no accumulator-relevant data, so the aggregator discards them without
//! counting them against a worker's sample count. A `kind` outside this
//! enum fails to parse and is counted as a malformed line by the caller.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
pub enum RawRecord {
    Point {
        metric: String,
        data: PointData,
    },
    Metric {
        #[allow(dead_code)]
        metric: String,
        #[serde(rename = "type")]
        #[allow(dead_code)]
        metric_type: String,
        #[serde(default)]
        #[allow(dead_code)]
        thresholds: Vec<Value>,
    },
    Completion {
        #[allow(dead_code)]
        worker_index: usize,
        #[allow(dead_code)]
        vus_used: i64,
        #[allow(dead_code)]
        iterations: u64,
        #[allow(dead_code)]
        wall_clock_ms: u64,
        #[allow(dead_code)]
        exit_code: i32,
    },
}

#[derive(Debug, Deserialize)]
pub struct PointData {
    #[allow(dead_code)]
    pub time: String,
    pub value: f64,
    #[serde(default)]
    #[allow(dead_code)]
    pub tags: HashMap<String, String>,
}
