//! The data model produced by aggregation: [`CanonicalSummary`] and
//! [`RunManifest`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use loadtest_core::WorkerState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub percentiles: Percentiles,
    pub samples_preserved: usize,
}

/// `metric_name -> SeriesStats`, merged across every successful/partial
/// worker. A `BTreeMap` keeps serialization order deterministic, which
/// `PerformanceReport`'s idempotence depends on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonicalSummary {
    pub metrics: BTreeMap<String, SeriesStats>,
}

impl CanonicalSummary {
    #[must_use]
    pub fn get(&self, metric: &str) -> Option<&SeriesStats> {
        self.metrics.get(metric)
    }

    #[must_use]
    pub fn total_samples(&self) -> u64 {
        self.metrics.values().map(|s| s.count).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerManifestEntry {
    pub index: usize,
    pub status: WorkerState,
    pub summary_blob: String,
    pub size_bytes: u64,
    pub sample_count: u64,
    /// Lines that failed to parse as a recognized record, counted and
    /// skipped rather than aborting the merge.
    pub malformed_lines: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// `true` if the worker's summary object was absent or unreadable.
    pub missing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub workers: Vec<WorkerManifestEntry>,
    pub partial: bool,
    pub successful_workers: usize,
    pub worker_count: usize,
}
