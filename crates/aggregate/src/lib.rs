//! The Result Aggregator: merges per-worker result blobs into one
//! [`CanonicalSummary`] plus a [`RunManifest`], without ever holding more
//! than `reservoir_size` raw samples per metric in memory.

mod accumulator;
mod aggregator;
mod record;
mod types;

pub use aggregator::{AggregationOutcome, AggregatorError, aggregate};
pub use types::{CanonicalSummary, Percentiles, RunManifest, SeriesStats, WorkerManifestEntry};
