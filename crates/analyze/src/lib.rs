//! The Metrics Analyzer: turns a [`loadtest_aggregate::CanonicalSummary`]
//! into a [`PerformanceReport`] via a deterministic grading algorithm and
//! findings catalogue.

mod analyzer;
mod catalogue;
mod grading;
mod types;

pub use analyzer::analyze;
pub use types::{
    Context, Finding, Grade, PerformanceReport, PhaseStat, ResourceBreakdown, Severity,
    TimingsBreakdown,
};
