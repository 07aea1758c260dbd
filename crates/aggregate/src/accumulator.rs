//! Per-metric streaming accumulator: running count/sum/min/max/mean
//! (Welford's online mean update) plus a bounded reservoir (Algorithm R)
//! used to estimate percentiles without ever materializing the full
//! sample stream. Bounds memory at O(reservoir_size) per metric
//! regardless of run length.

use rand::Rng as _;

use crate::types::{Percentiles, SeriesStats};

const RESERVOIR_SIZE: usize = 10_000;

pub struct MetricAccumulator {
    count: u64,
    sum: f64,
    mean: f64,
    min: f64,
    max: f64,
    reservoir: Vec<f64>,
}

impl MetricAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            mean: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            reservoir: Vec::with_capacity(RESERVOIR_SIZE),
        }
    }

    pub fn record(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let position = (self.count - 1) as usize;
        if position < RESERVOIR_SIZE {
            self.reservoir.push(value);
        } else {
            let candidate = rand::thread_rng().gen_range(0..=position);
            if candidate < RESERVOIR_SIZE {
                self.reservoir[candidate] = value;
            }
        }
    }

    #[must_use]
    pub fn finish(mut self) -> SeriesStats {
        self.reservoir.sort_by(|a, b| a.partial_cmp(b).expect("samples are never NaN"));
        let percentiles = Percentiles {
            p50: percentile_of(&self.reservoir, 50.0),
            p75: percentile_of(&self.reservoir, 75.0),
            p90: percentile_of(&self.reservoir, 90.0),
            p95: percentile_of(&self.reservoir, 95.0),
            p99: percentile_of(&self.reservoir, 99.0),
        };
        SeriesStats {
            count: self.count,
            sum: self.sum,
            min: if self.count == 0 { 0.0 } else { self.min },
            max: if self.count == 0 { 0.0 } else { self.max },
            mean: self.mean,
            percentiles,
            samples_preserved: self.reservoir.len(),
        }
    }
}

impl Default for MetricAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

fn percentile_of(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_accumulator_has_zeroed_stats() {
        let stats = MetricAccumulator::new().finish();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 0.0);
    }

    #[test]
    fn tracks_count_sum_min_max_mean() {
        let mut acc = MetricAccumulator::new();
        for value in [100.0, 200.0, 300.0, 400.0] {
            acc.record(value);
        }
        let stats = acc.finish();
        assert_eq!(stats.count, 4);
        assert!((stats.sum - 1000.0).abs() < 1e-9);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 400.0);
        assert!((stats.mean - 250.0).abs() < 1e-9);
    }

    #[test]
    fn mean_and_sum_are_order_independent() {
        let mut forward = MetricAccumulator::new();
        let mut backward = MetricAccumulator::new();
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        for value in values {
            forward.record(value);
        }
        for value in values.iter().rev() {
            backward.record(*value);
        }
        let forward_stats = forward.finish();
        let backward_stats = backward.finish();
        assert!((forward_stats.mean - backward_stats.mean).abs() < 1e-9);
        assert!((forward_stats.sum - backward_stats.sum).abs() < 1e-9);
        assert_eq!(forward_stats.count, backward_stats.count);
    }

    #[test]
    fn percentile_within_tolerance_for_large_uniform_sample() {
        let mut acc = MetricAccumulator::new();
        // Deterministic pseudo-uniform spread on [0, 1000) without relying
        // on a PRNG seed so the test doesn't become flaky across `rand`
        // versions.
        for i in 0..1_000_000_u64 {
            let value = (i % 1000) as f64;
            acc.record(value);
        }
        let stats = acc.finish();
        assert!(
            (stats.percentiles.p95 - 950.0).abs() <= 10.0,
            "p95 estimate {} outside tolerance",
            stats.percentiles.p95
        );
    }

    #[test]
    fn reservoir_never_exceeds_bound() {
        let mut acc = MetricAccumulator::new();
        for i in 0..50_000 {
            acc.record(i as f64);
        }
        let stats = acc.finish();
        assert_eq!(stats.samples_preserved, RESERVOIR_SIZE);
    }
}
