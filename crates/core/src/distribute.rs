//! Pure workload distribution: turning `(total_vus, per_worker_vus)` into a
//! list of per-worker VU assignments.

use crate::{error::InvalidDistribution, worker::WorkerAssignment};

/// `worker_count = ceil(total_vus / per_worker_vus)`; the first `N-1`
/// workers get `per_worker_vus` each, the last absorbs the remainder.
///
/// Guarantees: `sum(vus_for_worker) == total_vus`, every assignment has
/// `vus_for_worker >= 1`, indexing is `0..worker_count`.
pub fn distribute(
    total_vus: i64,
    per_worker_vus: i64,
) -> Result<Vec<WorkerAssignment>, InvalidDistribution> {
    if total_vus < 1 {
        return Err(InvalidDistribution::TotalVusNotPositive(total_vus));
    }
    if per_worker_vus < 1 {
        return Err(InvalidDistribution::PerWorkerVusNotPositive(per_worker_vus));
    }

    let worker_count = total_vus.div_ceil(per_worker_vus);
    let mut assignments = Vec::with_capacity(worker_count as usize);

    let mut remaining = total_vus;
    for worker_index in 0..worker_count {
        let vus_for_worker = if worker_index == worker_count - 1 {
            remaining
        } else {
            per_worker_vus
        };
        remaining -= vus_for_worker;
        assignments.push(WorkerAssignment {
            worker_index: worker_index as usize,
            worker_count: worker_count as usize,
            vus_for_worker,
        });
    }

    debug_assert_eq!(
        assignments.iter().map(|a| a.vus_for_worker).sum::<i64>(),
        total_vus
    );
    debug_assert!(assignments.iter().all(|a| a.vus_for_worker >= 1));

    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_vu_single_worker() {
        let assignments = distribute(1, 1).unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].vus_for_worker, 1);
    }

    #[test]
    fn total_equals_per_worker_gives_one_worker() {
        let assignments = distribute(5, 5).unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].vus_for_worker, 5);
    }

    #[test]
    fn remainder_one_gives_two_workers() {
        let assignments = distribute(6, 5).unwrap();
        let vus: Vec<i64> = assignments.iter().map(|a| a.vus_for_worker).collect();
        assert_eq!(vus, vec![5, 1]);
    }

    #[test]
    fn five_vus_two_per_worker_gives_two_two_one() {
        let assignments = distribute(5, 2).unwrap();
        let vus: Vec<i64> = assignments.iter().map(|a| a.vus_for_worker).collect();
        assert_eq!(vus, vec![2, 2, 1]);
    }

    #[test]
    fn sum_invariant_holds_broadly() {
        for total in 1..=200_i64 {
            for per_worker in 1..=50_i64 {
                let assignments = distribute(total, per_worker).unwrap();
                let sum: i64 = assignments.iter().map(|a| a.vus_for_worker).sum();
                assert_eq!(sum, total);
                assert!(assignments.iter().all(|a| a.vus_for_worker >= 1));
                for (idx, assignment) in assignments.iter().enumerate() {
                    assert_eq!(assignment.worker_index, idx);
                    assert_eq!(assignment.worker_count, assignments.len());
                }
            }
        }
    }

    #[test]
    fn rejects_non_positive_total() {
        assert!(matches!(
            distribute(0, 1),
            Err(InvalidDistribution::TotalVusNotPositive(0))
        ));
    }

    #[test]
    fn rejects_non_positive_per_worker() {
        assert!(matches!(
            distribute(1, 0),
            Err(InvalidDistribution::PerWorkerVusNotPositive(0))
        ));
    }
}
