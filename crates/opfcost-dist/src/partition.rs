//! Fair division of a scenario set across a worker group.
//!
//! Pure arithmetic: every worker computes the same plan from the same inputs,
//! so no communication is needed to agree on who prices what.

use opfcost_core::{CostError, CostResult};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Per-rank scenario counts for one costing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionPlan {
    total: usize,
    counts: Vec<usize>,
}

impl PartitionPlan {
    /// Split `total` scenarios over `workers` ranks. The first
    /// `total % workers` ranks take one extra scenario.
    pub fn new(total: usize, workers: usize) -> CostResult<Self> {
        if workers == 0 {
            return Err(CostError::config("worker group must have at least one rank"));
        }
        let quotient = total / workers;
        let remainder = total % workers;
        let counts: Vec<usize> = (0..workers)
            .map(|rank| if rank < remainder { quotient + 1 } else { quotient })
            .collect();
        debug_assert_eq!(counts.iter().sum::<usize>(), total);
        Ok(Self { total, counts })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn workers(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    fn check_rank(&self, rank: usize) -> CostResult<()> {
        if rank >= self.counts.len() {
            return Err(CostError::config(format!(
                "rank {} outside a group of {} workers",
                rank,
                self.counts.len()
            )));
        }
        Ok(())
    }

    pub fn count_for(&self, rank: usize) -> CostResult<usize> {
        self.check_rank(rank)?;
        Ok(self.counts[rank])
    }

    /// Global index of `rank`'s first scenario.
    pub fn offset_for(&self, rank: usize) -> CostResult<usize> {
        self.check_rank(rank)?;
        Ok(self.counts[..rank].iter().sum())
    }

    /// Global scenario indices owned by `rank`.
    pub fn range_for(&self, rank: usize) -> CostResult<Range<usize>> {
        let start = self.offset_for(rank)?;
        Ok(start..start + self.counts[rank])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_over_three() {
        let plan = PartitionPlan::new(10, 3).unwrap();
        assert_eq!(plan.counts(), &[4, 3, 3]);
        let offsets: Vec<usize> = (0..3).map(|r| plan.offset_for(r).unwrap()).collect();
        assert_eq!(offsets, vec![0, 4, 7]);
        assert_eq!(plan.range_for(2).unwrap(), 7..10);
    }

    #[test]
    fn counts_sum_and_differ_by_at_most_one() {
        for total in 0..60 {
            for workers in 1..12 {
                let plan = PartitionPlan::new(total, workers).unwrap();
                assert_eq!(plan.counts().iter().sum::<usize>(), total);
                let max = *plan.counts().iter().max().unwrap();
                let min = *plan.counts().iter().min().unwrap();
                assert!(max - min <= 1);
                let larger = total % workers;
                for (rank, count) in plan.counts().iter().enumerate() {
                    let expected = total / workers + usize::from(rank < larger);
                    assert_eq!(*count, expected);
                }
            }
        }
    }

    #[test]
    fn ranges_tile_the_scenario_set() {
        for total in 0..40 {
            for workers in 1..9 {
                let plan = PartitionPlan::new(total, workers).unwrap();
                let mut next = 0;
                for rank in 0..workers {
                    let range = plan.range_for(rank).unwrap();
                    assert_eq!(range.start, next);
                    next = range.end;
                }
                assert_eq!(next, total);
            }
        }
    }

    #[test]
    fn plan_is_identical_from_every_rank() {
        let plans: Vec<PartitionPlan> = (0..5).map(|_| PartitionPlan::new(23, 5).unwrap()).collect();
        assert!(plans.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn fewer_scenarios_than_workers() {
        let plan = PartitionPlan::new(2, 4).unwrap();
        assert_eq!(plan.counts(), &[1, 1, 0, 0]);
        assert_eq!(plan.offset_for(3).unwrap(), 2);
    }

    #[test]
    fn invalid_inputs_are_configuration_errors() {
        assert!(matches!(PartitionPlan::new(5, 0), Err(CostError::Configuration(_))));
        let plan = PartitionPlan::new(5, 2).unwrap();
        assert!(matches!(plan.offset_for(2), Err(CostError::Configuration(_))));
    }
}
