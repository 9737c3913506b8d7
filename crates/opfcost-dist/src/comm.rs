//! Worker-group collectives.
//!
//! A [`CommGroup`] is a fixed set of ranks `0..size` that only talk through
//! blocking collectives: barrier, gather of one value, and variable-length
//! gather. Rank 0 is the coordinator and is the only rank that receives
//! gathered data.
//!
//! Every rank must call the same collectives in the same order. A rank that
//! bails out with an error before a collective its peers are waiting in leaves
//! those peers blocked forever; there is no timeout and no cancellation.
//! [`CommGroup::all_ok`] is the way out: a rank that has failed still joins
//! it with `false`, and every rank learns that the group has to stop.

use opfcost_core::{CostError, CostResult};
use parking_lot::Mutex;
use std::sync::{Arc, Barrier};
use std::thread;
use tracing::error;

/// Rank of the worker that receives gathered data.
pub const COORDINATOR: usize = 0;

/// Blocking collective operations over a fixed worker group.
pub trait CommGroup: Send + Sync {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Block until every rank has reached this call.
    fn barrier(&self);

    /// Collect one value from every rank. `Some` (ordered by rank) on the
    /// coordinator, `None` elsewhere.
    fn gather(&self, value: f64) -> Option<Vec<f64>>;

    /// Collect a variable-length slice from every rank, concatenated in rank
    /// order. `counts[r]` must be the slice length of rank `r` on every rank.
    fn gatherv(&self, local: &[f64], counts: &[usize]) -> CostResult<Option<Vec<f64>>>;

    /// Agreement: `true` on every rank iff every rank passed `true`.
    fn all_ok(&self, ok: bool) -> bool;

    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR
    }
}

/// Check a gatherv call's arguments before taking part in the collective.
fn check_gatherv_args(rank: usize, size: usize, local: &[f64], counts: &[usize]) -> CostResult<()> {
    if counts.len() != size {
        return Err(CostError::config(format!(
            "gatherv counts has {} entries for a group of {}",
            counts.len(),
            size
        )));
    }
    if counts[rank] != local.len() {
        return Err(CostError::config(format!(
            "rank {} sends {} values but counts says {}",
            rank,
            local.len(),
            counts[rank]
        )));
    }
    Ok(())
}

/// Group of one: every collective completes immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoloGroup;

impl CommGroup for SoloGroup {
    fn rank(&self) -> usize {
        COORDINATOR
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn gather(&self, value: f64) -> Option<Vec<f64>> {
        Some(vec![value])
    }

    fn gatherv(&self, local: &[f64], counts: &[usize]) -> CostResult<Option<Vec<f64>>> {
        check_gatherv_args(COORDINATOR, 1, local, counts)?;
        Ok(Some(local.to_vec()))
    }

    fn all_ok(&self, ok: bool) -> bool {
        ok
    }
}

struct Shared {
    size: usize,
    barrier: Barrier,
    slots: Mutex<Vec<Vec<f64>>>,
    votes: Mutex<Vec<bool>>,
}

/// One rank of an in-process worker group backed by OS threads.
///
/// Members are created together by [`ThreadGroup::members`] and each is moved
/// onto its own thread. Collectives synchronise through a shared barrier; data
/// passes through per-rank slots that the coordinator drains.
pub struct ThreadGroup {
    rank: usize,
    shared: Arc<Shared>,
}

impl ThreadGroup {
    /// Create all `size` members of a new group.
    pub fn members(size: usize) -> CostResult<Vec<ThreadGroup>> {
        if size == 0 {
            return Err(CostError::config("worker group must have at least one rank"));
        }
        let shared = Arc::new(Shared {
            size,
            barrier: Barrier::new(size),
            slots: Mutex::new(vec![Vec::new(); size]),
            votes: Mutex::new(vec![true; size]),
        });
        Ok((0..size)
            .map(|rank| ThreadGroup {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect())
    }

    /// Run `work` on `size` threads, one per rank, and return the results in
    /// rank order.
    pub fn run<T, F>(size: usize, work: F) -> CostResult<Vec<T>>
    where
        T: Send,
        F: Fn(ThreadGroup) -> T + Sync,
    {
        let members = Self::members(size)?;
        thread::scope(|scope| {
            let handles: Vec<_> = members
                .into_iter()
                .map(|member| {
                    let work = &work;
                    scope.spawn(move || work(member))
                })
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(rank, handle)| {
                    handle.join().map_err(|_| {
                        error!(rank, "worker thread panicked");
                        CostError::config(format!("worker thread {rank} panicked"))
                    })
                })
                .collect()
        })
    }

    /// Deposit `data` in this rank's slot and return everyone's slots on the
    /// coordinator.
    fn exchange(&self, data: Vec<f64>) -> Option<Vec<Vec<f64>>> {
        self.shared.slots.lock()[self.rank] = data;
        self.shared.barrier.wait();
        let collected = if self.rank == COORDINATOR {
            let mut slots = self.shared.slots.lock();
            Some(slots.iter_mut().map(std::mem::take).collect())
        } else {
            None
        };
        // keep slots untouched until the coordinator has drained them
        self.shared.barrier.wait();
        collected
    }
}

impl CommGroup for ThreadGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }

    fn gather(&self, value: f64) -> Option<Vec<f64>> {
        self.exchange(vec![value])
            .map(|slots| slots.into_iter().flatten().collect())
    }

    fn gatherv(&self, local: &[f64], counts: &[usize]) -> CostResult<Option<Vec<f64>>> {
        if let Err(err) = check_gatherv_args(self.rank, self.shared.size, local, counts) {
            error!(
                rank = self.rank,
                "invalid gatherv arguments; peers waiting in this collective will block: {err}"
            );
            return Err(err);
        }
        let total: usize = counts.iter().sum();
        Ok(self.exchange(local.to_vec()).map(|slots| {
            let mut out = Vec::with_capacity(total);
            for slot in slots {
                out.extend(slot);
            }
            out
        }))
    }

    fn all_ok(&self, ok: bool) -> bool {
        self.shared.votes.lock()[self.rank] = ok;
        self.shared.barrier.wait();
        let agreed = self.shared.votes.lock().iter().all(|&v| v);
        // nobody votes again until every rank has counted this round
        self.shared.barrier.wait();
        agreed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solo_group_is_its_own_coordinator() {
        let group = SoloGroup;
        assert!(group.is_coordinator());
        assert_eq!(group.gather(3.5), Some(vec![3.5]));
        assert_eq!(group.gatherv(&[1.0, 2.0], &[2]).unwrap(), Some(vec![1.0, 2.0]));
        assert!(group.gatherv(&[1.0], &[2]).is_err());
    }

    #[test]
    fn thread_group_gather_lands_on_coordinator() {
        let results = ThreadGroup::run(4, |member| member.gather(member.rank() as f64 * 10.0))
            .unwrap();
        assert_eq!(results[0], Some(vec![0.0, 10.0, 20.0, 30.0]));
        assert!(results[1..].iter().all(Option::is_none));
    }

    #[test]
    fn thread_group_gatherv_orders_by_rank() {
        let counts = vec![2, 1, 0, 3];
        let results = ThreadGroup::run(4, |member| {
            let rank = member.rank();
            let local: Vec<f64> = (0..counts[rank]).map(|i| (rank * 100 + i) as f64).collect();
            member.barrier();
            member.gatherv(&local, &counts).unwrap()
        })
        .unwrap();
        assert_eq!(
            results[0],
            Some(vec![0.0, 1.0, 100.0, 300.0, 301.0, 302.0])
        );
        assert!(results[3].is_none());
    }

    #[test]
    fn repeated_collectives_do_not_mix_rounds() {
        let results = ThreadGroup::run(3, |member| {
            let first = member.gather(1.0 + member.rank() as f64);
            let second = member.gather(-(member.rank() as f64));
            (first, second)
        })
        .unwrap();
        assert_eq!(results[0].0, Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(results[0].1, Some(vec![0.0, -1.0, -2.0]));
    }

    #[test]
    fn one_dissenting_rank_stops_every_rank() {
        let results = ThreadGroup::run(4, |member| member.all_ok(member.rank() != 3)).unwrap();
        assert_eq!(results, vec![false; 4]);

        let results = ThreadGroup::run(4, |member| {
            let first = member.all_ok(true);
            let second = member.all_ok(member.rank() != 1);
            (first, second)
        })
        .unwrap();
        assert!(results.iter().all(|&(first, second)| first && !second));
        assert!(SoloGroup.all_ok(true));
    }

    #[test]
    fn empty_group_is_rejected() {
        assert!(ThreadGroup::members(0).is_err());
    }
}
