//! Per-class destination indices.
//!
//! For every assigned candidate the stage computes its index within its class: the number
//! of earlier candidates (in generation order) assigned to the same class. The parallel
//! path is a reduce-then-scan over fixed-size partitions:
//! - each partition counts its members per class and adds the totals to shared atomic
//!   counters;
//! - an ordered exclusive scan over the partition counts yields each partition's base
//!   offset per class;
//! - each partition scans its own members starting from its base.
//!
//! The bases depend only on partition order, so the output equals the sequential scan
//! for any partition size and any thread scheduling.
use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;

use crate::kernels::{
    Candidate, ExecutionMode, Stage, StageBuffers, StageContext, DEFAULT_WORK_GROUP_SIZE,
};

/// Computes destination indices and per-class counts.
#[derive(Clone, Copy, Debug)]
pub struct IndexationStage {
    execution: ExecutionMode,
    work_group_size: usize,
}

impl Default for IndexationStage {
    fn default() -> Self {
        Self::new(ExecutionMode::default(), DEFAULT_WORK_GROUP_SIZE)
    }
}

impl IndexationStage {
    /// `work_group_size` is the partition length of the parallel scan (at least 1).
    pub fn new(execution: ExecutionMode, work_group_size: usize) -> Self {
        Self {
            execution,
            work_group_size: work_group_size.max(1),
        }
    }

    pub fn work_group_size(&self) -> usize {
        self.work_group_size
    }
}

impl Stage for IndexationStage {
    fn label(&self) -> &'static str {
        "indexation"
    }

    fn run(&self, ctx: &StageContext<'_>, mut buffers: StageBuffers) -> StageBuffers {
        let num_classes = ctx.request.num_classes();
        let (indices, counts) = match self.execution {
            ExecutionMode::Parallel => {
                index_parallel(&buffers.candidates, num_classes, self.work_group_size)
            }
            ExecutionMode::Sequential => index_sequential(&buffers.candidates, num_classes),
        };
        buffers.indices = indices;
        buffers.class_counts = counts;
        buffers
    }
}

/// Class of a candidate if it is assigned to one of the `num_classes` classes.
#[inline]
fn valid_class(candidate: &Candidate, num_classes: usize) -> Option<usize> {
    candidate
        .class_index()
        .map(|c| c as usize)
        .filter(|c| *c < num_classes)
}

/// Single-pass scan in candidate order.
pub(crate) fn index_sequential(
    candidates: &[Candidate],
    num_classes: usize,
) -> (Vec<Option<u32>>, Vec<u32>) {
    let mut counts = vec![0u32; num_classes];
    let indices = candidates
        .iter()
        .map(|candidate| {
            valid_class(candidate, num_classes).map(|class| {
                let index = counts[class];
                counts[class] += 1;
                index
            })
        })
        .collect();
    (indices, counts)
}

/// Partitioned reduce-then-scan; identical output to [`index_sequential`].
pub(crate) fn index_parallel(
    candidates: &[Candidate],
    num_classes: usize,
    work_group_size: usize,
) -> (Vec<Option<u32>>, Vec<u32>) {
    let work_group_size = work_group_size.max(1);
    let totals: Vec<AtomicU32> = (0..num_classes).map(|_| AtomicU32::new(0)).collect();

    // Reduce: per-partition class counts.
    let partition_counts: Vec<Vec<u32>> = candidates
        .par_chunks(work_group_size)
        .map(|partition| {
            let mut local = vec![0u32; num_classes];
            for candidate in partition {
                if let Some(class) = valid_class(candidate, num_classes) {
                    local[class] += 1;
                }
            }
            for (total, count) in totals.iter().zip(&local) {
                if *count > 0 {
                    total.fetch_add(*count, Ordering::Relaxed);
                }
            }
            local
        })
        .collect();

    // Ordered exclusive scan over partitions.
    let mut running = vec![0u32; num_classes];
    let bases: Vec<Vec<u32>> = partition_counts
        .iter()
        .map(|local| {
            let base = running.clone();
            for (sum, count) in running.iter_mut().zip(local) {
                *sum += *count;
            }
            base
        })
        .collect();

    // Scan: each partition starts from its base.
    let mut indices = vec![None; candidates.len()];
    indices
        .par_chunks_mut(work_group_size)
        .zip(candidates.par_chunks(work_group_size))
        .zip(bases.into_par_iter())
        .for_each(|((out, partition), mut next)| {
            for (slot, candidate) in out.iter_mut().zip(partition) {
                *slot = valid_class(candidate, num_classes).map(|class| {
                    let index = next[class];
                    next[class] += 1;
                    index
                });
            }
        });

    let counts: Vec<u32> = totals.into_iter().map(AtomicU32::into_inner).collect();
    debug_assert_eq!(counts, running);
    (indices, counts)
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    use super::*;
    use crate::kernels::CandidateState;

    fn candidate(state: CandidateState) -> Candidate {
        Candidate {
            position: Vec3::ZERO,
            stencil: 0,
            state,
        }
    }

    /// Random mix of unassigned, out-of-bounds and assigned candidates, including
    /// class indices beyond `num_classes`.
    fn random_candidates(seed: u64, len: usize, num_classes: u32) -> Vec<Candidate> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len)
            .map(|_| {
                let roll = rng.next_u32() % (num_classes + 3);
                candidate(match roll {
                    r if r < num_classes => CandidateState::Assigned(r),
                    r if r == num_classes => CandidateState::Assigned(num_classes + 5),
                    r if r == num_classes + 1 => CandidateState::OutOfBounds,
                    _ => CandidateState::Unassigned,
                })
            })
            .collect()
    }

    #[test]
    fn sequential_indices_count_earlier_members_of_the_class() {
        let candidates = vec![
            candidate(CandidateState::Assigned(1)),
            candidate(CandidateState::Unassigned),
            candidate(CandidateState::Assigned(0)),
            candidate(CandidateState::Assigned(1)),
            candidate(CandidateState::OutOfBounds),
            candidate(CandidateState::Assigned(1)),
        ];
        let (indices, counts) = index_sequential(&candidates, 2);
        assert_eq!(
            indices,
            vec![Some(0), None, Some(0), Some(1), None, Some(2)]
        );
        assert_eq!(counts, vec![1, 3]);
    }

    #[test]
    fn out_of_range_classes_are_ignored() {
        let candidates = vec![
            candidate(CandidateState::Assigned(3)),
            candidate(CandidateState::Assigned(0)),
        ];
        let (indices, counts) = index_sequential(&candidates, 1);
        assert_eq!(indices, vec![None, Some(0)]);
        assert_eq!(counts, vec![1]);

        let (indices, counts) = index_parallel(&candidates, 1, 1);
        assert_eq!(indices, vec![None, Some(0)]);
        assert_eq!(counts, vec![1]);
    }

    #[test]
    fn parallel_matches_sequential_for_any_work_group_size() {
        for (seed, len, classes) in [(1u64, 1000usize, 3u32), (2, 257, 1), (3, 64, 5), (4, 0, 2)] {
            let candidates = random_candidates(seed, len, classes);
            let expected = index_sequential(&candidates, classes as usize);
            for work_group_size in [1, 7, 64, 256, 5000] {
                assert_eq!(
                    index_parallel(&candidates, classes as usize, work_group_size),
                    expected,
                    "seed {seed}, work group size {work_group_size}"
                );
            }
        }
    }

    #[test]
    fn indices_within_a_class_are_dense() {
        let candidates = random_candidates(9, 500, 4);
        let (indices, counts) = index_parallel(&candidates, 4, 16);
        for class in 0..4u32 {
            let mut seen: Vec<u32> = candidates
                .iter()
                .zip(&indices)
                .filter(|(c, _)| c.class_index() == Some(class))
                .filter_map(|(_, i)| *i)
                .collect();
            seen.sort_unstable();
            let expected: Vec<u32> = (0..counts[class as usize]).collect();
            assert_eq!(seen, expected);
        }
    }

    #[test]
    fn zero_work_group_size_is_clamped() {
        assert_eq!(
            IndexationStage::new(ExecutionMode::Parallel, 0).work_group_size(),
            1
        );
    }
}
