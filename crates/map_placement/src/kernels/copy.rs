//! Compaction of assigned candidates into a [`ResultBuffer`].
//!
//! Destination of a candidate = exclusive prefix sum of the class counts at its class
//! plus its index within the class. The output is therefore grouped by ascending class
//! and keeps generation order inside each class.
use bytemuck::Zeroable;
use rayon::prelude::*;
use tracing::warn;

use crate::kernels::indexation::index_sequential;
use crate::kernels::{Candidate, CandidateState, ExecutionMode, Stage, StageBuffers, StageContext};
use crate::result::{PlacementElement, PlacementStats, ResultBuffer};

/// Packs assigned candidates into the output buffer.
#[derive(Clone, Copy, Debug, Default)]
pub struct CopyStage {
    execution: ExecutionMode,
}

impl CopyStage {
    pub fn new(execution: ExecutionMode) -> Self {
        Self { execution }
    }
}

impl Stage for CopyStage {
    fn label(&self) -> &'static str {
        "copy"
    }

    fn run(&self, ctx: &StageContext<'_>, mut buffers: StageBuffers) -> StageBuffers {
        let num_classes = ctx.request.num_classes();
        if buffers.indices.len() != buffers.candidates.len()
            || buffers.class_counts.len() != num_classes
        {
            warn!("Copy stage ran without indexation; indexing sequentially.");
            let (indices, counts) = index_sequential(&buffers.candidates, num_classes);
            buffers.indices = indices;
            buffers.class_counts = counts;
        }

        let offsets = class_offsets(&buffers.class_counts);
        let total = offsets.last().copied().unwrap_or(0) as usize;

        let destination = |(candidate, index): (&Candidate, &Option<u32>)| {
            let class = candidate.class_index()?;
            let index = (*index)?;
            let dst = offsets[class as usize] as usize + index as usize;
            Some((dst, PlacementElement::new(candidate.position, class)))
        };

        let placed: Vec<(usize, PlacementElement)> = match self.execution {
            ExecutionMode::Parallel => buffers
                .candidates
                .par_iter()
                .zip(buffers.indices.par_iter())
                .filter_map(destination)
                .collect(),
            ExecutionMode::Sequential => buffers
                .candidates
                .iter()
                .zip(buffers.indices.iter())
                .filter_map(destination)
                .collect(),
        };

        let mut values = vec![PlacementElement::zeroed(); total];
        for (dst, element) in placed {
            values[dst] = element;
        }

        let stats = compute_stats(&buffers.candidates, total);
        buffers.output = Some(ResultBuffer::from_parts(
            buffers.class_counts.clone(),
            values,
            stats,
        ));
        buffers
    }
}

/// Exclusive prefix sum with the grand total appended.
fn class_offsets(counts: &[u32]) -> Vec<u32> {
    let mut offsets = Vec::with_capacity(counts.len() + 1);
    let mut sum = 0u32;
    offsets.push(0);
    for count in counts {
        sum += *count;
        offsets.push(sum);
    }
    offsets
}

fn compute_stats(candidates: &[Candidate], placed: usize) -> PlacementStats {
    let out_of_bounds = candidates
        .iter()
        .filter(|c| c.state == CandidateState::OutOfBounds)
        .count();
    PlacementStats {
        candidates: candidates.len(),
        out_of_bounds,
        unassigned: candidates.len() - out_of_bounds - placed,
        placed,
    }
}
