//! Candidate generation: tile the placement pattern over the query area.
//!
//! Tiles are anchored at the world origin, so the same world position always maps to
//! the same tile and stencil slot regardless of the query bounds. Every tile touching
//! `[lower_bound, upper_bound)` is generated in full; candidates falling outside the
//! bounds are marked [`CandidateState::OutOfBounds`] before any density is evaluated.
use glam::{Vec2, Vec3};
use rayon::prelude::*;

use crate::data::PlacementRequest;
use crate::kernels::{
    Candidate, CandidateState, ExecutionMode, Stage, StageBuffers, StageContext,
};
use crate::sampling::PlacementPattern;

/// Range of pattern tiles covering a query area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileRange {
    /// Index of the first tile along x and z.
    pub first: (i64, i64),
    /// Number of tiles along x and z.
    pub count: (u64, u64),
}

impl TileRange {
    /// Tiles of `tile_extent` (world units) covering `[lower, upper)`.
    pub fn covering(lower: Vec2, upper: Vec2, tile_extent: Vec2) -> Self {
        if !(upper.x > lower.x && upper.y > lower.y) {
            return Self {
                first: (0, 0),
                count: (0, 0),
            };
        }
        let first_x = (lower.x / tile_extent.x).floor() as i64;
        let first_z = (lower.y / tile_extent.y).floor() as i64;
        let end_x = (upper.x / tile_extent.x).ceil() as i64;
        let end_z = (upper.y / tile_extent.y).ceil() as i64;
        Self {
            first: (first_x, first_z),
            count: (
                end_x.saturating_sub(first_x).max(0) as u64,
                end_z.saturating_sub(first_z).max(0) as u64,
            ),
        }
    }

    /// Total number of tiles, saturating.
    pub fn len(&self) -> u64 {
        self.count.0.saturating_mul(self.count.1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Number of candidates a request generates with `pattern`, saturating at `usize::MAX`.
pub fn candidate_count(request: &PlacementRequest, pattern: &PlacementPattern) -> usize {
    let tiles = TileRange::covering(
        request.lower_bound,
        request.upper_bound,
        pattern.tile_extent(request.layer.footprint),
    );
    let total = tiles.len().saturating_mul(pattern.len() as u64);
    usize::try_from(total).unwrap_or(usize::MAX)
}

/// Produces one candidate per `(tile, stencil)` pair.
#[derive(Clone, Copy, Debug, Default)]
pub struct GenerationStage {
    execution: ExecutionMode,
}

impl GenerationStage {
    pub fn new(execution: ExecutionMode) -> Self {
        Self { execution }
    }
}

impl Stage for GenerationStage {
    fn label(&self) -> &'static str {
        "generation"
    }

    fn run(&self, ctx: &StageContext<'_>, mut buffers: StageBuffers) -> StageBuffers {
        let request = ctx.request;
        let pattern = ctx.pattern;
        let footprint = request.layer.footprint;
        let tile_extent = pattern.tile_extent(footprint);
        let tiles = TileRange::covering(request.lower_bound, request.upper_bound, tile_extent);

        let per_tile = pattern.len();
        let tiles_x = tiles.count.0 as usize;
        let total = candidate_count(request, pattern);

        let make = |i: usize| {
            let tile = i / per_tile;
            let stencil = i % per_tile;
            let tx = tiles.first.0 + (tile % tiles_x) as i64;
            let tz = tiles.first.1 + (tile / tiles_x) as i64;
            let origin = Vec2::new(tx as f32, tz as f32) * tile_extent;
            let ground = origin + pattern.offset(stencil) * footprint;

            if request.contains(ground) {
                Candidate {
                    position: Vec3::new(ground.x, request.world.height_at(ground), ground.y),
                    stencil: stencil as u32,
                    state: CandidateState::Unassigned,
                }
            } else {
                Candidate {
                    position: Vec3::new(ground.x, 0.0, ground.y),
                    stencil: stencil as u32,
                    state: CandidateState::OutOfBounds,
                }
            }
        };

        buffers.candidates = match self.execution {
            ExecutionMode::Parallel => (0..total).into_par_iter().map(make).collect(),
            ExecutionMode::Sequential => (0..total).map(make).collect(),
        };
        buffers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::test_support::*;

    #[test]
    fn tile_range_is_anchored_at_origin() {
        let range = TileRange::covering(Vec2::new(0.5, -0.5), Vec2::new(2.5, 0.5), Vec2::ONE);
        assert_eq!(range.first, (0, -1));
        assert_eq!(range.count, (3, 2));
        assert_eq!(range.len(), 6);
    }

    #[test]
    fn tile_range_of_degenerate_area_is_empty() {
        let range = TileRange::covering(Vec2::ONE, Vec2::new(1.0, 2.0), Vec2::ONE);
        assert!(range.is_empty());
    }

    #[test]
    fn aligned_upper_bound_does_not_add_a_tile() {
        let range = TileRange::covering(Vec2::ZERO, Vec2::new(2.0, 1.0), Vec2::ONE);
        assert_eq!(range.count, (2, 1));
    }

    #[test]
    fn generates_every_stencil_slot_of_every_tile() {
        // Tile = 2 * 0.5 = 1 world unit; 2x1 tiles => 8 candidates.
        let request = request(layer(0.5, &[1.0]), Vec2::ZERO, Vec2::new(2.0, 1.0));
        let pattern = grid_pattern();
        let ctx = StageContext {
            request: &request,
            pattern: &pattern,
        };
        let buffers = GenerationStage::new(ExecutionMode::Sequential).run(&ctx, StageBuffers::default());

        assert_eq!(buffers.candidates.len(), 8);
        let stencils: Vec<u32> = buffers.candidates.iter().map(|c| c.stencil).collect();
        assert_eq!(stencils, vec![0, 1, 2, 3, 0, 1, 2, 3]);
        assert_eq!(buffers.candidates[0].position, Vec3::new(0.25, 0.5, 0.25));
        assert_eq!(buffers.candidates[5].position, Vec3::new(1.75, 0.5, 0.25));
        assert!(buffers
            .candidates
            .iter()
            .all(|c| c.state == CandidateState::Unassigned));
    }

    #[test]
    fn candidates_outside_bounds_are_marked_before_evaluation() {
        let request = request(layer(0.5, &[1.0]), Vec2::ZERO, Vec2::new(0.5, 0.5));
        let pattern = grid_pattern();
        let ctx = StageContext {
            request: &request,
            pattern: &pattern,
        };
        let buffers = GenerationStage::new(ExecutionMode::Sequential).run(&ctx, StageBuffers::default());

        assert_eq!(buffers.candidates.len(), 4);
        assert_eq!(buffers.candidates[0].state, CandidateState::Unassigned);
        for c in &buffers.candidates[1..] {
            assert_eq!(c.state, CandidateState::OutOfBounds);
        }
    }

    #[test]
    fn parallel_and_sequential_generation_match() {
        let request = request(layer(0.1, &[1.0]), Vec2::new(-1.3, 0.2), Vec2::new(2.1, 3.7));
        let pattern = PlacementPattern::generate(8, 8, 5, 25).unwrap();
        let ctx = StageContext {
            request: &request,
            pattern: &pattern,
        };
        let seq = GenerationStage::new(ExecutionMode::Sequential).run(&ctx, StageBuffers::default());
        let par = GenerationStage::new(ExecutionMode::Parallel).run(&ctx, StageBuffers::default());
        assert_eq!(seq.candidates, par.candidates);
        assert_eq!(seq.candidates.len(), candidate_count(&request, &pattern));
    }
}
