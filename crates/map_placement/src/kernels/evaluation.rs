//! Class assignment by ordered dithered thresholding.
//!
//! Each unassigned candidate carries the threshold of its stencil slot. Class densities
//! are accumulated in class order and the first class whose running sum exceeds the
//! threshold claims the candidate. Because every class only sees the density left over by
//! the classes before it, classes never overlap, and a class with density `d` claims
//! roughly a `d` share of the stencil slots.
use rayon::prelude::*;

use crate::kernels::{
    Candidate, CandidateState, ClassIndex, ExecutionMode, Stage, StageBuffers, StageContext,
};

/// Returns the first class whose accumulated density is strictly greater than `threshold`.
///
/// `densities` is consumed lazily, so later classes are not evaluated once a class claims
/// the candidate.
pub fn classify(densities: impl IntoIterator<Item = f32>, threshold: f32) -> Option<ClassIndex> {
    let mut accumulated = 0.0f32;
    for (class, density) in densities.into_iter().enumerate() {
        accumulated += density;
        if accumulated > threshold {
            return Some(class as ClassIndex);
        }
    }
    None
}

/// Assigns a class to every unassigned candidate.
#[derive(Clone, Copy, Debug, Default)]
pub struct EvaluationStage {
    execution: ExecutionMode,
}

impl EvaluationStage {
    pub fn new(execution: ExecutionMode) -> Self {
        Self { execution }
    }
}

impl Stage for EvaluationStage {
    fn label(&self) -> &'static str {
        "evaluation"
    }

    fn run(&self, ctx: &StageContext<'_>, mut buffers: StageBuffers) -> StageBuffers {
        let request = ctx.request;
        let pattern = ctx.pattern;

        let evaluate = |candidate: &mut Candidate| {
            if candidate.state != CandidateState::Unassigned {
                return;
            }
            let uv = request.world.uv(candidate.ground());
            let threshold = pattern.threshold(candidate.stencil as usize);
            let densities = request.layer.density_maps.iter().map(|m| m.density_at(uv));
            if let Some(class) = classify(densities, threshold) {
                candidate.state = CandidateState::Assigned(class);
            }
        };

        match self.execution {
            ExecutionMode::Parallel => buffers.candidates.par_iter_mut().for_each(evaluate),
            ExecutionMode::Sequential => buffers.candidates.iter_mut().for_each(evaluate),
        }
        buffers
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use super::*;
    use crate::data::{DensityMap, LayerData, PlacementRequest, WorldData};
    use crate::field::ConstantField;
    use crate::kernels::test_support::*;
    use crate::kernels::GenerationStage;
    use crate::sampling::PlacementPattern;

    fn evaluate(request: &PlacementRequest, pattern: &PlacementPattern, mode: ExecutionMode) -> Vec<Candidate> {
        let ctx = StageContext { request, pattern };
        let buffers = GenerationStage::new(mode).run(&ctx, StageBuffers::default());
        EvaluationStage::new(mode).run(&ctx, buffers).candidates
    }

    #[test]
    fn classify_uses_strict_comparison() {
        assert_eq!(classify([0.5], 0.5), None);
        assert_eq!(classify([0.5], 0.49), Some(0));
        assert_eq!(classify([0.0], 0.0), None);
    }

    #[test]
    fn classify_accumulates_in_class_order() {
        assert_eq!(classify([0.25, 0.25, 0.5], 0.3), Some(1));
        assert_eq!(classify([0.25, 0.25, 0.5], 0.6), Some(2));
        assert_eq!(classify([0.25, 0.25], 0.9), None);
        assert_eq!(classify(std::iter::empty::<f32>(), 0.0), None);
    }

    #[test]
    fn classify_stops_after_first_claim() {
        let mut evaluated = 0;
        let densities = [1.0, 1.0, 1.0].into_iter().inspect(|_| evaluated += 1);
        assert_eq!(classify(densities, 0.0), Some(0));
        assert_eq!(evaluated, 1);
    }

    #[test]
    fn zero_density_claims_nothing() {
        let request = request(layer(0.25, &[0.0, 0.0]), Vec2::ZERO, Vec2::ONE);
        let candidates = evaluate(&request, &grid_pattern(), ExecutionMode::Sequential);
        assert!(candidates.iter().all(|c| c.state == CandidateState::Unassigned));
    }

    #[test]
    fn full_density_claims_every_in_bounds_candidate() {
        let request = request(layer(0.25, &[1.0]), Vec2::ZERO, Vec2::new(0.75, 0.75));
        let candidates = evaluate(&request, &grid_pattern(), ExecutionMode::Parallel);
        for c in &candidates {
            match c.state {
                CandidateState::OutOfBounds => assert!(c.ground().x >= 0.75 || c.ground().y >= 0.75),
                state => assert_eq!(state, CandidateState::Assigned(0)),
            }
        }
    }

    #[test]
    fn half_density_claims_slots_below_one_half() {
        // Thresholds of the 2x2 stencil: 0, 0.5, 0.75, 0.25.
        let request = request(layer(0.25, &[0.5]), Vec2::ZERO, Vec2::new(0.5, 0.5));
        let candidates = evaluate(&request, &grid_pattern(), ExecutionMode::Sequential);
        let states: Vec<CandidateState> = candidates.iter().map(|c| c.state).collect();
        assert_eq!(
            states,
            vec![
                CandidateState::Assigned(0),
                CandidateState::Unassigned,
                CandidateState::Unassigned,
                CandidateState::Assigned(0),
            ]
        );
    }

    #[test]
    fn classes_split_the_stencil_without_overlap() {
        let request = request(layer(0.25, &[0.5, 0.5]), Vec2::ZERO, Vec2::new(0.5, 0.5));
        let candidates = evaluate(&request, &grid_pattern(), ExecutionMode::Sequential);
        let classes: Vec<Option<ClassIndex>> = candidates.iter().map(|c| c.class_index()).collect();
        assert_eq!(classes, vec![Some(0), Some(1), Some(1), Some(0)]);
    }

    #[test]
    fn density_is_sampled_at_world_uv() {
        // Density 1 on the left half of the world, 0 on the right.
        let world = WorldData::new(Vec3::new(2.0, 1.0, 2.0)).with_height_field(ConstantField(0.0));
        let layer = LayerData::new(0.25)
            .with_density_map(DensityMap::new(|uv: Vec2| if uv.x < 0.5 { 1.0f32 } else { 0.0 }));
        let request = PlacementRequest::new(world, layer, Vec2::ZERO, Vec2::splat(2.0));
        let candidates = evaluate(&request, &grid_pattern(), ExecutionMode::Parallel);
        for c in &candidates {
            if c.ground().x < 1.0 {
                assert_eq!(c.class_index(), Some(0));
            } else {
                assert_eq!(c.class_index(), None);
            }
        }
    }

    #[test]
    fn parallel_and_sequential_evaluation_match() {
        let layer = LayerData::new(0.05)
            .with_density_map(DensityMap::new(|uv: Vec2| uv.x * 0.6))
            .with_density_map(DensityMap::new(|uv: Vec2| uv.y * 0.4));
        let request = PlacementRequest::new(flat_world(), layer, Vec2::splat(0.1), Vec2::splat(0.9));
        let pattern = PlacementPattern::generate(8, 8, 7, 25).unwrap();
        assert_eq!(
            evaluate(&request, &pattern, ExecutionMode::Sequential),
            evaluate(&request, &pattern, ExecutionMode::Parallel)
        );
    }
}
