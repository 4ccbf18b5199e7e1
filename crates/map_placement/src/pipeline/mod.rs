//! Asynchronous placement front end.
//!
//! [`PlacementPipeline`] owns the placement pattern and a background worker. Each call to
//! [`PlacementPipeline::compute_placement`] snapshots its inputs into a request, queues it,
//! and returns a [`FutureResult`] right away.
use std::sync::Arc;

use glam::Vec2;
use tracing::{info, warn};

use crate::data::{LayerData, PlacementRequest, WorldData};
use crate::error::{Error, Result};
use crate::kernels::{candidate_count, StageChain};
use crate::result::future::channel;
use crate::result::{FutureResult, ResultBuffer};
use crate::sampling::PlacementPattern;

pub mod config;
mod worker;

pub use config::{PipelineConfig, QueueOrder};

use worker::{Job, Worker};

/// Computes object placements for rectangular world areas on a background worker.
pub struct PlacementPipeline {
    config: PipelineConfig,
    pattern: Arc<PlacementPattern>,
    worker: Worker,
}

impl PlacementPipeline {
    /// Creates a pipeline running the standard stage chain.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let chain = StageChain::standard(config.execution, config.work_group_size);
        Self::with_stages(config, chain)
    }

    /// Creates a pipeline running a custom stage chain.
    pub fn with_stages(config: PipelineConfig, chain: StageChain) -> Result<Self> {
        config.validate()?;
        let pattern = Arc::new(build_pattern(&config, config.seed)?);
        let worker = Worker::spawn(Arc::new(chain), config.queue_order)?;
        info!(
            "Placement pipeline ready | pattern: {}x{} | execution: {:?}.",
            config.pattern_width, config.pattern_height, config.execution
        );
        Ok(Self {
            config,
            pattern,
            worker,
        })
    }

    /// Queues a placement query over the ground-plane area `[lower_bound, upper_bound)`.
    ///
    /// Bounds are `(x, z)` pairs. The world and layer are copied, so later changes by the
    /// caller do not affect the request. An empty area resolves immediately to an empty
    /// result with one zero count per class. Invalid world or layer data fails here, before
    /// anything is queued.
    pub fn compute_placement(
        &self,
        world: &WorldData,
        layer: &LayerData,
        lower_bound: impl Into<mint::Vector2<f32>>,
        upper_bound: impl Into<mint::Vector2<f32>>,
    ) -> Result<FutureResult> {
        let lower_bound: Vec2 = lower_bound.into().into();
        let upper_bound: Vec2 = upper_bound.into().into();
        let request = PlacementRequest::new(world.clone(), layer.clone(), lower_bound, upper_bound);

        if request.is_degenerate() {
            return Ok(FutureResult::ready(ResultBuffer::empty(request.num_classes())));
        }

        request.world.validate()?;
        request.layer.validate()?;

        if request.num_classes() == 0 {
            warn!("Layer has no density maps; returning an empty result.");
            return Ok(FutureResult::ready(ResultBuffer::empty(0)));
        }

        let requested = candidate_count(&request, &self.pattern);
        if requested > self.config.max_candidates {
            return Err(Error::TooManyCandidates {
                requested,
                limit: self.config.max_candidates,
            });
        }

        let (promise, future) = channel();
        self.worker.submit(Job {
            request,
            pattern: self.pattern.clone(),
            promise,
        });
        Ok(future)
    }

    /// Regenerates the placement pattern from `seed`.
    ///
    /// Requests already queued keep the pattern they were submitted with.
    pub fn set_random_seed(&mut self, seed: u64) -> Result<()> {
        self.pattern = Arc::new(build_pattern(&self.config, seed)?);
        self.config.seed = seed;
        Ok(())
    }

    /// Pattern used by subsequent requests.
    pub fn pattern(&self) -> &PlacementPattern {
        &self.pattern
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Number of queued requests not yet picked up by the worker.
    pub fn pending_requests(&self) -> usize {
        self.worker.pending()
    }
}

impl std::fmt::Debug for PlacementPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacementPipeline")
            .field("config", &self.config)
            .field("pending_requests", &self.pending_requests())
            .finish()
    }
}

fn build_pattern(config: &PipelineConfig, seed: u64) -> Result<PlacementPattern> {
    PlacementPattern::generate(
        config.pattern_width,
        config.pattern_height,
        seed,
        config.max_attempts,
    )
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::data::DensityMap;
    use crate::field::ConstantField;
    use crate::kernels::ExecutionMode;

    fn world() -> WorldData {
        WorldData::new(Vec3::ONE).with_height_field(ConstantField(0.5))
    }

    fn layer(footprint: f32) -> LayerData {
        LayerData::new(footprint).with_density_map(DensityMap::new(ConstantField(1.0)))
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PipelineConfig::new().with_pattern_size(9, 9);
        assert!(matches!(
            PlacementPipeline::new(config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn pattern_failure_aborts_construction() {
        for seed in [1u64, 2, 3, 123] {
            let config = PipelineConfig::new().with_max_attempts(1).with_seed(seed);
            assert!(matches!(
                PlacementPipeline::new(config),
                Err(Error::MaxAttemptsExceeded { attempts: 1 })
            ));
        }
    }

    #[test]
    fn degenerate_area_resolves_immediately() {
        let pipeline = PlacementPipeline::new(PipelineConfig::default()).unwrap();
        let future = pipeline
            .compute_placement(&world(), &layer(0.1), Vec2::ONE, Vec2::new(1.0, 2.0))
            .unwrap();
        assert!(future.is_ready());
        assert_eq!(future.read_result().unwrap().counts(), &[0]);
    }

    #[test]
    fn degenerate_area_skips_validation() {
        let pipeline = PlacementPipeline::new(PipelineConfig::default()).unwrap();
        let future = pipeline
            .compute_placement(&WorldData::new(Vec3::ONE), &layer(0.1), Vec2::ONE, Vec2::ZERO)
            .unwrap();
        assert!(future.read_result().unwrap().is_empty());
    }

    #[test]
    fn missing_height_field_fails_synchronously() {
        let pipeline = PlacementPipeline::new(PipelineConfig::default()).unwrap();
        let err = pipeline
            .compute_placement(&WorldData::new(Vec3::ONE), &layer(0.1), Vec2::ZERO, Vec2::ONE)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidWorldData(_)));
    }

    #[test]
    fn layer_without_classes_resolves_empty() {
        let pipeline = PlacementPipeline::new(PipelineConfig::default()).unwrap();
        let future = pipeline
            .compute_placement(&world(), &LayerData::new(0.1), Vec2::ZERO, Vec2::ONE)
            .unwrap();
        let result = future.read_result().unwrap();
        assert_eq!(result.num_classes(), 0);
        assert!(result.is_empty());
    }

    #[test]
    fn candidate_limit_is_enforced() {
        let config = PipelineConfig::new().with_max_candidates(100);
        let pipeline = PlacementPipeline::new(config).unwrap();
        let err = pipeline
            .compute_placement(&world(), &layer(0.01), Vec2::ZERO, Vec2::ONE)
            .unwrap_err();
        assert!(matches!(err, Error::TooManyCandidates { limit: 100, .. }));
    }

    #[test]
    fn set_random_seed_replaces_pattern() {
        let mut pipeline = PlacementPipeline::new(PipelineConfig::default()).unwrap();
        let before = pipeline.pattern().clone();
        pipeline.set_random_seed(999).unwrap();
        assert_eq!(pipeline.config().seed, 999);
        assert_ne!(pipeline.pattern(), &before);
        pipeline.set_random_seed(123).unwrap();
        assert_eq!(pipeline.pattern(), &before);
    }

    #[test]
    fn accepts_mint_bounds() {
        let pipeline = PlacementPipeline::new(
            PipelineConfig::new().with_execution(ExecutionMode::Sequential),
        )
        .unwrap();
        let lower = mint::Vector2 { x: 0.0f32, y: 0.0 };
        let upper = mint::Vector2 { x: 0.5f32, y: 0.5 };
        let result = pipeline
            .compute_placement(&world(), &layer(0.1), lower, upper)
            .unwrap()
            .read_result()
            .unwrap();
        assert!(!result.is_empty());
    }
}
