#![forbid(unsafe_code)]
//! map_placement: Density-driven object placement with dithered stencils and stream compaction.
//!
//! Modules:
//! - field: scalar field sampling (closures, constants, in-memory rasters)
//! - data: world, layer and request descriptions
//! - sampling: toroidal disk distribution, placement pattern, dithering thresholds
//! - kernels: generation, evaluation, indexation and copy stages
//! - result: packed result buffer, class-indexed view, future handle
//! - pipeline: configuration and the asynchronous placement pipeline
//!
//! For usage, see README.
pub mod data;
pub mod error;
pub mod field;
pub mod kernels;
pub mod pipeline;
pub mod result;
pub mod sampling;

/// Convenient re-exports for common types. Import with `use map_placement::prelude::*;`.
pub mod prelude {
    pub use crate::data::{DensityMap, LayerData, PlacementRequest, WorldData};
    pub use crate::error::{Error, Result};
    pub use crate::field::{ConstantField, GridField, ScalarField};
    pub use crate::kernels::{
        classify, CopyStage, EvaluationStage, ExecutionMode, GenerationStage, IndexationStage,
        Stage, StageBuffers, StageChain, StageContext,
    };
    pub use crate::pipeline::{PipelineConfig, PlacementPipeline, QueueOrder};
    pub use crate::result::{
        FutureResult, PlacementElement, PlacementResult, PlacementStats, ResultBuffer,
    };
    pub use crate::sampling::{DiskDistributionGenerator, DiskDistributionGrid, PlacementPattern};
}
