//! Placement stages operating on shared candidate buffers.
//!
//! A request runs through a [`StageChain`], by default:
//! 1. [`generation::GenerationStage`] tiles the pattern over the query area;
//! 2. [`evaluation::EvaluationStage`] assigns classes by dithered density thresholds;
//! 3. [`indexation::IndexationStage`] computes per-class destination indices;
//! 4. [`copy::CopyStage`] packs the survivors into a [`ResultBuffer`].
//!
//! Every stage runs either data-parallel or sequentially and both produce identical
//! buffers, so a sequential stage can stand in as a reference for a parallel one.
use glam::{Vec2, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::PlacementRequest;
use crate::error::{Error, Result};
use crate::result::ResultBuffer;
use crate::sampling::PlacementPattern;

pub mod copy;
pub mod evaluation;
pub mod generation;
pub mod indexation;

pub use copy::CopyStage;
pub use evaluation::{classify, EvaluationStage};
pub use generation::{candidate_count, GenerationStage, TileRange};
pub use indexation::IndexationStage;

/// Index of a class inside a layer.
pub type ClassIndex = u32;

/// Default partition size of the indexation scan.
pub const DEFAULT_WORK_GROUP_SIZE: usize = 64;

/// Resolution state of a candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CandidateState {
    /// Not claimed by any class (yet).
    Unassigned,
    /// Outside the query bounds; never eligible for any class.
    OutOfBounds,
    /// Claimed by a class.
    Assigned(ClassIndex),
}

/// A tentatively generated position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub position: Vec3,
    /// Stencil index inside the placement pattern.
    pub stencil: u32,
    pub state: CandidateState,
}

impl Candidate {
    #[inline]
    pub fn class_index(&self) -> Option<ClassIndex> {
        match self.state {
            CandidateState::Assigned(class) => Some(class),
            _ => None,
        }
    }

    /// Ground-plane position `(x, z)`.
    #[inline]
    pub fn ground(&self) -> Vec2 {
        Vec2::new(self.position.x, self.position.z)
    }
}

/// How a stage spreads its work.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExecutionMode {
    /// Data-parallel over the rayon thread pool.
    #[default]
    Parallel,
    /// Single-threaded, in candidate order.
    Sequential,
}

/// Read-only inputs shared by all stages of one request.
#[derive(Clone, Copy, Debug)]
pub struct StageContext<'a> {
    pub request: &'a PlacementRequest,
    pub pattern: &'a PlacementPattern,
}

/// Buffers passed from stage to stage.
#[derive(Clone, Debug, Default)]
pub struct StageBuffers {
    /// Candidates in generation order.
    pub candidates: Vec<Candidate>,
    /// Destination index within its class for every assigned candidate.
    pub indices: Vec<Option<u32>>,
    /// Number of candidates per class.
    pub class_counts: Vec<u32>,
    /// Packed output, set by the final stage.
    pub output: Option<ResultBuffer>,
}

/// One step of the placement chain.
pub trait Stage: Send + Sync {
    fn label(&self) -> &'static str;

    fn run(&self, ctx: &StageContext<'_>, buffers: StageBuffers) -> StageBuffers;
}

/// Ordered list of stages executed for each request.
#[derive(Default)]
pub struct StageChain {
    stages: Vec<Box<dyn Stage>>,
}

impl StageChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Generation, evaluation, indexation and copy, all using `execution`.
    pub fn standard(execution: ExecutionMode, work_group_size: usize) -> Self {
        Self::new()
            .with_stage(GenerationStage::new(execution))
            .with_stage(EvaluationStage::new(execution))
            .with_stage(IndexationStage::new(execution, work_group_size))
            .with_stage(CopyStage::new(execution))
    }

    /// Appends a stage.
    pub fn with_stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Labels of all stages in execution order.
    pub fn labels(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.label()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs all stages and returns the packed output.
    ///
    /// Fails if no stage produced an output buffer.
    pub fn run(&self, ctx: &StageContext<'_>) -> Result<ResultBuffer> {
        let mut buffers = StageBuffers::default();
        for stage in &self.stages {
            buffers = stage.run(ctx, buffers);
            debug!(
                "Stage '{}' done | candidates: {}.",
                stage.label(),
                buffers.candidates.len()
            );
        }
        buffers.output.ok_or_else(|| {
            Error::InvalidConfig(format!(
                "stage chain {:?} produced no output buffer",
                self.labels()
            ))
        })
    }
}

impl std::fmt::Debug for StageChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageChain")
            .field("stages", &self.labels())
            .finish()
    }
}
