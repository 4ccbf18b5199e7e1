//! Pipeline configuration.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::kernels::{ExecutionMode, DEFAULT_WORK_GROUP_SIZE};
use crate::sampling::disk_distribution::DEFAULT_MAX_ATTEMPTS;
use crate::sampling::pattern::MAX_PATTERN_SIZE;

/// Default seed of the placement pattern.
pub const DEFAULT_SEED: u64 = 123;
/// Default upper bound on candidates generated for a single request.
pub const DEFAULT_MAX_CANDIDATES: usize = 1 << 24;

/// Order in which the worker services queued requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum QueueOrder {
    /// Oldest request first.
    #[default]
    Fifo,
    /// Most recent request first.
    Lifo,
}

/// Configuration of a [`crate::pipeline::PlacementPipeline`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PipelineConfig {
    /// Seed of the disk distribution that builds the placement pattern.
    pub seed: u64,
    /// Stencil width, `1..=8`.
    pub pattern_width: u32,
    /// Stencil height, `1..=8`.
    pub pattern_height: u32,
    /// Attempt budget per pattern point.
    pub max_attempts: u32,
    /// Execution mode of the standard stages.
    pub execution: ExecutionMode,
    /// Order of queued requests.
    pub queue_order: QueueOrder,
    /// Partition size of the parallel indexation scan.
    pub work_group_size: usize,
    /// Largest number of candidates a single request may generate.
    pub max_candidates: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            pattern_width: MAX_PATTERN_SIZE,
            pattern_height: MAX_PATTERN_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            execution: ExecutionMode::default(),
            queue_order: QueueOrder::default(),
            work_group_size: DEFAULT_WORK_GROUP_SIZE,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

impl PipelineConfig {
    /// Creates a new [`PipelineConfig`] with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pattern seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the stencil size.
    pub fn with_pattern_size(mut self, width: u32, height: u32) -> Self {
        self.pattern_width = width;
        self.pattern_height = height;
        self
    }

    /// Sets the attempt budget of the pattern generator.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the execution mode of the standard stages.
    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    /// Sets the queue order.
    pub fn with_queue_order(mut self, queue_order: QueueOrder) -> Self {
        self.queue_order = queue_order;
        self
    }

    /// Sets the indexation partition size.
    pub fn with_work_group_size(mut self, work_group_size: usize) -> Self {
        self.work_group_size = work_group_size;
        self
    }

    /// Sets the per-request candidate limit.
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    /// Validates the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        let size_ok = |s: u32| (1..=MAX_PATTERN_SIZE).contains(&s);
        if !size_ok(self.pattern_width) || !size_ok(self.pattern_height) {
            return Err(Error::InvalidConfig(format!(
                "pattern size must be within 1..={MAX_PATTERN_SIZE} per side, got {}x{}",
                self.pattern_width, self.pattern_height
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig("max_attempts must be > 0".into()));
        }
        if self.work_group_size == 0 {
            return Err(Error::InvalidConfig("work_group_size must be > 0".into()));
        }
        if self.max_candidates == 0 || self.max_candidates > u32::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "max_candidates must be within 1..={}",
                u32::MAX
            )));
        }
        Ok(())
    }
}
