//! Sampling primitives for candidate generation.
//!
//! - [`disk_distribution`]: seeded, tileable blue-noise point generator with a minimum separation.
//! - [`pattern`]: the fixed stencil of offsets built once from the generator.
//! - [`dither`]: the ordered-dithering thresholds indexed by stencil position.
use rand::RngCore;

pub mod disk_distribution;
pub mod dither;
pub mod pattern;

pub use disk_distribution::{DiskDistributionGenerator, DiskDistributionGrid};
pub use pattern::PlacementPattern;

/// Generate a random float in the range [0, 1).
#[inline]
pub(crate) fn rand01(rng: &mut dyn RngCore) -> f32 {
    let v = (rng.next_u32() as f32) / ((u32::MAX as f32) + 1.0);
    // u32 -> f32 rounding can land exactly on 1.0 for the largest inputs.
    v.min(next_down(1.0))
}

/// Compute the next smaller representable float value for positive finite input.
#[inline]
pub(crate) fn next_down(val: f32) -> f32 {
    debug_assert!(val.is_finite() && val > 0.0);
    f32::from_bits(val.to_bits() - 1)
}
