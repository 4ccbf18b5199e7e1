//! Scalar field samplers used for height and density lookups.
//!
//! The pipeline only needs a narrow contract from its inputs: given a
//! normalized coordinate in `[0, 1]^2`, return a value in `[0, 1]`.
//! - Implement [`ScalarField`] for custom sources (images, noise, GPU readbacks).
//! - Plain closures `Fn(Vec2) -> f32` implement it too.
//! - [`ConstantField`] and [`GridField`] cover the common in-memory cases.
use glam::Vec2;

pub mod grid;

pub use grid::GridField;

/// Trait for 2D scalar fields sampled at normalized coordinates.
///
/// Callers inside this crate always pass `uv` clamped to `[0, 1]^2`.
pub trait ScalarField: Send + Sync {
    fn sample(&self, uv: Vec2) -> f32;
}

impl<F> ScalarField for F
where
    F: Fn(Vec2) -> f32 + Send + Sync,
{
    #[inline]
    fn sample(&self, uv: Vec2) -> f32 {
        self(uv)
    }
}

/// A field returning the same value everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantField(pub f32);

impl ScalarField for ConstantField {
    #[inline]
    fn sample(&self, _uv: Vec2) -> f32 {
        self.0
    }
}

/// Samples `field` with `uv` clamped into the unit square and the result clamped to `[0, 1]`.
///
/// NaN samples are treated as `0.0`.
#[inline]
pub(crate) fn sample_clamped(field: &dyn ScalarField, uv: Vec2) -> f32 {
    let v = field.sample(uv.clamp(Vec2::ZERO, Vec2::ONE));
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}
