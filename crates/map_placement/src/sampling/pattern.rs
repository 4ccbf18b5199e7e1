//! The work-group placement pattern.
//!
//! A `width x height` stencil of offsets with pairwise (toroidal) separation of at
//! least `1.0`. It is generated once per pipeline and tiled over the placement
//! area, scaled by the layer footprint, so separation holds across tile borders.
use glam::Vec2;
use tracing::info;

use crate::error::{Error, Result};
use crate::sampling::disk_distribution::DiskDistributionGenerator;
use crate::sampling::dither;

/// Largest supported stencil side, matching the dithering matrix.
pub const MAX_PATTERN_SIZE: u32 = dither::DITHER_SIZE as u32;

/// Generator tile side, in cells, per square root of the stencil size.
///
/// Grid cells are `1 / sqrt(2)` wide, so the pattern covers `2 / 9` objects per squared
/// footprint. A saturated random packing reaches roughly three times that, but a tighter
/// tile makes the fixed attempt budget run out for some seeds.
const GRID_FACTOR: f32 = 3.0;

/// Immutable stencil of normalized offsets in `[0, bounds)`.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementPattern {
    width: u32,
    height: u32,
    bounds: Vec2,
    offsets: Vec<Vec2>,
}

impl PlacementPattern {
    /// Generates a pattern with unit separation from a seeded disk distribution.
    ///
    /// The generator tile is `ceil(3 * sqrt(width * height))` cells per side. This trades
    /// density for reliability: with the default budget of 25 attempts a factor of 3 did
    /// not fail for any size in thousands of seeds, while 2.5 already fails for a few seeds
    /// per thousand. Sparser stencils only mean that a layer at full density places fewer
    /// objects per area than a packing limited by the footprint alone would.
    ///
    /// Fails with [`Error::MaxAttemptsExceeded`] when the budget runs out.
    pub fn generate(width: u32, height: u32, seed: u64, max_attempts: u32) -> Result<Self> {
        validate_size(width, height)?;
        let count = (width * height) as usize;
        let cells = ((GRID_FACTOR * (count as f32).sqrt()).ceil() as usize).max(2);

        let mut generator = DiskDistributionGenerator::new(1.0, cells, cells)?
            .with_seed(seed)
            .with_max_attempts(max_attempts);

        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            offsets.push(generator.generate()?);
        }

        info!(
            "Generated {}x{} placement pattern over a {}x{} cell tile (seed {}).",
            width, height, cells, cells, seed
        );

        Ok(Self {
            width,
            height,
            bounds: generator.bounds(),
            offsets,
        })
    }

    /// Builds a pattern from explicit offsets in row-major stencil order.
    pub fn from_offsets(
        width: u32,
        height: u32,
        bounds: Vec2,
        offsets: Vec<Vec2>,
    ) -> Result<Self> {
        validate_size(width, height)?;
        if offsets.len() != (width * height) as usize {
            return Err(Error::InvalidConfig(format!(
                "pattern expects {} offsets, got {}",
                width * height,
                offsets.len()
            )));
        }
        if offsets
            .iter()
            .any(|o| !(o.x >= 0.0 && o.x < bounds.x && o.y >= 0.0 && o.y < bounds.y))
        {
            return Err(Error::InvalidConfig(
                "pattern offsets must lie in [0, bounds)".into(),
            ));
        }
        Ok(Self {
            width,
            height,
            bounds,
            offsets,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of stencil positions.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Normalized tile extent; one tile spans `bounds * footprint` world units.
    pub fn bounds(&self) -> Vec2 {
        self.bounds
    }

    /// All offsets in row-major stencil order.
    pub fn offsets(&self) -> &[Vec2] {
        &self.offsets
    }

    #[inline]
    pub fn offset(&self, stencil: usize) -> Vec2 {
        self.offsets[stencil]
    }

    /// `(x, y)` position of a stencil index inside the `width x height` stencil.
    #[inline]
    pub fn stencil_coords(&self, stencil: usize) -> (usize, usize) {
        let w = self.width as usize;
        (stencil % w, stencil / w)
    }

    /// Dithering threshold of a stencil index.
    #[inline]
    pub fn threshold(&self, stencil: usize) -> f32 {
        let (x, y) = self.stencil_coords(stencil);
        dither::threshold(x, y)
    }

    /// World-space tile extent for a footprint.
    #[inline]
    pub fn tile_extent(&self, footprint: f32) -> Vec2 {
        self.bounds * footprint
    }
}

fn validate_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 || width > MAX_PATTERN_SIZE || height > MAX_PATTERN_SIZE {
        return Err(Error::InvalidConfig(format!(
            "pattern size must be within 1..={MAX_PATTERN_SIZE} per side, got {width}x{height}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toroidal_distance(a: Vec2, b: Vec2, bounds: Vec2) -> f32 {
        let mut d = (a - b).abs();
        d.x = d.x.min(bounds.x - d.x);
        d.y = d.y.min(bounds.y - d.y);
        d.length()
    }

    #[test]
    fn default_pattern_has_unit_separation() {
        let pattern = PlacementPattern::generate(8, 8, 123, 25).expect("pattern");
        assert_eq!(pattern.len(), 64);
        let bounds = pattern.bounds();
        for (i, a) in pattern.offsets().iter().enumerate() {
            for b in &pattern.offsets()[i + 1..] {
                assert!(toroidal_distance(*a, *b, bounds) >= 1.0 - 1e-5);
            }
        }
    }

    #[test]
    fn pattern_is_deterministic_per_seed() {
        let a = PlacementPattern::generate(4, 4, 9, 25).unwrap();
        let b = PlacementPattern::generate(4, 4, 9, 25).unwrap();
        let c = PlacementPattern::generate(4, 4, 10, 25).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn pattern_density_stays_below_two_ninths() {
        for seed in [1u64, 123, 2024] {
            for side in 1..=MAX_PATTERN_SIZE {
                for (w, h) in [(side, side), (side, 1), (1, side)] {
                    let pattern = PlacementPattern::generate(w, h, seed, 25).unwrap();
                    let bounds = pattern.bounds();
                    let density = pattern.len() as f32 / (bounds.x * bounds.y);
                    assert!(density <= 2.0 / 9.0 + 1e-4, "{w}x{h}: {density}");
                }
            }
        }
        let pattern = PlacementPattern::generate(8, 8, 123, 25).unwrap();
        let bounds = pattern.bounds();
        assert!((64.0 / (bounds.x * bounds.y) - 2.0 / 9.0).abs() < 1e-4);
    }

    #[test]
    fn exhausted_attempt_budget_is_reported() {
        for seed in [1u64, 2, 3, 123] {
            assert!(matches!(
                PlacementPattern::generate(8, 8, seed, 1),
                Err(Error::MaxAttemptsExceeded { attempts: 1 })
            ));
        }
    }

    #[test]
    fn rejects_unsupported_sizes() {
        assert!(PlacementPattern::generate(0, 8, 1, 25).is_err());
        assert!(PlacementPattern::generate(9, 8, 1, 25).is_err());
    }

    #[test]
    fn stencil_coords_and_thresholds_follow_row_major_order() {
        let pattern = PlacementPattern::generate(4, 2, 3, 25).unwrap();
        assert_eq!(pattern.stencil_coords(0), (0, 0));
        assert_eq!(pattern.stencil_coords(5), (1, 1));
        assert_eq!(pattern.threshold(1), 32.0 / 64.0);
        assert_eq!(pattern.threshold(4), 48.0 / 64.0);
    }

    #[test]
    fn from_offsets_validates_inputs() {
        let bounds = Vec2::new(2.0, 2.0);
        assert!(PlacementPattern::from_offsets(1, 1, bounds, vec![Vec2::ONE]).is_ok());
        assert!(PlacementPattern::from_offsets(1, 1, bounds, vec![Vec2::splat(2.0)]).is_err());
        assert!(PlacementPattern::from_offsets(2, 1, bounds, vec![Vec2::ONE]).is_err());
    }
}
