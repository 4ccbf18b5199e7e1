//! In-memory raster field with bilinear filtering.
use glam::Vec2;

use crate::error::{Error, Result};
use crate::field::ScalarField;

/// A row-major grid of samples covering the unit square.
///
/// Texel centers sit at `(i + 0.5) / width`; lookups outside the grid clamp to the edge.
#[derive(Clone, Debug)]
pub struct GridField {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl GridField {
    /// Creates a grid from row-major samples. Fails if `data.len() != width * height` or a dimension is zero.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidConfig(
                "grid field dimensions must be > 0".into(),
            ));
        }
        let len = texel_count(width, height)?;
        if data.len() != len {
            return Err(Error::InvalidConfig(format!(
                "grid field expects {} samples, got {}",
                len,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Builds a grid by evaluating `f` at every texel center.
    pub fn from_fn(width: usize, height: usize, f: impl Fn(Vec2) -> f32) -> Result<Self> {
        let mut data = Vec::with_capacity(texel_count(width, height)?);
        for iy in 0..height {
            for ix in 0..width {
                let uv = Vec2::new(
                    (ix as f32 + 0.5) / width as f32,
                    (iy as f32 + 0.5) / height as f32,
                );
                data.push(f(uv));
            }
        }
        Self::new(width, height, data)
    }

    /// Get the size of the grid as `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Get the texel at the given indices, clamping to the edge.
    pub fn get(&self, ix: isize, iy: isize) -> f32 {
        let x = ix.clamp(0, self.width as isize - 1) as usize;
        let y = iy.clamp(0, self.height as isize - 1) as usize;
        self.data[y * self.width + x]
    }
}

/// `width * height`, failing instead of overflowing.
fn texel_count(width: usize, height: usize) -> Result<usize> {
    width.checked_mul(height).ok_or_else(|| {
        Error::InvalidConfig(format!(
            "grid field of {width}x{height} texels is too large"
        ))
    })
}

impl ScalarField for GridField {
    fn sample(&self, uv: Vec2) -> f32 {
        let px = uv.x * self.width as f32 - 0.5;
        let py = uv.y * self.height as f32 - 0.5;
        let x0 = px.floor();
        let y0 = py.floor();
        let tx = px - x0;
        let ty = py - y0;
        let (ix, iy) = (x0 as isize, y0 as isize);

        let a = self.get(ix, iy);
        let b = self.get(ix + 1, iy);
        let c = self.get(ix, iy + 1);
        let d = self.get(ix + 1, iy + 1);

        let top = a + (b - a) * tx;
        let bottom = c + (d - c) * tx;
        top + (bottom - top) * ty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_mismatched_data() {
        assert!(GridField::new(2, 2, vec![0.0; 3]).is_err());
        assert!(GridField::new(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn oversized_dimensions_are_rejected() {
        assert!(matches!(
            GridField::new(usize::MAX, 2, Vec::new()),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            GridField::from_fn(usize::MAX, usize::MAX, |_| 0.0),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn sample_hits_texel_centers_exactly() {
        let grid = GridField::new(2, 1, vec![0.2, 0.8]).unwrap();
        assert!((grid.sample(Vec2::new(0.25, 0.5)) - 0.2).abs() < 1e-6);
        assert!((grid.sample(Vec2::new(0.75, 0.5)) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn sample_interpolates_between_texels() {
        let grid = GridField::new(2, 1, vec![0.0, 1.0]).unwrap();
        assert!((grid.sample(Vec2::new(0.5, 0.5)) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn sample_clamps_to_edge() {
        let grid = GridField::new(2, 2, vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        assert!((grid.sample(Vec2::new(0.0, 0.0)) - 0.1).abs() < 1e-6);
        assert!((grid.sample(Vec2::new(1.0, 1.0)) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn from_fn_evaluates_texel_centers() {
        let grid = GridField::from_fn(4, 1, |uv| uv.x).unwrap();
        assert!((grid.get(0, 0) - 0.125).abs() < 1e-6);
        assert!((grid.get(3, 0) - 0.875).abs() < 1e-6);
    }
}
