//! Tileable disk distribution (Poisson-disk style) point generator.
//!
//! Points are drawn uniformly over the grid bounds and accepted only if they keep
//! a minimum distance to every accepted point, including the copies of those
//! points in neighbouring tiles. The accepted set therefore tiles the plane
//! without violating the separation across tile borders.
use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{Error, Result};
use crate::sampling::rand01;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 25;

/// Neighbour cell offsets checked on insertion: the 5x5 block around a cell minus
/// the cell itself and the four corners. Corner cells are at least
/// `cell_size * sqrt(2) == diameter` away from any point in the center cell.
const NEIGHBOURHOOD: [(isize, isize); 20] = [
    (-1, -2),
    (0, -2),
    (1, -2),
    (-2, -1),
    (-1, -1),
    (0, -1),
    (1, -1),
    (2, -1),
    (-2, 0),
    (-1, 0),
    (1, 0),
    (2, 0),
    (-2, 1),
    (-1, 1),
    (0, 1),
    (1, 1),
    (2, 1),
    (-1, 2),
    (0, 2),
    (1, 2),
];

/// Toroidal acceleration grid holding at most one point per cell.
#[derive(Clone, Debug)]
pub struct DiskDistributionGrid {
    diameter: f32,
    diameter_squared: f32,
    cell_size: f32,
    width: usize,
    height: usize,
    cells: Vec<Option<u32>>,
    points: Vec<Vec2>,
}

impl DiskDistributionGrid {
    /// Creates an empty grid of `width x height` cells with side `diameter / sqrt(2)`.
    ///
    /// Both dimensions must be at least 2 so a point never collides with its own tiled copy.
    pub fn new(diameter: f32, width: usize, height: usize) -> Result<Self> {
        if !diameter.is_finite() || diameter <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "disk diameter must be finite and > 0, got {diameter}"
            )));
        }
        if width < 2 || height < 2 {
            return Err(Error::InvalidConfig(format!(
                "disk distribution grid must be at least 2x2 cells, got {width}x{height}"
            )));
        }

        Ok(Self {
            diameter,
            diameter_squared: diameter * diameter,
            cell_size: diameter * std::f32::consts::FRAC_1_SQRT_2,
            width,
            height,
            cells: vec![None; width * height],
            points: Vec::new(),
        })
    }

    pub fn diameter(&self) -> f32 {
        self.diameter
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Grid dimensions in cells as `(width, height)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Extent of one tile; accepted points lie in `[0, bounds)`.
    pub fn bounds(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32) * self.cell_size
    }

    /// Accepted points in insertion order.
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Removes all points.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
        self.points.clear();
    }

    #[inline]
    fn cell_of(&self, p: Vec2) -> (usize, usize) {
        let x = ((p.x / self.cell_size).floor() as isize).clamp(0, self.width as isize - 1);
        let y = ((p.y / self.cell_size).floor() as isize).clamp(0, self.height as isize - 1);
        (x as usize, y as usize)
    }

    /// Returns `true` if `p` lies in the tile and keeps `diameter` to every point and tiled copy.
    pub fn is_free(&self, p: Vec2) -> bool {
        let bounds = self.bounds();
        if !(p.x >= 0.0 && p.x < bounds.x && p.y >= 0.0 && p.y < bounds.y) {
            return false;
        }

        let (cx, cy) = self.cell_of(p);
        if self.cells[cy * self.width + cx].is_some() {
            return false;
        }

        let (w, h) = (self.width as isize, self.height as isize);
        for (dx, dy) in NEIGHBOURHOOD {
            let (nx, shift_x) = wrap(cx as isize + dx, w, bounds.x);
            let (ny, shift_y) = wrap(cy as isize + dy, h, bounds.y);
            if let Some(idx) = self.cells[ny * self.width + nx] {
                let neighbour = self.points[idx as usize] + Vec2::new(shift_x, shift_y);
                if neighbour.distance_squared(p) < self.diameter_squared {
                    return false;
                }
            }
        }

        true
    }

    /// Inserts `p` if it is free. Returns whether it was accepted.
    pub fn try_insert(&mut self, p: Vec2) -> bool {
        if !self.is_free(p) {
            return false;
        }
        let (cx, cy) = self.cell_of(p);
        self.cells[cy * self.width + cx] = Some(self.points.len() as u32);
        self.points.push(p);
        true
    }
}

/// Wraps a cell coordinate into `[0, n)` and returns the position shift of the wrapped copy.
#[inline]
fn wrap(i: isize, n: isize, extent: f32) -> (usize, f32) {
    if i < 0 {
        ((i + n) as usize, -extent)
    } else if i >= n {
        ((i - n) as usize, extent)
    } else {
        (i as usize, 0.0)
    }
}

/// Seeded generator producing separated points one at a time.
#[derive(Clone, Debug)]
pub struct DiskDistributionGenerator {
    grid: DiskDistributionGrid,
    rng: StdRng,
    max_attempts: u32,
}

impl DiskDistributionGenerator {
    /// Creates a generator over a `width x height` cell grid for the given disk diameter.
    pub fn new(diameter: f32, width: usize, height: usize) -> Result<Self> {
        Ok(Self {
            grid: DiskDistributionGrid::new(diameter, width, height)?,
            rng: StdRng::seed_from_u64(0),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Sets how many random draws [`Self::generate`] makes before giving up.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the seed and returns the generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.set_seed(seed);
        self
    }

    /// Reseeds the random source. Already accepted points are kept.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn grid(&self) -> &DiskDistributionGrid {
        &self.grid
    }

    pub fn bounds(&self) -> Vec2 {
        self.grid.bounds()
    }

    pub fn points(&self) -> &[Vec2] {
        self.grid.points()
    }

    /// Draws uniform points until one is accepted, or fails after the attempt budget.
    pub fn generate(&mut self) -> Result<Vec2> {
        let bounds = self.grid.bounds();
        for _ in 0..self.max_attempts {
            let p = Vec2::new(
                rand01(&mut self.rng) * bounds.x,
                rand01(&mut self.rng) * bounds.y,
            );
            if self.grid.try_insert(p) {
                return Ok(p);
            }
        }
        Err(Error::MaxAttemptsExceeded {
            attempts: self.max_attempts,
        })
    }
}
