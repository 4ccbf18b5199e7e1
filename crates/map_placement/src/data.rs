//! Request inputs: world description, density maps and layers.
//!
//! These are cheap value types. A [`crate::pipeline::PlacementPipeline`] clones them
//! into each request, so callers may keep mutating their own copies afterwards.
use std::fmt;
use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::error::{Error, Result};
use crate::field::{sample_clamped, ScalarField};

/// World extents plus the height field sampled at normalized ground coordinates.
///
/// The ground plane is XZ. A ground point `(x, z)` maps to `uv = (x / scale.x, z / scale.z)`
/// and its height is `height_field(uv) * scale.y`.
#[derive(Clone)]
pub struct WorldData {
    /// World extents in world units.
    pub scale: Vec3,
    /// Height field returning normalized heights in `[0, 1]`.
    pub height_field: Option<Arc<dyn ScalarField>>,
}

impl WorldData {
    /// Creates world data without a height field. Placement fails until one is set.
    pub fn new(scale: impl Into<mint::Vector3<f32>>) -> Self {
        Self {
            scale: Vec3::from(scale.into()),
            height_field: None,
        }
    }

    /// Sets the height field.
    pub fn with_height_field<F: ScalarField + 'static>(mut self, field: F) -> Self {
        self.height_field = Some(Arc::new(field));
        self
    }

    /// Sets the height field from a shared handle.
    pub fn with_height_field_arc(mut self, field: Arc<dyn ScalarField>) -> Self {
        self.height_field = Some(field);
        self
    }

    /// Validates the world data, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale.cmple(Vec3::ZERO).any() {
            return Err(Error::InvalidWorldData(format!(
                "scale must be finite and > 0 in all components, got {}",
                self.scale
            )));
        }
        if self.height_field.is_none() {
            return Err(Error::InvalidWorldData("height field is not set".into()));
        }
        Ok(())
    }

    /// Normalized field coordinate of a ground position given as `(x, z)`.
    #[inline]
    pub fn uv(&self, ground: Vec2) -> Vec2 {
        Vec2::new(ground.x / self.scale.x, ground.y / self.scale.z)
    }

    /// World-space height at a ground position given as `(x, z)`. Returns `0.0` without a height field.
    pub fn height_at(&self, ground: Vec2) -> f32 {
        match &self.height_field {
            Some(field) => sample_clamped(field.as_ref(), self.uv(ground)) * self.scale.y,
            None => 0.0,
        }
    }
}

impl fmt::Debug for WorldData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldData")
            .field("scale", &self.scale)
            .field("height_field", &self.height_field.is_some())
            .finish()
    }
}

/// One object class: a density field remapped by scale, offset and clamp.
#[derive(Clone)]
pub struct DensityMap {
    /// Density field returning values in `[0, 1]`.
    pub field: Arc<dyn ScalarField>,
    pub scale: f32,
    pub offset: f32,
    pub min_value: f32,
    pub max_value: f32,
}

impl DensityMap {
    /// Creates an identity-mapped density map (`scale = 1`, `offset = 0`, clamp to `[0, 1]`).
    pub fn new<F: ScalarField + 'static>(field: F) -> Self {
        Self::from_arc(Arc::new(field))
    }

    /// Creates an identity-mapped density map from a shared field.
    pub fn from_arc(field: Arc<dyn ScalarField>) -> Self {
        Self {
            field,
            scale: 1.0,
            offset: 0.0,
            min_value: 0.0,
            max_value: 1.0,
        }
    }

    /// Sets the multiplier applied to raw samples.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the offset added after scaling.
    pub fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the clamp range applied last.
    pub fn with_range(mut self, min_value: f32, max_value: f32) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self
    }

    /// `clamp(sample * scale + offset, min_value, max_value)` at a normalized coordinate.
    #[inline]
    pub fn density_at(&self, uv: Vec2) -> f32 {
        let raw = sample_clamped(self.field.as_ref(), uv);
        (raw * self.scale + self.offset).clamp(self.min_value, self.max_value)
    }

    fn validate(&self, class_index: usize) -> Result<()> {
        let finite = self.scale.is_finite()
            && self.offset.is_finite()
            && self.min_value.is_finite()
            && self.max_value.is_finite();
        if !finite {
            return Err(Error::InvalidLayerData(format!(
                "density map {class_index} has non-finite parameters"
            )));
        }
        if self.min_value > self.max_value {
            return Err(Error::InvalidLayerData(format!(
                "density map {class_index}: min_value {} > max_value {}",
                self.min_value, self.max_value
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for DensityMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DensityMap")
            .field("scale", &self.scale)
            .field("offset", &self.offset)
            .field("min_value", &self.min_value)
            .field("max_value", &self.max_value)
            .finish_non_exhaustive()
    }
}

/// A set of object classes sharing one footprint.
///
/// The index of a density map in [`LayerData::density_maps`] is its class index, and
/// that order is also the evaluation precedence.
#[derive(Clone, Debug)]
pub struct LayerData {
    /// Minimum center-to-center distance between any two placed objects.
    pub footprint: f32,
    /// Density maps in class order.
    pub density_maps: Vec<DensityMap>,
}

impl LayerData {
    /// Creates a layer with no classes.
    pub fn new(footprint: f32) -> Self {
        Self {
            footprint,
            density_maps: Vec::new(),
        }
    }

    /// Appends a class.
    pub fn with_density_map(mut self, map: DensityMap) -> Self {
        self.density_maps.push(map);
        self
    }

    /// Appends multiple classes.
    pub fn with_density_maps(mut self, maps: impl IntoIterator<Item = DensityMap>) -> Self {
        self.density_maps.extend(maps);
        self
    }

    /// Number of classes in this layer.
    pub fn num_classes(&self) -> usize {
        self.density_maps.len()
    }

    /// Validates the layer, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if !self.footprint.is_finite() || self.footprint <= 0.0 {
            return Err(Error::InvalidLayerData(format!(
                "footprint must be finite and > 0, got {}",
                self.footprint
            )));
        }
        if self.density_maps.len() > u32::MAX as usize {
            return Err(Error::InvalidLayerData("too many classes".into()));
        }
        for (i, map) in self.density_maps.iter().enumerate() {
            map.validate(i)?;
        }
        Ok(())
    }
}

/// One placement query: private copies of the inputs plus the ground-plane bounds.
///
/// Bounds are `(x, z)` pairs describing the half-open area `[lower_bound, upper_bound)`.
#[derive(Clone, Debug)]
pub struct PlacementRequest {
    pub world: WorldData,
    pub layer: LayerData,
    pub lower_bound: Vec2,
    pub upper_bound: Vec2,
}

impl PlacementRequest {
    pub fn new(world: WorldData, layer: LayerData, lower_bound: Vec2, upper_bound: Vec2) -> Self {
        Self {
            world,
            layer,
            lower_bound,
            upper_bound,
        }
    }

    /// Returns `true` if the area is empty in any dimension (or a bound is NaN).
    pub fn is_degenerate(&self) -> bool {
        !(self.upper_bound.x > self.lower_bound.x && self.upper_bound.y > self.lower_bound.y)
    }

    /// Returns `true` if a ground position `(x, z)` lies in `[lower_bound, upper_bound)`.
    #[inline]
    pub fn contains(&self, ground: Vec2) -> bool {
        ground.x >= self.lower_bound.x
            && ground.y >= self.lower_bound.y
            && ground.x < self.upper_bound.x
            && ground.y < self.upper_bound.y
    }

    pub fn num_classes(&self) -> usize {
        self.layer.num_classes()
    }
}
