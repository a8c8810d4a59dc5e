//! Height-field terrain
//!
//! Samples `data[i][j]` are heights along local +Z at `(i * w, j * w)`, where
//! `w` is the element size. Each grid cell is split into a lower triangle
//! `(i, j), (i + 1, j), (i, j + 1)` and an upper triangle
//! `(i + 1, j + 1), (i, j + 1), (i + 1, j)`. For collision against convex
//! shapes every triangle is extruded into a downward "pillar" prism; pillars
//! are built on demand and cached until a height in their cell changes.

use super::convex::ConvexPolyhedron;
use crate::collision::Aabb;
use crate::error::ShapeError;
use crate::foundation::math::{Transform, Vec3};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Depth of the pillar bottoms below the lowest sample
const PILLAR_DEPTH: f64 = 1.0;

/// Cached pillar of one height-field triangle
#[derive(Debug, Clone, PartialEq)]
pub struct Pillar {
    /// Prism geometry relative to `offset`
    pub hull: ConvexPolyhedron,
    /// Position of the prism origin in height-field space
    pub offset: Vec3,
}

type PillarKey = (usize, usize, bool);

/// Regular grid of height samples
#[derive(Debug)]
pub struct Heightfield {
    data: Vec<Vec<f64>>,
    element_size: f64,
    min_value: f64,
    max_value: f64,
    bounding_radius: f64,
    pillar_cache: Mutex<HashMap<PillarKey, Arc<Pillar>>>,
}

impl Clone for Heightfield {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            element_size: self.element_size,
            min_value: self.min_value,
            max_value: self.max_value,
            bounding_radius: self.bounding_radius,
            pillar_cache: Mutex::new(HashMap::new()),
        }
    }
}

impl PartialEq for Heightfield {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data && self.element_size == other.element_size
    }
}

impl Heightfield {
    /// Create a height field from `data[x][y]` samples
    pub fn new(data: Vec<Vec<f64>>, element_size: f64) -> Result<Self, ShapeError> {
        if !(element_size.is_finite() && element_size > 0.0) {
            return Err(ShapeError::InvalidHeightfield(format!("element size must be positive, got {element_size}")));
        }
        if data.len() < 2 {
            return Err(ShapeError::InvalidHeightfield("need at least 2 rows of samples".to_string()));
        }
        let columns = data[0].len();
        if columns < 2 || data.iter().any(|row| row.len() != columns) {
            return Err(ShapeError::InvalidHeightfield(
                "rows must all have the same length of at least 2".to_string(),
            ));
        }
        if data.iter().flatten().any(|h| !h.is_finite()) {
            return Err(ShapeError::InvalidHeightfield("heights must be finite".to_string()));
        }

        let mut heightfield = Self {
            data,
            element_size,
            min_value: 0.0,
            max_value: 0.0,
            bounding_radius: 0.0,
            pillar_cache: Mutex::new(HashMap::new()),
        };
        heightfield.update_bounds();
        Ok(heightfield)
    }

    fn update_bounds(&mut self) {
        let samples = self.data.iter().flatten().copied();
        self.min_value = samples.clone().fold(f64::INFINITY, f64::min);
        self.max_value = samples.fold(f64::NEG_INFINITY, f64::max);
        let s = self.element_size;
        self.bounding_radius = Vec3::new(
            self.data.len() as f64 * s,
            self.data[0].len() as f64 * s,
            self.max_value.abs().max(self.min_value.abs()),
        )
        .norm();
    }

    /// Samples along X
    pub fn size_x(&self) -> usize {
        self.data.len()
    }

    /// Samples along Y
    pub fn size_y(&self) -> usize {
        self.data[0].len()
    }

    /// Spacing between samples
    pub const fn element_size(&self) -> f64 {
        self.element_size
    }

    /// Lowest sample
    pub const fn min_value(&self) -> f64 {
        self.min_value
    }

    /// Highest sample
    pub const fn max_value(&self) -> f64 {
        self.max_value
    }

    /// Radius of a sphere around the local origin enclosing the field
    pub const fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }

    /// Height sample at a grid index, clamped into the grid
    pub fn height_at_index(&self, xi: usize, yi: usize) -> f64 {
        self.data[xi.min(self.size_x() - 1)][yi.min(self.size_y() - 1)]
    }

    /// Overwrite one sample and drop the pillars that touch it
    pub fn set_height_value_at_index(&mut self, xi: usize, yi: usize, value: f64) -> Result<(), ShapeError> {
        if xi >= self.size_x() || yi >= self.size_y() {
            return Err(ShapeError::InvalidHeightfield(format!("index ({xi}, {yi}) is outside the grid")));
        }
        if !value.is_finite() {
            return Err(ShapeError::InvalidHeightfield("heights must be finite".to_string()));
        }

        let previous_min = self.min_value;
        self.data[xi][yi] = value;
        self.update_bounds();

        let cache = self.pillar_cache.get_mut().unwrap_or_else(PoisonError::into_inner);
        if self.min_value == previous_min {
            for (cx, cy) in [(Some(xi), Some(yi)), (xi.checked_sub(1), Some(yi)), (Some(xi), yi.checked_sub(1)), (xi.checked_sub(1), yi.checked_sub(1))] {
                if let (Some(cx), Some(cy)) = (cx, cy) {
                    cache.remove(&(cx, cy, false));
                    cache.remove(&(cx, cy, true));
                }
            }
        } else {
            // Pillar bottoms follow the minimum, so every pillar is stale
            cache.clear();
        }
        Ok(())
    }

    /// Number of cached pillars
    pub fn cached_pillar_count(&self) -> usize {
        self.pillar_cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Grid cell containing a local position.
    ///
    /// Without `clamp`, positions outside the grid yield `None`; with it the
    /// cell index is clamped to the nearest valid cell.
    pub fn index_of_position(&self, x: f64, y: f64, clamp: bool) -> Option<(usize, usize)> {
        let w = self.element_size;
        let xi = (x / w).floor();
        let yi = (y / w).floor();
        let max_x = (self.size_x() - 2) as f64;
        let max_y = (self.size_y() - 2) as f64;

        if clamp {
            return Some((xi.clamp(0.0, max_x) as usize, yi.clamp(0.0, max_y) as usize));
        }
        if xi < 0.0 || yi < 0.0 || xi > max_x || yi > max_y || xi.is_nan() || yi.is_nan() {
            return None;
        }
        Some((xi as usize, yi as usize))
    }

    /// Lowest sample and highest sample in the inclusive index rectangle
    pub fn rect_min_max(&self, min_x: usize, min_y: usize, max_x: usize, max_y: usize) -> (f64, f64) {
        let max_x = max_x.min(self.size_x() - 1);
        let max_y = max_y.min(self.size_y() - 1);
        let mut max = self.min_value;
        for row in self.data.iter().take(max_x + 1).skip(min_x) {
            for &height in row.iter().take(max_y + 1).skip(min_y) {
                max = max.max(height);
            }
        }
        (self.min_value, max)
    }

    /// Bounding box of a grid cell, from the pillar bottom up to its highest corner
    pub fn aabb_at_index(&self, xi: usize, yi: usize) -> Aabb {
        let w = self.element_size;
        let (_, top) = self.rect_min_max(xi, yi, xi + 1, yi + 1);
        Aabb::new(
            Vec3::new(xi as f64 * w, yi as f64 * w, self.min_value - PILLAR_DEPTH),
            Vec3::new((xi + 1) as f64 * w, (yi + 1) as f64 * w, top),
        )
    }

    /// Corners of one triangle of a cell, counter-clockwise seen from above
    pub fn triangle(&self, xi: usize, yi: usize, upper: bool) -> [Vec3; 3] {
        let w = self.element_size;
        let corner = |i: usize, j: usize| Vec3::new(i as f64 * w, j as f64 * w, self.height_at_index(i, j));
        if upper {
            [corner(xi + 1, yi + 1), corner(xi, yi + 1), corner(xi + 1, yi)]
        } else {
            [corner(xi, yi), corner(xi + 1, yi), corner(xi, yi + 1)]
        }
    }

    /// Interpolated surface height at a local position
    ///
    /// Returns `None` outside the grid unless `edge_clamp` is set.
    pub fn height_at(&self, x: f64, y: f64, edge_clamp: bool) -> Option<f64> {
        let (xi, yi) = self.index_of_position(x, y, edge_clamp)?;
        let w = self.element_size;
        let lower_dist2 = (x / w - xi as f64).powi(2) + (y / w - yi as f64).powi(2);
        let upper_dist2 = (x / w - (xi + 1) as f64).powi(2) + (y / w - (yi + 1) as f64).powi(2);
        let [a, b, c] = self.triangle(xi, yi, lower_dist2 > upper_dist2);

        let weights = barycentric_weights(x, y, &a, &b, &c);
        Some(weights.x * a.z + weights.y * b.z + weights.z * c.z)
    }

    /// Pillar prism of one triangle, built on first use
    pub fn convex_triangle_pillar(&self, xi: usize, yi: usize, upper: bool) -> Arc<Pillar> {
        let key = (xi, yi, upper);
        let mut cache = self.pillar_cache.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cache.entry(key).or_insert_with(|| Arc::new(self.build_pillar(xi, yi, upper))))
    }

    fn build_pillar(&self, xi: usize, yi: usize, upper: bool) -> Pillar {
        let w = self.element_size;
        let lowest = [(0, 0), (1, 0), (0, 1), (1, 1)]
            .iter()
            .map(|&(dx, dy)| self.height_at_index(xi + dx, yi + dy))
            .fold(f64::INFINITY, f64::min);

        // Vertical centre between the lowest sample and the lowest corner of the cell
        let h = (lowest - self.min_value) / 2.0 + self.min_value;
        let bottom = self.min_value - PILLAR_DEPTH;
        let fraction = if upper { 0.75 } else { 0.25 };
        let offset = Vec3::new((xi as f64 + fraction) * w, (yi as f64 + fraction) * w, h);

        let top = self.triangle(xi, yi, upper).map(|v| v - offset);
        let base = top.map(|v| Vec3::new(v.x, v.y, bottom - h));
        Pillar {
            hull: ConvexPolyhedron::prism_from_corners(top, base),
            offset,
        }
    }

    /// World box of the whole field
    pub fn world_aabb(&self, transform: &Transform) -> Aabb {
        let w = self.element_size;
        let local = Aabb::new(
            Vec3::new(0.0, 0.0, self.min_value - PILLAR_DEPTH),
            Vec3::new((self.size_x() - 1) as f64 * w, (self.size_y() - 1) as f64 * w, self.max_value),
        );
        local.to_world_frame(transform)
    }
}

/// Barycentric weights of `(x, y)` in the XY projection of triangle `abc`
fn barycentric_weights(x: f64, y: f64, a: &Vec3, b: &Vec3, c: &Vec3) -> Vec3 {
    let denominator = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
    if denominator == 0.0 {
        return Vec3::new(1.0, 0.0, 0.0);
    }
    let wa = ((b.y - c.y) * (x - c.x) + (c.x - b.x) * (y - c.y)) / denominator;
    let wb = ((c.y - a.y) * (x - c.x) + (a.x - c.x) * (y - c.y)) / denominator;
    Vec3::new(wa, wb, 1.0 - wa - wb)
}
