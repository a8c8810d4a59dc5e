//! Uniform grid broadphase
//!
//! The configured world box is split into `nx * ny * nz` cells. Each body is
//! binned into every cell its box touches and each cell runs the naive test.
//!
//! Bodies outside the world box are clamped into the boundary cells. This is
//! approximate: such bodies are still paired with everything in those cells,
//! so no pair is missed, but the grid stops pruning for them. A warning is
//! logged once per body.

use super::{intersection_test, make_pairs_unique, need_broadphase_collision, BodyPair, Broadphase};
use crate::body::Body;
use crate::collision::Aabb;
use crate::error::{PhysicsError, PhysicsResult};
use crate::foundation::collections::{BodyHandle, BodySet};
use crate::foundation::logging::warn;
use crate::foundation::math::Vec3;
use crate::shapes::Shape;
use std::collections::HashSet;

/// Grid of uniform cells over a fixed box
#[derive(Debug, Clone)]
pub struct GridBroadphase {
    bounds: Aabb,
    counts: [usize; 3],
    use_bounding_boxes: bool,
    bins: Vec<Vec<BodyHandle>>,
    warned: HashSet<u32>,
}

impl GridBroadphase {
    /// Create a grid; every count must be positive and the box non-degenerate
    pub fn new(aabb_min: Vec3, aabb_max: Vec3, nx: usize, ny: usize, nz: usize) -> PhysicsResult<Self> {
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(PhysicsError::InvalidConfig(format!(
                "Grid cell counts must be positive, got {nx}x{ny}x{nz}"
            )));
        }
        let size = aabb_max - aabb_min;
        if !size.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(PhysicsError::InvalidConfig(format!(
                "Grid bounds must span a positive volume, got {aabb_min:?} to {aabb_max:?}"
            )));
        }
        Ok(Self {
            bounds: Aabb::new(aabb_min, aabb_max),
            counts: [nx, ny, nz],
            use_bounding_boxes: false,
            bins: vec![Vec::new(); nx * ny * nz],
            warned: HashSet::new(),
        })
    }

    /// Number of cells
    pub fn cell_count(&self) -> usize {
        self.bins.len()
    }

    fn cell_size(&self) -> Vec3 {
        let size = self.bounds.max - self.bounds.min;
        Vec3::new(
            size.x / self.counts[0] as f64,
            size.y / self.counts[1] as f64,
            size.z / self.counts[2] as f64,
        )
    }

    fn cell_index(&self, x: usize, y: usize, z: usize) -> usize {
        (x * self.counts[1] + y) * self.counts[2] + z
    }

    /// Clamped cell range along one axis
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn axis_range(&self, axis: usize, low: f64, high: f64) -> (usize, usize) {
        let n = self.counts[axis];
        let mult = n as f64 / (self.bounds.max[axis] - self.bounds.min[axis]);
        let last = (n - 1) as f64;
        let first_cell = ((low - self.bounds.min[axis]) * mult).floor().clamp(0.0, last);
        let last_cell = ((high - self.bounds.min[axis]) * mult).ceil().clamp(0.0, last);
        (first_cell as usize, last_cell as usize)
    }

    fn add_box(&mut self, aabb: &Aabb, handle: BodyHandle) {
        let (x0, x1) = self.axis_range(0, aabb.min.x, aabb.max.x);
        let (y0, y1) = self.axis_range(1, aabb.min.y, aabb.max.y);
        let (z0, z1) = self.axis_range(2, aabb.min.z, aabb.max.z);
        for x in x0..=x1 {
            for y in y0..=y1 {
                for z in z0..=z1 {
                    let index = self.cell_index(x, y, z);
                    self.bins[index].push(handle);
                }
            }
        }
    }

    /// Bin a plane into every cell whose center is below the plane or
    /// within one cell radius above it
    fn add_plane(&mut self, body: &Body, handle: BodyHandle) {
        let Some(transform) = body.shape_transform(0) else {
            return;
        };
        let normal = transform.vector_to_world(&Vec3::z());
        let cell = self.cell_size();
        let cell_radius = cell.norm() * 0.5;
        for x in 0..self.counts[0] {
            for y in 0..self.counts[1] {
                for z in 0..self.counts[2] {
                    let center = self.bounds.min
                        + Vec3::new(
                            (x as f64 + 0.5) * cell.x,
                            (y as f64 + 0.5) * cell.y,
                            (z as f64 + 0.5) * cell.z,
                        );
                    if (center - transform.position).dot(&normal) < cell_radius {
                        let index = self.cell_index(x, y, z);
                        self.bins[index].push(handle);
                    }
                }
            }
        }
    }

    fn warn_if_outside(&mut self, body: &Body, aabb: &Aabb) {
        if !self.bounds.contains(aabb) && self.warned.insert(body.id()) {
            warn!(
                "Body {} is outside the grid bounds; it is clamped into the boundary cells",
                body.id()
            );
        }
    }
}

impl Broadphase for GridBroadphase {
    fn collision_pairs(&mut self, bodies: &BodySet, pairs: &mut Vec<BodyPair>) {
        for bin in &mut self.bins {
            bin.clear();
        }

        for (handle, body) in bodies {
            let single = body.shapes().first().filter(|_| body.shapes().len() == 1);
            match single.map(|s| (s.shape.as_ref(), s.offset)) {
                Some((Shape::Plane, _)) => self.add_plane(body, handle),
                Some((Shape::Sphere(sphere), offset)) => {
                    let center = body.point_to_world_frame(&offset);
                    let aabb = Aabb::from_center_extents(center, Vec3::repeat(sphere.radius()));
                    self.warn_if_outside(body, &aabb);
                    self.add_box(&aabb, handle);
                }
                _ => {
                    let aabb = *body.aabb();
                    self.warn_if_outside(body, &aabb);
                    self.add_box(&aabb, handle);
                }
            }
        }

        let start = pairs.len();
        for bin in &self.bins {
            for (i, &hi) in bin.iter().enumerate() {
                let bi = &bodies[hi];
                for &hj in &bin[..i] {
                    let bj = &bodies[hj];
                    if need_broadphase_collision(bi, bj) && intersection_test(bi, bj, self.use_bounding_boxes) {
                        pairs.push((hi, hj));
                    }
                }
            }
        }

        let mut found = pairs.split_off(start);
        make_pairs_unique(bodies, &mut found);
        pairs.append(&mut found);
    }

    fn use_bounding_boxes(&self) -> bool {
        self.use_bounding_boxes
    }

    fn set_use_bounding_boxes(&mut self, use_boxes: bool) {
        self.use_bounding_boxes = use_boxes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadphase::tests::{random_scene, sorted_ids};
    use crate::broadphase::NaiveBroadphase;

    #[test]
    fn test_rejects_bad_grids() {
        assert!(GridBroadphase::new(Vec3::zeros(), Vec3::repeat(1.0), 0, 1, 1).is_err());
        assert!(GridBroadphase::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 1.0), 1, 1, 1).is_err());
        assert_eq!(GridBroadphase::new(Vec3::zeros(), Vec3::repeat(1.0), 2, 3, 4).unwrap().cell_count(), 24);
    }

    #[test]
    fn test_agrees_with_naive() {
        let bodies = random_scene(42, 60, 8.0);
        let mut naive_pairs = Vec::new();
        NaiveBroadphase::new().collision_pairs(&bodies, &mut naive_pairs);

        let mut grid = GridBroadphase::new(Vec3::repeat(-10.0), Vec3::repeat(10.0), 5, 5, 5).unwrap();
        let mut grid_pairs = Vec::new();
        grid.collision_pairs(&bodies, &mut grid_pairs);

        assert_eq!(sorted_ids(&bodies, &grid_pairs), sorted_ids(&bodies, &naive_pairs));
    }

    #[test]
    fn test_outside_bodies_are_clamped() {
        let bodies = random_scene(5, 30, 20.0);
        let mut naive_pairs = Vec::new();
        NaiveBroadphase::new().collision_pairs(&bodies, &mut naive_pairs);

        let mut grid = GridBroadphase::new(Vec3::repeat(-5.0), Vec3::repeat(5.0), 4, 4, 4).unwrap();
        let mut grid_pairs = Vec::new();
        grid.collision_pairs(&bodies, &mut grid_pairs);
        let grid_ids = sorted_ids(&bodies, &grid_pairs);
        for pair in sorted_ids(&bodies, &naive_pairs) {
            assert!(grid_ids.contains(&pair));
        }
        assert!(!grid.warned.is_empty());
    }

    #[test]
    fn test_plane_reaches_cells_near_it() {
        let mut bodies = BodySet::with_key();
        let mut ground = Body::fixed().with_shape(Shape::Plane);
        ground.update_aabb();
        bodies.insert(ground);
        let mut ball = Body::new(1.0)
            .with_shape(Shape::sphere(0.5).unwrap())
            .with_position(Vec3::new(3.0, -2.0, 0.4));
        ball.id = 1;
        ball.update_aabb();
        bodies.insert(ball);

        let mut grid = GridBroadphase::new(Vec3::repeat(-10.0), Vec3::repeat(10.0), 4, 4, 4).unwrap();
        let mut pairs = Vec::new();
        grid.collision_pairs(&bodies, &mut pairs);
        assert_eq!(pairs.len(), 1);
    }
}
