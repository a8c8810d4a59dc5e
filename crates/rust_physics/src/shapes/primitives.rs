//! Analytic primitives: sphere, box and cylinder
//!
//! Boxes and cylinders carry a [`ConvexPolyhedron`] so the generic hull
//! algorithms work on them; spheres stay analytic.

use super::convex::ConvexPolyhedron;
use crate::error::ShapeError;
use crate::foundation::math::{Quat, Vec3};
use std::f64::consts::PI;

/// Sphere centred on the shape origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    radius: f64,
}

impl Sphere {
    /// Create a sphere; the radius must be non-negative
    pub fn new(radius: f64) -> Result<Self, ShapeError> {
        if !radius.is_finite() {
            return Err(ShapeError::InvalidDimensions(format!("sphere radius {radius}")));
        }
        if radius < 0.0 {
            return Err(ShapeError::NegativeRadius(radius));
        }
        Ok(Self { radius })
    }

    /// Sphere radius
    pub const fn radius(&self) -> f64 {
        self.radius
    }

    /// Solid sphere inertia `2/5 m r^2` on every axis
    pub fn local_inertia(&self, mass: f64) -> Vec3 {
        Vec3::repeat(2.0 * mass * self.radius * self.radius / 5.0)
    }

    /// Volume
    pub fn volume(&self) -> f64 {
        4.0 * PI * self.radius.powi(3) / 3.0
    }
}

/// Axis-aligned box given by its half extents
#[derive(Debug, Clone, PartialEq)]
pub struct Cuboid {
    half_extents: Vec3,
    hull: ConvexPolyhedron,
}

impl Cuboid {
    /// Create a box; every half extent must be positive
    pub fn new(half_extents: Vec3) -> Result<Self, ShapeError> {
        if !half_extents.iter().all(|e| e.is_finite() && *e > 0.0) {
            return Err(ShapeError::InvalidDimensions(format!(
                "box half extents must be positive, got {half_extents:?}"
            )));
        }

        let (sx, sy, sz) = (half_extents.x, half_extents.y, half_extents.z);
        let vertices = vec![
            Vec3::new(-sx, -sy, -sz),
            Vec3::new(sx, -sy, -sz),
            Vec3::new(sx, sy, -sz),
            Vec3::new(-sx, sy, -sz),
            Vec3::new(-sx, -sy, sz),
            Vec3::new(sx, -sy, sz),
            Vec3::new(sx, sy, sz),
            Vec3::new(-sx, sy, sz),
        ];
        let faces = vec![
            vec![3, 2, 1, 0], // -z
            vec![4, 5, 6, 7], // +z
            vec![5, 4, 0, 1], // -y
            vec![2, 3, 7, 6], // +y
            vec![0, 4, 7, 3], // -x
            vec![1, 2, 6, 5], // +x
        ];
        let hull = ConvexPolyhedron::new(vertices, faces)?.with_unique_axes(vec![Vec3::z(), Vec3::y(), Vec3::x()]);

        Ok(Self { half_extents, hull })
    }

    /// Half extents
    pub const fn half_extents(&self) -> &Vec3 {
        &self.half_extents
    }

    /// Hull representation
    pub const fn hull(&self) -> &ConvexPolyhedron {
        &self.hull
    }

    /// Face normals scaled by the half extents, rotated into world space:
    /// `+x, +y, +z, -x, -y, -z`
    pub fn side_normals(&self, orientation: &Quat) -> [Vec3; 6] {
        let e = self.half_extents;
        let x = orientation * Vec3::new(e.x, 0.0, 0.0);
        let y = orientation * Vec3::new(0.0, e.y, 0.0);
        let z = orientation * Vec3::new(0.0, 0.0, e.z);
        [x, y, z, -x, -y, -z]
    }

    /// Solid box inertia
    pub fn local_inertia(&self, mass: f64) -> Vec3 {
        super::box_inertia(&self.half_extents, mass)
    }

    /// Volume
    pub fn volume(&self) -> f64 {
        8.0 * self.half_extents.x * self.half_extents.y * self.half_extents.z
    }
}

/// Cylinder (or truncated cone) along the local Z axis, approximated by an
/// `N`-sided prism
#[derive(Debug, Clone, PartialEq)]
pub struct Cylinder {
    radius_top: f64,
    radius_bottom: f64,
    height: f64,
    segments: usize,
    hull: ConvexPolyhedron,
}

impl Cylinder {
    /// Create a cylinder centred on the origin
    pub fn new(radius_top: f64, radius_bottom: f64, height: f64, segments: usize) -> Result<Self, ShapeError> {
        if segments < 3 {
            return Err(ShapeError::InvalidDimensions(format!("cylinder needs at least 3 segments, got {segments}")));
        }
        if ![radius_top, radius_bottom, height].iter().all(|v| v.is_finite() && *v > 0.0) {
            return Err(ShapeError::InvalidDimensions(
                "cylinder radii and height must be positive".to_string(),
            ));
        }

        let half = height * 0.5;
        let angle = |i: f64| 2.0 * PI * i / segments as f64;

        // Vertices alternate bottom, top around the circumference
        let mut vertices = Vec::with_capacity(2 * segments);
        for i in 0..segments {
            let theta = angle(i as f64);
            vertices.push(Vec3::new(radius_bottom * theta.cos(), radius_bottom * theta.sin(), -half));
            vertices.push(Vec3::new(radius_top * theta.cos(), radius_top * theta.sin(), half));
        }

        let mut faces = Vec::with_capacity(segments + 2);
        let mut axes = Vec::with_capacity(segments + 1);
        for i in 0..segments {
            let next = (i + 1) % segments;
            faces.push(vec![2 * next, 2 * next + 1, 2 * i + 1, 2 * i]);

            // Opposite side faces of an even prism share an axis
            if segments % 2 == 1 || i < segments / 2 {
                let theta = angle(i as f64 + 0.5);
                axes.push(Vec3::new(theta.cos(), theta.sin(), 0.0));
            }
        }
        faces.push((0..segments).map(|i| 2 * i + 1).collect());
        faces.push((0..segments).rev().map(|i| 2 * i).collect());
        axes.push(Vec3::z());

        let hull = ConvexPolyhedron::new(vertices, faces)?.with_unique_axes(axes);
        Ok(Self {
            radius_top,
            radius_bottom,
            height,
            segments,
            hull,
        })
    }

    /// Top radius
    pub const fn radius_top(&self) -> f64 {
        self.radius_top
    }

    /// Bottom radius
    pub const fn radius_bottom(&self) -> f64 {
        self.radius_bottom
    }

    /// Height along Z
    pub const fn height(&self) -> f64 {
        self.height
    }

    /// Number of side faces
    pub const fn segments(&self) -> usize {
        self.segments
    }

    /// Hull representation
    pub const fn hull(&self) -> &ConvexPolyhedron {
        &self.hull
    }
}
