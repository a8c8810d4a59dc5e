//! Collision shapes
//!
//! A closed set of geometry variants. Shapes are immutable once built and are
//! shared between bodies through `Arc`.
//!
//! Every variant answers the same questions: bounding-sphere radius, volume,
//! local inertia for a given mass and world-space AABB.

pub mod compound;
pub mod convex;
pub mod heightfield;
pub mod octree;
pub mod primitives;
pub mod trimesh;

pub use compound::{Compound, CompoundChild};
pub use convex::{ClipPoint, ConvexPolyhedron};
pub use heightfield::{Heightfield, Pillar};
pub use primitives::{Cuboid, Cylinder, Sphere};
pub use trimesh::Trimesh;

use crate::collision::Aabb;
use crate::error::ShapeError;
use crate::foundation::math::{Transform, Vec3};

/// Shape variant tag
///
/// The discriminants order the narrowphase dispatch: a pair is always
/// handled with the lower kind first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum ShapeKind {
    /// Sphere
    Sphere = 1,
    /// Infinite plane
    Plane = 2,
    /// Box
    Box = 4,
    /// Compound
    Compound = 8,
    /// General convex hull
    ConvexPolyhedron = 16,
    /// Height field
    Heightfield = 32,
    /// Point
    Particle = 64,
    /// Cylinder
    Cylinder = 128,
    /// Triangle mesh
    Trimesh = 256,
}

impl ShapeKind {
    /// Numeric tag value
    pub const fn value(self) -> u16 {
        self as u16
    }

    /// Whether the kind is handled by the convex hull algorithms
    pub const fn is_convex_hull(self) -> bool {
        matches!(self, Self::Box | Self::ConvexPolyhedron | Self::Cylinder)
    }
}

/// Collision geometry
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Sphere around the origin
    Sphere(Sphere),
    /// Plane through the origin with normal +Z
    Plane,
    /// Box
    Box(Cuboid),
    /// General convex hull
    ConvexPolyhedron(ConvexPolyhedron),
    /// Cylinder along Z
    Cylinder(Cylinder),
    /// Height field over the XY plane
    Heightfield(Heightfield),
    /// Triangle mesh
    Trimesh(Trimesh),
    /// Point at the origin
    Particle,
    /// Rigid assembly of children
    Compound(Compound),
}

impl Shape {
    /// Sphere of the given radius
    pub fn sphere(radius: f64) -> Result<Self, ShapeError> {
        Sphere::new(radius).map(Self::Sphere)
    }

    /// Box with the given half extents
    pub fn cuboid(half_extents: Vec3) -> Result<Self, ShapeError> {
        Cuboid::new(half_extents).map(Self::Box)
    }

    /// Cylinder along Z
    pub fn cylinder(radius_top: f64, radius_bottom: f64, height: f64, segments: usize) -> Result<Self, ShapeError> {
        Cylinder::new(radius_top, radius_bottom, height, segments).map(Self::Cylinder)
    }

    /// Convex hull from vertices and counter-clockwise faces
    pub fn convex(vertices: Vec<Vec3>, faces: Vec<Vec<usize>>) -> Result<Self, ShapeError> {
        ConvexPolyhedron::new(vertices, faces).map(Self::ConvexPolyhedron)
    }

    /// Height field from `data[x][y]` samples
    pub fn heightfield(data: Vec<Vec<f64>>, element_size: f64) -> Result<Self, ShapeError> {
        Heightfield::new(data, element_size).map(Self::Heightfield)
    }

    /// Triangle mesh
    pub fn trimesh(vertices: Vec<Vec3>, indices: Vec<[usize; 3]>) -> Result<Self, ShapeError> {
        Trimesh::new(vertices, indices).map(Self::Trimesh)
    }

    /// Compound of children
    pub fn compound(children: Vec<CompoundChild>) -> Result<Self, ShapeError> {
        Compound::new(children).map(Self::Compound)
    }

    /// Variant tag
    pub const fn kind(&self) -> ShapeKind {
        match self {
            Self::Sphere(_) => ShapeKind::Sphere,
            Self::Plane => ShapeKind::Plane,
            Self::Box(_) => ShapeKind::Box,
            Self::ConvexPolyhedron(_) => ShapeKind::ConvexPolyhedron,
            Self::Cylinder(_) => ShapeKind::Cylinder,
            Self::Heightfield(_) => ShapeKind::Heightfield,
            Self::Trimesh(_) => ShapeKind::Trimesh,
            Self::Particle => ShapeKind::Particle,
            Self::Compound(_) => ShapeKind::Compound,
        }
    }

    /// Hull of the convex variants
    pub const fn convex_hull(&self) -> Option<&ConvexPolyhedron> {
        match self {
            Self::Box(b) => Some(b.hull()),
            Self::ConvexPolyhedron(hull) => Some(hull),
            Self::Cylinder(c) => Some(c.hull()),
            _ => None,
        }
    }

    /// Radius of a bounding sphere around the shape origin
    pub fn bounding_radius(&self) -> f64 {
        match self {
            Self::Sphere(s) => s.radius(),
            Self::Plane => f64::INFINITY,
            Self::Box(b) => b.half_extents().norm(),
            Self::ConvexPolyhedron(hull) => hull.bounding_radius(),
            Self::Cylinder(c) => c.hull().bounding_radius(),
            Self::Heightfield(hf) => hf.bounding_radius(),
            Self::Trimesh(mesh) => mesh.bounding_radius(),
            Self::Particle => 0.0,
            Self::Compound(compound) => compound.bounding_radius(),
        }
    }

    /// Enclosed volume (zero for planes, particles and height fields)
    pub fn volume(&self) -> f64 {
        match self {
            Self::Sphere(s) => s.volume(),
            Self::Box(b) => b.volume(),
            Self::ConvexPolyhedron(hull) => hull.volume(),
            Self::Cylinder(c) => c.hull().volume(),
            Self::Trimesh(mesh) => mesh.volume(),
            Self::Compound(compound) => compound.volume(),
            Self::Plane | Self::Heightfield(_) | Self::Particle => 0.0,
        }
    }

    /// Diagonal of the local inertia tensor for the given mass
    pub fn local_inertia(&self, mass: f64) -> Vec3 {
        match self {
            Self::Sphere(s) => s.local_inertia(mass),
            Self::Box(b) => b.local_inertia(mass),
            Self::ConvexPolyhedron(hull) => hull.local_inertia(mass),
            Self::Cylinder(c) => c.hull().local_inertia(mass),
            Self::Trimesh(mesh) => mesh.local_inertia(mass),
            Self::Compound(compound) => {
                let local = compound.world_aabb(&Transform::default());
                box_inertia(&local.extents(), mass)
            }
            Self::Plane | Self::Heightfield(_) | Self::Particle => Vec3::zeros(),
        }
    }

    /// Bounding box in world space
    pub fn world_aabb(&self, transform: &Transform) -> Aabb {
        match self {
            Self::Sphere(s) => Aabb::from_center_extents(transform.position, Vec3::repeat(s.radius())),
            Self::Plane => plane_aabb(transform),
            Self::Box(b) => b.hull().world_aabb(transform),
            Self::ConvexPolyhedron(hull) => hull.world_aabb(transform),
            Self::Cylinder(c) => c.hull().world_aabb(transform),
            Self::Heightfield(hf) => hf.world_aabb(transform),
            Self::Trimesh(mesh) => mesh.world_aabb(transform),
            Self::Particle => Aabb::new(transform.position, transform.position),
            Self::Compound(compound) => compound.world_aabb(transform),
        }
    }
}

/// Infinite box, half-bounded when the plane normal is axis aligned
fn plane_aabb(transform: &Transform) -> Aabb {
    const AXIS_EPSILON: f64 = 1e-12;
    let normal = transform.vector_to_world(&Vec3::z());
    let mut aabb = Aabb::infinite();
    for i in 0..3 {
        if (normal[i] - 1.0).abs() < AXIS_EPSILON {
            aabb.max[i] = transform.position[i];
        } else if (normal[i] + 1.0).abs() < AXIS_EPSILON {
            aabb.min[i] = transform.position[i];
        }
    }
    aabb
}

/// Inertia diagonal of a solid box with the given half extents
pub(crate) fn box_inertia(half_extents: &Vec3, mass: f64) -> Vec3 {
    let e = half_extents * 2.0;
    Vec3::new(
        mass / 12.0 * (e.y * e.y + e.z * e.z),
        mass / 12.0 * (e.x * e.x + e.z * e.z),
        mass / 12.0 * (e.x * e.x + e.y * e.y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    #[test]
    fn test_kind_ordering_follows_tags() {
        assert!(ShapeKind::Sphere < ShapeKind::Plane);
        assert!(ShapeKind::Cylinder < ShapeKind::Trimesh);
        assert_eq!(ShapeKind::Heightfield.value(), 32);
        assert_eq!(Shape::Particle.kind(), ShapeKind::Particle);
    }

    #[test]
    fn test_plane_aabb_is_half_bounded() {
        let t = Transform::from_position(Vec3::new(0.0, 0.0, 2.0));
        let aabb = Shape::Plane.world_aabb(&t);
        assert_relative_eq!(aabb.max.z, 2.0);
        assert!(aabb.min.z.is_infinite());
        assert!(aabb.max.x.is_infinite());

        let tilted = Transform::new(Vec3::zeros(), Quat::from_axis_angle(&Vec3::x_axis(), 0.3));
        let aabb = Shape::Plane.world_aabb(&tilted);
        assert!(aabb.max.z.is_infinite());
    }

    #[test]
    fn test_sphere_aabb_and_radius() {
        let s = Shape::sphere(0.5).unwrap();
        let aabb = s.world_aabb(&Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
        assert_relative_eq!(aabb.min, Vec3::new(0.5, -0.5, -0.5));
        assert_relative_eq!(s.bounding_radius(), 0.5);
    }

    #[test]
    fn test_compound_bounds_cover_children() {
        let child = Arc::new(Shape::sphere(1.0).unwrap());
        let compound = Shape::compound(vec![
            CompoundChild {
                shape: child.clone(),
                transform: Transform::from_position(Vec3::new(2.0, 0.0, 0.0)),
            },
            CompoundChild {
                shape: child,
                transform: Transform::from_position(Vec3::new(-2.0, 0.0, 0.0)),
            },
        ])
        .unwrap();
        assert_relative_eq!(compound.bounding_radius(), 3.0);
        let aabb = compound.world_aabb(&Transform::default());
        assert_relative_eq!(aabb.min.x, -3.0);
        assert_relative_eq!(aabb.max.x, 3.0);
        assert!(Shape::compound(Vec::new()).is_err());
    }
}
