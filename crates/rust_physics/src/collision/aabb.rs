//! Axis-aligned bounding boxes

use crate::foundation::math::{Transform, Vec3};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self {
            min: Vec3::zeros(),
            max: Vec3::zeros(),
        }
    }
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Unbounded box containing every point
    pub fn infinite() -> Self {
        Self {
            min: Vec3::repeat(f64::NEG_INFINITY),
            max: Vec3::repeat(f64::INFINITY),
        }
    }

    /// Smallest box containing all points, optionally transformed to world space
    ///
    /// Returns `None` for an empty point set.
    pub fn from_points<'a>(
        points: impl IntoIterator<Item = &'a Vec3>,
        transform: Option<&Transform>,
    ) -> Option<Self> {
        let mut points = points.into_iter().map(|p| transform.map_or(*p, |t| t.point_to_world(p)));
        let first = points.next()?;
        let mut aabb = Self::new(first, first);
        for p in points {
            aabb.extend_point(&p);
        }
        Some(aabb)
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Grow the box to contain a point
    pub fn extend_point(&mut self, p: &Vec3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Grow the box to contain another box
    pub fn extend(&mut self, other: &Self) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: &Vec3) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }

    /// Check if this AABB fully contains another AABB
    pub fn contains(&self, other: &Self) -> bool {
        (0..3).all(|i| other.min[i] >= self.min[i] && other.max[i] <= self.max[i])
    }

    /// Check if this AABB intersects another AABB (touching counts)
    pub fn intersects(&self, other: &Self) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && self.max[i] >= other.min[i])
    }

    /// The eight corners of the box
    pub fn corners(&self) -> [Vec3; 8] {
        let (l, u) = (self.min, self.max);
        [
            Vec3::new(l.x, l.y, l.z),
            Vec3::new(u.x, l.y, l.z),
            Vec3::new(u.x, u.y, l.z),
            Vec3::new(l.x, u.y, l.z),
            Vec3::new(l.x, l.y, u.z),
            Vec3::new(u.x, l.y, u.z),
            Vec3::new(u.x, u.y, u.z),
            Vec3::new(l.x, u.y, u.z),
        ]
    }

    /// Bounding box, in the frame of `frame`, of this world-space box
    pub fn to_local_frame(&self, frame: &Transform) -> Self {
        let corners = self.corners().map(|c| frame.point_to_local(&c));
        Self::from_points(&corners, None).unwrap_or(*self)
    }

    /// Bounding box, in world space, of this box expressed in the frame of `frame`
    pub fn to_world_frame(&self, frame: &Transform) -> Self {
        let corners = self.corners().map(|c| frame.point_to_world(&c));
        Self::from_points(&corners, None).unwrap_or(*self)
    }

    /// Box grown by `margin` on every side
    #[must_use]
    pub fn inflated(&self, margin: f64) -> Self {
        Self {
            min: self.min - Vec3::repeat(margin),
            max: self.max + Vec3::repeat(margin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;

    #[test]
    fn test_intersects_touching_and_disjoint() {
        let a = Aabb::new(Vec3::zeros(), Vec3::repeat(1.0));
        let touching = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let apart = Aabb::new(Vec3::new(1.5, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(a.intersects(&touching));
        assert!(touching.intersects(&a));
        assert!(!a.intersects(&apart));
    }

    #[test]
    fn test_from_points_and_contains() {
        let points = [Vec3::new(1.0, -2.0, 0.5), Vec3::new(-1.0, 3.0, 0.0)];
        let aabb = Aabb::from_points(&points, None).unwrap();
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 3.0, 0.5));
        assert!(aabb.contains_point(&Vec3::zeros()));
        assert!(aabb.contains(&Aabb::new(Vec3::repeat(-0.1), Vec3::repeat(0.1))));
        assert!(Aabb::from_points(&[], None).is_none());
    }

    #[test]
    fn test_frame_round_trip_of_unrotated_box() {
        let frame = Transform::from_position(Vec3::new(5.0, 0.0, 0.0));
        let aabb = Aabb::new(Vec3::repeat(-1.0), Vec3::repeat(1.0));
        let world = aabb.to_world_frame(&frame);
        assert_relative_eq!(world.center(), Vec3::new(5.0, 0.0, 0.0));
        assert_relative_eq!(world.to_local_frame(&frame).min, aabb.min);
    }

    #[test]
    fn test_rotated_box_grows() {
        let frame = Transform::new(Vec3::zeros(), Quat::from_axis_angle(&Vec3::z_axis(), std::f64::consts::FRAC_PI_4));
        let aabb = Aabb::new(Vec3::repeat(-1.0), Vec3::repeat(1.0)).to_world_frame(&frame);
        assert_relative_eq!(aabb.max.x, 2.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(aabb.max.z, 1.0, epsilon = 1e-12);
    }
}
