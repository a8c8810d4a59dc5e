//! Convex hulls against planes and other hulls

use super::ContactPoint;
use crate::foundation::math::{Transform, Vec3};
use crate::shapes::ConvexPolyhedron;

/// Most contacts a plane keeps against one hull; the deepest vertices win
pub const MAX_PLANE_CONTACTS: usize = 8;

/// Depth range handed to hull clipping
pub const CLIP_MIN_DEPTH: f64 = -100.0;
/// Upper end of the clipping depth range
pub const CLIP_MAX_DEPTH: f64 = 100.0;

pub(super) fn plane_convex(tp: &Transform, hull: &ConvexPolyhedron, th: &Transform, out: &mut Vec<ContactPoint>) {
    let n = tp.vector_to_world(&Vec3::z());
    let mut below: Vec<(f64, ContactPoint)> = hull
        .vertices()
        .iter()
        .filter_map(|v| {
            let world = th.point_to_world(v);
            let d = (world - tp.position).dot(&n);
            (d <= 0.0).then(|| (d, ContactPoint::new(world - n * d, world, n)))
        })
        .collect();

    if below.len() > MAX_PLANE_CONTACTS {
        below.sort_by(|a, b| a.0.total_cmp(&b.0));
        below.truncate(MAX_PLANE_CONTACTS);
    }
    out.extend(below.into_iter().map(|(_, point)| point));
}

pub(super) fn convex_convex(
    a: &ConvexPolyhedron,
    ta: &Transform,
    b: &ConvexPolyhedron,
    tb: &Transform,
    out: &mut Vec<ContactPoint>,
) {
    if (tb.position - ta.position).norm() > a.bounding_radius() + b.bounding_radius() {
        return;
    }
    let Some(axis) = a.find_separating_axis(b, ta, tb) else {
        return;
    };
    for clip in a.clip_against_hull(ta, b, tb, &axis, CLIP_MIN_DEPTH, CLIP_MAX_DEPTH) {
        out.push(ContactPoint::new(clip.point - clip.normal * clip.depth, clip.point, axis));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use crate::shapes::{Cuboid, Cylinder};
    use approx::assert_relative_eq;

    fn cube(half: f64) -> Cuboid {
        Cuboid::new(Vec3::repeat(half)).unwrap()
    }

    #[test]
    fn test_plane_box_gives_four_corners() {
        let mut out = Vec::new();
        let box_tf = Transform::from_position(Vec3::new(0.0, 0.0, 0.49));
        plane_convex(&Transform::default(), cube(0.5).hull(), &box_tf, &mut out);
        assert_eq!(out.len(), 4);
        for p in &out {
            assert_relative_eq!(p.normal, Vec3::z(), epsilon = 1e-12);
            assert_relative_eq!(p.point_a.z, 0.0, epsilon = 1e-12);
            assert_relative_eq!(p.point_b.z, -0.01, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_plane_keeps_deepest_vertices() {
        let cylinder = Cylinder::new(0.5, 0.5, 1.0, 12).unwrap();
        // Twelve bottom vertices below the plane, the ones on the lowered side deeper
        let tilt = Quat::from_axis_angle(&Vec3::x_axis(), 0.01);
        let th = Transform::new(Vec3::new(0.0, 0.0, 0.45), tilt);
        let mut out = Vec::new();
        plane_convex(&Transform::default(), cylinder.hull(), &th, &mut out);
        assert_eq!(out.len(), MAX_PLANE_CONTACTS);

        let kept_max = out.iter().map(|p| p.point_b.z).fold(f64::NEG_INFINITY, f64::max);
        let below_count = cylinder
            .hull()
            .vertices()
            .iter()
            .filter(|v| th.point_to_world(v).z < kept_max - 1e-12)
            .count();
        assert!(below_count < MAX_PLANE_CONTACTS);
    }

    #[test]
    fn test_stacked_boxes_give_four_points() {
        let lower = Transform::default();
        let upper = Transform::from_position(Vec3::new(0.05, 0.0, 0.85));
        let mut out = Vec::new();
        convex_convex(cube(0.5).hull(), &lower, cube(0.4).hull(), &upper, &mut out);
        assert_eq!(out.len(), 4);
        for p in &out {
            assert_relative_eq!(p.normal, Vec3::z(), epsilon = 1e-12);
            assert_relative_eq!(p.depth(), -0.05, epsilon = 1e-9);
            assert_relative_eq!(p.point_a.z, 0.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_separated_hulls_give_nothing() {
        let mut out = Vec::new();
        let far = Transform::from_position(Vec3::new(0.0, 0.0, 1.2));
        convex_convex(cube(0.5).hull(), &Transform::default(), cube(0.5).hull(), &far, &mut out);
        assert!(out.is_empty());

        let beyond_reach = Transform::from_position(Vec3::new(5.0, 0.0, 0.0));
        convex_convex(cube(0.5).hull(), &Transform::default(), cube(0.5).hull(), &beyond_reach, &mut out);
        assert!(out.is_empty());
    }
}
