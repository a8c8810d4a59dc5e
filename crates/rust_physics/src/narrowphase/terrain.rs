//! Spheres and hulls against height fields
//!
//! The query works in the field's local frame: the cells under the other
//! shape's bounding radius (plus one cell of margin) are visited and each of
//! their two triangle pillars is tested as a convex hull.

use super::convex::convex_convex;
use super::sphere::sphere_convex;
use super::ContactPoint;
use crate::foundation::math::{Transform, Vec3};
use crate::shapes::{ConvexPolyhedron, Heightfield, Pillar, Sphere};
use std::sync::Arc;

/// Cell index rectangle `(x0, x1, y0, y1)` around a local position, `None`
/// when it misses the field entirely
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn cell_range(field: &Heightfield, local: &Vec3, radius: f64) -> Option<(usize, usize, usize, usize)> {
    let w = field.element_size();
    let x_min = ((local.x - radius) / w).floor() as i64 - 1;
    let x_max = ((local.x + radius) / w).ceil() as i64 + 1;
    let y_min = ((local.y - radius) / w).floor() as i64 - 1;
    let y_max = ((local.y + radius) / w).ceil() as i64 + 1;

    let size_x = field.size_x() as i64;
    let size_y = field.size_y() as i64;
    if x_max < 0 || y_max < 0 || x_min > size_x || y_min > size_y {
        return None;
    }
    let clamp_x = |v: i64| v.clamp(0, size_x - 1) as usize;
    let clamp_y = |v: i64| v.clamp(0, size_y - 1) as usize;
    Some((clamp_x(x_min), clamp_x(x_max), clamp_y(y_min), clamp_y(y_max)))
}

/// Pillars near `center` (world) with their world transforms
fn visit_pillars(
    field: &Heightfield,
    tf: &Transform,
    center: &Vec3,
    radius: f64,
    mut visit: impl FnMut((usize, usize), &Pillar, &Transform) -> bool,
) {
    let local = tf.point_to_local(center);
    let Some((x0, x1, y0, y1)) = cell_range(field, &local, radius) else {
        return;
    };
    let (min, max) = field.rect_min_max(x0, y0, x1, y1);
    if local.z - radius > max || local.z + radius < min {
        return;
    }

    for xi in x0..x1 {
        for yi in y0..y1 {
            for upper in [false, true] {
                let pillar: Arc<Pillar> = field.convex_triangle_pillar(xi, yi, upper);
                let pillar_tf = Transform::new(tf.point_to_world(&pillar.offset), tf.orientation);
                if (center - pillar_tf.position).norm() >= pillar.hull.bounding_radius() + radius {
                    continue;
                }
                if !visit((xi, yi), &pillar, &pillar_tf) {
                    return;
                }
            }
        }
    }
}

pub(super) fn sphere_heightfield(
    sphere: &Sphere,
    ts: &Transform,
    field: &Heightfield,
    tf: &Transform,
    out: &mut Vec<ContactPoint>,
) {
    let mut last_cell = None;
    let mut cell_start = out.len();
    visit_pillars(field, tf, &ts.position, sphere.radius(), |cell, pillar, pillar_tf| {
        if last_cell != Some(cell) {
            last_cell = Some(cell);
            cell_start = out.len();
        }
        sphere_convex(sphere, ts, &pillar.hull, pillar_tf, out);
        // A sphere touches at most two triangles of one cell
        out.len() - cell_start <= 2
    });
}

pub(super) fn convex_heightfield(
    hull: &ConvexPolyhedron,
    th: &Transform,
    field: &Heightfield,
    tf: &Transform,
    out: &mut Vec<ContactPoint>,
) {
    visit_pillars(field, tf, &th.position, hull.bounding_radius(), |_, pillar, pillar_tf| {
        convex_convex(hull, th, &pillar.hull, pillar_tf, out);
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Cuboid;
    use approx::assert_relative_eq;

    fn flat(size: usize) -> Heightfield {
        Heightfield::new(vec![vec![0.0; size]; size], 1.0).unwrap()
    }

    #[test]
    fn test_cell_range_clamps_and_rejects() {
        let field = flat(5);
        assert_eq!(cell_range(&field, &Vec3::new(2.5, 2.5, 0.0), 0.5), Some((1, 4, 1, 4)));
        assert_eq!(cell_range(&field, &Vec3::new(-0.5, 0.2, 0.0), 0.2), Some((0, 1, 0, 2)));
        assert!(cell_range(&field, &Vec3::new(-5.0, 2.0, 0.0), 1.0).is_none());
        assert!(cell_range(&field, &Vec3::new(2.0, 9.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn test_sphere_on_flat_field() {
        let field = flat(5);
        let sphere = Sphere::new(0.5).unwrap();
        let ts = Transform::from_position(Vec3::new(2.3, 1.3, 0.45));
        let mut out = Vec::new();
        sphere_heightfield(&sphere, &ts, &field, &Transform::default(), &mut out);
        assert_eq!(out.len(), 1);
        for p in &out {
            assert_relative_eq!(p.normal, -Vec3::z(), epsilon = 1e-9);
            assert_relative_eq!(p.point_b.z, 0.0, epsilon = 1e-9);
            assert_relative_eq!(p.depth(), -0.05, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_sphere_above_field_misses() {
        let field = flat(5);
        let sphere = Sphere::new(0.5).unwrap();
        let mut out = Vec::new();
        let ts = Transform::from_position(Vec3::new(2.0, 2.0, 0.8));
        sphere_heightfield(&sphere, &ts, &field, &Transform::default(), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_box_on_flat_field() {
        let field = flat(6);
        let cube = Cuboid::new(Vec3::repeat(0.5)).unwrap();
        let th = Transform::from_position(Vec3::new(2.5, 2.5, 0.48));
        let mut out = Vec::new();
        convex_heightfield(cube.hull(), &th, &field, &Transform::default(), &mut out);
        assert!(!out.is_empty());
        for p in &out {
            assert_relative_eq!(p.normal, -Vec3::z(), epsilon = 1e-9);
            assert_relative_eq!(p.point_b.z, 0.0, epsilon = 1e-9);
        }
    }
}
