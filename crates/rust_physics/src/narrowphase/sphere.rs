//! Sphere against spheres, planes, boxes and convex hulls

use super::{point_in_polygon, ContactPoint};
use crate::foundation::math::{Transform, Vec3};
use crate::shapes::{ConvexPolyhedron, Cuboid, Sphere};

pub(super) fn sphere_sphere(a: &Sphere, ta: &Transform, b: &Sphere, tb: &Transform, out: &mut Vec<ContactPoint>) {
    let reach = a.radius() + b.radius();
    let d = tb.position - ta.position;
    if d.norm_squared() > reach * reach {
        return;
    }
    let normal = d.try_normalize(f64::EPSILON).unwrap_or_else(Vec3::z);
    out.push(ContactPoint::new(
        ta.position + normal * a.radius(),
        tb.position - normal * b.radius(),
        normal,
    ));
}

pub(super) fn sphere_plane(sphere: &Sphere, ts: &Transform, tp: &Transform, out: &mut Vec<ContactPoint>) {
    let n = tp.vector_to_world(&Vec3::z());
    let r = sphere.radius();
    let height = (ts.position - tp.position).dot(&n);
    if height > r {
        return;
    }
    out.push(ContactPoint::new(ts.position - n * r, ts.position - n * height, -n));
}

/// Face contacts first; corners and edges only when no face is hit
pub(super) fn sphere_box(sphere: &Sphere, ts: &Transform, cuboid: &Cuboid, tb: &Transform, out: &mut Vec<ContactPoint>) {
    let r = sphere.radius();
    let xs = ts.position;
    let xb = tb.position;
    let offset = xs - xb;
    let sides = cuboid.side_normals(&tb.orientation);

    // (distance to the surface, side, tangential coordinates)
    let mut best: Option<(f64, usize, f64, f64)> = None;
    for (index, side) in sides.iter().enumerate() {
        let h = side.norm();
        let ns = side / h;
        let dot = offset.dot(&ns);
        if dot <= 0.0 || dot >= h + r {
            continue;
        }
        let s1 = sides[(index + 1) % 3];
        let s2 = sides[(index + 2) % 3];
        let (h1, h2) = (s1.norm(), s2.norm());
        let dot1 = offset.dot(&(s1 / h1));
        let dot2 = offset.dot(&(s2 / h2));
        if dot1.abs() < h1 && dot2.abs() < h2 {
            let dist = (dot - h - r).abs();
            if best.map_or(true, |(d, ..)| dist < d) {
                best = Some((dist, index, dot1, dot2));
            }
        }
    }
    if let Some((_, index, dot1, dot2)) = best {
        let side = sides[index];
        let ns = side.normalize();
        let n1 = sides[(index + 1) % 3].normalize();
        let n2 = sides[(index + 2) % 3].normalize();
        let point_b = xb + side + n1 * dot1 + n2 * dot2;
        out.push(ContactPoint::new(xs - ns * r, point_b, -ns));
        return;
    }

    let r2 = r * r;
    for sx in [1.0, -1.0] {
        for sy in [1.0, -1.0] {
            for sz in [1.0, -1.0] {
                let corner = xb + sides[0] * sx + sides[1] * sy + sides[2] * sz;
                let d = corner - xs;
                if d.norm_squared() < r2 {
                    let normal = d.try_normalize(f64::EPSILON).unwrap_or_else(Vec3::z);
                    out.push(ContactPoint::new(xs + normal * r, corner, normal));
                    return;
                }
            }
        }
    }

    for j in 0..6 {
        for k in 0..6 {
            if j % 3 == k % 3 {
                continue;
            }
            let Some(tangent) = sides[k].cross(&sides[j]).try_normalize(f64::EPSILON) else {
                continue;
            };
            let l = 3 - j % 3 - k % 3;
            let center = sides[j] + sides[k];
            let rel = offset - center;
            let along = rel.dot(&tangent);
            if along.abs() >= sides[l].norm() {
                continue;
            }
            let to_center = rel - tangent * along;
            if to_center.norm_squared() < r2 {
                let point_b = xb + center + tangent * along;
                let normal = (-to_center).try_normalize(f64::EPSILON).unwrap_or_else(Vec3::z);
                out.push(ContactPoint::new(xs + normal * r, point_b, normal));
                return;
            }
        }
    }
}

/// Vertex, then face, then face-edge contacts; at most one point
pub(super) fn sphere_convex(
    sphere: &Sphere,
    ts: &Transform,
    hull: &ConvexPolyhedron,
    th: &Transform,
    out: &mut Vec<ContactPoint>,
) {
    let r = sphere.radius();
    let r2 = r * r;
    let xs = ts.position;
    let vertices = hull.vertices();

    for v in vertices {
        let world = th.point_to_world(v);
        let d = world - xs;
        if d.norm_squared() < r2 {
            let normal = d.try_normalize(f64::EPSILON).unwrap_or_else(Vec3::z);
            out.push(ContactPoint::new(xs + normal * r, world, normal));
            return;
        }
    }

    let mut world_face = Vec::new();
    for (face, local_normal) in hull.faces().iter().zip(hull.face_normals()) {
        let n = th.vector_to_world(local_normal);
        let v0 = th.point_to_world(&vertices[face[0]]);
        let height = (xs - v0).dot(&n);
        let penetration = height - r;
        if penetration >= 0.0 || height <= 0.0 {
            continue;
        }

        world_face.clear();
        world_face.extend(face.iter().map(|&i| th.point_to_world(&vertices[i])));
        if point_in_polygon(&world_face, &n, &xs) {
            out.push(ContactPoint::new(xs - n * r, xs - n * height, -n));
            return;
        }

        for j in 0..world_face.len() {
            let v1 = world_face[j];
            let v2 = world_face[(j + 1) % world_face.len()];
            let edge = v2 - v1;
            let length2 = edge.norm_squared();
            if length2 <= 0.0 {
                continue;
            }
            let t = (xs - v1).dot(&edge) / length2;
            if t <= 0.0 || t >= 1.0 {
                continue;
            }
            let p = v1 + edge * t;
            let d = p - xs;
            if d.norm_squared() < r2 {
                let normal = d.try_normalize(f64::EPSILON).unwrap_or(-n);
                out.push(ContactPoint::new(xs + normal * r, p, normal));
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;

    fn ball(radius: f64) -> Sphere {
        Sphere::new(radius).unwrap()
    }

    fn at(x: f64, y: f64, z: f64) -> Transform {
        Transform::from_position(Vec3::new(x, y, z))
    }

    #[test]
    fn test_sphere_sphere_along_center_line() {
        let mut out = Vec::new();
        sphere_sphere(&ball(1.0), &at(0.0, 0.0, 0.0), &ball(1.0), &at(1.5, 0.0, 0.0), &mut out);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].normal, Vec3::x(), epsilon = 1e-12);
        assert_relative_eq!(out[0].point_a, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(out[0].point_b, Vec3::new(0.5, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(out[0].depth(), -0.5, epsilon = 1e-12);

        out.clear();
        sphere_sphere(&ball(1.0), &at(0.0, 0.0, 0.0), &ball(1.0), &at(2.5, 0.0, 0.0), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_concentric_spheres_fall_back_to_z() {
        let mut out = Vec::new();
        sphere_sphere(&ball(1.0), &at(0.0, 0.0, 0.0), &ball(0.5), &at(0.0, 0.0, 0.0), &mut out);
        assert_relative_eq!(out[0].normal, Vec3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_resting_on_plane() {
        let mut out = Vec::new();
        sphere_plane(&ball(0.5), &at(2.0, 1.0, 0.45), &Transform::default(), &mut out);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].normal, -Vec3::z(), epsilon = 1e-12);
        assert_relative_eq!(out[0].point_a, Vec3::new(2.0, 1.0, -0.05), epsilon = 1e-12);
        assert_relative_eq!(out[0].point_b, Vec3::new(2.0, 1.0, 0.0), epsilon = 1e-12);

        out.clear();
        sphere_plane(&ball(0.5), &at(0.0, 0.0, 0.6), &Transform::default(), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_tilted_plane_uses_its_normal() {
        let tilt = Transform::new(Vec3::zeros(), Quat::from_axis_angle(&Vec3::x_axis(), std::f64::consts::FRAC_PI_2));
        let mut out = Vec::new();
        // Plane normal is now -Y
        sphere_plane(&ball(1.0), &at(0.0, -0.5, 0.0), &tilt, &mut out);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].normal, Vec3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_box_face() {
        let cube = Cuboid::new(Vec3::repeat(1.0)).unwrap();
        let mut out = Vec::new();
        sphere_box(&ball(0.5), &at(0.2, -0.3, 1.4), &cube, &Transform::default(), &mut out);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].normal, -Vec3::z(), epsilon = 1e-12);
        assert_relative_eq!(out[0].point_b, Vec3::new(0.2, -0.3, 1.0), epsilon = 1e-12);
        assert_relative_eq!(out[0].depth(), -0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_box_edge_and_corner() {
        let cube = Cuboid::new(Vec3::repeat(1.0)).unwrap();
        let mut out = Vec::new();
        sphere_box(&ball(0.5), &at(1.3, 0.0, 1.3), &cube, &Transform::default(), &mut out);
        assert_eq!(out.len(), 1);
        let diagonal = Vec3::new(-1.0, 0.0, -1.0).normalize();
        assert_relative_eq!(out[0].normal, diagonal, epsilon = 1e-12);
        assert_relative_eq!(out[0].point_b, Vec3::new(1.0, 0.0, 1.0), epsilon = 1e-12);

        out.clear();
        sphere_box(&ball(0.5), &at(1.2, 1.2, 1.2), &cube, &Transform::default(), &mut out);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].point_b, Vec3::repeat(1.0), epsilon = 1e-12);
        assert_relative_eq!(out[0].normal, -Vec3::repeat(1.0).normalize(), epsilon = 1e-12);

        out.clear();
        sphere_box(&ball(0.5), &at(1.4, 1.4, 1.4), &cube, &Transform::default(), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_sphere_convex_face_and_vertex() {
        let cube = Cuboid::new(Vec3::repeat(1.0)).unwrap();
        let hull = cube.hull();
        let mut out = Vec::new();
        sphere_convex(&ball(0.5), &at(0.0, 0.0, 1.3), hull, &Transform::default(), &mut out);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].normal, -Vec3::z(), epsilon = 1e-12);
        assert_relative_eq!(out[0].point_b, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-12);

        out.clear();
        sphere_convex(&ball(0.5), &at(1.2, 1.2, 1.2), hull, &Transform::default(), &mut out);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].point_b, Vec3::repeat(1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_convex_edge() {
        let cube = Cuboid::new(Vec3::repeat(1.0)).unwrap();
        let mut out = Vec::new();
        sphere_convex(&ball(0.5), &at(1.3, 0.0, 1.3), cube.hull(), &Transform::default(), &mut out);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].point_b, Vec3::new(1.0, 0.0, 1.0), epsilon = 1e-12);
        assert!(out[0].normal.x < 0.0 && out[0].normal.z < 0.0);
    }
}
