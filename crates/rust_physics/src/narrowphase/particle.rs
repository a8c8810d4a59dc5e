//! Point particles against planes, spheres and hulls

use super::ContactPoint;
use crate::foundation::math::{Transform, Vec3};
use crate::shapes::{ConvexPolyhedron, Sphere};

pub(super) fn plane_particle(tp: &Transform, tq: &Transform, out: &mut Vec<ContactPoint>) {
    let n = tp.vector_to_world(&Vec3::z());
    let x = tq.position;
    let d = (x - tp.position).dot(&n);
    if d <= 0.0 {
        out.push(ContactPoint::new(x - n * d, x, n));
    }
}

pub(super) fn sphere_particle(sphere: &Sphere, ts: &Transform, tq: &Transform, out: &mut Vec<ContactPoint>) {
    let r = sphere.radius();
    let d = tq.position - ts.position;
    if d.norm_squared() > r * r {
        return;
    }
    let normal = d.try_normalize(f64::EPSILON).unwrap_or_else(Vec3::z);
    out.push(ContactPoint::new(ts.position + normal * r, tq.position, normal));
}

/// The particle is pushed out through the face it is closest to
pub(super) fn convex_particle(hull: &ConvexPolyhedron, th: &Transform, tq: &Transform, out: &mut Vec<ContactPoint>) {
    let local = th.point_to_local(&tq.position);
    let vertices = hull.vertices();

    let mut best: Option<(f64, usize)> = None;
    for (index, (face, normal)) in hull.faces().iter().zip(hull.face_normals()).enumerate() {
        let penetration = -normal.dot(&(local - vertices[face[0]]));
        if penetration < 0.0 {
            return;
        }
        if best.map_or(true, |(p, _)| penetration < p) {
            best = Some((penetration, index));
        }
    }

    if let Some((penetration, index)) = best {
        let n = th.vector_to_world(&hull.face_normals()[index]);
        let x = tq.position;
        out.push(ContactPoint::new(x + n * penetration, x, n));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Cuboid;
    use approx::assert_relative_eq;

    #[test]
    fn test_particle_below_plane() {
        let mut out = Vec::new();
        plane_particle(&Transform::default(), &Transform::from_position(Vec3::new(1.0, 2.0, -0.1)), &mut out);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].point_a, Vec3::new(1.0, 2.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(out[0].depth(), -0.1, epsilon = 1e-12);

        out.clear();
        plane_particle(&Transform::default(), &Transform::from_position(Vec3::new(0.0, 0.0, 0.1)), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_particle_inside_sphere() {
        let sphere = Sphere::new(1.0).unwrap();
        let mut out = Vec::new();
        sphere_particle(&sphere, &Transform::default(), &Transform::from_position(Vec3::new(0.0, 0.8, 0.0)), &mut out);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].normal, Vec3::y(), epsilon = 1e-12);
        assert_relative_eq!(out[0].point_a, Vec3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_particle_leaves_through_nearest_face() {
        let cube = Cuboid::new(Vec3::repeat(1.0)).unwrap();
        let mut out = Vec::new();
        let inside = Transform::from_position(Vec3::new(0.9, 0.2, -0.1));
        convex_particle(cube.hull(), &Transform::default(), &inside, &mut out);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].normal, Vec3::x(), epsilon = 1e-12);
        assert_relative_eq!(out[0].point_a, Vec3::new(1.0, 0.2, -0.1), epsilon = 1e-12);

        out.clear();
        let outside = Transform::from_position(Vec3::new(1.1, 0.0, 0.0));
        convex_particle(cube.hull(), &Transform::default(), &outside, &mut out);
        assert!(out.is_empty());
    }
}
