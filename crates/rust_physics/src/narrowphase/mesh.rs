//! Planes, spheres and hulls against triangle meshes

use super::convex::convex_convex;
use super::{point_in_polygon, ContactPoint};
use crate::collision::Aabb;
use crate::foundation::math::{Transform, Vec3};
use crate::shapes::{ConvexPolyhedron, Sphere, Trimesh};
use std::collections::HashSet;

pub(super) fn plane_trimesh(tp: &Transform, mesh: &Trimesh, tm: &Transform, out: &mut Vec<ContactPoint>) {
    let n = tp.vector_to_world(&Vec3::z());
    for i in 0..mesh.vertex_count() {
        let world = tm.point_to_world(&mesh.vertex(i));
        let d = (world - tp.position).dot(&n);
        if d <= 0.0 {
            out.push(ContactPoint::new(world - n * d, world, n));
        }
    }
}

/// Vertex, edge and face contacts of the triangles near the sphere.
///
/// Vertices and edges shared by several triangles are tested once.
pub(super) fn sphere_trimesh(
    sphere: &Sphere,
    ts: &Transform,
    mesh: &Trimesh,
    tm: &Transform,
    triangles: &mut Vec<usize>,
    out: &mut Vec<ContactPoint>,
) {
    let r = sphere.radius();
    let r2 = r * r;
    let center = tm.point_to_local(&ts.position);
    mesh.triangles_in_aabb(&Aabb::from_center_extents(center, Vec3::repeat(r)), triangles);
    if triangles.is_empty() {
        return;
    }

    // `local` is on the mesh surface, in mesh space
    let mut push = |local: Vec3, fallback: Vec3| {
        let direction = (local - center).try_normalize(f64::EPSILON).unwrap_or(fallback);
        let normal = tm.vector_to_world(&direction);
        out.push(ContactPoint::new(ts.position + normal * r, tm.point_to_world(&local), normal));
    };

    let mut seen_vertices = HashSet::new();
    for &t in triangles.iter() {
        for index in mesh.triangle_indices(t) {
            if !seen_vertices.insert(index) {
                continue;
            }
            let v = mesh.vertex(index);
            if (v - center).norm_squared() <= r2 {
                push(v, -mesh.triangle_normal(t));
            }
        }
    }

    let mut seen_edges = HashSet::new();
    for &t in triangles.iter() {
        let indices = mesh.triangle_indices(t);
        for k in 0..3 {
            let (i, j) = (indices[k], indices[(k + 1) % 3]);
            if !seen_edges.insert((i.min(j), i.max(j))) {
                continue;
            }
            let (a, b) = (mesh.vertex(i), mesh.vertex(j));
            let edge = b - a;
            let length2 = edge.norm_squared();
            if length2 <= 0.0 {
                continue;
            }
            let s = (center - a).dot(&edge) / length2;
            if s <= 0.0 || s >= 1.0 {
                continue;
            }
            let p = a + edge * s;
            if (p - center).norm_squared() < r2 {
                push(p, -mesh.triangle_normal(t));
            }
        }
    }

    for &t in triangles.iter() {
        let corners = mesh.triangle_vertices(t);
        let n = mesh.triangle_normal(t);
        let height = (center - corners[0]).dot(&n);
        if height.abs() >= r {
            continue;
        }
        let projected = center - n * height;
        if point_in_polygon(&corners, &n, &projected) {
            let fallback = if height >= 0.0 { -n } else { n };
            push(projected, fallback);
        }
    }
}

/// Each nearby triangle is extruded into a prism as deep as the hull is wide
/// and tested as a convex pair
pub(super) fn convex_trimesh(
    hull: &ConvexPolyhedron,
    th: &Transform,
    mesh: &Trimesh,
    tm: &Transform,
    triangles: &mut Vec<usize>,
    out: &mut Vec<ContactPoint>,
) {
    let radius = hull.bounding_radius();
    let center = tm.point_to_local(&th.position);
    mesh.triangles_in_aabb(&Aabb::from_center_extents(center, Vec3::repeat(radius)), triangles);

    for &t in triangles.iter() {
        let normal = mesh.triangle_normal(t);
        if normal.norm_squared() <= 0.0 {
            continue;
        }
        let prism = ConvexPolyhedron::prism(mesh.triangle_vertices(t), &normal, radius);
        convex_convex(hull, th, &prism, tm, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Cuboid;
    use approx::assert_relative_eq;

    /// Two triangles covering [-2, 2]^2 at z = 0, facing +Z
    fn floor() -> Trimesh {
        Trimesh::new(
            vec![
                Vec3::new(-2.0, -2.0, 0.0),
                Vec3::new(2.0, -2.0, 0.0),
                Vec3::new(2.0, 2.0, 0.0),
                Vec3::new(-2.0, 2.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn test_plane_against_mesh_vertices() {
        let mesh = floor();
        let tm = Transform::from_position(Vec3::new(0.0, 0.0, -0.1));
        let mut out = Vec::new();
        plane_trimesh(&Transform::default(), &mesh, &tm, &mut out);
        assert_eq!(out.len(), 4);
        for p in &out {
            assert_relative_eq!(p.depth(), -0.1, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_sphere_on_mesh_face() {
        let mesh = floor();
        let sphere = Sphere::new(0.5).unwrap();
        let ts = Transform::from_position(Vec3::new(1.0, -0.5, 0.4));
        let mut triangles = Vec::new();
        let mut out = Vec::new();
        sphere_trimesh(&sphere, &ts, &mesh, &Transform::default(), &mut triangles, &mut out);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].normal, -Vec3::z(), epsilon = 1e-12);
        assert_relative_eq!(out[0].point_b, Vec3::new(1.0, -0.5, 0.0), epsilon = 1e-12);
        assert_relative_eq!(out[0].depth(), -0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_over_shared_edge_counts_it_once() {
        let mesh = floor();
        let sphere = Sphere::new(0.5).unwrap();
        // Directly above the diagonal shared by both triangles
        let ts = Transform::from_position(Vec3::new(0.5, 0.5, 0.3));
        let mut triangles = Vec::new();
        let mut out = Vec::new();
        sphere_trimesh(&sphere, &ts, &mesh, &Transform::default(), &mut triangles, &mut out);
        // One edge contact and one face contact per triangle
        assert_eq!(out.len(), 3);
        for p in &out {
            assert_relative_eq!(p.point_b, Vec3::new(0.5, 0.5, 0.0), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_translated_mesh_contacts_are_in_world_space() {
        let mesh = floor();
        let sphere = Sphere::new(0.5).unwrap();
        let tm = Transform::from_position(Vec3::new(10.0, 0.0, 5.0));
        let ts = Transform::from_position(Vec3::new(11.0, -0.5, 5.4));
        let mut triangles = Vec::new();
        let mut out = Vec::new();
        sphere_trimesh(&sphere, &ts, &mesh, &tm, &mut triangles, &mut out);
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].point_b, Vec3::new(11.0, -0.5, 5.0), epsilon = 1e-12);
        assert_relative_eq!(out[0].point_a, Vec3::new(11.0, -0.5, 4.9), epsilon = 1e-12);
    }

    #[test]
    fn test_box_on_mesh() {
        let mesh = floor();
        let cube = Cuboid::new(Vec3::repeat(0.5)).unwrap();
        let th = Transform::from_position(Vec3::new(0.7, -0.9, 0.45));
        let mut triangles = Vec::new();
        let mut out = Vec::new();
        convex_trimesh(cube.hull(), &th, &mesh, &Transform::default(), &mut triangles, &mut out);
        assert!(!out.is_empty());
        for p in &out {
            assert_relative_eq!(p.normal, -Vec3::z(), epsilon = 1e-9);
            assert_relative_eq!(p.depth(), -0.05, epsilon = 1e-9);
        }
    }
}
