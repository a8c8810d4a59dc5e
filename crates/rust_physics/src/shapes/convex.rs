//! Convex polyhedra and separating-axis contact generation
//!
//! A hull is a vertex list plus faces given as vertex index loops in
//! counter-clockwise order seen from outside. Face normals and the set of
//! unique edge directions are derived once at construction.
//!
//! Contact generation follows the classic two stage approach: find the axis
//! of minimum overlap among face normals and edge cross products, then clip
//! the incident face of one hull against the side planes of the reference
//! face of the other (Sutherland-Hodgman).

use crate::collision::Aabb;
use crate::error::ShapeError;
use crate::foundation::math::{Transform, Vec3};

/// Tolerance used to merge parallel edge directions
const PARALLEL_EPSILON: f64 = 1e-6;

/// Relative tolerance for the convexity check at construction
const CONVEXITY_EPSILON: f64 = 1e-6;

/// Point produced by hull clipping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPoint {
    /// World position on the incident face
    pub point: Vec3,
    /// World normal of the reference face
    pub normal: Vec3,
    /// Signed distance to the reference face (negative when penetrating)
    pub depth: f64,
}

/// Convex polyhedron with precomputed face normals and unique edges
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPolyhedron {
    vertices: Vec<Vec3>,
    faces: Vec<Vec<usize>>,
    face_normals: Vec<Vec3>,
    unique_edges: Vec<Vec3>,
    unique_axes: Option<Vec<Vec3>>,
    bounding_radius: f64,
    local_aabb: Aabb,
}

impl ConvexPolyhedron {
    /// Build a hull, validating indices, face planarity and winding
    pub fn new(vertices: Vec<Vec3>, faces: Vec<Vec<usize>>) -> Result<Self, ShapeError> {
        if vertices.len() < 4 {
            return Err(ShapeError::TooFewVertices(vertices.len()));
        }
        if vertices.iter().any(|v| !v.iter().all(|c| c.is_finite())) {
            return Err(ShapeError::InvalidDimensions("vertex coordinates must be finite".to_string()));
        }

        for (face_index, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(ShapeError::DegenerateFace { face: face_index });
            }
            if let Some(&vertex) = face.iter().find(|&&v| v >= vertices.len()) {
                return Err(ShapeError::MissingVertex { face: face_index, vertex });
            }
        }

        let face_normals = faces
            .iter()
            .enumerate()
            .map(|(i, face)| Self::newell_normal(&vertices, face).ok_or(ShapeError::DegenerateFace { face: i }))
            .collect::<Result<Vec<_>, _>>()?;

        let bounding_radius = vertices.iter().map(Vec3::norm).fold(0.0, f64::max);
        let tolerance = CONVEXITY_EPSILON * bounding_radius.max(1.0);
        for (face_index, (face, normal)) in faces.iter().zip(&face_normals).enumerate() {
            let constant = normal.dot(&vertices[face[0]]);
            if vertices.iter().any(|v| normal.dot(v) - constant > tolerance) {
                return Err(ShapeError::NotConvex { face: face_index });
            }
        }

        Ok(Self::from_parts(vertices, faces, face_normals))
    }

    /// Assemble a hull whose faces are known to be valid
    pub(crate) fn from_parts(vertices: Vec<Vec3>, faces: Vec<Vec<usize>>, face_normals: Vec<Vec3>) -> Self {
        let unique_edges = Self::compute_unique_edges(&vertices, &faces);
        let bounding_radius = vertices.iter().map(Vec3::norm).fold(0.0, f64::max);
        let local_aabb = Aabb::from_points(&vertices, None).unwrap_or_default();
        Self {
            vertices,
            faces,
            face_normals,
            unique_edges,
            unique_axes: None,
            bounding_radius,
            local_aabb,
        }
    }

    /// Triangular prism below the triangle `top`, extruded along `-direction`
    /// down to `depth`. The triangle must be counter-clockwise seen from
    /// `direction`.
    pub(crate) fn prism(top: [Vec3; 3], direction: &Vec3, depth: f64) -> Self {
        let bottom = top.map(|v| v - direction * depth);
        Self::prism_from_corners(top, bottom)
    }

    /// Triangular prism with explicit top and bottom corners
    pub(crate) fn prism_from_corners(top: [Vec3; 3], bottom: [Vec3; 3]) -> Self {
        let vertices = vec![top[0], top[1], top[2], bottom[0], bottom[1], bottom[2]];
        let faces = vec![
            vec![0, 1, 2],
            vec![5, 4, 3],
            vec![0, 3, 4, 1],
            vec![1, 4, 5, 2],
            vec![2, 5, 3, 0],
        ];
        let face_normals = faces
            .iter()
            .map(|face| Self::newell_normal(&vertices, face).unwrap_or_else(Vec3::z))
            .collect();
        Self::from_parts(vertices, faces, face_normals)
    }

    /// Restrict face-normal candidates of the separating axis search to `axes`
    #[must_use]
    pub fn with_unique_axes(mut self, axes: Vec<Vec3>) -> Self {
        self.unique_axes = Some(axes.into_iter().filter_map(|a| a.try_normalize(0.0)).collect());
        self
    }

    /// Robust polygon normal, `None` for zero area loops
    fn newell_normal(vertices: &[Vec3], face: &[usize]) -> Option<Vec3> {
        let mut n = Vec3::zeros();
        for (k, &i) in face.iter().enumerate() {
            let a = vertices[i];
            let b = vertices[face[(k + 1) % face.len()]];
            n.x += (a.y - b.y) * (a.z + b.z);
            n.y += (a.z - b.z) * (a.x + b.x);
            n.z += (a.x - b.x) * (a.y + b.y);
        }
        n.try_normalize(f64::EPSILON)
    }

    fn compute_unique_edges(vertices: &[Vec3], faces: &[Vec<usize>]) -> Vec<Vec3> {
        let mut edges: Vec<Vec3> = Vec::new();
        for face in faces {
            for (k, &i) in face.iter().enumerate() {
                let Some(edge) = (vertices[face[(k + 1) % face.len()]] - vertices[i]).try_normalize(0.0) else {
                    continue;
                };
                let known = edges.iter().any(|e| {
                    (e - edge).amax() < PARALLEL_EPSILON || (e + edge).amax() < PARALLEL_EPSILON
                });
                if !known {
                    edges.push(edge);
                }
            }
        }
        edges
    }

    /// Vertices in local space
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Faces as vertex index loops
    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    /// Outward unit normals, one per face
    pub fn face_normals(&self) -> &[Vec3] {
        &self.face_normals
    }

    /// Deduplicated edge directions
    pub fn unique_edges(&self) -> &[Vec3] {
        &self.unique_edges
    }

    /// Explicit face axes, when set
    pub fn unique_axes(&self) -> Option<&[Vec3]> {
        self.unique_axes.as_deref()
    }

    /// Largest vertex distance from the local origin
    pub const fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }

    /// Bounding box in local space
    pub const fn local_aabb(&self) -> &Aabb {
        &self.local_aabb
    }

    /// Enclosed volume by the divergence theorem
    pub fn volume(&self) -> f64 {
        let mut volume = 0.0;
        for face in &self.faces {
            let a = self.vertices[face[0]];
            for k in 1..face.len() - 1 {
                let b = self.vertices[face[k]];
                let c = self.vertices[face[k + 1]];
                volume += a.dot(&b.cross(&c));
            }
        }
        volume / 6.0
    }

    /// Diagonal inertia of the local bounding box with the given mass
    pub fn local_inertia(&self, mass: f64) -> Vec3 {
        super::box_inertia(&self.local_aabb.extents(), mass)
    }

    /// World bounding box
    pub fn world_aabb(&self, transform: &Transform) -> Aabb {
        Aabb::from_points(&self.vertices, Some(transform)).unwrap_or_default()
    }

    /// Plane constant of a face: `n . p + c = 0` on the face
    pub fn face_plane_constant(&self, face: usize) -> f64 {
        -self.face_normals[face].dot(&self.vertices[self.faces[face][0]])
    }

    /// Project the hull onto a world axis, returning `(max, min)`
    pub fn project(&self, axis: &Vec3, transform: &Transform) -> (f64, f64) {
        let local_axis = transform.vector_to_local(axis);
        let offset = transform.point_to_local(&Vec3::zeros()).dot(&local_axis);

        let (mut max, mut min) = (f64::NEG_INFINITY, f64::INFINITY);
        for v in &self.vertices {
            let value = v.dot(&local_axis);
            max = max.max(value);
            min = min.min(value);
        }
        (max - offset, min - offset)
    }

    /// Overlap depth of two hulls along an axis, `None` when separated
    pub fn test_separating_axis(
        &self,
        axis: &Vec3,
        other: &Self,
        transform_a: &Transform,
        transform_b: &Transform,
    ) -> Option<f64> {
        let (max_a, min_a) = self.project(axis, transform_a);
        let (max_b, min_b) = other.project(axis, transform_b);
        if max_a <= min_b || max_b <= min_a {
            return None;
        }
        Some((max_a - min_b).min(max_b - min_a))
    }

    /// Minimum-overlap axis pointing from this hull towards `other`.
    ///
    /// Returns `None` as soon as one candidate axis separates the hulls.
    pub fn find_separating_axis(
        &self,
        other: &Self,
        transform_a: &Transform,
        transform_b: &Transform,
    ) -> Option<Vec3> {
        let mut best_depth = f64::INFINITY;
        let mut best_axis = Vec3::zeros();

        let mut consider = |axis: Vec3| -> Option<()> {
            let depth = self.test_separating_axis(&axis, other, transform_a, transform_b)?;
            if depth < best_depth {
                best_depth = depth;
                best_axis = axis;
            }
            Some(())
        };

        for normal in self.unique_axes().unwrap_or(&self.face_normals) {
            consider(transform_a.vector_to_world(normal))?;
        }
        for normal in other.unique_axes().unwrap_or(&other.face_normals) {
            consider(transform_b.vector_to_world(normal))?;
        }
        for edge_a in &self.unique_edges {
            let world_a = transform_a.vector_to_world(edge_a);
            for edge_b in &other.unique_edges {
                let cross = world_a.cross(&transform_b.vector_to_world(edge_b));
                if let Some(axis) = cross.try_normalize(PARALLEL_EPSILON) {
                    consider(axis)?;
                }
            }
        }

        if best_depth.is_infinite() {
            return None;
        }
        if (transform_b.position - transform_a.position).dot(&best_axis) < 0.0 {
            best_axis = -best_axis;
        }
        Some(best_axis)
    }

    /// Contact points of `other` against this hull along `normal`
    /// (pointing from this hull towards `other`).
    pub fn clip_against_hull(
        &self,
        transform_a: &Transform,
        other: &Self,
        transform_b: &Transform,
        normal: &Vec3,
        min_dist: f64,
        max_dist: f64,
    ) -> Vec<ClipPoint> {
        // Incident face: the face of B pointing most against the normal
        let incident = other
            .face_normals
            .iter()
            .map(|n| transform_b.vector_to_world(n).dot(normal))
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index);

        let Some(incident) = incident else {
            return Vec::new();
        };

        let world_face: Vec<Vec3> = other.faces[incident]
            .iter()
            .map(|&i| transform_b.point_to_world(&other.vertices[i]))
            .collect();
        self.clip_face_against_hull(normal, transform_a, &world_face, min_dist, max_dist)
    }

    /// Clip a world-space polygon against the reference face of this hull
    pub fn clip_face_against_hull(
        &self,
        normal: &Vec3,
        transform_a: &Transform,
        world_face: &[Vec3],
        min_dist: f64,
        max_dist: f64,
    ) -> Vec<ClipPoint> {
        // Reference face: the face of A pointing most along the normal
        let reference = self
            .face_normals
            .iter()
            .map(|n| transform_a.vector_to_world(n).dot(normal))
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index);

        let Some(reference) = reference else {
            return Vec::new();
        };

        let face = &self.faces[reference];
        let face_normal = transform_a.vector_to_world(&self.face_normals[reference]);

        let mut polygon = world_face.to_vec();
        let mut clipped = Vec::with_capacity(polygon.len() + face.len());
        for (k, &i) in face.iter().enumerate() {
            let a = transform_a.point_to_world(&self.vertices[i]);
            let b = transform_a.point_to_world(&self.vertices[face[(k + 1) % face.len()]]);
            let Some(side_normal) = (b - a).cross(&face_normal).try_normalize(0.0) else {
                continue;
            };
            clip_face_against_plane(&polygon, &mut clipped, &side_normal, -side_normal.dot(&a));
            std::mem::swap(&mut polygon, &mut clipped);
            if polygon.is_empty() {
                return Vec::new();
            }
        }

        let constant = -face_normal.dot(&transform_a.point_to_world(&self.vertices[face[0]]));
        polygon
            .into_iter()
            .filter_map(|point| {
                let depth = (face_normal.dot(&point) + constant).max(min_dist);
                (depth <= max_dist && depth <= 0.0).then_some(ClipPoint {
                    point,
                    normal: face_normal,
                    depth,
                })
            })
            .collect()
    }
}

/// Sutherland-Hodgman clip of a polygon against the plane `n . p + c = 0`,
/// keeping the side where `n . p + c < 0`.
pub fn clip_face_against_plane(input: &[Vec3], output: &mut Vec<Vec3>, normal: &Vec3, constant: f64) {
    output.clear();
    let Some(&last) = input.last() else {
        return;
    };
    if input.len() < 2 {
        if normal.dot(&last) + constant < 0.0 {
            output.push(last);
        }
        return;
    }

    let mut first = last;
    let mut dot_first = normal.dot(&first) + constant;
    for &current in input {
        let dot_current = normal.dot(&current) + constant;
        if dot_first < 0.0 {
            if dot_current < 0.0 {
                output.push(current);
            } else {
                output.push(first.lerp(&current, dot_first / (dot_first - dot_current)));
            }
        } else if dot_current < 0.0 {
            output.push(first.lerp(&current, dot_first / (dot_first - dot_current)));
            output.push(current);
        }
        first = current;
        dot_first = dot_current;
    }
}
