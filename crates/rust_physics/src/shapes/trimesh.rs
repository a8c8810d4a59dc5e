//! Triangle meshes
//!
//! Static concave geometry. Triangles are indexed through an octree built on
//! the unscaled vertices; queries are rescaled into that space.

use super::octree::{OctreeConfig, TriangleOctree};
use crate::collision::Aabb;
use crate::error::ShapeError;
use crate::foundation::math::{triangle_normal, Transform, Vec3};

/// Indexed triangle mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Trimesh {
    vertices: Vec<Vec3>,
    indices: Vec<[usize; 3]>,
    normals: Vec<Vec3>,
    edges: Vec<[usize; 2]>,
    scale: Vec3,
    local_aabb: Aabb,
    bounding_radius: f64,
    triangle_boxes: Vec<Aabb>,
    tree: TriangleOctree,
}

impl Trimesh {
    /// Build a mesh from vertices and counter-clockwise triangles
    pub fn new(vertices: Vec<Vec3>, indices: Vec<[usize; 3]>) -> Result<Self, ShapeError> {
        if indices.is_empty() {
            return Err(ShapeError::InvalidTrimesh("mesh has no triangles".to_string()));
        }
        if let Some((t, &v)) = indices
            .iter()
            .enumerate()
            .find_map(|(t, tri)| tri.iter().find(|&&v| v >= vertices.len()).map(|v| (t, v)))
        {
            return Err(ShapeError::InvalidTrimesh(format!("triangle {t} references missing vertex {v}")));
        }
        if vertices.iter().any(|v| !v.iter().all(|c| c.is_finite())) {
            return Err(ShapeError::InvalidTrimesh("vertex coordinates must be finite".to_string()));
        }

        let triangle_boxes: Vec<Aabb> = indices
            .iter()
            .filter_map(|tri| Aabb::from_points(tri.iter().map(|&i| &vertices[i]), None))
            .collect();
        let mut bounds = Aabb::from_points(&vertices, None).unwrap_or_default();
        // Flat meshes still need a volume for the octree
        bounds = bounds.inflated(1e-6);
        let tree = TriangleOctree::build(bounds, &triangle_boxes, OctreeConfig::default());

        let mut mesh = Self {
            edges: Self::compute_edges(&indices),
            vertices,
            indices,
            normals: Vec::new(),
            scale: Vec3::repeat(1.0),
            local_aabb: Aabb::default(),
            bounding_radius: 0.0,
            triangle_boxes,
            tree,
        };
        mesh.update_derived();
        Ok(mesh)
    }

    fn compute_edges(indices: &[[usize; 3]]) -> Vec<[usize; 2]> {
        let mut edges: Vec<[usize; 2]> = indices
            .iter()
            .flat_map(|&[a, b, c]| [[a, b], [b, c], [c, a]])
            .map(|[a, b]| if a < b { [a, b] } else { [b, a] })
            .collect();
        edges.sort_unstable();
        edges.dedup();
        edges
    }

    fn update_derived(&mut self) {
        self.normals = (0..self.indices.len())
            .map(|t| {
                let [a, b, c] = self.triangle_vertices(t);
                triangle_normal(&a, &b, &c)
            })
            .collect();
        let scaled: Vec<Vec3> = (0..self.vertices.len()).map(|i| self.vertex(i)).collect();
        self.local_aabb = Aabb::from_points(&scaled, None).unwrap_or_default();
        self.bounding_radius = scaled.iter().map(Vec3::norm).fold(0.0, f64::max);
    }

    /// Apply a positive per-axis scale
    pub fn set_scale(&mut self, scale: Vec3) -> Result<(), ShapeError> {
        if !scale.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(ShapeError::InvalidTrimesh(format!("scale must be positive, got {scale:?}")));
        }
        self.scale = scale;
        self.update_derived();
        Ok(())
    }

    /// Current scale
    pub const fn scale(&self) -> &Vec3 {
        &self.scale
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Scaled vertex
    pub fn vertex(&self, index: usize) -> Vec3 {
        self.vertices[index].component_mul(&self.scale)
    }

    /// Vertex indices of a triangle
    pub fn triangle_indices(&self, triangle: usize) -> [usize; 3] {
        self.indices[triangle]
    }

    /// Scaled corners of a triangle
    pub fn triangle_vertices(&self, triangle: usize) -> [Vec3; 3] {
        self.indices[triangle].map(|i| self.vertex(i))
    }

    /// Unit normal of a triangle
    pub fn triangle_normal(&self, triangle: usize) -> Vec3 {
        self.normals[triangle]
    }

    /// Unique edges as sorted vertex index pairs
    pub fn edges(&self) -> &[[usize; 2]] {
        &self.edges
    }

    /// Bounding box of the scaled mesh
    pub const fn local_aabb(&self) -> &Aabb {
        &self.local_aabb
    }

    /// Largest scaled vertex distance from the origin
    pub const fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }

    /// Triangles whose boxes overlap a box in (scaled) mesh space
    pub fn triangles_in_aabb(&self, aabb: &Aabb, results: &mut Vec<usize>) {
        results.clear();
        let unscaled = Aabb::new(
            aabb.min.component_div(&self.scale),
            aabb.max.component_div(&self.scale),
        );
        self.tree.query(&unscaled, results);
        results.retain(|&t| self.triangle_boxes[t].intersects(&unscaled));
        results.sort_unstable();
        results.dedup();
    }

    /// Diagonal inertia of the bounding box
    pub fn local_inertia(&self, mass: f64) -> Vec3 {
        super::box_inertia(&self.local_aabb.extents(), mass)
    }

    /// Enclosed volume, meaningful for closed meshes only
    pub fn volume(&self) -> f64 {
        (0..self.indices.len())
            .map(|t| {
                let [a, b, c] = self.triangle_vertices(t);
                a.dot(&b.cross(&c))
            })
            .sum::<f64>()
            / 6.0
    }

    /// World bounding box
    pub fn world_aabb(&self, transform: &Transform) -> Aabb {
        let scaled: Vec<Vec3> = (0..self.vertices.len()).map(|i| self.vertex(i)).collect();
        Aabb::from_points(&scaled, Some(transform)).unwrap_or_default()
    }
}
