//! Octree over triangle bounding boxes
//!
//! Divides the mesh bounds into hierarchical regions for fast AABB queries.
//! A triangle lives in the deepest node whose bounds fully contain its box,
//! so large triangles stay near the root.

use crate::collision::Aabb;
use crate::foundation::math::Vec3;

/// Configuration for octree behavior
#[derive(Debug, Clone, Copy)]
pub struct OctreeConfig {
    /// Maximum subdivision depth
    pub max_depth: u32,

    /// Triangles a leaf holds before it subdivides
    pub max_items_per_node: usize,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_items_per_node: 8,
        }
    }
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone, PartialEq)]
struct OctreeNode {
    /// Bounds of this node
    bounds: Aabb,

    /// Triangle indices stored at this node
    items: Vec<usize>,

    /// Child nodes (8 octants), None if this is a leaf
    children: Option<Box<[OctreeNode; 8]>>,

    /// Depth in the tree (0 = root)
    depth: u32,
}

impl OctreeNode {
    const fn new(bounds: Aabb, depth: u32) -> Self {
        Self {
            bounds,
            items: Vec::new(),
            children: None,
            depth,
        }
    }

    fn subdivide(&mut self) {
        if self.children.is_some() {
            return;
        }

        let center = self.bounds.center();
        let quarter = self.bounds.extents() * 0.5;
        let depth = self.depth + 1;

        // Octant bit layout: x = 1, y = 2, z = 4
        let child = |octant: usize| {
            let sign = |bit: usize| if octant & bit != 0 { 1.0 } else { -1.0 };
            let child_center = center + Vec3::new(quarter.x * sign(1), quarter.y * sign(2), quarter.z * sign(4));
            Self::new(Aabb::from_center_extents(child_center, quarter), depth)
        };
        self.children = Some(Box::new([
            child(0),
            child(1),
            child(2),
            child(3),
            child(4),
            child(5),
            child(6),
            child(7),
        ]));
    }

    fn insert(&mut self, item: usize, item_bounds: &Aabb, boxes: &[Aabb], config: &OctreeConfig) {
        if self.children.is_none()
            && self.items.len() >= config.max_items_per_node
            && self.depth < config.max_depth
        {
            self.subdivide();
            // Push existing items down where they fit
            let items = std::mem::take(&mut self.items);
            for existing in items {
                self.insert_here_or_below(existing, &boxes[existing], boxes, config);
            }
        }
        self.insert_here_or_below(item, item_bounds, boxes, config);
    }

    fn insert_here_or_below(&mut self, item: usize, item_bounds: &Aabb, boxes: &[Aabb], config: &OctreeConfig) {
        if let Some(children) = self.children.as_mut() {
            if let Some(child) = children.iter_mut().find(|c| c.bounds.contains(item_bounds)) {
                child.insert(item, item_bounds, boxes, config);
                return;
            }
        }
        self.items.push(item);
    }

    fn query(&self, aabb: &Aabb, results: &mut Vec<usize>) {
        if !self.bounds.intersects(aabb) {
            return;
        }
        results.extend_from_slice(&self.items);
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query(aabb, results);
            }
        }
    }
}

/// Octree of triangle boxes
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleOctree {
    root: OctreeNode,
}

impl TriangleOctree {
    /// Build the tree from one box per triangle
    pub fn build(bounds: Aabb, boxes: &[Aabb], config: OctreeConfig) -> Self {
        let mut root = OctreeNode::new(bounds, 0);
        for (index, item_bounds) in boxes.iter().enumerate() {
            root.insert(index, item_bounds, boxes, &config);
        }
        Self { root }
    }

    /// Triangles stored in nodes overlapping `aabb` (a superset of the exact answer)
    pub fn query(&self, aabb: &Aabb, results: &mut Vec<usize>) {
        self.root.query(aabb, results);
    }

    /// Depth of the deepest node
    pub fn depth(&self) -> u32 {
        fn depth_of(node: &OctreeNode) -> u32 {
            node.children
                .as_ref()
                .map_or(node.depth, |children| children.iter().map(depth_of).max().unwrap_or(node.depth))
        }
        depth_of(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_boxes_sink_and_query_finds_them() {
        let bounds = Aabb::new(Vec3::zeros(), Vec3::repeat(8.0));
        let boxes: Vec<Aabb> = (0..64)
            .map(|i| {
                let p = Vec3::new(f64::from(i % 8) + 0.25, f64::from(i / 8) + 0.25, 0.25);
                Aabb::new(p, p + Vec3::repeat(0.5))
            })
            .collect();
        let tree = TriangleOctree::build(bounds, &boxes, OctreeConfig::default());
        assert!(tree.depth() > 0);

        let mut found = Vec::new();
        tree.query(&Aabb::new(Vec3::new(3.3, 3.3, 0.0), Vec3::new(3.6, 3.6, 1.0)), &mut found);
        assert!(found.contains(&27));
        assert!(found.len() < boxes.len());
    }
}
