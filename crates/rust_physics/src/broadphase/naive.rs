//! All-pairs broadphase

use super::{intersection_test, need_broadphase_collision, BodyPair, Broadphase};
use crate::foundation::collections::{BodyHandle, BodySet};

/// Tests every pair of bodies, O(n^2)
#[derive(Debug, Clone, Default)]
pub struct NaiveBroadphase {
    use_bounding_boxes: bool,
    handles: Vec<BodyHandle>,
}

impl NaiveBroadphase {
    /// Create a broadphase that tests bounding spheres
    pub fn new() -> Self {
        Self::default()
    }

    /// Test boxes instead of spheres
    #[must_use]
    pub const fn with_bounding_boxes(mut self, use_boxes: bool) -> Self {
        self.use_bounding_boxes = use_boxes;
        self
    }
}

impl Broadphase for NaiveBroadphase {
    fn collision_pairs(&mut self, bodies: &BodySet, pairs: &mut Vec<BodyPair>) {
        self.handles.clear();
        self.handles.extend(bodies.keys());

        for (i, &hi) in self.handles.iter().enumerate() {
            let bi = &bodies[hi];
            for &hj in &self.handles[..i] {
                let bj = &bodies[hj];
                if need_broadphase_collision(bi, bj) && intersection_test(bi, bj, self.use_bounding_boxes) {
                    pairs.push((hi, hj));
                }
            }
        }
    }

    fn use_bounding_boxes(&self) -> bool {
        self.use_bounding_boxes
    }

    fn set_use_bounding_boxes(&mut self, use_boxes: bool) {
        self.use_bounding_boxes = use_boxes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::broadphase::tests::{random_scene, sorted_ids};
    use crate::collision::Aabb;
    use crate::foundation::math::Vec3;
    use crate::shapes::Shape;

    #[test]
    fn test_touching_spheres_pair_up() {
        let mut bodies = BodySet::with_key();
        let a = bodies.insert(Body::new(1.0).with_shape(Shape::sphere(1.0).unwrap()));
        let b = bodies.insert(
            Body::new(1.0)
                .with_shape(Shape::sphere(1.0).unwrap())
                .with_position(Vec3::new(1.5, 0.0, 0.0)),
        );
        bodies.insert(
            Body::new(1.0)
                .with_shape(Shape::sphere(1.0).unwrap())
                .with_position(Vec3::new(10.0, 0.0, 0.0)),
        );

        let mut pairs = Vec::new();
        NaiveBroadphase::new().collision_pairs(&bodies, &mut pairs);
        assert_eq!(pairs, vec![(b, a)]);
    }

    #[test]
    fn test_boxes_reject_what_spheres_accept() {
        let mut bodies = BodySet::with_key();
        let slab = Shape::cuboid(Vec3::new(1.0, 0.1, 0.1)).unwrap();
        let a = bodies.insert(Body::new(1.0).with_shape(slab.clone()));
        let b = bodies.insert(
            Body::new(1.0)
                .with_shape(slab)
                .with_position(Vec3::new(0.0, 1.5, 0.0)),
        );
        for handle in [a, b] {
            bodies[handle].update_aabb();
        }

        let mut pairs = Vec::new();
        NaiveBroadphase::new().collision_pairs(&bodies, &mut pairs);
        assert_eq!(sorted_ids(&bodies, &pairs).len(), 1);

        pairs.clear();
        let mut boxes = NaiveBroadphase::new();
        boxes.set_use_bounding_boxes(true);
        boxes.collision_pairs(&bodies, &mut pairs);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_aabb_query() {
        let bodies = random_scene(3, 20, 5.0);
        let mut found = Vec::new();
        NaiveBroadphase::new().aabb_query(&bodies, &Aabb::new(Vec3::repeat(-1.0), Vec3::repeat(1.0)), &mut found);
        for (handle, body) in &bodies {
            let overlaps = body.aabb().intersects(&Aabb::new(Vec3::repeat(-1.0), Vec3::repeat(1.0)));
            assert_eq!(found.contains(&handle), overlaps);
        }
    }
}
