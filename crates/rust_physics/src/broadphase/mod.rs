//! Broad-phase pair pruning
//!
//! A broadphase turns the body set into candidate pairs for the narrowphase.
//! Every variant returns a superset of the truly overlapping pairs; false
//! positives are rejected later.
//!
//! - [`NaiveBroadphase`]: all pairs, the correctness baseline
//! - [`GridBroadphase`]: uniform grid over a fixed world box
//! - [`SapBroadphase`]: sweep and prune along one axis

mod grid;
mod naive;
mod sap;

pub use grid::GridBroadphase;
pub use naive::NaiveBroadphase;
pub use sap::SapBroadphase;

use crate::body::Body;
use crate::collision::Aabb;
use crate::config::BroadphaseConfig;
use crate::error::PhysicsResult;
use crate::foundation::collections::{BodyHandle, BodySet};

/// Candidate pair of bodies
pub type BodyPair = (BodyHandle, BodyHandle);

/// Broad-phase interface
///
/// Body boxes must be fresh before any call; the world refreshes stale boxes
/// at the start of each step.
pub trait Broadphase: std::fmt::Debug {
    /// Append the candidate pairs of this step to `pairs`
    fn collision_pairs(&mut self, bodies: &BodySet, pairs: &mut Vec<BodyPair>);

    /// Bodies whose boxes overlap `aabb`
    fn aabb_query(&mut self, bodies: &BodySet, aabb: &Aabb, result: &mut Vec<BodyHandle>) {
        result.clear();
        result.extend(
            bodies
                .iter()
                .filter(|(_, body)| body.aabb().intersects(aabb))
                .map(|(handle, _)| handle),
        );
    }

    /// Whether pairs are tested with boxes instead of bounding spheres
    fn use_bounding_boxes(&self) -> bool;

    /// Choose boxes or bounding spheres for the pair test
    fn set_use_bounding_boxes(&mut self, use_boxes: bool);
}

/// Build the broadphase described by a config
pub fn create_broadphase(config: &BroadphaseConfig) -> PhysicsResult<Box<dyn Broadphase>> {
    Ok(match config {
        BroadphaseConfig::Naive { use_bounding_boxes } => {
            Box::new(NaiveBroadphase::new().with_bounding_boxes(*use_bounding_boxes))
        }
        BroadphaseConfig::Grid {
            aabb_min,
            aabb_max,
            nx,
            ny,
            nz,
        } => Box::new(GridBroadphase::new(*aabb_min, *aabb_max, *nx, *ny, *nz)?),
        BroadphaseConfig::Sap { axis, auto_detect_axis } => {
            Box::new(SapBroadphase::new(*axis).with_auto_detect_axis(*auto_detect_axis))
        }
    })
}

/// A body that cannot move during this step
fn is_immovable(body: &Body) -> bool {
    body.body_type() == crate::body::BodyType::Static || body.is_sleeping()
}

/// Filter test shared by all variants.
///
/// Groups and masks must match both ways, and at least one body has to be
/// able to move. Kinematic bodies count as moving.
pub fn need_broadphase_collision(a: &Body, b: &Body) -> bool {
    if !a.filter.interacts_with(&b.filter) {
        return false;
    }
    !(is_immovable(a) && is_immovable(b))
}

/// Bounding volume overlap test
pub fn intersection_test(a: &Body, b: &Body, use_bounding_boxes: bool) -> bool {
    if use_bounding_boxes {
        a.aabb().intersects(b.aabb())
    } else {
        bounding_sphere_check(a, b)
    }
}

fn bounding_sphere_check(a: &Body, b: &Body) -> bool {
    let r = a.bounding_radius() + b.bounding_radius();
    (b.position - a.position).norm_squared() <= r * r
}

/// Order every pair by body id and drop duplicates
pub fn make_pairs_unique(bodies: &BodySet, pairs: &mut Vec<BodyPair>) {
    let id = |handle: BodyHandle| bodies.get(handle).map_or(u32::MAX, Body::id);
    for pair in pairs.iter_mut() {
        if id(pair.1) < id(pair.0) {
            *pair = (pair.1, pair.0);
        }
    }
    pairs.sort_unstable_by_key(|&(a, b)| (id(a), id(b)));
    pairs.dedup();
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::collision::{CollisionFilter, CollisionGroups};
    use crate::foundation::math::Vec3;
    use crate::shapes::Shape;
    use rand::{Rng, SeedableRng};

    /// Random boxes and spheres, ids assigned the way the world does
    pub(crate) fn random_scene(seed: u64, count: usize, extent: f64) -> BodySet {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut bodies = BodySet::with_key();
        for i in 0..count {
            let position = Vec3::new(
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
            );
            let shape = if i % 2 == 0 {
                Shape::sphere(rng.gen_range(0.2..1.5)).unwrap()
            } else {
                Shape::cuboid(Vec3::new(
                    rng.gen_range(0.2..1.0),
                    rng.gen_range(0.2..1.0),
                    rng.gen_range(0.2..1.0),
                ))
                .unwrap()
            };
            let mut body = Body::new(1.0).with_shape(shape).with_position(position);
            body.id = u32::try_from(i).unwrap();
            body.update_aabb();
            bodies.insert(body);
        }
        bodies
    }

    pub(crate) fn sorted_ids(bodies: &BodySet, pairs: &[BodyPair]) -> Vec<(u32, u32)> {
        let mut ids: Vec<(u32, u32)> = pairs
            .iter()
            .map(|&(a, b)| {
                let (a, b) = (bodies[a].id(), bodies[b].id());
                (a.min(b), a.max(b))
            })
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    #[test]
    fn test_static_pairs_are_skipped() {
        let a = Body::fixed();
        let b = Body::fixed();
        assert!(!need_broadphase_collision(&a, &b));

        let mut sleeping = Body::new(1.0);
        sleeping.sleep();
        assert!(!need_broadphase_collision(&a, &sleeping));
        assert!(need_broadphase_collision(&a, &Body::new(1.0)));
        assert!(need_broadphase_collision(&Body::kinematic(), &a));
    }

    #[test]
    fn test_masks_filter_pairs() {
        let a = Body::new(1.0).with_filter(CollisionFilter::new(CollisionGroups::GROUP_1, CollisionGroups::GROUP_1));
        let b = Body::new(1.0).with_filter(CollisionFilter::new(CollisionGroups::GROUP_2, CollisionGroups::all()));
        assert!(!need_broadphase_collision(&a, &b));
    }

    #[test]
    fn test_make_pairs_unique() {
        let bodies = random_scene(1, 3, 1.0);
        let handles: Vec<BodyHandle> = bodies.keys().collect();
        let mut pairs = vec![
            (handles[1], handles[0]),
            (handles[0], handles[1]),
            (handles[2], handles[1]),
        ];
        make_pairs_unique(&bodies, &mut pairs);
        assert_eq!(pairs, vec![(handles[0], handles[1]), (handles[1], handles[2])]);
    }

    #[test]
    fn test_sphere_check_with_plane() {
        let plane = Body::fixed().with_shape(Shape::Plane);
        let ball = Body::new(1.0)
            .with_shape(Shape::sphere(1.0).unwrap())
            .with_position(Vec3::new(0.0, 0.0, 100.0));
        assert!(intersection_test(&plane, &ball, false));
    }
}
