//! Sweep and prune broadphase
//!
//! Bodies are kept in a list sorted by the lower end of their bounding
//! interval along one axis. A sweep compares each body only with the bodies
//! that start before it ends. The list is carried between steps so the sort
//! runs on nearly sorted input.

use super::{intersection_test, need_broadphase_collision, BodyPair, Broadphase};
use crate::body::Body;
use crate::collision::Aabb;
use crate::config::Axis;
use crate::foundation::collections::{BodyHandle, BodySet, SecondaryMap};
use crate::foundation::logging::trace;

/// Single-axis sweep and prune
#[derive(Debug, Clone)]
pub struct SapBroadphase {
    axis: Axis,
    auto_detect_axis: bool,
    use_bounding_boxes: bool,
    axis_list: Vec<BodyHandle>,
    members: SecondaryMap<BodyHandle, ()>,
}

impl Default for SapBroadphase {
    fn default() -> Self {
        Self::new(Axis::X)
    }
}

fn lower(body: &Body, axis: usize) -> f64 {
    body.position[axis] - body.bounding_radius()
}

fn upper(body: &Body, axis: usize) -> f64 {
    body.position[axis] + body.bounding_radius()
}

impl SapBroadphase {
    /// Sweep along a fixed axis
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            auto_detect_axis: false,
            use_bounding_boxes: false,
            axis_list: Vec::new(),
            members: SecondaryMap::new(),
        }
    }

    /// Re-pick the sweep axis before every sweep
    #[must_use]
    pub const fn with_auto_detect_axis(mut self, enabled: bool) -> Self {
        self.auto_detect_axis = enabled;
        self
    }

    /// Current sweep axis
    pub const fn axis(&self) -> Axis {
        self.axis
    }

    /// Pick the axis along which body positions vary the most
    pub fn auto_detect_axis(&mut self, bodies: &BodySet) {
        let n = bodies.len();
        if n < 2 {
            return;
        }
        let mut sum = [0.0_f64; 3];
        let mut sum_squared = [0.0_f64; 3];
        for handle in &self.axis_list {
            let Some(body) = bodies.get(*handle) else {
                continue;
            };
            for axis in 0..3 {
                let c = body.position[axis];
                sum[axis] += c;
                sum_squared[axis] += c * c;
            }
        }
        let count = n as f64;
        let variance: Vec<f64> = (0..3)
            .map(|axis| sum_squared[axis] - sum[axis] * sum[axis] / count)
            .collect();

        let mut best = 0;
        for axis in 1..3 {
            if variance[axis] > variance[best] {
                best = axis;
            }
        }
        let axis = Axis::from_index(best);
        if axis != self.axis {
            trace!("Sweep axis changed to {axis:?}");
        }
        self.axis = axis;
    }

    /// Bring the axis list in line with the body set
    fn sync(&mut self, bodies: &BodySet) {
        let members = &mut self.members;
        self.axis_list.retain(|&handle| {
            let alive = bodies.contains_key(handle);
            if !alive {
                members.remove(handle);
            }
            alive
        });
        for handle in bodies.keys() {
            if self.members.insert(handle, ()).is_none() {
                self.axis_list.push(handle);
            }
        }
    }

    /// Insertion sort on the lower interval bound
    fn sort(&mut self, bodies: &BodySet) {
        let axis = self.axis.index();
        let list = &mut self.axis_list;
        for i in 1..list.len() {
            let key = list[i];
            let key_lower = lower(&bodies[key], axis);
            let mut j = i;
            while j > 0 && lower(&bodies[list[j - 1]], axis) > key_lower {
                list[j] = list[j - 1];
                j -= 1;
            }
            list[j] = key;
        }
    }
}

impl Broadphase for SapBroadphase {
    fn collision_pairs(&mut self, bodies: &BodySet, pairs: &mut Vec<BodyPair>) {
        self.sync(bodies);
        if self.auto_detect_axis {
            self.auto_detect_axis(bodies);
        }
        self.sort(bodies);

        let axis = self.axis.index();
        for (i, &hi) in self.axis_list.iter().enumerate() {
            let bi = &bodies[hi];
            let end = upper(bi, axis);
            for &hj in &self.axis_list[i + 1..] {
                let bj = &bodies[hj];
                if lower(bj, axis) > end {
                    break;
                }
                if need_broadphase_collision(bi, bj) && intersection_test(bi, bj, self.use_bounding_boxes) {
                    pairs.push((hi, hj));
                }
            }
        }
    }

    fn aabb_query(&mut self, bodies: &BodySet, aabb: &Aabb, result: &mut Vec<BodyHandle>) {
        self.sync(bodies);
        self.sort(bodies);
        result.clear();

        let axis = self.axis.index();
        for &handle in &self.axis_list {
            let body = &bodies[handle];
            if lower(body, axis) > aabb.max[axis] {
                break;
            }
            if body.aabb().intersects(aabb) {
                result.push(handle);
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
