//! Collision group filtering
//!
//! Every body and every shape carries a group and a mask. Two filters interact
//! only when each one's group is part of the other's mask.

use bitflags::bitflags;

bitflags! {
    /// Collision group bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CollisionGroups: u32 {
        /// Default group of new bodies and shapes
        const GROUP_1 = 1 << 0;
        /// Group 2
        const GROUP_2 = 1 << 1;
        /// Group 3
        const GROUP_3 = 1 << 2;
        /// Group 4
        const GROUP_4 = 1 << 3;
        /// Group 5
        const GROUP_5 = 1 << 4;
        /// Group 6
        const GROUP_6 = 1 << 5;
        /// Group 7
        const GROUP_7 = 1 << 6;
        /// Group 8
        const GROUP_8 = 1 << 7;

        // The remaining bits are free for user-defined groups
        const _ = !0;
    }
}

/// Group and mask pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionFilter {
    /// Groups this object belongs to
    pub group: CollisionGroups,
    /// Groups this object collides with
    pub mask: CollisionGroups,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            group: CollisionGroups::GROUP_1,
            mask: CollisionGroups::all(),
        }
    }
}

impl CollisionFilter {
    /// Create a filter
    pub const fn new(group: CollisionGroups, mask: CollisionGroups) -> Self {
        Self { group, mask }
    }

    /// Check whether two filters let their owners collide
    pub fn interacts_with(&self, other: &Self) -> bool {
        self.group.intersects(other.mask) && other.group.intersects(self.mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters_interact() {
        assert!(CollisionFilter::default().interacts_with(&CollisionFilter::default()));
    }

    #[test]
    fn test_one_way_mask_blocks() {
        let a = CollisionFilter::new(CollisionGroups::GROUP_1, CollisionGroups::GROUP_2);
        let b = CollisionFilter::new(CollisionGroups::GROUP_2, CollisionGroups::GROUP_3);
        assert!(!a.interacts_with(&b));
        assert!(!b.interacts_with(&a));

        let c = CollisionFilter::new(CollisionGroups::GROUP_2, CollisionGroups::GROUP_1);
        assert!(a.interacts_with(&c));
    }

    #[test]
    fn test_user_bits_survive() {
        let custom = CollisionGroups::from_bits_retain(1 << 20);
        let a = CollisionFilter::new(custom, CollisionGroups::all());
        let b = CollisionFilter::new(CollisionGroups::GROUP_1, custom);
        assert!(a.interacts_with(&b));
    }
}
