//! Handle types and arenas
//!
//! Bodies and constraints are stored in generation-checked slot maps owned by
//! the world; everything else refers to them through these handles.

pub use slotmap::{new_key_type, SecondaryMap, SlotMap};

new_key_type! {
    /// Stable handle to a body owned by a [`World`](crate::world::World)
    pub struct BodyHandle;

    /// Stable handle to a constraint owned by a [`World`](crate::world::World)
    pub struct ConstraintHandle;
}

/// Arena of bodies indexed by [`BodyHandle`]
pub type BodySet = SlotMap<BodyHandle, crate::body::Body>;

/// Canonical unordered pair of handles, smallest key first
pub fn ordered_pair<K: slotmap::Key + Ord>(a: K, b: K) -> (K, K) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_pair_is_symmetric() {
        let mut map: SlotMap<BodyHandle, ()> = SlotMap::with_key();
        let a = map.insert(());
        let b = map.insert(());
        assert_eq!(ordered_pair(a, b), ordered_pair(b, a));
    }
}
