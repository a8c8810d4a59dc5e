//! Pair bookkeeping across steps
//!
//! [`CollisionMatrix`] remembers which body pairs produced contacts this step
//! and last step. [`OverlapKeeper`] does the same for any ordered key and
//! reports the pairs that started or stopped touching.

use std::collections::HashSet;

/// Symmetric body-pair set for the current and the previous step
#[derive(Debug, Clone, Default)]
pub struct CollisionMatrix {
    current: HashSet<(u32, u32)>,
    previous: HashSet<(u32, u32)>,
}

impl CollisionMatrix {
    /// Create an empty matrix
    pub fn new() -> Self {
        Self::default()
    }

    const fn key(a: u32, b: u32) -> (u32, u32) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Whether the pair collided during this step
    pub fn get(&self, a: u32, b: u32) -> bool {
        self.current.contains(&Self::key(a, b))
    }

    /// Whether the pair collided during the previous step
    pub fn get_previous(&self, a: u32, b: u32) -> bool {
        self.previous.contains(&Self::key(a, b))
    }

    /// Mark or clear a pair for this step
    pub fn set(&mut self, a: u32, b: u32, colliding: bool) {
        let key = Self::key(a, b);
        if colliding {
            self.current.insert(key);
        } else {
            self.current.remove(&key);
        }
    }

    /// Move this step's pairs into the previous slot and start a fresh step
    pub fn tick(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
        self.current.clear();
    }

    /// Forget everything
    pub fn reset(&mut self) {
        self.current.clear();
        self.previous.clear();
    }
}

/// Sorted set of touching pairs with begin/end diffing
#[derive(Debug, Clone)]
pub struct OverlapKeeper<K> {
    current: Vec<(K, K)>,
    previous: Vec<(K, K)>,
}

impl<K> Default for OverlapKeeper<K> {
    fn default() -> Self {
        Self {
            current: Vec::new(),
            previous: Vec::new(),
        }
    }
}

impl<K: Ord + Copy> OverlapKeeper<K> {
    /// Create an empty keeper
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: K, b: K) -> (K, K) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Record that `a` and `b` overlap this step
    pub fn set(&mut self, a: K, b: K) {
        let key = Self::key(a, b);
        if let Err(index) = self.current.binary_search(&key) {
            self.current.insert(index, key);
        }
    }

    /// Whether the pair overlaps this step
    pub fn contains(&self, a: K, b: K) -> bool {
        self.current.binary_search(&Self::key(a, b)).is_ok()
    }

    /// Start a new step
    pub fn tick(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
        self.current.clear();
    }

    /// Pairs added since the previous step and pairs that went away
    pub fn diff(&self, additions: &mut Vec<(K, K)>, removals: &mut Vec<(K, K)>) {
        additions.clear();
        removals.clear();
        additions.extend(
            self.current
                .iter()
                .filter(|key| self.previous.binary_search(key).is_err())
                .copied(),
        );
        removals.extend(
            self.previous
                .iter()
                .filter(|key| self.current.binary_search(key).is_err())
                .copied(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_is_symmetric_and_ticks() {
        let mut matrix = CollisionMatrix::new();
        matrix.set(3, 1, true);
        assert!(matrix.get(1, 3));
        matrix.tick();
        assert!(!matrix.get(1, 3));
        assert!(matrix.get_previous(3, 1));
        matrix.set(1, 3, true);
        matrix.set(1, 3, false);
        assert!(!matrix.get(1, 3));
    }

    #[test]
    fn test_overlap_keeper_diff() {
        let mut keeper = OverlapKeeper::new();
        keeper.set(1, 2);
        keeper.set(2, 1);
        keeper.set(4, 3);

        let mut added = Vec::new();
        let mut removed = Vec::new();
        keeper.diff(&mut added, &mut removed);
        assert_eq!(added, vec![(1, 2), (3, 4)]);
        assert!(removed.is_empty());

        keeper.tick();
        keeper.set(3, 4);
        keeper.set(5, 6);
        keeper.diff(&mut added, &mut removed);
        assert_eq!(added, vec![(5, 6)]);
        assert_eq!(removed, vec![(1, 2)]);
    }
}
