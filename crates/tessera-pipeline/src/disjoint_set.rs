//! Array-backed union-find with path compression and union by rank.
//!
//! Tracks component sizes at the roots. On equal rank the second
//! argument's root is attached under the first's.

use crate::types::SegmentError;

/// Disjoint-set forest over the elements `0..n`.
///
/// `size` is only meaningful at roots.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u32>,
    size: Vec<usize>,
}

impl DisjointSet {
    /// Create `n` singleton sets.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
            size: vec![1; n],
        }
    }

    /// Number of elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.parent.len()
    }

    /// Returns `true` if there are no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    fn check(&self, x: usize) -> Result<(), SegmentError> {
        if x < self.parent.len() {
            Ok(())
        } else {
            Err(SegmentError::IndexOutOfRange {
                index: x,
                len: self.parent.len(),
            })
        }
    }

    /// Root lookup for an index already known to be in range.
    ///
    /// Two passes: climb to the root, then re-point every node on the
    /// path directly at it. Iterative so a degenerate chain the length
    /// of the image cannot overflow the stack.
    fn find_root(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Canonical root of the set containing `x`, compressing the path.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::IndexOutOfRange`] if `x >= len()`.
    pub fn find(&mut self, x: usize) -> Result<usize, SegmentError> {
        self.check(x)?;
        Ok(self.find_root(x))
    }

    /// Merge the sets containing `x` and `y`.
    ///
    /// Returns `false` (and changes nothing) if they were already the
    /// same set.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::IndexOutOfRange`] if either index is out
    /// of range.
    pub fn union(&mut self, x: usize, y: usize) -> Result<bool, SegmentError> {
        self.check(x)?;
        self.check(y)?;
        Ok(self.union_roots(x, y))
    }

    fn union_roots(&mut self, x: usize, y: usize) -> bool {
        let root_x = self.find_root(x);
        let root_y = self.find_root(y);
        if root_x == root_y {
            return false;
        }

        let (keep, absorb) = match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Less => (root_y, root_x),
            std::cmp::Ordering::Greater => (root_x, root_y),
            std::cmp::Ordering::Equal => {
                self.rank[root_x] += 1;
                (root_x, root_y)
            }
        };
        self.parent[absorb] = keep;
        self.size[keep] += self.size[absorb];
        true
    }

    /// Whether `x` and `y` are in the same set.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::IndexOutOfRange`] if either index is out
    /// of range.
    pub fn connected(&mut self, x: usize, y: usize) -> Result<bool, SegmentError> {
        Ok(self.find(x)? == self.find(y)?)
    }

    /// Number of elements in the set containing `x`.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::IndexOutOfRange`] if `x >= len()`.
    pub fn component_size(&mut self, x: usize) -> Result<usize, SegmentError> {
        let root = self.find(x)?;
        Ok(self.size[root])
    }

    /// One `(root, size)` entry per set.
    ///
    /// Entries are ordered by the first element, scanning `0..n`, that
    /// resolves to each root. Downstream region ids rely on this order.
    #[must_use]
    pub fn components(&mut self) -> Vec<(usize, usize)> {
        let mut seen = vec![false; self.len()];
        let mut out = Vec::new();
        for i in 0..self.len() {
            let root = self.find_root(i);
            if !seen[root] {
                seen[root] = true;
                out.push((root, self.size[root]));
            }
        }
        out
    }

    /// Fully compress every path and return the root of each element.
    #[must_use]
    pub fn roots(&mut self) -> Vec<usize> {
        (0..self.len()).map(|i| self.find_root(i)).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Small deterministic LCG so pseudo-random union sequences need no
    /// extra dependency.
    fn lcg(state: &mut u64) -> u64 {
        *state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        *state >> 33
    }

    #[test]
    fn new_has_singletons() {
        let mut ds = DisjointSet::new(4);
        assert_eq!(ds.len(), 4);
        for i in 0..4 {
            assert_eq!(ds.find(i).unwrap(), i);
            assert_eq!(ds.component_size(i).unwrap(), 1);
        }
    }

    #[test]
    fn empty_set() {
        let mut ds = DisjointSet::new(0);
        assert!(ds.is_empty());
        assert!(ds.components().is_empty());
        assert!(matches!(
            ds.find(0),
            Err(SegmentError::IndexOutOfRange { index: 0, len: 0 })
        ));
    }

    #[test]
    fn union_merges_and_reports_change() {
        let mut ds = DisjointSet::new(3);
        assert!(ds.union(0, 1).unwrap());
        assert!(!ds.union(1, 0).unwrap());
        assert!(ds.connected(0, 1).unwrap());
        assert!(!ds.connected(0, 2).unwrap());
        assert_eq!(ds.component_size(1).unwrap(), 2);
    }

    #[test]
    fn equal_rank_attaches_second_under_first() {
        let mut ds = DisjointSet::new(2);
        ds.union(1, 0).unwrap();
        assert_eq!(ds.find(0).unwrap(), 1);
        assert_eq!(ds.find(1).unwrap(), 1);
    }

    #[test]
    fn lower_rank_goes_under_higher_rank() {
        let mut ds = DisjointSet::new(3);
        // {0,1} has rank 1 rooted at 0; 2 is rank 0.
        ds.union(0, 1).unwrap();
        ds.union(2, 0).unwrap();
        assert_eq!(ds.find(2).unwrap(), 0);
        assert_eq!(ds.component_size(2).unwrap(), 3);
    }

    #[test]
    fn out_of_range_union_is_rejected_without_change() {
        let mut ds = DisjointSet::new(2);
        assert!(matches!(
            ds.union(0, 5),
            Err(SegmentError::IndexOutOfRange { index: 5, len: 2 })
        ));
        assert!(!ds.connected(0, 1).unwrap());
    }

    #[test]
    fn long_chain_does_not_overflow_and_is_compressed() {
        let n = 200_000;
        let mut ds = DisjointSet::new(n);
        // Build a degenerate chain by hand: i -> i + 1.
        for i in 0..n - 1 {
            ds.parent[i] = i + 1;
        }
        assert_eq!(ds.find(0).unwrap(), n - 1);
        // After compression every visited node points at the root.
        assert!(ds.parent.iter().all(|&p| p == n - 1));
    }

    #[test]
    fn components_follow_first_seen_order() {
        let mut ds = DisjointSet::new(6);
        ds.union(5, 1).unwrap(); // root 5
        ds.union(4, 3).unwrap(); // root 4
        ds.union(2, 0).unwrap(); // root 2
        let comps = ds.components();
        // Scan order: 0 -> root 2, 1 -> root 5, 3 -> root 4.
        assert_eq!(comps, vec![(2, 2), (5, 2), (4, 2)]);
    }

    #[test]
    fn roots_matches_find() {
        let mut ds = DisjointSet::new(5);
        ds.union(0, 4).unwrap();
        ds.union(4, 2).unwrap();
        let roots = ds.roots();
        for (i, &r) in roots.iter().enumerate() {
            assert_eq!(ds.find(i).unwrap(), r);
        }
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn connectivity_is_an_equivalence_and_sizes_sum_to_n() {
        for seed in 1..20_u64 {
            let mut state = seed;
            let n = 40;
            let mut ds = DisjointSet::new(n);
            for _ in 0..(seed as usize * 3) {
                let a = (lcg(&mut state) % n as u64) as usize;
                let b = (lcg(&mut state) % n as u64) as usize;
                ds.union(a, b).unwrap();
            }

            for x in 0..n {
                assert!(ds.connected(x, x).unwrap());
                for y in 0..n {
                    let xy = ds.connected(x, y).unwrap();
                    assert_eq!(xy, ds.connected(y, x).unwrap());
                    if xy {
                        for z in 0..n {
                            if ds.connected(y, z).unwrap() {
                                assert!(ds.connected(x, z).unwrap());
                            }
                        }
                    }
                }
            }

            let total: usize = ds.components().iter().map(|&(_, size)| size).sum();
            assert_eq!(total, n);
            for &(root, size) in &ds.components() {
                assert_eq!(ds.component_size(root).unwrap(), size);
            }
        }
    }

    #[test]
    fn repeated_find_is_idempotent() {
        let mut ds = DisjointSet::new(8);
        ds.union(0, 1).unwrap();
        ds.union(2, 3).unwrap();
        ds.union(1, 3).unwrap();
        let first = ds.find(3).unwrap();
        for _ in 0..3 {
            assert_eq!(ds.find(3).unwrap(), first);
            assert_eq!(ds.find(0).unwrap(), first);
        }
    }
}
