// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-only Merkle log (RFC 6962 tree shape).
//!
//! Used by the in-memory ledger to commit entries and to produce inclusion
//! proofs for any historical tree size. Perfect, aligned subtrees are cached
//! level by level as leaves are appended, so roots cost O(log n) and paths
//! O(log² n) node hashes.

use crate::hash::{empty_root, node_digest};
use crate::types::{Digest, InclusionProof};

#[derive(Debug, Clone, Default)]
pub struct MerkleLog {
    /// levels[0] = leaves, levels[h][i] = root of leaves [i << h, (i + 1) << h)
    levels: Vec<Vec<Digest>>,
}

impl MerkleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> u64 {
        self.levels.first().map(|l| l.len() as u64).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a leaf digest and returns its index.
    pub fn append(&mut self, leaf: Digest) -> u64 {
        if self.levels.is_empty() {
            self.levels.push(Vec::new());
        }
        self.levels[0].push(leaf);
        let index = self.levels[0].len() as u64 - 1;

        // Close every perfect subtree the new leaf completes
        let mut height = 0;
        while self.levels[height].len() % 2 == 0 {
            let level = &self.levels[height];
            let parent = node_digest(&level[level.len() - 2], &level[level.len() - 1]);
            if self.levels.len() == height + 1 {
                self.levels.push(Vec::new());
            }
            self.levels[height + 1].push(parent);
            height += 1;
        }

        index
    }

    pub fn root(&self) -> Digest {
        self.root_at(self.len()).unwrap_or_else(empty_root)
    }

    /// Root of the tree made of the first `size` leaves.
    pub fn root_at(&self, size: u64) -> Option<Digest> {
        if size > self.len() {
            return None;
        }
        if size == 0 {
            return Some(empty_root());
        }
        Some(self.subtree_root(0, size))
    }

    /// Audit path for `index` in the tree of the first `size` leaves.
    pub fn inclusion_proof(&self, index: u64, size: u64) -> Option<InclusionProof> {
        if index >= size || size > self.len() {
            return None;
        }
        let mut siblings = Vec::new();
        self.path(index, 0, size, &mut siblings);
        Some(InclusionProof {
            leaf_index: index,
            tree_size: size,
            siblings,
        })
    }

    /// PATH(m, D[start..start + len]) appended bottom-up.
    fn path(&self, m: u64, start: u64, len: u64, out: &mut Vec<Digest>) {
        if len <= 1 {
            return;
        }
        let k = split_point(len);
        if m < k {
            self.path(m, start, k, out);
            out.push(self.subtree_root(start + k, len - k));
        } else {
            self.path(m - k, start + k, len - k, out);
            out.push(self.subtree_root(start, k));
        }
    }

    /// MTH(D[start..start + len]) for `len > 0`.
    ///
    /// Every left child produced by the RFC 6962 split is perfect and aligned,
    /// so it comes straight out of the level cache.
    fn subtree_root(&self, start: u64, len: u64) -> Digest {
        if len.is_power_of_two() && start % len == 0 {
            let height = len.trailing_zeros() as usize;
            return self.levels[height][(start >> height) as usize];
        }
        let k = split_point(len);
        node_digest(
            &self.subtree_root(start, k),
            &self.subtree_root(start + k, len - k),
        )
    }
}

/// Largest power of two strictly below `n` (n >= 2).
fn split_point(n: u64) -> u64 {
    debug_assert!(n >= 2);
    1u64 << (63 - (n - 1).leading_zeros())
}
