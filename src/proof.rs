// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Inclusion proof verification.
//!
//! Pure functions: no I/O, no shared state. A failed check is an ordinary
//! outcome and is reported as `false`, never as a panic.

use crate::hash::{digests_equal, leaf_digest, node_digest};
use crate::types::{Digest, Entry, InclusionProof, Root};

/// Checks that `entry` sits at `proof.leaf_index` of the tree committed to by
/// `claimed_root`.
///
/// Besides the path itself this binds the proof to the ledger model: one leaf
/// per transaction, so the tree at transaction `t` has `t` leaves and the
/// entry written by transaction `t` is leaf `t - 1`.
pub fn verify(entry: &Entry, proof: &InclusionProof, claimed_root: &Root) -> bool {
    if proof.tree_size != claimed_root.transaction_id {
        return false;
    }
    if proof.leaf_index.checked_add(1) != Some(entry.transaction_id) {
        return false;
    }

    match root_from_path(&leaf_digest(entry), proof) {
        Some(computed) => digests_equal(&computed, &claimed_root.digest),
        None => false,
    }
}

/// Folds the audit path bottom-up (RFC 9162 section 2.1.3.2).
///
/// The parity of the running leaf index decides the concatenation order at
/// each level; `last` tracks the right edge of the tree so that levels where
/// the node has no right sibling are skipped. Returns `None` when the path
/// has the wrong shape for `tree_size`.
pub fn root_from_path(leaf: &Digest, proof: &InclusionProof) -> Option<Digest> {
    if proof.leaf_index >= proof.tree_size {
        return None;
    }

    let mut index = proof.leaf_index;
    let mut last = proof.tree_size - 1;
    let mut current = *leaf;

    for sibling in &proof.siblings {
        if last == 0 {
            // More siblings than levels
            return None;
        }
        if index & 1 == 1 || index == last {
            current = node_digest(sibling, &current);
            if index & 1 == 0 {
                // Right edge: climb until this node becomes a right child
                while index & 1 == 0 && index != 0 {
                    index >>= 1;
                    last >>= 1;
                }
            }
        } else {
            current = node_digest(&current, sibling);
        }
        index >>= 1;
        last >>= 1;
    }

    if last != 0 {
        // Path ended below the root
        return None;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::MerkleLog;

    fn ledger(n: u64) -> (MerkleLog, Vec<Entry>) {
        let mut log = MerkleLog::new();
        let mut entries = Vec::new();
        for tx in 1..=n {
            let entry = Entry::new(format!("key:{}", tx), format!("value-{}", tx), tx);
            log.append(leaf_digest(&entry));
            entries.push(entry);
        }
        (log, entries)
    }

    #[test]
    fn test_every_leaf_verifies_for_every_size() {
        let (log, entries) = ledger(21);
        for size in 1..=21u64 {
            let root = Root::new(size, log.root_at(size).unwrap());
            for index in 0..size {
                let proof = log.inclusion_proof(index, size).unwrap();
                assert!(
                    verify(&entries[index as usize], &proof, &root),
                    "leaf {} of {}",
                    index,
                    size
                );
            }
        }
    }

    #[test]
    fn test_wrong_root_rejected() {
        let (log, entries) = ledger(6);
        let proof = log.inclusion_proof(2, 6).unwrap();

        let mut digest = log.root_at(6).unwrap();
        digest[31] ^= 1;
        assert!(!verify(&entries[2], &proof, &Root::new(6, digest)));
    }

    #[test]
    fn test_tree_size_bound_to_transaction() {
        let (log, entries) = ledger(6);
        let proof = log.inclusion_proof(2, 6).unwrap();
        // Correct digest, wrong transaction id
        let root = Root::new(7, log.root_at(6).unwrap());
        assert!(!verify(&entries[2], &proof, &root));
    }

    #[test]
    fn test_entry_bound_to_leaf_index() {
        let (log, entries) = ledger(8);
        let root = Root::new(8, log.root_at(8).unwrap());
        // Valid proof for leaf 3, presented for the entry at leaf 4
        let proof = log.inclusion_proof(3, 8).unwrap();
        assert!(!verify(&entries[4], &proof, &root));
    }

    #[test]
    fn test_malformed_paths_rejected() {
        let (log, entries) = ledger(5);
        let root = Root::new(5, log.root_at(5).unwrap());
        let good = log.inclusion_proof(1, 5).unwrap();

        let mut extra = good.clone();
        extra.siblings.push([0u8; 32]);
        assert!(!verify(&entries[1], &extra, &root));

        let mut short = good.clone();
        short.siblings.pop();
        assert!(!verify(&entries[1], &short, &root));

        let out_of_range = InclusionProof { leaf_index: 5, tree_size: 5, siblings: vec![] };
        assert!(root_from_path(&leaf_digest(&entries[1]), &out_of_range).is_none());
    }

    #[test]
    fn test_single_leaf_tree() {
        let (log, entries) = ledger(1);
        let proof = log.inclusion_proof(0, 1).unwrap();
        assert!(proof.siblings.is_empty());
        assert!(verify(&entries[0], &proof, &Root::new(1, log.root())));
    }
}
