// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Canonical BLAKE3 hashing for the ledger's Merkle construction.
//!
//! Leaves and interior nodes are domain separated so a leaf can never be
//! passed off as an interior node (and vice versa).
//!
//! # Hash Input Structure
//! ```text
//! leaf  = BLAKE3(0x00 ‖ transaction_id (u64 LE) ‖ key_len (u32 LE) ‖ key ‖ value)
//! node  = BLAKE3(0x01 ‖ left ‖ right)
//! empty = BLAKE3("")
//! ```

use crate::types::{Digest, Entry};

pub const LEAF_PREFIX: u8 = 0x00;
pub const NODE_PREFIX: u8 = 0x01;

/// Leaf digest of an entry. Operates on raw bytes only.
pub fn leaf_digest(entry: &Entry) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[LEAF_PREFIX]);
    hasher.update(&entry.transaction_id.to_le_bytes());
    hasher.update(&(entry.key.len() as u32).to_le_bytes());
    hasher.update(&entry.key);
    hasher.update(&entry.value);
    *hasher.finalize().as_bytes()
}

pub fn node_digest(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    *hasher.finalize().as_bytes()
}

/// Root of a tree with no leaves.
pub fn empty_root() -> Digest {
    *blake3::hash(&[]).as_bytes()
}

/// Constant-time digest comparison.
pub fn digests_equal(a: &Digest, b: &Digest) -> bool {
    blake3::Hash::from(*a) == blake3::Hash::from(*b)
}
