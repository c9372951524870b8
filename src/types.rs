// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger data model.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DIGEST_LEN: usize = 32;

/// BLAKE3 output. Roots, leaves and interior nodes all use this width.
pub type Digest = [u8; DIGEST_LEN];

/// A key/value pair as committed by one ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[serde(with = "hex_bytes")]
    pub key: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub value: Vec<u8>,
    pub transaction_id: u64,
}

impl Entry {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>, transaction_id: u64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            transaction_id,
        }
    }

    pub fn display_key(&self) -> String {
        render_bytes(&self.key)
    }
}

/// Commitment to the whole ledger at `transaction_id`.
///
/// Serializes as `{"transactionId": <int>, "merkleRoot": "<hex>"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    #[serde(rename = "transactionId")]
    pub transaction_id: u64,
    #[serde(rename = "merkleRoot", with = "hex_digest")]
    pub digest: Digest,
}

impl Root {
    pub fn new(transaction_id: u64, digest: Digest) -> Self {
        Self { transaction_id, digest }
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx {} / {}", self.transaction_id, self.digest_hex())
    }
}

/// Audit path from one leaf up to the root of a tree of `tree_size` leaves.
/// Siblings are ordered bottom-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionProof {
    pub leaf_index: u64,
    pub tree_size: u64,
    #[serde(with = "hex_digests")]
    pub siblings: Vec<Digest>,
}

/// One transport answer: an entry, its proof, and the root the server claims
/// the proof leads to. Nothing here is trusted until verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenEntry {
    pub entry: Entry,
    pub proof: InclusionProof,
    pub root: Root,
}

/// UTF-8 bytes as-is, anything else as `0x`-prefixed hex.
pub fn render_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => format!("0x{}", hex::encode(bytes)),
    }
}

pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

pub(crate) mod hex_digest {
    use super::{Digest, DIGEST_LEN};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(digest: &Digest, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(digest))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Digest, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse(s: &str) -> Result<Digest, String> {
        let mut out = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut out)
            .map_err(|e| format!("bad digest {:?}: {}", s, e))?;
        Ok(out)
    }
}

pub(crate) mod hex_digests {
    use super::Digest;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(digests: &[Digest], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(digests.len()))?;
        for d in digests {
            seq.serialize_element(&hex::encode(d))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Digest>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter()
            .map(|s| super::hex_digest::parse(s).map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_reporting_format() {
        let root = Root::new(10, [0xab; 32]);
        let json = serde_json::to_value(root).unwrap();

        assert_eq!(json["transactionId"], 10);
        assert_eq!(json["merkleRoot"], "ab".repeat(32));

        let decoded: Root = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, root);
    }

    #[test]
    fn test_short_digest_rejected() {
        let bad = serde_json::json!({ "transactionId": 1, "merkleRoot": "abcd" });
        assert!(serde_json::from_value::<Root>(bad).is_err());
    }

    #[test]
    fn test_render_bytes() {
        assert_eq!(render_bytes(b"block:1"), "block:1");
        assert_eq!(render_bytes(&[0xff, 0x00]), "0xff00");
    }
}
