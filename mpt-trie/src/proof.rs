//! # Merkle Proofs
//!
//! A [`Proof`] maps the hex-encoded hash of each node on a key's path to
//! that node's RLP encoding. [`verify`] replays the path from a claimed
//! root without access to the trie.

use std::collections::BTreeMap;

use alloy_primitives::{keccak256, B256};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::codec::{RlpItem, HASH_LEN};
use crate::error::{Result, TrieError};
use crate::nibbles::Nibbles;

/// Proof nodes keyed by hex-encoded node hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Proof {
    nodes: BTreeMap<String, Vec<u8>>,
}

impl Proof {
    pub fn new() -> Self {
        Proof::default()
    }

    /// Record the encoding of the node with the given hash.
    pub fn insert(&mut self, hash: B256, encoded: Vec<u8>) {
        self.nodes.insert(hex::encode(hash), encoded);
    }

    /// Encoding stored under `hash`, if any.
    pub fn get(&self, hash: &B256) -> Option<&[u8]> {
        self.nodes.get(&hex::encode(hash)).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Verify this proof for `key` against `root`, see [`verify`].
    pub fn verify(&self, root: B256, key: &[u8]) -> Result<Option<Vec<u8>>> {
        verify(root, key, self)
    }
}

impl FromIterator<(String, Vec<u8>)> for Proof {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u8>)>>(iter: I) -> Self {
        Proof {
            nodes: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Proof {
    type Item = (String, Vec<u8>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

// Wire form: {"<hash hex>": "<encoding hex>", ...}
impl Serialize for Proof {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.nodes.len()))?;
        for (hash, encoded) in &self.nodes {
            map.serialize_entry(hash, &hex::encode(encoded))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Proof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(hash, encoded)| -> std::result::Result<_, D::Error> {
                let hash = strip_hex_prefix(&hash).to_ascii_lowercase();
                let bytes = hex::decode(strip_hex_prefix(&encoded))
                    .map_err(<D::Error as de::Error>::custom)?;
                Ok((hash, bytes))
            })
            .collect()
    }
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

/// Outcome of dispatching a key through one decoded node.
enum Step {
    /// The key is not in the trie.
    Absent,
    /// The key maps to this value.
    Value(Vec<u8>),
    /// Continue at the node with this hash after consuming nibbles.
    Hash(B256, usize),
    /// Continue inside an embedded child after consuming nibbles.
    Embedded(RlpItem, usize),
}

/// Verify a proof for `key` against `root`.
///
/// Returns `Ok(Some(value))` for an inclusion proof, `Ok(None)` when the
/// proof shows the key is absent, and an error when the proof is missing
/// nodes or holds malformed ones.
pub fn verify(root: B256, key: &[u8], proof: &Proof) -> Result<Option<Vec<u8>>> {
    let nibbles = Nibbles::from_bytes(key);
    let mut remaining = nibbles.as_slice();
    let mut wanted = root;

    // each hash lookup past the root consumes at least one nibble
    for _ in 0..=nibbles.len() {
        let encoded = proof.get(&wanted).ok_or_else(|| incomplete(&wanted))?;
        if keccak256(encoded) != wanted {
            return Err(incomplete(&wanted));
        }
        trace!(hash = %wanted, remaining = remaining.len(), "verify step");

        let mut node = RlpItem::decode(encoded)?;
        loop {
            match step(&node, remaining)? {
                Step::Absent => {
                    debug!(key = %hex::encode(key), "verified absence");
                    return Ok(None);
                }
                Step::Value(value) => {
                    debug!(key = %hex::encode(key), "verified inclusion");
                    return Ok(Some(value));
                }
                Step::Hash(next, consumed) => {
                    remaining = &remaining[consumed..];
                    wanted = next;
                    break;
                }
                Step::Embedded(child, consumed) => {
                    remaining = &remaining[consumed..];
                    node = child;
                }
            }
        }
    }

    Err(TrieError::DecodeFailure(
        "proof path is longer than the key".into(),
    ))
}

fn incomplete(hash: &B256) -> TrieError {
    TrieError::ProofIncomplete {
        hash: hex::encode(hash),
    }
}

fn step(node: &RlpItem, key: &[u8]) -> Result<Step> {
    if node.is_empty_string() {
        return Ok(Step::Absent);
    }
    let items = node.as_list().ok_or_else(|| {
        TrieError::DecodeFailure("node is a byte string, expected a list".into())
    })?;

    match items.len() {
        2 => {
            let (path, is_leaf) = Nibbles::from_hex_prefix(bytes_field(&items[0], "path")?)?;

            if is_leaf {
                let value = bytes_field(&items[1], "leaf value")?;
                return Ok(if path.as_slice() == key && !value.is_empty() {
                    Step::Value(value.to_vec())
                } else {
                    Step::Absent
                });
            }

            if path.is_empty() {
                return Err(TrieError::DecodeFailure("empty extension path".into()));
            }
            if !key.starts_with(path.as_slice()) {
                return Ok(Step::Absent);
            }
            child_step(&items[1], path.len())
        }

        17 => match key.first() {
            None => {
                let value = bytes_field(&items[16], "branch value")?;
                Ok(if value.is_empty() {
                    Step::Absent
                } else {
                    Step::Value(value.to_vec())
                })
            }
            Some(&nibble) => child_step(&items[nibble as usize], 1),
        },

        n => Err(TrieError::DecodeFailure(format!(
            "node has {n} fields, expected 2 or 17"
        ))),
    }
}

fn child_step(child: &RlpItem, consumed: usize) -> Result<Step> {
    match child {
        RlpItem::Bytes(bytes) if bytes.is_empty() => Ok(Step::Absent),
        RlpItem::Bytes(bytes) if bytes.len() == HASH_LEN => {
            Ok(Step::Hash(B256::from_slice(bytes), consumed))
        }
        RlpItem::Bytes(bytes) => Err(TrieError::DecodeFailure(format!(
            "child reference of {} bytes",
            bytes.len()
        ))),
        RlpItem::List(_) => Ok(Step::Embedded(child.clone(), consumed)),
    }
}

fn bytes_field<'a>(item: &'a RlpItem, what: &str) -> Result<&'a [u8]> {
    item.as_bytes()
        .ok_or_else(|| TrieError::DecodeFailure(format!("{what} is a list")))
}
