//! # Patricia Trie
//!
//! The main trie data structure with insert, lookup and proof operations.

use alloy_primitives::{keccak256, B256};
use tracing::{debug, trace};

use crate::error::{Result, TrieError};
use crate::nibbles::{prefix_matched_len, Nibbles};
use crate::node::{Node, NodeArena, NodeId, EMPTY_ROOT};
use crate::proof::Proof;

/// Key/value interface shared by trie implementations.
pub trait KeyValueTrie {
    /// Get value for key
    fn get(&self, key: &[u8]) -> Option<&[u8]>;

    /// Insert or overwrite a key
    fn put(&mut self, key: &[u8], value: Vec<u8>);

    /// Remove a key, returning whether it was present
    fn delete(&mut self, key: &[u8]) -> Result<bool>;
}

/// Where a node reference lives: the root pointer or a slot in a parent.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Root,
    Child { branch: NodeId, index: u8 },
    Next { extension: NodeId },
}

/// Merkle Patricia Trie
#[derive(Debug, Clone, Default)]
pub struct Trie {
    root: NodeId,
    arena: NodeArena,
}

impl Trie {
    /// Create new empty trie
    pub fn new() -> Self {
        Trie {
            root: NodeId::EMPTY,
            arena: NodeArena::new(),
        }
    }

    /// Build a trie whose keys are the RLP-encoded positions of `values`,
    /// the layout of Ethereum transaction and receipt tries.
    pub fn from_ordered<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        let mut trie = Trie::new();
        for (index, value) in values.into_iter().enumerate() {
            trie.put(&index_key(index), value.into());
        }
        trie
    }

    /// Root hash. The empty trie hashes to [`EMPTY_ROOT`].
    pub fn hash(&self) -> B256 {
        self.arena.hash(self.root)
    }

    /// Check if trie is empty
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Id of the root node, [`NodeId::EMPTY`] for an empty trie.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The node storage, including nodes no longer reachable from the root.
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    /// Get value for key.
    ///
    /// An empty value encodes the same as no value, so it reads as absent.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let nibbles = Nibbles::from_bytes(key);
        let mut remaining = nibbles.as_slice();
        let mut id = self.root;

        loop {
            match self.arena.get(id) {
                Node::Empty => return None,

                Node::Leaf { rest, value } => {
                    return (rest.as_slice() == remaining && !value.is_empty())
                        .then_some(value.as_slice());
                }

                Node::Branch { children, value } => match remaining.split_first() {
                    None => return value.as_deref().filter(|v| !v.is_empty()),
                    Some((&nibble, tail)) => {
                        id = children[nibble as usize];
                        remaining = tail;
                    }
                },

                Node::Extension { shared, next } => {
                    if !remaining.starts_with(shared.as_slice()) {
                        return None;
                    }
                    remaining = &remaining[shared.len()..];
                    id = *next;
                }
            }
        }
    }

    /// Insert key-value pair, overwriting any previous value.
    pub fn put(&mut self, key: &[u8], value: Vec<u8>) {
        let nibbles = Nibbles::from_bytes(key);
        let mut slot = Slot::Root;
        let mut consumed = 0;

        loop {
            let id = self.target(slot);
            let remaining = &nibbles.as_slice()[consumed..];
            // Take the node out; every arm below either installs a
            // replacement or puts the node back before descending.
            let node = if id.is_empty() {
                Node::Empty
            } else {
                self.arena.replace(id, Node::Empty)
            };
            trace!(%id, kind = %node.kind(), consumed, "put step");

            match node {
                Node::Empty => {
                    let leaf = Node::leaf(Nibbles::from_raw(remaining.to_vec()), value);
                    self.install(slot, leaf);
                    break;
                }

                Node::Leaf { rest, value: old } => {
                    let replacement = self.split_leaf(rest, old, remaining, value);
                    self.arena.replace(id, replacement);
                    break;
                }

                Node::Branch { children, value: old } => match remaining.first() {
                    None => {
                        self.arena.replace(
                            id,
                            Node::Branch {
                                children,
                                value: Some(value),
                            },
                        );
                        break;
                    }
                    Some(&nibble) => {
                        self.arena.replace(id, Node::Branch { children, value: old });
                        slot = Slot::Child {
                            branch: id,
                            index: nibble,
                        };
                        consumed += 1;
                    }
                },

                Node::Extension { shared, next } => {
                    let matched = prefix_matched_len(shared.as_slice(), remaining);
                    if matched < shared.len() {
                        let replacement = self.split_extension(shared, next, remaining, value);
                        self.arena.replace(id, replacement);
                        break;
                    }
                    consumed += shared.len();
                    self.arena.replace(id, Node::Extension { shared, next });
                    slot = Slot::Next { extension: id };
                }
            }
        }

        debug!(key = %hex::encode(key), nibbles = nibbles.len(), "put");
    }

    /// Build a proof for `key`.
    ///
    /// Every node on the path from the root is recorded, whether or not
    /// the key is present, so the proof doubles as an exclusion proof.
    pub fn prove(&self, key: &[u8]) -> (Proof, bool) {
        let nibbles = Nibbles::from_bytes(key);
        let mut remaining = nibbles.as_slice();
        let mut id = self.root;
        let mut proof = Proof::new();

        let found = loop {
            let encoded = self.arena.serialize(id);
            let hash = if id.is_empty() {
                EMPTY_ROOT
            } else {
                keccak256(&encoded)
            };
            proof.insert(hash, encoded);

            match self.arena.get(id) {
                Node::Empty => break false,

                Node::Leaf { rest, value } => {
                    break rest.as_slice() == remaining && !value.is_empty()
                }

                Node::Branch { children, value } => match remaining.split_first() {
                    None => break value.as_deref().is_some_and(|v| !v.is_empty()),
                    Some((&nibble, tail)) => {
                        id = children[nibble as usize];
                        remaining = tail;
                    }
                },

                Node::Extension { shared, next } => {
                    if !remaining.starts_with(shared.as_slice()) {
                        break false;
                    }
                    remaining = &remaining[shared.len()..];
                    id = *next;
                }
            }
        };

        debug!(key = %hex::encode(key), nodes = proof.len(), found, "prove");
        (proof, found)
    }

    /// Replace the leaf holding `rest` with the structure that also holds
    /// `key`.
    fn split_leaf(&mut self, rest: Nibbles, old: Vec<u8>, key: &[u8], value: Vec<u8>) -> Node {
        let matched = prefix_matched_len(rest.as_slice(), key);
        if matched == rest.len() && matched == key.len() {
            return Node::leaf(rest, value);
        }

        let mut children = Box::new([NodeId::EMPTY; 16]);
        let mut branch_value = None;
        self.attach(&mut children, &mut branch_value, &rest.as_slice()[matched..], old);
        self.attach(&mut children, &mut branch_value, &key[matched..], value);

        self.wrap(
            &key[..matched],
            Node::Branch {
                children,
                value: branch_value,
            },
        )
    }

    /// Split an extension whose path diverges from `key` before its end.
    fn split_extension(
        &mut self,
        shared: Nibbles,
        next: NodeId,
        key: &[u8],
        value: Vec<u8>,
    ) -> Node {
        let shared = shared.as_slice();
        let matched = prefix_matched_len(shared, key);

        let mut children = Box::new([NodeId::EMPTY; 16]);
        let mut branch_value = None;

        // the old child, re-anchored below the new branch
        let tail = &shared[matched + 1..];
        children[shared[matched] as usize] = if tail.is_empty() {
            next
        } else {
            self.arena
                .alloc(Node::extension(Nibbles::from_raw(tail.to_vec()), next))
        };
        self.attach(&mut children, &mut branch_value, &key[matched..], value);

        self.wrap(
            &shared[..matched],
            Node::Branch {
                children,
                value: branch_value,
            },
        )
    }

    /// Hang `value` under a branch at `suffix`: in the branch itself when
    /// the suffix is exhausted, otherwise as a leaf in the matching slot.
    fn attach(
        &mut self,
        children: &mut [NodeId; 16],
        branch_value: &mut Option<Vec<u8>>,
        suffix: &[u8],
        value: Vec<u8>,
    ) {
        match suffix.split_first() {
            None => *branch_value = Some(value),
            Some((&nibble, tail)) => {
                let leaf = Node::leaf(Nibbles::from_raw(tail.to_vec()), value);
                children[nibble as usize] = self.arena.alloc(leaf);
            }
        }
    }

    /// Put an extension over `branch` unless the shared prefix is empty.
    fn wrap(&mut self, prefix: &[u8], branch: Node) -> Node {
        if prefix.is_empty() {
            return branch;
        }
        let branch = self.arena.alloc(branch);
        Node::extension(Nibbles::from_raw(prefix.to_vec()), branch)
    }

    fn target(&self, slot: Slot) -> NodeId {
        match slot {
            Slot::Root => self.root,
            Slot::Child { branch, index } => match self.arena.get(branch) {
                Node::Branch { children, .. } => children[index as usize],
                other => unreachable!("slot parent {branch} is a {}, not a branch", other.kind()),
            },
            Slot::Next { extension } => match self.arena.get(extension) {
                Node::Extension { next, .. } => *next,
                other => unreachable!("slot parent {extension} is a {}, not an extension", other.kind()),
            },
        }
    }

    /// Store `node` at `slot`: in place if the slot already owns a node,
    /// otherwise as a new arena entry linked from the parent.
    fn install(&mut self, slot: Slot, node: Node) {
        let current = self.target(slot);
        if !current.is_empty() {
            self.arena.replace(current, node);
            return;
        }

        let id = self.arena.alloc(node);
        match slot {
            Slot::Root => self.root = id,
            Slot::Child { branch, index } => match self.arena.get_mut(branch) {
                Node::Branch { children, .. } => children[index as usize] = id,
                other => unreachable!("slot parent {branch} is a {}, not a branch", other.kind()),
            },
            Slot::Next { extension } => match self.arena.get_mut(extension) {
                Node::Extension { next, .. } => *next = id,
                other => unreachable!("slot parent {extension} is a {}, not an extension", other.kind()),
            },
        }
    }
}

impl KeyValueTrie for Trie {
    fn get(&self, key: &[u8]) -> Option<&[u8]> {
        Trie::get(self, key)
    }

    fn put(&mut self, key: &[u8], value: Vec<u8>) {
        Trie::put(self, key, value)
    }

    fn delete(&mut self, _key: &[u8]) -> Result<bool> {
        Err(TrieError::Unsupported("delete"))
    }
}

/// Trie key for position `index`: its RLP encoding as an unsigned integer.
pub fn index_key(index: usize) -> Vec<u8> {
    alloy_rlp::encode(index as u64)
}

/// Root of a trie keyed by position, see [`Trie::from_ordered`].
pub fn ordered_root<I, V>(values: I) -> B256
where
    I: IntoIterator<Item = V>,
    V: Into<Vec<u8>>,
{
    Trie::from_ordered(values).hash()
}
