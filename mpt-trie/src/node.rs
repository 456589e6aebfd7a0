//! # MPT Node Types
//!
//! The trie has four node kinds:
//! 1. Empty - the absence of a node
//! 2. Leaf - the tail of a key plus its value
//! 3. Extension - a shared path prefix over a single child
//! 4. Branch - 16-way branch point + optional value
//!
//! Nodes live in a [`NodeArena`] and refer to their children by [`NodeId`].
//! Slot 0 of every arena is the Empty node, so an empty child is simply
//! [`NodeId::EMPTY`].

use alloy_primitives::{b256, keccak256, B256};
use std::fmt;

use crate::codec::{RlpItem, EMBED_THRESHOLD};
use crate::nibbles::Nibbles;

/// Empty trie root hash (keccak256(RLP("")))
pub const EMPTY_ROOT: B256 =
    b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");

/// Stable index of a node inside its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(u32);

impl NodeId {
    /// The shared Empty node.
    pub const EMPTY: NodeId = NodeId(0);

    pub fn is_empty(self) -> bool {
        self == NodeId::EMPTY
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// MPT node types
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Node {
    /// Empty node (null)
    #[default]
    Empty,

    /// Leaf node: [encoded_path, value]
    Leaf { rest: Nibbles, value: Vec<u8> },

    /// Extension node: [encoded_path, child]
    Extension { shared: Nibbles, next: NodeId },

    /// Branch node: [child0, child1, ..., child15, value]
    Branch {
        children: Box<[NodeId; 16]>,
        value: Option<Vec<u8>>,
    },
}

/// Node kind, without payload. Used by the diagnostic walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Empty,
    Leaf,
    Extension,
    Branch,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Empty => "EMPTY",
            NodeKind::Leaf => "LEAF",
            NodeKind::Extension => "EXT",
            NodeKind::Branch => "BRANCH",
        };
        f.write_str(name)
    }
}

impl Node {
    /// Create leaf node
    pub fn leaf(rest: Nibbles, value: Vec<u8>) -> Self {
        Node::Leaf { rest, value }
    }

    /// Create extension node
    pub fn extension(shared: Nibbles, next: NodeId) -> Self {
        Node::Extension { shared, next }
    }

    /// Check if node is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Empty => NodeKind::Empty,
            Node::Leaf { .. } => NodeKind::Leaf,
            Node::Extension { .. } => NodeKind::Extension,
            Node::Branch { .. } => NodeKind::Branch,
        }
    }
}

/// Owns every node of one trie.
///
/// Replaced nodes are never reused; they stay unreachable until the arena
/// is dropped.
#[derive(Debug, Clone)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeArena {
    pub fn new() -> Self {
        NodeArena {
            nodes: vec![Node::Empty],
        }
    }

    /// Number of allocated slots, including the Empty sentinel and
    /// unreachable nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Store a new node and return its id. Empty is never stored twice.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        if node.is_empty() {
            return NodeId::EMPTY;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Overwrite a non-empty node in place.
    pub fn replace(&mut self, id: NodeId, node: Node) -> Node {
        debug_assert!(!id.is_empty(), "the empty sentinel is immutable");
        std::mem::replace(&mut self.nodes[id.index()], node)
    }

    /// Mutable access for in-place updates of a non-empty node.
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        debug_assert!(!id.is_empty(), "the empty sentinel is immutable");
        &mut self.nodes[id.index()]
    }

    /// The node's field list before encoding.
    pub fn raw(&self, id: NodeId) -> RlpItem {
        match self.get(id) {
            Node::Empty => RlpItem::empty(),

            Node::Leaf { rest, value } => RlpItem::List(vec![
                RlpItem::Bytes(rest.to_hex_prefix(true)),
                RlpItem::Bytes(value.clone()),
            ]),

            Node::Extension { shared, next } => RlpItem::List(vec![
                RlpItem::Bytes(shared.to_hex_prefix(false)),
                self.child_ref(*next),
            ]),

            Node::Branch { children, value } => {
                let mut items = Vec::with_capacity(17);
                items.extend(children.iter().map(|child| self.child_ref(*child)));
                items.push(value.clone().map_or_else(RlpItem::empty, RlpItem::Bytes));
                RlpItem::List(items)
            }
        }
    }

    /// How a parent refers to `id`: the empty string for an empty slot,
    /// the raw fields when the encoding is short, otherwise the hash.
    pub fn child_ref(&self, id: NodeId) -> RlpItem {
        if id.is_empty() {
            return RlpItem::empty();
        }

        let raw = self.raw(id);
        let encoded = raw.encode_to_vec();
        if encoded.len() < EMBED_THRESHOLD {
            raw
        } else {
            RlpItem::Bytes(keccak256(&encoded).to_vec())
        }
    }

    /// RLP encoding of the node
    pub fn serialize(&self, id: NodeId) -> Vec<u8> {
        self.raw(id).encode_to_vec()
    }

    /// Keccak-256 of the encoding; Empty hashes to [`EMPTY_ROOT`].
    pub fn hash(&self, id: NodeId) -> B256 {
        if id.is_empty() {
            return EMPTY_ROOT;
        }
        keccak256(self.serialize(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::EMPTY_STRING;

    #[test]
    fn test_empty_node() {
        let arena = NodeArena::new();
        assert!(arena.get(NodeId::EMPTY).is_empty());
        assert_eq!(arena.serialize(NodeId::EMPTY), EMPTY_STRING.to_vec());
        assert_eq!(arena.hash(NodeId::EMPTY), EMPTY_ROOT);
        assert_eq!(keccak256(EMPTY_STRING), EMPTY_ROOT);
    }

    #[test]
    fn test_leaf_node() {
        let mut arena = NodeArena::new();
        let id = arena.alloc(Node::leaf(Nibbles::from_raw(vec![1, 2, 3]), b"hello".to_vec()));

        assert_eq!(hex::encode(arena.serialize(id)), "c98231238568656c6c6f");
        assert_eq!(arena.hash(id), keccak256(arena.serialize(id)));
        // short leaves are embedded as their raw fields
        assert_eq!(arena.child_ref(id), arena.raw(id));
    }

    #[test]
    fn test_branch_hashes_large_children() {
        let mut arena = NodeArena::new();
        let big = arena.alloc(Node::leaf(Nibbles::from_raw(vec![1]), vec![0xaa; 40]));
        let small = arena.alloc(Node::leaf(Nibbles::new(), b"x".to_vec()));

        let mut children = Box::new([NodeId::EMPTY; 16]);
        children[0] = big;
        children[5] = small;
        let id = arena.alloc(Node::Branch {
            children,
            value: Some(b"value".to_vec()),
        });

        let raw = arena.raw(id);
        let items = raw.as_list().unwrap();
        assert_eq!(items.len(), 17);
        assert_eq!(items[0], RlpItem::Bytes(arena.hash(big).to_vec()));
        assert_eq!(items[5], arena.raw(small));
        assert!(items[1].is_empty_string());
        assert_eq!(items[16], RlpItem::Bytes(b"value".to_vec()));
    }

    #[test]
    fn test_extension_node() {
        let mut arena = NodeArena::new();
        let child = arena.alloc(Node::leaf(Nibbles::from_raw(vec![5]), vec![0xbb; 40]));
        let id = arena.alloc(Node::extension(Nibbles::from_raw(vec![1, 2, 3, 4]), child));

        let raw = arena.raw(id);
        let items = raw.as_list().unwrap();
        assert_eq!(items[0], RlpItem::Bytes(vec![0x00, 0x12, 0x34]));
        assert_eq!(items[1], RlpItem::Bytes(arena.hash(child).to_vec()));
    }

    #[test]
    fn test_alloc_and_replace() {
        let mut arena = NodeArena::new();
        assert!(arena.is_empty());
        assert_eq!(arena.alloc(Node::Empty), NodeId::EMPTY);

        let id = arena.alloc(Node::leaf(Nibbles::new(), vec![1]));
        assert_eq!(arena.len(), 2);
        let old = arena.replace(id, Node::extension(Nibbles::from_raw(vec![1]), NodeId::EMPTY));
        assert_eq!(old.kind(), NodeKind::Leaf);
        assert_eq!(arena.get(id).kind(), NodeKind::Extension);
    }
}
