//! # Merkle Patricia Trie
//!
//! Implementation of Ethereum's Modified Merkle Patricia Trie.
//!
//! This data structure is used for:
//! - State storage (accounts -> account data)
//! - Transaction tries
//! - Receipt tries
//!
//! Key features:
//! - Cryptographic commitment to the whole key/value set in one 32-byte root
//! - Proofs of inclusion/exclusion, checkable without the trie
//! - Roots identical to Ethereum's (RLP encoding, Keccak-256, 32-byte embedding)
//!
//! ```
//! use mpt_trie::{verify, Trie};
//!
//! let mut trie = Trie::new();
//! trie.put(b"dog", b"puppy".to_vec());
//!
//! let (proof, found) = trie.prove(b"dog");
//! assert!(found);
//! assert_eq!(verify(trie.hash(), b"dog", &proof).unwrap(), Some(b"puppy".to_vec()));
//! ```

pub mod codec;
pub mod error;
pub mod nibbles;
pub mod node;
pub mod proof;
pub mod trie;
pub mod walk;

pub use alloy_primitives::B256;
pub use codec::{RlpItem, EMBED_THRESHOLD};
pub use error::{Result, TrieError};
pub use nibbles::Nibbles;
pub use node::{Node, NodeArena, NodeId, NodeKind, EMPTY_ROOT};
pub use proof::{verify, Proof};
pub use trie::{index_key, ordered_root, KeyValueTrie, Trie};
pub use walk::{render, Walk, WalkEntry};
