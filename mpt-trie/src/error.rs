//! # Error types for MPT

use thiserror::Error;

/// MPT error types.
///
/// A key that is simply absent is not an error: `Trie::prove` reports it
/// as `false` and `verify` as `Ok(None)`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrieError {
    /// The proof has no node for the digest the traversal needs next,
    /// or the node stored under that digest does not hash to it.
    #[error("proof incomplete: no node for hash {hash}")]
    ProofIncomplete { hash: String },

    /// A proof entry is not a well-formed node encoding.
    #[error("proof node decode failure: {0}")]
    DecodeFailure(String),

    /// The operation is declared but not implemented by this trie.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl From<alloy_rlp::Error> for TrieError {
    fn from(err: alloy_rlp::Error) -> Self {
        TrieError::DecodeFailure(err.to_string())
    }
}

/// Result type for trie operations
pub type Result<T> = std::result::Result<T, TrieError>;
