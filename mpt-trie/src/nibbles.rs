//! # Nibbles
//!
//! Keys in the trie are walked as nibbles (half-bytes / 4 bits), so every
//! branch point fans out to 16 children.
//!
//! Paths stored in leaves and extensions are written in hex-prefix form:
//! a flag nibble (odd length, leaf kind) is prepended so the path packs
//! into whole bytes and the two node kinds stay distinguishable.

use std::fmt;

use crate::error::{Result, TrieError};

/// Hex-prefix flag added to the first nibble of a leaf path.
const LEAF_FLAG: u8 = 2;

/// Hex-prefix flag set when the path has an odd number of nibbles.
const ODD_FLAG: u8 = 1;

/// A sequence of nibbles (4-bit values)
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Nibbles {
    data: Vec<u8>,
}

impl Nibbles {
    /// Create empty nibbles
    pub fn new() -> Self {
        Nibbles { data: Vec::new() }
    }

    /// Create from bytes (each byte becomes 2 nibbles, high nibble first)
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut data = Vec::with_capacity(bytes.len() * 2);
        for byte in bytes {
            data.push(byte >> 4);
            data.push(byte & 0x0f);
        }
        Nibbles { data }
    }

    /// Create from raw nibbles
    pub fn from_raw(nibbles: Vec<u8>) -> Self {
        debug_assert!(nibbles.iter().all(|n| *n < 16));
        Nibbles { data: nibbles }
    }

    /// Decode a hex-prefix encoded path.
    ///
    /// Returns the path and whether the flag marks it as a leaf path.
    pub fn from_hex_prefix(encoded: &[u8]) -> Result<(Self, bool)> {
        let (&first, rest) = encoded
            .split_first()
            .ok_or_else(|| TrieError::DecodeFailure("empty hex-prefix path".into()))?;

        let flag = first >> 4;
        if flag > LEAF_FLAG + ODD_FLAG {
            return Err(TrieError::DecodeFailure(format!(
                "invalid hex-prefix flag {flag:#x}"
            )));
        }
        let is_leaf = flag & LEAF_FLAG != 0;
        let odd = flag & ODD_FLAG != 0;

        let mut data = Vec::with_capacity(rest.len() * 2 + 1);
        if odd {
            data.push(first & 0x0f);
        } else if first & 0x0f != 0 {
            return Err(TrieError::DecodeFailure(
                "non-zero padding in even hex-prefix path".into(),
            ));
        }
        for byte in rest {
            data.push(byte >> 4);
            data.push(byte & 0x0f);
        }

        Ok((Nibbles { data }, is_leaf))
    }

    /// Hex-prefix the path, still in nibble form.
    ///
    /// Odd paths get a single flag nibble, even paths get the flag nibble
    /// plus a zero pad, so the result always has even length.
    pub fn to_prefixed(&self, is_leaf: bool) -> Self {
        let kind = if is_leaf { LEAF_FLAG } else { 0 };

        let mut data = Vec::with_capacity(self.len() + 2);
        if self.len() % 2 == 1 {
            data.push(kind + ODD_FLAG);
        } else {
            data.push(kind);
            data.push(0);
        }
        data.extend_from_slice(&self.data);

        Nibbles { data }
    }

    /// Encode to hex prefix format (packed bytes)
    pub fn to_hex_prefix(&self, is_leaf: bool) -> Vec<u8> {
        self.to_prefixed(is_leaf).to_bytes()
    }

    /// Convert back to bytes (each 2 nibbles -> 1 byte).
    ///
    /// The length must be even; a trailing odd nibble is dropped.
    pub fn to_bytes(&self) -> Vec<u8> {
        debug_assert!(
            self.data.len() % 2 == 0,
            "cannot pack an odd number of nibbles"
        );

        self.data
            .chunks_exact(2)
            .map(|pair| pair[0] << 4 | pair[1])
            .collect()
    }

    /// Get length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append another nibble sequence
    pub fn extend(&mut self, other: &Nibbles) {
        self.data.extend_from_slice(&other.data);
    }

    /// Push a single nibble
    pub fn push(&mut self, nibble: u8) {
        debug_assert!(nibble < 16);
        self.data.push(nibble);
    }

    /// Get as slice
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

/// Count the positions at which `a` and `b` agree before the first mismatch.
pub fn prefix_matched_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

impl fmt::Debug for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nibbles({self})")
    }
}

impl fmt::Display for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for n in &self.data {
            write!(f, "{:x}", n)?;
        }
        Ok(())
    }
}
