//! # Canonical node encoding
//!
//! Nodes are serialized with RLP. A node's pre-encoding form is a tree of
//! byte strings and lists ([`RlpItem`]); embedded children appear as nested
//! lists, hashed children as 32-byte strings.

use alloy_rlp::{BufMut, Encodable, Header, EMPTY_STRING_CODE};

use crate::error::{Result, TrieError};

/// Children whose encoding is shorter than this are embedded in the parent.
pub const EMBED_THRESHOLD: usize = 32;

/// Length of a node hash reference.
pub const HASH_LEN: usize = 32;

/// Serialization of the empty node (RLP of the empty string).
pub const EMPTY_STRING: [u8; 1] = [EMPTY_STRING_CODE];

/// Embedded lists are bounded by the threshold, so real nodes nest a few
/// levels at most.
const MAX_DEPTH: usize = 64;

/// An RLP value: a byte string or a list of values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RlpItem {
    Bytes(Vec<u8>),
    List(Vec<RlpItem>),
}

impl RlpItem {
    /// The empty byte string, used for empty slots and missing values.
    pub fn empty() -> Self {
        RlpItem::Bytes(Vec::new())
    }

    pub fn is_empty_string(&self) -> bool {
        matches!(self, RlpItem::Bytes(b) if b.is_empty())
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RlpItem::Bytes(b) => Some(b),
            RlpItem::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[RlpItem]> {
        match self {
            RlpItem::List(items) => Some(items),
            RlpItem::Bytes(_) => None,
        }
    }

    /// Canonical encoding of this item.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        self.encode(&mut out);
        out
    }

    /// Decode exactly one item; trailing bytes are rejected.
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        let item = Self::decode_item(&mut data, 0)?;
        if !data.is_empty() {
            return Err(TrieError::DecodeFailure(format!(
                "{} trailing bytes after item",
                data.len()
            )));
        }
        Ok(item)
    }

    fn decode_item(buf: &mut &[u8], depth: usize) -> Result<Self> {
        if depth > MAX_DEPTH {
            return Err(TrieError::DecodeFailure("nesting too deep".into()));
        }

        let header = Header::decode(buf)?;
        if buf.len() < header.payload_length {
            return Err(alloy_rlp::Error::InputTooShort.into());
        }
        let (mut payload, rest) = buf.split_at(header.payload_length);
        *buf = rest;

        if !header.list {
            return Ok(RlpItem::Bytes(payload.to_vec()));
        }

        let mut items = Vec::new();
        while !payload.is_empty() {
            items.push(Self::decode_item(&mut payload, depth + 1)?);
        }
        Ok(RlpItem::List(items))
    }

    fn payload_length(items: &[RlpItem]) -> usize {
        items.iter().map(Encodable::length).sum()
    }
}

impl Encodable for RlpItem {
    fn encode(&self, out: &mut dyn BufMut) {
        match self {
            RlpItem::Bytes(bytes) => Encodable::encode(bytes.as_slice(), out),
            RlpItem::List(items) => {
                Header {
                    list: true,
                    payload_length: Self::payload_length(items),
                }
                .encode(out);
                for item in items {
                    item.encode(out);
                }
            }
        }
    }

    fn length(&self) -> usize {
        match self {
            RlpItem::Bytes(bytes) => Encodable::length(bytes.as_slice()),
            RlpItem::List(items) => {
                let payload_length = Self::payload_length(items);
                alloy_rlp::length_of_length(payload_length) + payload_length
            }
        }
    }
}

impl From<Vec<u8>> for RlpItem {
    fn from(bytes: Vec<u8>) -> Self {
        RlpItem::Bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string() {
        assert_eq!(RlpItem::empty().encode_to_vec(), EMPTY_STRING.to_vec());
        assert!(RlpItem::decode(&EMPTY_STRING).unwrap().is_empty_string());
    }

    #[test]
    fn test_single_byte_is_itself() {
        assert_eq!(RlpItem::from(vec![0x01]).encode_to_vec(), vec![0x01]);
        assert_eq!(RlpItem::from(vec![0x80]).encode_to_vec(), vec![0x81, 0x80]);
    }

    #[test]
    fn test_leaf_shape() {
        // [hp([1,2,3], leaf), "hello"]
        let item = RlpItem::List(vec![vec![0x31, 0x23].into(), b"hello".to_vec().into()]);
        let encoded = item.encode_to_vec();
        assert_eq!(hex::encode(&encoded), "c98231238568656c6c6f");
        assert_eq!(encoded.len(), item.length());
        assert_eq!(RlpItem::decode(&encoded).unwrap(), item);
    }

    #[test]
    fn test_long_list() {
        let item = RlpItem::List(vec![RlpItem::from(vec![0xaa; 32]); 17]);
        let encoded = item.encode_to_vec();
        // 17 * 33 payload bytes needs a two-byte length
        assert_eq!(&encoded[..3], &[0xf9, 0x02, 0x31]);
        assert_eq!(RlpItem::decode(&encoded).unwrap(), item);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        // truncated string
        assert!(RlpItem::decode(&[0x83, 0x01]).is_err());
        // non-canonical single byte
        assert!(RlpItem::decode(&[0x81, 0x01]).is_err());
        // trailing bytes
        assert!(RlpItem::decode(&[0x80, 0x80]).is_err());
        // list shorter than its header
        assert!(RlpItem::decode(&[0xc3, 0x80]).is_err());
        assert!(RlpItem::decode(&[]).is_err());
    }

    #[test]
    fn test_decode_rejects_deep_nesting() {
        let nest = |levels: usize| {
            let mut item = RlpItem::empty();
            for _ in 0..levels {
                item = RlpItem::List(vec![item]);
            }
            item.encode_to_vec()
        };

        assert!(RlpItem::decode(&nest(8)).is_ok());
        assert!(RlpItem::decode(&nest(100)).is_err());
    }
}
