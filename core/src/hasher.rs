//! Content digests over proof nodes and values, per §4.2.
//!
//! The inline-vs-hash decision for a value happens exactly once, when a node's
//! `value_or_hash` field is first derived from a raw value (see [`represent_value`]).
//! From then on `value_or_hash` already holds its final on-the-wire bytes -- either the raw
//! value or a digest -- and hashing a node never re-derives that choice; it only tags and
//! copies whatever is already there (see [`encode_value_or_hash`]). Only `Proof::verify`'s
//! comparison against a freshly supplied claimed value (§4.4 step 4) needs to repeat the
//! decision, which is why [`value_representation_matches`] takes the raw claimed bytes.

use crate::nibble::BRANCHING_FACTOR;
use crate::proof::ProofNode;

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

/// A fixed-width cryptographic digest.
pub type Digest = [u8; 32];

/// The digest committed to by the empty trie. No real node hashes to this value because
/// every real node encoding begins with a non-zero length-prefix byte.
pub const EMPTY_TRIE_ROOT: Digest = [0u8; 32];

/// Values longer than this are stored in `value_or_hash` as their digest; shorter values are
/// inlined directly. This is a protocol constant: encoder and decoder must agree on it, and
/// changing it is a wire-breaking change (§9).
pub const INLINE_VALUE_THRESHOLD: usize = 128;

/// Render a digest as lowercase hex, for logging and error messages.
pub fn format_digest(digest: &Digest) -> String {
    hex::encode(digest)
}

/// Computes digests of trie nodes and values.
///
/// Implementations must be pure functions of their input: no two distinct inputs may collide
/// under correct use, and the same input must always produce the same digest.
pub trait NodeHasher {
    /// Hash a value. Used both to derive a long value's `value_or_hash` representation
    /// (§4.2) and to re-derive it when matching a claimed value against a proof (§4.4).
    fn hash_value(value: &[u8]) -> Digest;

    /// Hash a proof node, over its `key_path`, each present child digest paired with its
    /// nibble index in ascending order, and its `value_or_hash` (with the absent/present tag).
    fn hash_node(node: &ProofNode) -> Digest;
}

/// Derive the `value_or_hash` representation of a raw value: inlined if it fits within
/// [`INLINE_VALUE_THRESHOLD`], hashed otherwise. Called once, by whoever first builds a node
/// from a value (the trie builder, or the range/change proof fragment reconstruction).
pub fn represent_value<H: NodeHasher>(value: &[u8]) -> Vec<u8> {
    if value.len() <= INLINE_VALUE_THRESHOLD {
        value.to_vec()
    } else {
        H::hash_value(value).to_vec()
    }
}

/// True iff `claimed_value`'s representation (inlined or hashed, per [`represent_value`])
/// equals the already-final bytes stored in a node's `value_or_hash`.
pub fn value_representation_matches<H: NodeHasher>(claimed_value: &[u8], stored: &[u8]) -> bool {
    if claimed_value.len() <= INLINE_VALUE_THRESHOLD {
        stored == claimed_value
    } else {
        stored == H::hash_value(claimed_value)
    }
}

/// Encode an already-final `value_or_hash` (tag plus bytes) into `out`. Does not make any
/// inline-vs-hash decision; `value` must already be in its final on-the-wire form.
fn encode_value_or_hash(value: Option<&[u8]>, out: &mut Vec<u8>) {
    match value {
        None => out.push(0),
        Some(v) => {
            out.push(1);
            out.extend_from_slice(&(v.len() as u32).to_le_bytes());
            out.extend_from_slice(v);
        }
    }
}

/// Canonical byte encoding of a [`ProofNode`] for hashing, ascending over `key_path`, then
/// children in ascending nibble-index order, then `value_or_hash`. Shared so every
/// [`NodeHasher`] hashes an identical preimage.
pub fn canonical_node_bytes(node: &ProofNode) -> Vec<u8> {
    let mut buf = Vec::new();
    let serialized = node.key_path.serialize();
    buf.extend_from_slice(&(serialized.nibble_length as u32).to_le_bytes());
    buf.extend_from_slice(&serialized.packed_bytes);

    let mut child_count: u8 = 0;
    for i in 0..BRANCHING_FACTOR as u8 {
        if node.children[i as usize].is_some() {
            child_count += 1;
        }
    }
    buf.push(child_count);
    for i in 0..BRANCHING_FACTOR as u8 {
        if let Some(child) = node.children[i as usize] {
            buf.push(i);
            buf.extend_from_slice(&child);
        }
    }

    encode_value_or_hash(node.value_or_hash.as_deref(), &mut buf);
    buf
}

#[cfg(feature = "blake3-hasher")]
pub struct Blake3Hasher;

#[cfg(feature = "blake3-hasher")]
impl NodeHasher for Blake3Hasher {
    fn hash_value(value: &[u8]) -> Digest {
        *blake3::hash(value).as_bytes()
    }

    fn hash_node(node: &ProofNode) -> Digest {
        let bytes = canonical_node_bytes(node);
        *blake3::hash(&bytes).as_bytes()
    }
}

#[cfg(feature = "sha2-hasher")]
pub struct Sha256Hasher;

#[cfg(feature = "sha2-hasher")]
impl NodeHasher for Sha256Hasher {
    fn hash_value(value: &[u8]) -> Digest {
        use sha2::Digest as _;
        let mut hasher = sha2::Sha256::new();
        hasher.update(value);
        hasher.finalize().into()
    }

    fn hash_node(node: &ProofNode) -> Digest {
        use sha2::Digest as _;
        let bytes = canonical_node_bytes(node);
        let mut hasher = sha2::Sha256::new();
        hasher.update(&bytes);
        hasher.finalize().into()
    }
}

#[cfg(all(test, feature = "blake3-hasher"))]
mod tests {
    use super::*;
    use crate::maybe::Maybe;
    use crate::nibble::NibblePath;

    #[test]
    fn hash_is_deterministic() {
        let mut node = ProofNode::new(NibblePath::from_bytes(b"key1"));
        node.value_or_hash = Maybe::Some(represent_value::<Blake3Hasher>(b"value1"));
        let a = Blake3Hasher::hash_node(&node);
        let b = Blake3Hasher::hash_node(&node);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_values_hash_differently() {
        let mut a = ProofNode::new(NibblePath::from_bytes(b"key1"));
        a.value_or_hash = Maybe::Some(represent_value::<Blake3Hasher>(b"value1"));
        let mut b = a.clone();
        b.value_or_hash = Maybe::Some(represent_value::<Blake3Hasher>(b"value2"));
        assert_ne!(Blake3Hasher::hash_node(&a), Blake3Hasher::hash_node(&b));
    }

    #[test]
    fn long_value_is_represented_as_digest() {
        let long = vec![7u8; INLINE_VALUE_THRESHOLD + 1];
        let short = vec![7u8; INLINE_VALUE_THRESHOLD];
        assert_eq!(
            represent_value::<Blake3Hasher>(&long).len(),
            32
        );
        assert_eq!(represent_value::<Blake3Hasher>(&short).len(), short.len());
    }

    #[test]
    fn value_representation_matches_both_inline_and_hashed() {
        let short = b"hi".to_vec();
        let stored_short = represent_value::<Blake3Hasher>(&short);
        assert!(value_representation_matches::<Blake3Hasher>(
            &short,
            &stored_short
        ));

        let long = vec![9u8; INLINE_VALUE_THRESHOLD + 10];
        let stored_long = represent_value::<Blake3Hasher>(&long);
        assert!(value_representation_matches::<Blake3Hasher>(
            &long,
            &stored_long
        ));
        assert!(!value_representation_matches::<Blake3Hasher>(
            &short,
            &stored_long
        ));
    }
}
