//! Wire encoding for the proof data model, per §4.7/§8 invariant 3.
//!
//! The in-memory types in [`crate::proof`] have no room for "missing" -- a `ProofNode` is
//! either fully present or doesn't exist. The wire format does, because it is designed to
//! interoperate with decoders that model every submessage as an optional pointer. Each `Wire*`
//! type here mirrors that: fields that the in-memory model requires unconditionally are still
//! `Option` on the wire, and a bare decode of a missing one reports which submessage was nil
//! (`ErrNilProof`, `ErrNilProofNode`, ...) rather than a generic parse failure.
//!
//! Decoding is always `TryFrom<WireX> for X`; encoding is always `From<&X> for WireX`, so the
//! pair round-trips losslessly.

use crate::error::ProofError;
use crate::hasher::Digest;
use crate::maybe::Maybe;
use crate::nibble::{NibblePath, SerializedPath, BRANCHING_FACTOR};
use crate::proof::{ChangeProof, KeyChange, KeyValue, Proof, ProofNode, ProofValue, RangeProof};

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WireSerializedPath {
    pub packed_bytes: Vec<u8>,
    pub nibble_length: u32,
}

impl From<&NibblePath> for WireSerializedPath {
    fn from(path: &NibblePath) -> Self {
        let serialized = path.serialize();
        WireSerializedPath {
            packed_bytes: serialized.packed_bytes,
            nibble_length: serialized.nibble_length as u32,
        }
    }
}

impl TryFrom<WireSerializedPath> for NibblePath {
    type Error = ProofError;
    fn try_from(wire: WireSerializedPath) -> Result<Self, ProofError> {
        NibblePath::from_serialized(&SerializedPath {
            packed_bytes: wire.packed_bytes,
            nibble_length: wire.nibble_length as usize,
        })
    }
}

/// Wire form of `Optional[bytes]` (§3.1): `present` and `bytes` are carried explicitly so
/// that "absent" and "present, zero-length" stay distinguishable across the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WireMaybeBytes {
    pub present: bool,
    pub bytes: Vec<u8>,
}

impl From<&Maybe<Vec<u8>>> for WireMaybeBytes {
    fn from(maybe: &Maybe<Vec<u8>>) -> Self {
        match maybe {
            Maybe::Some(b) => WireMaybeBytes {
                present: true,
                bytes: b.clone(),
            },
            Maybe::Absent => WireMaybeBytes {
                present: false,
                bytes: Vec::new(),
            },
        }
    }
}

impl TryFrom<WireMaybeBytes> for Maybe<Vec<u8>> {
    type Error = ProofError;
    fn try_from(wire: WireMaybeBytes) -> Result<Self, ProofError> {
        if wire.present {
            Ok(Maybe::Some(wire.bytes))
        } else if wire.bytes.is_empty() {
            Ok(Maybe::Absent)
        } else {
            Err(ProofError::InvalidMaybe)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WireChild {
    pub index: u32,
    pub digest: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WireProofNode {
    pub key_path: Option<WireSerializedPath>,
    pub value_or_hash: Option<WireMaybeBytes>,
    pub children: Vec<WireChild>,
}

impl From<&ProofNode> for WireProofNode {
    fn from(node: &ProofNode) -> Self {
        let mut children = Vec::new();
        for i in 0..BRANCHING_FACTOR {
            if let Some(digest) = node.children[i] {
                children.push(WireChild {
                    index: i as u32,
                    digest: digest.to_vec(),
                });
            }
        }
        WireProofNode {
            key_path: Some(WireSerializedPath::from(&node.key_path)),
            value_or_hash: Some(WireMaybeBytes::from(&node.value_or_hash)),
            children,
        }
    }
}

impl TryFrom<WireProofNode> for ProofNode {
    type Error = ProofError;
    fn try_from(wire: WireProofNode) -> Result<Self, ProofError> {
        let key_path: NibblePath = wire
            .key_path
            .ok_or(ProofError::NilSerializedPath)?
            .try_into()?;
        let value_or_hash: Maybe<Vec<u8>> = wire
            .value_or_hash
            .ok_or(ProofError::NilValueOrHash)?
            .try_into()?;

        let mut children: [Option<Digest>; BRANCHING_FACTOR] = [None; BRANCHING_FACTOR];
        for entry in wire.children {
            if entry.index as usize >= BRANCHING_FACTOR {
                return Err(ProofError::InvalidChildIndex);
            }
            if entry.digest.len() != 32 {
                return Err(ProofError::InvalidHashLen);
            }
            let mut digest = [0u8; 32];
            digest.copy_from_slice(&entry.digest);
            children[entry.index as usize] = Some(digest);
        }

        let node = ProofNode {
            key_path,
            value_or_hash,
            children,
        };
        node.validate()?;
        Ok(node)
    }
}

/// Decode a proof-path entry, reporting a nil entry as `ErrNilProofNode`.
fn decode_path(path: Vec<Option<WireProofNode>>) -> Result<Vec<ProofNode>, ProofError> {
    path.into_iter()
        .map(|entry| entry.ok_or(ProofError::NilProofNode)?.try_into())
        .collect()
}

fn encode_path(path: &[ProofNode]) -> Vec<Option<WireProofNode>> {
    path.iter().map(|n| Some(WireProofNode::from(n))).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WireProof {
    pub key: Vec<u8>,
    pub value: Option<WireMaybeBytes>,
    pub path: Vec<Option<WireProofNode>>,
}

impl From<&Proof> for WireProof {
    fn from(proof: &Proof) -> Self {
        WireProof {
            key: proof.key.clone(),
            value: Some(WireMaybeBytes::from(&proof.value)),
            path: encode_path(&proof.path),
        }
    }
}

impl TryFrom<WireProof> for Proof {
    type Error = ProofError;
    fn try_from(wire: WireProof) -> Result<Self, ProofError> {
        let value: ProofValue = wire.value.ok_or(ProofError::NilValue)?.try_into()?;
        Ok(Proof {
            key: wire.key,
            value,
            path: decode_path(wire.path)?,
        })
    }
}

/// Decode a top-level `WireProof`, reporting a nil message as `ErrNilProof`.
pub fn decode_proof(wire: Option<WireProof>) -> Result<Proof, ProofError> {
    wire.ok_or(ProofError::NilProof)?.try_into()
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WireKeyValue {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl From<&KeyValue> for WireKeyValue {
    fn from(kv: &KeyValue) -> Self {
        WireKeyValue {
            key: kv.key.clone(),
            value: kv.value.clone(),
        }
    }
}

impl From<WireKeyValue> for KeyValue {
    fn from(wire: WireKeyValue) -> Self {
        KeyValue {
            key: wire.key,
            value: wire.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WireRangeProof {
    pub start_proof: Vec<Option<WireProofNode>>,
    pub end_proof: Vec<Option<WireProofNode>>,
    pub key_values: Vec<WireKeyValue>,
}

impl From<&RangeProof> for WireRangeProof {
    fn from(proof: &RangeProof) -> Self {
        WireRangeProof {
            start_proof: encode_path(&proof.start_proof),
            end_proof: encode_path(&proof.end_proof),
            key_values: proof.key_values.iter().map(WireKeyValue::from).collect(),
        }
    }
}

impl TryFrom<WireRangeProof> for RangeProof {
    type Error = ProofError;
    fn try_from(wire: WireRangeProof) -> Result<Self, ProofError> {
        Ok(RangeProof {
            start_proof: decode_path(wire.start_proof)?,
            end_proof: decode_path(wire.end_proof)?,
            key_values: wire.key_values.into_iter().map(KeyValue::from).collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WireKeyChange {
    pub key: Vec<u8>,
    pub value: Option<WireMaybeBytes>,
}

impl From<&KeyChange> for WireKeyChange {
    fn from(change: &KeyChange) -> Self {
        WireKeyChange {
            key: change.key.clone(),
            value: Some(WireMaybeBytes::from(&change.value)),
        }
    }
}

impl TryFrom<WireKeyChange> for KeyChange {
    type Error = ProofError;
    fn try_from(wire: WireKeyChange) -> Result<Self, ProofError> {
        let value: Maybe<Vec<u8>> = wire.value.ok_or(ProofError::NilMaybeBytes)?.try_into()?;
        Ok(KeyChange {
            key: wire.key,
            value,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WireChangeProof {
    pub had_roots_in_history: bool,
    pub start_proof: Vec<Option<WireProofNode>>,
    pub end_proof: Vec<Option<WireProofNode>>,
    pub key_changes: Vec<WireKeyChange>,
}

impl From<&ChangeProof> for WireChangeProof {
    fn from(proof: &ChangeProof) -> Self {
        WireChangeProof {
            had_roots_in_history: proof.had_roots_in_history,
            start_proof: encode_path(&proof.start_proof),
            end_proof: encode_path(&proof.end_proof),
            key_changes: proof.key_changes.iter().map(WireKeyChange::from).collect(),
        }
    }
}

impl TryFrom<WireChangeProof> for ChangeProof {
    type Error = ProofError;
    fn try_from(wire: WireChangeProof) -> Result<Self, ProofError> {
        let key_changes = wire
            .key_changes
            .into_iter()
            .map(KeyChange::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ChangeProof {
            had_roots_in_history: wire.had_roots_in_history,
            start_proof: decode_path(wire.start_proof)?,
            end_proof: decode_path(wire.end_proof)?,
            key_changes,
        })
    }
}

/// Decode a top-level `WireChangeProof`, reporting a nil message as `ErrNilChangeProof`.
pub fn decode_change_proof(wire: Option<WireChangeProof>) -> Result<ChangeProof, ProofError> {
    wire.ok_or(ProofError::NilChangeProof)?.try_into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::{represent_value, Blake3Hasher};

    #[test]
    fn proof_node_round_trips_through_wire() {
        let mut node = ProofNode::new(NibblePath::from_bytes(b"\x01\x02"));
        node.value_or_hash = Maybe::Some(represent_value::<Blake3Hasher>(b"value"));
        node.set_child(3, [9u8; 32]);

        let wire = WireProofNode::from(&node);
        let round_tripped: ProofNode = wire.try_into().unwrap();
        assert_eq!(round_tripped, node);
    }

    #[test]
    fn nil_proof_node_in_path_is_reported() {
        let path = vec![None];
        assert_eq!(decode_path(path), Err(ProofError::NilProofNode));
    }

    #[test]
    fn nil_top_level_proof_is_reported() {
        assert_eq!(decode_proof(None), Err(ProofError::NilProof));
    }

    #[test]
    fn maybe_bytes_present_false_with_bytes_is_invalid() {
        let wire = WireMaybeBytes {
            present: false,
            bytes: vec![1],
        };
        let result: Result<Maybe<Vec<u8>>, ProofError> = wire.try_into();
        assert_eq!(result, Err(ProofError::InvalidMaybe));
    }

    #[test]
    fn child_with_wrong_hash_length_is_rejected() {
        let wire = WireProofNode {
            key_path: Some(WireSerializedPath {
                packed_bytes: vec![],
                nibble_length: 0,
            }),
            value_or_hash: Some(WireMaybeBytes {
                present: false,
                bytes: vec![],
            }),
            children: vec![WireChild {
                index: 0,
                digest: vec![1, 2, 3],
            }],
        };
        let result: Result<ProofNode, ProofError> = wire.try_into();
        assert_eq!(result, Err(ProofError::InvalidHashLen));
    }
}
