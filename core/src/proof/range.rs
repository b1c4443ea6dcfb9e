//! Range proofs: every key/value pair in a contiguous interval, per §3.5/§4.5.

use crate::error::ProofError;
use crate::hasher::{Digest, NodeHasher};
use crate::nibble::NibblePath;
use crate::proof::fragment::Fragment;
use crate::proof::path_sanity::verify_proof_path;
use crate::proof::ProofNode;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// One key/value pair returned by a range proof.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyValue {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// A proof that `[start, end]` contains exactly `key_values` under some root.
///
/// No `borsh`/`serde` derives here: [`crate::codec::WireRangeProof`] is the on-wire mirror of
/// this type, since its nested `ProofNode` fields carry no such derives of their own.
#[derive(Debug, Clone)]
pub struct RangeProof {
    /// Nodes from the root to the first key >= `start`; empty when `start` is absent.
    pub start_proof: Vec<ProofNode>,
    /// Nodes from the root to the last key <= `end`.
    pub end_proof: Vec<ProofNode>,
    pub key_values: Vec<KeyValue>,
}

impl RangeProof {
    /// Verify this proof authenticates exactly `key_values` within `[start, end]` under
    /// `expected_root`, per §4.5.
    pub fn verify<H: NodeHasher>(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        expected_root: Digest,
    ) -> Result<(), ProofError> {
        // Step 1: bounds.
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ProofError::StartAfterEnd);
            }
        }

        // Step 2: empty-proof special case.
        let proof_is_empty =
            self.start_proof.is_empty() && self.end_proof.is_empty() && self.key_values.is_empty();
        if proof_is_empty && start.is_some() && end.is_none() {
            return Err(ProofError::NoMerkleProof);
        }

        // Step 3: whole-trie special case. An unbounded request with no key_values is either
        // "the trie is empty" (end_proof empty too, verified below via the sentinel root) or
        // "here is the root node itself, nothing enumerated" (end_proof is exactly that node).
        // Any other end_proof shape under an unbounded, content-free request is malformed.
        let whole_trie = start.is_none() && end.is_none() && self.key_values.is_empty();
        if whole_trie {
            if self.end_proof.len() > 1 {
                return Err(ProofError::ShouldJustBeRoot);
            }
        } else if self.end_proof.is_empty() && !proof_is_empty {
            // Step 4: content exists, so an end proof is required.
            return Err(ProofError::NoEndProof);
        }

        for node in self.start_proof.iter().chain(self.end_proof.iter()) {
            node.validate()?;
        }

        // Step 5: key-values sanity.
        verify_key_values(&self.key_values, start, end)?;

        // Step 6: proof-path sanity.
        if let Some(s) = start {
            verify_proof_path(&self.start_proof, &NibblePath::from_bytes(s))?;
        }
        let effective_end = end
            .map(|e| e.to_vec())
            .or_else(|| self.key_values.last().map(|kv| kv.key.clone()))
            .unwrap_or_default();
        if !self.end_proof.is_empty() {
            verify_proof_path(&self.end_proof, &NibblePath::from_bytes(&effective_end))?;
        }

        // Steps 7-8: reconstruct the minimal trie fragment and recompute the root.
        let root = reconstruct_and_hash::<H>(
            &self.start_proof,
            &self.end_proof,
            &self.key_values,
            start,
            end,
        )?;

        if root != expected_root {
            return Err(ProofError::InvalidProof);
        }
        Ok(())
    }
}

/// §4.5 step 5: keys strictly increasing and within `[start, end]`.
fn verify_key_values(
    key_values: &[KeyValue],
    start: Option<&[u8]>,
    end: Option<&[u8]>,
) -> Result<(), ProofError> {
    for pair in key_values.windows(2) {
        if pair[0].key >= pair[1].key {
            return Err(ProofError::NonIncreasingValues);
        }
    }
    if let Some(first) = key_values.first() {
        if let Some(s) = start {
            if first.key.as_slice() < s {
                return Err(ProofError::StateFromOutsideOfRange);
            }
        }
    }
    if let Some(last) = key_values.last() {
        if let Some(e) = end {
            if last.key.as_slice() > e {
                return Err(ProofError::StateFromOutsideOfRange);
            }
        }
    }
    Ok(())
}

/// Build the minimal trie fragment implied by `start_proof`, `end_proof`, and `key_values`,
/// then hash it bottom-up, per §4.5 steps 7-8.
fn reconstruct_and_hash<H: NodeHasher>(
    start_proof: &[ProofNode],
    end_proof: &[ProofNode],
    key_values: &[KeyValue],
    start: Option<&[u8]>,
    end: Option<&[u8]>,
) -> Result<Digest, ProofError> {
    let mut fragment = Fragment::new();

    for node in start_proof.iter().chain(end_proof.iter()) {
        fragment.merge_proof_node(node)?;
    }

    // The endpoints authenticate a real leaf's value directly in the proof path; confirm it
    // was not silently dropped from `key_values` (§4.5 "Key-values sanity").
    check_terminal_value_included(start_proof, key_values, start, true)?;
    check_terminal_value_included(end_proof, key_values, end, false)?;

    for kv in key_values {
        fragment.merge_leaf::<H>(NibblePath::from_bytes(&kv.key), &kv.value)?;
    }

    fragment.hash_root::<H>()
}

/// Confirm that a fringe proof's terminal node, if it carries a real value, has that value
/// reflected in `key_values` (§4.5, `ErrProofNodeHasUnincludedValue`).
fn check_terminal_value_included(
    fringe: &[ProofNode],
    key_values: &[KeyValue],
    bound: Option<&[u8]>,
    is_start: bool,
) -> Result<(), ProofError> {
    let Some(terminal) = fringe.last() else {
        return Ok(());
    };
    if terminal.value_or_hash.is_absent() {
        return Ok(());
    }
    // Only a node whose path is a full key (even nibble length) can be a genuine leaf value.
    if terminal.key_path.length() % 2 != 0 {
        return Ok(());
    }
    let candidate = if is_start {
        key_values.first()
    } else {
        key_values.last()
    };
    let expected_key = bound.map(|b| b.to_vec()).or_else(|| candidate.map(|kv| kv.key.clone()));
    let Some(expected_key) = expected_key else {
        return Ok(());
    };
    if NibblePath::from_bytes(&expected_key) != terminal.key_path {
        // The terminal node isn't the inclusion node for this bound; nothing to check here.
        return Ok(());
    }
    match candidate {
        // The value bytes themselves are checked by reconstruction; here we only guard
        // against this leaf being silently dropped from `key_values`.
        Some(kv) if kv.key == expected_key => Ok(()),
        _ => Err(ProofError::ProofNodeHasUnincludedValue),
    }
}
