//! Change proofs: every key that changed between two roots over a key interval, per §3.6/§4.6.

use crate::error::ProofError;
use crate::hasher::{Digest, NodeHasher};
use crate::maybe::Maybe;
use crate::nibble::NibblePath;
use crate::proof::fragment::Fragment;
use crate::proof::path_sanity::verify_proof_path;
use crate::proof::ProofNode;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// A single key's value transition within a change proof. `value` is `Absent` when the key
/// was deleted between the two roots (§3.1's present/absent distinction applied to diffs).
///
/// No `borsh`/`serde` derives here: [`crate::codec::WireKeyChange`] is the on-wire mirror of
/// this type, since its `Maybe` field carries no such derives of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChange {
    pub key: Vec<u8>,
    pub value: Maybe<Vec<u8>>,
}

/// A proof that, within `[start, end]`, exactly `key_changes` happened between a prior root
/// (tracked by history, not named here) and `end_root`.
///
/// No `borsh`/`serde` derives here: [`crate::codec::WireChangeProof`] is the on-wire mirror of
/// this type, since its nested `ProofNode`/`KeyChange` fields carry no such derives of their
/// own.
#[derive(Debug, Clone)]
pub struct ChangeProof {
    /// Whether the verifier's own history still contains a root this proof can be checked
    /// against. When `false`, the proof carries no data and verification trivially succeeds,
    /// signalling the caller to fall back to a full range sync instead (§4.6 step 2).
    pub had_roots_in_history: bool,
    /// Nodes in `end_root`'s trie from the root to the first changed key >= `start`.
    pub start_proof: Vec<ProofNode>,
    /// Nodes in `end_root`'s trie from the root to the last changed key <= `end`.
    pub end_proof: Vec<ProofNode>,
    pub key_changes: Vec<KeyChange>,
}

impl ChangeProof {
    /// Verify this proof authenticates exactly `key_changes` within `[start, end]`, resulting
    /// in `end_root`, per §4.6. Performs no mutation of any local state; applying the verified
    /// diff to a follower database is a separate, outer-crate concern (§6.1).
    pub fn verify<H: NodeHasher>(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        end_root: Digest,
    ) -> Result<(), ProofError> {
        // Step 1: bounds.
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ProofError::StartAfterEnd);
            }
        }

        let proof_is_empty =
            self.start_proof.is_empty() && self.end_proof.is_empty() && self.key_changes.is_empty();

        // Step 2: no usable history on the verifier's side.
        if !self.had_roots_in_history {
            if !proof_is_empty {
                return Err(ProofError::DataInMissingRootProof);
            }
            return Ok(());
        }

        // Step 3: history is usable, but the proof carries nothing at all.
        if proof_is_empty {
            return Err(ProofError::NoMerkleProof);
        }

        for node in self.start_proof.iter().chain(self.end_proof.iter()) {
            node.validate()?;
        }

        // Step 4: key-changes sanity.
        verify_key_changes(&self.key_changes, start, end)?;

        // Step 5: bounds must be backed by a matching fringe proof.
        if start.is_some() && self.start_proof.is_empty() {
            return Err(ProofError::NoStartProof);
        }
        if end.is_some() && self.end_proof.is_empty() {
            return Err(ProofError::NoEndProof);
        }

        // Step 6: proof-path sanity.
        if let Some(s) = start {
            verify_proof_path(&self.start_proof, &NibblePath::from_bytes(s))?;
        }
        let effective_end = end
            .map(|e| e.to_vec())
            .or_else(|| self.key_changes.last().map(|c| c.key.clone()))
            .unwrap_or_default();
        if !self.end_proof.is_empty() {
            verify_proof_path(&self.end_proof, &NibblePath::from_bytes(&effective_end))?;
        }

        // Steps 7-8: reconstruct the resulting trie fragment and recompute its root.
        let root = reconstruct_and_hash::<H>(&self.start_proof, &self.end_proof, &self.key_changes)?;
        if root != end_root {
            return Err(ProofError::InvalidProof);
        }
        Ok(())
    }
}

/// §4.6 step 4: changed keys strictly increasing and within `[start, end]`.
fn verify_key_changes(
    key_changes: &[KeyChange],
    start: Option<&[u8]>,
    end: Option<&[u8]>,
) -> Result<(), ProofError> {
    for pair in key_changes.windows(2) {
        if pair[0].key >= pair[1].key {
            return Err(ProofError::NonIncreasingValues);
        }
    }
    if let Some(first) = key_changes.first() {
        if let Some(s) = start {
            if first.key.as_slice() < s {
                return Err(ProofError::StateFromOutsideOfRange);
            }
        }
    }
    if let Some(last) = key_changes.last() {
        if let Some(e) = end {
            if last.key.as_slice() > e {
                return Err(ProofError::StateFromOutsideOfRange);
            }
        }
    }
    Ok(())
}

/// Build the post-change trie fragment: fringe proof nodes plus every key that still has a
/// value after the change (deletions contribute no leaf), then hash it bottom-up.
fn reconstruct_and_hash<H: NodeHasher>(
    start_proof: &[ProofNode],
    end_proof: &[ProofNode],
    key_changes: &[KeyChange],
) -> Result<Digest, ProofError> {
    let mut fragment = Fragment::new();

    for node in start_proof.iter().chain(end_proof.iter()) {
        fragment.merge_proof_node(node)?;
    }

    for change in key_changes {
        match &change.value {
            Maybe::Some(value) => {
                fragment.merge_leaf::<H>(NibblePath::from_bytes(&change.key), value)?;
            }
            Maybe::Absent => {
                // A deletion: the resulting trie must have no leaf at this path. If a fringe
                // node still claims one, the proof is internally inconsistent.
                let path = NibblePath::from_bytes(&change.key);
                if fragment.contains(&path) {
                    return Err(ProofError::InvalidProof);
                }
            }
        }
    }

    fragment.hash_root::<H>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::{represent_value, Blake3Hasher};

    fn leaf(key: &[u8], value: &[u8]) -> ProofNode {
        let mut node = ProofNode::new(NibblePath::from_bytes(key));
        node.value_or_hash = Maybe::Some(represent_value::<Blake3Hasher>(value));
        node
    }

    fn root_with(children: &[(u8, Digest)]) -> ProofNode {
        let mut node = ProofNode::new(NibblePath::empty());
        for &(i, d) in children {
            node.set_child(i as usize, d);
        }
        node
    }

    #[test]
    fn missing_history_with_no_data_succeeds_trivially() {
        let proof = ChangeProof {
            had_roots_in_history: false,
            start_proof: vec![],
            end_proof: vec![],
            key_changes: vec![],
        };
        assert!(proof.verify::<Blake3Hasher>(None, None, [0u8; 32]).is_ok());
    }

    #[test]
    fn missing_history_with_data_is_rejected() {
        let proof = ChangeProof {
            had_roots_in_history: false,
            start_proof: vec![],
            end_proof: vec![ProofNode::new(NibblePath::empty())],
            key_changes: vec![],
        };
        assert_eq!(
            proof.verify::<Blake3Hasher>(None, None, [0u8; 32]),
            Err(ProofError::DataInMissingRootProof)
        );
    }

    #[test]
    fn history_present_but_proof_empty_is_rejected() {
        let proof = ChangeProof {
            had_roots_in_history: true,
            start_proof: vec![],
            end_proof: vec![],
            key_changes: vec![],
        };
        assert_eq!(
            proof.verify::<Blake3Hasher>(None, None, [0u8; 32]),
            Err(ProofError::NoMerkleProof)
        );
    }

    #[test]
    fn start_bound_without_start_proof_is_rejected() {
        let root = root_with(&[]);
        let proof = ChangeProof {
            had_roots_in_history: true,
            start_proof: vec![],
            end_proof: vec![root],
            key_changes: vec![KeyChange {
                key: vec![1],
                value: Maybe::Some(vec![1]),
            }],
        };
        assert_eq!(
            proof.verify::<Blake3Hasher>(Some(&[1]), None, [0u8; 32]),
            Err(ProofError::NoStartProof)
        );
    }

    #[test]
    fn single_key_set_round_trips() {
        let leaf_node = leaf(&[2], &[2]);
        let leaf_digest = Blake3Hasher::hash_node(&leaf_node);
        let root = root_with(&[(0, leaf_digest)]);
        let root_digest = Blake3Hasher::hash_node(&root);

        let proof = ChangeProof {
            had_roots_in_history: true,
            start_proof: vec![root.clone(), leaf_node.clone()],
            end_proof: vec![root, leaf_node],
            key_changes: vec![KeyChange {
                key: vec![2],
                value: Maybe::Some(vec![2]),
            }],
        };

        assert!(proof
            .verify::<Blake3Hasher>(Some(&[2]), Some(&[2]), root_digest)
            .is_ok());
    }

    #[test]
    fn deleted_key_must_not_remain_in_fragment() {
        let leaf_node = leaf(&[2], &[2]);
        let leaf_digest = Blake3Hasher::hash_node(&leaf_node);
        let root = root_with(&[(0, leaf_digest)]);
        let root_digest = Blake3Hasher::hash_node(&root);

        // The end-state fringe still shows the leaf, but the change claims a deletion.
        let proof = ChangeProof {
            had_roots_in_history: true,
            start_proof: vec![root.clone(), leaf_node.clone()],
            end_proof: vec![root, leaf_node],
            key_changes: vec![KeyChange {
                key: vec![2],
                value: Maybe::Absent,
            }],
        };

        assert_eq!(
            proof.verify::<Blake3Hasher>(Some(&[2]), Some(&[2]), root_digest),
            Err(ProofError::InvalidProof)
        );
    }
}
