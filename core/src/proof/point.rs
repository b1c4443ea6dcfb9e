//! Point proofs: a single key's inclusion or exclusion under a root, per §3.4/§4.4.

use crate::error::ProofError;
use crate::hasher::{value_representation_matches, Digest, NodeHasher};
use crate::maybe::Maybe;
use crate::nibble::NibblePath;
use crate::proof::ProofNode;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// A proof that `key` has `value` (inclusion) or has no value (exclusion) under some root.
///
/// No `borsh`/`serde` derives here: [`crate::codec::WireProof`] is the on-wire mirror of this
/// type, since its nested [`Maybe`]/[`ProofNode`] fields carry no such derives of their own.
#[derive(Debug, Clone)]
pub struct Proof {
    pub key: Vec<u8>,
    pub value: ProofValue,
    pub path: Vec<ProofNode>,
}

/// Alias kept distinct from `Maybe` itself so call sites reflect what this field means.
pub type ProofValue = Maybe<Vec<u8>>;

impl Proof {
    /// Verify this proof against `expected_root`, per §4.4.
    ///
    /// The terminal node -- `path`'s last entry -- is checked against `key` in one of two
    /// shapes:
    ///
    /// - Its `key_path` equals `key`'s nibble path exactly: this is `key`'s own node, and the
    ///   claim is whatever that node's `value_or_hash` says, inclusion or exclusion alike (a
    ///   branch node with no value of its own is a valid exclusion witness).
    /// - Its `key_path` is a strict prefix of `key`'s nibble path: this can only witness
    ///   exclusion, and only if the node has no child at the nibble `key` would need next --
    ///   otherwise the proof has simply stopped short of a subtree that might contain `key`.
    ///
    /// Ancestor nodes (everything before the terminal) must each be a strict nibble-prefix of
    /// `key`'s path, in strictly increasing length order -- a fringe that merely brushes past
    /// `key`'s path at its own final nibble, as range/change proofs allow, does not by itself
    /// prove `key`'s absence, since it says nothing about the other branches of its parent.
    pub fn verify<H: NodeHasher>(&self, expected_root: Digest) -> Result<(), ProofError> {
        if self.path.is_empty() {
            return Err(ProofError::NoProof);
        }

        for node in &self.path {
            node.validate()?;
        }

        let key_path = NibblePath::from_bytes(&self.key);

        for i in 0..self.path.len().saturating_sub(1) {
            let a = &self.path[i].key_path;
            let b = &self.path[i + 1].key_path;
            if a.length() >= b.length() || !b.has_prefix(a) {
                return Err(ProofError::NonIncreasingProofNodes);
            }
        }
        for node in &self.path {
            if !key_path.has_prefix(&node.key_path) {
                return Err(ProofError::ProofNodeNotForKey);
            }
        }

        // SAFETY of unwrap: path is non-empty, checked above.
        let last = self.path.last().unwrap();

        if last.key_path.length() == key_path.length() {
            match &self.value {
                Maybe::Some(v) => match &last.value_or_hash {
                    Maybe::Some(stored) if value_representation_matches::<H>(v, stored) => {}
                    _ => return Err(ProofError::ProofValueDoesntMatch),
                },
                Maybe::Absent => {
                    if !last.value_or_hash.is_absent() {
                        return Err(ProofError::ProofValueDoesntMatch);
                    }
                }
            }
        } else {
            if self.value.is_some() {
                return Err(ProofError::ProofValueDoesntMatch);
            }
            let next_nibble = key_path.nibble(last.key_path.length());
            if last.children[next_nibble as usize].is_some() {
                return Err(ProofError::ProofNodeNotForKey);
            }
        }

        let root = recompute_root::<H>(&self.path);
        if root != expected_root {
            return Err(ProofError::InvalidProof);
        }
        Ok(())
    }
}

/// Hash `path[-1]`, then walk upward, overwriting at each parent the child slot for the
/// nibble the child path took, and rehashing -- §4.4 step 5.
fn recompute_root<H: NodeHasher>(path: &[ProofNode]) -> Digest {
    // SAFETY of unwrap: callers only invoke this with a non-empty path.
    let last = path.last().unwrap();
    let mut cur_digest = H::hash_node(last);
    let mut cur_key_path = last.key_path.clone();

    for parent in path[..path.len() - 1].iter().rev() {
        let mut parent = parent.clone();
        let child_index = cur_key_path.nibble(parent.key_path.length());
        parent.set_child(child_index as usize, cur_digest);
        cur_digest = H::hash_node(&parent);
        cur_key_path = parent.key_path.clone();
    }

    cur_digest
}
