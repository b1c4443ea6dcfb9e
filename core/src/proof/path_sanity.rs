//! Shared proof-path sanity checks used by range and change proof fringes (§4.5 step 6, §4.6).
//!
//! Point proofs (§4.4) do their own, stricter terminal check instead of this module's last-node
//! leniency: a range/change fringe legitimately terminates at the nearest real leaf to a bound,
//! which may not share a full nibble-prefix with the bound itself, but a point proof's terminal
//! must either be the key's own node or an ancestor demonstrably missing the needed child.

use crate::error::ProofError;
use crate::nibble::NibblePath;
use crate::proof::ProofNode;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Check that `path` contains a well-ordered chain of ancestors of (or a node adjacent to)
/// `key_path`:
///
/// - Among the nodes that are genuine ancestors of `key_path` (i.e. `key_path.has_prefix`),
///   adjacency must be in strict nibble-prefix order (`ErrNonIncreasingProofNodes`).
/// - The final node in `path` is special: if it isn't itself an ancestor of `key_path`, it may
///   instead diverge from `key_path` only at its own final nibble -- the shape of a range/change
///   fringe that terminates at the nearest real leaf to a bound (`ErrProofNodeNotForKey`).
/// - `path` may also carry nodes that are neither ancestors of `key_path` nor the terminal
///   sibling -- real branch nodes supplied purely so a change proof's reconstruction has access
///   to children it cannot otherwise account for (an unchanged sibling key, say). Those nodes
///   are not this function's concern: they are validated implicitly by the final root-hash
///   recomputation, which will fail if they are wrong or fabricated.
pub fn verify_proof_path(path: &[ProofNode], key_path: &NibblePath) -> Result<(), ProofError> {
    let mut previous: Option<&NibblePath> = None;
    for node in path {
        if !key_path.has_prefix(&node.key_path) {
            continue;
        }
        if let Some(prev) = previous {
            if prev.length() >= node.key_path.length() {
                return Err(ProofError::NonIncreasingProofNodes);
            }
        }
        previous = Some(&node.key_path);
    }

    if let Some(last) = path.last() {
        if !key_path.has_prefix(&last.key_path)
            && !diverges_only_at_final_nibble(&last.key_path, key_path)
        {
            return Err(ProofError::ProofNodeNotForKey);
        }
    }

    Ok(())
}

/// True iff `node_path` agrees with `key_path` on every nibble except its own final one.
fn diverges_only_at_final_nibble(node_path: &NibblePath, key_path: &NibblePath) -> bool {
    let n = node_path.length();
    if n == 0 || n > key_path.length() {
        return false;
    }
    for i in 0..n - 1 {
        if node_path.nibble(i) != key_path.nibble(i) {
            return false;
        }
    }
    node_path.nibble(n - 1) != key_path.nibble(n - 1)
}
