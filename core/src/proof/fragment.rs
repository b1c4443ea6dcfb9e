//! Minimal trie fragment reconstruction, shared by range proofs (§4.5) and change proofs
//! (§4.6): both authenticate a key interval by stitching together fringe `ProofNode`s and a
//! sorted list of leaves, then recomputing a root hash bottom-up.

use crate::error::ProofError;
use crate::hasher::{represent_value, Digest, NodeHasher};
use crate::maybe::Maybe;
use crate::nibble::{NibblePath, BRANCHING_FACTOR};
use crate::proof::ProofNode;

#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap;
#[cfg(feature = "std")]
use std::collections::BTreeMap;

/// A partial trie built from fringe proof nodes and known leaves, keyed by nibble path.
#[derive(Default)]
pub struct Fragment {
    nodes: BTreeMap<NibblePath, ProofNode>,
}

impl Fragment {
    pub fn new() -> Self {
        Fragment {
            nodes: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, path: &NibblePath) -> bool {
        self.nodes.contains_key(path)
    }

    /// Merge a fringe proof node in. If a node already exists at this path (the overlap
    /// between a `start_proof` and an `end_proof`), their `value_or_hash` must agree and
    /// their child claims must not conflict (the Open Question resolution of §9: treat
    /// overlapping fringe nodes as one, asserting agreement rather than erroring on overlap).
    pub fn merge_proof_node(&mut self, node: &ProofNode) -> Result<(), ProofError> {
        match self.nodes.get_mut(&node.key_path) {
            None => {
                self.nodes.insert(node.key_path.clone(), node.clone());
            }
            Some(existing) => {
                if existing.value_or_hash != node.value_or_hash {
                    return Err(ProofError::InvalidProof);
                }
                for i in 0..BRANCHING_FACTOR {
                    match (existing.children[i], node.children[i]) {
                        (Some(a), Some(b)) if a != b => return Err(ProofError::InvalidProof),
                        (None, Some(b)) => existing.children[i] = Some(b),
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }

    /// Merge a known leaf (key, raw value) in. If a fringe node already occupies this exact
    /// path, its `value_or_hash` must agree with the leaf's representation rather than being
    /// overwritten -- the fringe node may carry children information the bare leaf doesn't.
    pub fn merge_leaf<H: NodeHasher>(&mut self, path: NibblePath, value: &[u8]) -> Result<(), ProofError> {
        let value_or_hash = Maybe::Some(represent_value::<H>(value));
        match self.nodes.get(&path) {
            Some(existing) => {
                if existing.value_or_hash != value_or_hash {
                    return Err(ProofError::InvalidProof);
                }
            }
            None => {
                let mut leaf = ProofNode::new(path.clone());
                leaf.value_or_hash = value_or_hash;
                self.nodes.insert(path, leaf);
            }
        }
        Ok(())
    }

    /// Recompute the fragment's root digest. A maximally-compressed trie's root does not
    /// necessarily sit at the empty nibble path -- if every key the fragment knows about
    /// happens to share a leading nibble, the real root's own `key_path` already consumes it
    /// (this is exactly what `ReferenceTrie::build_subtree` produces, and exactly the scenario
    /// spec.md's own worked examples use). The root is whichever merged node has the shortest
    /// recorded path; every other entry must sit underneath it or reconstruction fails below.
    pub fn hash_root<H: NodeHasher>(&self) -> Result<Digest, ProofError> {
        let root_path = match self.nodes.keys().min_by_key(|k| k.length()) {
            Some(p) => p.clone(),
            None => return Ok(crate::hasher::EMPTY_TRIE_ROOT),
        };
        self.hash_subtree::<H>(&root_path)
    }

    /// Hash the subtree rooted at `path`. If an explicit proof node was merged in at this
    /// exact path, its own `children` claims are authoritative for any slot we can't
    /// independently recompute (an out-of-range or unchanged sibling, say) and are only
    /// cross-checked where we can. If no explicit node sits at `path`, every one of its
    /// descendants in the fragment must be fully enumerated (true for range proofs, since
    /// every in-range key is listed), so the branch node is synthesized the same way a
    /// builder would: group descendants by their next nibble and recurse.
    ///
    /// Descending one nibble at a time would desync from a real builder whenever a child
    /// subtree has no other branch point for many nibbles (a compressed tail, e.g. "key1" vs.
    /// "key12"): a builder never materializes a chain of single-child wrapper nodes there, it
    /// jumps straight to wherever the next real branch or leaf sits. [`Self::effective_child_path`]
    /// finds that spot so the recursion lines up with what was actually hashed.
    fn hash_subtree<H: NodeHasher>(&self, path: &NibblePath) -> Result<Digest, ProofError> {
        match self.nodes.get(path) {
            Some(explicit) => {
                let mut node = explicit.clone();
                for i in 0..BRANCHING_FACTOR as u8 {
                    let mut branch = path.clone();
                    branch.push(i);

                    if let Some(child_path) = self.effective_child_path(&branch) {
                        let computed = self.hash_subtree::<H>(&child_path)?;
                        match node.children[i as usize] {
                            Some(claimed) if claimed == computed => {}
                            _ => return Err(ProofError::InvalidProof),
                        }
                    }
                }
                Ok(H::hash_node(&node))
            }
            None => {
                let mut node = ProofNode::new(path.clone());
                let mut any_child = false;
                for i in 0..BRANCHING_FACTOR as u8 {
                    let mut branch = path.clone();
                    branch.push(i);

                    if let Some(child_path) = self.effective_child_path(&branch) {
                        any_child = true;
                        let computed = self.hash_subtree::<H>(&child_path)?;
                        node.set_child(i as usize, computed);
                    }
                }
                if !any_child {
                    // Nothing in the fragment says anything about this path at all; there's
                    // no basis to synthesize or otherwise account for it.
                    return Err(ProofError::InvalidProof);
                }
                Ok(H::hash_node(&node))
            }
        }
    }

    /// Where the subtree rooted under `branch` actually lives, or `None` if the fragment knows
    /// nothing about it. If an explicit node sits exactly at `branch`, that's the spot. Failing
    /// that, if exactly one recorded node has `branch` as a prefix, a builder would have
    /// compressed the path straight down to it with no intermediate node, so that node's own
    /// path is the effective one. Otherwise every node with `branch` as a prefix shares some
    /// longer common prefix before they actually diverge -- that longer prefix, not `branch`
    /// itself, is where the builder would have placed the branch node.
    fn effective_child_path(&self, branch: &NibblePath) -> Option<NibblePath> {
        if self.nodes.contains_key(branch) {
            return Some(branch.clone());
        }
        let mut descendants = self.nodes.keys().filter(|k| k.has_prefix(branch));
        let first = descendants.next()?;
        let mut common_len = first.length();
        for k in descendants {
            common_len = common_len.min(first.shared_prefix_len(k));
        }
        Some(first.prefix(common_len))
    }
}
