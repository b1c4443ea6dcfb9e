//! `ReferenceTrie`: a `BTreeMap`-backed radix-16 Merkle trie implementing the builder contract
//! (§6.1) that the proof verifiers in `mrp-core` are checked against.
//!
//! This is deliberately a minimal stand-in, not a target for further feature growth: every
//! operation rebuilds the node tree it needs from the flat keyspace rather than maintaining
//! one incrementally. Production trie implementations (disk-backed, incrementally updated)
//! exist precisely because this approach doesn't scale; this one only has to be obviously
//! correct.

use std::collections::{BTreeMap, VecDeque};
use std::marker::PhantomData;
use std::ops::Bound;

use anyhow::{bail, Context};
use mrp_core::{
    ChangeProof, Digest, KeyChange, KeyValue, Maybe, NibblePath, NodeHasher, Proof, ProofError,
    ProofNode, RangeProof, EMPTY_TRIE_ROOT,
};

use crate::config::Config;

/// A staged set of writes, opened via [`ReferenceTrie::new_batch`] and applied atomically by
/// [`ReferenceTrie::write`].
#[derive(Debug, Default)]
pub struct Batch {
    ops: Vec<(Vec<u8>, Maybe<Vec<u8>>)>,
}

impl Batch {
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push((key.into(), Maybe::Some(value.into())));
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push((key.into(), Maybe::Absent));
    }
}

struct HistoryEntry {
    root: Digest,
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

/// One materialized node of the fully-expanded trie, built fresh from a flat keyspace by
/// [`build_full_trie`]. Owns its children so a proof path can be walked without re-deriving
/// digests at each step.
pub(crate) struct BuiltNode {
    node: ProofNode,
    children: BTreeMap<u8, Box<BuiltNode>>,
    pub(crate) digest: Digest,
}

/// Recursively build the subtree covering exactly `entries`, whose paths all share at least
/// the common prefix implied by being grouped together. Mirrors how a path-compressed radix
/// trie collapses what other encodings split into separate extension and branch nodes: one
/// `ProofNode` carries both an arbitrary-length `key_path` and up to 16 children.
fn build_subtree<H: NodeHasher>(entries: &[(NibblePath, Vec<u8>)]) -> BuiltNode {
    debug_assert!(!entries.is_empty());

    let mut common_len = entries[0].0.length();
    for (path, _) in &entries[1..] {
        common_len = common_len.min(entries[0].0.shared_prefix_len(path));
    }
    let common_path = entries[0].0.prefix(common_len);
    let mut node = ProofNode::new(common_path);

    let mut own_value: Option<&Vec<u8>> = None;
    let mut buckets: BTreeMap<u8, Vec<(NibblePath, Vec<u8>)>> = BTreeMap::new();
    for (path, value) in entries {
        if path.length() == common_len {
            own_value = Some(value);
        } else {
            let nibble = path.nibble(common_len);
            buckets
                .entry(nibble)
                .or_default()
                .push((path.clone(), value.clone()));
        }
    }
    if let Some(value) = own_value {
        node.value_or_hash = Maybe::Some(mrp_core::hasher::represent_value::<H>(value));
    }

    let mut children = BTreeMap::new();
    for (nibble, group) in buckets {
        let child = build_subtree::<H>(&group);
        node.set_child(nibble as usize, child.digest);
        children.insert(nibble, Box::new(child));
    }

    let digest = H::hash_node(&node);
    BuiltNode {
        node,
        children,
        digest,
    }
}

pub(crate) fn build_full_trie<H: NodeHasher>(
    entries: &BTreeMap<Vec<u8>, Vec<u8>>,
) -> Option<BuiltNode> {
    if entries.is_empty() {
        return None;
    }
    let items: Vec<(NibblePath, Vec<u8>)> = entries
        .iter()
        .map(|(k, v)| (NibblePath::from_bytes(k), v.clone()))
        .collect();
    Some(build_subtree::<H>(&items))
}

/// Walk from `built`'s root toward `key_path`, collecting every node visited. Stops at the
/// node whose own path exactly matches `key_path` (inclusion, or a valueless branch exclusion)
/// or at the deepest ancestor with no child continuing toward it (exclusion) -- exactly the two
/// terminal shapes `Proof::verify` accepts.
fn path_to(built: &BuiltNode, key_path: &NibblePath) -> Vec<ProofNode> {
    let mut path = Vec::new();
    let mut cur = built;
    loop {
        path.push(cur.node.clone());
        if cur.node.key_path.length() == key_path.length() {
            break;
        }
        let next_nibble = key_path.nibble(cur.node.key_path.length());
        match cur.children.get(&next_nibble) {
            Some(child) => cur = child,
            None => break,
        }
    }
    path
}

/// Collapse a proof-node list down to one entry per distinct `key_path`, sorted by nibble
/// depth. Used to merge several root-to-leaf walks (one per changed key) into a single fringe:
/// without the sort, nodes shared across walks (the root, chief among them) would appear
/// several times and out of the strict-depth order a verifier's chain check expects.
fn dedup_sorted_by_depth(nodes: &mut Vec<ProofNode>) {
    let mut seen: BTreeMap<NibblePath, ProofNode> = BTreeMap::new();
    for node in nodes.drain(..) {
        seen.entry(node.key_path.clone()).or_insert(node);
    }
    nodes.extend(seen.into_values());
    nodes.sort_by_key(|n| n.key_path.length());
}

fn key_in_range(key: &[u8], start: Option<&[u8]>, end: Option<&[u8]>) -> bool {
    if let Some(s) = start {
        if key < s {
            return false;
        }
    }
    if let Some(e) = end {
        if key > e {
            return false;
        }
    }
    true
}

fn range_bounds(start: Option<&[u8]>, end: Option<&[u8]>) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
    let lower = match start {
        Some(s) => Bound::Included(s.to_vec()),
        None => Bound::Unbounded,
    };
    let upper = match end {
        Some(e) => Bound::Included(e.to_vec()),
        None => Bound::Unbounded,
    };
    (lower, upper)
}

/// A `BTreeMap`-backed radix-16 Merkle trie, with a bounded ring of historical roots for
/// serving change proofs. Generic over the hasher so a single process can run a blake3 or
/// sha2 instance without picking one at compile time for the whole crate.
pub struct ReferenceTrie<H> {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    built: Option<BuiltNode>,
    root: Digest,
    history: VecDeque<HistoryEntry>,
    history_length: usize,
    _hasher: PhantomData<H>,
}

impl<H: NodeHasher> ReferenceTrie<H> {
    /// A trie with nothing written to it yet has no history entries at all -- not even one for
    /// the empty root. A change-proof request against the empty root before any write has
    /// happened is asking for a diff that hasn't been recorded, not one this trie can still
    /// produce, so it reports `had_roots_in_history = false` exactly like any other root that
    /// has aged out of the window, rather than treating genesis as implicitly always retained.
    pub fn new(config: Config) -> Self {
        ReferenceTrie {
            entries: BTreeMap::new(),
            built: None,
            root: EMPTY_TRIE_ROOT,
            history: VecDeque::new(),
            history_length: config.history_length.max(1),
            _hasher: PhantomData,
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(|v| v.as_slice())
    }

    pub fn get_merkle_root(&self) -> Digest {
        self.root
    }

    pub fn new_batch(&self) -> Batch {
        Batch::default()
    }

    /// Apply `batch` atomically: writes are staged against a clone of the live keyspace and
    /// only swapped in once the new root has been computed, so a panic partway through
    /// building the new trie can never leave `self` holding a half-applied batch.
    #[tracing::instrument(level = "debug", skip(self, batch), fields(ops = batch.ops.len()))]
    pub fn write(&mut self, batch: Batch) -> anyhow::Result<Digest> {
        let mut staged = self.entries.clone();
        for (key, value) in batch.ops {
            match value {
                Maybe::Some(v) => {
                    staged.insert(key, v);
                }
                Maybe::Absent => {
                    staged.remove(&key);
                }
            }
        }

        let built = build_full_trie::<H>(&staged);
        let root = built.as_ref().map(|b| b.digest).unwrap_or(EMPTY_TRIE_ROOT);

        self.entries = staged;
        self.built = built;
        self.root = root;
        self.push_history();

        tracing::debug!(root = %mrp_core::hasher::format_digest(&root), "committed batch");
        Ok(root)
    }

    fn push_history(&mut self) {
        self.history.push_back(HistoryEntry {
            root: self.root,
            entries: self.entries.clone(),
        });
        while self.history.len() > self.history_length {
            self.history.pop_front();
        }
    }

    pub fn get_proof(&self, key: &[u8]) -> Proof {
        let key_path = NibblePath::from_bytes(key);
        let value = self.get(key).map(|v| v.to_vec());
        let path = match &self.built {
            Some(built) => path_to(built, &key_path),
            None => Vec::new(),
        };
        Proof {
            key: key.to_vec(),
            value: value.map(Maybe::Some).unwrap_or(Maybe::Absent),
            path,
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn get_range_proof(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        max_len: usize,
    ) -> anyhow::Result<RangeProof> {
        if max_len == 0 {
            return Err(ProofError::InvalidMaxLength.into());
        }
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ProofError::StartAfterEnd.into());
            }
        }

        let mut key_values = Vec::new();
        for (k, v) in self.entries.range(range_bounds(start, end)) {
            if key_values.len() == max_len {
                break;
            }
            key_values.push(KeyValue {
                key: k.clone(),
                value: v.clone(),
            });
        }

        if start.is_none() && end.is_none() && key_values.is_empty() {
            // The only way this combination is sound is an empty trie: `Fragment::hash_root`
            // treats a wholly-empty proof as the sentinel root, which is exactly what an
            // empty `ReferenceTrie` reports.
            return Ok(RangeProof {
                start_proof: Vec::new(),
                end_proof: Vec::new(),
                key_values: Vec::new(),
            });
        }

        let built = self.built.as_ref();
        let start_proof = match start {
            Some(s) => built
                .map(|b| path_to(b, &NibblePath::from_bytes(s)))
                .unwrap_or_default(),
            None => Vec::new(),
        };

        let effective_end = end
            .map(|e| e.to_vec())
            .or_else(|| key_values.last().map(|kv| kv.key.clone()));
        let end_proof = match &effective_end {
            Some(e) => built
                .map(|b| path_to(b, &NibblePath::from_bytes(e)))
                .unwrap_or_default(),
            None => Vec::new(),
        };

        if start.is_some()
            && end.is_none()
            && start_proof.is_empty()
            && end_proof.is_empty()
            && key_values.is_empty()
        {
            bail!(
                "range proof for an empty trie with an open-ended upper bound has no \
                 representable fringe; pass an explicit `end` instead"
            );
        }

        Ok(RangeProof {
            start_proof,
            end_proof,
            key_values,
        })
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn get_change_proof(
        &self,
        start_root: Digest,
        end_root: Digest,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        max_len: usize,
    ) -> anyhow::Result<ChangeProof> {
        if max_len == 0 {
            return Err(ProofError::InvalidMaxLength.into());
        }
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ProofError::StartAfterEnd.into());
            }
        }

        let Some(start_snapshot) = self.history.iter().find(|h| h.root == start_root) else {
            tracing::debug!(
                start_root = %mrp_core::hasher::format_digest(&start_root),
                "start root fell out of history window"
            );
            return Ok(ChangeProof {
                had_roots_in_history: false,
                start_proof: Vec::new(),
                end_proof: Vec::new(),
                key_changes: Vec::new(),
            });
        };

        let end_snapshot: &BTreeMap<Vec<u8>, Vec<u8>> = if end_root == self.root {
            &self.entries
        } else if let Some(h) = self.history.iter().find(|h| h.root == end_root) {
            &h.entries
        } else {
            bail!(
                "end root {} is neither the live root nor in history",
                mrp_core::hasher::format_digest(&end_root)
            );
        };

        let mut touched: BTreeMap<Vec<u8>, ()> = BTreeMap::new();
        for k in start_snapshot.entries.keys() {
            if key_in_range(k, start, end) {
                touched.insert(k.clone(), ());
            }
        }
        for k in end_snapshot.keys() {
            if key_in_range(k, start, end) {
                touched.insert(k.clone(), ());
            }
        }

        let mut key_changes = Vec::new();
        for (key, ()) in touched {
            let before = start_snapshot.entries.get(&key);
            let after = end_snapshot.get(&key);
            if before != after {
                key_changes.push(KeyChange {
                    key,
                    value: after.cloned().map(Maybe::Some).unwrap_or(Maybe::Absent),
                });
                if key_changes.len() == max_len {
                    break;
                }
            }
        }

        let built_end = build_full_trie::<H>(end_snapshot);
        let effective_end = end
            .map(|e| e.to_vec())
            .or_else(|| key_changes.last().map(|c| c.key.clone()));

        let start_proof = match start {
            Some(s) => built_end
                .as_ref()
                .map(|b| path_to(b, &NibblePath::from_bytes(s)))
                .unwrap_or_default(),
            None => Vec::new(),
        };

        // The bound's own path isn't enough: any branch node with a child that didn't change
        // (and so never appears in `key_changes`) can't have its hash recomputed from the
        // listed changes alone. Walk every changed key's real path too and fold the union in --
        // this carries along the true, fully-populated branch node wherever one is needed,
        // exactly the real nodes a verifier's fragment reconstruction falls back on when it
        // can't synthesize a branch purely from what's listed.
        let mut end_proof = match &effective_end {
            Some(e) => built_end
                .as_ref()
                .map(|b| path_to(b, &NibblePath::from_bytes(e)))
                .unwrap_or_default(),
            None => Vec::new(),
        };
        if let Some(b) = built_end.as_ref() {
            for change in &key_changes {
                end_proof.extend(path_to(b, &NibblePath::from_bytes(&change.key)));
            }
        }
        dedup_sorted_by_depth(&mut end_proof);

        if start.is_some() && start_proof.is_empty() {
            bail!("change proof needs a start fringe but the end-state trie is empty");
        }
        if end.is_some() && end_proof.is_empty() {
            bail!("change proof needs an end fringe but the end-state trie is empty");
        }

        Ok(ChangeProof {
            had_roots_in_history: true,
            start_proof,
            end_proof,
            key_changes,
        })
    }
}
