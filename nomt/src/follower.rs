//! Follower database: applies a verified [`ChangeProof`] as a single atomic commit (§4.6,
//! §5 "commit fence").
//!
//! A follower keeps no history window of its own -- unlike [`crate::trie::ReferenceTrie`], it
//! never needs to answer a change-proof *request*, only to apply one it has been handed. Its
//! root is expected to already equal whatever `start_root` the proof it receives was computed
//! against; that precondition is the caller's responsibility (§4.6: "the verifier also owns a
//! local follower database currently at root `R_local`, which equals the sender's
//! `start_root`"), not something this type can check on its own.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use mrp_core::{ChangeProof, Digest, Maybe, NodeHasher, ProofError, EMPTY_TRIE_ROOT};

use crate::trie::build_full_trie;

/// A batch of upserts/deletes that [`FollowerDb::verify_change_proof`] has already checked
/// out cryptographically, staged but not yet applied. Holding one is the only evidence
/// [`FollowerDb::commit_change_proof`] requires; there is no other way to construct one.
///
/// Per §4.6 step 8 and §5's atomicity requirement: a `ChangeProof` that fails verification
/// never reaches this type, so a [`FollowerDb`] is byte-identical to its pre-call state
/// whenever `verify_change_proof` returns `Err`.
#[must_use = "a verified change proof has no effect on the follower until committed"]
pub struct PendingChangeBatch {
    ops: Vec<(Vec<u8>, Maybe<Vec<u8>>)>,
    end_root: Digest,
}

impl PendingChangeBatch {
    /// The root this batch will advance its follower to once committed.
    pub fn end_root(&self) -> Digest {
        self.end_root
    }

    /// How many key-level changes this batch carries.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// A key-value store that only ever advances by applying verified [`ChangeProof`]s, or, for
/// bootstrapping, a full snapshot taken from a range proof's `key_values` (§7: the
/// `had_roots_in_history = false` fallback). Mirrors the "in-progress synchronizer" role of
/// §1 and §4.6.
pub struct FollowerDb<H> {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    root: Digest,
    _hasher: PhantomData<H>,
}

impl<H: NodeHasher> FollowerDb<H> {
    /// An empty follower, at the empty-trie sentinel root.
    pub fn new() -> Self {
        FollowerDb {
            entries: BTreeMap::new(),
            root: EMPTY_TRIE_ROOT,
            _hasher: PhantomData,
        }
    }

    /// Bootstrap a follower directly from a full key/value snapshot -- what a range-proof-driven
    /// full sync produces when a change proof reports `had_roots_in_history = false` and the
    /// caller falls back to range sync instead (§4.6, §7). Not itself part of the change-proof
    /// path; exists so callers have a way to seed a follower at a known root without going
    /// through [`crate::trie::ReferenceTrie`] directly.
    pub fn from_snapshot(entries: BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        let root = build_full_trie::<H>(&entries)
            .map(|b| b.digest)
            .unwrap_or(EMPTY_TRIE_ROOT);
        FollowerDb {
            entries,
            root,
            _hasher: PhantomData,
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(|v| v.as_slice())
    }

    pub fn get_merkle_root(&self) -> Digest {
        self.root
    }

    /// Verify that `proof` authenticates a transition to `expected_end_root` within
    /// `[start, end]` (§4.6 steps 1-7). Delegates the proof's own internal consistency --
    /// ordering, fringe shape, and the reconstructed-fragment root -- to
    /// [`ChangeProof::verify`], then independently recomputes what this follower's *complete*
    /// keyspace would hash to after applying `proof.key_changes`, and requires that to match
    /// too (the follower-side half of step 7, since `ChangeProof::verify` alone only checks
    /// the proof's own claimed fringe digests against each other, not against any particular
    /// follower's existing state outside `[start, end]`).
    ///
    /// When `proof.had_roots_in_history` is `false`, there is no diff to reconcile: the sender
    /// is signalling that `start_root` has already aged out of its own history, and
    /// `expected_end_root` is the sender's *true* current root, not something this follower can
    /// be expected to already match. The right response is an empty batch that leaves the
    /// follower exactly where it is, telling the caller to fall back to a full range sync
    /// instead of treating this as a rejected proof.
    ///
    /// Performs no mutation on `self`: success hands back a [`PendingChangeBatch`] that only
    /// [`Self::commit_change_proof`] can apply.
    #[tracing::instrument(level = "debug", skip(self, proof), fields(changes = proof.key_changes.len()))]
    pub fn verify_change_proof(
        &self,
        proof: &ChangeProof,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        expected_end_root: Digest,
    ) -> anyhow::Result<PendingChangeBatch> {
        proof.verify::<H>(start, end, expected_end_root)?;

        if !proof.had_roots_in_history {
            return Ok(PendingChangeBatch {
                ops: Vec::new(),
                end_root: self.root,
            });
        }

        let mut ops = Vec::with_capacity(proof.key_changes.len());
        let mut staged = self.entries.clone();
        for change in &proof.key_changes {
            match &change.value {
                Maybe::Some(v) => {
                    staged.insert(change.key.clone(), v.clone());
                    ops.push((change.key.clone(), Maybe::Some(v.clone())));
                }
                Maybe::Absent => {
                    staged.remove(&change.key);
                    ops.push((change.key.clone(), Maybe::Absent));
                }
            }
        }

        let actual_root = build_full_trie::<H>(&staged)
            .map(|b| b.digest)
            .unwrap_or(EMPTY_TRIE_ROOT);
        if actual_root != expected_end_root {
            tracing::warn!(
                actual = %mrp_core::hasher::format_digest(&actual_root),
                expected = %mrp_core::hasher::format_digest(&expected_end_root),
                "change proof does not reconcile with this follower's existing state outside the proven range"
            );
            return Err(ProofError::InvalidProof.into());
        }

        Ok(PendingChangeBatch {
            ops,
            end_root: expected_end_root,
        })
    }

    /// Apply a batch already verified by [`Self::verify_change_proof`], advancing this
    /// follower to the root it was checked against (§4.6 step 8). The only mutator on
    /// `FollowerDb` -- the commit fence described in §5.
    #[tracing::instrument(level = "debug", skip(self, batch), fields(ops = batch.ops.len()))]
    pub fn commit_change_proof(&mut self, batch: PendingChangeBatch) -> Digest {
        for (key, value) in batch.ops {
            match value {
                Maybe::Some(v) => {
                    self.entries.insert(key, v);
                }
                Maybe::Absent => {
                    self.entries.remove(&key);
                }
            }
        }
        self.root = batch.end_root;
        tracing::debug!(
            root = %mrp_core::hasher::format_digest(&self.root),
            "applied change proof"
        );
        self.root
    }
}

impl<H: NodeHasher> Default for FollowerDb<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::trie::ReferenceTrie;
    use mrp_core::Blake3Hasher;

    #[test]
    fn follower_advances_to_leader_root_after_commit() {
        let mut leader = ReferenceTrie::<Blake3Hasher>::new(Config::default());
        let mut batch = leader.new_batch();
        for k in 20u8..25 {
            batch.put(vec![k], vec![k]);
        }
        leader.write(batch).unwrap();
        let r1 = leader.get_merkle_root();

        let mut follower = FollowerDb::<Blake3Hasher>::from_snapshot(
            (20u8..25).map(|k| (vec![k], vec![k])).collect(),
        );
        assert_eq!(follower.get_merkle_root(), r1);

        let mut batch = leader.new_batch();
        for k in 25u8..30 {
            batch.put(vec![k], vec![k]);
        }
        batch.delete(vec![21u8]);
        batch.delete(vec![22u8]);
        leader.write(batch).unwrap();
        let r2 = leader.get_merkle_root();

        let proof = leader.get_change_proof(r1, r2, None, None, 50).unwrap();
        let pending = follower
            .verify_change_proof(&proof, None, None, r2)
            .unwrap();
        assert_eq!(pending.end_root(), r2);
        assert_eq!(follower.get_merkle_root(), r1, "verify must not mutate");

        let committed_root = follower.commit_change_proof(pending);
        assert_eq!(committed_root, r2);
        assert_eq!(follower.get_merkle_root(), r2);
        assert_eq!(follower.get(&[21u8]), None);
        assert_eq!(follower.get(&[29u8]), Some(&[29u8][..]));
    }

    #[test]
    fn tampered_change_proof_leaves_follower_untouched() {
        let mut leader = ReferenceTrie::<Blake3Hasher>::new(Config::default());
        let mut batch = leader.new_batch();
        batch.put(vec![1u8], vec![1u8]);
        leader.write(batch).unwrap();
        let r1 = leader.get_merkle_root();

        let follower = FollowerDb::<Blake3Hasher>::from_snapshot(
            [(vec![1u8], vec![1u8])].into_iter().collect(),
        );

        let mut batch = leader.new_batch();
        batch.put(vec![2u8], vec![2u8]);
        leader.write(batch).unwrap();
        let r2 = leader.get_merkle_root();

        let mut proof = leader.get_change_proof(r1, r2, None, None, 50).unwrap();
        proof.key_changes[0].value = Maybe::Some(vec![0xFF]);

        let result = follower.verify_change_proof(&proof, None, None, r2);
        assert!(result.is_err());
        assert_eq!(follower.get_merkle_root(), r1);
        assert_eq!(follower.get(&[2u8]), None);
    }

    #[test]
    fn missing_history_proof_has_empty_batch() {
        let follower = FollowerDb::<Blake3Hasher>::new();
        let proof = ChangeProof {
            had_roots_in_history: false,
            start_proof: Vec::new(),
            end_proof: Vec::new(),
            key_changes: Vec::new(),
        };
        let pending = follower
            .verify_change_proof(&proof, None, None, EMPTY_TRIE_ROOT)
            .unwrap();
        assert!(pending.is_empty());
    }

    #[test]
    fn missing_history_proof_is_accepted_even_against_a_far_off_true_root() {
        // The follower sits at a non-empty root of its own. The sender's `start_root` has aged
        // out of its history, so it sends back a false proof alongside its own true, unrelated
        // current root -- the follower must accept this as the fall-back-to-range-sync signal,
        // not reject it for failing to already equal that root.
        let follower = FollowerDb::<Blake3Hasher>::from_snapshot(
            [(vec![1u8], vec![1u8])].into_iter().collect(),
        );
        let follower_root = follower.get_merkle_root();

        let mut leader = ReferenceTrie::<Blake3Hasher>::new(Config::default());
        let mut batch = leader.new_batch();
        for k in 10u8..20 {
            batch.put(vec![k], vec![k]);
        }
        leader.write(batch).unwrap();
        let true_current_root = leader.get_merkle_root();
        assert_ne!(true_current_root, follower_root);

        let proof = ChangeProof {
            had_roots_in_history: false,
            start_proof: Vec::new(),
            end_proof: Vec::new(),
            key_changes: Vec::new(),
        };
        let pending = follower
            .verify_change_proof(&proof, None, None, true_current_root)
            .unwrap();
        assert!(pending.is_empty());
        assert_eq!(pending.end_root(), follower_root);
        assert_ne!(pending.end_root(), true_current_root);
        assert_eq!(follower.get_merkle_root(), follower_root, "verify must not mutate");
    }
}
