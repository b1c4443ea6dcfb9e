//! Reference trie, follower database, and supporting types for the Merkle-radix proof system
//! whose wire formats and verification algorithms live in `mrp-core`.
//!
//! This crate is the "std" half of the split: it owns I/O-adjacent concerns (a key-value
//! backed trie, a bounded history of past roots, a follower that applies verified diffs) that
//! `mrp-core` deliberately stays ignorant of so the core proof types can be verified in a
//! `no_std` context.

pub mod config;
pub mod follower;
pub mod trie;

pub use config::Config;
pub use follower::{FollowerDb, PendingChangeBatch};
pub use trie::{Batch, ReferenceTrie};

pub use mrp_core::{
    ChangeProof, Digest, KeyChange, KeyValue, Maybe, NibblePath, NodeHasher, Proof, ProofError,
    ProofNode, RangeProof, EMPTY_TRIE_ROOT,
};

#[cfg(feature = "blake3-hasher")]
pub use mrp_core::Blake3Hasher;
#[cfg(feature = "sha2-hasher")]
pub use mrp_core::Sha256Hasher;
