//! Core Merkle-radix proof data model and verification algorithms.
//!
//! This crate is deliberately inert: it defines the wire-level proof types, the nibble-path
//! addressing scheme, node hashing, and the point/range/change proof verifiers, but it does
//! not own a trie, a store, or any I/O. A caller supplies digests and authenticated fragments;
//! this crate tells them whether those fragments are internally consistent and match an
//! expected root.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod codec;
pub mod error;
pub mod hasher;
pub mod maybe;
pub mod nibble;
pub mod proof;

pub use error::ProofError;
pub use hasher::{Digest, NodeHasher, EMPTY_TRIE_ROOT, INLINE_VALUE_THRESHOLD};
pub use maybe::Maybe;
pub use nibble::{NibblePath, SerializedPath, BRANCHING_FACTOR};
pub use proof::{ChangeProof, KeyChange, KeyValue, Proof, ProofNode, ProofValue, RangeProof};

#[cfg(feature = "blake3-hasher")]
pub use hasher::Blake3Hasher;
#[cfg(feature = "sha2-hasher")]
pub use hasher::Sha256Hasher;
