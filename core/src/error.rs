//! Named error kinds returned by the proof data model and its verifiers.
//!
//! Every kind here is wire-stable: once assigned, a variant's meaning must not change,
//! since callers on both sides of a sync session match on it.

use core::fmt;

/// A failure encountered while validating, decoding, or verifying a proof.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofError {
    /// A point proof had an empty path.
    NoProof,
    /// Root hash recomputed from a proof did not match the expected root.
    InvalidProof,
    /// A `ProofNode` has an odd-length key path but carries a value.
    OddLengthWithValue,
    /// The claimed value does not match the terminal node's `value_or_hash`.
    ProofValueDoesntMatch,
    /// A range or change proof carried no content and no fringe proof at all.
    NoMerkleProof,
    /// Proof claims the whole trie but `end_proof` is not exactly the root node.
    ShouldJustBeRoot,
    /// Content is present but no `end_proof` was supplied.
    NoEndProof,
    /// A bound was given but no `start_proof` was supplied.
    NoStartProof,
    /// `start` is strictly greater than `end`.
    StartAfterEnd,
    /// Keys within a proof's key-value or key-change list are not strictly increasing.
    NonIncreasingValues,
    /// A key or proof fringe lies outside the claimed `[start, end]` bound.
    StateFromOutsideOfRange,
    /// A proof node's `key_path` is not a prefix of the path being proven.
    ProofNodeNotForKey,
    /// Adjacent proof nodes are not in strict nibble-prefix order.
    NonIncreasingProofNodes,
    /// A proof node's claimed value was not included among the range's key-values.
    ProofNodeHasUnincludedValue,
    /// A change proof with `had_roots_in_history = false` carried proof data.
    DataInMissingRootProof,
    /// `max_len` passed to a range/change proof request was not positive.
    InvalidMaxLength,
    /// An `Optional` wire value claimed absence while carrying bytes (or vice versa).
    InvalidMaybe,
    /// A child digest was not exactly 32 bytes.
    InvalidHashLen,
    /// A child nibble index was not in `0..16`.
    InvalidChildIndex,
    /// The wire record for a `Proof` was absent.
    NilProof,
    /// The wire record for a `ProofNode` was absent.
    NilProofNode,
    /// The wire record for a `ChangeProof` was absent.
    NilChangeProof,
    /// `Proof::value` was absent at the wire level (distinct from `Optional::Absent`).
    NilValue,
    /// `ProofNode::value_or_hash` was absent at the wire level.
    NilValueOrHash,
    /// `ProofNode::key_path` was absent at the wire level.
    NilSerializedPath,
    /// A per-change `Optional` value in a `ChangeProof` was absent at the wire level.
    NilMaybeBytes,
    /// A `SerializedPath`'s nibble length and packed bytes are mutually inconsistent.
    ///
    /// Not named in the protocol's original error taxonomy; added because Rust's codec
    /// validates structural invariants the source language left to unchecked pointer math.
    MalformedSerializedPath,
}

impl fmt::Display for ProofError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NoProof => "proof has no path",
            Self::InvalidProof => "proof root does not match expected root",
            Self::OddLengthWithValue => "proof node has odd-length key path with a value",
            Self::ProofValueDoesntMatch => "proof value does not match proof path",
            Self::NoMerkleProof => "proof has no merkle proof",
            Self::ShouldJustBeRoot => "end proof should only contain the root",
            Self::NoEndProof => "no end proof given for non-empty range",
            Self::NoStartProof => "no start proof given for bounded range",
            Self::StartAfterEnd => "start key is after end key",
            Self::NonIncreasingValues => "keys are not strictly increasing",
            Self::StateFromOutsideOfRange => "proof contains state outside of the requested range",
            Self::ProofNodeNotForKey => "proof node is not for the provided key",
            Self::NonIncreasingProofNodes => "proof nodes are not in increasing order",
            Self::ProofNodeHasUnincludedValue => "proof node has a value not included in key-values",
            Self::DataInMissingRootProof => "proof without roots in history should not have data",
            Self::InvalidMaxLength => "maximum length must be positive",
            Self::InvalidMaybe => "optional value claims absence while carrying bytes",
            Self::InvalidHashLen => "hash length is invalid",
            Self::InvalidChildIndex => "child index is invalid",
            Self::NilProof => "proof is nil",
            Self::NilProofNode => "proof node is nil",
            Self::NilChangeProof => "change proof is nil",
            Self::NilValue => "proof value is nil",
            Self::NilValueOrHash => "proof node's value_or_hash is nil",
            Self::NilSerializedPath => "proof node's key path is nil",
            Self::NilMaybeBytes => "change proof's optional bytes is nil",
            Self::MalformedSerializedPath => "serialized path is structurally inconsistent",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProofError {}
