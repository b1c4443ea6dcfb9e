//! The proof data model and its verifiers: point, range, and change proofs (§3.3-§3.6, §4.3-§4.6).

mod change;
mod fragment;
mod node;
mod path_sanity;
mod point;
mod range;

pub use change::{ChangeProof, KeyChange};
pub use node::ProofNode;
pub use point::{Proof, ProofValue};
pub use range::{KeyValue, RangeProof};
