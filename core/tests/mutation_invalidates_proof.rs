//! Single-field mutation coverage (§8 invariant 2): for a valid proof of any kind, changing
//! exactly one field anywhere in it must make verification fail. Each test starts from a proof
//! known to verify, applies one mutation, and asserts the mutated proof no longer does --
//! deliberately not asserting *which* error comes back beyond what's already pinned down in
//! `scenario_seeds.rs`, since a one-field tamper can surface as a hash mismatch, a path-order
//! violation, or a value mismatch depending on which field moved.

use mrp_core::hasher::{represent_value, Blake3Hasher};
use mrp_core::{
    ChangeProof, KeyChange, KeyValue, Maybe, NibblePath, NodeHasher, Proof, ProofNode, RangeProof,
};

fn leaf(key: &[u8], value: &[u8]) -> ProofNode {
    let mut node = ProofNode::new(NibblePath::from_bytes(key));
    node.value_or_hash = Maybe::Some(represent_value::<Blake3Hasher>(value));
    node
}

fn root_with(children: &[(u8, mrp_core::Digest)]) -> ProofNode {
    let mut node = ProofNode::new(NibblePath::empty());
    for &(i, d) in children {
        node.set_child(i as usize, d);
    }
    node
}

struct PointFixture {
    root: ProofNode,
    branch: ProofNode,
    leaf: ProofNode,
    root_digest: mrp_core::Digest,
}

fn point_fixture() -> PointFixture {
    let leaf_node = leaf(b"\x02\x03", b"value");
    let leaf_digest = Blake3Hasher::hash_node(&leaf_node);
    let mut branch = ProofNode::new(NibblePath::from_bytes(b"\x02"));
    branch.set_child(0, leaf_digest);
    let branch_digest = Blake3Hasher::hash_node(&branch);
    let root = root_with(&[(0, branch_digest)]);
    let root_digest = Blake3Hasher::hash_node(&root);
    PointFixture {
        root,
        branch,
        leaf: leaf_node,
        root_digest,
    }
}

fn base_point_proof(f: &PointFixture) -> Proof {
    Proof {
        key: vec![0x02, 0x03],
        value: Maybe::Some(b"value".to_vec()),
        path: vec![f.root.clone(), f.branch.clone(), f.leaf.clone()],
    }
}

#[test]
fn point_proof_mutations_each_invalidate() {
    let fixture = point_fixture();
    let base = base_point_proof(&fixture);
    assert!(base.verify::<Blake3Hasher>(fixture.root_digest).is_ok());

    let mut wrong_key = base.clone();
    wrong_key.key = vec![0x02, 0x04];
    assert!(wrong_key.verify::<Blake3Hasher>(fixture.root_digest).is_err());

    let mut wrong_value = base.clone();
    wrong_value.value = Maybe::Some(b"other".to_vec());
    assert!(wrong_value
        .verify::<Blake3Hasher>(fixture.root_digest)
        .is_err());

    let mut wrong_value_kind = base.clone();
    wrong_value_kind.value = Maybe::Absent;
    assert!(wrong_value_kind
        .verify::<Blake3Hasher>(fixture.root_digest)
        .is_err());

    let mut dropped_ancestor = base.clone();
    dropped_ancestor.path.remove(1); // drop the branch, leaving root -> leaf directly
    assert!(dropped_ancestor
        .verify::<Blake3Hasher>(fixture.root_digest)
        .is_err());

    let mut reordered = base.clone();
    reordered.path.swap(0, 1);
    assert!(reordered.verify::<Blake3Hasher>(fixture.root_digest).is_err());

    let mut tampered_leaf_value = base.clone();
    tampered_leaf_value.path[2].value_or_hash = Maybe::Some(b"forged".to_vec());
    assert!(tampered_leaf_value
        .verify::<Blake3Hasher>(fixture.root_digest)
        .is_err());

    let mut tampered_branch_child = base.clone();
    tampered_branch_child.path[1].set_child(5, [0xAB; 32]);
    assert!(tampered_branch_child
        .verify::<Blake3Hasher>(fixture.root_digest)
        .is_err());

    let mut tampered_root_key_path = base.clone();
    tampered_root_key_path.path[0] = ProofNode::new(NibblePath::from_bytes(b"\x00").prefix(1));
    assert!(tampered_root_key_path
        .verify::<Blake3Hasher>(fixture.root_digest)
        .is_err());

    let wrong_root = [0x11u8; 32];
    assert!(base.verify::<Blake3Hasher>(wrong_root).is_err());
}

struct RangeFixture {
    root: ProofNode,
    branch: ProofNode,
    leaves: Vec<ProofNode>,
    root_digest: mrp_core::Digest,
}

fn range_fixture() -> RangeFixture {
    let leaves: Vec<ProofNode> = (0u8..5).map(|k| leaf(&[k], &[k])).collect();
    let digests: Vec<_> = leaves.iter().map(Blake3Hasher::hash_node).collect();
    let mut branch = ProofNode::new(NibblePath::from_bytes(&[0]).prefix(1));
    for (i, d) in digests.iter().enumerate() {
        branch.set_child(i, *d);
    }
    let branch_digest = Blake3Hasher::hash_node(&branch);
    let root = root_with(&[(0, branch_digest)]);
    let root_digest = Blake3Hasher::hash_node(&root);
    RangeFixture {
        root,
        branch,
        leaves,
        root_digest,
    }
}

#[test]
fn range_proof_mutations_each_invalidate() {
    let fixture = range_fixture();

    let key_values: Vec<KeyValue> = (1u8..4)
        .map(|k| KeyValue {
            key: vec![k],
            value: vec![k],
        })
        .collect();
    let base = RangeProof {
        start_proof: vec![
            fixture.root.clone(),
            fixture.branch.clone(),
            fixture.leaves[1].clone(),
        ],
        end_proof: vec![
            fixture.root.clone(),
            fixture.branch.clone(),
            fixture.leaves[3].clone(),
        ],
        key_values,
    };
    assert!(base
        .verify::<Blake3Hasher>(Some(&[1]), Some(&[3]), fixture.root_digest)
        .is_ok());

    let mut dropped_kv = base.clone();
    dropped_kv.key_values.remove(1);
    assert!(dropped_kv
        .verify::<Blake3Hasher>(Some(&[1]), Some(&[3]), fixture.root_digest)
        .is_err());

    let mut wrong_value = base.clone();
    wrong_value.key_values[0].value = vec![0xFF];
    assert!(wrong_value
        .verify::<Blake3Hasher>(Some(&[1]), Some(&[3]), fixture.root_digest)
        .is_err());

    let mut out_of_order = base.clone();
    out_of_order.key_values.swap(0, 2);
    assert!(out_of_order
        .verify::<Blake3Hasher>(Some(&[1]), Some(&[3]), fixture.root_digest)
        .is_err());

    let mut dropped_start_proof = base.clone();
    dropped_start_proof.start_proof.clear();
    assert!(dropped_start_proof
        .verify::<Blake3Hasher>(Some(&[1]), Some(&[3]), fixture.root_digest)
        .is_err());

    let mut dropped_end_proof = base.clone();
    dropped_end_proof.end_proof.clear();
    assert!(dropped_end_proof
        .verify::<Blake3Hasher>(Some(&[1]), Some(&[3]), fixture.root_digest)
        .is_err());
}

#[test]
fn change_proof_mutations_each_invalidate() {
    let leaf_node = leaf(&[2], &[2]);
    let leaf_digest = Blake3Hasher::hash_node(&leaf_node);
    let root = root_with(&[(0, leaf_digest)]);
    let root_digest = Blake3Hasher::hash_node(&root);

    let base = ChangeProof {
        had_roots_in_history: true,
        start_proof: vec![root.clone(), leaf_node.clone()],
        end_proof: vec![root, leaf_node],
        key_changes: vec![KeyChange {
            key: vec![2],
            value: Maybe::Some(vec![2]),
        }],
    };
    assert!(base
        .verify::<Blake3Hasher>(Some(&[2]), Some(&[2]), root_digest)
        .is_ok());

    let mut wrong_value = base.clone();
    wrong_value.key_changes[0].value = Maybe::Some(vec![0xFF]);
    assert!(wrong_value
        .verify::<Blake3Hasher>(Some(&[2]), Some(&[2]), root_digest)
        .is_err());

    let mut turned_into_deletion = base.clone();
    turned_into_deletion.key_changes[0].value = Maybe::Absent;
    assert!(turned_into_deletion
        .verify::<Blake3Hasher>(Some(&[2]), Some(&[2]), root_digest)
        .is_err());

    let mut flipped_history_flag = base.clone();
    flipped_history_flag.had_roots_in_history = false;
    assert!(flipped_history_flag
        .verify::<Blake3Hasher>(Some(&[2]), Some(&[2]), root_digest)
        .is_err());

    let mut dropped_end_proof = base.clone();
    dropped_end_proof.end_proof.clear();
    assert!(dropped_end_proof
        .verify::<Blake3Hasher>(Some(&[2]), Some(&[2]), root_digest)
        .is_err());
}
