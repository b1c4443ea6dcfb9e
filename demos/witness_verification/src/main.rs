//! End-to-end walkthrough of the three proof kinds the workspace implements: build a point
//! proof, a range proof, and a change proof against a [`ReferenceTrie`], verify each one, and
//! apply the change proof to a [`FollowerDb`] so its root catches up with the leader's.

use anyhow::Result;
use mrp::{Blake3Hasher, Config, FollowerDb, ReferenceTrie};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut leader = ReferenceTrie::<Blake3Hasher>::new(Config::default());
    let mut batch = leader.new_batch();
    for k in 0u8..5 {
        batch.put(vec![k], vec![k]);
    }
    leader.write(batch)?;
    let r1 = leader.get_merkle_root();
    println!("leader root after initial batch: {}", hex::encode(r1));

    // Point proof: key 0x02 is present.
    let point_proof = leader.get_proof(&[0x02]);
    point_proof.verify::<Blake3Hasher>(r1)?;
    println!(
        "point proof for key=02 value={:?} verified against root {}",
        point_proof.value,
        hex::encode(r1)
    );

    // Point proof: key 0x0F is absent.
    let exclusion_proof = leader.get_proof(&[0x0F]);
    exclusion_proof.verify::<Blake3Hasher>(r1)?;
    println!("exclusion proof for key=0f verified (value is absent, as expected)");

    // Range proof over [0x01, 0x03].
    let range_proof = leader.get_range_proof(Some(&[0x01]), Some(&[0x03]), 10)?;
    range_proof.verify::<Blake3Hasher>(Some(&[0x01]), Some(&[0x03]), r1)?;
    println!(
        "range proof over [01, 03] carries {} key-value pairs, verified",
        range_proof.key_values.len()
    );

    // Seed a follower at the same state as the leader, then advance the leader and ship it a
    // change proof instead of a full range sync.
    let mut follower = FollowerDb::<Blake3Hasher>::from_snapshot(
        (0u8..5).map(|k| (vec![k], vec![k])).collect(),
    );
    assert_eq!(follower.get_merkle_root(), r1);

    let mut batch = leader.new_batch();
    for k in 5u8..8 {
        batch.put(vec![k], vec![k]);
    }
    batch.delete(vec![1u8]);
    leader.write(batch)?;
    let r2 = leader.get_merkle_root();
    println!("leader root after second batch: {}", hex::encode(r2));

    let change_proof = leader.get_change_proof(r1, r2, None, None, 50)?;
    let pending = follower.verify_change_proof(&change_proof, None, None, r2)?;
    println!(
        "change proof carries {} key changes, verified against root {}",
        pending.len(),
        hex::encode(r2)
    );
    let follower_root = follower.commit_change_proof(pending);
    assert_eq!(follower_root, r2);
    assert_eq!(follower.get(&[1u8]), None);
    assert_eq!(follower.get(&[7u8]), Some(&[7u8][..]));
    println!("follower caught up to leader root {}", hex::encode(follower_root));

    Ok(())
}
