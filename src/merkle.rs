// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Merkle commitments over public randomness.
//!
//! A finality provider commits the public randomness for every block of an
//! epoch as a single Keccak-256 Merkle root over [`Leaf`] hashes. Internal
//! nodes use ordered-pair hashing: the smaller child always hashes first, so
//! proofs carry no left/right position bits. An odd node at any level is
//! promoted to the next level unhashed.

use crate::{
    curve::keccak256,
    errors::{CallerError, Result},
};
use serde::{Deserialize, Serialize};

/// One public randomness commitment: the nonce point x-coordinate for a
/// single block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaf {
    /// The rollup block this randomness is reserved for.
    pub block_number: u64,
    /// The x-coordinate of the nonce point `k·G`.
    pub pub_rand: [u8; 32],
}

impl Leaf {
    /// Construct a leaf.
    pub fn new(block_number: u64, pub_rand: [u8; 32]) -> Self {
        Self {
            block_number,
            pub_rand,
        }
    }

    /// Hash the leaf: `Keccak256( pad32(u64_be(block_number)) ‖ pub_rand )`,
    /// the block number left-padded to a full 32-byte word.
    pub fn hash(&self) -> [u8; 32] {
        let mut preimage = [0u8; 64];
        preimage[24..32].copy_from_slice(&self.block_number.to_be_bytes());
        preimage[32..].copy_from_slice(&self.pub_rand);
        keccak256(&preimage)
    }
}

/// Hash an internal node: `Keccak256( min(a,b) ‖ max(a,b) )`, comparing the
/// children lexicographically.
pub(crate) fn hash_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut preimage = [0u8; 64];
    if a <= b {
        preimage[..32].copy_from_slice(a);
        preimage[32..].copy_from_slice(b);
    } else {
        preimage[..32].copy_from_slice(b);
        preimage[32..].copy_from_slice(a);
    }
    keccak256(&preimage)
}

/// Walk `proof` up from `leaf_hash`, applying ordered-pair hashing, and
/// check that the folded value equals `root`.
pub fn verify_proof(root: &[u8; 32], leaf_hash: [u8; 32], proof: &[[u8; 32]]) -> bool {
    let folded = proof
        .iter()
        .fold(leaf_hash, |node, sibling| hash_pair(&node, sibling));
    &folded == root
}

/// Compute the Merkle root over the given leaf hashes.
///
/// This is the committer-side counterpart of [`verify_proof`]: finality
/// providers build their epoch commitment with it.
pub fn merkle_root(leaf_hashes: &[[u8; 32]]) -> Result<[u8; 32]> {
    if leaf_hashes.is_empty() {
        Err(CallerError::DataEmpty)?;
    }
    let mut level = leaf_hashes.to_vec();
    while level.len() > 1 {
        level = next_level(&level);
    }
    Ok(level[0])
}

/// Compute the Merkle proof for the leaf at `index`.
pub fn merkle_proof(leaf_hashes: &[[u8; 32]], index: usize) -> Result<Vec<[u8; 32]>> {
    if leaf_hashes.is_empty() {
        Err(CallerError::DataEmpty)?;
    }
    if index >= leaf_hashes.len() {
        Err(CallerError::BadInput)?;
    }

    let mut proof = Vec::new();
    let mut level = leaf_hashes.to_vec();
    let mut position = index;
    while level.len() > 1 {
        let sibling = if position % 2 == 0 {
            position + 1
        } else {
            position - 1
        };
        // The last node of an odd-length level has no sibling; it is
        // promoted and contributes no proof element.
        if sibling < level.len() {
            proof.push(level[sibling]);
        }
        level = next_level(&level);
        position /= 2;
    }
    Ok(proof)
}

fn next_level(nodes: &[[u8; 32]]) -> Vec<[u8; 32]> {
    nodes
        .chunks(2)
        .map(|pair| match pair {
            [a, b] => hash_pair(a, b),
            [a] => *a,
            _ => unreachable!("chunks(2) yields one- or two-element slices"),
        })
        .collect()
}
