// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The public randomness registry.
//!
//! Finality providers commit one Merkle root per epoch, covering the public
//! randomness for every block in that epoch's window. A commitment is gated
//! by a proof of possession: a Schnorr signature over the canonical commit
//! message, produced with the provider's BTC key. Once written, a commitment
//! is immutable; there is no update and no delete.

use crate::{
    config::FinalityConfig,
    curve::keccak256,
    errors::{CallerError, InternalError, Result},
    keys::FpPublicKey,
    merkle::{self, Leaf},
    schnorr::SchnorrSignature,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::Mutex,
};
use tracing::{error, info};

/// Event emitted on a successful public randomness commitment.
///
/// The registry also records the event as a structured `tracing` record;
/// hosts that need to fan events out to subscribers forward the returned
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitPubRandBatch {
    /// The epoch the commitment covers.
    pub epoch: u64,
    /// The committing finality provider.
    pub fp_key: FpPublicKey,
    /// The committed Merkle root.
    pub merkle_root: [u8; 32],
}

/// Compute the canonical commit message preimage hash,
/// `Keccak256( u64_be(epoch) ‖ fpKey ‖ merkleRoot )`.
///
/// Finality providers sign this digest to produce the proof of possession;
/// the registry recomputes it and rejects any commitment whose proof signs
/// something else.
pub fn commit_message(epoch: u64, fp_key: &FpPublicKey, merkle_root: &[u8; 32]) -> [u8; 32] {
    let preimage = [
        epoch.to_be_bytes().as_slice(),
        fp_key.as_bytes().as_slice(),
        merkle_root.as_slice(),
    ]
    .concat();
    keccak256(&preimage)
}

/// Storage for per-epoch public randomness commitments, keyed by
/// `(epoch, provider key)`.
///
/// The map is process-wide state: it starts empty and lives as long as its
/// owner. The check-then-write sequence in [`commit`](Self::commit) is
/// serialized under a single lock; readers copy the root out so concurrent
/// verification holds a snapshot.
#[derive(Debug, Default)]
pub struct PubRandRegistry {
    roots: Mutex<HashMap<(u64, FpPublicKey), [u8; 32]>>,
}

impl PubRandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a Merkle root of public randomness for `(epoch, fp_key)`.
    ///
    /// The commitment is validated in order:
    /// 1. The epoch must not have ended: its last block must be past
    ///    `current_block`, else [`CallerError::InvalidBlockRange`].
    /// 2. `proof_of_possession` must unpack as a packed Schnorr signature.
    /// 3. The signed message must equal the canonical [`commit_message`],
    ///    else [`CallerError::MessageMismatch`].
    /// 4. The signature must verify, else
    ///    [`CallerError::InvalidProofOfPossession`].
    /// 5. The slot must be empty, else [`CallerError::DuplicateBatch`].
    pub fn commit(
        &self,
        config: &FinalityConfig,
        current_block: u64,
        epoch: u64,
        fp_key: &FpPublicKey,
        proof_of_possession: &[u8],
        merkle_root: [u8; 32],
    ) -> Result<CommitPubRandBatch> {
        let (_, to_block) = config.block_range(epoch)?;
        if to_block <= current_block {
            error!("Cannot commit public randomness for an epoch that has ended");
            Err(CallerError::InvalidBlockRange)?;
        }

        let pop = SchnorrSignature::unpack(proof_of_possession)?;

        let expected = commit_message(epoch, fp_key, &merkle_root);
        if pop.message() != &expected {
            error!("Proof of possession signs a different commit message than the one requested");
            Err(CallerError::MessageMismatch {
                expected,
                actual: *pop.message(),
            })?;
        }

        // Any verification failure is the same caller mistake here: the
        // proof does not demonstrate possession of the claimed key.
        match pop.verify() {
            Ok(true) => {}
            _ => {
                error!("Proof of possession failed Schnorr verification");
                Err(CallerError::InvalidProofOfPossession)?;
            }
        }

        let mut roots = self.roots.lock().map_err(|_| {
            error!("Public randomness registry lock was poisoned");
            InternalError::InternalInvariantFailed
        })?;
        if roots.contains_key(&(epoch, *fp_key)) {
            Err(CallerError::DuplicateBatch)?;
        }
        let _ = roots.insert((epoch, *fp_key), merkle_root);
        drop(roots);

        info!(
            epoch,
            fp_key = %fp_key,
            merkle_root = %hex::encode(merkle_root),
            "committed public randomness batch"
        );
        Ok(CommitPubRandBatch {
            epoch,
            fp_key: *fp_key,
            merkle_root,
        })
    }

    /// The committed root for `(epoch, fp_key)`, if any.
    pub fn root_at(&self, epoch: u64, fp_key: &FpPublicKey) -> Option<[u8; 32]> {
        match self.roots.lock() {
            Ok(roots) => roots.get(&(epoch, *fp_key)).copied(),
            Err(_) => {
                error!("Public randomness registry lock was poisoned");
                None
            }
        }
    }

    /// Check that `pub_rand` is the committed randomness for `at_block`
    /// under the root stored for `(epoch, fp_key)`.
    ///
    /// Returns `false` when no root is committed or the proof does not open
    /// to the stored root.
    pub fn verify_pub_rand_at_block(
        &self,
        epoch: u64,
        fp_key: &FpPublicKey,
        at_block: u64,
        pub_rand: [u8; 32],
        proof: &[[u8; 32]],
    ) -> bool {
        let Some(root) = self.root_at(epoch, fp_key) else {
            return false;
        };
        let leaf_hash = Leaf::new(at_block, pub_rand).hash();
        merkle::verify_proof(&root, leaf_hash, proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        eots,
        keys::{PrivateRandomness, SigningKey},
        merkle::{merkle_proof, merkle_root},
        utils::testing::init_testing,
    };
    use rand::{rngs::StdRng, Rng};

    /// A finality provider with randomness committed for blocks 5..=8 of
    /// epoch 1 under the scenario configuration (start block 5, epoch size
    /// 4).
    struct TestProvider {
        signing_key: SigningKey,
        fp_key: FpPublicKey,
        leaves: Vec<Leaf>,
        hashes: Vec<[u8; 32]>,
        root: [u8; 32],
    }

    fn config() -> FinalityConfig {
        FinalityConfig::new(1, 5, 4).unwrap()
    }

    fn test_provider(rng: &mut StdRng) -> TestProvider {
        // Half of all sampled keys have an x-coordinate above the kernel's
        // bound; retry until one is accepted.
        let signing_key = loop {
            let candidate = SigningKey::random(rng);
            if candidate.public_key().is_ok() {
                break candidate;
            }
        };
        let fp_key = signing_key.public_key().unwrap();

        let leaves: Vec<Leaf> = (5..=8)
            .map(|block| {
                let randomness = PrivateRandomness::random(rng);
                Leaf::new(block, randomness.public_randomness())
            })
            .collect();
        let hashes: Vec<_> = leaves.iter().map(Leaf::hash).collect();
        let root = merkle_root(&hashes).unwrap();

        TestProvider {
            signing_key,
            fp_key,
            leaves,
            hashes,
            root,
        }
    }

    fn proof_of_possession(rng: &mut StdRng, provider: &TestProvider, epoch: u64) -> Vec<u8> {
        let message = commit_message(epoch, &provider.fp_key, &provider.root);
        let nonce = PrivateRandomness::random(rng);
        let signature = eots::sign(&provider.signing_key, &nonce, &message).unwrap();
        SchnorrSignature::new(
            provider.fp_key.parity(),
            provider.fp_key.x_bytes(),
            message,
            *signature.challenge(),
            *signature.signature(),
        )
        .pack()
    }

    #[test]
    fn commit_then_open_every_block_of_the_epoch() {
        let rng = &mut init_testing();
        let provider = test_provider(rng);
        let pop = proof_of_possession(rng, &provider, 1);
        let registry = PubRandRegistry::new();

        let event = registry
            .commit(&config(), 4, 1, &provider.fp_key, &pop, provider.root)
            .unwrap();
        assert_eq!(
            event,
            CommitPubRandBatch {
                epoch: 1,
                fp_key: provider.fp_key,
                merkle_root: provider.root,
            }
        );

        for (index, leaf) in provider.leaves.iter().enumerate() {
            let proof = merkle_proof(&provider.hashes, index).unwrap();
            assert!(registry.verify_pub_rand_at_block(
                1,
                &provider.fp_key,
                leaf.block_number,
                leaf.pub_rand,
                &proof,
            ));
        }
    }

    #[test]
    fn commit_for_an_ended_epoch_fails() {
        let rng = &mut init_testing();
        let provider = test_provider(rng);
        let pop = proof_of_possession(rng, &provider, 1);
        let registry = PubRandRegistry::new();

        // Epoch 1 ends at block 8; committing at or past that height fails.
        for current_block in [8, 9, 100] {
            assert_eq!(
                registry.commit(
                    &config(),
                    current_block,
                    1,
                    &provider.fp_key,
                    &pop,
                    provider.root
                ),
                Err(CallerError::InvalidBlockRange.into())
            );
        }

        // One block before the end is still accepted.
        assert!(registry
            .commit(&config(), 7, 1, &provider.fp_key, &pop, provider.root)
            .is_ok());
    }

    #[test]
    fn duplicate_commit_fails_even_with_identical_arguments() {
        let rng = &mut init_testing();
        let provider = test_provider(rng);
        let pop = proof_of_possession(rng, &provider, 1);
        let registry = PubRandRegistry::new();

        assert!(registry
            .commit(&config(), 4, 1, &provider.fp_key, &pop, provider.root)
            .is_ok());
        assert_eq!(
            registry.commit(&config(), 4, 1, &provider.fp_key, &pop, provider.root),
            Err(CallerError::DuplicateBatch.into())
        );

        // A different epoch is a different slot and commits fine.
        let pop2 = proof_of_possession(rng, &provider, 2);
        assert!(registry
            .commit(&config(), 4, 2, &provider.fp_key, &pop2, provider.root)
            .is_ok());
    }

    #[test]
    fn commit_message_mismatch_reports_both_digests() {
        let rng = &mut init_testing();
        let provider = test_provider(rng);
        let registry = PubRandRegistry::new();

        // The proof signs the real root, but the commit claims another.
        let pop = proof_of_possession(rng, &provider, 1);
        let other_root: [u8; 32] = rng.gen();
        let expected = commit_message(1, &provider.fp_key, &other_root);
        let actual = commit_message(1, &provider.fp_key, &provider.root);

        assert_eq!(
            registry.commit(&config(), 4, 1, &provider.fp_key, &pop, other_root),
            Err(CallerError::MessageMismatch { expected, actual }.into())
        );
    }

    #[test]
    fn misaligned_public_key_fails_possession_check() {
        let rng = &mut init_testing();
        let provider = test_provider(rng);
        let registry = PubRandRegistry::new();

        // Take the x-coordinate from the wrong offset of the compressed
        // key (bytes 0..32 instead of 1..33).
        let misaligned: [u8; 32] = provider.fp_key.as_bytes()[..32].try_into().unwrap();
        let message = commit_message(1, &provider.fp_key, &provider.root);
        let nonce = PrivateRandomness::random(rng);
        let signature = eots::sign(&provider.signing_key, &nonce, &message).unwrap();
        let pop = SchnorrSignature::new(
            provider.fp_key.parity(),
            misaligned,
            message,
            *signature.challenge(),
            *signature.signature(),
        )
        .pack();

        assert_eq!(
            registry.commit(&config(), 4, 1, &provider.fp_key, &pop, provider.root),
            Err(CallerError::InvalidProofOfPossession.into())
        );
    }

    #[test]
    fn absent_commitments_never_verify() {
        let rng = &mut init_testing();
        let provider = test_provider(rng);
        let registry = PubRandRegistry::new();

        let proof = merkle_proof(&provider.hashes, 0).unwrap();
        assert!(!registry.verify_pub_rand_at_block(
            1,
            &provider.fp_key,
            5,
            provider.leaves[0].pub_rand,
            &proof,
        ));
    }

    #[test]
    fn wrong_pub_rand_does_not_verify() {
        let rng = &mut init_testing();
        let provider = test_provider(rng);
        let pop = proof_of_possession(rng, &provider, 1);
        let registry = PubRandRegistry::new();
        registry
            .commit(&config(), 4, 1, &provider.fp_key, &pop, provider.root)
            .unwrap();

        // Open block 5 with the randomness committed for block 6, using
        // block 5's (otherwise correct) proof. No error, just `false`.
        let proof = merkle_proof(&provider.hashes, 0).unwrap();
        assert!(!registry.verify_pub_rand_at_block(
            1,
            &provider.fp_key,
            5,
            provider.leaves[1].pub_rand,
            &proof,
        ));
    }
}
