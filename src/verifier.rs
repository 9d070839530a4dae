// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Quorum verification of EOTS submissions.
//!
//! A block is final once finality providers controlling at least two thirds
//! of the chain's voting power at that height have produced valid EOTS
//! signatures over the block's output root, each tied to randomness they
//! committed ahead of time. Submissions are verified independently, one by
//! one; there is no signature aggregation. If a future version adopts an
//! aggregated scheme, the submission type should grow into a sum over
//! individual and aggregated variants rather than being retrofitted.

use crate::{
    config::FinalityConfig,
    errors::{CallerError, Result},
    keys::FpPublicKey,
    oracle::FinalityOracle,
    registry::{CommitPubRandBatch, PubRandRegistry},
    schnorr,
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// One finality provider's vote for a block: its EOTS signature over the
/// output root, plus the Merkle opening tying the signature's randomness to
/// the provider's epoch commitment.
///
/// All fields are caller-supplied and verified, never mutated. Repeated
/// submissions of the same key are not deduplicated here; callers are
/// expected to pre-dedupe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EotsSubmission {
    /// The submitting finality provider.
    pub fp_key: FpPublicKey,
    /// The public randomness claimed for the block.
    pub pub_rand: [u8; 32],
    /// Merkle siblings opening `pub_rand` under the committed root.
    pub proof: Vec<[u8; 32]>,
    /// Recovery parity of the signing key.
    pub parity: u8,
    /// x-coordinate of the signing key.
    pub px: [u8; 32],
    /// The challenge scalar `e`.
    pub challenge: [u8; 32],
    /// The signature scalar `s`.
    pub signature: [u8; 32],
}

/// The finality verifier: the public randomness registry plus the quorum
/// rule, bound to one chain configuration and one voting power oracle.
#[derive(Debug)]
pub struct EotsVerifier<O> {
    config: FinalityConfig,
    oracle: O,
    registry: PubRandRegistry,
}

impl<O: FinalityOracle> EotsVerifier<O> {
    /// Create a verifier with an empty registry.
    pub fn new(config: FinalityConfig, oracle: O) -> Self {
        Self {
            config,
            oracle,
            registry: PubRandRegistry::new(),
        }
    }

    /// The chain configuration this verifier was initialized with.
    pub fn config(&self) -> &FinalityConfig {
        &self.config
    }

    /// The underlying public randomness registry.
    pub fn registry(&self) -> &PubRandRegistry {
        &self.registry
    }

    /// Commit a public randomness batch; see
    /// [`PubRandRegistry::commit`]. The epoch-window check runs against the
    /// oracle's current chain height.
    pub fn commit_pub_rand_batch(
        &self,
        epoch: u64,
        fp_key: &FpPublicKey,
        proof_of_possession: &[u8],
        merkle_root: [u8; 32],
    ) -> Result<CommitPubRandBatch> {
        let current_block = self.oracle.current_l2_block();
        self.registry.commit(
            &self.config,
            current_block,
            epoch,
            fp_key,
            proof_of_possession,
            merkle_root,
        )
    }

    /// Decide finality of the block `at_block` with output root
    /// `output_root`, given the provided submissions.
    ///
    /// Each submission's public randomness must open under the root
    /// committed for `(epoch, fp_key)`; a failed opening aborts the call
    /// with [`CallerError::PubRandMismatch`], since the caller assembled an
    /// inconsistent record. A submission whose Schnorr signature does not
    /// verify is skipped silently: that provider simply does not count.
    /// Voting power is summed from the oracle's snapshot at `at_block`, and
    /// the call short-circuits `true` as soon as the accumulated power
    /// reaches `⌊2·total/3⌋`.
    pub fn verify_eots(
        &self,
        epoch: u64,
        at_block: u64,
        output_root: &[u8; 32],
        submissions: &[EotsSubmission],
    ) -> Result<bool> {
        let (from_block, to_block) = self.config.block_range(epoch)?;
        if at_block < from_block || at_block > to_block {
            error!("Queried block does not fall inside the queried epoch");
            Err(CallerError::InvalidBlockRange)?;
        }
        if submissions.is_empty() {
            Err(CallerError::DataEmpty)?;
        }

        let chain_id = self.config.chain_id();
        let total = self.oracle.total_voting_power(chain_id, at_block);
        // Integer truncation is deliberate: a signer set summing to exactly
        // the threshold suffices.
        let threshold = u128::from(total) * 2 / 3;

        let mut accumulated: u128 = 0;
        for submission in submissions {
            if !self.registry.verify_pub_rand_at_block(
                epoch,
                &submission.fp_key,
                at_block,
                submission.pub_rand,
                &submission.proof,
            ) {
                error!(
                    fp_key = %submission.fp_key,
                    "Submission's public randomness does not open under the committed root"
                );
                Err(CallerError::PubRandMismatch)?;
            }

            if schnorr::verify(
                submission.parity,
                &submission.px,
                output_root,
                &submission.challenge,
                &submission.signature,
            )? {
                accumulated += u128::from(self.oracle.voting_power_for(
                    chain_id,
                    at_block,
                    &submission.fp_key,
                ));
            }

            if accumulated >= threshold {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
