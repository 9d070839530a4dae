// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Fast finality verification for rollup blocks, backed by Extractable
//! One-Time Signatures (EOTS) from Bitcoin-staked finality providers.
//!
//! A finality provider stakes on Bitcoin and then participates in two
//! phases:
//!
//! 1. **Commitment.** Ahead of each epoch (a fixed-size window of rollup
//!    blocks), the provider generates one secret nonce per block and commits
//!    the x-coordinates of the nonce points as a Keccak-256 Merkle root,
//!    bound to its key by a Schnorr proof of possession
//!    ([`PubRandRegistry::commit`]).
//! 2. **Voting.** For each produced block, the provider signs the block's
//!    output root with the nonce committed for that height
//!    ([`eots::sign`]).
//!
//! A verifier accepts a block as final once providers controlling at least
//! two thirds of the chain's voting power at that height have produced valid
//! signatures tied to their committed randomness
//! ([`EotsVerifier::verify_eots`]).
//!
//! Because each nonce is committed to a single block, signing two distinct
//! messages for the same height leaks the provider's signing key;
//! [`eots::extract`] recovers it so an external slashing pipeline can act.
//!
//! The Schnorr kernel ([`schnorr`]) is compatible with the EVM `ecrecover`
//! precompile and its non-standard challenge
//! `Keccak256( addr(R) ‖ parity ‖ Px ‖ m )`; all digests are Keccak-256 and
//! all wire encodings are byte-exact with the EVM representation, so
//! commitments and signatures can be cross-verified on-chain.
//!
//! # Example
//!
//! ```
//! use eots_verifier::{
//!     eots,
//!     merkle::{merkle_proof, merkle_root, Leaf},
//!     registry::commit_message,
//!     schnorr::SchnorrSignature,
//!     EotsSubmission, EotsVerifier, FinalityConfig, FinalityOracle, FpPublicKey,
//!     PrivateRandomness, SigningKey,
//! };
//!
//! // Host-provided view of the chain and the providers' voting power.
//! struct StaticOracle;
//! impl FinalityOracle for StaticOracle {
//!     fn current_l2_block(&self) -> u64 {
//!         4
//!     }
//!     fn total_voting_power(&self, _chain_id: u32, _at_block: u64) -> u64 {
//!         100
//!     }
//!     fn voting_power_for(&self, _chain_id: u32, _at_block: u64, _fp_key: &FpPublicKey) -> u64 {
//!         100
//!     }
//! }
//!
//! # fn main() -> eots_verifier::Result<()> {
//! let mut rng = rand::thread_rng();
//!
//! // A provider keypair whose x-coordinate the kernel accepts.
//! let signing_key = loop {
//!     let candidate = SigningKey::random(&mut rng);
//!     if candidate.public_key().is_ok() {
//!         break candidate;
//!     }
//! };
//! let fp_key = signing_key.public_key()?;
//!
//! // One even-y nonce per block of epoch 1 (blocks 5..=8), committed as a
//! // Merkle root over (block number, public randomness) leaves.
//! let randomness: Vec<PrivateRandomness> = (0..4)
//!     .map(|_| loop {
//!         let candidate = PrivateRandomness::random(&mut rng);
//!         if !candidate.point().y_is_odd() {
//!             break candidate;
//!         }
//!     })
//!     .collect();
//! let leaves: Vec<Leaf> = randomness
//!     .iter()
//!     .enumerate()
//!     .map(|(offset, randomness)| Leaf::new(5 + offset as u64, randomness.public_randomness()))
//!     .collect();
//! let hashes: Vec<[u8; 32]> = leaves.iter().map(Leaf::hash).collect();
//! let root = merkle_root(&hashes)?;
//!
//! let verifier = EotsVerifier::new(FinalityConfig::new(1, 5, 4)?, StaticOracle);
//!
//! // Bind the root to the key with a proof of possession and commit it.
//! let message = commit_message(1, &fp_key, &root);
//! let pop = eots::sign(&signing_key, &PrivateRandomness::random(&mut rng), &message)?;
//! let packed = SchnorrSignature::new(
//!     fp_key.parity(),
//!     fp_key.x_bytes(),
//!     message,
//!     *pop.challenge(),
//!     *pop.signature(),
//! )
//! .pack();
//! verifier.commit_pub_rand_batch(1, &fp_key, &packed, root)?;
//!
//! // Later, the provider votes on block 5's output root...
//! let output_root = [7u8; 32];
//! let vote = eots::sign(&signing_key, &randomness[0], &output_root)?;
//! let submission = EotsSubmission {
//!     fp_key,
//!     pub_rand: leaves[0].pub_rand,
//!     proof: merkle_proof(&hashes, 0)?,
//!     parity: fp_key.parity(),
//!     px: fp_key.x_bytes(),
//!     challenge: *vote.challenge(),
//!     signature: *vote.signature(),
//! };
//!
//! // ...and the block is final.
//! assert!(verifier.verify_eots(1, 5, &output_root, &[submission])?);
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]

pub mod config;
pub mod curve;
pub mod eots;
pub mod errors;
pub mod keys;
pub mod merkle;
pub mod oracle;
pub mod registry;
pub mod schnorr;
pub mod verifier;

mod utils;

pub use config::FinalityConfig;
pub use errors::{CallerError, InternalError, Result};
pub use keys::{FpPublicKey, PrivateRandomness, SigningKey};
pub use oracle::FinalityOracle;
pub use registry::{CommitPubRandBatch, PubRandRegistry};
pub use verifier::{EotsSubmission, EotsVerifier};
