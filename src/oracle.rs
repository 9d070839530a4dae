// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The voting power oracle consumed by the verifier.
//!
//! The oracle tracks Bitcoin-side staking and answers snapshot queries; the
//! verifier treats every call as a pure function and never mutates it. How
//! the backing data is produced (staking contracts, an indexer, a light
//! client) is entirely the host's concern.

use crate::keys::FpPublicKey;

/// Host-provided view of the rollup chain and the finality providers'
/// voting power.
pub trait FinalityOracle {
    /// The current block height of the rollup chain.
    fn current_l2_block(&self) -> u64;

    /// Total voting power registered for `chain_id` at `at_block`.
    fn total_voting_power(&self, chain_id: u32, at_block: u64) -> u64;

    /// Voting power of a single finality provider for `chain_id` at
    /// `at_block`. Unknown keys have zero power.
    fn voting_power_for(&self, chain_id: u32, at_block: u64, fp_key: &FpPublicKey) -> u64;
}
