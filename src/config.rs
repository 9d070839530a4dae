// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Chain configuration for the verifier.

use crate::errors::{CallerError, Result};
use serde::{Deserialize, Serialize};

/// Immutable chain parameters, fixed at initialization.
///
/// Epochs are contiguous fixed-size block windows: epoch `n ≥ 1` covers
/// blocks `start_block + (n−1)·epoch_size` through
/// `start_block + n·epoch_size − 1` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalityConfig {
    chain_id: u32,
    start_block: u64,
    epoch_size: u64,
}

impl FinalityConfig {
    /// Construct a configuration. The epoch size must be non-zero.
    pub fn new(chain_id: u32, start_block: u64, epoch_size: u64) -> Result<Self> {
        if epoch_size == 0 {
            Err(CallerError::BadInput)?;
        }
        Ok(Self {
            chain_id,
            start_block,
            epoch_size,
        })
    }

    /// The rollup chain identifier.
    pub fn chain_id(&self) -> u32 {
        self.chain_id
    }

    /// The first block covered by epoch 1.
    pub fn start_block(&self) -> u64 {
        self.start_block
    }

    /// The number of blocks in each epoch.
    pub fn epoch_size(&self) -> u64 {
        self.epoch_size
    }

    /// The inclusive block range `[from, to]` covered by `epoch`.
    ///
    /// Epoch numbering starts at 1; epoch 0 and ranges that overflow the
    /// block number space fail with [`CallerError::InvalidBlockRange`].
    pub fn block_range(&self, epoch: u64) -> Result<(u64, u64)> {
        if epoch == 0 {
            Err(CallerError::InvalidBlockRange)?;
        }
        let from = (epoch - 1)
            .checked_mul(self.epoch_size)
            .and_then(|offset| self.start_block.checked_add(offset))
            .ok_or(CallerError::InvalidBlockRange)?;
        let to = from
            .checked_add(self.epoch_size - 1)
            .ok_or(CallerError::InvalidBlockRange)?;
        Ok((from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_windows_tile_the_chain() {
        let config = FinalityConfig::new(1, 5, 4).unwrap();
        assert_eq!(config.block_range(1), Ok((5, 8)));
        assert_eq!(config.block_range(2), Ok((9, 12)));
        assert_eq!(config.block_range(3), Ok((13, 16)));
    }

    #[test]
    fn epoch_zero_is_invalid() {
        let config = FinalityConfig::new(1, 5, 4).unwrap();
        assert_eq!(
            config.block_range(0),
            Err(CallerError::InvalidBlockRange.into())
        );
    }

    #[test]
    fn overflowing_epochs_are_invalid() {
        let config = FinalityConfig::new(1, 5, 4).unwrap();
        assert_eq!(
            config.block_range(u64::MAX),
            Err(CallerError::InvalidBlockRange.into())
        );

        let config = FinalityConfig::new(1, u64::MAX - 2, 4).unwrap();
        assert_eq!(
            config.block_range(1),
            Err(CallerError::InvalidBlockRange.into())
        );
    }

    #[test]
    fn zero_epoch_size_is_rejected() {
        assert_eq!(
            FinalityConfig::new(1, 0, 0),
            Err(CallerError::BadInput.into())
        );
    }
}
