// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use crate::errors::{CallerError, Result};
use zeroize::Zeroize;

/// Helper type for parsing byte arrays into slices.
///
/// This type implements [`Zeroize`]. When parsing secret types, you should
/// manually call `zeroize()` after parsing is complete.
#[derive(Zeroize)]
pub(crate) struct ParseBytes {
    bytes: Vec<u8>,
    offset: usize,
}

impl ParseBytes {
    /// Consume bytes for parsing.
    pub(crate) fn new(bytes: Vec<u8>) -> ParseBytes {
        ParseBytes { bytes, offset: 0 }
    }

    /// Take next `n` bytes from the array.
    pub(crate) fn take_bytes(&mut self, n: usize) -> Result<&[u8]> {
        let slice = &self
            .bytes
            .get(self.offset..self.offset + n)
            .ok_or(CallerError::DeserializationFailed)?;
        self.offset += n;
        Ok(slice)
    }

    /// Take the next 32 bytes from the array as a fixed-size word.
    pub(crate) fn take_word(&mut self) -> Result<[u8; 32]> {
        let slice = self.take_bytes(32)?;
        slice
            .try_into()
            .map_err(|_| CallerError::DeserializationFailed.into())
    }
}

////////////////////////////
// Test Utility Functions //
////////////////////////////
