// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Error types for the finality verification crate.
//!
//! Failures are split into two tiers: [`CallerError`] covers everything the
//! calling application can cause (and fix) by curating its inputs, while
//! [`InternalError`] is the top-level type returned from the public surface.
//! A caller mistake is wrapped as
//! [`InternalError::CallingApplicationMistake`]; the `?` operator converts
//! between the two automatically.

use std::fmt::{Display, Formatter};

/// The default Result type used in this crate.
pub type Result<T> = std::result::Result<T, InternalError>;

/// Represents an error in the internals of the crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalError {
    /// A code invariant was checked at runtime and failed to hold.
    InternalInvariantFailed,
    /// The calling application passed input that fails validation.
    CallingApplicationMistake(CallerError),
}

impl Display for InternalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InternalInvariantFailed => write!(
                f,
                "An internal invariant failed. This is likely a bug; please file an issue"
            ),
            Self::CallingApplicationMistake(caller_error) => {
                write!(f, "The calling application made a mistake: {caller_error}")
            }
        }
    }
}

impl std::error::Error for InternalError {}

/// Errors caused by the calling application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerError {
    /// The epoch has already ended, or the queried block falls outside the
    /// epoch's block range.
    InvalidBlockRange,
    /// A public randomness batch was already committed for this epoch and
    /// finality provider key.
    DuplicateBatch,
    /// The message inside a proof of possession does not match the canonical
    /// commitment preimage.
    MessageMismatch {
        /// The preimage hash the registry computed from the commit arguments.
        expected: [u8; 32],
        /// The message carried inside the proof of possession.
        actual: [u8; 32],
    },
    /// The proof of possession failed Schnorr verification.
    InvalidProofOfPossession,
    /// The Merkle proof for a submission does not open to the committed root.
    PubRandMismatch,
    /// An empty submission array was passed to quorum verification.
    DataEmpty,
    /// The public key x-coordinate is not below half the group order.
    InvalidPublicKey,
    /// The signature scalar is not below the group order.
    SignatureOverflow,
    /// A zero scalar was passed to point recovery.
    EcRecoverInputZero,
    /// Point recovery produced the zero address.
    EcRecoverOutputZero,
    /// A packed signature had the wrong length. Holds the actual length.
    InvalidSignatureLength(usize),
    /// Key extraction was attempted on two identical signatures.
    IdenticalSignatures,
    /// The extracted key does not reproduce the claimed public key.
    ExtractionMismatch,
    /// Provided bytes could not be parsed into the expected type.
    DeserializationFailed,
    /// The calling application passed bad input to the API.
    BadInput,
}

impl Display for CallerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBlockRange => {
                write!(f, "the block or epoch is outside the valid range")
            }
            Self::DuplicateBatch => write!(
                f,
                "a public randomness batch was already committed for this epoch and key"
            ),
            Self::MessageMismatch { expected, actual } => write!(
                f,
                "the signed message {} does not match the expected commitment preimage {}",
                hex::encode(actual),
                hex::encode(expected),
            ),
            Self::InvalidProofOfPossession => {
                write!(f, "the proof of possession failed verification")
            }
            Self::PubRandMismatch => write!(
                f,
                "the Merkle proof does not tie the public randomness to the committed root"
            ),
            Self::DataEmpty => write!(f, "no submissions were provided"),
            Self::InvalidPublicKey => write!(
                f,
                "the public key x-coordinate must be below half the group order"
            ),
            Self::SignatureOverflow => {
                write!(f, "the signature scalar must be below the group order")
            }
            Self::EcRecoverInputZero => write!(f, "point recovery requires non-zero inputs"),
            Self::EcRecoverOutputZero => write!(f, "point recovery produced the zero address"),
            Self::InvalidSignatureLength(len) => write!(
                f,
                "a packed signature must be exactly 160 bytes; got {len}"
            ),
            Self::IdenticalSignatures => write!(
                f,
                "key extraction requires two distinct signatures over distinct messages"
            ),
            Self::ExtractionMismatch => write!(
                f,
                "the extracted key does not correspond to the claimed public key"
            ),
            Self::DeserializationFailed => {
                write!(f, "provided bytes could not be deserialized")
            }
            Self::BadInput => write!(f, "the provided input is not valid for this API"),
        }
    }
}

impl std::error::Error for CallerError {}

impl From<CallerError> for InternalError {
    fn from(error: CallerError) -> Self {
        Self::CallingApplicationMistake(error)
    }
}
