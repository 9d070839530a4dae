// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Extractable one-time signatures.
//!
//! An EOTS signature is a Schnorr signature whose nonce point was committed
//! ahead of time as public randomness. Because the nonce is fixed per block,
//! signing two distinct messages under the same randomness leaks the signing
//! key:
//!
//! ```text
//! s1 − s2 = (e1 − e2)·d  (mod Q)   ⟹   d = (s1 − s2)·(e1 − e2)⁻¹
//! ```
//!
//! [`extract`] performs that recovery; an external slashing pipeline acts on
//! the result.
//!
//! # Parity convention
//!
//! Unlike the normalized reference signer in [`crate::schnorr`], [`sign`]
//! does **not** negate the key or nonce to force even y-coordinates. The
//! actual parity of the public key enters the challenge and travels with the
//! signature. The nonce point, however, is committed by x-coordinate alone,
//! and verifiers reconstruct it with even y; a signer whose nonce point has
//! an odd y-coordinate produces signatures that simply fail verification.
//! Callers must sample randomness whose point has even y (negating the
//! nonce scalar flips the parity). `odd_nonce_point_fails_verification`
//! below pins this convention down.

use crate::{
    curve::{reduce_to_scalar, scalar_from_bytes, CurvePoint},
    errors::{CallerError, Result},
    keys::{PrivateRandomness, SigningKey},
    schnorr::{self, challenge_hash},
};
use k256::Scalar;
use serde::{Deserialize, Serialize};
use tracing::error;
use zeroize::Zeroizing;

/// An EOTS signature: the challenge/signature scalar pair, together with
/// the public randomness it was produced under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EotsSignature {
    pub_rand: [u8; 32],
    challenge: [u8; 32],
    signature: [u8; 32],
}

impl EotsSignature {
    /// The x-coordinate of the nonce point this signature was produced
    /// under.
    pub fn pub_rand(&self) -> &[u8; 32] {
        &self.pub_rand
    }

    /// The challenge scalar `e`.
    pub fn challenge(&self) -> &[u8; 32] {
        &self.challenge
    }

    /// The signature scalar `s`.
    pub fn signature(&self) -> &[u8; 32] {
        &self.signature
    }
}

/// Produce an EOTS signature over `message` with the given one-time
/// randomness.
///
/// No parity normalization is applied; see the module documentation for the
/// convention.
pub fn sign(
    signing_key: &SigningKey,
    randomness: &PrivateRandomness,
    message: &[u8; 32],
) -> Result<EotsSignature> {
    let public_point = signing_key.public_point();
    let px = public_point.x_bytes();
    let parity = public_point.parity();

    let nonce_point = randomness.point();
    let nonce_address = nonce_point.evm_address()?;

    let challenge = challenge_hash(&nonce_address, parity, &px, message);
    let e = reduce_to_scalar(&challenge);

    let d = Zeroizing::new(*signing_key.as_scalar());
    let k = Zeroizing::new(*randomness.as_scalar());
    let s = *k + e * *d;

    Ok(EotsSignature {
        pub_rand: nonce_point.x_bytes(),
        challenge,
        signature: s.to_bytes().into(),
    })
}

/// Verify an EOTS signature scalar `s` over `message`, given the signer's
/// public key point and the nonce point its randomness commits to.
///
/// The challenge is recomputed from the nonce point's address and handed to
/// the Schnorr kernel. A nonce point with an odd y-coordinate cannot have
/// been committed as public randomness, so it fails verification outright.
pub fn verify(
    public_key: &CurvePoint,
    nonce_point: &CurvePoint,
    message: &[u8; 32],
    signature: &[u8; 32],
) -> Result<bool> {
    if nonce_point.y_is_odd() {
        return Ok(false);
    }
    let nonce_address = nonce_point.evm_address()?;
    let px = public_key.x_bytes();
    let parity = public_key.parity();

    let challenge = challenge_hash(&nonce_address, parity, &px, message);
    schnorr::verify(parity, &px, message, &challenge, signature)
}

/// Recover the signing key from two signatures under the same randomness
/// over distinct messages.
///
/// Fails with [`CallerError::IdenticalSignatures`] unless both the messages
/// and the signature scalars differ, and with
/// [`CallerError::ExtractionMismatch`] if the recovered key does not
/// reproduce `public_key` (which flags malformed inputs).
pub fn extract(
    public_key: &CurvePoint,
    nonce_point: &CurvePoint,
    message1: &[u8; 32],
    signature1: &[u8; 32],
    message2: &[u8; 32],
    signature2: &[u8; 32],
) -> Result<SigningKey> {
    if message1 == message2 || signature1 == signature2 {
        Err(CallerError::IdenticalSignatures)?;
    }

    let s1 = scalar_from_bytes(signature1).ok_or(CallerError::SignatureOverflow)?;
    let s2 = scalar_from_bytes(signature2).ok_or(CallerError::SignatureOverflow)?;

    let nonce_address = nonce_point.evm_address()?;
    let px = public_key.x_bytes();
    let parity = public_key.parity();
    let e1 = reduce_to_scalar(&challenge_hash(&nonce_address, parity, &px, message1));
    let e2 = reduce_to_scalar(&challenge_hash(&nonce_address, parity, &px, message2));

    let challenge_diff_inv = Option::<Scalar>::from((e1 - e2).invert()).ok_or_else(|| {
        error!("Distinct messages produced identical challenges; inputs are malformed");
        CallerError::ExtractionMismatch
    })?;
    let d = Zeroizing::new((s1 - s2) * challenge_diff_inv);

    if CurvePoint::scale_generator(&d) != *public_key {
        error!("Extracted key does not reproduce the claimed public key");
        Err(CallerError::ExtractionMismatch)?;
    }
    Ok(SigningKey::from_scalar(*d))
}
