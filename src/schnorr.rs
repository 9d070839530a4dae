// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Schnorr verification kernel, compatible with the EVM `ecrecover`
//! precompile.
//!
//! The scheme rides on the precompile's ECDSA recovery equation: for a
//! Schnorr signature `s = k + e·d` over nonce point `R = k·G` and public key
//! `P = d·G`, calling recovery with the tuple `(sp, parity, Px, ep)` where
//! `sp = −s·Px` and `ep = −e·Px` yields the address of `s·G − e·P = R`. The
//! verifier then recomputes the challenge from that address and accepts iff
//! it matches. The non-standard challenge commits to the nonce point only
//! through its address:
//!
//! ```text
//! e = Keccak256( addr(R) ‖ parity(P) ‖ Px ‖ m )
//! ```
//!
//! The public key's x-coordinate must be below half the group order; the
//! signature scalar must be below the group order.

use crate::{
    curve::{
        keccak256, recover_address, reduce_to_scalar, scalar_from_bytes, PARITY_EVEN,
        SECP256K1_HALF_ORDER,
    },
    errors::{CallerError, InternalError, Result},
    keys::{PrivateRandomness, SigningKey},
    utils::ParseBytes,
};
use k256::Scalar;
use serde::{Deserialize, Serialize};
use tracing::error;
use zeroize::Zeroizing;

/// Length in bytes of a packed [`SchnorrSignature`]: five 32-byte words,
/// with the parity byte left-padded to a full word.
pub const PACKED_SIGNATURE_LENGTH: usize = 160;

/// A Schnorr signature over a 32-byte message, carried together with the
/// public key coordinates it verifies under.
///
/// This is the wire form of a proof of possession: the finality provider
/// packs one of these to bind its key to a public randomness commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchnorrSignature {
    parity: u8,
    px: [u8; 32],
    message: [u8; 32],
    challenge: [u8; 32],
    signature: [u8; 32],
}

impl SchnorrSignature {
    /// Assemble a signature from its wire fields.
    pub fn new(
        parity: u8,
        px: [u8; 32],
        message: [u8; 32],
        challenge: [u8; 32],
        signature: [u8; 32],
    ) -> Self {
        Self {
            parity,
            px,
            message,
            challenge,
            signature,
        }
    }

    /// The recovery parity of the signing key (27 or 28).
    pub fn parity(&self) -> u8 {
        self.parity
    }

    /// The x-coordinate of the signing key.
    pub fn px(&self) -> &[u8; 32] {
        &self.px
    }

    /// The signed message.
    pub fn message(&self) -> &[u8; 32] {
        &self.message
    }

    /// The challenge scalar `e`.
    pub fn challenge(&self) -> &[u8; 32] {
        &self.challenge
    }

    /// The signature scalar `s`.
    pub fn signature(&self) -> &[u8; 32] {
        &self.signature
    }

    /// Encode the signature as five 32-byte words, the parity byte
    /// left-padded to a full word.
    pub fn pack(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PACKED_SIGNATURE_LENGTH);
        bytes.extend_from_slice(&[0u8; 31]);
        bytes.push(self.parity);
        bytes.extend_from_slice(&self.px);
        bytes.extend_from_slice(&self.message);
        bytes.extend_from_slice(&self.challenge);
        bytes.extend_from_slice(&self.signature);
        bytes
    }

    /// Decode a signature from its packed form.
    ///
    /// Any input that is not exactly [`PACKED_SIGNATURE_LENGTH`] bytes fails
    /// with [`CallerError::InvalidSignatureLength`] carrying the actual
    /// length. A parity word with non-zero padding fails
    /// [`CallerError::DeserializationFailed`].
    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PACKED_SIGNATURE_LENGTH {
            Err(CallerError::InvalidSignatureLength(bytes.len()))?;
        }

        let mut parser = ParseBytes::new(bytes.to_vec());
        let parity_word = parser.take_word()?;
        if parity_word[..31].iter().any(|byte| *byte != 0) {
            error!("Parity word of a packed signature had non-zero padding");
            Err(CallerError::DeserializationFailed)?;
        }

        Ok(Self {
            parity: parity_word[31],
            px: parser.take_word()?,
            message: parser.take_word()?,
            challenge: parser.take_word()?,
            signature: parser.take_word()?,
        })
    }

    /// Verify the signature over its embedded message. See [`verify`].
    pub fn verify(&self) -> Result<bool> {
        verify(
            self.parity,
            &self.px,
            &self.message,
            &self.challenge,
            &self.signature,
        )
    }
}

/// Compute the challenge preimage hash
/// `Keccak256( addr(R) ‖ parity_u8 ‖ Px ‖ m )`.
pub(crate) fn challenge_hash(
    nonce_address: &[u8; 20],
    parity: u8,
    px: &[u8; 32],
    message: &[u8; 32],
) -> [u8; 32] {
    let preimage = [
        nonce_address.as_slice(),
        &[parity],
        px.as_slice(),
        message.as_slice(),
    ]
    .concat();
    keccak256(&preimage)
}

/// Verify a Schnorr signature `(e, s)` over `message` under the public key
/// `(parity, px)`.
///
/// Returns `Ok(false)` when the recomputed challenge does not match `e`.
/// Out-of-range inputs and degenerate recovery fail with the corresponding
/// [`CallerError`].
pub fn verify(
    parity: u8,
    px: &[u8; 32],
    message: &[u8; 32],
    challenge: &[u8; 32],
    signature: &[u8; 32],
) -> Result<bool> {
    if px[..] >= SECP256K1_HALF_ORDER[..] {
        Err(CallerError::InvalidPublicKey)?;
    }
    let s = scalar_from_bytes(signature).ok_or(CallerError::SignatureOverflow)?;
    let px_scalar = scalar_from_bytes(px).ok_or_else(|| {
        error!("x-coordinate below half the group order failed to parse as a scalar");
        InternalError::InternalInvariantFailed
    })?;
    let e = reduce_to_scalar(challenge);

    // sp = −s·Px and ep = −e·Px feed the recovery equation
    // Px⁻¹·(ep·R − sp·G) = s·G − e·P, the Schnorr nonce point.
    let sp = (s * px_scalar).negate();
    if sp == Scalar::ZERO {
        Err(CallerError::EcRecoverInputZero)?;
    }
    let ep = (e * px_scalar).negate();

    let nonce_address = recover_address(
        &sp.to_bytes().into(),
        parity,
        px,
        &ep.to_bytes().into(),
    )?;

    let expected = challenge_hash(&nonce_address, parity, px, message);
    Ok(&expected == challenge)
}

/// Produce a Schnorr signature over `message`, normalizing the key and nonce
/// so that both of their points have even y-coordinates.
///
/// This is the pre-EVM reference signer: because of the normalization, the
/// resulting signature always verifies under parity 27. The EOTS signer
/// ([`crate::eots::sign`]) deliberately skips this normalization; see the
/// module documentation there for the convention.
pub fn sign(
    signing_key: &SigningKey,
    nonce: &PrivateRandomness,
    message: &[u8; 32],
) -> Result<SchnorrSignature> {
    let mut d = Zeroizing::new(*signing_key.as_scalar());
    let mut public_point = signing_key.public_point();
    if public_point.y_is_odd() {
        *d = d.negate();
        public_point = -public_point;
    }

    let mut k = Zeroizing::new(*nonce.as_scalar());
    let mut nonce_point = nonce.point();
    if nonce_point.y_is_odd() {
        *k = k.negate();
        nonce_point = -nonce_point;
    }

    let px = public_point.x_bytes();
    let nonce_address = nonce_point.evm_address()?;
    let challenge = challenge_hash(&nonce_address, PARITY_EVEN, &px, message);
    let e = reduce_to_scalar(&challenge);
    let s = *k + e * *d;

    Ok(SchnorrSignature {
        parity: PARITY_EVEN,
        px,
        message: *message,
        challenge,
        signature: s.to_bytes().into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::init_testing;
    use k256::{
        elliptic_curve::{bigint::Encoding, Curve},
        Secp256k1,
    };
    use rand::Rng;

    fn random_signature(rng: &mut rand::rngs::StdRng) -> SchnorrSignature {
        let signing_key = SigningKey::random(rng);
        let nonce = PrivateRandomness::random(rng);
        let message: [u8; 32] = rng.gen();
        sign(&signing_key, &nonce, &message).unwrap()
    }

    #[test]
    fn signing_round_trip_works() {
        let rng = &mut init_testing();
        let signature = random_signature(rng);
        assert_eq!(signature.parity(), PARITY_EVEN);
        assert_eq!(signature.verify(), Ok(true));
    }

    #[test]
    fn verification_rejects_any_tampered_field() {
        let rng = &mut init_testing();
        let good = random_signature(rng);

        let mut tampered = good;
        tampered.message[7] ^= 0x01;
        assert_eq!(tampered.verify(), Ok(false));

        let mut tampered = good;
        tampered.challenge[0] ^= 0x80;
        assert!(!matches!(tampered.verify(), Ok(true)));

        let mut tampered = good;
        tampered.signature[31] ^= 0x01;
        assert!(!matches!(tampered.verify(), Ok(true)));

        let mut tampered = good;
        tampered.px[15] ^= 0x01;
        assert!(!matches!(tampered.verify(), Ok(true)));

        let mut tampered = good;
        tampered.parity = 28;
        assert!(!matches!(tampered.verify(), Ok(true)));
    }

    #[test]
    fn public_key_bound_is_strict() {
        let rng = &mut init_testing();
        let good = random_signature(rng);

        // At the bound: rejected with the specific error.
        let at_bound = SchnorrSignature {
            px: SECP256K1_HALF_ORDER,
            ..good
        };
        assert_eq!(
            at_bound.verify(),
            Err(CallerError::InvalidPublicKey.into())
        );

        // Just below the bound: passes the key check (the remaining
        // verification may fail any other way, but not with this error).
        let mut below = SECP256K1_HALF_ORDER;
        below[31] -= 1;
        let below_bound = SchnorrSignature { px: below, ..good };
        assert_ne!(
            below_bound.verify(),
            Err(CallerError::InvalidPublicKey.into())
        );
    }

    #[test]
    fn signature_scalar_bound_is_strict() {
        let rng = &mut init_testing();
        let good = random_signature(rng);
        let order = Secp256k1::ORDER.to_be_bytes();

        let at_order = SchnorrSignature {
            signature: order,
            ..good
        };
        assert_eq!(
            at_order.verify(),
            Err(CallerError::SignatureOverflow.into())
        );

        let mut below = order;
        below[31] -= 1;
        let below_order = SchnorrSignature {
            signature: below,
            ..good
        };
        assert_ne!(
            below_order.verify(),
            Err(CallerError::SignatureOverflow.into())
        );
    }

    #[test]
    fn pack_unpack_round_trips() {
        let rng = &mut init_testing();
        let signature = random_signature(rng);

        let packed = signature.pack();
        assert_eq!(packed.len(), PACKED_SIGNATURE_LENGTH);
        let unpacked = SchnorrSignature::unpack(&packed).unwrap();
        assert_eq!(signature, unpacked);

        // And the other direction.
        assert_eq!(unpacked.pack(), packed);
    }

    #[test]
    fn unpack_rejects_wrong_lengths() {
        let rng = &mut init_testing();
        let packed = random_signature(rng).pack();

        for bad_length in [0, 1, 31, 159, 161, 320] {
            let mut bytes = packed.clone();
            bytes.resize(bad_length, 0);
            assert_eq!(
                SchnorrSignature::unpack(&bytes),
                Err(CallerError::InvalidSignatureLength(bad_length).into())
            );
        }
    }

    #[test]
    fn unpack_rejects_dirty_parity_padding() {
        let rng = &mut init_testing();
        let mut packed = random_signature(rng).pack();
        packed[0] = 0xff;
        assert_eq!(
            SchnorrSignature::unpack(&packed),
            Err(CallerError::DeserializationFailed.into())
        );
    }
}
