// Copyright (c) 2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Key material for finality providers.
//!
//! A finality provider is identified by its compressed secp256k1 public key
//! ([`FpPublicKey`]), which doubles as the registry map key and the voting
//! power oracle handle. The secret side consists of a long-lived
//! [`SigningKey`] and one [`PrivateRandomness`] nonce per signed block.

use crate::{
    curve::{lift_x, CurvePoint, PARITY_EVEN, SECP256K1_HALF_ORDER},
    errors::{CallerError, InternalError, Result},
};
use k256::{elliptic_curve::Field, Scalar};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Debug;
use tracing::error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a compressed secp256k1 public key in bytes.
pub const FP_PUBLIC_KEY_LENGTH: usize = 33;

/// A finality provider's public key: a compressed secp256k1 point.
///
/// The key is held as its 33-byte wire form (parity tag plus big-endian
/// x-coordinate) so it can serve as a map key and an oracle handle without
/// conversion.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FpPublicKey([u8; FP_PUBLIC_KEY_LENGTH]);

impl FpPublicKey {
    /// Construct a key from a curve point.
    pub fn from_point(point: &CurvePoint) -> Result<Self> {
        Self::try_from_bytes(&point.to_bytes())
    }

    /// Parse a key from its 33-byte compressed encoding.
    ///
    /// Rejects byte strings that do not name a curve point and keys whose
    /// x-coordinate is not below half the group order; the verification
    /// kernel cannot accept such keys, so they are turned away at the
    /// boundary.
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self> {
        let point = CurvePoint::try_from_bytes(bytes)?;
        let fixed: [u8; FP_PUBLIC_KEY_LENGTH] = point.to_bytes().try_into().map_err(|_| {
            error!("Compressed point encoding was not 33 bytes");
            InternalError::InternalInvariantFailed
        })?;
        if fixed[1..] >= SECP256K1_HALF_ORDER[..] {
            Err(CallerError::InvalidPublicKey)?;
        }
        Ok(Self(fixed))
    }

    /// The recovery parity of the key: 27 for even y, 28 for odd y.
    pub fn parity(&self) -> u8 {
        // The SEC1 tag byte is 0x02 for even y and 0x03 for odd y.
        PARITY_EVEN + (self.0[0] & 1)
    }

    /// The big-endian x-coordinate of the key.
    pub fn x_bytes(&self) -> [u8; 32] {
        let mut x = [0u8; 32];
        x.copy_from_slice(&self.0[1..]);
        x
    }

    /// The full curve point behind the key.
    pub fn to_point(&self) -> Result<CurvePoint> {
        CurvePoint::try_from_bytes(&self.0)
    }

    /// The 33-byte compressed encoding.
    pub fn as_bytes(&self) -> &[u8; FP_PUBLIC_KEY_LENGTH] {
        &self.0
    }
}

impl Debug for FpPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FpPublicKey({})", hex::encode(self.0))
    }
}

impl std::fmt::Display for FpPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

// serde has no built-in impls for 33-byte arrays, so serialize the wire form
// as a byte sequence.
impl Serialize for FpPublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for FpPublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        FpPublicKey::try_from_bytes(&bytes).map_err(|_| {
            serde::de::Error::invalid_length(bytes.len(), &"a compressed secp256k1 point")
        })
    }
}

/// A finality provider's secret signing key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SigningKey(Scalar);

impl SigningKey {
    /// Sample a signing key uniformly at random.
    pub fn random(rng: &mut (impl CryptoRng + RngCore)) -> Self {
        Self(Scalar::random(rng))
    }

    /// Construct a signing key from a scalar.
    pub(crate) fn from_scalar(scalar: Scalar) -> Self {
        Self(scalar)
    }

    /// Computes the curve point corresponding to this signing key.
    pub fn public_point(&self) -> CurvePoint {
        CurvePoint::scale_generator(&self.0)
    }

    /// The public key of this signing key.
    pub fn public_key(&self) -> Result<FpPublicKey> {
        FpPublicKey::from_point(&self.public_point())
    }

    pub(crate) fn as_scalar(&self) -> &Scalar {
        &self.0
    }
}

impl Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey([redacted])")
    }
}

/// The secret per-block nonce `k` behind a public randomness commitment.
///
/// The public side is the x-coordinate of `k·G`. A nonce must never be used
/// for more than one message: two signatures under the same nonce leak the
/// signing key (this is the extractability that slashing relies on).
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrivateRandomness(Scalar);

impl PrivateRandomness {
    /// Sample fresh private randomness uniformly at random.
    pub fn random(rng: &mut (impl CryptoRng + RngCore)) -> Self {
        Self(Scalar::random(rng))
    }

    /// Construct private randomness from a scalar.
    pub(crate) fn from_scalar(scalar: Scalar) -> Self {
        Self(scalar)
    }

    /// The full nonce point `k·G`.
    pub fn point(&self) -> CurvePoint {
        CurvePoint::scale_generator(&self.0)
    }

    /// The public randomness: the big-endian x-coordinate of `k·G`.
    pub fn public_randomness(&self) -> [u8; 32] {
        self.point().x_bytes()
    }

    pub(crate) fn as_scalar(&self) -> &Scalar {
        &self.0
    }
}

impl Debug for PrivateRandomness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateRandomness([redacted])")
    }
}

/// Reconstruct the nonce point committed by `pub_rand`, which is defined to
/// have an even y-coordinate.
pub(crate) fn lift_pub_rand(pub_rand: &[u8; 32]) -> Option<CurvePoint> {
    lift_x(pub_rand, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::init_testing;

    #[test]
    fn public_key_round_trips_through_bytes() {
        let rng = &mut init_testing();
        let key = loop {
            // Half of all sampled keys exceed the x-coordinate bound; retry
            // until one is accepted.
            if let Ok(key) = SigningKey::random(rng).public_key() {
                break key;
            }
        };
        let parsed = FpPublicKey::try_from_bytes(key.as_bytes()).unwrap();
        assert_eq!(key, parsed);
        assert_eq!(parsed.x_bytes(), parsed.to_point().unwrap().x_bytes());
        assert_eq!(parsed.parity(), parsed.to_point().unwrap().parity());
    }

    #[test]
    fn public_key_rejects_high_x_coordinate() {
        let rng = &mut init_testing();
        loop {
            let signing_key = SigningKey::random(rng);
            let point = signing_key.public_point();
            if point.x_bytes() >= SECP256K1_HALF_ORDER {
                assert_eq!(
                    FpPublicKey::from_point(&point),
                    Err(CallerError::InvalidPublicKey.into())
                );
                break;
            }
        }
    }

    #[test]
    fn public_key_rejects_junk_bytes() {
        assert!(FpPublicKey::try_from_bytes(&[0u8; 33]).is_err());
        assert!(FpPublicKey::try_from_bytes(&[0u8; 21]).is_err());
    }

    #[test]
    fn pub_rand_lifts_to_even_point() {
        let rng = &mut init_testing();
        let randomness = PrivateRandomness::random(rng);
        let lifted = lift_pub_rand(&randomness.public_randomness()).unwrap();
        assert!(!lifted.y_is_odd());
        assert_eq!(lifted.x_bytes(), randomness.public_randomness());
    }
}
