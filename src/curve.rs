//! secp256k1 primitives: point and scalar plumbing, Keccak-256 hashing, and
//! EVM-style point recovery.
//!
//! The verification kernel in this crate is compatible with the EVM
//! `ecrecover` precompile, so everything here is expressed in the precompile's
//! terms: big-endian 32-byte words, recovery parities in `{27, 28}`, and
//! 20-byte addresses derived from uncompressed points.

use crate::errors::{
    CallerError,
    InternalError::{self, InternalInvariantFailed},
    Result,
};
use generic_array::GenericArray;
use k256::{
    elliptic_curve::{
        group::GroupEncoding, ops::Reduce, point::AffineCoordinates, sec1::ToEncodedPoint, Group,
        PrimeField,
    },
    AffinePoint, FieldBytes, ProjectivePoint, Scalar, U256,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::ops::Add;
use tracing::error;
use zeroize::Zeroize;

/// Recovery parity of a point with an even y-coordinate.
pub(crate) const PARITY_EVEN: u8 = 27;
/// Recovery parity of a point with an odd y-coordinate.
pub(crate) const PARITY_ODD: u8 = 28;

/// Big-endian bytes of `(Q >> 1) + 1`, where `Q` is the secp256k1 group
/// order. Public key x-coordinates must fall strictly below this bound so
/// that challenge and signature scalars cannot alias each other modulo `Q`.
pub(crate) const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b,
    0x20, 0xa1,
];

/// Compute the Keccak-256 digest of `bytes`.
pub(crate) fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let digest = Keccak256::new_with_prefix(bytes).finalize();
    digest.into()
}

/// Parse a big-endian 32-byte word as a scalar, rejecting values that are
/// not below the group order.
pub(crate) fn scalar_from_bytes(bytes: &[u8; 32]) -> Option<Scalar> {
    Option::from(<Scalar as PrimeField>::from_repr(
        GenericArray::clone_from_slice(bytes),
    ))
}

/// Interpret a big-endian 32-byte word as a scalar, reducing modulo the
/// group order. This matches how the EVM precompile consumes digests.
pub(crate) fn reduce_to_scalar(bytes: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(*bytes))
}

/// Wrapper around [`k256::ProjectivePoint`] so that we can define our own
/// serialization/deserialization for it.
///
/// Note that this type derives [`Debug`]; if a [`CurvePoint`] is used in a
/// private type, `Debug` should be manually implemented with the field of
/// this type explicitly redacted!
#[derive(Eq, PartialEq, Debug, Clone, Copy, Zeroize)]
pub struct CurvePoint(pub(crate) ProjectivePoint);

impl CurvePoint {
    /// The base point.
    pub const GENERATOR: Self = CurvePoint(ProjectivePoint::GENERATOR);
    /// The identity point.
    pub const IDENTITY: Self = CurvePoint(ProjectivePoint::IDENTITY);

    /// Multiply the base point by `scalar`.
    pub fn scale_generator(scalar: &Scalar) -> Self {
        Self(ProjectivePoint::GENERATOR * scalar)
    }

    /// Multiply `self` by `scalar`.
    pub(crate) fn multiply_by_scalar(&self, scalar: &Scalar) -> Self {
        Self(self.0 * scalar)
    }

    /// Get the big-endian x-coordinate of the curve point.
    pub fn x_bytes(&self) -> [u8; 32] {
        self.0.to_affine().x().into()
    }

    /// `true` if the y-coordinate of the curve point is odd.
    pub fn y_is_odd(&self) -> bool {
        self.0.to_affine().y_is_odd().into()
    }

    /// The recovery parity of the point: 27 for even y, 28 for odd y.
    pub fn parity(&self) -> u8 {
        if self.y_is_odd() {
            PARITY_ODD
        } else {
            PARITY_EVEN
        }
    }

    /// `true` if this is the identity point.
    pub fn is_identity(&self) -> bool {
        self.0.is_identity().into()
    }

    /// Compute the EVM-style address of the point: the low 20 bytes of the
    /// Keccak-256 digest of the uncompressed encoding, tag byte excluded.
    ///
    /// The identity point has no uncompressed encoding; it stands in for the
    /// precompile's zero address and fails.
    pub fn evm_address(&self) -> Result<[u8; 20]> {
        if self.is_identity() {
            Err(CallerError::EcRecoverOutputZero)?;
        }
        let encoded = self.0.to_affine().to_encoded_point(false);
        let digest = keccak256(&encoded.as_bytes()[1..]);
        let address = digest[12..].try_into().map_err(|_| {
            error!("Keccak-256 digest was shorter than 32 bytes");
            InternalInvariantFailed
        })?;
        Ok(address)
    }

    /// Serialize the point as a compressed secp256k1 byte array.
    pub(crate) fn to_bytes(self) -> Vec<u8> {
        let mut generic_array = AffinePoint::from(self.0).to_bytes();
        let bytes = generic_array.to_vec();
        generic_array.zeroize();
        bytes
    }

    pub(crate) fn try_from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut fixed_len_bytes: [u8; 33] = bytes.try_into().map_err(|_| {
            error!("Failed to encode bytes as a curve point");
            CallerError::DeserializationFailed
        })?;

        let point: Option<AffinePoint> = AffinePoint::from_bytes(&fixed_len_bytes.into()).into();
        fixed_len_bytes.zeroize();

        match point {
            Some(point) => Ok(Self(point.into())),
            None => {
                error!("Failed to encode bytes as a curve point");
                Err(CallerError::DeserializationFailed)?
            }
        }
    }
}

impl Add for CurvePoint {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::Neg for CurvePoint {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl AsRef<CurvePoint> for CurvePoint {
    fn as_ref(&self) -> &CurvePoint {
        self
    }
}

impl From<ProjectivePoint> for CurvePoint {
    fn from(p: ProjectivePoint) -> Self {
        Self(p)
    }
}

impl Serialize for CurvePoint {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let afp = AffinePoint::from(self.0);
        afp.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CurvePoint {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let p = AffinePoint::deserialize(deserializer)?;
        Ok(Self(p.into()))
    }
}

/// Decompress the point with the given big-endian x-coordinate and y-parity.
///
/// Returns `None` if `x` does not name a point on the curve.
pub(crate) fn lift_x(x: &[u8; 32], y_odd: bool) -> Option<CurvePoint> {
    let mut compressed = [0u8; 33];
    compressed[0] = if y_odd { 0x03 } else { 0x02 };
    compressed[1..].copy_from_slice(x);
    let point: Option<AffinePoint> = AffinePoint::from_bytes(&compressed.into()).into();
    point.map(|p| CurvePoint(p.into()))
}

/// Recover the EVM address of the public key that produced the ECDSA-like
/// tuple `(r, s)` over `digest`, reproducing the semantics of the EVM
/// `ecrecover` precompile.
///
/// The precompile returns nothing (which callers observe as the zero
/// address) on any degenerate input: a parity outside `{27, 28}`, an `r`
/// that does not name a curve point, or a recovered identity point. Those
/// cases surface as [`CallerError::EcRecoverOutputZero`]. Zero or
/// out-of-range scalar inputs fail [`CallerError::EcRecoverInputZero`].
pub fn recover_address(
    digest: &[u8; 32],
    parity: u8,
    r: &[u8; 32],
    s: &[u8; 32],
) -> Result<[u8; 20]> {
    let r_scalar = scalar_from_bytes(r)
        .filter(|r| *r != Scalar::ZERO)
        .ok_or(CallerError::EcRecoverInputZero)?;
    let s_scalar = scalar_from_bytes(s)
        .filter(|s| *s != Scalar::ZERO)
        .ok_or(CallerError::EcRecoverInputZero)?;
    let z = reduce_to_scalar(digest);
    if z == Scalar::ZERO {
        Err(CallerError::EcRecoverInputZero)?;
    }

    let y_odd = match parity {
        PARITY_EVEN => false,
        PARITY_ODD => true,
        _ => Err(CallerError::EcRecoverOutputZero)?,
    };
    let nonce_point = lift_x(r, y_odd).ok_or(CallerError::EcRecoverOutputZero)?;

    let r_inv: Scalar = Option::from(r_scalar.invert()).ok_or_else(|| {
        error!("Failed to invert a scalar that was checked to be non-zero");
        InternalError::InternalInvariantFailed
    })?;

    // Q = r⁻¹·(s·R − z·G), the standard public key recovery equation.
    let recovered = CurvePoint::scale_generator(&(z * r_inv).negate())
        + nonce_point.multiply_by_scalar(&(s_scalar * r_inv));
    if recovered.is_identity() {
        Err(CallerError::EcRecoverOutputZero)?;
    }
    recovered.evm_address()
}
