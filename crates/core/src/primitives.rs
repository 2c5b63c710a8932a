//! Branded byte sequences and value-guarded integers.
//!
//! Every sort here is validated at construction: lengths for the fixed-width
//! types, SEC1 prefix discipline for [`PubKey`], field/group range for
//! [`XOnlyPubKey`] and [`PrivKey`], and the supply cap for [`Satoshi`].
//! Curve membership beyond byte shape is checked by the ECC facade, not here.

use std::convert::TryFrom;

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::ser::{ByteFormat, SerError};

/// Errors raised by branded-type constructors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrimitiveError {
    /// Wrong byte length for a fixed-width sort.
    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Required length.
        expected: usize,
        /// Provided length.
        got: usize,
    },

    /// A public key carried an unknown SEC1 prefix byte.
    #[error("invalid SEC1 prefix byte 0x{0:02x}")]
    InvalidPrefix(u8),

    /// An x-only key's coordinate was zero or not below the field modulus.
    #[error("x coordinate is not in field range")]
    OutOfField,

    /// A private key was zero or not below the group order.
    #[error("scalar is not in group range")]
    OutOfGroup,

    /// A DER signature was outside the legal 8..=73 byte envelope.
    #[error("DER signature length {0} outside 8..=73 bytes")]
    SignatureLength(usize),

    /// An amount exceeded the total satoshi supply.
    #[error("amount {0} exceeds the 21e14 satoshi supply cap")]
    ValueTooLarge(u64),
}

/// The secp256k1 field modulus `p`, big-endian.
pub const SECP256K1_P: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe, 0xff, 0xff,
    0xfc, 0x2f,
];

/// The secp256k1 group order `n`, big-endian.
pub const SECP256K1_N: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xfe, 0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36,
    0x41, 0x40,
];

/// `n / 2`, the low-S boundary, big-endian.
pub const SECP256K1_N_HALF: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b,
    0x20, 0xa0,
];

/// The total satoshi supply, 21 million coins.
pub const MAX_SATOSHI: u64 = 21_000_000 * 100_000_000;

fn is_zero(bytes: &[u8; 32]) -> bool {
    bytes.iter().all(|b| *b == 0)
}

/// True when `0 < bytes < bound`, both interpreted as big-endian integers.
pub fn in_range(bytes: &[u8; 32], bound: &[u8; 32]) -> bool {
    !is_zero(bytes) && bytes < bound
}

wrap_fixed_bytes!(
    /// A 20-byte sequence, the output width of `hash160`.
    Bytes20, 20
);

wrap_fixed_bytes!(
    /// A 32-byte sequence, the output width of `sha256`/`hash256`.
    Bytes32, 32
);

wrap_fixed_bytes!(
    /// A 64-byte BIP340 Schnorr signature.
    SchnorrSignature, 64
);

impl Default for Bytes20 {
    fn default() -> Self {
        Self::new([0u8; 20])
    }
}

impl Default for Bytes32 {
    fn default() -> Self {
        Self::new([0u8; 32])
    }
}

impl ByteFormat for Bytes32 {
    type Error = SerError;

    fn serialized_length(&self) -> usize {
        32
    }

    fn read_from<R>(reader: &mut R) -> Result<Self, Self::Error>
    where
        R: std::io::Read,
    {
        let mut buf = [0u8; 32];
        reader.read_exact(&mut buf)?;
        Ok(Self::new(buf))
    }

    fn write_to<W>(&self, writer: &mut W) -> Result<usize, Self::Error>
    where
        W: std::io::Write,
    {
        writer.write_all(self.as_ref())?;
        Ok(32)
    }
}

/// A SEC1-encoded secp256k1 public key: 33 bytes with an 0x02/0x03 prefix, or
/// 65 bytes with an 0x04 (uncompressed) or 0x06/0x07 (hybrid) prefix.
#[derive(Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct PubKey(Vec<u8>);

impl PubKey {
    /// Byte length of a compressed key.
    pub const COMPRESSED_LEN: usize = 33;
    /// Byte length of an uncompressed or hybrid key.
    pub const LONG_LEN: usize = 65;

    /// The SEC1 prefix byte.
    pub fn prefix(&self) -> u8 {
        self.0[0]
    }

    /// True for 33-byte keys.
    pub fn is_compressed(&self) -> bool {
        self.0.len() == Self::COMPRESSED_LEN
    }

    /// The x coordinate bytes.
    pub fn x_bytes(&self) -> [u8; 32] {
        let mut x = [0u8; 32];
        x.copy_from_slice(&self.0[1..33]);
        x
    }

    /// Clone of this key with the SEC1 prefix byte replaced. Only meaningful
    /// for 65-byte keys, where 0x04/0x06/0x07 are interchangeable encodings
    /// of the same point shape.
    pub fn with_prefix(&self, prefix: u8) -> Result<Self, PrimitiveError> {
        let mut bytes = self.0.clone();
        bytes[0] = prefix;
        Self::try_from(bytes.as_slice())
    }
}

impl TryFrom<&[u8]> for PubKey {
    type Error = PrimitiveError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        match (slice.len(), slice.first().copied()) {
            (Self::COMPRESSED_LEN, Some(0x02 | 0x03)) => Ok(Self(slice.to_vec())),
            (Self::LONG_LEN, Some(0x04 | 0x06 | 0x07)) => Ok(Self(slice.to_vec())),
            (Self::COMPRESSED_LEN, Some(p)) | (Self::LONG_LEN, Some(p)) => {
                Err(PrimitiveError::InvalidPrefix(p))
            }
            (len, _) => Err(PrimitiveError::InvalidLength {
                expected: Self::COMPRESSED_LEN,
                got: len,
            }),
        }
    }
}

impl AsRef<[u8]> for PubKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for PubKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PubKey({})", hex::encode(&self.0))
    }
}

impl_hex_serde!(PubKey);

/// A BIP340 x-only public key: 32 bytes with `0 < x < p`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct XOnlyPubKey([u8; 32]);

impl XOnlyPubKey {
    /// Wrap a 32-byte x coordinate, checking field range.
    pub fn new(buf: [u8; 32]) -> Result<Self, PrimitiveError> {
        if !in_range(&buf, &SECP256K1_P) {
            return Err(PrimitiveError::OutOfField);
        }
        Ok(Self(buf))
    }

    /// Borrow the underlying array.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Copy out the underlying array.
    pub fn to_array(self) -> [u8; 32] {
        self.0
    }
}

impl TryFrom<&[u8]> for XOnlyPubKey {
    type Error = PrimitiveError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        if slice.len() != 32 {
            return Err(PrimitiveError::InvalidLength {
                expected: 32,
                got: slice.len(),
            });
        }
        let mut buf = [0u8; 32];
        buf.copy_from_slice(slice);
        Self::new(buf)
    }
}

impl AsRef<[u8]> for XOnlyPubKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for XOnlyPubKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "XOnlyPubKey({})", hex::encode(self.0))
    }
}

impl_hex_serde!(XOnlyPubKey);

/// A secp256k1 private key: 32 bytes with `0 < k < n`. The buffer is scrubbed
/// on drop.
#[derive(Clone, Eq, PartialEq, Zeroize, ZeroizeOnDrop)]
pub struct PrivKey([u8; 32]);

impl PrivKey {
    /// Wrap a 32-byte scalar, checking group range.
    pub fn new(buf: [u8; 32]) -> Result<Self, PrimitiveError> {
        if !in_range(&buf, &SECP256K1_N) {
            return Err(PrimitiveError::OutOfGroup);
        }
        Ok(Self(buf))
    }

    /// Borrow the underlying array.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl TryFrom<&[u8]> for PrivKey {
    type Error = PrimitiveError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        if slice.len() != 32 {
            return Err(PrimitiveError::InvalidLength {
                expected: 32,
                got: slice.len(),
            });
        }
        let mut buf = [0u8; 32];
        buf.copy_from_slice(slice);
        Self::new(buf)
    }
}

impl std::fmt::Debug for PrivKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        write!(f, "PrivKey(..)")
    }
}

/// A DER-encoded ECDSA signature, 8..=73 bytes. The envelope length is the
/// only guard here; strict-DER structure is the script layer's business.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct DerSignature(Vec<u8>);

impl DerSignature {
    /// Borrow the raw DER bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for DerSignature {
    type Error = PrimitiveError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        if slice.len() < 8 || slice.len() > 73 {
            return Err(PrimitiveError::SignatureLength(slice.len()));
        }
        Ok(Self(slice.to_vec()))
    }
}

impl AsRef<[u8]> for DerSignature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for DerSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DerSignature({})", hex::encode(&self.0))
    }
}

impl_hex_serde!(DerSignature);

/// An amount in satoshi, capped at the total supply.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Default, Debug)]
pub struct Satoshi(u64);

impl Satoshi {
    /// The largest representable amount.
    pub const MAX: Satoshi = Satoshi(MAX_SATOSHI);

    /// Wrap an amount, checking the supply cap.
    pub fn new(sats: u64) -> Result<Self, PrimitiveError> {
        if sats > MAX_SATOSHI {
            return Err(PrimitiveError::ValueTooLarge(sats));
        }
        Ok(Self(sats))
    }

    /// The raw satoshi count.
    pub fn sats(&self) -> u64 {
        self.0
    }

    /// Capped addition; `None` past the supply cap.
    pub fn checked_add(self, other: Satoshi) -> Option<Satoshi> {
        Satoshi::new(self.0.checked_add(other.0)?).ok()
    }
}

impl From<Satoshi> for u64 {
    fn from(v: Satoshi) -> u64 {
        v.0
    }
}

impl std::fmt::Display for Satoshi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} sat", self.0)
    }
}

impl serde::Serialize for Satoshi {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Satoshi {
    fn deserialize<D>(deserializer: D) -> Result<Satoshi, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v: u64 = serde::Deserialize::deserialize(deserializer)?;
        Satoshi::new(v).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_guards_fixed_lengths() {
        assert!(Bytes20::try_from([0u8; 20].as_slice()).is_ok());
        assert_eq!(
            Bytes20::try_from([0u8; 21].as_slice()),
            Err(PrimitiveError::InvalidLength {
                expected: 20,
                got: 21
            })
        );
        assert!(Bytes32::try_from([7u8; 32].as_slice()).is_ok());
        assert!(SchnorrSignature::try_from([1u8; 64].as_slice()).is_ok());
        assert!(SchnorrSignature::try_from([1u8; 63].as_slice()).is_err());
    }

    #[test]
    fn it_guards_pubkey_shape() {
        let mut compressed = vec![0x02u8];
        compressed.extend_from_slice(&[0x11; 32]);
        assert!(PubKey::try_from(compressed.as_slice()).is_ok());

        let mut long = vec![0x04u8];
        long.extend_from_slice(&[0x22; 64]);
        let long = PubKey::try_from(long.as_slice()).unwrap();
        assert!(!long.is_compressed());
        assert_eq!(long.with_prefix(0x06).unwrap().prefix(), 0x06);

        let mut bad = vec![0x05u8];
        bad.extend_from_slice(&[0x22; 64]);
        assert_eq!(
            PubKey::try_from(bad.as_slice()),
            Err(PrimitiveError::InvalidPrefix(0x05))
        );
        assert!(PubKey::try_from([0u8; 12].as_slice()).is_err());
    }

    #[test]
    fn it_guards_scalar_ranges() {
        assert_eq!(PrivKey::new([0u8; 32]).err(), Some(PrimitiveError::OutOfGroup));
        assert!(PrivKey::new(SECP256K1_N).is_err());
        let mut almost = SECP256K1_N;
        almost[31] -= 1;
        assert!(PrivKey::new(almost).is_ok());

        assert_eq!(
            XOnlyPubKey::new([0u8; 32]).err(),
            Some(PrimitiveError::OutOfField)
        );
        assert!(XOnlyPubKey::new(SECP256K1_P).is_err());
        let mut x = [0u8; 32];
        x[31] = 1;
        assert!(XOnlyPubKey::new(x).is_ok());
    }

    #[test]
    fn it_guards_amounts() {
        assert!(Satoshi::new(MAX_SATOSHI).is_ok());
        assert_eq!(
            Satoshi::new(MAX_SATOSHI + 1).err(),
            Some(PrimitiveError::ValueTooLarge(MAX_SATOSHI + 1))
        );
        assert_eq!(Satoshi::MAX.checked_add(Satoshi::new(1).unwrap()), None);
    }
}
