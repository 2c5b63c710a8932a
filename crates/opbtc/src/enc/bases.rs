//! Base58Check and Bech32/Bech32m primitives. Common encoder errors live
//! here too.

use bech32::{u5, FromBase32, ToBase32, Variant};
use opbtc_core::primitives::Bytes20;
use thiserror::Error;

/// Errors raised while encoding or decoding addresses.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// A Base58Check checksum did not match its payload.
    #[error("invalid base58check checksum")]
    InvalidChecksum,

    /// A Base58Check payload was shorter than version + hash160.
    #[error("base58check payload too short")]
    TooShort,

    /// A Base58Check payload was longer than version + hash160.
    #[error("base58check payload too long")]
    TooLong,

    /// Base58 decoding failed before the checksum stage.
    #[error("invalid base58: {0}")]
    InvalidBase58(String),

    /// An address carried a prefix the network does not use.
    #[error("unknown address prefix {0}")]
    InvalidPrefix(String),

    /// A Base58Check version byte matched no template for the network.
    #[error("invalid address version 0x{0:02x}")]
    InvalidVersion(u8),

    /// A witness program was outside 2..=40 bytes (or 20/32 for v0).
    #[error("invalid witness program length {0}")]
    InvalidProgramLength(usize),

    /// A witness version was outside 0..=16.
    #[error("invalid witness version {0}")]
    InvalidWitnessVersion(u8),

    /// The checksum variant did not match the witness version: v0 is
    /// Bech32, v1..16 are Bech32m.
    #[error("bech32 checksum variant does not match witness version")]
    InvalidVariant,

    /// Bech32 parsing or checksum failure.
    #[error(transparent)]
    Bech32(#[from] bech32::Error),

    /// No payment template matched an output script.
    #[error("no payment template matched the script")]
    NoMatchingScript,

    /// A v16 output was requested on a network with no OPNet prefix.
    #[error("network has no OPNet bech32 prefix")]
    NoOpnetSupport,

    /// An address matched neither codec.
    #[error("address {0} could not be decoded")]
    UnknownAddressFormat(String),
}

/// Type alias for encoding results.
pub type EncodingResult<T> = Result<T, EncodingError>;

/// Encode `version || hash` with a 4-byte hash256 checksum in base58.
pub fn encode_base58check(version: u8, hash: &Bytes20) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(version);
    payload.extend_from_slice(hash.as_ref());
    bs58::encode(payload).with_check().into_string()
}

/// Decode a Base58Check address into its version byte and hash.
pub fn decode_base58check(s: &str) -> EncodingResult<(u8, Bytes20)> {
    let payload = bs58::decode(s)
        .with_check(None)
        .into_vec()
        .map_err(|e| match e {
            bs58::decode::Error::InvalidChecksum { .. } => EncodingError::InvalidChecksum,
            bs58::decode::Error::NoChecksum => EncodingError::TooShort,
            other => EncodingError::InvalidBase58(other.to_string()),
        })?;
    match payload.len() {
        0..=20 => Err(EncodingError::TooShort),
        21 => {
            let hash = Bytes20::try_from(&payload[1..])
                .map_err(|_| EncodingError::TooShort)?;
            Ok((payload[0], hash))
        }
        _ => Err(EncodingError::TooLong),
    }
}

/// The decoded parts of a Bech32/Bech32m address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bech32Decoded {
    /// The human-readable prefix.
    pub prefix: String,
    /// The witness version, 0..=16.
    pub version: u8,
    /// The witness program, 2..=40 bytes.
    pub program: Vec<u8>,
}

fn check_program_length(version: u8, length: usize) -> EncodingResult<()> {
    if !(2..=40).contains(&length) {
        return Err(EncodingError::InvalidProgramLength(length));
    }
    if version == 0 && length != 20 && length != 32 {
        return Err(EncodingError::InvalidProgramLength(length));
    }
    Ok(())
}

/// Encode a witness program. Version 0 uses Bech32; versions 1..=16 use
/// Bech32m. Version 16 with an OPNet prefix available encodes under that
/// prefix instead of `hrp`.
pub fn encode_bech32(
    program: &[u8],
    version: u8,
    hrp: &str,
    hrp_opnet: Option<&str>,
) -> EncodingResult<String> {
    if version > 16 {
        return Err(EncodingError::InvalidWitnessVersion(version));
    }
    check_program_length(version, program.len())?;

    let mut words = vec![u5::try_from_u8(version)?];
    words.extend(program.to_base32());

    let variant = if version == 0 {
        Variant::Bech32
    } else {
        Variant::Bech32m
    };
    let hrp = match (version, hrp_opnet) {
        (16, Some(opnet)) => opnet,
        _ => hrp,
    };
    Ok(bech32::encode(hrp, words, variant)?)
}

/// Decode a Bech32/Bech32m address into prefix, witness version, and
/// program. The Bech32 checksum is accepted only for version 0; all other
/// versions must carry Bech32m.
pub fn decode_bech32(s: &str) -> EncodingResult<Bech32Decoded> {
    let (prefix, words, variant) = bech32::decode(s)?;
    let version_word = words.first().ok_or(EncodingError::InvalidProgramLength(0))?;
    let version = version_word.to_u8();
    if version > 16 {
        return Err(EncodingError::InvalidWitnessVersion(version));
    }
    match (version, variant) {
        (0, Variant::Bech32) | (1..=16, Variant::Bech32m) => {}
        _ => return Err(EncodingError::InvalidVariant),
    }

    let program = Vec::<u8>::from_base32(&words[1..])?;
    check_program_length(version, program.len())?;
    Ok(Bech32Decoded {
        prefix,
        version,
        program,
    })
}
