//! Address encoding: Base58Check and Bech32/Bech32m codecs plus
//! script-pubkey dispatch.

pub mod bases;
pub mod encoder;

pub use bases::{
    decode_base58check, decode_bech32, encode_base58check, encode_bech32, Bech32Decoded,
    EncodingError, EncodingResult,
};
pub use encoder::{from_output_script, to_output_script};
