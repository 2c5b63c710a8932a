//! Common re-exports.

pub use crate::hashes::{
    hash160, hash256, ripemd160, sha256, tagged_engine, tagged_hash, Hash160Writer, Hash256Writer,
    TaggedHashWriter,
};
pub use crate::primitives::{
    Bytes20, Bytes32, DerSignature, PrimitiveError, PrivKey, PubKey, Satoshi, SchnorrSignature,
    XOnlyPubKey, MAX_SATOSHI,
};
pub use crate::ser::{ByteFormat, ByteReader, ByteWriter, SerError, SerResult};
