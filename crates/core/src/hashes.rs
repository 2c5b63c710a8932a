//! Bitcoin hash functions: single and double SHA-256, RIPEMD-160, HASH160,
//! and BIP340 tagged hashes.
//!
//! Tagged hashes are domain-separated SHA-256:
//! `SHA256(SHA256(tag) || SHA256(tag) || msg)`. The doubled tag prefix for
//! the BIP340/341 tags is precomputed once and cached.

use std::io::{Result as IOResult, Write};

use digest::Digest;
use once_cell::sync::Lazy;
use ripemd::Ripemd160;
use sha2::Sha256;

/// SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&Sha256::digest(data));
    digest
}

/// Double SHA-256, Bitcoin's `hash256`.
pub fn hash256(data: &[u8]) -> [u8; 32] {
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&Sha256::digest(Sha256::digest(data)));
    digest
}

/// RIPEMD-160.
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut digest = [0u8; 20];
    digest.copy_from_slice(&Ripemd160::digest(data));
    digest
}

/// RIPEMD-160 of SHA-256, Bitcoin's `hash160`.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let mut digest = [0u8; 20];
    digest.copy_from_slice(&Ripemd160::digest(Sha256::digest(data)));
    digest
}

/// The BIP340/341 tags whose doubled prefixes are precomputed.
const CACHED_TAGS: [&str; 7] = [
    "TapLeaf",
    "TapBranch",
    "TapTweak",
    "TapSighash",
    "BIP0340/challenge",
    "BIP0340/aux",
    "BIP0340/nonce",
];

static TAG_PREFIXES: Lazy<Vec<(&'static str, [u8; 64])>> = Lazy::new(|| {
    CACHED_TAGS
        .iter()
        .map(|tag| (*tag, tag_prefix(tag)))
        .collect()
});

fn tag_prefix(tag: &str) -> [u8; 64] {
    let tag_digest = sha256(tag.as_bytes());
    let mut prefix = [0u8; 64];
    prefix[..32].copy_from_slice(&tag_digest);
    prefix[32..].copy_from_slice(&tag_digest);
    prefix
}

/// A SHA-256 instance primed with the doubled tag digest, ready to absorb the
/// message.
pub fn tagged_engine(tag: &str) -> Sha256 {
    let mut engine = Sha256::new();
    match TAG_PREFIXES.iter().find(|(t, _)| *t == tag) {
        Some((_, prefix)) => engine.update(prefix),
        None => engine.update(tag_prefix(tag)),
    }
    engine
}

/// BIP340 tagged hash of `msg` under `tag`.
pub fn tagged_hash(tag: &str, msg: &[u8]) -> [u8; 32] {
    let mut engine = tagged_engine(tag);
    engine.update(msg);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&engine.finalize());
    digest
}

/// An incremental BIP340 tagged hash: a SHA-256 instance primed with the
/// doubled tag digest.
pub struct TaggedHashWriter {
    internal: Sha256,
}

impl TaggedHashWriter {
    /// Prime a hasher for `tag`.
    pub fn new(tag: &str) -> Self {
        Self {
            internal: tagged_engine(tag),
        }
    }

    /// Absorb message bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.internal.update(data);
    }

    /// Consume the writer and produce the tagged digest.
    pub fn finish(self) -> [u8; 32] {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&self.internal.finalize());
        digest
    }
}

impl Write for TaggedHashWriter {
    fn write(&mut self, buf: &[u8]) -> IOResult<usize> {
        self.internal.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> IOResult<()> {
        Ok(())
    }
}

/// A struct that exposes a Bitcoin-style hash256 `Write` interface by wrapping
/// an internal SHA2 instance.
#[derive(Default)]
pub struct Hash256Writer {
    internal: Sha256,
}

impl Hash256Writer {
    /// Consume the writer and produce the double-SHA-256 digest.
    pub fn finish(self) -> [u8; 32] {
        let first = self.internal.finalize();
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&Sha256::digest(first));
        digest
    }
}

impl Write for Hash256Writer {
    fn write(&mut self, buf: &[u8]) -> IOResult<usize> {
        self.internal.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> IOResult<()> {
        Ok(())
    }
}

/// A struct that exposes a Bitcoin-style hash160 `Write` interface.
#[derive(Default)]
pub struct Hash160Writer {
    internal: Sha256,
}

impl Hash160Writer {
    /// Consume the writer and produce the RIPEMD-160-of-SHA-256 digest.
    pub fn finish(self) -> [u8; 20] {
        let first = self.internal.finalize();
        let mut digest = [0u8; 20];
        digest.copy_from_slice(&Ripemd160::digest(first));
        digest
    }
}

impl Write for Hash160Writer {
    fn write(&mut self, buf: &[u8]) -> IOResult<usize> {
        self.internal.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> IOResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_hashes_known_vectors() {
        // sha256("abc") from FIPS 180-2
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        // hash256 of empty string
        assert_eq!(
            hex::encode(hash256(b"")),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
        // ripemd160("abc")
        assert_eq!(
            hex::encode(ripemd160(b"abc")),
            "8eb208f7e05d987a9b044a8e98c6b087f15a0bfc"
        );
        // hash160 of the generator pubkey
        let pubkey =
            hex::decode("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
                .unwrap();
        assert_eq!(
            hex::encode(hash160(&pubkey)),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
    }

    #[test]
    fn it_computes_bip340_tagged_hashes() {
        // An uncached tag must agree with the manual construction.
        let tag = "SomeUnknownTag";
        let msg = b"message";
        let mut manual = Vec::new();
        manual.extend_from_slice(&sha256(tag.as_bytes()));
        manual.extend_from_slice(&sha256(tag.as_bytes()));
        manual.extend_from_slice(msg);
        assert_eq!(tagged_hash(tag, msg), sha256(&manual));

        // Cached tags take the precomputed-prefix path and must agree too.
        for tag in CACHED_TAGS {
            let mut manual = Vec::new();
            manual.extend_from_slice(&sha256(tag.as_bytes()));
            manual.extend_from_slice(&sha256(tag.as_bytes()));
            manual.extend_from_slice(msg);
            assert_eq!(tagged_hash(tag, msg), sha256(&manual));
        }

        // TapTweak of the BIP341 first-vector internal key. The tweak value is
        // the one the BIP341 wallet vectors derive for a keypath-only output.
        let internal =
            hex::decode("d6889cb081036e0faefa3a35157ad71086b123b2b144b649798b494c300a961d")
                .unwrap();
        assert_eq!(
            hex::encode(tagged_hash("TapTweak", &internal)),
            "b86e7be8f39bab32a6f2c0443abbc210f0edac0e2c53d501b36b64437d9c6c70"
        );
    }

    #[test]
    fn writers_match_oneshot_hashes() {
        let data = b"some data to hash incrementally";
        let mut w256 = Hash256Writer::default();
        w256.write_all(&data[..5]).unwrap();
        w256.write_all(&data[5..]).unwrap();
        assert_eq!(w256.finish(), hash256(data));

        let mut w160 = Hash160Writer::default();
        w160.write_all(data).unwrap();
        assert_eq!(w160.finish(), hash160(data));
    }
}
