//! Payment templates.
//!
//! Each constructor accepts a partial [`Payment`] record and returns a fully
//! populated one: every representation reachable from the given fields
//! (address, output script, hash, input script, witness stack) is derived at
//! construction, and with validation on (the default) every representation
//! the caller supplied is cross-checked against its derived counterpart.
//! The same payment reached through two different derivation paths is
//! byte-identical.

use opbtc_core::primitives::{DerSignature, PrimitiveError, PubKey, XOnlyPubKey};
use opbtc_secp::EccError;
use thiserror::Error;

use crate::enc::EncodingError;
use crate::nets::{Network, BITCOIN};
use crate::script::{Script, ScriptError};
use crate::taproot::{TapTree, TaprootError};

mod embed;
mod p2ms;
mod p2op;
mod p2pk;
mod p2pkh;
mod p2sh;
mod p2tr;
mod p2wpkh;
mod p2wsh;

pub use embed::embed;
pub use p2ms::p2ms;
pub use p2op::p2op;
pub use p2pk::p2pk;
pub use p2pkh::p2pkh;
pub use p2sh::p2sh;
pub use p2tr::p2tr;
pub use p2wpkh::p2wpkh;
pub use p2wsh::p2wsh;

/// The nine payment kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentKind {
    /// Pay to public key.
    P2pk,
    /// Pay to public-key hash.
    P2pkh,
    /// Bare m-of-n multisig.
    P2ms,
    /// Pay to script hash.
    P2sh,
    /// Pay to witness public-key hash.
    P2wpkh,
    /// Pay to witness script hash.
    P2wsh,
    /// Taproot (witness v1).
    P2tr,
    /// OPNet (witness v16).
    P2op,
    /// OP_RETURN data embed.
    Embed,
}

impl PaymentKind {
    /// The template's conventional name.
    pub fn name(&self) -> &'static str {
        match self {
            PaymentKind::P2pk => "p2pk",
            PaymentKind::P2pkh => "p2pkh",
            PaymentKind::P2ms => "p2ms",
            PaymentKind::P2sh => "p2sh",
            PaymentKind::P2wpkh => "p2wpkh",
            PaymentKind::P2wsh => "p2wsh",
            PaymentKind::P2tr => "p2tr",
            PaymentKind::P2op => "p2op",
            PaymentKind::Embed => "embed",
        }
    }
}

/// Options accepted by every template constructor.
#[derive(Debug, Clone, Copy)]
pub struct PaymentOptions {
    /// Cross-check every provided representation against its derived
    /// counterpart. Defaults to on.
    pub validate: bool,
    /// Permit partially signed inputs (multisig placeholder signatures).
    pub allow_incomplete: bool,
}

impl Default for PaymentOptions {
    fn default() -> Self {
        Self {
            validate: true,
            allow_incomplete: false,
        }
    }
}

/// The union of fields any template can populate. Constructors take this
/// record partially filled and return it fully derived; nesting (`redeem`)
/// reuses the same type.
#[derive(Clone, Debug, Default)]
pub struct Payment {
    /// Which template produced this payment.
    pub kind: Option<PaymentKind>,
    /// The network the payment addresses.
    pub network: Option<Network>,
    /// The locking script.
    pub output: Option<Script>,
    /// The unlocking script.
    pub input: Option<Script>,
    /// The witness stack.
    pub witness: Option<Vec<Vec<u8>>>,
    /// The human-readable address.
    pub address: Option<String>,
    /// The template's hash or program bytes.
    pub hash: Option<Vec<u8>>,
    /// A single public key.
    pub pubkey: Option<PubKey>,
    /// Multisig public keys.
    pub pubkeys: Option<Vec<PubKey>>,
    /// A single script signature.
    pub signature: Option<Vec<u8>>,
    /// Multisig script signatures.
    pub signatures: Option<Vec<Vec<u8>>>,
    /// Multisig threshold.
    pub m: Option<u8>,
    /// Multisig key count.
    pub n: Option<u8>,
    /// OP_RETURN data pushes.
    pub data: Option<Vec<Vec<u8>>>,
    /// The nested payment a script-hash template wraps.
    pub redeem: Option<Box<Payment>>,
    /// The taproot tweaked output key.
    pub output_key: Option<XOnlyPubKey>,
    /// The taproot internal key.
    pub internal_pubkey: Option<XOnlyPubKey>,
    /// The taproot script tree.
    pub script_tree: Option<TapTree>,
    /// The taproot leaf version of the redeem script.
    pub redeem_version: Option<u8>,
}

/// Errors raised by template constructors.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The given fields do not reach the requested representation.
    #[error("not enough data to derive {0}")]
    NotEnoughData(&'static str),

    /// A provided output script does not have the template's shape.
    #[error("output does not match the {0} template")]
    TemplateMismatch(&'static str),

    /// A provided representation disagreed with its derived counterpart.
    #[error("{0} does not match its derived value")]
    Mismatch(&'static str),

    /// A provided hash disagreed with the hash of the provided preimage.
    #[error("hash does not match the provided preimage")]
    HashMismatch,

    /// An address version or prefix belongs to a different network.
    #[error("address does not match the payment network")]
    NetworkMismatch,

    /// A public key failed the point check.
    #[error("pubkey is not a valid curve point")]
    InvalidPoint,

    /// A signature failed its canonicality check.
    #[error("signature is not canonical")]
    InvalidSignature,

    /// Witness payments only accept 33-byte keys.
    #[error("uncompressed pubkey in a witness payment")]
    UncompressedPubkey,

    /// Multisig bounds `1 <= m <= n <= 16` violated.
    #[error("multisig bounds violated: m={m} n={n}")]
    MultisigBounds {
        /// Threshold.
        m: u8,
        /// Key count.
        n: u8,
    },

    /// Address codec failure.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Script assembly failure.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// Taproot tree or control-block failure.
    #[error(transparent)]
    Taproot(#[from] TaprootError),

    /// ECC facade failure.
    #[error(transparent)]
    Ecc(#[from] EccError),

    /// Branded-type constructor failure.
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),
}

pub(crate) fn network_of(a: &Payment) -> Network {
    a.network.unwrap_or(BITCOIN)
}

/// Merge a derived value into a slot, rejecting disagreement with an
/// already-present value.
pub(crate) fn merge<T: PartialEq>(
    slot: &mut Option<T>,
    value: T,
    what: &'static str,
) -> Result<(), PaymentError> {
    match slot {
        Some(existing) if *existing != value => Err(PaymentError::Mismatch(what)),
        Some(_) => Ok(()),
        None => {
            *slot = Some(value);
            Ok(())
        }
    }
}

/// Point-check a public key through the installed backend; with no backend
/// installed the branded type's shape check stands alone.
pub(crate) fn check_pubkey(pubkey: &PubKey) -> Result<(), PaymentError> {
    if let Ok(ecc) = opbtc_secp::active() {
        if !ecc.is_point(pubkey.as_ref()) {
            return Err(PaymentError::InvalidPoint);
        }
    }
    Ok(())
}

/// Canonicality-check an ECDSA script signature: length envelope first,
/// then strict DER and low S.
pub(crate) fn check_ecdsa_signature(sig: &[u8]) -> Result<(), PaymentError> {
    DerSignature::try_from(sig)?;
    if !crate::script::signature::is_canonical_script_signature(sig) {
        return Err(PaymentError::InvalidSignature);
    }
    Ok(())
}
