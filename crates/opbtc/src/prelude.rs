//! Common re-exports.

pub use crate::enc::{
    decode_base58check, decode_bech32, encode_base58check, encode_bech32, from_output_script,
    to_output_script, Bech32Decoded, EncodingError,
};
pub use crate::nets::{
    Network, BITCOIN, OPNET, OPNET_REGTEST, OPNET_TESTNET, REGTEST, SIGNET, TESTNET,
};
pub use crate::payments::{
    embed, p2ms, p2op, p2pk, p2pkh, p2sh, p2tr, p2wpkh, p2wsh, Payment, PaymentError, PaymentKind,
    PaymentOptions,
};
pub use crate::script::{compile, decompile, from_asm, to_asm, Script, ScriptError, StackItem};
pub use crate::taproot::{ControlBlock, TapTree, TaprootError};
pub use crate::types::{Outpoint, Transaction, TxError, TxIn, TxOut, Witness};

pub use opbtc_core::prelude::*;
