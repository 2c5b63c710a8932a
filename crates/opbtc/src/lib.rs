//! # opbtc
//!
//! Bitcoin (and Bitcoin-compatible) transaction construction: payment
//! templates, script assembly, address encoding, taproot trees, and the
//! transaction wire types.
//!
//! ## Crate Layout
//!
//! ### Payments
//!
//! The `payments` module is the main interface. Each template constructor
//! (`p2pkh`, `p2wsh`, `p2tr`, ...) accepts a partial [`payments::Payment`]
//! record, derives every representation reachable from it (address, output
//! script, hash, input script, witness), and cross-checks any representation
//! the caller supplied:
//!
//! ```
//! use opbtc::payments;
//!
//! let pubkey = hex::decode(
//!     "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
//! ).unwrap();
//! let payment = payments::p2pkh(
//!     &payments::Payment {
//!         pubkey: Some(pubkey.as_slice().try_into().unwrap()),
//!         ..Default::default()
//!     },
//!     &payments::PaymentOptions::default(),
//! ).unwrap();
//! assert_eq!(
//!     payment.address.as_deref(),
//!     Some("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"),
//! );
//! ```
//!
//! ### Script
//!
//! Minimal-push compilation, decompilation, ASM rendering, script numbers,
//! and the strict-DER script-signature codec.
//!
//! ### Enc
//!
//! Base58Check and Bech32/Bech32m address codecs, plus
//! `to_output_script`/`from_output_script` dispatch over the templates.
//!
//! ### Taproot / Types
//!
//! BIP341 script trees and control blocks, and the transaction wire types.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod enc;
pub mod nets;
pub mod payments;
pub mod script;
pub mod taproot;
pub mod types;

pub mod prelude;
