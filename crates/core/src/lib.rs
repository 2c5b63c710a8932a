//! # opbtc Core
//!
//! `opbtc-core` contains the byte-level utilities shared by the `opbtc`,
//! `opbtc-secp`, and `opbtc-pool` crates.
//!
//! ## Crate Layout
//!
//! ### Ser
//!
//! The `ser` module holds all length-prefix and integer-width logic for the
//! Bitcoin wire format: a cursor-bounded `ByteWriter`/`ByteReader` pair,
//! CompactSize helpers over `std::io::{Read, Write}`, and the `ByteFormat`
//! trait implemented by wire-format types. No other crate in the workspace
//! performs its own length math.
//!
//! ### Hashes
//!
//! `sha256`, `hash256` (double sha2), `ripemd160`, `hash160`, incremental
//! writer wrappers, and BIP340 tagged hashes with cached tag prefixes.
//!
//! ### Primitives
//!
//! Branded byte sequences (`Bytes20`, `Bytes32`, `PubKey`, `XOnlyPubKey`,
//! `PrivKey`, `DerSignature`, `SchnorrSignature`) and the range-checked
//! `Satoshi` amount. Constructors validate length and value shape; curve
//! membership beyond shape is the ECC facade's business.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

#[macro_use]
pub mod macros;

pub mod hashes;
pub mod primitives;
pub mod ser;

pub mod prelude;
