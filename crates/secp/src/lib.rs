//! # opbtc Secp
//!
//! A pluggable facade over secp256k1 curve operations.
//!
//! Callers provide an implementation of [`EccBackend`] and register it with
//! [`install`]. Registration runs a fixed self-test (known valid and invalid
//! x-only points, known tweak results) and rejects backends that disagree.
//! The installed backend lives in a single process-global cell; every
//! consumer reads the cell once per call through [`active`].
//!
//! The required capability set is the pair of x-only operations taproot
//! needs. Everything else (signing, verification, scalar arithmetic) is
//! optional: the provided default methods return
//! [`EccError::Unsupported`], and backends override what they offer.
//! [`RustSecp`] is a complete backend over the pure-Rust `k256` crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use thiserror::Error;

mod rust_secp;
mod selftest;

pub use rust_secp::RustSecp;

/// Errors raised by the facade or a backend.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EccError {
    /// No backend has been installed.
    #[error("no ECC backend installed")]
    NotInstalled,

    /// The backend failed the registration self-test.
    #[error("ECC backend failed verification: {0}")]
    VerificationFailed(&'static str),

    /// An optional capability was invoked on a backend that lacks it.
    #[error("ECC backend does not support {0}")]
    Unsupported(&'static str),

    /// A byte sequence did not parse as a curve point.
    #[error("invalid point encoding")]
    InvalidPoint,

    /// A byte sequence did not parse as a scalar in group range.
    #[error("invalid scalar")]
    InvalidScalar,

    /// Signing failed inside the backend.
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

/// Result of adding a tweak to an x-only point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XOnlyTweakResult {
    /// The x coordinate of the tweaked point.
    pub x_only_pubkey: [u8; 32],
    /// 0 when the tweaked point has even y, 1 when odd.
    pub parity: u8,
}

/// The capability set a secp256k1 implementation offers the rest of the
/// workspace.
///
/// `is_x_only_point` and `x_only_add_tweak` are required. The remaining
/// methods are optional; their default bodies report
/// [`EccError::Unsupported`] (and `is_point` falls back to a shape-only
/// check), so partial backends are usable for address derivation while a
/// full backend is needed for signing.
pub trait EccBackend: Send + Sync {
    /// True when `x` is the x coordinate of a curve point.
    fn is_x_only_point(&self, x: &[u8; 32]) -> bool;

    /// Compute `lift_x(p) + t*G`. `None` when the tweak is out of group
    /// range or the result is the point at infinity.
    fn x_only_add_tweak(&self, p: &[u8; 32], t: &[u8; 32]) -> Option<XOnlyTweakResult>;

    /// True when `p` is a valid SEC1 point encoding on the curve. The
    /// default checks byte shape only.
    fn is_point(&self, p: &[u8]) -> bool {
        matches!(
            (p.len(), p.first().copied()),
            (33, Some(0x02 | 0x03)) | (65, Some(0x04 | 0x06 | 0x07))
        )
    }

    /// ECDSA-sign a 32-byte digest, returning a DER-encoded low-S signature.
    /// With `low_r`, grind nonces until the R component has no high bit.
    fn sign(&self, _hash: &[u8; 32], _key: &[u8; 32], _low_r: bool) -> Result<Vec<u8>, EccError> {
        Err(EccError::Unsupported("sign"))
    }

    /// BIP340-sign a 32-byte digest.
    fn sign_schnorr(&self, _hash: &[u8; 32], _key: &[u8; 32]) -> Result<[u8; 64], EccError> {
        Err(EccError::Unsupported("signSchnorr"))
    }

    /// Verify a DER-encoded ECDSA signature over a 32-byte digest.
    fn verify(&self, _hash: &[u8; 32], _pubkey: &[u8], _sig_der: &[u8]) -> Result<bool, EccError> {
        Err(EccError::Unsupported("verify"))
    }

    /// Verify a BIP340 signature over a 32-byte digest.
    fn verify_schnorr(
        &self,
        _hash: &[u8; 32],
        _pubkey: &[u8; 32],
        _sig: &[u8; 64],
    ) -> Result<bool, EccError> {
        Err(EccError::Unsupported("verifySchnorr"))
    }

    /// Derive the SEC1 public key of a scalar. `Ok(None)` when the scalar is
    /// out of group range.
    fn point_from_scalar(
        &self,
        _key: &[u8; 32],
        _compressed: bool,
    ) -> Result<Option<Vec<u8>>, EccError> {
        Err(EccError::Unsupported("pointFromScalar"))
    }

    /// Derive the x-only public key of a scalar.
    fn x_only_from_scalar(&self, _key: &[u8; 32]) -> Result<[u8; 32], EccError> {
        Err(EccError::Unsupported("xOnlyPointFromScalar"))
    }

    /// Project a SEC1 public key to its x-only form.
    fn x_only_from_point(&self, _p: &[u8]) -> Result<[u8; 32], EccError> {
        Err(EccError::Unsupported("xOnlyPointFromPoint"))
    }

    /// `key + t mod n`. `Ok(None)` when the sum is zero.
    fn private_add(&self, _key: &[u8; 32], _t: &[u8; 32]) -> Result<Option<[u8; 32]>, EccError> {
        Err(EccError::Unsupported("privateAdd"))
    }

    /// `n - key`.
    fn private_negate(&self, _key: &[u8; 32]) -> Result<[u8; 32], EccError> {
        Err(EccError::Unsupported("privateNegate"))
    }
}

static ACTIVE: Lazy<RwLock<Option<Arc<dyn EccBackend>>>> = Lazy::new(|| RwLock::new(None));

fn cell_write() -> std::sync::RwLockWriteGuard<'static, Option<Arc<dyn EccBackend>>> {
    ACTIVE.write().unwrap_or_else(|e| e.into_inner())
}

fn cell_read() -> std::sync::RwLockReadGuard<'static, Option<Arc<dyn EccBackend>>> {
    ACTIVE.read().unwrap_or_else(|e| e.into_inner())
}

/// Verify and install an ECC backend; `None` clears the cell.
///
/// Re-installing the instance that is already active is a no-op. Installing
/// a different instance re-runs the self-test and swaps on success; on
/// failure the previous backend stays installed.
pub fn install(backend: Option<Arc<dyn EccBackend>>) -> Result<(), EccError> {
    match backend {
        None => {
            *cell_write() = None;
            Ok(())
        }
        Some(backend) => {
            {
                let guard = cell_read();
                if let Some(current) = guard.as_ref() {
                    if Arc::ptr_eq(current, &backend) {
                        return Ok(());
                    }
                }
            }
            selftest::verify_backend(backend.as_ref())?;
            *cell_write() = Some(backend);
            Ok(())
        }
    }
}

/// The installed backend, or [`EccError::NotInstalled`].
pub fn active() -> Result<Arc<dyn EccBackend>, EccError> {
    cell_read().clone().ok_or(EccError::NotInstalled)
}

/// True when a backend is installed.
pub fn installed() -> bool {
    cell_read().is_some()
}

#[cfg(test)]
mod test {
    use super::*;

    struct WrongParity;

    impl EccBackend for WrongParity {
        fn is_x_only_point(&self, x: &[u8; 32]) -> bool {
            RustSecp.is_x_only_point(x)
        }

        fn x_only_add_tweak(&self, p: &[u8; 32], t: &[u8; 32]) -> Option<XOnlyTweakResult> {
            RustSecp.x_only_add_tweak(p, t).map(|mut r| {
                r.parity ^= 1;
                r
            })
        }
    }

    struct AlwaysTrue;

    impl EccBackend for AlwaysTrue {
        fn is_x_only_point(&self, _x: &[u8; 32]) -> bool {
            true
        }

        fn x_only_add_tweak(&self, p: &[u8; 32], _t: &[u8; 32]) -> Option<XOnlyTweakResult> {
            Some(XOnlyTweakResult {
                x_only_pubkey: *p,
                parity: 0,
            })
        }
    }

    #[test]
    fn it_installs_verifies_and_swaps_backends() {
        let good: Arc<dyn EccBackend> = Arc::new(RustSecp);
        install(Some(good.clone())).unwrap();
        assert!(installed());

        // Same instance: no-op.
        install(Some(good.clone())).unwrap();

        // A backend lying about parity is rejected and the good one stays.
        let bad: Arc<dyn EccBackend> = Arc::new(WrongParity);
        match install(Some(bad)) {
            Err(EccError::VerificationFailed(_)) => {}
            other => panic!("expected VerificationFailed, got {:?}", other),
        }
        assert!(active().unwrap().x_only_add_tweak(
            &selftest::GEN_X,
            &{
                let mut t = [0u8; 32];
                t[31] = 1;
                t
            }
        )
        .is_some());

        // A backend accepting off-curve points is rejected too.
        let bad: Arc<dyn EccBackend> = Arc::new(AlwaysTrue);
        assert!(matches!(
            install(Some(bad)),
            Err(EccError::VerificationFailed(_))
        ));

        // Clearing and re-installing a fresh instance re-verifies it.
        install(None).unwrap();
        assert_eq!(active().err(), Some(EccError::NotInstalled));
        install(Some(Arc::new(RustSecp))).unwrap();
        assert!(installed());
    }
}
