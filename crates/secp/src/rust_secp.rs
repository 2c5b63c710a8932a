//! A complete [`EccBackend`] over the pure-Rust `k256` crate.

use k256::{
    ecdsa::{
        hazmat::SignPrimitive,
        signature::hazmat::{PrehashSigner, PrehashVerifier},
        Signature as EcdsaSignature, SigningKey, VerifyingKey,
    },
    elliptic_curve::{
        sec1::{FromEncodedPoint, ToEncodedPoint},
        Field, PrimeField,
    },
    schnorr, AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, Scalar, SecretKey,
};
use sha2::Sha256;

use crate::{EccBackend, EccError, XOnlyTweakResult};

/// The default backend: `k256` arithmetic, ECDSA, and BIP340 Schnorr.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustSecp;

fn lift_x(x: &[u8; 32]) -> Option<AffinePoint> {
    let mut sec1 = [0u8; 33];
    sec1[0] = 0x02;
    sec1[1..].copy_from_slice(x);
    let encoded = EncodedPoint::from_bytes(sec1).ok()?;
    Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
}

fn parse_point(p: &[u8]) -> Option<AffinePoint> {
    // Normalize hybrid prefixes to plain uncompressed before parsing; the
    // y parity they redundantly encode is checked against the payload below.
    let mut bytes = p.to_vec();
    let hybrid_parity = match (p.len(), p.first()) {
        (65, Some(0x06)) => {
            bytes[0] = 0x04;
            Some(0u8)
        }
        (65, Some(0x07)) => {
            bytes[0] = 0x04;
            Some(1u8)
        }
        _ => None,
    };
    let encoded = EncodedPoint::from_bytes(&bytes).ok()?;
    let point = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))?;
    if let Some(parity) = hybrid_parity {
        let compressed = point.to_encoded_point(true);
        let is_odd = compressed.as_bytes()[0] == 0x03;
        if (parity == 1) != is_odd {
            return None;
        }
    }
    Some(point)
}

fn parse_scalar(bytes: &[u8; 32]) -> Option<Scalar> {
    Option::<Scalar>::from(Scalar::from_repr(*FieldBytes::from_slice(bytes)))
}

fn scalar_to_array(scalar: &Scalar) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&scalar.to_repr());
    out
}

impl EccBackend for RustSecp {
    fn is_x_only_point(&self, x: &[u8; 32]) -> bool {
        lift_x(x).is_some()
    }

    fn x_only_add_tweak(&self, p: &[u8; 32], t: &[u8; 32]) -> Option<XOnlyTweakResult> {
        let point = lift_x(p)?;
        let tweak = parse_scalar(t)?;
        let tweaked = ProjectivePoint::from(point) + ProjectivePoint::GENERATOR * tweak;
        if tweaked == ProjectivePoint::IDENTITY {
            return None;
        }
        let encoded = tweaked.to_affine().to_encoded_point(true);
        let mut x_only = [0u8; 32];
        x_only.copy_from_slice(&encoded.as_bytes()[1..]);
        Some(XOnlyTweakResult {
            x_only_pubkey: x_only,
            parity: if encoded.as_bytes()[0] == 0x03 { 1 } else { 0 },
        })
    }

    fn is_point(&self, p: &[u8]) -> bool {
        matches!(p.len(), 33 | 65) && parse_point(p).is_some()
    }

    fn sign(&self, hash: &[u8; 32], key: &[u8; 32], low_r: bool) -> Result<Vec<u8>, EccError> {
        let signing_key =
            SigningKey::from_bytes(FieldBytes::from_slice(key)).map_err(|_| EccError::InvalidScalar)?;
        let mut signature: EcdsaSignature = signing_key
            .sign_prehash(hash)
            .map_err(|e| EccError::SigningFailed(e.to_string()))?;

        if low_r {
            // Grind deterministic nonces with a counter as RFC6979 extra data
            // until the R component clears its high bit.
            let secret = signing_key.as_nonzero_scalar();
            let z = FieldBytes::from_slice(hash);
            let mut counter: u32 = 0;
            while signature.split_bytes().0[0] & 0x80 != 0 {
                counter += 1;
                let mut extra = [0u8; 32];
                extra[..4].copy_from_slice(&counter.to_le_bytes());
                let (ground, _) = secret
                    .try_sign_prehashed_rfc6979::<Sha256>(z, &extra)
                    .map_err(|e| EccError::SigningFailed(e.to_string()))?;
                signature = ground;
            }
        }

        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(signature.to_der().as_bytes().to_vec())
    }

    fn sign_schnorr(&self, hash: &[u8; 32], key: &[u8; 32]) -> Result<[u8; 64], EccError> {
        let signing_key =
            schnorr::SigningKey::from_bytes(key).map_err(|_| EccError::InvalidScalar)?;
        let signature = signing_key
            .sign_raw(hash, &[0u8; 32])
            .map_err(|e| EccError::SigningFailed(e.to_string()))?;
        Ok(signature.to_bytes())
    }

    fn verify(&self, hash: &[u8; 32], pubkey: &[u8], sig_der: &[u8]) -> Result<bool, EccError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(pubkey).map_err(|_| EccError::InvalidPoint)?;
        let signature = match EcdsaSignature::from_der(sig_der) {
            Ok(sig) => sig,
            Err(_) => return Ok(false),
        };
        Ok(verifying_key.verify_prehash(hash, &signature).is_ok())
    }

    fn verify_schnorr(
        &self,
        hash: &[u8; 32],
        pubkey: &[u8; 32],
        sig: &[u8; 64],
    ) -> Result<bool, EccError> {
        let verifying_key =
            schnorr::VerifyingKey::from_bytes(pubkey).map_err(|_| EccError::InvalidPoint)?;
        let signature = match schnorr::Signature::try_from(&sig[..]) {
            Ok(sig) => sig,
            Err(_) => return Ok(false),
        };
        Ok(verifying_key.verify_raw(hash, &signature).is_ok())
    }

    fn point_from_scalar(
        &self,
        key: &[u8; 32],
        compressed: bool,
    ) -> Result<Option<Vec<u8>>, EccError> {
        let secret = match SecretKey::from_bytes(FieldBytes::from_slice(key)) {
            Ok(secret) => secret,
            Err(_) => return Ok(None),
        };
        let encoded = secret.public_key().to_encoded_point(compressed);
        Ok(Some(encoded.as_bytes().to_vec()))
    }

    fn x_only_from_scalar(&self, key: &[u8; 32]) -> Result<[u8; 32], EccError> {
        let secret =
            SecretKey::from_bytes(FieldBytes::from_slice(key)).map_err(|_| EccError::InvalidScalar)?;
        let encoded = secret.public_key().to_encoded_point(true);
        let mut x_only = [0u8; 32];
        x_only.copy_from_slice(&encoded.as_bytes()[1..]);
        Ok(x_only)
    }

    fn x_only_from_point(&self, p: &[u8]) -> Result<[u8; 32], EccError> {
        let point = parse_point(p).ok_or(EccError::InvalidPoint)?;
        let encoded = point.to_encoded_point(true);
        let mut x_only = [0u8; 32];
        x_only.copy_from_slice(&encoded.as_bytes()[1..]);
        Ok(x_only)
    }

    fn private_add(&self, key: &[u8; 32], t: &[u8; 32]) -> Result<Option<[u8; 32]>, EccError> {
        let key = parse_scalar(key).ok_or(EccError::InvalidScalar)?;
        let tweak = parse_scalar(t).ok_or(EccError::InvalidScalar)?;
        let sum = key + tweak;
        if sum == Scalar::ZERO {
            return Ok(None);
        }
        Ok(Some(scalar_to_array(&sum)))
    }

    fn private_negate(&self, key: &[u8; 32]) -> Result<[u8; 32], EccError> {
        let key = parse_scalar(key).ok_or(EccError::InvalidScalar)?;
        Ok(scalar_to_array(&(-key)))
    }
}
