//! Registration-time verification of a candidate backend against fixed
//! secp256k1 vectors.
//!
//! The point vectors are BIP340 public keys (plus the generator); the
//! invalid entries are the BIP340 "not on curve" x and the field modulus.
//! The tweak vectors use the generator, so the expected results are the
//! well-known 2G and 3G coordinates, and `t = n - 1` lands on the point at
//! infinity.

use crate::{EccBackend, EccError};

/// x coordinate of the secp256k1 generator.
pub(crate) const GEN_X: [u8; 32] = [
    0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc, 0xbb, 0xac, 0x55, 0xa0, 0x62, 0x95, 0xce, 0x87, 0x0b,
    0x07, 0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce, 0x28, 0xd9, 0x59, 0xf2, 0x81, 0x5b, 0x16, 0xf8,
    0x17, 0x98,
];

const VALID_X_ONLY: [&str; 4] = [
    // G
    "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
    // 3G, the BIP340 vector-0 public key
    "f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9",
    // BIP340 vector-1 public key
    "dff1d77f2a671c5f36183726db2341be58feae1da2deced843240f7b502ba659",
    // BIP340 vector-2 public key
    "dd308afec5777e13121fa72b9cc1b7cc0139715309b086c960e18fd969774eb8",
];

const INVALID_X_ONLY: [&str; 2] = [
    // BIP340: not the x of any curve point
    "eefdea4cdb677750a420fee807eacf21eb9898ae79b9768766e4faa04a2d4a34",
    // the field modulus itself
    "fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f",
];

struct TweakVector {
    t: [u8; 32],
    expected: Option<([u8; 32], u8)>,
}

fn tweak_vectors() -> [TweakVector; 3] {
    let mut one = [0u8; 32];
    one[31] = 1;
    let mut two = [0u8; 32];
    two[31] = 2;
    // n - 1
    let n_minus_one = decode32("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364140");

    [
        // G + 1*G = 2G (even y)
        TweakVector {
            t: one,
            expected: Some((
                decode32("c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5"),
                0,
            )),
        },
        // G + 2*G = 3G (even y)
        TweakVector {
            t: two,
            expected: Some((
                decode32("f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9"),
                0,
            )),
        },
        // G + (n-1)*G is the point at infinity
        TweakVector {
            t: n_minus_one,
            expected: None,
        },
    ]
}

fn decode32(s: &str) -> [u8; 32] {
    let mut buf = [0u8; 32];
    let v = hex::decode(s).expect("static vector");
    buf.copy_from_slice(&v);
    buf
}

/// Run the fixed vectors against `backend`.
pub(crate) fn verify_backend(backend: &dyn EccBackend) -> Result<(), EccError> {
    for x in VALID_X_ONLY {
        if !backend.is_x_only_point(&decode32(x)) {
            return Err(EccError::VerificationFailed(
                "isXOnlyPoint rejected a valid point",
            ));
        }
    }
    for x in INVALID_X_ONLY {
        if backend.is_x_only_point(&decode32(x)) {
            return Err(EccError::VerificationFailed(
                "isXOnlyPoint accepted an invalid point",
            ));
        }
    }

    for vector in tweak_vectors() {
        let got = backend
            .x_only_add_tweak(&GEN_X, &vector.t)
            .map(|r| (r.x_only_pubkey, r.parity));
        if got != vector.expected {
            return Err(EccError::VerificationFailed(
                "xOnlyPointAddTweak disagreed with a fixed vector",
            ));
        }
    }

    Ok(())
}
