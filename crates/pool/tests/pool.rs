//! End-to-end batch signing through the k256 backend.
//!
//! The ECC registration cell is process-global, so everything that installs
//! a backend runs as sequential phases of one test.

use std::sync::Arc;
use std::time::Duration;

use opbtc_core::primitives::Bytes32;
use opbtc_pool::{KeyMaterial, PoolConfig, SignTask, SignatureType, SigningPool};
use opbtc_secp::{EccBackend, EccError, RustSecp, XOnlyTweakResult};

fn digest(byte: u8) -> Bytes32 {
    Bytes32::new([byte; 32])
}

fn task(input_index: u32, signature_type: SignatureType, hash: Bytes32) -> SignTask {
    SignTask {
        task_id: input_index as u64 + 1,
        input_index,
        hash,
        signature_type,
        low_r: false,
        sighash_type: if signature_type == SignatureType::Ecdsa {
            1
        } else {
            0
        },
        leaf_hash: None,
    }
}

/// Delegates to `RustSecp` after a long nap; used to trip the key-hold
/// deadline.
struct SluggishSecp;

impl EccBackend for SluggishSecp {
    fn is_x_only_point(&self, x: &[u8; 32]) -> bool {
        RustSecp.is_x_only_point(x)
    }

    fn x_only_add_tweak(&self, p: &[u8; 32], t: &[u8; 32]) -> Option<XOnlyTweakResult> {
        RustSecp.x_only_add_tweak(p, t)
    }

    fn sign(&self, hash: &[u8; 32], key: &[u8; 32], low_r: bool) -> Result<Vec<u8>, EccError> {
        std::thread::sleep(Duration::from_millis(2_000));
        RustSecp.sign(hash, key, low_r)
    }

    fn verify(&self, hash: &[u8; 32], pubkey: &[u8], sig: &[u8]) -> Result<bool, EccError> {
        RustSecp.verify(hash, pubkey, sig)
    }

    fn point_from_scalar(
        &self,
        key: &[u8; 32],
        compressed: bool,
    ) -> Result<Option<Vec<u8>>, EccError> {
        RustSecp.point_from_scalar(key, compressed)
    }
}

#[test]
fn batches_sign_verify_and_scrub() {
    opbtc_secp::install(Some(Arc::new(RustSecp))).unwrap();

    // Phase 1: a mixed ECDSA/Schnorr batch succeeds and scrubs the key.
    let mut pool = SigningPool::new(PoolConfig {
        worker_count: 2,
        ..Default::default()
    });
    let tasks = vec![
        task(0, SignatureType::Ecdsa, digest(0x51)),
        task(1, SignatureType::Schnorr, digest(0x52)),
    ];
    let mut key = KeyMaterial::new([3u8; 32]);
    let result = pool.sign_batch(&tasks, &mut key).unwrap();

    assert!(result.success, "errors: {:?}", result.errors);
    assert!(result.errors.is_empty());
    assert_eq!(result.signatures.len(), 2);
    assert!(key.is_zeroed(), "caller key buffer must be scrubbed");

    let ecdsa = &result.signatures[&0];
    assert_eq!(ecdsa.signature_type, SignatureType::Ecdsa);
    assert_eq!(ecdsa.signature[0], 0x30);
    assert_eq!(ecdsa.pubkey.len(), 33);

    let schnorr = &result.signatures[&1];
    assert_eq!(schnorr.signature_type, SignatureType::Schnorr);
    assert_eq!(schnorr.signature.len(), 64);
    assert_eq!(schnorr.pubkey.len(), 32);

    // Phase 2: N concurrent tasks yield N signatures, keyed by input index.
    let mut pool = SigningPool::new(PoolConfig {
        worker_count: 4,
        preserve_workers: true,
        ..Default::default()
    });
    let tasks: Vec<SignTask> = (0..16)
        .map(|i| task(i, SignatureType::Ecdsa, digest(i as u8 + 1)))
        .collect();
    let mut key = KeyMaterial::new([3u8; 32]);
    let result = pool.sign_batch(&tasks, &mut key).unwrap();
    assert!(result.success);
    assert_eq!(result.signatures.len(), 16);
    for i in 0..16u32 {
        assert!(result.signatures.contains_key(&i));
    }
    assert!(key.is_zeroed());

    // Phase 3: preserved workers take a second batch.
    let mut key = KeyMaterial::new([7u8; 32]);
    let result = pool
        .sign_batch(&[task(0, SignatureType::Schnorr, digest(0x99))], &mut key)
        .unwrap();
    assert!(result.success);
    pool.release_workers();

    // Phase 4: a worker that sits on the key past the hold deadline is
    // terminated and its task reports a timeout, without failing the pool.
    opbtc_secp::install(Some(Arc::new(SluggishSecp))).unwrap();
    let mut pool = SigningPool::new(PoolConfig {
        worker_count: 1,
        max_key_hold_ms: 50,
        verify_signatures: false,
        ..Default::default()
    });
    let mut key = KeyMaterial::new([3u8; 32]);
    let result = pool
        .sign_batch(&[task(0, SignatureType::Ecdsa, digest(0x42))], &mut key)
        .unwrap();
    assert!(!result.success);
    assert!(result.errors.contains_key(&0));
    assert!(result.errors[&0].contains("timed out"));
    assert!(key.is_zeroed(), "key is scrubbed on the error path too");

    // Phase 5: back to the fast backend; the replacement pool still works.
    opbtc_secp::install(Some(Arc::new(RustSecp))).unwrap();
    let mut key = KeyMaterial::new([3u8; 32]);
    let result = pool
        .sign_batch(&[task(0, SignatureType::Ecdsa, digest(0x43))], &mut key)
        .unwrap();
    assert!(result.success, "errors: {:?}", result.errors);
}
