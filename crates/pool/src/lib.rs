//! # opbtc Pool
//!
//! A worker pool that spreads ECDSA/Schnorr signing across threads while
//! keeping private-key material on a short leash.
//!
//! Key-lifetime contract: during a batch, the key lives in at most two
//! places — the caller's [`KeyMaterial`] buffer, which [`SigningPool::sign_batch`]
//! scrubs before returning on every path, and exactly one worker's message
//! copy, which the worker scrubs as soon as its one signing operation
//! completes or fails. Keys cross the thread boundary only as message
//! copies; there is no shared memory between workers. A worker that holds a
//! key past the configured hold time is presumed compromised: it is cut
//! loose and replaced, and its task reports a timeout.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

use std::collections::HashMap;
use std::time::{Duration, Instant};

use opbtc_core::primitives::Bytes32;
use opbtc_secp::EccError;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

mod worker;

use worker::Worker;

/// Errors raised by the pool itself; per-task failures land in
/// [`BatchResult::errors`] instead.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A worker did not report ready within the init timeout.
    #[error("worker failed to initialize within {0:?}")]
    InitTimeout(Duration),

    /// A worker held a key past the configured hold time.
    #[error("signing timed out for input {input_index}")]
    SigningTimeout {
        /// The input whose task timed out.
        input_index: u32,
    },

    /// A worker hung up mid-task.
    #[error("worker disconnected")]
    WorkerGone,

    /// A worker replied out of protocol.
    #[error("unexpected message from worker")]
    UnknownMessageType,

    /// Bubbled facade error.
    #[error(transparent)]
    Ecc(#[from] EccError),
}

/// Which signature algorithm a task wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureType {
    /// DER-encoded ECDSA.
    Ecdsa = 0,
    /// 64-byte BIP340 Schnorr.
    Schnorr = 1,
}

/// One signing job: a sighash digest plus bookkeeping.
#[derive(Debug, Clone)]
pub struct SignTask {
    /// Caller-chosen id, echoed in worker replies.
    pub task_id: u64,
    /// The transaction input this signature is for.
    pub input_index: u32,
    /// The 32-byte digest to sign.
    pub hash: Bytes32,
    /// ECDSA or Schnorr.
    pub signature_type: SignatureType,
    /// Grind ECDSA nonces for a low R.
    pub low_r: bool,
    /// The sighash type the digest committed to.
    pub sighash_type: u32,
    /// The tapleaf hash for script-path signatures.
    pub leaf_hash: Option<Bytes32>,
}

/// A finished signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSignature {
    /// DER bytes for ECDSA, 64 raw bytes for Schnorr.
    pub signature: Vec<u8>,
    /// Compressed SEC1 for ECDSA, x-only for Schnorr.
    pub pubkey: Vec<u8>,
    /// The algorithm used.
    pub signature_type: SignatureType,
    /// Echoed tapleaf hash.
    pub leaf_hash: Option<Bytes32>,
}

/// The outcome of one batch. `success` holds iff `errors` is empty.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// True when every task produced a signature.
    pub success: bool,
    /// Signatures keyed by input index.
    pub signatures: HashMap<u32, TaskSignature>,
    /// Failure messages keyed by input index.
    pub errors: HashMap<u32, String>,
    /// Wall-clock time the batch took.
    pub duration: Duration,
}

/// Caller-held private key for one batch. Scrubbed by `sign_batch` before
/// it returns, and again on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    /// The 32-byte secret scalar.
    pub secret: [u8; 32],
}

impl KeyMaterial {
    /// Wrap a secret scalar.
    pub fn new(secret: [u8; 32]) -> Self {
        Self { secret }
    }

    /// True when the buffer has been scrubbed.
    pub fn is_zeroed(&self) -> bool {
        self.secret.iter().all(|b| *b == 0)
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        write!(f, "KeyMaterial(..)")
    }
}

/// Pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads; defaults to available parallelism.
    pub worker_count: usize,
    /// Upper bound on a whole batch.
    pub task_timeout_ms: u64,
    /// Upper bound on one worker's key possession.
    pub max_key_hold_ms: u64,
    /// Verify every signature on the caller thread before reporting it.
    pub verify_signatures: bool,
    /// Keep idle workers alive between batches.
    pub preserve_workers: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            task_timeout_ms: 30_000,
            max_key_hold_ms: 5_000,
            verify_signatures: true,
            preserve_workers: false,
        }
    }
}

const IDLE_POLL: Duration = Duration::from_millis(10);
const INIT_TIMEOUT: Duration = Duration::from_secs(10);

/// A lazily initialized pool of signing workers.
pub struct SigningPool {
    config: PoolConfig,
    workers: Vec<Worker>,
    next_worker_id: usize,
}

impl SigningPool {
    /// Instantiate a pool; workers are spawned on first use.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            workers: vec![],
            next_worker_id: 0,
        }
    }

    /// Spawn workers up to the configured count and wait for each to report
    /// ready.
    pub fn initialize(&mut self) -> Result<(), PoolError> {
        while self.workers.len() < self.config.worker_count.max(1) {
            let worker = self.spawn_worker()?;
            self.workers.push(worker);
        }
        Ok(())
    }

    fn spawn_worker(&mut self) -> Result<Worker, PoolError> {
        let id = self.next_worker_id;
        self.next_worker_id += 1;
        Worker::spawn(id, INIT_TIMEOUT)
    }

    /// Toggle worker preservation across batches.
    pub fn preserve_workers(&mut self, preserve: bool) {
        self.config.preserve_workers = preserve;
    }

    /// Shut every worker down cooperatively: send `shutdown`, wait up to a
    /// second for the ack, then cut the worker loose regardless.
    pub fn release_workers(&mut self) {
        for worker in self.workers.drain(..) {
            worker.shutdown(Duration::from_secs(1));
        }
    }

    /// Alias for [`SigningPool::release_workers`]; the pool can be reused
    /// afterwards.
    pub fn shutdown(&mut self) {
        self.release_workers();
    }

    /// Sign every task in `tasks` with `key`, spreading work across idle
    /// workers. The caller's key buffer is scrubbed before this returns, on
    /// success and on error.
    pub fn sign_batch(
        &mut self,
        tasks: &[SignTask],
        key: &mut KeyMaterial,
    ) -> Result<BatchResult, PoolError> {
        let result = self.sign_batch_inner(tasks, key);
        key.zeroize();
        result
    }

    fn sign_batch_inner(
        &mut self,
        tasks: &[SignTask],
        key: &KeyMaterial,
    ) -> Result<BatchResult, PoolError> {
        let started = Instant::now();
        self.initialize()?;

        let mut signatures: HashMap<u32, TaskSignature> = HashMap::new();
        let mut errors: HashMap<u32, String> = HashMap::new();
        let mut pending: std::collections::VecDeque<SignTask> = tasks.to_vec().into();
        let batch_deadline = started + Duration::from_millis(self.config.task_timeout_ms);
        let hold = Duration::from_millis(self.config.max_key_hold_ms);

        loop {
            self.poll_workers(&mut signatures, &mut errors)?;

            // Hand pending tasks to idle workers, one key copy per task.
            let mut progressed = false;
            for worker in &mut self.workers {
                if worker.is_busy() {
                    continue;
                }
                let task = match pending.pop_front() {
                    Some(task) => task,
                    None => break,
                };
                worker.dispatch(task, &key.secret, hold);
                progressed = true;
            }

            let busy = self.workers.iter().any(|w| w.is_busy());
            if pending.is_empty() && !busy {
                break;
            }

            if Instant::now() > batch_deadline {
                for task in pending.drain(..) {
                    errors
                        .entry(task.input_index)
                        .or_insert_with(|| "batch timed out before dispatch".to_owned());
                }
                self.reap_timed_out(&mut errors, true);
                break;
            }

            if !progressed {
                std::thread::sleep(IDLE_POLL);
            }
        }

        if self.config.verify_signatures {
            self.verify(tasks, &mut signatures, &mut errors);
        }

        if !self.config.preserve_workers {
            self.release_workers();
        }

        Ok(BatchResult {
            success: errors.is_empty(),
            signatures,
            errors,
            duration: started.elapsed(),
        })
    }

    /// Collect replies and enforce per-worker key-hold deadlines. Workers
    /// past their deadline are presumed to have leaked their key copy: they
    /// are cut loose and replaced.
    fn poll_workers(
        &mut self,
        signatures: &mut HashMap<u32, TaskSignature>,
        errors: &mut HashMap<u32, String>,
    ) -> Result<(), PoolError> {
        let mut replacements = 0usize;
        self.workers.retain_mut(|worker| {
            match worker.collect(signatures, errors) {
                worker::Disposition::Keep => true,
                worker::Disposition::Terminate => {
                    replacements += 1;
                    false
                }
            }
        });
        for _ in 0..replacements {
            let worker = self.spawn_worker()?;
            self.workers.push(worker);
        }
        Ok(())
    }

    fn reap_timed_out(&mut self, errors: &mut HashMap<u32, String>, force_all_busy: bool) {
        self.workers.retain_mut(|worker| {
            if force_all_busy && worker.is_busy() {
                worker.abandon(errors);
                false
            } else {
                true
            }
        });
    }

    fn verify(
        &self,
        tasks: &[SignTask],
        signatures: &mut HashMap<u32, TaskSignature>,
        errors: &mut HashMap<u32, String>,
    ) {
        let ecc = match opbtc_secp::active() {
            Ok(ecc) => ecc,
            Err(_) => return,
        };
        for task in tasks {
            let entry = match signatures.get(&task.input_index) {
                Some(entry) => entry,
                None => continue,
            };
            let ok = match entry.signature_type {
                SignatureType::Ecdsa => ecc
                    .verify(task.hash.as_bytes(), &entry.pubkey, &entry.signature)
                    .unwrap_or(false),
                SignatureType::Schnorr => {
                    let pubkey: Result<[u8; 32], _> = entry.pubkey.as_slice().try_into();
                    let signature: Result<[u8; 64], _> = entry.signature.as_slice().try_into();
                    match (pubkey, signature) {
                        (Ok(pubkey), Ok(signature)) => ecc
                            .verify_schnorr(task.hash.as_bytes(), &pubkey, &signature)
                            .unwrap_or(false),
                        _ => false,
                    }
                }
            };
            if !ok {
                signatures.remove(&task.input_index);
                errors.insert(task.input_index, "signature failed verification".to_owned());
            }
        }
    }
}

impl Drop for SigningPool {
    fn drop(&mut self) {
        self.release_workers();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn key_material_scrubs_and_reports() {
        let mut key = KeyMaterial::new([7u8; 32]);
        assert!(!key.is_zeroed());
        key.zeroize();
        assert!(key.is_zeroed());
    }

    #[test]
    fn default_config_matches_the_contract() {
        let config = PoolConfig::default();
        assert!(config.worker_count >= 1);
        assert_eq!(config.task_timeout_ms, 30_000);
        assert_eq!(config.max_key_hold_ms, 5_000);
        assert!(config.verify_signatures);
        assert!(!config.preserve_workers);
    }
}
