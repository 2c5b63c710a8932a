//! Worker threads and their message protocol.
//!
//! Each worker owns one receive loop: `sign` requests carry the task and a
//! private-key copy, answered by `result` or `error`; `shutdown` is answered
//! by `shutdown-ack`. The key copy is scrubbed the moment the signing
//! operation finishes, on both paths — dropping the `Zeroizing` wrapper
//! overwrites the buffer.

use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, warn};
use opbtc_secp::EccError;
use zeroize::Zeroizing;

use crate::{PoolError, SignTask, SignatureType, TaskSignature};

enum ToWorker {
    Sign {
        task: SignTask,
        key: Box<Zeroizing<[u8; 32]>>,
    },
    Shutdown,
}

enum FromWorker {
    Ready,
    Signed {
        task_id: u64,
        input_index: u32,
        signature: Vec<u8>,
        pubkey: Vec<u8>,
    },
    Failed {
        task_id: u64,
        input_index: u32,
        message: String,
    },
    ShutdownAck,
}

/// What the pool should do with a worker after polling it.
pub(crate) enum Disposition {
    Keep,
    Terminate,
}

struct BusyTask {
    task_id: u64,
    input_index: u32,
    signature_type: SignatureType,
    leaf_hash: Option<opbtc_core::primitives::Bytes32>,
    deadline: Instant,
}

pub(crate) struct Worker {
    id: usize,
    sender: Sender<ToWorker>,
    receiver: Receiver<FromWorker>,
    handle: Option<JoinHandle<()>>,
    busy: Option<BusyTask>,
}

impl Worker {
    /// Spawn a worker thread and wait for its ready message.
    pub(crate) fn spawn(id: usize, init_timeout: Duration) -> Result<Worker, PoolError> {
        let (to_worker, from_pool) = channel::<ToWorker>();
        let (to_pool, from_worker) = channel::<FromWorker>();
        let handle = std::thread::Builder::new()
            .name(format!("opbtc-signer-{id}"))
            .spawn(move || worker_main(from_pool, to_pool))
            .map_err(|_| PoolError::WorkerGone)?;

        match from_worker.recv_timeout(init_timeout) {
            Ok(FromWorker::Ready) => {
                debug!("worker {id} ready");
                Ok(Worker {
                    id,
                    sender: to_worker,
                    receiver: from_worker,
                    handle: Some(handle),
                    busy: None,
                })
            }
            Ok(_) => Err(PoolError::UnknownMessageType),
            Err(_) => Err(PoolError::InitTimeout(init_timeout)),
        }
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.busy.is_some()
    }

    /// Ship a task and a key copy to the worker and start its hold clock.
    pub(crate) fn dispatch(&mut self, task: SignTask, secret: &[u8; 32], hold: Duration) {
        let busy = BusyTask {
            task_id: task.task_id,
            input_index: task.input_index,
            signature_type: task.signature_type,
            leaf_hash: task.leaf_hash,
            deadline: Instant::now() + hold,
        };
        let key = Box::new(Zeroizing::new(*secret));
        // A send failure surfaces as a disconnect on the next poll.
        let _ = self.sender.send(ToWorker::Sign { task, key });
        self.busy = Some(busy);
    }

    /// Poll for a reply. Returns `Terminate` when the worker blew its key
    /// hold deadline or hung up; the pool replaces it.
    pub(crate) fn collect(
        &mut self,
        signatures: &mut HashMap<u32, TaskSignature>,
        errors: &mut HashMap<u32, String>,
    ) -> Disposition {
        let busy = match &self.busy {
            Some(busy) => busy,
            None => return Disposition::Keep,
        };

        match self.receiver.try_recv() {
            Ok(FromWorker::Signed {
                task_id,
                input_index,
                signature,
                pubkey,
            }) => {
                if task_id != busy.task_id {
                    errors.insert(busy.input_index, PoolError::UnknownMessageType.to_string());
                } else {
                    signatures.insert(
                        input_index,
                        TaskSignature {
                            signature,
                            pubkey,
                            signature_type: busy.signature_type,
                            leaf_hash: busy.leaf_hash,
                        },
                    );
                }
                self.busy = None;
                Disposition::Keep
            }
            Ok(FromWorker::Failed {
                input_index,
                message,
                ..
            }) => {
                errors.insert(input_index, message);
                self.busy = None;
                Disposition::Keep
            }
            Ok(_) => {
                errors.insert(busy.input_index, PoolError::UnknownMessageType.to_string());
                self.busy = None;
                Disposition::Keep
            }
            Err(TryRecvError::Empty) => {
                if Instant::now() > busy.deadline {
                    warn!(
                        "worker {} exceeded its key hold time; terminating it",
                        self.id
                    );
                    errors.insert(
                        busy.input_index,
                        PoolError::SigningTimeout {
                            input_index: busy.input_index,
                        }
                        .to_string(),
                    );
                    Disposition::Terminate
                } else {
                    Disposition::Keep
                }
            }
            Err(TryRecvError::Disconnected) => {
                errors.insert(busy.input_index, PoolError::WorkerGone.to_string());
                Disposition::Terminate
            }
        }
    }

    /// Record a timeout for the in-flight task without waiting further.
    pub(crate) fn abandon(&self, errors: &mut HashMap<u32, String>) {
        if let Some(busy) = &self.busy {
            errors.insert(
                busy.input_index,
                PoolError::SigningTimeout {
                    input_index: busy.input_index,
                }
                .to_string(),
            );
        }
    }

    /// Cooperative shutdown: ask, wait for the ack up to `grace`, then cut
    /// the thread loose either way.
    pub(crate) fn shutdown(mut self, grace: Duration) {
        let _ = self.sender.send(ToWorker::Shutdown);
        let deadline = Instant::now() + grace;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(left) {
                Ok(FromWorker::ShutdownAck) => {
                    if let Some(handle) = self.handle.take() {
                        let _ = handle.join();
                    }
                    debug!("worker {} shut down", self.id);
                    return;
                }
                // Late signing replies drain here.
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    warn!("worker {} did not ack shutdown; detaching", self.id);
                    return;
                }
            }
        }
    }
}

fn worker_main(requests: Receiver<ToWorker>, replies: Sender<FromWorker>) {
    if replies.send(FromWorker::Ready).is_err() {
        return;
    }
    while let Ok(message) = requests.recv() {
        match message {
            ToWorker::Sign { task, key } => {
                let outcome = sign_one(&task, &key);
                // Scrub this worker's key copy before anything else.
                drop(key);
                let reply = match outcome {
                    Ok((signature, pubkey)) => FromWorker::Signed {
                        task_id: task.task_id,
                        input_index: task.input_index,
                        signature,
                        pubkey,
                    },
                    Err(e) => FromWorker::Failed {
                        task_id: task.task_id,
                        input_index: task.input_index,
                        message: e.to_string(),
                    },
                };
                if replies.send(reply).is_err() {
                    return;
                }
            }
            ToWorker::Shutdown => {
                let _ = replies.send(FromWorker::ShutdownAck);
                return;
            }
        }
    }
}

fn sign_one(task: &SignTask, key: &[u8; 32]) -> Result<(Vec<u8>, Vec<u8>), EccError> {
    let ecc = opbtc_secp::active()?;
    match task.signature_type {
        SignatureType::Ecdsa => {
            let signature = ecc.sign(task.hash.as_bytes(), key, task.low_r)?;
            let pubkey = ecc
                .point_from_scalar(key, true)?
                .ok_or(EccError::InvalidScalar)?;
            Ok((signature, pubkey))
        }
        SignatureType::Schnorr => {
            let signature = ecc.sign_schnorr(task.hash.as_bytes(), key)?;
            let pubkey = ecc.x_only_from_scalar(key)?;
            Ok((signature.to_vec(), pubkey.to_vec()))
        }
    }
}
