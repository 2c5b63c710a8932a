//! Pay to witness public-key hash: `OP_0 <hash160>`.

use opbtc_core::hashes::hash160;
use opbtc_core::primitives::{Bytes20, PubKey};

use super::{
    check_ecdsa_signature, check_pubkey, merge, network_of, Payment, PaymentError, PaymentKind,
    PaymentOptions,
};
use crate::enc::{decode_bech32, encode_bech32};
use crate::script::{compile, opcodes::OP_0, Script, StackItem};

fn hash_from_output(output: &[u8]) -> Result<Bytes20, PaymentError> {
    if output.len() != 22 || output[0] != OP_0 || output[1] != 0x14 {
        return Err(PaymentError::TemplateMismatch("p2wpkh"));
    }
    Ok(Bytes20::try_from(&output[2..])?)
}

/// Build a p2wpkh payment from any of `{address, hash, output, pubkey,
/// witness}`.
pub fn p2wpkh(a: &Payment, opts: &PaymentOptions) -> Result<Payment, PaymentError> {
    let network = network_of(a);
    let mut hash: Option<Bytes20> = None;

    if let Some(address) = &a.address {
        let decoded = decode_bech32(address)?;
        if decoded.prefix != network.bech32 {
            return Err(PaymentError::NetworkMismatch);
        }
        if decoded.version != 0 {
            return Err(PaymentError::TemplateMismatch("p2wpkh"));
        }
        merge(&mut hash, Bytes20::try_from(decoded.program.as_slice())?, "hash")?;
    }
    if let Some(provided) = &a.hash {
        merge(&mut hash, Bytes20::try_from(provided.as_slice())?, "hash")?;
    }
    if let Some(output) = &a.output {
        merge(&mut hash, hash_from_output(output.as_ref())?, "hash")?;
    }

    let mut pubkey = a.pubkey.clone();
    let mut signature = a.signature.clone();
    if let Some(witness) = &a.witness {
        match witness.as_slice() {
            [sig, pk] => {
                merge(&mut signature, sig.clone(), "signature")?;
                let pk = PubKey::try_from(pk.as_slice())?;
                merge(&mut pubkey, pk, "pubkey")?;
            }
            _ => return Err(PaymentError::TemplateMismatch("p2wpkh")),
        }
    }

    if let Some(pk) = &pubkey {
        // Witness v0 key-hash programs commit to compressed keys only.
        if !pk.is_compressed() {
            return Err(PaymentError::UncompressedPubkey);
        }
        merge(&mut hash, Bytes20::new(hash160(pk.as_ref())), "hash")?;
    }

    let hash = hash.ok_or(PaymentError::NotEnoughData("hash"))?;
    if opts.validate {
        if let Some(pk) = &pubkey {
            check_pubkey(pk)?;
        }
        if let Some(sig) = &signature {
            check_ecdsa_signature(sig)?;
        }
    }

    let output = compile(&[
        StackItem::Op(OP_0),
        StackItem::Push(hash.as_ref().to_vec()),
    ]);
    if opts.validate {
        if let Some(provided) = &a.output {
            if provided != &output {
                return Err(PaymentError::Mismatch("output"));
            }
        }
    }
    let address = encode_bech32(hash.as_ref(), 0, network.bech32, None)?;

    let witness = match (&signature, &pubkey) {
        (Some(sig), Some(pk)) => Some(vec![sig.clone(), pk.as_ref().to_vec()]),
        _ => None,
    };
    let input = witness.as_ref().map(|_| Script::null());

    Ok(Payment {
        kind: Some(PaymentKind::P2wpkh),
        network: Some(network),
        output: Some(output),
        input,
        witness,
        address: Some(address),
        hash: Some(hash.as_ref().to_vec()),
        pubkey,
        signature,
        ..Default::default()
    })
}
