//! Pay to script hash: `OP_HASH160 <hash160> OP_EQUAL`, wrapping a nested
//! redeem payment.

use opbtc_core::hashes::hash160;
use opbtc_core::primitives::Bytes20;

use super::{merge, network_of, Payment, PaymentError, PaymentKind, PaymentOptions};
use crate::enc::{decode_base58check, encode_base58check};
use crate::script::{
    compile, decompile,
    opcodes::{OP_EQUAL, OP_HASH160},
    Script, StackItem,
};

fn hash_from_output(output: &[u8]) -> Result<Bytes20, PaymentError> {
    if output.len() != 23 || output[0] != OP_HASH160 || output[1] != 0x14 || output[22] != OP_EQUAL
    {
        return Err(PaymentError::TemplateMismatch("p2sh"));
    }
    Ok(Bytes20::try_from(&output[2..22])?)
}

/// Split a scriptSig into the redeem payment it carries: every leading item
/// plus a final push of the serialized redeem script.
fn redeem_from_input(input: &Script, network: crate::nets::Network) -> Result<Payment, PaymentError> {
    let mut stack = decompile(input.as_ref()).ok_or(PaymentError::TemplateMismatch("p2sh"))?;
    let redeem_output = match stack.pop() {
        Some(StackItem::Push(bytes)) if !bytes.is_empty() => Script::new(bytes),
        _ => return Err(PaymentError::TemplateMismatch("p2sh")),
    };
    Ok(Payment {
        network: Some(network),
        output: Some(redeem_output),
        input: Some(compile(&stack)),
        ..Default::default()
    })
}

/// Build a p2sh payment from any of `{address, hash, output, redeem,
/// input}`.
pub fn p2sh(a: &Payment, opts: &PaymentOptions) -> Result<Payment, PaymentError> {
    let network = network_of(a);
    let mut hash: Option<Bytes20> = None;

    if let Some(address) = &a.address {
        let (version, decoded) = decode_base58check(address)?;
        if version != network.script_hash {
            return Err(PaymentError::NetworkMismatch);
        }
        merge(&mut hash, decoded, "hash")?;
    }
    if let Some(provided) = &a.hash {
        merge(&mut hash, Bytes20::try_from(provided.as_slice())?, "hash")?;
    }
    if let Some(output) = &a.output {
        merge(&mut hash, hash_from_output(output.as_ref())?, "hash")?;
    }

    let mut redeem = a.redeem.as_deref().cloned();
    if let Some(input) = &a.input {
        let extracted = redeem_from_input(input, network)?;
        match &mut redeem {
            None => redeem = Some(extracted),
            Some(existing) => {
                if let Some(extracted_output) = extracted.output {
                    merge(&mut existing.output, extracted_output, "redeem.output")?;
                }
                if let Some(extracted_input) = extracted.input {
                    merge(&mut existing.input, extracted_input, "redeem.input")?;
                }
            }
        }
    }

    if let Some(redeem) = &redeem {
        if let Some(redeem_network) = redeem.network {
            if redeem_network != network {
                return Err(PaymentError::NetworkMismatch);
            }
        }
        let redeem_output = redeem
            .output
            .as_ref()
            .ok_or(PaymentError::NotEnoughData("redeem.output"))?;
        if redeem_output.is_empty() {
            return Err(PaymentError::NotEnoughData("redeem.output"));
        }
        merge(&mut hash, Bytes20::new(hash160(redeem_output.as_ref())), "hash")?;

        if opts.validate {
            if let Some(redeem_input) = &redeem.input {
                // A scriptSig may carry pushes only, and a nested-segwit
                // redeem keeps its scriptSig empty.
                if !redeem_input.is_push_only() {
                    return Err(PaymentError::Mismatch("redeem.input"));
                }
                if !redeem_input.is_empty()
                    && redeem.witness.as_ref().map(|w| !w.is_empty()).unwrap_or(false)
                {
                    return Err(PaymentError::Mismatch("redeem.witness"));
                }
            }
        }
    }

    let hash = hash.ok_or(PaymentError::NotEnoughData("hash"))?;
    let output = compile(&[
        StackItem::Op(OP_HASH160),
        StackItem::Push(hash.as_ref().to_vec()),
        StackItem::Op(OP_EQUAL),
    ]);
    if opts.validate {
        if let Some(provided) = &a.output {
            if provided != &output {
                return Err(PaymentError::Mismatch("output"));
            }
        }
    }
    let address = encode_base58check(network.script_hash, &hash);

    let mut input = None;
    let mut witness = a.witness.clone();
    if let Some(redeem) = &redeem {
        let redeem_output = redeem
            .output
            .as_ref()
            .ok_or(PaymentError::NotEnoughData("redeem.output"))?;
        let has_witness = redeem.witness.as_ref().map(|w| !w.is_empty()).unwrap_or(false);
        if redeem.input.is_some() || has_witness {
            let mut stack = match &redeem.input {
                Some(redeem_input) => {
                    decompile(redeem_input.as_ref())
                        .ok_or(PaymentError::TemplateMismatch("p2sh"))?
                }
                None => vec![],
            };
            stack.push(StackItem::Push(redeem_output.as_ref().to_vec()));
            input = Some(compile(&stack));
        }
        if let Some(redeem_witness) = &redeem.witness {
            merge(&mut witness, redeem_witness.clone(), "witness")?;
        }
    }

    Ok(Payment {
        kind: Some(PaymentKind::P2sh),
        network: Some(network),
        output: Some(output),
        input,
        witness,
        address: Some(address),
        hash: Some(hash.as_ref().to_vec()),
        redeem: redeem.map(Box::new),
        ..Default::default()
    })
}
