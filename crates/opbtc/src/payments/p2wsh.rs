//! Pay to witness script hash: `OP_0 <sha256>`.

use opbtc_core::hashes::sha256;
use opbtc_core::primitives::Bytes32;

use super::{merge, network_of, Payment, PaymentError, PaymentKind, PaymentOptions};
use crate::enc::{decode_bech32, encode_bech32};
use crate::script::{compile, decompile, opcodes::OP_0, Script, StackItem};

fn hash_from_output(output: &[u8]) -> Result<Bytes32, PaymentError> {
    if output.len() != 34 || output[0] != OP_0 || output[1] != 0x20 {
        return Err(PaymentError::TemplateMismatch("p2wsh"));
    }
    Ok(Bytes32::try_from(&output[2..])?)
}

/// Witness scripts may not commit to long (uncompressed or hybrid) keys.
fn contains_long_pubkey(script: &Script) -> bool {
    match decompile(script.as_ref()) {
        None => false,
        Some(stack) => stack.iter().any(|item| match item {
            StackItem::Push(data) => {
                data.len() == 65 && matches!(data[0], 0x04 | 0x06 | 0x07)
            }
            _ => false,
        }),
    }
}

/// Build a p2wsh payment from any of `{address, hash, output, redeem,
/// witness}`.
pub fn p2wsh(a: &Payment, opts: &PaymentOptions) -> Result<Payment, PaymentError> {
    let network = network_of(a);
    let mut hash: Option<Bytes32> = None;

    if let Some(address) = &a.address {
        let decoded = decode_bech32(address)?;
        if decoded.prefix != network.bech32 {
            return Err(PaymentError::NetworkMismatch);
        }
        if decoded.version != 0 {
            return Err(PaymentError::TemplateMismatch("p2wsh"));
        }
        merge(&mut hash, Bytes32::try_from(decoded.program.as_slice())?, "hash")?;
    }
    if let Some(provided) = &a.hash {
        merge(&mut hash, Bytes32::try_from(provided.as_slice())?, "hash")?;
    }
    if let Some(output) = &a.output {
        merge(&mut hash, hash_from_output(output.as_ref())?, "hash")?;
    }

    let mut redeem = a.redeem.as_deref().cloned();
    // The last witness element is the serialized witness script.
    if let Some(witness) = &a.witness {
        if let Some((script_bytes, stack_args)) = witness.split_last() {
            let extracted_output = Script::new(script_bytes.clone());
            let extracted_witness = stack_args.to_vec();
            match &mut redeem {
                None => {
                    redeem = Some(Payment {
                        network: Some(network),
                        output: Some(extracted_output),
                        witness: Some(extracted_witness),
                        ..Default::default()
                    })
                }
                Some(existing) => {
                    merge(&mut existing.output, extracted_output, "redeem.output")?;
                    merge(&mut existing.witness, extracted_witness, "redeem.witness")?;
                }
            }
        }
    }

    let mut witness_stack: Option<Vec<Vec<u8>>> = None;
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
        if opts.validate && contains_long_pubkey(redeem_output) {
            return Err(PaymentError::UncompressedPubkey);
        }
        merge(&mut hash, Bytes32::new(sha256(redeem_output.as_ref())), "hash")?;

        // Stack arguments come from the redeem witness, or from a push-only
        // redeem scriptSig.
        let stack_args = match (&redeem.witness, &redeem.input) {
            (Some(items), _) => Some(items.clone()),
            (None, Some(input)) => {
                if !input.is_push_only() {
                    return Err(PaymentError::Mismatch("redeem.input"));
                }
                input.push_stack()
            }
            (None, None) => None,
        };
        if let Some(mut stack) = stack_args {
            stack.push(redeem_output.as_ref().to_vec());
            witness_stack = Some(stack);
        }
    }

    let hash = hash.ok_or(PaymentError::NotEnoughData("hash"))?;
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
    let input = witness_stack.as_ref().map(|_| Script::null());

    Ok(Payment {
        kind: Some(PaymentKind::P2wsh),
        network: Some(network),
        output: Some(output),
        input,
        witness: witness_stack,
        address: Some(address),
        hash: Some(hash.as_ref().to_vec()),
        redeem: redeem.map(Box::new),
        ..Default::default()
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::payments::p2ms;
    use opbtc_core::primitives::PubKey;

    fn gen_pubkey() -> PubKey {
        PubKey::try_from(
            hex::decode("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
                .unwrap()
                .as_slice(),
        )
        .unwrap()
    }

    fn multisig_redeem() -> Payment {
        p2ms(
            &Payment {
                m: Some(1),
                pubkeys: Some(vec![gen_pubkey()]),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn it_hashes_the_redeem_script() {
        let redeem = multisig_redeem();
        let payment = p2wsh(
            &Payment {
                redeem: Some(Box::new(redeem.clone())),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        assert_eq!(
            payment.hash.as_deref().unwrap(),
            sha256(redeem.output.as_ref().unwrap().as_ref())
        );
        assert!(payment.address.as_deref().unwrap().starts_with("bc1q"));

        let from_address = p2wsh(
            &Payment {
                address: payment.address.clone(),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        assert_eq!(from_address.output, payment.output);
    }

    #[test]
    fn witness_carries_the_script_last() {
        let redeem = multisig_redeem();
        let redeem_output = redeem.output.clone().unwrap();
        let payment = p2wsh(
            &Payment {
                redeem: Some(Box::new(Payment {
                    witness: Some(vec![vec![], vec![0x30; 71]]),
                    ..redeem
                })),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        let witness = payment.witness.unwrap();
        assert_eq!(witness.len(), 3);
        assert_eq!(witness[2], redeem_output.as_ref().to_vec());
    }

    #[test]
    fn it_rejects_long_keys_in_witness_scripts() {
        let mut long = vec![0x04u8];
        long.extend_from_slice(&[0x11; 64]);
        let script = compile(&[
            StackItem::Push(long),
            StackItem::Op(crate::script::opcodes::OP_CHECKSIG),
        ]);
        assert!(matches!(
            p2wsh(
                &Payment {
                    redeem: Some(Box::new(Payment {
                        output: Some(script),
                        ..Default::default()
                    })),
                    ..Default::default()
                },
                &PaymentOptions::default(),
            ),
            Err(PaymentError::UncompressedPubkey)
        ));
    }
}
