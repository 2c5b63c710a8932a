//! OPNet (witness v16): `OP_16 <program>`, addressed under the network's
//! dedicated Bech32m prefix.

use super::{merge, network_of, Payment, PaymentError, PaymentKind, PaymentOptions};
use crate::enc::{decode_bech32, encode_bech32, EncodingError};
use crate::script::{compile, decompile, opcodes::OP_16, StackItem};

fn program_from_output(output: &[u8]) -> Result<Vec<u8>, PaymentError> {
    let stack = decompile(output).ok_or(PaymentError::TemplateMismatch("p2op"))?;
    match stack.as_slice() {
        [StackItem::Op(OP_16), StackItem::Push(program)]
            if (2..=40).contains(&program.len()) =>
        {
            Ok(program.clone())
        }
        _ => Err(PaymentError::TemplateMismatch("p2op")),
    }
}

/// Build a p2op payment from `{address, hash, output}`. The program bytes
/// travel in the `hash` field; the network must carry an OPNet prefix.
pub fn p2op(a: &Payment, opts: &PaymentOptions) -> Result<Payment, PaymentError> {
    let network = network_of(a);
    let opnet_prefix = network
        .bech32_opnet
        .ok_or(PaymentError::Encoding(EncodingError::NoOpnetSupport))?;

    let mut program: Option<Vec<u8>> = None;
    if let Some(address) = &a.address {
        let decoded = decode_bech32(address)?;
        if decoded.prefix != opnet_prefix {
            return Err(PaymentError::NetworkMismatch);
        }
        if decoded.version != 16 {
            return Err(PaymentError::TemplateMismatch("p2op"));
        }
        merge(&mut program, decoded.program, "hash")?;
    }
    if let Some(provided) = &a.hash {
        merge(&mut program, provided.clone(), "hash")?;
    }
    if let Some(output) = &a.output {
        merge(&mut program, program_from_output(output.as_ref())?, "hash")?;
    }

    let program = program.ok_or(PaymentError::NotEnoughData("hash"))?;
    if !(2..=40).contains(&program.len()) {
        return Err(PaymentError::Encoding(EncodingError::InvalidProgramLength(
            program.len(),
        )));
    }

    let output = compile(&[StackItem::Op(OP_16), StackItem::Push(program.clone())]);
    if opts.validate {
        if let Some(provided) = &a.output {
            if provided != &output {
                return Err(PaymentError::Mismatch("output"));
            }
        }
    }
    let address = encode_bech32(&program, 16, network.bech32, Some(opnet_prefix))?;

    Ok(Payment {
        kind: Some(PaymentKind::P2op),
        network: Some(network),
        output: Some(output),
        address: Some(address),
        hash: Some(program),
        ..Default::default()
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nets::{BITCOIN, OPNET, OPNET_TESTNET};

    #[test]
    fn it_round_trips_program_address_and_output() {
        let program = vec![0x42u8; 20];
        let payment = p2op(
            &Payment {
                hash: Some(program.clone()),
                network: Some(OPNET),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        let address = payment.address.clone().unwrap();
        assert!(address.starts_with("op1"));
        assert_eq!(payment.output.as_ref().unwrap()[0], OP_16);

        let from_address = p2op(
            &Payment {
                address: Some(address),
                network: Some(OPNET),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        assert_eq!(from_address.hash, Some(program));
        assert_eq!(from_address.output, payment.output);
    }

    #[test]
    fn it_requires_opnet_support() {
        assert!(matches!(
            p2op(
                &Payment {
                    hash: Some(vec![0x42; 20]),
                    network: Some(BITCOIN),
                    ..Default::default()
                },
                &PaymentOptions::default(),
            ),
            Err(PaymentError::Encoding(EncodingError::NoOpnetSupport))
        ));
    }

    #[test]
    fn it_rejects_cross_network_opnet_addresses() {
        let payment = p2op(
            &Payment {
                hash: Some(vec![0x42; 20]),
                network: Some(OPNET),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        assert!(matches!(
            p2op(
                &Payment {
                    address: payment.address,
                    network: Some(OPNET_TESTNET),
                    ..Default::default()
                },
                &PaymentOptions::default(),
            ),
            Err(PaymentError::NetworkMismatch)
        ));
    }
}
