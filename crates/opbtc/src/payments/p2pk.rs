//! Pay to public key: `<pubkey> OP_CHECKSIG`.

use opbtc_core::primitives::PubKey;

use super::{
    check_ecdsa_signature, check_pubkey, merge, network_of, Payment, PaymentError, PaymentKind,
    PaymentOptions,
};
use crate::script::{compile, decompile, opcodes::OP_CHECKSIG, StackItem};

/// Build a p2pk payment from any of `{pubkey, output}` plus an optional
/// `{signature, input}`.
pub fn p2pk(a: &Payment, opts: &PaymentOptions) -> Result<Payment, PaymentError> {
    let network = network_of(a);
    let mut pubkey = a.pubkey.clone();
    let mut signature = a.signature.clone();

    if let Some(output) = &a.output {
        let stack =
            decompile(output.as_ref()).ok_or(PaymentError::TemplateMismatch("p2pk"))?;
        match stack.as_slice() {
            [StackItem::Push(pk), StackItem::Op(OP_CHECKSIG)] => {
                let pk = PubKey::try_from(pk.as_slice())
                    .map_err(|_| PaymentError::TemplateMismatch("p2pk"))?;
                merge(&mut pubkey, pk, "pubkey")?;
            }
            _ => return Err(PaymentError::TemplateMismatch("p2pk")),
        }
    }

    if let Some(input) = &a.input {
        let stack = decompile(input.as_ref()).ok_or(PaymentError::TemplateMismatch("p2pk"))?;
        match stack.as_slice() {
            [StackItem::Push(sig)] => merge(&mut signature, sig.clone(), "signature")?,
            _ => return Err(PaymentError::TemplateMismatch("p2pk")),
        }
    }

    let pubkey = pubkey.ok_or(PaymentError::NotEnoughData("pubkey"))?;
    if opts.validate {
        check_pubkey(&pubkey)?;
        if let Some(sig) = &signature {
            check_ecdsa_signature(sig)?;
        }
    }

    let output = compile(&[
        StackItem::Push(pubkey.as_ref().to_vec()),
        StackItem::Op(OP_CHECKSIG),
    ]);
    if opts.validate {
        if let Some(provided) = &a.output {
            if provided != &output {
                return Err(PaymentError::Mismatch("output"));
            }
        }
    }
    let input = signature
        .as_ref()
        .map(|sig| compile(&[StackItem::Push(sig.clone())]));

    Ok(Payment {
        kind: Some(PaymentKind::P2pk),
        network: Some(network),
        output: Some(output),
        input,
        pubkey: Some(pubkey),
        signature,
        ..Default::default()
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::payments::PaymentOptions;

    fn gen_pubkey() -> PubKey {
        PubKey::try_from(
            hex::decode("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
                .unwrap()
                .as_slice(),
        )
        .unwrap()
    }

    #[test]
    fn it_derives_output_from_pubkey_and_back() {
        let payment = p2pk(
            &Payment {
                pubkey: Some(gen_pubkey()),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        let output = payment.output.clone().unwrap();
        assert_eq!(output.len(), 35);
        assert_eq!(output[34], OP_CHECKSIG);

        let from_output = p2pk(
            &Payment {
                output: Some(output),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        assert_eq!(from_output.pubkey, Some(gen_pubkey()));
    }

    #[test]
    fn it_rejects_foreign_outputs() {
        // p2pkh shape is not p2pk
        let script = crate::script::Script::new(
            hex::decode("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac").unwrap(),
        );
        assert!(matches!(
            p2pk(
                &Payment {
                    output: Some(script),
                    ..Default::default()
                },
                &PaymentOptions::default(),
            ),
            Err(PaymentError::TemplateMismatch("p2pk"))
        ));
    }
}
