//! Bare multisig: `OP_m <pubkey...> OP_n OP_CHECKMULTISIG`.

use opbtc_core::primitives::PubKey;

use super::{
    check_ecdsa_signature, check_pubkey, merge, network_of, Payment, PaymentError, PaymentKind,
    PaymentOptions,
};
use crate::script::{
    compile, decompile,
    opcodes::{decode_small_int, small_int_op, OP_0, OP_CHECKMULTISIG},
    StackItem,
};

struct OutputParts {
    m: u8,
    pubkeys: Vec<PubKey>,
}

fn parse_output(output: &[u8]) -> Result<OutputParts, PaymentError> {
    let stack = decompile(output).ok_or(PaymentError::TemplateMismatch("p2ms"))?;
    if stack.len() < 4 {
        return Err(PaymentError::TemplateMismatch("p2ms"));
    }
    let m = match stack.first() {
        Some(StackItem::Op(op)) => {
            decode_small_int(*op).ok_or(PaymentError::TemplateMismatch("p2ms"))?
        }
        _ => return Err(PaymentError::TemplateMismatch("p2ms")),
    };
    let n = match &stack[stack.len() - 2] {
        StackItem::Op(op) => decode_small_int(*op).ok_or(PaymentError::TemplateMismatch("p2ms"))?,
        _ => return Err(PaymentError::TemplateMismatch("p2ms")),
    };
    match stack.last() {
        Some(StackItem::Op(OP_CHECKMULTISIG)) => {}
        _ => return Err(PaymentError::TemplateMismatch("p2ms")),
    }

    let mut pubkeys = Vec::with_capacity(stack.len() - 3);
    for item in &stack[1..stack.len() - 2] {
        match item {
            StackItem::Push(pk) => pubkeys.push(
                PubKey::try_from(pk.as_slice())
                    .map_err(|_| PaymentError::TemplateMismatch("p2ms"))?,
            ),
            _ => return Err(PaymentError::TemplateMismatch("p2ms")),
        }
    }
    if pubkeys.len() != n as usize {
        return Err(PaymentError::TemplateMismatch("p2ms"));
    }
    check_bounds(m, n)?;
    Ok(OutputParts { m, pubkeys })
}

fn check_bounds(m: u8, n: u8) -> Result<(), PaymentError> {
    if m == 0 || m > n || n > 16 {
        return Err(PaymentError::MultisigBounds { m, n });
    }
    Ok(())
}

fn parse_input(
    input: &[u8],
    allow_incomplete: bool,
) -> Result<Vec<Vec<u8>>, PaymentError> {
    let stack = decompile(input).ok_or(PaymentError::TemplateMismatch("p2ms"))?;
    match stack.first() {
        // The dead OP_CHECKMULTISIG pop.
        Some(StackItem::Op(OP_0)) => {}
        _ => return Err(PaymentError::TemplateMismatch("p2ms")),
    }
    let mut signatures = Vec::with_capacity(stack.len() - 1);
    for item in &stack[1..] {
        match item {
            StackItem::Push(sig) => signatures.push(sig.clone()),
            // An OP_0 placeholder for a missing signature.
            StackItem::Op(OP_0) if allow_incomplete => signatures.push(vec![]),
            _ => return Err(PaymentError::TemplateMismatch("p2ms")),
        }
    }
    Ok(signatures)
}

/// Build a p2ms payment from `{output}` or `{m, pubkeys}`, plus optional
/// `{signatures, input}`.
pub fn p2ms(a: &Payment, opts: &PaymentOptions) -> Result<Payment, PaymentError> {
    let network = network_of(a);
    let mut m = a.m;
    let mut pubkeys = a.pubkeys.clone();
    let mut signatures = a.signatures.clone();

    if let Some(output) = &a.output {
        let parts = parse_output(output.as_ref())?;
        merge(&mut m, parts.m, "m")?;
        merge(&mut pubkeys, parts.pubkeys, "pubkeys")?;
    }
    if let Some(input) = &a.input {
        merge(
            &mut signatures,
            parse_input(input.as_ref(), opts.allow_incomplete)?,
            "signatures",
        )?;
    }

    let m = m.ok_or(PaymentError::NotEnoughData("m"))?;
    let pubkeys = pubkeys.ok_or(PaymentError::NotEnoughData("pubkeys"))?;
    if pubkeys.len() > 16 {
        return Err(PaymentError::MultisigBounds {
            m,
            n: pubkeys.len().min(u8::MAX as usize) as u8,
        });
    }
    let n = pubkeys.len() as u8;
    check_bounds(m, n)?;
    if let Some(provided) = a.n {
        if provided != n {
            return Err(PaymentError::Mismatch("n"));
        }
    }

    if opts.validate {
        for pk in &pubkeys {
            check_pubkey(pk)?;
        }
        if let Some(sigs) = &signatures {
            if sigs.len() > m as usize {
                return Err(PaymentError::Mismatch("signatures"));
            }
            for sig in sigs {
                if sig.is_empty() {
                    if !opts.allow_incomplete {
                        return Err(PaymentError::InvalidSignature);
                    }
                } else {
                    check_ecdsa_signature(sig)?;
                }
            }
        }
    }

    let mut stack = Vec::with_capacity(pubkeys.len() + 3);
    stack.push(StackItem::Op(small_int_op(m).ok_or(
        PaymentError::MultisigBounds { m, n },
    )?));
    for pk in &pubkeys {
        stack.push(StackItem::Push(pk.as_ref().to_vec()));
    }
    stack.push(StackItem::Op(small_int_op(n).ok_or(
        PaymentError::MultisigBounds { m, n },
    )?));
    stack.push(StackItem::Op(OP_CHECKMULTISIG));
    let output = compile(&stack);
    if opts.validate {
        if let Some(provided) = &a.output {
            if provided != &output {
                return Err(PaymentError::Mismatch("output"));
            }
        }
    }

    let input = signatures.as_ref().map(|sigs| {
        let mut stack = Vec::with_capacity(sigs.len() + 1);
        stack.push(StackItem::Op(OP_0));
        for sig in sigs {
            if sig.is_empty() {
                stack.push(StackItem::Op(OP_0));
            } else {
                stack.push(StackItem::Push(sig.clone()));
            }
        }
        compile(&stack)
    });

    Ok(Payment {
        kind: Some(PaymentKind::P2ms),
        network: Some(network),
        output: Some(output),
        input,
        pubkeys: Some(pubkeys),
        signatures,
        m: Some(m),
        n: Some(n),
        ..Default::default()
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::script::opcodes::{OP_2, OP_3};

    fn keys() -> Vec<PubKey> {
        [
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
            "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5",
            "02f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9",
        ]
        .iter()
        .map(|s| PubKey::try_from(hex::decode(s).unwrap().as_slice()).unwrap())
        .collect()
    }

    #[test]
    fn two_of_three_round_trips() {
        let payment = p2ms(
            &Payment {
                m: Some(2),
                pubkeys: Some(keys()),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        let output = payment.output.clone().unwrap();
        let stack = decompile(output.as_ref()).unwrap();
        assert_eq!(stack.len(), 6);
        assert_eq!(stack[0], StackItem::Op(OP_2));
        assert_eq!(stack[4], StackItem::Op(OP_3));
        assert_eq!(stack[5], StackItem::Op(OP_CHECKMULTISIG));

        let from_output = p2ms(
            &Payment {
                output: Some(output),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        assert_eq!(from_output.m, Some(2));
        assert_eq!(from_output.n, Some(3));
        assert_eq!(from_output.pubkeys, Some(keys()));
    }

    #[test]
    fn it_rejects_bad_bounds() {
        assert!(matches!(
            p2ms(
                &Payment {
                    m: Some(4),
                    pubkeys: Some(keys()),
                    ..Default::default()
                },
                &PaymentOptions::default(),
            ),
            Err(PaymentError::MultisigBounds { m: 4, n: 3 })
        ));
        assert!(matches!(
            p2ms(
                &Payment {
                    m: Some(0),
                    pubkeys: Some(keys()),
                    ..Default::default()
                },
                &PaymentOptions::default(),
            ),
            Err(PaymentError::MultisigBounds { m: 0, n: 3 })
        ));
    }

    #[test]
    fn incomplete_inputs_need_the_flag() {
        let opts = PaymentOptions {
            allow_incomplete: true,
            ..Default::default()
        };
        let payment = p2ms(
            &Payment {
                m: Some(2),
                pubkeys: Some(keys()),
                signatures: Some(vec![vec![], vec![]]),
                ..Default::default()
            },
            &opts,
        )
        .unwrap();
        // placeholders compile back to OP_0
        let input = payment.input.unwrap();
        assert_eq!(input.as_ref(), &[OP_0, OP_0, OP_0]);

        assert!(matches!(
            p2ms(
                &Payment {
                    m: Some(2),
                    pubkeys: Some(keys()),
                    signatures: Some(vec![vec![], vec![]]),
                    ..Default::default()
                },
                &PaymentOptions::default(),
            ),
            Err(PaymentError::InvalidSignature)
        ));
    }
}
