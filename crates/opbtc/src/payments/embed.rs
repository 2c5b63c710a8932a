//! OP_RETURN data embed: `OP_RETURN <data...>`.

use super::{merge, network_of, Payment, PaymentError, PaymentKind, PaymentOptions};
use crate::script::{compile, decompile, opcodes::OP_RETURN, StackItem};

fn data_from_output(output: &[u8]) -> Result<Vec<Vec<u8>>, PaymentError> {
    let stack = decompile(output).ok_or(PaymentError::TemplateMismatch("embed"))?;
    match stack.split_first() {
        Some((StackItem::Op(OP_RETURN), rest)) => {
            let mut data = Vec::with_capacity(rest.len());
            for item in rest {
                match item {
                    StackItem::Push(bytes) => data.push(bytes.clone()),
                    _ => return Err(PaymentError::TemplateMismatch("embed")),
                }
            }
            Ok(data)
        }
        _ => Err(PaymentError::TemplateMismatch("embed")),
    }
}

/// Build an OP_RETURN payment from `{data}` or `{output}`.
pub fn embed(a: &Payment, opts: &PaymentOptions) -> Result<Payment, PaymentError> {
    let network = network_of(a);
    let mut data = a.data.clone();

    if let Some(output) = &a.output {
        merge(&mut data, data_from_output(output.as_ref())?, "data")?;
    }
    let data = data.ok_or(PaymentError::NotEnoughData("data"))?;

    let mut stack = Vec::with_capacity(data.len() + 1);
    stack.push(StackItem::Op(OP_RETURN));
    for item in &data {
        stack.push(StackItem::Push(item.clone()));
    }
    let output = compile(&stack);
    if opts.validate {
        if let Some(provided) = &a.output {
            if provided != &output {
                return Err(PaymentError::Mismatch("output"));
            }
        }
    }

    Ok(Payment {
        kind: Some(PaymentKind::Embed),
        network: Some(network),
        output: Some(output),
        data: Some(data),
        ..Default::default()
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn data_and_output_derive_each_other() {
        let data = vec![b"hello".to_vec(), b"world".to_vec()];
        let payment = embed(
            &Payment {
                data: Some(data.clone()),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        let output = payment.output.clone().unwrap();
        assert_eq!(output[0], OP_RETURN);

        let from_output = embed(
            &Payment {
                output: Some(output),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        assert_eq!(from_output.data, Some(data));
    }

    #[test]
    fn it_rejects_non_push_trailers() {
        let script = compile(&[
            StackItem::Op(OP_RETURN),
            StackItem::Op(crate::script::opcodes::OP_DUP),
        ]);
        assert!(matches!(
            embed(
                &Payment {
                    output: Some(script),
                    ..Default::default()
                },
                &PaymentOptions::default(),
            ),
            Err(PaymentError::TemplateMismatch("embed"))
        ));
    }
}
