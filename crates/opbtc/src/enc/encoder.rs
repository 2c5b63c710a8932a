//! Address ↔ scriptPubKey dispatch over the payment templates.

use super::bases::{decode_base58check, decode_bech32, encode_bech32, EncodingError, EncodingResult};
use crate::nets::Network;
use crate::payments::{self, Payment, PaymentOptions};
use crate::script::{compile, opcodes, Script, StackItem};

/// A sink for non-fatal address warnings (future segwit versions).
pub type WarningSink<'a> = &'a dyn Fn(&str);

fn template_address(
    template: fn(&Payment, &PaymentOptions) -> Result<Payment, payments::PaymentError>,
    script: &Script,
    network: &Network,
) -> Option<String> {
    let partial = Payment {
        output: Some(script.clone()),
        network: Some(*network),
        ..Default::default()
    };
    template(&partial, &PaymentOptions::default())
        .ok()
        .and_then(|payment| payment.address)
}

/// Derive the address of an output script, trying each template in turn.
/// Versions 2..=15 fall back to a generic future-segwit encoding.
pub fn from_output_script(script: &Script, network: &Network) -> EncodingResult<String> {
    let templates: [fn(&Payment, &PaymentOptions) -> Result<Payment, payments::PaymentError>; 6] = [
        payments::p2pkh,
        payments::p2sh,
        payments::p2wpkh,
        payments::p2wsh,
        payments::p2tr,
        payments::p2op,
    ];
    for template in templates {
        if let Some(address) = template_address(template, script, network) {
            return Ok(address);
        }
    }
    if let Some((version @ 2..=15, program)) = script.witness_program() {
        return encode_bech32(program, version, network.bech32, None);
    }
    Err(EncodingError::NoMatchingScript)
}

/// Compile an address into its output script. Unknown segwit versions
/// (2..=15, and 16 under the standard prefix) compile generically and are
/// reported through `on_warning`.
pub fn to_output_script(
    address: &str,
    network: &Network,
    on_warning: Option<WarningSink<'_>>,
) -> EncodingResult<Script> {
    if let Ok((version, hash)) = decode_base58check(address) {
        let payment = if version == network.pub_key_hash {
            payments::p2pkh(
                &Payment {
                    hash: Some(hash.as_ref().to_vec()),
                    network: Some(*network),
                    ..Default::default()
                },
                &PaymentOptions::default(),
            )
        } else if version == network.script_hash {
            payments::p2sh(
                &Payment {
                    hash: Some(hash.as_ref().to_vec()),
                    network: Some(*network),
                    ..Default::default()
                },
                &PaymentOptions::default(),
            )
        } else {
            return Err(EncodingError::InvalidVersion(version));
        };
        return payment
            .ok()
            .and_then(|p| p.output)
            .ok_or(EncodingError::NoMatchingScript);
    }

    let decoded = decode_bech32(address)
        .map_err(|_| EncodingError::UnknownAddressFormat(address.to_owned()))?;

    if Some(decoded.prefix.as_str()) == network.bech32_opnet {
        if decoded.version != 16 {
            return Err(EncodingError::InvalidWitnessVersion(decoded.version));
        }
        return payments::p2op(
            &Payment {
                hash: Some(decoded.program),
                network: Some(*network),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .ok()
        .and_then(|p| p.output)
        .ok_or(EncodingError::NoMatchingScript);
    }

    if decoded.prefix != network.bech32 {
        return Err(EncodingError::InvalidPrefix(decoded.prefix));
    }

    match (decoded.version, decoded.program.len()) {
        (0, 20) => payments::p2wpkh(
            &Payment {
                hash: Some(decoded.program),
                network: Some(*network),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .ok()
        .and_then(|p| p.output)
        .ok_or(EncodingError::NoMatchingScript),
        (0, 32) => payments::p2wsh(
            &Payment {
                hash: Some(decoded.program),
                network: Some(*network),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .ok()
        .and_then(|p| p.output)
        .ok_or(EncodingError::NoMatchingScript),
        (0, length) => Err(EncodingError::InvalidProgramLength(length)),
        (1, 32) => payments::p2tr(
            &Payment {
                address: Some(address.to_owned()),
                network: Some(*network),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .ok()
        .and_then(|p| p.output)
        .ok_or(EncodingError::NoMatchingScript),
        (version @ 2..=16, _) => {
            if let Some(warn) = on_warning {
                warn(&format!(
                    "sending to an unvetted witness v{} address; outputs to it may be unspendable",
                    version
                ));
            }
            Ok(compile(&[
                StackItem::Op(opcodes::OP_RESERVED + version),
                StackItem::Push(decoded.program),
            ]))
        }
        (version, _) => Err(EncodingError::InvalidWitnessVersion(version)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nets::{BITCOIN, OPNET};
    use std::cell::RefCell;

    #[test]
    fn it_finds_the_first_matching_template() {
        let script = Script::new(
            hex::decode("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac").unwrap(),
        );
        assert_eq!(
            from_output_script(&script, &BITCOIN).unwrap(),
            "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"
        );

        let script =
            Script::new(hex::decode("0014751e76e8199196d454941c45d1b3a323f1433bd6").unwrap());
        assert_eq!(
            from_output_script(&script, &BITCOIN).unwrap(),
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"
        );
    }

    #[test]
    fn unmatched_scripts_aggregate_to_one_error() {
        let script = Script::new(vec![opcodes::OP_RETURN, 0x01, 0xaa]);
        assert!(matches!(
            from_output_script(&script, &BITCOIN),
            Err(EncodingError::NoMatchingScript)
        ));
    }

    #[test]
    fn future_segwit_versions_round_trip_with_a_warning() {
        let program = vec![0x51u8; 32];
        let script = compile(&[
            StackItem::Op(opcodes::OP_RESERVED + 5),
            StackItem::Push(program.clone()),
        ]);
        let address = from_output_script(&script, &BITCOIN).unwrap();

        let warnings: RefCell<Vec<String>> = RefCell::new(vec![]);
        let sink = |message: &str| warnings.borrow_mut().push(message.to_owned());
        let rebuilt = to_output_script(&address, &BITCOIN, Some(&sink)).unwrap();
        assert_eq!(rebuilt, script);
        assert_eq!(warnings.borrow().len(), 1);
        assert!(warnings.borrow()[0].contains("witness v5"));
    }

    #[test]
    fn addresses_dispatch_by_their_prefix() {
        let cases = [
            "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH",
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4",
        ];
        for address in cases {
            let script = to_output_script(address, &BITCOIN, None).unwrap();
            assert_eq!(from_output_script(&script, &BITCOIN).unwrap(), address);
        }
    }

    #[test]
    fn opnet_addresses_use_the_second_prefix() {
        let payment = crate::payments::p2op(
            &crate::payments::Payment {
                hash: Some(vec![0x42; 20]),
                network: Some(OPNET),
                ..Default::default()
            },
            &crate::payments::PaymentOptions::default(),
        )
        .unwrap();
        let address = payment.address.unwrap();
        let script = to_output_script(&address, &OPNET, None).unwrap();
        assert_eq!(Some(script.clone()), payment.output);
        assert_eq!(from_output_script(&script, &OPNET).unwrap(), address);

        // Without the OPNet prefix the same script has no address.
        assert!(matches!(
            from_output_script(&script, &BITCOIN),
            Err(EncodingError::NoMatchingScript)
        ));
    }

    #[test]
    fn garbage_addresses_are_rejected() {
        assert!(matches!(
            to_output_script("certainly not an address", &BITCOIN, None),
            Err(EncodingError::UnknownAddressFormat(_))
        ));
    }
}
