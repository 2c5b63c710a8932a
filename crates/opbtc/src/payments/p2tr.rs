//! Taproot (BIP341): `OP_1 <tweaked x-only key>`, with key-path and
//! script-path spends.

use opbtc_core::primitives::XOnlyPubKey;

use super::{merge, network_of, Payment, PaymentError, PaymentKind, PaymentOptions};
use crate::enc::{decode_bech32, encode_bech32};
use crate::script::{compile, opcodes::OP_1, signature::is_canonical_schnorr_signature, Script, StackItem};
use crate::taproot::{leaf_hash, tap_tweak, ControlBlock, TapLeaf, LEAF_VERSION_TAPSCRIPT};

fn key_from_output(output: &[u8]) -> Result<XOnlyPubKey, PaymentError> {
    if output.len() != 34 || output[0] != OP_1 || output[1] != 0x20 {
        return Err(PaymentError::TemplateMismatch("p2tr"));
    }
    Ok(XOnlyPubKey::try_from(&output[2..])?)
}

/// Build a p2tr payment from any of `{address, output, output_key,
/// internal_pubkey (+ script_tree), witness}`, plus an optional key-path
/// `signature` or script-path `redeem`.
pub fn p2tr(a: &Payment, opts: &PaymentOptions) -> Result<Payment, PaymentError> {
    let network = network_of(a);
    let mut output_key = a.output_key;
    let mut internal_pubkey = a.internal_pubkey;
    let script_tree = a.script_tree.clone();
    let mut redeem = a.redeem.as_deref().cloned();
    let mut signature = a.signature.clone();
    let mut parity: Option<u8> = None;
    let mut control_path: Option<Vec<[u8; 32]>> = None;

    if let Some(address) = &a.address {
        let decoded = decode_bech32(address)?;
        if decoded.prefix != network.bech32 {
            return Err(PaymentError::NetworkMismatch);
        }
        if decoded.version != 1 {
            return Err(PaymentError::TemplateMismatch("p2tr"));
        }
        merge(
            &mut output_key,
            XOnlyPubKey::try_from(decoded.program.as_slice())?,
            "pubkey",
        )?;
    }
    if let Some(output) = &a.output {
        merge(&mut output_key, key_from_output(output.as_ref())?, "pubkey")?;
    }

    // A witness is either a lone key-path signature or
    // `[args..., leafScript, controlBlock]`.
    if let Some(witness) = &a.witness {
        match witness.as_slice() {
            [] => return Err(PaymentError::TemplateMismatch("p2tr")),
            [sig] => merge(&mut signature, sig.clone(), "signature")?,
            [args @ .., leaf_script, control_bytes] => {
                let control = ControlBlock::from_bytes(control_bytes)?;
                merge(&mut internal_pubkey, control.internal_pubkey, "internalPubkey")?;
                parity = Some(control.parity);
                let extracted = Payment {
                    network: Some(network),
                    output: Some(Script::new(leaf_script.clone())),
                    witness: Some(args.to_vec()),
                    redeem_version: Some(control.leaf_version),
                    ..Default::default()
                };
                match &mut redeem {
                    None => redeem = Some(extracted),
                    Some(existing) => {
                        if let Some(output) = extracted.output {
                            merge(&mut existing.output, output, "redeem.output")?;
                        }
                        if let Some(witness) = extracted.witness {
                            merge(&mut existing.witness, witness, "redeem.witness")?;
                        }
                        if let Some(version) = extracted.redeem_version {
                            merge(&mut existing.redeem_version, version, "redeemVersion")?;
                        }
                    }
                }
                control_path = Some(control.path);
            }
        }
    }

    // Locate the redeem leaf inside the tree, when both are known.
    let mut leaf: Option<TapLeaf> = None;
    if let (Some(tree), Some(redeem)) = (&script_tree, &redeem) {
        if let Some(redeem_output) = &redeem.output {
            let version = redeem.redeem_version.unwrap_or(LEAF_VERSION_TAPSCRIPT);
            leaf = Some(
                tree.find_leaf(redeem_output, Some(version))
                    .ok_or(PaymentError::Mismatch("redeem"))?,
            );
        }
    }

    // Tweak the internal key into the output key.
    if let Some(internal) = &internal_pubkey {
        let ecc = opbtc_secp::active()?;
        let merkle_root: Option<[u8; 32]> = if let Some(tree) = &script_tree {
            Some(tree.hash())
        } else if let (Some(path), Some(redeem)) = (&control_path, &redeem) {
            let redeem_output = redeem
                .output
                .as_ref()
                .ok_or(PaymentError::NotEnoughData("redeem.output"))?;
            let version = redeem.redeem_version.unwrap_or(LEAF_VERSION_TAPSCRIPT);
            let mut acc = leaf_hash(redeem_output.as_ref(), version);
            for sibling in path {
                acc = crate::taproot::branch_hash(&acc, sibling);
            }
            Some(acc)
        } else {
            None
        };

        let tweak = tap_tweak(internal, merkle_root.as_ref());
        let tweaked = ecc
            .x_only_add_tweak(internal.as_bytes(), &tweak)
            .ok_or(PaymentError::InvalidPoint)?;
        merge(
            &mut output_key,
            XOnlyPubKey::new(tweaked.x_only_pubkey)?,
            "pubkey",
        )?;
        match parity {
            Some(provided) if provided != tweaked.parity => {
                return Err(PaymentError::Mismatch("controlBlock"));
            }
            _ => parity = Some(tweaked.parity),
        }
    }

    let output_key = output_key.ok_or(PaymentError::NotEnoughData("pubkey"))?;
    if opts.validate {
        if let Ok(ecc) = opbtc_secp::active() {
            if !ecc.is_x_only_point(output_key.as_bytes()) {
                return Err(PaymentError::InvalidPoint);
            }
        }
        if let Some(sig) = &signature {
            if !is_canonical_schnorr_signature(sig) {
                return Err(PaymentError::InvalidSignature);
            }
        }
    }

    let output = compile(&[
        StackItem::Op(OP_1),
        StackItem::Push(output_key.as_ref().to_vec()),
    ]);
    if opts.validate {
        if let Some(provided) = &a.output {
            if provided != &output {
                return Err(PaymentError::Mismatch("output"));
            }
        }
    }
    let address = encode_bech32(output_key.as_ref(), 1, network.bech32, None)?;

    // Key path first; otherwise rebuild the script-path witness.
    let mut witness: Option<Vec<Vec<u8>>> = None;
    if let Some(sig) = &signature {
        witness = Some(vec![sig.clone()]);
    } else if let (Some(redeem), Some(internal), Some(parity)) =
        (&redeem, &internal_pubkey, parity)
    {
        if let Some(redeem_output) = &redeem.output {
            let (leaf_version, path) = match (&leaf, &control_path) {
                (Some(leaf), _) => (leaf.version, leaf.path.clone()),
                (None, Some(path)) => (
                    redeem.redeem_version.unwrap_or(LEAF_VERSION_TAPSCRIPT),
                    path.clone(),
                ),
                (None, None) => (LEAF_VERSION_TAPSCRIPT, vec![]),
            };
            let control = ControlBlock {
                leaf_version,
                parity,
                internal_pubkey: *internal,
                path,
            };
            let mut stack = match (&redeem.witness, &redeem.input) {
                (Some(items), _) => items.clone(),
                (None, Some(input)) => {
                    if !input.is_push_only() {
                        return Err(PaymentError::Mismatch("redeem.input"));
                    }
                    input.push_stack().unwrap_or_default()
                }
                (None, None) => vec![],
            };
            stack.push(redeem_output.as_ref().to_vec());
            stack.push(control.to_bytes());
            witness = Some(stack);
        }
    }
    if opts.validate {
        if let (Some(provided), Some(derived)) = (&a.witness, &witness) {
            if provided != derived {
                return Err(PaymentError::Mismatch("witness"));
            }
        }
    }
    if witness.is_none() {
        witness = a.witness.clone();
    }
    let input = witness.as_ref().map(|_| Script::null());

    Ok(Payment {
        kind: Some(PaymentKind::P2tr),
        network: Some(network),
        output: Some(output),
        input,
        witness,
        address: Some(address),
        output_key: Some(output_key),
        internal_pubkey,
        script_tree,
        signature,
        redeem: redeem.map(Box::new),
        ..Default::default()
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::script::opcodes::OP_CHECKSIG;
    use crate::taproot::TapTree;
    use std::sync::Arc;

    fn ensure_ecc() {
        let _ = opbtc_secp::install(Some(Arc::new(opbtc_secp::RustSecp)));
    }

    fn internal_key() -> XOnlyPubKey {
        XOnlyPubKey::try_from(
            hex::decode("d6889cb081036e0faefa3a35157ad71086b123b2b144b649798b494c300a961d")
                .unwrap()
                .as_slice(),
        )
        .unwrap()
    }

    #[test]
    fn key_path_output_matches_the_bip341_vector() {
        ensure_ecc();
        let payment = p2tr(
            &Payment {
                internal_pubkey: Some(internal_key()),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        let output = payment.output.clone().unwrap();
        assert_eq!(output.len(), 34);
        assert_eq!(output[0], OP_1);
        assert_eq!(
            hex::encode(&output.as_ref()[2..]),
            "53a1f6e454df1aa2776a2814a721372d6258050de330b3c6d10ee8539e0c2622"
        );
        assert!(payment.address.as_deref().unwrap().starts_with("bc1p"));

        // back from the output script
        let again = p2tr(
            &Payment {
                output: Some(output),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        assert_eq!(again.address, payment.address);
    }

    #[test]
    fn script_path_witness_round_trips() {
        ensure_ecc();
        let leaf_script = compile(&[
            StackItem::Push(
                hex::decode("79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
                    .unwrap(),
            ),
            StackItem::Op(OP_CHECKSIG),
        ]);
        let other_leaf = compile(&[
            StackItem::Push(
                hex::decode("f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9")
                    .unwrap(),
            ),
            StackItem::Op(OP_CHECKSIG),
        ]);
        let tree = TapTree::branch(
            TapTree::leaf(leaf_script.clone()),
            TapTree::leaf(other_leaf),
        );

        let payment = p2tr(
            &Payment {
                internal_pubkey: Some(internal_key()),
                script_tree: Some(tree.clone()),
                redeem: Some(Box::new(Payment {
                    output: Some(leaf_script.clone()),
                    ..Default::default()
                })),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();

        let witness = payment.witness.clone().unwrap();
        assert_eq!(witness.len(), 2);
        assert_eq!(witness[0], leaf_script.as_ref().to_vec());
        // control block: version|parity, internal key, one path entry
        assert_eq!(witness[1].len(), 65);
        assert_eq!(&witness[1][1..33], internal_key().as_ref());

        // Reconstructing from the witness alone recovers the same payment.
        let from_witness = p2tr(
            &Payment {
                witness: Some(witness.clone()),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        assert_eq!(from_witness.output, payment.output);
        assert_eq!(from_witness.internal_pubkey, Some(internal_key()));
        assert_eq!(from_witness.witness, Some(witness));
    }

    #[test]
    fn a_redeem_outside_the_tree_is_rejected() {
        ensure_ecc();
        let leaf_script = compile(&[StackItem::Op(OP_CHECKSIG)]);
        let tree = TapTree::leaf(leaf_script);
        let foreign = compile(&[StackItem::Op(crate::script::opcodes::OP_DUP)]);
        assert!(matches!(
            p2tr(
                &Payment {
                    internal_pubkey: Some(internal_key()),
                    script_tree: Some(tree),
                    redeem: Some(Box::new(Payment {
                        output: Some(foreign),
                        ..Default::default()
                    })),
                    ..Default::default()
                },
                &PaymentOptions::default(),
            ),
            Err(PaymentError::Mismatch("redeem"))
        ));
    }

    #[test]
    fn key_path_signature_becomes_the_witness() {
        ensure_ecc();
        let payment = p2tr(
            &Payment {
                internal_pubkey: Some(internal_key()),
                signature: Some(vec![0xaa; 64]),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        assert_eq!(payment.witness, Some(vec![vec![0xaa; 64]]));
    }
}
