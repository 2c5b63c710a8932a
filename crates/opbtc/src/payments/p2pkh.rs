//! Pay to public-key hash:
//! `OP_DUP OP_HASH160 <hash160> OP_EQUALVERIFY OP_CHECKSIG`.

use opbtc_core::hashes::hash160;
use opbtc_core::primitives::{Bytes20, PubKey};

use super::{
    check_ecdsa_signature, check_pubkey, merge, network_of, Payment, PaymentError, PaymentKind,
    PaymentOptions,
};
use crate::enc::{decode_base58check, encode_base58check};
use crate::script::{
    compile, decompile,
    opcodes::{OP_CHECKSIG, OP_DUP, OP_EQUALVERIFY, OP_HASH160},
    StackItem,
};

fn hash_from_output(output: &[u8]) -> Result<Bytes20, PaymentError> {
    if output.len() != 25
        || output[0] != OP_DUP
        || output[1] != OP_HASH160
        || output[2] != 0x14
        || output[23] != OP_EQUALVERIFY
        || output[24] != OP_CHECKSIG
    {
        return Err(PaymentError::TemplateMismatch("p2pkh"));
    }
    Ok(Bytes20::try_from(&output[3..23])?)
}

/// Resolve the pubkey variant whose hash160 matches `expected`. A 65-byte
/// key that misses under its given prefix is retried as hybrid
/// (0x06/0x07) and uncompressed (0x04) before rejection.
fn resolve_pubkey(pubkey: &PubKey, expected: Option<&Bytes20>) -> Result<(PubKey, Bytes20), PaymentError> {
    let direct = Bytes20::new(hash160(pubkey.as_ref()));
    let expected = match expected {
        None => return Ok((pubkey.clone(), direct)),
        Some(expected) => expected,
    };
    if direct == *expected {
        return Ok((pubkey.clone(), direct));
    }
    if !pubkey.is_compressed() {
        for prefix in [0x06u8, 0x07, 0x04] {
            if prefix == pubkey.prefix() {
                continue;
            }
            let candidate = pubkey.with_prefix(prefix)?;
            let candidate_hash = Bytes20::new(hash160(candidate.as_ref()));
            if candidate_hash == *expected {
                return Ok((candidate, candidate_hash));
            }
        }
    }
    Err(PaymentError::HashMismatch)
}

/// Build a p2pkh payment from any of `{address, hash, output, pubkey,
/// input}`.
pub fn p2pkh(a: &Payment, opts: &PaymentOptions) -> Result<Payment, PaymentError> {
    let network = network_of(a);
    let mut hash: Option<Bytes20> = None;

    if let Some(address) = &a.address {
        let (version, decoded) = decode_base58check(address)?;
        if version != network.pub_key_hash {
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

    let mut pubkey = a.pubkey.clone();
    let mut signature = a.signature.clone();
    if let Some(input) = &a.input {
        let stack = decompile(input.as_ref()).ok_or(PaymentError::TemplateMismatch("p2pkh"))?;
        match stack.as_slice() {
            [StackItem::Push(sig), StackItem::Push(pk)] => {
                merge(&mut signature, sig.clone(), "signature")?;
                let pk = PubKey::try_from(pk.as_slice())?;
                merge(&mut pubkey, pk, "pubkey")?;
            }
            _ => return Err(PaymentError::TemplateMismatch("p2pkh")),
        }
    }

    let pubkey = match pubkey {
        Some(provided) => {
            let (resolved, derived_hash) = resolve_pubkey(&provided, hash.as_ref())?;
            merge(&mut hash, derived_hash, "hash")?;
            Some(resolved)
        }
        None => None,
    };

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
        StackItem::Op(OP_DUP),
        StackItem::Op(OP_HASH160),
        StackItem::Push(hash.as_ref().to_vec()),
        StackItem::Op(OP_EQUALVERIFY),
        StackItem::Op(OP_CHECKSIG),
    ]);
    if opts.validate {
        if let Some(provided) = &a.output {
            if provided != &output {
                return Err(PaymentError::Mismatch("output"));
            }
        }
    }

    let address = encode_base58check(network.pub_key_hash, &hash);
    let input = match (&signature, &pubkey) {
        (Some(sig), Some(pk)) => Some(compile(&[
            StackItem::Push(sig.clone()),
            StackItem::Push(pk.as_ref().to_vec()),
        ])),
        _ => None,
    };

    Ok(Payment {
        kind: Some(PaymentKind::P2pkh),
        network: Some(network),
        output: Some(output),
        input,
        address: Some(address),
        hash: Some(hash.as_ref().to_vec()),
        pubkey,
        signature,
        ..Default::default()
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nets::{BITCOIN, TESTNET};

    fn gen_pubkey() -> PubKey {
        PubKey::try_from(
            hex::decode("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
                .unwrap()
                .as_slice(),
        )
        .unwrap()
    }

    #[test]
    fn it_derives_every_representation_from_a_pubkey() {
        let payment = p2pkh(
            &Payment {
                pubkey: Some(gen_pubkey()),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        assert_eq!(
            payment.address.as_deref(),
            Some("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH")
        );
        assert_eq!(
            hex::encode(payment.hash.as_ref().unwrap()),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
        assert_eq!(
            hex::encode(payment.output.as_ref().unwrap()),
            "76a914751e76e8199196d454941c45d1b3a323f1433bd688ac"
        );
    }

    #[test]
    fn address_and_output_agree_both_ways() {
        let from_address = p2pkh(
            &Payment {
                address: Some("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH".to_owned()),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        let from_output = p2pkh(
            &Payment {
                output: from_address.output.clone(),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        assert_eq!(from_output.address, from_address.address);
    }

    #[test]
    fn it_rejects_cross_network_addresses() {
        assert!(matches!(
            p2pkh(
                &Payment {
                    address: Some("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH".to_owned()),
                    network: Some(TESTNET),
                    ..Default::default()
                },
                &PaymentOptions::default(),
            ),
            Err(PaymentError::NetworkMismatch)
        ));
    }

    #[test]
    fn it_rejects_disagreeing_hash_and_pubkey() {
        assert!(matches!(
            p2pkh(
                &Payment {
                    pubkey: Some(gen_pubkey()),
                    hash: Some(vec![0x11; 20]),
                    network: Some(BITCOIN),
                    ..Default::default()
                },
                &PaymentOptions::default(),
            ),
            Err(PaymentError::HashMismatch)
        ));
    }

    #[test]
    fn it_recovers_long_key_variants() {
        // take the uncompressed generator key, hash it under the 0x06
        // hybrid prefix, then hand the template the 0x04 form plus that hash
        let uncompressed = {
            let mut bytes = hex::decode(
                "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\
                 483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8",
            )
            .unwrap();
            bytes.truncate(65);
            PubKey::try_from(bytes.as_slice()).unwrap()
        };
        let hybrid = uncompressed.with_prefix(0x06).unwrap();
        let hybrid_hash = hash160(hybrid.as_ref()).to_vec();

        let payment = p2pkh(
            &Payment {
                pubkey: Some(uncompressed),
                hash: Some(hybrid_hash.clone()),
                ..Default::default()
            },
            &PaymentOptions::default(),
        )
        .unwrap();
        // the hybrid variant was remembered
        assert_eq!(payment.pubkey, Some(hybrid));
        assert_eq!(payment.hash, Some(hybrid_hash));
    }
}
