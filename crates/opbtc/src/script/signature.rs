//! Script-signature codec: strict DER (BIP66) plus the trailing sighash
//! byte, with low-S enforcement on decode.

use opbtc_core::primitives::SECP256K1_N_HALF;

use super::ScriptError;

/// A decoded ECDSA script signature: 64 bytes of `r || s` and the sighash
/// type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSignature {
    /// `r || s`, each left-padded to 32 bytes.
    pub signature: [u8; 64],
    /// The sighash type byte.
    pub hash_type: u32,
}

/// True for the defined sighash types: ALL/NONE/SINGLE, optionally
/// ANYONECANPAY.
pub fn is_defined_hash_type(hash_type: u32) -> bool {
    let masked = hash_type & !0x80;
    (1..=3).contains(&masked)
}

/// BIP66 structural check over a DER signature (without the sighash byte).
fn check_der(der: &[u8]) -> Result<(usize, usize), ScriptError> {
    if der.len() < 8 {
        return Err(ScriptError::NotCanonicalDer("too short"));
    }
    if der.len() > 72 {
        return Err(ScriptError::NotCanonicalDer("too long"));
    }
    if der[0] != 0x30 {
        return Err(ScriptError::NotCanonicalDer("missing sequence tag"));
    }
    if der[1] as usize != der.len() - 2 {
        return Err(ScriptError::NotCanonicalDer("bad sequence length"));
    }
    if der[2] != 0x02 {
        return Err(ScriptError::NotCanonicalDer("missing R integer tag"));
    }
    let len_r = der[3] as usize;
    if len_r == 0 {
        return Err(ScriptError::NotCanonicalDer("R length is zero"));
    }
    if 5 + len_r >= der.len() {
        return Err(ScriptError::NotCanonicalDer("R length exceeds signature"));
    }
    if der[4 + len_r] != 0x02 {
        return Err(ScriptError::NotCanonicalDer("missing S integer tag"));
    }
    let len_s = der[5 + len_r] as usize;
    if len_s == 0 {
        return Err(ScriptError::NotCanonicalDer("S length is zero"));
    }
    if len_r + len_s + 6 != der.len() {
        return Err(ScriptError::NotCanonicalDer("integer lengths disagree"));
    }

    if der[4] & 0x80 != 0 {
        return Err(ScriptError::NotCanonicalDer("R is negative"));
    }
    if len_r > 1 && der[4] == 0x00 && der[5] & 0x80 == 0 {
        return Err(ScriptError::NotCanonicalDer("R is padded"));
    }
    if der[6 + len_r] & 0x80 != 0 {
        return Err(ScriptError::NotCanonicalDer("S is negative"));
    }
    if len_s > 1 && der[6 + len_r] == 0x00 && der[7 + len_r] & 0x80 == 0 {
        return Err(ScriptError::NotCanonicalDer("S is padded"));
    }
    Ok((len_r, len_s))
}

fn left_pad(component: &[u8]) -> Result<[u8; 32], ScriptError> {
    let component = if component.len() > 32 {
        // A 33rd padding byte is legal DER for a high-bit value; anything
        // wider cannot be a group element.
        if component.len() == 33 && component[0] == 0x00 {
            &component[1..]
        } else {
            return Err(ScriptError::NotCanonicalDer("integer exceeds 32 bytes"));
        }
    } else {
        component
    };
    let mut out = [0u8; 32];
    out[32 - component.len()..].copy_from_slice(component);
    Ok(out)
}

/// Decode a DER signature with trailing sighash byte, enforcing strict DER
/// and low S.
pub fn decode(buf: &[u8]) -> Result<ScriptSignature, ScriptError> {
    if buf.len() < 9 {
        return Err(ScriptError::NotCanonicalDer("too short"));
    }
    let hash_type = buf[buf.len() - 1] as u32;
    if !is_defined_hash_type(hash_type) {
        return Err(ScriptError::InvalidHashType(hash_type));
    }
    let der = &buf[..buf.len() - 1];
    let (len_r, len_s) = check_der(der)?;

    let r = left_pad(&der[4..4 + len_r])?;
    let s = left_pad(&der[6 + len_r..6 + len_r + len_s])?;
    if s > SECP256K1_N_HALF {
        return Err(ScriptError::NotLowS);
    }

    let mut signature = [0u8; 64];
    signature[..32].copy_from_slice(&r);
    signature[32..].copy_from_slice(&s);
    Ok(ScriptSignature {
        signature,
        hash_type,
    })
}

fn to_der_integer(out: &mut Vec<u8>, component: &[u8; 32]) {
    let mut start = 0;
    while start < 31 && component[start] == 0x00 && component[start + 1] & 0x80 == 0 {
        start += 1;
    }
    let trimmed = &component[start..];
    let needs_pad = trimmed[0] & 0x80 != 0;
    out.push(0x02);
    out.push((trimmed.len() + usize::from(needs_pad)) as u8);
    if needs_pad {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
}

/// Encode a 64-byte `r || s` signature as minimal DER with the sighash byte
/// appended.
pub fn encode(signature: &[u8; 64], hash_type: u32) -> Result<Vec<u8>, ScriptError> {
    if !is_defined_hash_type(hash_type) {
        return Err(ScriptError::InvalidHashType(hash_type));
    }
    let mut r = [0u8; 32];
    r.copy_from_slice(&signature[..32]);
    let mut s = [0u8; 32];
    s.copy_from_slice(&signature[32..]);

    let mut body = Vec::with_capacity(72);
    to_der_integer(&mut body, &r);
    to_der_integer(&mut body, &s);

    let mut out = Vec::with_capacity(body.len() + 3);
    out.push(0x30);
    out.push(body.len() as u8);
    out.extend_from_slice(&body);
    out.push(hash_type as u8);
    Ok(out)
}

/// True when `buf` decodes as a canonical ECDSA script signature.
pub fn is_canonical_script_signature(buf: &[u8]) -> bool {
    decode(buf).is_ok()
}

/// True when `buf` is a BIP340 script signature: 64 bytes, or 65 with a
/// defined non-zero sighash byte.
pub fn is_canonical_schnorr_signature(buf: &[u8]) -> bool {
    match buf.len() {
        64 => true,
        65 => is_defined_hash_type(buf[64] as u32),
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // A structurally canonical low-S signature with SIGHASH_ALL appended.
    const CANONICAL: &str =
        "3044022033a55f2c3f5d025ddfbb26523dd283989cba022d864530b0f0f0c516498eff63\
         02203d60f00746a7b8dd0dcc5f1edab751d165cf5b1d0bf16d1af4e689fbbea1b31701";

    fn canonical_bytes() -> Vec<u8> {
        hex::decode(CANONICAL).unwrap()
    }

    #[test]
    fn it_round_trips_canonical_signatures() {
        let buf = canonical_bytes();
        let decoded = decode(&buf).unwrap();
        assert_eq!(decoded.hash_type, 1);
        let encoded = encode(&decoded.signature, decoded.hash_type).unwrap();
        assert_eq!(encoded, buf);
        assert!(is_canonical_script_signature(&buf));
    }

    #[test]
    fn it_rejects_non_canonical_signatures() {
        let buf = canonical_bytes();

        // wrong sequence tag
        let mut bad = buf.clone();
        bad[0] = 0x31;
        assert_eq!(
            decode(&bad),
            Err(ScriptError::NotCanonicalDer("missing sequence tag"))
        );

        // padded R: insert a dead zero byte and fix up lengths
        let mut padded = Vec::new();
        padded.push(0x30);
        padded.push(buf[1] + 1);
        padded.push(0x02);
        padded.push(buf[3] + 1);
        padded.push(0x00);
        padded.extend_from_slice(&buf[4..]);
        assert_eq!(
            decode(&padded),
            Err(ScriptError::NotCanonicalDer("R is padded"))
        );

        // undefined sighash byte
        let mut bad = buf.clone();
        let last = bad.len() - 1;
        bad[last] = 0x04;
        assert_eq!(decode(&bad), Err(ScriptError::InvalidHashType(0x04)));

        // truncated
        assert!(matches!(
            decode(&buf[..8]),
            Err(ScriptError::NotCanonicalDer(_))
        ));
    }

    #[test]
    fn it_rejects_high_s() {
        // s = n - 1 is above the halfway point
        let mut signature = [0u8; 64];
        signature[31] = 0x01;
        let n_minus_one =
            hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364140")
                .unwrap();
        signature[32..].copy_from_slice(&n_minus_one);
        let encoded = encode(&signature, 1).unwrap();
        assert_eq!(decode(&encoded), Err(ScriptError::NotLowS));
    }

    #[test]
    fn it_classifies_schnorr_signatures() {
        assert!(is_canonical_schnorr_signature(&[0u8; 64]));
        let mut with_type = [0u8; 65];
        with_type[64] = 0x81;
        assert!(is_canonical_schnorr_signature(&with_type));
        with_type[64] = 0x04;
        assert!(!is_canonical_schnorr_signature(&with_type));
        assert!(!is_canonical_schnorr_signature(&[0u8; 63]));
    }
}
