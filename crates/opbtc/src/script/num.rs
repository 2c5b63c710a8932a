//! Bitcoin's signed-magnitude script-number encoding.
//!
//! Little-endian magnitude with the sign carried in the high bit of the top
//! byte; an extra byte is appended when the magnitude already uses that bit.

use super::ScriptError;

/// Encode a number in script form. Zero is the empty vector.
pub fn encode(value: i64) -> Vec<u8> {
    if value == 0 {
        return vec![];
    }
    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    let mut out = Vec::with_capacity(9);
    while magnitude > 0 {
        out.push((magnitude & 0xff) as u8);
        magnitude >>= 8;
    }
    let top_bit_taken = out.last().map(|b| b & 0x80 != 0).unwrap_or(false);
    if top_bit_taken {
        out.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        let last = out.len() - 1;
        out[last] |= 0x80;
    }
    out
}

/// Decode a script number of at most `max_len` bytes, requiring minimal
/// encoding when `require_minimal` is set.
pub fn decode(bytes: &[u8], max_len: usize, require_minimal: bool) -> Result<i64, ScriptError> {
    if bytes.is_empty() {
        return Ok(0);
    }
    if bytes.len() > max_len {
        return Err(ScriptError::NumberOutOfRange(max_len));
    }
    if require_minimal {
        let last = bytes[bytes.len() - 1];
        // The top byte may only be a bare sign byte when the byte below
        // needs its high bit for magnitude.
        if last & 0x7f == 0 && (bytes.len() == 1 || bytes[bytes.len() - 2] & 0x80 == 0) {
            return Err(ScriptError::NonMinimalNumber);
        }
    }

    let mut value: i64 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        value |= (*byte as i64) << (8 * i);
    }

    let top = bytes.len() - 1;
    if bytes[top] & 0x80 != 0 {
        value &= !(0x80i64 << (8 * top));
        value = -value;
    }
    Ok(value)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_encodes_known_values() {
        let cases: [(i64, &[u8]); 10] = [
            (0, &[]),
            (1, &[0x01]),
            (-1, &[0x81]),
            (127, &[0x7f]),
            (128, &[0x80, 0x00]),
            (-128, &[0x80, 0x80]),
            (255, &[0xff, 0x00]),
            (256, &[0x00, 0x01]),
            (-255, &[0xff, 0x80]),
            (0x0102_0304, &[0x04, 0x03, 0x02, 0x01]),
        ];
        for (value, expected) in cases {
            assert_eq!(encode(value), expected, "encoding {}", value);
            assert_eq!(decode(expected, 5, true).unwrap(), value, "decoding {}", value);
        }
    }

    #[test]
    fn it_rejects_padding_and_overflow() {
        // 1 padded with a dead zero byte
        assert_eq!(
            decode(&[0x01, 0x00], 4, true),
            Err(ScriptError::NonMinimalNumber)
        );
        // but acceptable when minimality is not demanded
        assert_eq!(decode(&[0x01, 0x00], 4, false).unwrap(), 1);
        // five bytes against a four byte cap
        assert_eq!(
            decode(&[0x01, 0x02, 0x03, 0x04, 0x05], 4, true),
            Err(ScriptError::NumberOutOfRange(4))
        );
    }
}
