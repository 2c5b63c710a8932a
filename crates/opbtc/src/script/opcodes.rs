//! Bitcoin script opcode constants and name tables.

/// An empty push, also known as `OP_FALSE`.
pub const OP_0: u8 = 0x00;
/// The next byte gives the push length.
pub const OP_PUSHDATA1: u8 = 0x4c;
/// The next two LE bytes give the push length.
pub const OP_PUSHDATA2: u8 = 0x4d;
/// The next four LE bytes give the push length.
pub const OP_PUSHDATA4: u8 = 0x4e;
/// Push the number -1.
pub const OP_1NEGATE: u8 = 0x4f;
/// Reserved.
pub const OP_RESERVED: u8 = 0x50;
/// Push the number 1, also known as `OP_TRUE`.
pub const OP_1: u8 = 0x51;
/// Push the number 2.
pub const OP_2: u8 = 0x52;
/// Push the number 3.
pub const OP_3: u8 = 0x53;
/// Push the number 4.
pub const OP_4: u8 = 0x54;
/// Push the number 5.
pub const OP_5: u8 = 0x55;
/// Push the number 6.
pub const OP_6: u8 = 0x56;
/// Push the number 7.
pub const OP_7: u8 = 0x57;
/// Push the number 8.
pub const OP_8: u8 = 0x58;
/// Push the number 9.
pub const OP_9: u8 = 0x59;
/// Push the number 10.
pub const OP_10: u8 = 0x5a;
/// Push the number 11.
pub const OP_11: u8 = 0x5b;
/// Push the number 12.
pub const OP_12: u8 = 0x5c;
/// Push the number 13.
pub const OP_13: u8 = 0x5d;
/// Push the number 14.
pub const OP_14: u8 = 0x5e;
/// Push the number 15.
pub const OP_15: u8 = 0x5f;
/// Push the number 16.
pub const OP_16: u8 = 0x60;
/// Do nothing.
pub const OP_NOP: u8 = 0x61;
/// Reserved.
pub const OP_VER: u8 = 0x62;
/// Conditional execution.
pub const OP_IF: u8 = 0x63;
/// Inverted conditional execution.
pub const OP_NOTIF: u8 = 0x64;
/// Reserved.
pub const OP_VERIF: u8 = 0x65;
/// Reserved.
pub const OP_VERNOTIF: u8 = 0x66;
/// Conditional alternative branch.
pub const OP_ELSE: u8 = 0x67;
/// Conditional end.
pub const OP_ENDIF: u8 = 0x68;
/// Fail unless the top stack item is truthy.
pub const OP_VERIFY: u8 = 0x69;
/// Mark the output unspendable; trailing bytes are data.
pub const OP_RETURN: u8 = 0x6a;
/// Move the top item to the alt stack.
pub const OP_TOALTSTACK: u8 = 0x6b;
/// Move the top alt-stack item back.
pub const OP_FROMALTSTACK: u8 = 0x6c;
/// Drop two items.
pub const OP_2DROP: u8 = 0x6d;
/// Duplicate two items.
pub const OP_2DUP: u8 = 0x6e;
/// Duplicate three items.
pub const OP_3DUP: u8 = 0x6f;
/// Copy the pair two back.
pub const OP_2OVER: u8 = 0x70;
/// Rotate three pairs.
pub const OP_2ROT: u8 = 0x71;
/// Swap two pairs.
pub const OP_2SWAP: u8 = 0x72;
/// Duplicate the top item if it is truthy.
pub const OP_IFDUP: u8 = 0x73;
/// Push the stack depth.
pub const OP_DEPTH: u8 = 0x74;
/// Drop the top item.
pub const OP_DROP: u8 = 0x75;
/// Duplicate the top item.
pub const OP_DUP: u8 = 0x76;
/// Drop the second item.
pub const OP_NIP: u8 = 0x77;
/// Copy the second item.
pub const OP_OVER: u8 = 0x78;
/// Copy the n-th item.
pub const OP_PICK: u8 = 0x79;
/// Move the n-th item.
pub const OP_ROLL: u8 = 0x7a;
/// Rotate the top three items.
pub const OP_ROT: u8 = 0x7b;
/// Swap the top two items.
pub const OP_SWAP: u8 = 0x7c;
/// Copy the top item below the second.
pub const OP_TUCK: u8 = 0x7d;
/// Disabled.
pub const OP_CAT: u8 = 0x7e;
/// Disabled.
pub const OP_SUBSTR: u8 = 0x7f;
/// Disabled.
pub const OP_LEFT: u8 = 0x80;
/// Disabled.
pub const OP_RIGHT: u8 = 0x81;
/// Push the length of the top item.
pub const OP_SIZE: u8 = 0x82;
/// Disabled.
pub const OP_INVERT: u8 = 0x83;
/// Disabled.
pub const OP_AND: u8 = 0x84;
/// Disabled.
pub const OP_OR: u8 = 0x85;
/// Disabled.
pub const OP_XOR: u8 = 0x86;
/// Bytewise equality.
pub const OP_EQUAL: u8 = 0x87;
/// `OP_EQUAL` then `OP_VERIFY`.
pub const OP_EQUALVERIFY: u8 = 0x88;
/// Reserved.
pub const OP_RESERVED1: u8 = 0x89;
/// Reserved.
pub const OP_RESERVED2: u8 = 0x8a;
/// Increment.
pub const OP_1ADD: u8 = 0x8b;
/// Decrement.
pub const OP_1SUB: u8 = 0x8c;
/// Disabled.
pub const OP_2MUL: u8 = 0x8d;
/// Disabled.
pub const OP_2DIV: u8 = 0x8e;
/// Numeric negation.
pub const OP_NEGATE: u8 = 0x8f;
/// Absolute value.
pub const OP_ABS: u8 = 0x90;
/// Boolean negation.
pub const OP_NOT: u8 = 0x91;
/// True unless zero.
pub const OP_0NOTEQUAL: u8 = 0x92;
/// Addition.
pub const OP_ADD: u8 = 0x93;
/// Subtraction.
pub const OP_SUB: u8 = 0x94;
/// Disabled.
pub const OP_MUL: u8 = 0x95;
/// Disabled.
pub const OP_DIV: u8 = 0x96;
/// Disabled.
pub const OP_MOD: u8 = 0x97;
/// Disabled.
pub const OP_LSHIFT: u8 = 0x98;
/// Disabled.
pub const OP_RSHIFT: u8 = 0x99;
/// Boolean and.
pub const OP_BOOLAND: u8 = 0x9a;
/// Boolean or.
pub const OP_BOOLOR: u8 = 0x9b;
/// Numeric equality.
pub const OP_NUMEQUAL: u8 = 0x9c;
/// `OP_NUMEQUAL` then `OP_VERIFY`.
pub const OP_NUMEQUALVERIFY: u8 = 0x9d;
/// Numeric inequality.
pub const OP_NUMNOTEQUAL: u8 = 0x9e;
/// Less-than.
pub const OP_LESSTHAN: u8 = 0x9f;
/// Greater-than.
pub const OP_GREATERTHAN: u8 = 0xa0;
/// Less-than-or-equal.
pub const OP_LESSTHANOREQUAL: u8 = 0xa1;
/// Greater-than-or-equal.
pub const OP_GREATERTHANOREQUAL: u8 = 0xa2;
/// Minimum.
pub const OP_MIN: u8 = 0xa3;
/// Maximum.
pub const OP_MAX: u8 = 0xa4;
/// Range check.
pub const OP_WITHIN: u8 = 0xa5;
/// RIPEMD-160.
pub const OP_RIPEMD160: u8 = 0xa6;
/// SHA-1.
pub const OP_SHA1: u8 = 0xa7;
/// SHA-256.
pub const OP_SHA256: u8 = 0xa8;
/// RIPEMD-160 of SHA-256.
pub const OP_HASH160: u8 = 0xa9;
/// Double SHA-256.
pub const OP_HASH256: u8 = 0xaa;
/// Signature-hash scope separator.
pub const OP_CODESEPARATOR: u8 = 0xab;
/// Check a signature.
pub const OP_CHECKSIG: u8 = 0xac;
/// `OP_CHECKSIG` then `OP_VERIFY`.
pub const OP_CHECKSIGVERIFY: u8 = 0xad;
/// Check an m-of-n multisignature.
pub const OP_CHECKMULTISIG: u8 = 0xae;
/// `OP_CHECKMULTISIG` then `OP_VERIFY`.
pub const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;
/// Do nothing.
pub const OP_NOP1: u8 = 0xb0;
/// BIP65 absolute timelock.
pub const OP_CHECKLOCKTIMEVERIFY: u8 = 0xb1;
/// BIP112 relative timelock.
pub const OP_CHECKSEQUENCEVERIFY: u8 = 0xb2;
/// Do nothing.
pub const OP_NOP4: u8 = 0xb3;
/// Do nothing.
pub const OP_NOP5: u8 = 0xb4;
/// Do nothing.
pub const OP_NOP6: u8 = 0xb5;
/// Do nothing.
pub const OP_NOP7: u8 = 0xb6;
/// Do nothing.
pub const OP_NOP8: u8 = 0xb7;
/// Do nothing.
pub const OP_NOP9: u8 = 0xb8;
/// Do nothing.
pub const OP_NOP10: u8 = 0xb9;
/// BIP342 batch-verifiable signature check.
pub const OP_CHECKSIGADD: u8 = 0xba;
/// Invalid opcode marker.
pub const OP_INVALIDOPCODE: u8 = 0xff;

/// The `OP_1`..`OP_16` constant for a small number, if in range.
pub fn small_int_op(n: u8) -> Option<u8> {
    match n {
        1..=16 => Some(OP_RESERVED + n),
        _ => None,
    }
}

/// The value pushed by an `OP_0`/`OP_1`..`OP_16` opcode, if any.
pub fn decode_small_int(op: u8) -> Option<u8> {
    match op {
        OP_0 => Some(0),
        OP_1..=OP_16 => Some(op - OP_RESERVED),
        _ => None,
    }
}

/// The canonical name of an opcode, or `None` for raw pushes and unassigned
/// bytes.
pub fn name(op: u8) -> Option<&'static str> {
    let name = match op {
        OP_0 => "OP_0",
        OP_PUSHDATA1 => "OP_PUSHDATA1",
        OP_PUSHDATA2 => "OP_PUSHDATA2",
        OP_PUSHDATA4 => "OP_PUSHDATA4",
        OP_1NEGATE => "OP_1NEGATE",
        OP_RESERVED => "OP_RESERVED",
        OP_1 => "OP_1",
        OP_2 => "OP_2",
        OP_3 => "OP_3",
        OP_4 => "OP_4",
        OP_5 => "OP_5",
        OP_6 => "OP_6",
        OP_7 => "OP_7",
        OP_8 => "OP_8",
        OP_9 => "OP_9",
        OP_10 => "OP_10",
        OP_11 => "OP_11",
        OP_12 => "OP_12",
        OP_13 => "OP_13",
        OP_14 => "OP_14",
        OP_15 => "OP_15",
        OP_16 => "OP_16",
        OP_NOP => "OP_NOP",
        OP_VER => "OP_VER",
        OP_IF => "OP_IF",
        OP_NOTIF => "OP_NOTIF",
        OP_VERIF => "OP_VERIF",
        OP_VERNOTIF => "OP_VERNOTIF",
        OP_ELSE => "OP_ELSE",
        OP_ENDIF => "OP_ENDIF",
        OP_VERIFY => "OP_VERIFY",
        OP_RETURN => "OP_RETURN",
        OP_TOALTSTACK => "OP_TOALTSTACK",
        OP_FROMALTSTACK => "OP_FROMALTSTACK",
        OP_2DROP => "OP_2DROP",
        OP_2DUP => "OP_2DUP",
        OP_3DUP => "OP_3DUP",
        OP_2OVER => "OP_2OVER",
        OP_2ROT => "OP_2ROT",
        OP_2SWAP => "OP_2SWAP",
        OP_IFDUP => "OP_IFDUP",
        OP_DEPTH => "OP_DEPTH",
        OP_DROP => "OP_DROP",
        OP_DUP => "OP_DUP",
        OP_NIP => "OP_NIP",
        OP_OVER => "OP_OVER",
        OP_PICK => "OP_PICK",
        OP_ROLL => "OP_ROLL",
        OP_ROT => "OP_ROT",
        OP_SWAP => "OP_SWAP",
        OP_TUCK => "OP_TUCK",
        OP_CAT => "OP_CAT",
        OP_SUBSTR => "OP_SUBSTR",
        OP_LEFT => "OP_LEFT",
        OP_RIGHT => "OP_RIGHT",
        OP_SIZE => "OP_SIZE",
        OP_INVERT => "OP_INVERT",
        OP_AND => "OP_AND",
        OP_OR => "OP_OR",
        OP_XOR => "OP_XOR",
        OP_EQUAL => "OP_EQUAL",
        OP_EQUALVERIFY => "OP_EQUALVERIFY",
        OP_RESERVED1 => "OP_RESERVED1",
        OP_RESERVED2 => "OP_RESERVED2",
        OP_1ADD => "OP_1ADD",
        OP_1SUB => "OP_1SUB",
        OP_2MUL => "OP_2MUL",
        OP_2DIV => "OP_2DIV",
        OP_NEGATE => "OP_NEGATE",
        OP_ABS => "OP_ABS",
        OP_NOT => "OP_NOT",
        OP_0NOTEQUAL => "OP_0NOTEQUAL",
        OP_ADD => "OP_ADD",
        OP_SUB => "OP_SUB",
        OP_MUL => "OP_MUL",
        OP_DIV => "OP_DIV",
        OP_MOD => "OP_MOD",
        OP_LSHIFT => "OP_LSHIFT",
        OP_RSHIFT => "OP_RSHIFT",
        OP_BOOLAND => "OP_BOOLAND",
        OP_BOOLOR => "OP_BOOLOR",
        OP_NUMEQUAL => "OP_NUMEQUAL",
        OP_NUMEQUALVERIFY => "OP_NUMEQUALVERIFY",
        OP_NUMNOTEQUAL => "OP_NUMNOTEQUAL",
        OP_LESSTHAN => "OP_LESSTHAN",
        OP_GREATERTHAN => "OP_GREATERTHAN",
        OP_LESSTHANOREQUAL => "OP_LESSTHANOREQUAL",
        OP_GREATERTHANOREQUAL => "OP_GREATERTHANOREQUAL",
        OP_MIN => "OP_MIN",
        OP_MAX => "OP_MAX",
        OP_WITHIN => "OP_WITHIN",
        OP_RIPEMD160 => "OP_RIPEMD160",
        OP_SHA1 => "OP_SHA1",
        OP_SHA256 => "OP_SHA256",
        OP_HASH160 => "OP_HASH160",
        OP_HASH256 => "OP_HASH256",
        OP_CODESEPARATOR => "OP_CODESEPARATOR",
        OP_CHECKSIG => "OP_CHECKSIG",
        OP_CHECKSIGVERIFY => "OP_CHECKSIGVERIFY",
        OP_CHECKMULTISIG => "OP_CHECKMULTISIG",
        OP_CHECKMULTISIGVERIFY => "OP_CHECKMULTISIGVERIFY",
        OP_NOP1 => "OP_NOP1",
        OP_CHECKLOCKTIMEVERIFY => "OP_CHECKLOCKTIMEVERIFY",
        OP_CHECKSEQUENCEVERIFY => "OP_CHECKSEQUENCEVERIFY",
        OP_NOP4 => "OP_NOP4",
        OP_NOP5 => "OP_NOP5",
        OP_NOP6 => "OP_NOP6",
        OP_NOP7 => "OP_NOP7",
        OP_NOP8 => "OP_NOP8",
        OP_NOP9 => "OP_NOP9",
        OP_NOP10 => "OP_NOP10",
        OP_CHECKSIGADD => "OP_CHECKSIGADD",
        OP_INVALIDOPCODE => "OP_INVALIDOPCODE",
        _ => return None,
    };
    Some(name)
}

/// The opcode for a canonical name, accepting the `OP_FALSE`/`OP_TRUE`
/// aliases.
pub fn from_name(name: &str) -> Option<u8> {
    match name {
        "OP_FALSE" => return Some(OP_0),
        "OP_TRUE" => return Some(OP_1),
        "OP_CLTV" => return Some(OP_CHECKLOCKTIMEVERIFY),
        "OP_CSV" => return Some(OP_CHECKSEQUENCEVERIFY),
        _ => {}
    }
    (0x00u8..=0xff).find(|op| self::name(*op) == Some(name))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names_round_trip() {
        for op in 0x00..=0xffu8 {
            if let Some(n) = name(op) {
                assert_eq!(from_name(n), Some(op));
            }
        }
        assert_eq!(from_name("OP_TRUE"), Some(OP_1));
        assert_eq!(from_name("OP_NOPE"), None);
    }

    #[test]
    fn small_ints_map_both_ways() {
        assert_eq!(small_int_op(1), Some(OP_1));
        assert_eq!(small_int_op(16), Some(OP_16));
        assert_eq!(small_int_op(17), None);
        assert_eq!(decode_small_int(OP_0), Some(0));
        assert_eq!(decode_small_int(OP_7), Some(7));
        assert_eq!(decode_small_int(OP_DUP), None);
    }
}
