//! Script assembly and disassembly.
//!
//! [`compile`] turns a stack of opcodes and data pushes into canonical
//! minimal-push script bytes; [`decompile`] inverts it; [`to_asm`] and
//! [`from_asm`] translate to and from the space-separated text form.

use opbtc_core::wrap_prefixed_byte_vector;
use thiserror::Error;

pub mod num;
pub mod opcodes;
pub mod signature;

use opcodes::*;

/// Errors raised by the script assembler and signature codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    /// A push opcode claimed more bytes than remain in the script.
    #[error("push claims {wanted} bytes but only {remaining} remain")]
    InvalidPushLength {
        /// Bytes the push header claimed.
        wanted: usize,
        /// Bytes actually left.
        remaining: usize,
    },

    /// An assembly token did not name a known opcode.
    #[error("unknown opcode {0}")]
    InvalidOpcode(String),

    /// An assembly token was neither an opcode name nor valid hex.
    #[error("assembly token {0} is not hex")]
    InvalidAsmToken(String),

    /// A script number was longer than its caller allows.
    #[error("script number exceeds {0} bytes")]
    NumberOutOfRange(usize),

    /// A script number carried unnecessary padding bytes.
    #[error("script number is not minimally encoded")]
    NonMinimalNumber,

    /// A signature failed strict-DER (BIP66) checks.
    #[error("signature is not canonical DER: {0}")]
    NotCanonicalDer(&'static str),

    /// An ECDSA signature's S component exceeds half the group order.
    #[error("signature S value is not low")]
    NotLowS,

    /// A sighash byte was outside the defined set.
    #[error("invalid signature hash type 0x{0:02x}")]
    InvalidHashType(u32),
}

wrap_prefixed_byte_vector!(
    /// Raw script bytes. In transaction context the script serializes as a
    /// CompactSize-prefixed slice; `as_ref` exposes the unprefixed bytes
    /// that scripts hash over.
    Script
);

/// One element of a script under assembly: a non-push opcode, pushed data,
/// or a number that compiles through the script-number encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackItem {
    /// A bare opcode byte (including `OP_0`, `OP_1NEGATE`, and `OP_1`..`OP_16`).
    Op(u8),
    /// Pushed data bytes.
    Push(Vec<u8>),
    /// A numeric element; encoded signed-magnitude, then minimally pushed.
    /// `decompile` never produces this variant.
    Number(i64),
}

impl From<u8> for StackItem {
    fn from(op: u8) -> Self {
        StackItem::Op(op)
    }
}

impl From<Vec<u8>> for StackItem {
    fn from(data: Vec<u8>) -> Self {
        StackItem::Push(data)
    }
}

impl From<&[u8]> for StackItem {
    fn from(data: &[u8]) -> Self {
        StackItem::Push(data.to_vec())
    }
}

fn push_minimal(out: &mut Vec<u8>, data: &[u8]) {
    match data {
        [] => out.push(OP_0),
        [b] if (1..=16).contains(b) => out.push(OP_RESERVED + b),
        [0x81] => out.push(OP_1NEGATE),
        _ => {
            let n = data.len();
            if n <= 75 {
                out.push(n as u8);
            } else if n <= 0xff {
                out.push(OP_PUSHDATA1);
                out.push(n as u8);
            } else if n <= 0xffff {
                out.push(OP_PUSHDATA2);
                out.extend_from_slice(&(n as u16).to_le_bytes());
            } else {
                out.push(OP_PUSHDATA4);
                out.extend_from_slice(&(n as u32).to_le_bytes());
            }
            out.extend_from_slice(data);
        }
    }
}

/// Compile a stack into canonical minimal-push script bytes.
pub fn compile(stack: &[StackItem]) -> Script {
    let mut out = Vec::new();
    for item in stack {
        match item {
            StackItem::Op(op) => out.push(*op),
            StackItem::Push(data) => push_minimal(&mut out, data),
            StackItem::Number(n) => push_minimal(&mut out, &num::encode(*n)),
        }
    }
    Script::new(out)
}

/// Decompile script bytes into a stack. Returns `None` when a push claims
/// more bytes than remain.
pub fn decompile(bytes: &[u8]) -> Option<Vec<StackItem>> {
    let mut stack = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        let op = bytes[i];
        i += 1;
        // Data pushes: direct length, or one of the OP_PUSHDATA widths.
        let length = match op {
            0x01..=0x4b => op as usize,
            OP_PUSHDATA1 => {
                let n = *bytes.get(i)? as usize;
                i += 1;
                n
            }
            OP_PUSHDATA2 => {
                let raw = bytes.get(i..i + 2)?;
                i += 2;
                u16::from_le_bytes([raw[0], raw[1]]) as usize
            }
            OP_PUSHDATA4 => {
                let raw = bytes.get(i..i + 4)?;
                i += 4;
                u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize
            }
            _ => {
                stack.push(StackItem::Op(op));
                continue;
            }
        };
        let data = bytes.get(i..i + length)?;
        i += length;
        stack.push(StackItem::Push(data.to_vec()));
    }
    Some(stack)
}

/// Render script bytes as space-separated assembly tokens.
pub fn to_asm(bytes: &[u8]) -> Result<String, ScriptError> {
    let stack = decompile(bytes).ok_or(ScriptError::InvalidPushLength {
        wanted: 0,
        remaining: bytes.len(),
    })?;
    let mut tokens = Vec::with_capacity(stack.len());
    for item in &stack {
        match item {
            StackItem::Op(op) => match opcodes::name(*op) {
                Some(name) => tokens.push(name.to_string()),
                None => tokens.push(format!("OP_UNKNOWN_0x{:02x}", op)),
            },
            StackItem::Push(data) => tokens.push(hex::encode(data)),
            StackItem::Number(n) => tokens.push(hex::encode(num::encode(*n))),
        }
    }
    Ok(tokens.join(" "))
}

/// Parse assembly tokens and re-compile to canonical script bytes.
pub fn from_asm(asm: &str) -> Result<Script, ScriptError> {
    let mut stack = Vec::new();
    for token in asm.split_whitespace() {
        if let Some(rest) = token.strip_prefix("OP_UNKNOWN_0x") {
            let op = u8::from_str_radix(rest, 16)
                .map_err(|_| ScriptError::InvalidOpcode(token.to_string()))?;
            stack.push(StackItem::Op(op));
        } else if token.starts_with("OP_") {
            let op = opcodes::from_name(token)
                .ok_or_else(|| ScriptError::InvalidOpcode(token.to_string()))?;
            stack.push(StackItem::Op(op));
        } else {
            let data =
                hex::decode(token).map_err(|_| ScriptError::InvalidAsmToken(token.to_string()))?;
            stack.push(StackItem::Push(data));
        }
    }
    Ok(compile(&stack))
}

impl Script {
    /// Render as assembly.
    pub fn to_asm(&self) -> Result<String, ScriptError> {
        to_asm(self.as_ref())
    }

    /// True when every element is a push (data, `OP_0`..`OP_16`, or
    /// `OP_1NEGATE`).
    pub fn is_push_only(&self) -> bool {
        match decompile(self.as_ref()) {
            None => false,
            Some(stack) => stack.iter().all(|item| match item {
                StackItem::Push(_) | StackItem::Number(_) => true,
                StackItem::Op(op) => *op == OP_0 || *op == OP_1NEGATE || (*op >= OP_1 && *op <= OP_16),
            }),
        }
    }

    /// The pushed elements of a push-only script, small ints rendered as
    /// script numbers.
    pub fn push_stack(&self) -> Option<Vec<Vec<u8>>> {
        let stack = decompile(self.as_ref())?;
        let mut out = Vec::with_capacity(stack.len());
        for item in stack {
            match item {
                StackItem::Push(data) => out.push(data),
                StackItem::Number(n) => out.push(num::encode(n)),
                StackItem::Op(OP_0) => out.push(vec![]),
                StackItem::Op(OP_1NEGATE) => out.push(vec![0x81]),
                StackItem::Op(op) if (OP_1..=OP_16).contains(&op) => {
                    out.push(vec![op - OP_RESERVED])
                }
                StackItem::Op(_) => return None,
            }
        }
        Some(out)
    }

    /// Split a segwit output into `(witness_version, program)` when the
    /// script has that shape.
    pub fn witness_program(&self) -> Option<(u8, &[u8])> {
        let bytes = self.as_ref();
        if bytes.len() < 4 || bytes.len() > 42 {
            return None;
        }
        let version = decode_small_int(bytes[0])?;
        if bytes[0] != OP_0 && version == 0 {
            return None;
        }
        let push_len = bytes[1] as usize;
        if !(2..=40).contains(&push_len) || push_len != bytes.len() - 2 {
            return None;
        }
        Some((version, &bytes[2..]))
    }
}
