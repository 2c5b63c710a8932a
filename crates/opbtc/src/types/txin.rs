//! Transaction inputs.

use std::io::{Read, Write};

use opbtc_core::primitives::Bytes32;
use opbtc_core::ser::{ByteFormat, SerError};

use crate::script::Script;
use crate::types::transactions::TxError;

/// A reference to a previous output: txid (internal byte order) and index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Outpoint {
    /// The funding transaction id, as it appears on the wire.
    pub txid: Bytes32,
    /// The output index within that transaction.
    pub index: u32,
}

impl Outpoint {
    /// The null outpoint found in coinbase inputs.
    pub fn null() -> Self {
        Outpoint {
            txid: Bytes32::default(),
            index: 0xffff_ffff,
        }
    }
}

impl ByteFormat for Outpoint {
    type Error = TxError;

    fn serialized_length(&self) -> usize {
        36
    }

    fn read_from<R>(reader: &mut R) -> Result<Self, Self::Error>
    where
        R: Read,
    {
        let txid = Bytes32::read_from(reader).map_err(SerError::from)?;
        let mut index = [0u8; 4];
        reader.read_exact(&mut index)?;
        Ok(Outpoint {
            txid,
            index: u32::from_le_bytes(index),
        })
    }

    fn write_to<W>(&self, writer: &mut W) -> Result<usize, Self::Error>
    where
        W: Write,
    {
        let mut written = self.txid.write_to(writer).map_err(SerError::from)?;
        writer.write_all(&self.index.to_le_bytes())?;
        written += 4;
        Ok(written)
    }
}

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    /// The output being spent.
    pub outpoint: Outpoint,
    /// The unlocking script.
    pub script_sig: Script,
    /// The sequence number.
    pub sequence: u32,
}

impl TxIn {
    /// Instantiate an input with the final sequence number.
    pub fn new(outpoint: Outpoint, script_sig: Script) -> Self {
        TxIn {
            outpoint,
            script_sig,
            sequence: 0xffff_ffff,
        }
    }
}

impl ByteFormat for TxIn {
    type Error = TxError;

    fn serialized_length(&self) -> usize {
        self.outpoint.serialized_length() + self.script_sig.serialized_length() + 4
    }

    fn read_from<R>(reader: &mut R) -> Result<Self, Self::Error>
    where
        R: Read,
    {
        let outpoint = Outpoint::read_from(reader)?;
        let script_sig = Script::read_from(reader).map_err(SerError::from)?;
        let mut sequence = [0u8; 4];
        reader.read_exact(&mut sequence)?;
        Ok(TxIn {
            outpoint,
            script_sig,
            sequence: u32::from_le_bytes(sequence),
        })
    }

    fn write_to<W>(&self, writer: &mut W) -> Result<usize, Self::Error>
    where
        W: Write,
    {
        let mut written = self.outpoint.write_to(writer)?;
        written += self.script_sig.write_to(writer).map_err(SerError::from)?;
        writer.write_all(&self.sequence.to_le_bytes())?;
        written += 4;
        Ok(written)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_serializes_and_deserializes_inputs() {
        // 32-byte txid, vout 0, empty script, final sequence
        let hex_input = format!("{}00000000{}{}", "11".repeat(32), "00", "ffffffff");
        let txin = TxIn::deserialize_hex(&hex_input).unwrap();
        assert_eq!(txin.outpoint.txid.as_ref(), &[0x11u8; 32][..]);
        assert_eq!(txin.outpoint.index, 0);
        assert!(txin.script_sig.is_empty());
        assert_eq!(txin.sequence, 0xffff_ffff);
        assert_eq!(txin.serialize_hex().unwrap(), hex_input);
        assert_eq!(txin.serialized_length(), hex_input.len() / 2);
    }

    #[test]
    fn null_outpoints_look_like_coinbases() {
        let null = Outpoint::null();
        let hex_out = null.serialize_hex().unwrap();
        assert_eq!(hex_out, format!("{}ffffffff", "00".repeat(32)));
    }
}
