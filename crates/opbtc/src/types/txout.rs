//! Transaction outputs.

use std::io::{Read, Write};

use opbtc_core::primitives::{PrimitiveError, Satoshi};
use opbtc_core::ser::{ByteFormat, SerError};

use crate::script::Script;
use crate::types::transactions::TxError;

/// A transaction output: value and locking script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    /// The amount paid.
    pub value: Satoshi,
    /// The locking script.
    pub script_pubkey: Script,
}

impl TxOut {
    /// Instantiate an output.
    pub fn new(value: Satoshi, script_pubkey: Script) -> Self {
        TxOut {
            value,
            script_pubkey,
        }
    }
}

impl ByteFormat for TxOut {
    type Error = TxError;

    fn serialized_length(&self) -> usize {
        8 + self.script_pubkey.serialized_length()
    }

    fn read_from<R>(reader: &mut R) -> Result<Self, Self::Error>
    where
        R: Read,
    {
        let mut value = [0u8; 8];
        reader.read_exact(&mut value)?;
        let value = Satoshi::new(u64::from_le_bytes(value)).map_err(TxError::from)?;
        let script_pubkey = Script::read_from(reader).map_err(SerError::from)?;
        Ok(TxOut {
            value,
            script_pubkey,
        })
    }

    fn write_to<W>(&self, writer: &mut W) -> Result<usize, Self::Error>
    where
        W: Write,
    {
        writer.write_all(&self.value.sats().to_le_bytes())?;
        let written = self.script_pubkey.write_to(writer).map_err(SerError::from)?;
        Ok(8 + written)
    }
}

impl From<PrimitiveError> for TxError {
    fn from(e: PrimitiveError) -> Self {
        TxError::BadAmount(e)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_serializes_and_deserializes_outputs() {
        // 4242 sats to a p2wpkh script
        let hex_output = "9210000000000000160014751e76e8199196d454941c45d1b3a323f1433bd6";
        let txout = TxOut::deserialize_hex(hex_output).unwrap();
        assert_eq!(txout.value.sats(), 4242);
        assert_eq!(txout.script_pubkey.len(), 22);
        assert_eq!(txout.serialize_hex().unwrap(), hex_output);
    }

    #[test]
    fn it_rejects_amounts_past_the_cap() {
        // u64::MAX satoshis
        let hex_output = "ffffffffffffffff00";
        assert!(matches!(
            TxOut::deserialize_hex(hex_output),
            Err(TxError::BadAmount(_))
        ));
    }
}
