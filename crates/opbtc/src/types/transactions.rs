//! The transaction type and its legacy/witness wire formats.

use std::io::{Read, Write};

use opbtc_core::hashes::Hash256Writer;
use opbtc_core::primitives::{Bytes32, PrimitiveError};
use opbtc_core::ser::{read_var_slice, write_var_slice, ByteFormat, SerError};

use thiserror::Error;

use crate::types::{txin::TxIn, txout::TxOut};

/// One input's witness: a stack of byte vectors.
pub type Witness = Vec<Vec<u8>>;

/// Errors raised by transaction (de)serialization.
#[derive(Debug, Error)]
pub enum TxError {
    /// Bubbled serialization error.
    #[error(transparent)]
    Ser(#[from] SerError),

    /// Bubbled IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Got an unknown flag where we expected the witness flag.
    #[error("witness flag not as expected: got {0:?}, expected [0, 1]")]
    BadWitnessFlag([u8; 2]),

    /// An output's value failed the supply-cap check.
    #[error("bad output amount: {0}")]
    BadAmount(#[source] PrimitiveError),

    /// Witness count disagrees with input count.
    #[error("got {witnesses} witnesses for {inputs} inputs")]
    WrongNumberOfWitnesses {
        /// Witness stacks present.
        witnesses: usize,
        /// Inputs present.
        inputs: usize,
    },
}

/// Type alias for transaction results.
pub type TxResult<T> = Result<T, TxError>;

/// A Bitcoin transaction. Witness data is carried per input; a transaction
/// with no witness data serializes in the legacy format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// The version number.
    pub version: i32,
    /// The inputs.
    pub inputs: Vec<TxIn>,
    /// The outputs.
    pub outputs: Vec<TxOut>,
    /// Per-input witnesses; empty when the transaction is legacy.
    pub witnesses: Vec<Witness>,
    /// The lock time.
    pub locktime: u32,
}

impl Transaction {
    /// Instantiate a legacy transaction.
    pub fn new<I, O>(version: i32, inputs: I, outputs: O, locktime: u32) -> Self
    where
        I: Into<Vec<TxIn>>,
        O: Into<Vec<TxOut>>,
    {
        Transaction {
            version,
            inputs: inputs.into(),
            outputs: outputs.into(),
            witnesses: vec![],
            locktime,
        }
    }

    /// Instantiate a witness transaction. The witness count must match the
    /// input count.
    pub fn new_witness<I, O, W>(
        version: i32,
        inputs: I,
        outputs: O,
        witnesses: W,
        locktime: u32,
    ) -> TxResult<Self>
    where
        I: Into<Vec<TxIn>>,
        O: Into<Vec<TxOut>>,
        W: Into<Vec<Witness>>,
    {
        let inputs = inputs.into();
        let witnesses = witnesses.into();
        if !witnesses.is_empty() && witnesses.len() != inputs.len() {
            return Err(TxError::WrongNumberOfWitnesses {
                witnesses: witnesses.len(),
                inputs: inputs.len(),
            });
        }
        Ok(Transaction {
            version,
            inputs,
            outputs: outputs.into(),
            witnesses,
            locktime,
        })
    }

    /// True when any input carries witness data.
    pub fn has_witness(&self) -> bool {
        self.witnesses.iter().any(|w| !w.is_empty())
    }

    fn write_legacy<W: Write>(&self, writer: &mut W) -> TxResult<usize> {
        let mut written = 0usize;
        writer.write_all(&self.version.to_le_bytes())?;
        written += 4;
        written += Self::write_prefix_vec(writer, &self.inputs)?;
        written += Self::write_prefix_vec(writer, &self.outputs)?;
        writer.write_all(&self.locktime.to_le_bytes())?;
        written += 4;
        Ok(written)
    }

    /// The transaction id: hash256 of the legacy serialization.
    pub fn txid(&self) -> TxResult<Bytes32> {
        let mut writer = Hash256Writer::default();
        self.write_legacy(&mut writer)?;
        Ok(Bytes32::new(writer.finish()))
    }

    /// The witness transaction id: hash256 of the full serialization. Equal
    /// to `txid` for legacy transactions.
    pub fn wtxid(&self) -> TxResult<Bytes32> {
        let mut writer = Hash256Writer::default();
        self.write_to(&mut writer)?;
        Ok(Bytes32::new(writer.finish()))
    }

    /// Transaction weight: 3x the legacy size plus the full size.
    pub fn weight(&self) -> usize {
        let legacy = self.legacy_length();
        3 * legacy + self.serialized_length()
    }

    /// Virtual size: weight / 4, rounded up.
    pub fn vsize(&self) -> usize {
        self.weight().div_ceil(4)
    }

    fn legacy_length(&self) -> usize {
        let mut length = 8; // version + locktime
        length += opbtc_core::ser::var_int_size(self.inputs.len() as u64);
        length += self.inputs.iter().map(|i| i.serialized_length()).sum::<usize>();
        length += opbtc_core::ser::var_int_size(self.outputs.len() as u64);
        length += self.outputs.iter().map(|o| o.serialized_length()).sum::<usize>();
        length
    }
}

impl ByteFormat for Transaction {
    type Error = TxError;

    fn serialized_length(&self) -> usize {
        let mut length = self.legacy_length();
        if self.has_witness() {
            length += 2; // marker and flag
            for witness in &self.witnesses {
                length += opbtc_core::ser::var_int_size(witness.len() as u64);
                for item in witness {
                    length += opbtc_core::ser::var_int_size(item.len() as u64);
                    length += item.len();
                }
            }
        }
        length
    }

    fn read_from<R>(reader: &mut R) -> Result<Self, Self::Error>
    where
        R: Read,
    {
        let mut version = [0u8; 4];
        reader.read_exact(&mut version)?;
        let version = i32::from_le_bytes(version);

        // A zero input count is the segwit marker; the flag byte follows.
        let mut inputs = Self::read_prefix_vec::<_, TxIn>(reader)?;
        let segwit = inputs.is_empty();
        if segwit {
            let mut flag = [0u8; 1];
            reader.read_exact(&mut flag)?;
            if flag[0] != 0x01 {
                return Err(TxError::BadWitnessFlag([0x00, flag[0]]));
            }
            inputs = Self::read_prefix_vec::<_, TxIn>(reader)?;
        }
        let outputs = Self::read_prefix_vec::<_, TxOut>(reader)?;

        let witnesses = if segwit {
            let mut witnesses = Vec::with_capacity(inputs.len());
            for _ in 0..inputs.len() {
                let items = opbtc_core::ser::read_compact_int(reader)? as usize;
                let mut witness = Vec::with_capacity(items.min(1024));
                for _ in 0..items {
                    witness.push(read_var_slice(reader)?);
                }
                witnesses.push(witness);
            }
            witnesses
        } else {
            vec![]
        };

        let mut locktime = [0u8; 4];
        reader.read_exact(&mut locktime)?;
        Ok(Transaction {
            version,
            inputs,
            outputs,
            witnesses,
            locktime: u32::from_le_bytes(locktime),
        })
    }

    fn write_to<W>(&self, writer: &mut W) -> Result<usize, Self::Error>
    where
        W: Write,
    {
        if !self.has_witness() {
            return self.write_legacy(writer);
        }
        if self.witnesses.len() != self.inputs.len() {
            return Err(TxError::WrongNumberOfWitnesses {
                witnesses: self.witnesses.len(),
                inputs: self.inputs.len(),
            });
        }

        let mut written = 0usize;
        writer.write_all(&self.version.to_le_bytes())?;
        written += 4;
        writer.write_all(&[0x00, 0x01])?;
        written += 2;
        written += Self::write_prefix_vec(writer, &self.inputs)?;
        written += Self::write_prefix_vec(writer, &self.outputs)?;
        for witness in &self.witnesses {
            written += opbtc_core::ser::write_compact_int(writer, witness.len() as u64)?;
            for item in witness {
                written += write_var_slice(writer, item)?;
            }
        }
        writer.write_all(&self.locktime.to_le_bytes())?;
        written += 4;
        Ok(written)
    }
}
