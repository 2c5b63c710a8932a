//! Binary (de)serialization for the Bitcoin wire format.
//!
//! All CompactSize and length-prefix logic in the workspace lives here: the
//! cursor-bounded [`ByteWriter`]/[`ByteReader`] pair used by script and
//! taproot assembly, the `std::io` CompactSize helpers, and the
//! [`ByteFormat`] trait implemented by transaction types.

use std::io::{Cursor, Error as IOError, Read, Write};

use thiserror::Error;

/// Errors related to serialization of types.
#[derive(Debug, Error)]
pub enum SerError {
    /// CompactSize values must use the shortest encoding that fits.
    #[error("attempted to deserialize non-minimal CompactSize")]
    NonMinimalVarInt,

    /// A bounded writer refused an out-of-range write.
    #[error("write of {wanted} bytes at cursor {cursor} exceeds buffer of {len} bytes")]
    OutOfBounds {
        /// Cursor position at the time of the write.
        cursor: usize,
        /// Bytes the write required.
        wanted: usize,
        /// Total buffer length.
        len: usize,
    },

    /// A reader ran out of bytes mid-value.
    #[error("read of {wanted} bytes at cursor {cursor} exceeds buffer of {len} bytes")]
    UnexpectedEnd {
        /// Cursor position at the time of the read.
        cursor: usize,
        /// Bytes the read required.
        wanted: usize,
        /// Total buffer length.
        len: usize,
    },

    /// `ByteWriter::end` called before the buffer was full.
    #[error("writer finished at cursor {cursor} but the buffer holds {len} bytes")]
    IncompleteWrite {
        /// Cursor position at finish.
        cursor: usize,
        /// Total buffer length.
        len: usize,
    },

    /// IOError bubbled up from a `Write` passed to a `ByteFormat::write_to` implementation.
    #[error(transparent)]
    IOError(#[from] IOError),

    /// `deserialize_hex` encountered an error on its input.
    #[error(transparent)]
    FromHexError(#[from] hex::FromHexError),

    /// An error by a component call in data structure (de)serialization.
    #[error("error in component (de)serialization: {0}")]
    ComponentError(String),
}

/// Type alias for serialization errors.
pub type SerResult<T> = Result<T, SerError>;

/// Calculates the minimum prefix length for a CompactSize encoding `number`.
pub fn var_int_size(number: u64) -> usize {
    match number {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Matches the length of the CompactSize to the 1-byte flag.
pub fn var_int_first_byte(length: usize) -> Option<u8> {
    match length {
        3 => Some(0xfd),
        5 => Some(0xfe),
        9 => Some(0xff),
        _ => None,
    }
}

/// Matches the CompactSize prefix flag to the serialized length.
pub fn var_int_size_from_first_byte(first: u8) -> usize {
    match first {
        0..=0xfc => 1,
        0xfd => 3,
        0xfe => 5,
        0xff => 9,
    }
}

/// Convenience function for writing a Bitcoin-style CompactSize.
pub fn write_compact_int<W>(writer: &mut W, number: u64) -> SerResult<usize>
where
    W: Write,
{
    let prefix_len = var_int_size(number);
    match var_int_first_byte(prefix_len) {
        None => {
            writer.write_all(&[number as u8])?;
            Ok(1)
        }
        Some(prefix) => {
            writer.write_all(&[prefix])?;
            let body = number.to_le_bytes();
            writer.write_all(&body[..prefix_len - 1])?;
            Ok(prefix_len)
        }
    }
}

/// Convenience function for reading a Bitcoin-style CompactSize. Rejects
/// non-minimal encodings.
pub fn read_compact_int<R>(reader: &mut R) -> SerResult<u64>
where
    R: Read,
{
    let mut prefix = [0u8; 1];
    reader.read_exact(&mut prefix)?;
    let prefix_len = var_int_size_from_first_byte(prefix[0]);

    let number = if prefix_len > 1 {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf[..prefix_len - 1])?;
        u64::from_le_bytes(buf)
    } else {
        prefix[0] as u64
    };

    if var_int_size(number) < prefix_len {
        Err(SerError::NonMinimalVarInt)
    } else {
        Ok(number)
    }
}

/// Write a CompactSize-prefixed byte slice.
pub fn write_var_slice<W>(writer: &mut W, slice: &[u8]) -> SerResult<usize>
where
    W: Write,
{
    let written = write_compact_int(writer, slice.len() as u64)?;
    writer.write_all(slice)?;
    Ok(written + slice.len())
}

/// Read a CompactSize-prefixed byte slice.
pub fn read_var_slice<R>(reader: &mut R) -> SerResult<Vec<u8>>
where
    R: Read,
{
    let length = read_compact_int(reader)? as usize;
    let mut buf = vec![0u8; length];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// A sequential writer over a fixed-size byte buffer. Every write is bounds
/// checked against the buffer; [`ByteWriter::end`] succeeds only when the
/// cursor has reached the buffer's full length.
#[derive(Debug, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
    cursor: usize,
}

impl ByteWriter {
    /// Allocate a zeroed buffer of `length` bytes with the cursor at 0.
    pub fn new(length: usize) -> Self {
        Self {
            buf: vec![0u8; length],
            cursor: 0,
        }
    }

    /// The current cursor position.
    pub fn position(&self) -> usize {
        self.cursor
    }

    fn checked(&mut self, wanted: usize) -> SerResult<usize> {
        if self.cursor + wanted > self.buf.len() {
            return Err(SerError::OutOfBounds {
                cursor: self.cursor,
                wanted,
                len: self.buf.len(),
            });
        }
        let start = self.cursor;
        self.cursor += wanted;
        Ok(start)
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, v: u8) -> SerResult<()> {
        let at = self.checked(1)?;
        self.buf[at] = v;
        Ok(())
    }

    /// Write a little-endian i32.
    pub fn write_i32_le(&mut self, v: i32) -> SerResult<()> {
        let at = self.checked(4)?;
        self.buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
        Ok(())
    }

    /// Write a little-endian u32.
    pub fn write_u32_le(&mut self, v: u32) -> SerResult<()> {
        let at = self.checked(4)?;
        self.buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
        Ok(())
    }

    /// Write a little-endian u64.
    pub fn write_u64_le(&mut self, v: u64) -> SerResult<()> {
        let at = self.checked(8)?;
        self.buf[at..at + 8].copy_from_slice(&v.to_le_bytes());
        Ok(())
    }

    /// Write a CompactSize.
    pub fn write_var_int(&mut self, v: u64) -> SerResult<()> {
        let size = var_int_size(v);
        let at = self.checked(size)?;
        let mut cursor = Cursor::new(&mut self.buf[at..at + size]);
        write_compact_int(&mut cursor, v)?;
        Ok(())
    }

    /// Write a raw slice.
    pub fn write_slice(&mut self, slice: &[u8]) -> SerResult<()> {
        let at = self.checked(slice.len())?;
        self.buf[at..at + slice.len()].copy_from_slice(slice);
        Ok(())
    }

    /// Write a CompactSize-prefixed slice.
    pub fn write_var_slice(&mut self, slice: &[u8]) -> SerResult<()> {
        self.write_var_int(slice.len() as u64)?;
        self.write_slice(slice)
    }

    /// Write a CompactSize-prefixed sequence of var-slices.
    pub fn write_vector(&mut self, items: &[Vec<u8>]) -> SerResult<()> {
        self.write_var_int(items.len() as u64)?;
        for item in items {
            self.write_var_slice(item)?;
        }
        Ok(())
    }

    /// Consume the writer, returning the buffer. Fails unless the cursor is
    /// exactly at the end of the buffer.
    pub fn end(self) -> SerResult<Vec<u8>> {
        if self.cursor != self.buf.len() {
            return Err(SerError::IncompleteWrite {
                cursor: self.cursor,
                len: self.buf.len(),
            });
        }
        Ok(self.buf)
    }
}

/// A sequential reader over a borrowed byte slice. Every read is bounds
/// checked.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> ByteReader<'a> {
    /// Wrap a slice with the cursor at 0.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: 0 }
    }

    /// The current cursor position.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Bytes left past the cursor.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.cursor
    }

    /// True when the cursor has consumed the whole buffer.
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    fn checked(&mut self, wanted: usize) -> SerResult<usize> {
        if self.cursor + wanted > self.buf.len() {
            return Err(SerError::UnexpectedEnd {
                cursor: self.cursor,
                wanted,
                len: self.buf.len(),
            });
        }
        let start = self.cursor;
        self.cursor += wanted;
        Ok(start)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> SerResult<u8> {
        let at = self.checked(1)?;
        Ok(self.buf[at])
    }

    /// Read a little-endian i32.
    pub fn read_i32_le(&mut self) -> SerResult<i32> {
        let at = self.checked(4)?;
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.buf[at..at + 4]);
        Ok(i32::from_le_bytes(b))
    }

    /// Read a little-endian u32.
    pub fn read_u32_le(&mut self) -> SerResult<u32> {
        let at = self.checked(4)?;
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.buf[at..at + 4]);
        Ok(u32::from_le_bytes(b))
    }

    /// Read a little-endian u64.
    pub fn read_u64_le(&mut self) -> SerResult<u64> {
        let at = self.checked(8)?;
        let mut b = [0u8; 8];
        b.copy_from_slice(&self.buf[at..at + 8]);
        Ok(u64::from_le_bytes(b))
    }

    /// Read a CompactSize. Rejects non-minimal encodings.
    pub fn read_var_int(&mut self) -> SerResult<u64> {
        let buf = self.buf;
        let mut slice = &buf[self.cursor..];
        let before = slice.len();
        let number = read_compact_int(&mut slice).map_err(|e| match e {
            SerError::IOError(_) => SerError::UnexpectedEnd {
                cursor: self.cursor,
                wanted: 1,
                len: self.buf.len(),
            },
            other => other,
        })?;
        self.cursor += before - slice.len();
        Ok(number)
    }

    /// Read `wanted` raw bytes.
    pub fn read_slice(&mut self, wanted: usize) -> SerResult<&'a [u8]> {
        let at = self.checked(wanted)?;
        let buf = self.buf;
        Ok(&buf[at..at + wanted])
    }

    /// Read a CompactSize-prefixed slice.
    pub fn read_var_slice(&mut self) -> SerResult<&'a [u8]> {
        let length = self.read_var_int()? as usize;
        self.read_slice(length)
    }

    /// Read a CompactSize-prefixed sequence of var-slices.
    pub fn read_vector(&mut self) -> SerResult<Vec<Vec<u8>>> {
        let count = self.read_var_int()? as usize;
        let mut items = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            items.push(self.read_var_slice()?.to_vec());
        }
        Ok(items)
    }
}

/// A simple trait for deserializing from `std::io::Read` and serializing to
/// `std::io::Write`, used by the transaction wire types.
pub trait ByteFormat {
    /// An associated error type.
    type Error: From<SerError> + From<IOError> + std::error::Error;

    /// Returns the byte-length of the serialized data structure.
    fn serialized_length(&self) -> usize;

    /// Deserializes an instance of `Self` from a `std::io::Read`.
    fn read_from<R>(reader: &mut R) -> Result<Self, Self::Error>
    where
        R: Read,
        Self: Sized;

    /// Serializes `Self` to a `std::io::Write`. Returns the number of bytes
    /// written.
    fn write_to<W>(&self, writer: &mut W) -> Result<usize, Self::Error>
    where
        W: Write;

    /// Convenience function for reading a Bitcoin-style CompactSize.
    fn read_compact_int<R>(reader: &mut R) -> Result<u64, Self::Error>
    where
        R: Read,
    {
        read_compact_int(reader).map_err(Into::into)
    }

    /// Convenience function for writing a Bitcoin-style CompactSize.
    fn write_compact_int<W>(writer: &mut W, number: u64) -> Result<usize, Self::Error>
    where
        W: Write,
    {
        write_compact_int(writer, number).map_err(Into::into)
    }

    /// Convenience function for reading a CompactSize-prefixed vector of `I`.
    fn read_prefix_vec<R, I>(reader: &mut R) -> Result<Vec<I>, Self::Error>
    where
        R: Read,
        I: ByteFormat,
        I::Error: Into<Self::Error>,
    {
        let items = Self::read_compact_int(reader)?;
        let mut ret = vec![];
        for _ in 0..items {
            ret.push(I::read_from(reader).map_err(Into::into)?);
        }
        Ok(ret)
    }

    /// Convenience function to write a CompactSize-prefixed vector of `I`.
    fn write_prefix_vec<W, I>(writer: &mut W, vector: &[I]) -> Result<usize, Self::Error>
    where
        W: Write,
        I: ByteFormat,
        I::Error: Into<Self::Error>,
    {
        let mut written = Self::write_compact_int(writer, vector.len() as u64)?;
        for i in vector.iter() {
            written += i.write_to(writer).map_err(Into::into)?;
        }
        Ok(written)
    }

    /// Decodes a hex string to a `Vec<u8>`, deserializes an instance of `Self`
    /// from that vector.
    fn deserialize_hex(s: &str) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let v: Vec<u8> = hex::decode(s).map_err(SerError::from)?;
        let mut cursor = Cursor::new(v);
        Self::read_from(&mut cursor)
    }

    /// Serializes `self` to a vector, returns the hex-encoded vector.
    fn serialize_hex(&self) -> Result<String, Self::Error> {
        let mut v: Vec<u8> = vec![];
        self.write_to(&mut v)?;
        Ok(hex::encode(v))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_matches_byte_len_and_prefix() {
        let cases = [
            (1u64, 1usize, None),
            (0xfc, 1, None),
            (0xfd, 3, Some(0xfd)),
            (0xffff, 3, Some(0xfd)),
            (0x1_0000, 5, Some(0xfe)),
            (0xffff_ffff, 5, Some(0xfe)),
            (0x1_0000_0000, 9, Some(0xff)),
            (0xffff_ffff_ffff_ffff, 9, Some(0xff)),
        ];
        for case in cases.iter() {
            assert_eq!(var_int_size(case.0), case.1);
            assert_eq!(var_int_first_byte(case.1), case.2);
        }
    }

    #[test]
    fn it_round_trips_compact_ints() {
        for number in [0u64, 1, 0xfc, 0xfd, 0xffff, 0x1_0000, 0xffff_ffff, u64::MAX] {
            let mut buf = vec![];
            let written = write_compact_int(&mut buf, number).unwrap();
            assert_eq!(written, var_int_size(number));
            assert_eq!(read_compact_int(&mut buf.as_slice()).unwrap(), number);
        }
    }

    #[test]
    fn it_rejects_non_minimal_compact_ints() {
        // 0xfc encoded with a 3-byte prefix
        let buf = [0xfdu8, 0xfc, 0x00];
        match read_compact_int(&mut buf.as_ref()) {
            Err(SerError::NonMinimalVarInt) => {}
            other => panic!("expected NonMinimalVarInt, got {:?}", other),
        }
    }

    #[test]
    fn writer_enforces_bounds_and_completion() {
        let mut w = ByteWriter::new(5);
        w.write_u32_le(0xdead_beef).unwrap();
        match w.write_u32_le(1) {
            Err(SerError::OutOfBounds { cursor: 4, wanted: 4, len: 5 }) => {}
            other => panic!("expected OutOfBounds, got {:?}", other),
        }
        match w.clone().end() {
            Err(SerError::IncompleteWrite { cursor: 4, len: 5 }) => {}
            other => panic!("expected IncompleteWrite, got {:?}", other),
        }
        w.write_u8(0xaa).unwrap();
        assert_eq!(w.end().unwrap(), vec![0xef, 0xbe, 0xad, 0xde, 0xaa]);
    }

    #[test]
    fn reader_round_trips_writer_output() {
        let mut w = ByteWriter::new(4 + 8 + 1 + 3 + 1 + 2);
        w.write_u32_le(7).unwrap();
        w.write_u64_le(0x0102_0304_0506_0708).unwrap();
        w.write_var_slice(&[0xaa, 0xbb, 0xcc]).unwrap();
        w.write_var_int(2).unwrap();
        w.write_slice(&[0x01, 0x02]).unwrap();
        let buf = w.end().unwrap();

        let mut r = ByteReader::new(&buf);
        assert_eq!(r.read_u32_le().unwrap(), 7);
        assert_eq!(r.read_u64_le().unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(r.read_var_slice().unwrap(), &[0xaa, 0xbb, 0xcc]);
        assert_eq!(r.read_var_int().unwrap(), 2);
        assert_eq!(r.read_slice(2).unwrap(), &[0x01, 0x02]);
        assert!(r.is_exhausted());
        match r.read_u8() {
            Err(SerError::UnexpectedEnd { .. }) => {}
            other => panic!("expected UnexpectedEnd, got {:?}", other),
        }
    }

    #[test]
    fn it_reads_and_writes_vectors() {
        let items = vec![vec![0x01u8, 0x02], vec![], vec![0xff; 80]];
        let length = 1 + items.iter().map(|i| var_int_size(i.len() as u64) + i.len()).sum::<usize>();
        let mut w = ByteWriter::new(length);
        w.write_vector(&items).unwrap();
        let buf = w.end().unwrap();

        let mut r = ByteReader::new(&buf);
        assert_eq!(r.read_vector().unwrap(), items);
        assert!(r.is_exhausted());
    }
}
