//! Forward-only reader over a borrowed byte buffer
//!
//! Every format in this crate is parsed through a [`ByteCursor`]. Reads are
//! bounds-checked and all-or-nothing: a read that would run past the end of
//! the buffer fails with [`Error::UnexpectedEof`] and leaves the position
//! untouched.

use std::io::Cursor;

use binrw::{BinRead, Endian};

use crate::error::{Error, Result};
use crate::synchsafe;

/// Bounds-checked reader that tracks its position in `buffer`
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Start reading at `position` instead of the beginning
    pub fn at(buffer: &'a [u8], position: usize) -> Self {
        Self { buffer, position }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Everything from the current position to the end, without advancing
    pub fn rest(&self) -> &'a [u8] {
        &self.buffer[self.position.min(self.buffer.len())..]
    }

    pub fn read_fixed(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(n)
            .filter(|end| *end <= self.buffer.len())
            .ok_or_else(|| Error::eof(n, self.remaining(), self.position))?;
        let slice = &self.buffer[self.position..end];
        self.position = end;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_fixed(N)?);
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_fixed(n).map(|_| ())
    }

    pub fn peek_u8(&self) -> Result<u8> {
        self.buffer
            .get(self.position)
            .copied()
            .ok_or_else(|| Error::eof(1, 0, self.position))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let [b] = self.read_array::<1>()?;
        Ok(b)
    }

    pub fn read_u16be(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32be(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_f32be(&mut self) -> Result<f32> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    /// Four bytes carrying a synch-safe (7 bits per byte) integer
    pub fn read_u32_synchsafe(&mut self) -> Result<u32> {
        Ok(synchsafe::decode(self.read_u32be()?))
    }

    pub fn read_ascii(&mut self, n: usize) -> Result<String> {
        let start = self.position;
        let bytes = self.read_fixed(n)?;
        ascii_string(bytes).inspect_err(|_| self.position = start)
    }

    /// Bytes up to (not including) the next `0x00`; the NUL itself is consumed
    pub fn read_nul_terminated(&mut self) -> Result<&'a [u8]> {
        let rest = self.rest();
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::eof(rest.len() + 1, rest.len(), self.position))?;
        let bytes = &rest[..len];
        self.position += len + 1;
        Ok(bytes)
    }

    pub fn read_nul_terminated_ascii(&mut self) -> Result<String> {
        let start = self.position;
        let bytes = self.read_nul_terminated()?;
        ascii_string(bytes).inspect_err(|_| self.position = start)
    }

    /// `n` bytes of UTF-16BE text with no terminator
    pub fn read_utf16be(&mut self, n: usize) -> Result<String> {
        let start = self.position;
        let bytes = self.read_fixed(n)?;
        decode_utf16be(bytes).inspect_err(|_| self.position = start)
    }

    /// Read a fixed-layout big-endian record, advancing past the bytes it consumed
    pub fn read_record<T>(&mut self) -> Result<T>
    where
        T: for<'b> BinRead<Args<'b> = ()>,
    {
        let mut reader = Cursor::new(self.rest());
        let value = T::read_options(&mut reader, Endian::Big, ()).map_err(|e| {
            if e.is_eof() {
                Error::eof(std::mem::size_of::<T>(), self.remaining(), self.position)
            } else {
                Error::from(e)
            }
        })?;
        self.position += reader.position() as usize;
        Ok(value)
    }
}

fn ascii_string(bytes: &[u8]) -> Result<String> {
    if !bytes.is_ascii() {
        return Err(Error::InvalidText(format!(
            "expected ASCII, found {}",
            String::from_utf8_lossy(bytes)
        )));
    }
    // ASCII is always valid UTF-8
    Ok(bytes.iter().map(|&b| b as char).collect())
}

/// Decode a UTF-16BE byte string
pub fn decode_utf16be(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Error::InvalidText(format!(
            "odd UTF-16 length {}",
            bytes.len()
        )));
    }
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| Error::InvalidText(e.to_string()))
}

/// Encode a string as UTF-16BE with no terminator
pub fn encode_utf16be(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_be_bytes).collect()
}
