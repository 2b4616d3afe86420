use crate::bits::Bit;
use crate::error::Result;
use std::io::Write;

/// Bit-level writer over a byte stream.
///
/// The inverse of [`BitReader`](crate::bits::BitReader): bits accumulate
/// MSB-first into a one-byte buffer that is pushed to the underlying
/// stream as it fills. Callers must invoke [`flush`](BitWriter::flush)
/// after the last bit, or a trailing partial byte is lost.
pub struct BitWriter<W: Write> {
    writer: W,
    /// Byte currently being filled.
    buffer: u8,
    /// Position of the next free bit (7 down to 0).
    pos: u8,
}

impl<W: Write> BitWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, buffer: 0, pos: 7 }
    }

    /// Write a single bit.
    pub fn put_bit(&mut self, bit: Bit) -> Result<()> {
        self.buffer |= bit.as_u8() << self.pos;
        if self.pos == 0 {
            self.writer.write_all(&[self.buffer])?;
            self.buffer = 0;
            self.pos = 7;
        } else {
            self.pos -= 1;
        }
        Ok(())
    }

    /// Write the low `n` bits (1-64) of `val`, MSB-first.
    pub fn put_bits(&mut self, val: u64, n: u8) -> Result<()> {
        debug_assert!((1..=64).contains(&n), "bit count must be in 1..=64");

        for i in (0..n).rev() {
            self.put_bit(Bit::from(((val >> i) & 1) as u8))?;
        }
        Ok(())
    }

    /// Write a sequence of bits.
    pub fn write_bit_slice(&mut self, bits: &[Bit]) -> Result<()> {
        for &bit in bits {
            self.put_bit(bit)?;
        }
        Ok(())
    }

    /// Write a sequence of bytes bit-by-bit, MSB-first. The bytes need not
    /// land aligned in the output.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.put_bits(byte as u64, 8)?;
        }
        Ok(())
    }

    /// Push the pending partial byte (trailing bits zero) if there is one,
    /// then flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        if self.pos != 7 {
            self.writer.write_all(&[self.buffer])?;
            self.buffer = 0;
            self.pos = 7;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Get the inner writer (consumes self). Pending bits are discarded;
    /// call [`flush`](BitWriter::flush) first to keep them.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
