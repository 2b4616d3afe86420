//! LZ77 sliding-window compression.
//!
//! The window is a circular buffer holding the search buffer (already
//! encoded bytes, match sources) directly followed by the lookahead
//! (bytes still to encode). Input is framed in lookahead-sized blocks so
//! a single pass suffices: each block starts with a completeness bit, and
//! the last block carries its actual byte count.

use crate::bits::{Bit, BitReader, BitWriter};
use crate::error::{Error, Result};
use crate::read_full;
use log::{debug, trace};
use std::io::{Read, Write};

const VERSION: u8 = 1;

/// Circular analysis window shared by the encoder and decoder.
///
/// Both sides replay identical bookkeeping per token, which is what keeps
/// decoder copies meaningful: a position relative to `search_start` on the
/// encoder side lands on the same bytes on the decoder side.
struct SlidingWindow {
    buf: Vec<u8>,
    search_size: usize,
    /// Current length of the search buffer (grows until `search_size`).
    search_len: usize,
    /// First byte of the search buffer.
    search_start: usize,
    /// First byte of the lookahead, one past the search buffer.
    lahead_start: usize,
}

impl SlidingWindow {
    fn new(search_size: usize, lahead_size: usize) -> Self {
        Self {
            buf: vec![0u8; search_size + lahead_size],
            search_size,
            search_len: 0,
            search_start: 0,
            lahead_start: 0,
        }
    }

    #[inline]
    fn wrap(&self, pos: usize) -> usize {
        pos % self.buf.len()
    }

    /// Store one decoded/ingested byte at the lookahead head and move the
    /// head forward. The search buffer is not adjusted; call
    /// [`slide`](SlidingWindow::slide) once per token.
    #[inline]
    fn push(&mut self, byte: u8) {
        let pos = self.lahead_start;
        self.buf[pos] = byte;
        self.lahead_start = self.wrap(pos + 1);
    }

    /// Account `n` consumed bytes to the search buffer and drag
    /// `search_start` along once the buffer is at capacity.
    fn slide(&mut self, n: usize) {
        self.search_len = (self.search_len + n).min(self.search_size);
        self.search_start =
            self.wrap(self.lahead_start + self.buf.len() - self.search_len);
    }

    /// Absolute buffer position for an offset relative to `search_start`.
    #[inline]
    fn absolute(&self, offset: usize) -> usize {
        self.wrap(self.search_start + offset)
    }

    /// Longest prefix of the lookahead (of length `lookahead_len`) that
    /// starts somewhere in the search buffer. Matches may run past the end
    /// of the search buffer into the lookahead itself; that is the
    /// overlapping-copy case and the decoder resolves it byte by byte.
    /// Ties break toward the earliest offset. Returns (length, offset).
    fn longest_match(&self, lookahead_len: usize) -> (usize, usize) {
        let mut best_len = 0;
        let mut best_offset = 0;

        for offset in 0..self.search_len {
            let start = self.absolute(offset);
            let mut len = 0;
            while len < lookahead_len
                && self.buf[self.wrap(start + len)] == self.buf[self.wrap(self.lahead_start + len)]
            {
                len += 1;
            }
            if len > best_len {
                best_len = len;
                best_offset = offset;
            }
        }
        (best_len, best_offset)
    }
}

/// The LZ77 engine.
///
/// Wire format: `version(8) | search_bits(5) | lahead_bits(5) | block+`.
/// Each block is `last?(1) [count(lahead_bits) if last]` followed by
/// tokens: `0 literal(8)` or `1 length(lahead_bits) offset(search_bits)
/// literal(8)`, the literal being the first byte after the match.
pub struct Lz77 {
    search_bits: u8,
    lahead_bits: u8,
}

impl Default for Lz77 {
    fn default() -> Self {
        Self::new(9, 5)
    }
}

impl Lz77 {
    /// Panics unless `1 <= lahead_bits < search_bits <= 29`.
    pub fn new(search_bits: u8, lahead_bits: u8) -> Self {
        assert!((1..=29).contains(&search_bits), "search_bits out of range");
        assert!(
            lahead_bits >= 1 && lahead_bits < search_bits,
            "lahead_bits must be in 1..search_bits"
        );
        Self { search_bits, lahead_bits }
    }

    /// Compress `input` into `output` in a single pass.
    pub fn compress<R: Read, W: Write>(&self, mut input: R, output: W) -> Result<()> {
        let search_size = 1usize << self.search_bits;
        let lahead_size = 1usize << self.lahead_bits;
        let mut window = SlidingWindow::new(search_size, lahead_size);

        let mut out = BitWriter::new(output);
        out.put_bits(VERSION as u64, 8)?;
        out.put_bits(self.search_bits as u64, 5)?;
        out.put_bits(self.lahead_bits as u64, 5)?;

        let mut block = vec![0u8; lahead_size];
        loop {
            let n = read_full(&mut input, &mut block)?;
            debug!("lz77: block of {} bytes", n);

            if n == lahead_size {
                out.put_bit(Bit::Zero)?;
            } else {
                out.put_bit(Bit::One)?;
                out.put_bits(n as u64, self.lahead_bits)?;
            }

            // Stage the block in the lookahead region.
            let block_start = window.lahead_start;
            for (i, &byte) in block[..n].iter().enumerate() {
                let pos = window.wrap(block_start + i);
                window.buf[pos] = byte;
            }

            let mut remaining = n;
            while remaining > 0 {
                let (mut len, offset) = window.longest_match(remaining);
                // The trailing literal must stay inside the block.
                if len + 1 > remaining {
                    len = remaining - 1;
                }
                let literal = window.buf[window.wrap(window.lahead_start + len)];

                if len == 0 {
                    out.put_bit(Bit::Zero)?;
                    out.put_bits(literal as u64, 8)?;
                    trace!("lz77: literal {:#04x}", literal);
                } else {
                    out.put_bit(Bit::One)?;
                    out.put_bits(len as u64, self.lahead_bits)?;
                    out.put_bits(offset as u64, self.search_bits)?;
                    out.put_bits(literal as u64, 8)?;
                    trace!("lz77: match len={} offset={} literal={:#04x}", len, offset, literal);
                }

                window.lahead_start = window.wrap(window.lahead_start + len + 1);
                window.slide(len + 1);
                remaining -= len + 1;
            }

            if n < lahead_size {
                break;
            }
        }

        out.flush()
    }

    /// Decompress `input` into `output`, taking the parameters from the
    /// stream header.
    pub fn decompress<R: Read, W: Write>(input: R, mut output: W) -> Result<()> {
        let mut input = BitReader::new(input);

        let version = input.read_bits(8)? as u8;
        if version != VERSION {
            return Err(Error::VersionMismatch { expected: VERSION, found: version });
        }
        let search_bits = input.read_bits(5)? as u8;
        let lahead_bits = input.read_bits(5)? as u8;
        if !(1..=29).contains(&search_bits) || lahead_bits < 1 || lahead_bits >= search_bits {
            return Err(Error::InvalidHeader("window sizes out of range"));
        }

        let search_size = 1usize << search_bits;
        let lahead_size = 1usize << lahead_bits;
        let mut window = SlidingWindow::new(search_size, lahead_size);

        const FLUSH_AT: usize = 8192;
        let mut pending: Vec<u8> = Vec::with_capacity(FLUSH_AT);

        loop {
            let last = input.read_bit()?.is_set();
            let block_bytes =
                if last { input.read_bits(lahead_bits)? as usize } else { lahead_size };
            debug!("lz77: decoding block of {} bytes (last: {})", block_bytes, last);

            let mut remaining = block_bytes;
            while remaining > 0 {
                if input.read_bit()?.is_set() {
                    let len = input.read_bits(lahead_bits)? as usize;
                    let offset = input.read_bits(search_bits)? as usize;
                    let literal = input.read_bits(8)? as u8;
                    if len + 1 > remaining {
                        return Err(Error::InvalidCopyLength { length: len + 1, remaining });
                    }

                    // Byte-at-a-time so overlapping runs self-extend.
                    let start = window.absolute(offset);
                    for i in 0..len {
                        let byte = window.buf[window.wrap(start + i)];
                        window.push(byte);
                        pending.push(byte);
                    }
                    window.push(literal);
                    pending.push(literal);
                    window.slide(len + 1);
                    remaining -= len + 1;
                } else {
                    let literal = input.read_bits(8)? as u8;
                    window.push(literal);
                    pending.push(literal);
                    window.slide(1);
                    remaining -= 1;
                }

                if pending.len() >= FLUSH_AT {
                    output.write_all(&pending)?;
                    pending.clear();
                }
            }

            if last {
                break;
            }
        }

        output.write_all(&pending)?;
        output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_with(engine: &Lz77, data: &[u8]) -> Vec<u8> {
        let mut compressed = Vec::new();
        engine.compress(data, &mut compressed).unwrap();
        let mut restored = Vec::new();
        Lz77::decompress(compressed.as_slice(), &mut restored).unwrap();
        restored
    }

    fn roundtrip(data: &[u8]) -> Vec<u8> {
        roundtrip_with(&Lz77::default(), data)
    }

    #[test]
    fn test_roundtrip_empty() {
        assert_eq!(roundtrip(b""), b"");
    }

    #[test]
    fn test_roundtrip_single_byte() {
        assert_eq!(roundtrip(b"x"), b"x");
    }

    #[test]
    fn test_roundtrip_repeated_byte() {
        // Exercises the overlapping-copy path: matches longer than their
        // distance.
        assert_eq!(roundtrip(b"AAAAAAAA"), b"AAAAAAAA");
        let long = vec![b'A'; 10_000];
        assert_eq!(roundtrip(&long), long);
    }

    #[test]
    fn test_roundtrip_text() {
        let data = b"how much wood would a woodchuck chuck if a woodchuck could chuck wood";
        assert_eq!(roundtrip(data), data);
    }

    #[test]
    fn test_roundtrip_exact_block_multiple() {
        // Default lookahead is 32 bytes; 64 is exactly two blocks, which
        // forces the empty terminal block.
        let data: Vec<u8> = (0..64u8).collect();
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn test_roundtrip_small_window() {
        let engine = Lz77::new(4, 2);
        let data = b"abcabcabcabcabcabcabc";
        assert_eq!(roundtrip_with(&engine, data), data);
    }

    #[test]
    fn test_roundtrip_wide_window() {
        let engine = Lz77::new(12, 7);
        let data: Vec<u8> = b"the rain in spain stays mainly in the plain "
            .iter()
            .cycle()
            .take(5000)
            .copied()
            .collect();
        assert_eq!(roundtrip_with(&engine, &data), data);
    }

    #[test]
    fn test_repetitive_input_compresses() {
        let data = vec![b'z'; 4096];
        let mut compressed = Vec::new();
        Lz77::default().compress(data.as_slice(), &mut compressed).unwrap();
        assert!(compressed.len() < data.len() / 2);
    }

    #[test]
    fn test_wrong_version_rejected() {
        let mut compressed = Vec::new();
        Lz77::default().compress(b"abc".as_slice(), &mut compressed).unwrap();
        compressed[0] = 9;
        let mut restored = Vec::new();
        assert!(matches!(
            Lz77::decompress(compressed.as_slice(), &mut restored),
            Err(Error::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_stream_rejected() {
        let data = vec![b'q'; 300];
        let mut compressed = Vec::new();
        Lz77::default().compress(data.as_slice(), &mut compressed).unwrap();
        compressed.truncate(compressed.len() / 2);
        let mut restored = Vec::new();
        assert!(Lz77::decompress(compressed.as_slice(), &mut restored).is_err());
    }

    #[test]
    #[should_panic(expected = "lahead_bits")]
    fn test_invalid_parameters_panic() {
        Lz77::new(5, 5);
    }

    #[test]
    fn test_window_longest_match_prefers_earliest() {
        let mut window = SlidingWindow::new(16, 8);
        // Search buffer: "abab"
        for &b in b"abab" {
            window.push(b);
        }
        window.slide(4);
        // Stage the lookahead "ab" without consuming it.
        let base = window.lahead_start;
        window.buf[base] = b'a';
        window.buf[base + 1] = b'b';

        // Offsets 0 and 2 both match; the earlier one wins.
        let (len, offset) = window.longest_match(2);
        assert_eq!(len, 2);
        assert_eq!(offset, 0);
    }
}
