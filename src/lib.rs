//! Four classical lossless compressors behind one self-describing
//! container format: Huffman coding, LZ77 (sliding window), LZ78 (grown
//! dictionary) and LZW (seeded dictionary), all emitting through a shared
//! MSB-first bit-stream layer.
//!
//! A compressed artifact starts with a two-byte magic number naming its
//! engine, followed by an engine-specific header carrying the parameters
//! needed to reconstruct the original bytes exactly.

pub mod bits;
pub mod chunk;
pub mod error;
pub mod format;
pub mod huffman;
pub mod lz77;
pub mod lz78;
pub mod lzw;

pub use bits::{Bit, BitReader, BitWriter};
pub use chunk::ByteChunk;
pub use error::{Error, Result};
pub use format::{compress, compress_stream, decompress, Algorithm};
pub use huffman::Huffman;
pub use lz77::Lz77;
pub use lz78::Lz78;
pub use lzw::Lzw;

use std::io::Read;

/// Read into `buf` until it is full or the stream ends; returns the byte
/// count. Short reads and interrupts are retried, so anything below
/// `buf.len()` means end of input.
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
