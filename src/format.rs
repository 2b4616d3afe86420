//! The container format: a two-byte magic number in network byte order
//! followed by an algorithm-specific payload. Compression prepends the
//! magic for the chosen engine; decompression reads it back and picks the
//! engine, so compressed artifacts are self-describing.

use crate::error::{Error, Result};
use crate::huffman::Huffman;
use crate::lz77::Lz77;
use crate::lz78::Lz78;
use crate::lzw::Lzw;
use log::debug;
use std::fmt;
use std::io::{Read, Seek, Write};

/// The compression engines this container can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    Huffman,
    Lz77,
    Lz78,
    Lzw,
}

impl Algorithm {
    /// The engine's magic number.
    pub fn magic(self) -> u16 {
        match self {
            Algorithm::Huffman => 0x27AB,
            Algorithm::Lz77 => 0xA5E8,
            Algorithm::Lz78 => 0x7869,
            Algorithm::Lzw => 0x8E83,
        }
    }

    /// Engine for a magic number, if it is one of ours.
    pub fn from_magic(magic: u16) -> Option<Self> {
        match magic {
            0x27AB => Some(Algorithm::Huffman),
            0xA5E8 => Some(Algorithm::Lz77),
            0x7869 => Some(Algorithm::Lz78),
            0x8E83 => Some(Algorithm::Lzw),
            _ => None,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Algorithm::Huffman => "huf",
            Algorithm::Lz77 => "lz77",
            Algorithm::Lz78 => "lz78",
            Algorithm::Lzw => "lzw",
        })
    }
}

fn write_magic<W: Write>(output: &mut W, magic: u16) -> Result<()> {
    output.write_all(&magic.to_be_bytes())?;
    Ok(())
}

fn read_magic<R: Read>(input: &mut R) -> Result<u16> {
    let mut bytes = [0u8; 2];
    match input.read_exact(&mut bytes) {
        Ok(()) => Ok(u16::from_be_bytes(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::UnexpectedEof),
        Err(e) => Err(Error::Io(e)),
    }
}

/// Compress `input` into `output` with the chosen engine (default
/// parameters), prefixed by its magic number. `Seek` is needed for the
/// Huffman two-pass; use [`compress_stream`] for pipes.
pub fn compress<R: Read + Seek, W: Write>(
    algorithm: Algorithm,
    input: R,
    mut output: W,
) -> Result<()> {
    debug!("compressing with {}", algorithm);
    write_magic(&mut output, algorithm.magic())?;
    match algorithm {
        Algorithm::Huffman => Huffman::compress(input, output),
        Algorithm::Lz77 => Lz77::default().compress(input, output),
        Algorithm::Lz78 => Lz78::default().compress(input, output),
        Algorithm::Lzw => Lzw::default().compress(input, output),
    }
}

/// Like [`compress`], for inputs that cannot seek. Huffman is refused
/// because it has to read the data twice.
pub fn compress_stream<R: Read, W: Write>(
    algorithm: Algorithm,
    input: R,
    mut output: W,
) -> Result<()> {
    debug!("compressing stream with {}", algorithm);
    match algorithm {
        Algorithm::Huffman => Err(Error::UnseekableInput),
        Algorithm::Lz77 => {
            write_magic(&mut output, algorithm.magic())?;
            Lz77::default().compress(input, output)
        }
        Algorithm::Lz78 => {
            write_magic(&mut output, algorithm.magic())?;
            Lz78::default().compress(input, output)
        }
        Algorithm::Lzw => {
            write_magic(&mut output, algorithm.magic())?;
            Lzw::default().compress(input, output)
        }
    }
}

/// Decompress `input` into `output`, selecting the engine from the magic
/// number at the head of the stream.
pub fn decompress<R: Read, W: Write>(mut input: R, output: W) -> Result<()> {
    let magic = read_magic(&mut input)?;
    let algorithm = Algorithm::from_magic(magic).ok_or(Error::BadMagic(magic))?;
    debug!("magic 0x{:04x}: decompressing with {}", magic, algorithm);
    match algorithm {
        Algorithm::Huffman => Huffman::decompress(input, output),
        Algorithm::Lz77 => Lz77::decompress(input, output),
        Algorithm::Lz78 => Lz78::decompress(input, output),
        Algorithm::Lzw => Lzw::decompress(input, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ALL: [Algorithm; 4] =
        [Algorithm::Huffman, Algorithm::Lz77, Algorithm::Lz78, Algorithm::Lzw];

    #[test]
    fn test_magic_numbers() {
        assert_eq!(Algorithm::Huffman.magic(), 0x27AB);
        assert_eq!(Algorithm::Lz77.magic(), 0xA5E8);
        assert_eq!(Algorithm::Lz78.magic(), 0x7869);
        assert_eq!(Algorithm::Lzw.magic(), 0x8E83);
    }

    #[test]
    fn test_magic_roundtrip() {
        for algorithm in ALL {
            assert_eq!(Algorithm::from_magic(algorithm.magic()), Some(algorithm));
        }
        assert_eq!(Algorithm::from_magic(0x1F8B), None);
    }

    #[test]
    fn test_magic_is_network_order() {
        let mut out = Vec::new();
        compress(Algorithm::Lzw, Cursor::new(b"hi"), &mut out).unwrap();
        assert_eq!(&out[..2], &[0x8E, 0x83]);
    }

    #[test]
    fn test_dispatch_roundtrip_all_engines() {
        let data = b"a self-describing artifact decodes without being told how";
        for algorithm in ALL {
            let mut compressed = Vec::new();
            compress(algorithm, Cursor::new(data), &mut compressed).unwrap();
            let mut restored = Vec::new();
            decompress(compressed.as_slice(), &mut restored).unwrap();
            assert_eq!(restored, data, "{} failed to round-trip", algorithm);
        }
    }

    #[test]
    fn test_unknown_magic_rejected() {
        let bogus = [0xDE, 0xAD, 0x00, 0x01];
        let mut restored = Vec::new();
        assert!(matches!(
            decompress(bogus.as_slice(), &mut restored),
            Err(Error::BadMagic(0xDEAD))
        ));
    }

    #[test]
    fn test_empty_stream_rejected() {
        let mut restored = Vec::new();
        assert!(matches!(
            decompress([].as_slice(), &mut restored),
            Err(Error::UnexpectedEof)
        ));
    }

    #[test]
    fn test_stream_compression_refuses_huffman() {
        let mut out = Vec::new();
        assert!(matches!(
            compress_stream(Algorithm::Huffman, b"data".as_slice(), &mut out),
            Err(Error::UnseekableInput)
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_stream_compression_works_for_single_pass_engines() {
        for algorithm in [Algorithm::Lz77, Algorithm::Lz78, Algorithm::Lzw] {
            let data = b"pipes are fine for single-pass engines";
            let mut compressed = Vec::new();
            compress_stream(algorithm, data.as_slice(), &mut compressed).unwrap();
            let mut restored = Vec::new();
            decompress(compressed.as_slice(), &mut restored).unwrap();
            assert_eq!(restored, data);
        }
    }
}
