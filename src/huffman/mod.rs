//! Huffman coding over byte symbols.
//!
//! Compression is two-pass: the first pass builds the occurrence table
//! (so the input must be seekable), the second re-reads the input and
//! emits the codeword for every byte. The header carries the symbol count
//! and the serialized tree, which is everything the decoder needs.

pub mod counts;
pub mod tree;

pub use counts::FrequencyCounter;
pub use tree::{Codebook, HuffmanTree};

use crate::bits::{BitReader, BitWriter};
use crate::error::{Error, Result};
use log::debug;
use std::io::{Read, Seek, SeekFrom, Write};

const VERSION: u8 = 1;

/// The Huffman engine.
///
/// Wire format: `version(8) | count(32) | tree | codeword*`, all MSB-first,
/// zero-padded to a whole byte at the end. The tree is absent when the
/// count is zero, and no codewords are emitted when the source had at most
/// one distinct symbol (the count alone reconstructs the output).
pub struct Huffman;

impl Huffman {
    /// Compress `input` into `output`. Needs `Seek` because the data is
    /// read twice; inputs of 2^32 bytes or more are rejected.
    pub fn compress<R: Read + Seek, W: Write>(mut input: R, output: W) -> Result<()> {
        let counts = FrequencyCounter::from_reader(&mut input)?;
        if counts.total() > u32::MAX as u64 {
            return Err(Error::InputTooLarge(counts.total()));
        }

        let tree = HuffmanTree::from_counts(&counts);
        let codebook = tree.codebook();
        debug!(
            "huffman: {} symbols, {} distinct, mean code length {:.3} bits",
            counts.total(),
            codebook.len(),
            tree.mean_code_length(counts.total())
        );

        let mut out = BitWriter::new(output);
        out.put_bits(VERSION as u64, 8)?;
        out.put_bits(counts.total(), 32)?;
        tree.serialize(&mut out)?;

        // With zero or one distinct symbols the header already determines
        // the whole output.
        if codebook.len() > 1 {
            input.seek(SeekFrom::Start(0))?;
            let mut buf = [0u8; 8192];
            loop {
                let n = match input.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                };
                for &byte in &buf[..n] {
                    let code = codebook
                        .get(byte)
                        .ok_or_else(|| Error::Internal("byte absent from codebook".into()))?;
                    out.write_bit_slice(code)?;
                }
            }
        }

        out.flush()
    }

    /// Decompress `input` into `output`.
    pub fn decompress<R: Read, W: Write>(input: R, mut output: W) -> Result<()> {
        let mut input = BitReader::new(input);

        let version = input.read_bits(8)? as u8;
        if version != VERSION {
            return Err(Error::VersionMismatch { expected: VERSION, found: version });
        }
        let total = input.read_bits(32)?;
        if total == 0 {
            return Ok(());
        }

        let mut tree = HuffmanTree::deserialize(&mut input)?;
        debug!("huffman: decoding {} symbols", total);

        // Single distinct symbol: the body carries no bits, the count does
        // all the work.
        if tree.root_is_leaf() {
            let symbol = tree
                .leaf_symbol()
                .ok_or_else(|| Error::Internal("leaf root without a symbol".into()))?;
            let chunk = [symbol; 8192];
            let mut remaining = total;
            while remaining > 0 {
                let n = remaining.min(chunk.len() as u64) as usize;
                output.write_all(&chunk[..n])?;
                remaining -= n as u64;
            }
            output.flush()?;
            return Ok(());
        }

        const FLUSH_AT: usize = 8192;
        let mut pending = Vec::with_capacity(FLUSH_AT);
        let mut decoded = 0u64;
        while decoded < total {
            let bit = match input.read_bit() {
                Ok(bit) => bit,
                Err(Error::UnexpectedEof) => {
                    return Err(Error::TruncatedBody { expected: total, decoded });
                }
                Err(e) => return Err(e),
            };
            tree.walk(bit);
            if tree.at_leaf() {
                let symbol = tree
                    .leaf_symbol()
                    .ok_or_else(|| Error::Internal("leaf without a symbol".into()))?;
                pending.push(symbol);
                if pending.len() >= FLUSH_AT {
                    output.write_all(&pending)?;
                    pending.clear();
                }
                tree.reset_walk();
                decoded += 1;
            }
        }
        output.write_all(&pending)?;
        output.flush()?;
        Ok(())
    }
}
