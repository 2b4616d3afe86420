//! LZ78 dictionary compression.
//!
//! The dictionary starts empty and grows one entry per emitted token: the
//! matched prefix plus the byte that broke the match. Entries are indexed
//! by insertion order and the dictionary freezes once it holds
//! 2^dictionary_bits entries. Input is framed in blocks exactly like the
//! LZ77 engine, and match chunks never cross a block boundary.

use crate::bits::{Bit, BitReader, BitWriter};
use crate::chunk::ByteChunk;
use crate::error::{Error, Result};
use crate::read_full;
use log::{debug, trace};
use std::collections::HashMap;
use std::io::{Read, Write};

const VERSION: u8 = 1;

/// The LZ78 engine.
///
/// Wire format: `version(8) | dict_bits(5) | block_bits(5) | block+`.
/// Tokens are `0 literal(8)` for a single unseen byte, or
/// `1 index(dict_bits) literal(8)` for a known prefix plus its trailing
/// byte.
pub struct Lz78 {
    dictionary_bits: u8,
    block_bits: u8,
}

impl Default for Lz78 {
    fn default() -> Self {
        Self::new(14, 5)
    }
}

impl Lz78 {
    /// Panics unless both widths are in `1..=30`.
    pub fn new(dictionary_bits: u8, block_bits: u8) -> Self {
        assert!((1..=30).contains(&dictionary_bits), "dictionary_bits out of range");
        assert!((1..=30).contains(&block_bits), "block_bits out of range");
        Self { dictionary_bits, block_bits }
    }

    /// Compress `input` into `output` in a single pass.
    pub fn compress<R: Read, W: Write>(&self, mut input: R, output: W) -> Result<()> {
        let max_entries = 1usize << self.dictionary_bits;
        let block_size = 1usize << self.block_bits;
        let mut dictionary: HashMap<ByteChunk, usize> = HashMap::new();

        let mut out = BitWriter::new(output);
        out.put_bits(VERSION as u64, 8)?;
        out.put_bits(self.dictionary_bits as u64, 5)?;
        out.put_bits(self.block_bits as u64, 5)?;

        let mut block = vec![0u8; block_size];
        let mut chunk = ByteChunk::with_capacity(block_size);
        loop {
            let n = read_full(&mut input, &mut block)?;
            debug!("lz78: block of {} bytes, dictionary at {} entries", n, dictionary.len());

            if n == block_size {
                out.put_bit(Bit::Zero)?;
            } else {
                out.put_bit(Bit::One)?;
                out.put_bits(n as u64, self.block_bits)?;
            }

            let mut pos = 0;
            while pos < n {
                // Greedy match: grow the chunk until it falls out of the
                // dictionary or the block runs dry.
                chunk.clear();
                let mut prefix_index = None;
                loop {
                    chunk.push(block[pos]);
                    pos += 1;
                    match dictionary.get(&chunk).copied() {
                        None => break,
                        Some(index) if pos < n => prefix_index = Some(index),
                        Some(_) => break,
                    }
                }

                // New entries only while there is room and the chunk did
                // not consume the rest of the block; the decoder applies
                // the same rule.
                if dictionary.len() < max_entries && pos < n {
                    dictionary.insert(chunk.clone(), dictionary.len());
                }

                let literal = chunk
                    .last()
                    .ok_or_else(|| Error::Internal("empty chunk out of the matcher".into()))?;
                match (chunk.len(), prefix_index) {
                    (1, _) => {
                        out.put_bit(Bit::Zero)?;
                        out.put_bits(literal as u64, 8)?;
                        trace!("lz78: literal {:#04x}", literal);
                    }
                    (_, Some(index)) => {
                        out.put_bit(Bit::One)?;
                        out.put_bits(index as u64, self.dictionary_bits)?;
                        out.put_bits(literal as u64, 8)?;
                        trace!("lz78: prefix #{} + {:#04x}", index, literal);
                    }
                    (_, None) => {
                        return Err(Error::Internal("multi-byte chunk without a prefix".into()));
                    }
                }
            }

            if n < block_size {
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
        let dictionary_bits = input.read_bits(5)? as u8;
        let block_bits = input.read_bits(5)? as u8;
        if !(1..=30).contains(&dictionary_bits) || !(1..=30).contains(&block_bits) {
            return Err(Error::InvalidHeader("dictionary or block width out of range"));
        }

        let max_entries = 1usize << dictionary_bits;
        let block_size = 1usize << block_bits;
        let mut dictionary: Vec<ByteChunk> = Vec::new();

        loop {
            let last = input.read_bit()?.is_set();
            let block_bytes = if last { input.read_bits(block_bits)? as usize } else { block_size };
            debug!("lz78: decoding block of {} bytes (last: {})", block_bytes, last);

            let mut remaining = block_bytes;
            while remaining > 0 {
                let chunk = if input.read_bit()?.is_set() {
                    let index = input.read_bits(dictionary_bits)? as usize;
                    let entry = dictionary.get(index).ok_or(Error::InvalidDictionaryIndex {
                        index,
                        size: dictionary.len(),
                    })?;
                    let mut chunk = entry.clone();
                    chunk.push(input.read_bits(8)? as u8);
                    chunk
                } else {
                    ByteChunk::from(input.read_bits(8)? as u8)
                };

                if chunk.len() > remaining {
                    return Err(Error::InvalidCopyLength { length: chunk.len(), remaining });
                }
                output.write_all(chunk.as_bytes())?;
                remaining -= chunk.len();

                // Mirror of the encoder's insertion rule: skip the entry
                // when the chunk ends exactly at the block boundary.
                if dictionary.len() < max_entries && remaining > 0 {
                    dictionary.push(chunk);
                }
            }

            if last {
                break;
            }
        }

        output.flush()?;
        Ok(())
    }
}
