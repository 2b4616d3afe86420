//! LZW dictionary compression.
//!
//! A variant of LZ78 whose dictionary is pre-seeded with the 256
//! single-byte chunks, so every token is a bare dictionary index and no
//! literals appear on the wire. The dictionary freezes at
//! 2^dictionary_bits entries (the width is floored to 8 bits so the seeds
//! always fit). Block framing matches the other dictionary engine; the
//! current match never carries across a block boundary.

use crate::bits::{Bit, BitReader, BitWriter};
use crate::chunk::ByteChunk;
use crate::error::{Error, Result};
use crate::read_full;
use log::{debug, trace};
use std::collections::HashMap;
use std::io::{Read, Write};

const VERSION: u8 = 1;

/// Seed a compression dictionary with the 256 single-byte chunks.
fn seed_compression_dictionary() -> HashMap<ByteChunk, usize> {
    (0..=255u8).map(|byte| (ByteChunk::from(byte), byte as usize)).collect()
}

/// Seed a decompression dictionary with the 256 single-byte chunks. Runs
/// before the first token is read, so index 0..=255 always resolve.
fn seed_decompression_dictionary(capacity: usize) -> Vec<ByteChunk> {
    let mut dictionary = Vec::with_capacity(capacity.min(1 << 16));
    dictionary.extend((0..=255u8).map(ByteChunk::from));
    dictionary
}

/// The LZW engine.
///
/// Wire format: `version(8) | dict_bits(5) | block_bits(5) | block+`, each
/// block a run of `index(dict_bits)` tokens for the block's bytes.
pub struct Lzw {
    dictionary_bits: u8,
    block_bits: u8,
}

impl Default for Lzw {
    fn default() -> Self {
        Self::new(13, 6)
    }
}

impl Lzw {
    /// Panics unless both widths are in `1..=30`. Dictionary widths below
    /// 8 are raised to 8 so the seed entries fit.
    pub fn new(dictionary_bits: u8, block_bits: u8) -> Self {
        assert!((1..=30).contains(&dictionary_bits), "dictionary_bits out of range");
        assert!((1..=30).contains(&block_bits), "block_bits out of range");
        Self { dictionary_bits: dictionary_bits.max(8), block_bits }
    }

    /// Compress `input` into `output` in a single pass.
    pub fn compress<R: Read, W: Write>(&self, mut input: R, output: W) -> Result<()> {
        let max_entries = 1usize << self.dictionary_bits;
        let block_size = 1usize << self.block_bits;
        let mut dictionary = seed_compression_dictionary();

        let mut out = BitWriter::new(output);
        out.put_bits(VERSION as u64, 8)?;
        out.put_bits(self.dictionary_bits as u64, 5)?;
        out.put_bits(self.block_bits as u64, 5)?;

        let mut block = vec![0u8; block_size];
        let mut chunk = ByteChunk::with_capacity(block_size);
        loop {
            let n = read_full(&mut input, &mut block)?;
            debug!("lzw: block of {} bytes, dictionary at {} entries", n, dictionary.len());

            if n == block_size {
                out.put_bit(Bit::Zero)?;
            } else {
                out.put_bit(Bit::One)?;
                out.put_bits(n as u64, self.block_bits)?;
            }

            chunk.clear();
            let mut chunk_index = None;
            let mut pos = 0;
            while pos < n {
                chunk.push(block[pos]);
                if let Some(index) = dictionary.get(&chunk).copied() {
                    chunk_index = Some(index);
                    pos += 1;
                    continue;
                }

                // `chunk` = matched prefix + one breaking byte: record it,
                // emit the prefix, restart from the breaking byte.
                if dictionary.len() < max_entries {
                    dictionary.insert(chunk.clone(), dictionary.len());
                }
                let index = chunk_index
                    .ok_or_else(|| Error::Internal("single byte missing from seeds".into()))?;
                out.put_bits(index as u64, self.dictionary_bits)?;
                trace!("lzw: emit #{}", index);

                chunk.clear();
                chunk.push(block[pos]);
                pos += 1;
                chunk_index = dictionary.get(&chunk).copied();
            }

            // Residual match at the end of the block.
            if !chunk.is_empty() {
                let index = chunk_index
                    .ok_or_else(|| Error::Internal("residual chunk not in dictionary".into()))?;
                out.put_bits(index as u64, self.dictionary_bits)?;
                trace!("lzw: emit residual #{}", index);
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
        if !(8..=30).contains(&dictionary_bits) || !(1..=30).contains(&block_bits) {
            return Err(Error::InvalidHeader("dictionary or block width out of range"));
        }

        let max_entries = 1usize << dictionary_bits;
        let block_size = 1usize << block_bits;
        let mut dictionary = seed_decompression_dictionary(max_entries);

        loop {
            let last = input.read_bit()?.is_set();
            let block_bytes = if last { input.read_bits(block_bits)? as usize } else { block_size };
            debug!("lzw: decoding block of {} bytes (last: {})", block_bytes, last);
            if block_bytes == 0 {
                if last {
                    break;
                }
                continue;
            }

            // First token of the block resolves directly and seeds the
            // previous-entry chain.
            let index = input.read_bits(dictionary_bits)? as usize;
            let entry = dictionary
                .get(index)
                .ok_or(Error::InvalidDictionaryIndex { index, size: dictionary.len() })?;
            if entry.len() > block_bytes {
                return Err(Error::InvalidCopyLength { length: entry.len(), remaining: block_bytes });
            }
            output.write_all(entry.as_bytes())?;
            let mut remaining = block_bytes - entry.len();
            let mut prev = index;

            while remaining > 0 {
                let index = input.read_bits(dictionary_bits)? as usize;
                let chunk = if index == dictionary.len() {
                    // The one legal unseen index: the entry being defined
                    // by this very token (KwKwK). Impossible once the
                    // dictionary is frozen.
                    if dictionary.len() >= max_entries {
                        return Err(Error::InvalidDictionaryIndex {
                            index,
                            size: dictionary.len(),
                        });
                    }
                    let mut chunk = dictionary[prev].clone();
                    let first = chunk
                        .first()
                        .ok_or_else(|| Error::Internal("empty dictionary entry".into()))?;
                    chunk.push(first);
                    dictionary.push(chunk.clone());
                    chunk
                } else {
                    let entry = dictionary
                        .get(index)
                        .ok_or(Error::InvalidDictionaryIndex { index, size: dictionary.len() })?
                        .clone();
                    if dictionary.len() < max_entries {
                        let mut grown = dictionary[prev].clone();
                        let first = entry
                            .first()
                            .ok_or_else(|| Error::Internal("empty dictionary entry".into()))?;
                        grown.push(first);
                        dictionary.push(grown);
                    }
                    entry
                };

                if chunk.len() > remaining {
                    return Err(Error::InvalidCopyLength { length: chunk.len(), remaining });
                }
                output.write_all(chunk.as_bytes())?;
                remaining -= chunk.len();
                prev = index;
            }

            if last {
                break;
            }
        }

        output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_with(engine: &Lzw, data: &[u8]) -> Vec<u8> {
        let mut compressed = Vec::new();
        engine.compress(data, &mut compressed).unwrap();
        let mut restored = Vec::new();
        Lzw::decompress(compressed.as_slice(), &mut restored).unwrap();
        restored
    }

    fn roundtrip(data: &[u8]) -> Vec<u8> {
        roundtrip_with(&Lzw::default(), data)
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
    fn test_roundtrip_classic_sequence() {
        let data = b"TOBEORNOTTOBEORTOBEORNOT";
        assert_eq!(roundtrip(data), data);
    }

    #[test]
    fn test_first_indices_are_byte_values() {
        // Until the first repeat, every token is a seed index, i.e. the
        // byte value itself.
        let engine = Lzw::default();
        let mut compressed = Vec::new();
        engine.compress(b"TOBEORNOT".as_slice(), &mut compressed).unwrap();

        let mut reader = BitReader::new(compressed.as_slice());
        reader.read_bits(8).unwrap(); // version
        reader.read_bits(5).unwrap(); // dictionary_bits
        reader.read_bits(5).unwrap(); // block_bits
        assert_eq!(reader.read_bit().unwrap(), Bit::One); // last block
        assert_eq!(reader.read_bits(6).unwrap(), 9); // block length

        for expected in *b"TOBEORNOT" {
            assert_eq!(reader.read_bits(13).unwrap(), expected as u64);
        }
    }

    #[test]
    fn test_roundtrip_repeated_byte_kwkwk() {
        // "AAAA..." drives the decoder straight into the KwKwK case.
        let data = vec![b'A'; 2000];
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn test_roundtrip_exact_block_multiple() {
        // Default block size is 64; 128 is exactly two blocks.
        let data: Vec<u8> = (0..128).map(|i| (i % 7) as u8).collect();
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn test_roundtrip_all_byte_values() {
        let data: Vec<u8> = (0..=255u8).collect();
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn test_roundtrip_frozen_dictionary() {
        // Smallest possible dictionary: 256 seeds fill it immediately, so
        // every token is a single-byte index.
        let engine = Lzw::new(8, 6);
        let data = b"she sells sea shells by the sea shore".repeat(20);
        assert_eq!(roundtrip_with(&engine, &data), data);
    }

    #[test]
    fn test_dictionary_width_floors_at_eight() {
        let engine = Lzw::new(3, 6);
        assert_eq!(engine.dictionary_bits, 8);
        let data = b"narrow dictionaries still decode";
        assert_eq!(roundtrip_with(&engine, data), data);
    }

    #[test]
    fn test_wrong_version_rejected() {
        let mut compressed = Vec::new();
        Lzw::default().compress(b"abc".as_slice(), &mut compressed).unwrap();
        compressed[0] = 0xFE;
        let mut restored = Vec::new();
        assert!(matches!(
            Lzw::decompress(compressed.as_slice(), &mut restored),
            Err(Error::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        // Valid header, last block of 2 bytes, then an index far beyond
        // the 256 seeds (and not the next free slot).
        let mut raw = Vec::new();
        let mut out = BitWriter::new(&mut raw);
        out.put_bits(VERSION as u64, 8).unwrap();
        out.put_bits(13, 5).unwrap();
        out.put_bits(6, 5).unwrap();
        out.put_bit(Bit::One).unwrap();
        out.put_bits(2, 6).unwrap();
        out.put_bits(4000, 13).unwrap();
        out.flush().unwrap();

        let mut restored = Vec::new();
        assert!(matches!(
            Lzw::decompress(raw.as_slice(), &mut restored),
            Err(Error::InvalidDictionaryIndex { index: 4000, .. })
        ));
    }

    #[test]
    fn test_truncated_stream_rejected() {
        let data = b"a stream cut off mid-token".repeat(10);
        let mut compressed = Vec::new();
        Lzw::default().compress(data.as_slice(), &mut compressed).unwrap();
        compressed.truncate(compressed.len() - 2);
        let mut restored = Vec::new();
        assert!(Lzw::decompress(compressed.as_slice(), &mut restored).is_err());
    }
}
