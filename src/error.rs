use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Container errors
    #[error("Unknown magic number: 0x{0:04x}")]
    BadMagic(u16),

    #[error("Unsupported stream version: expected {expected}, got {found}")]
    VersionMismatch { expected: u8, found: u8 },

    #[error("Huffman compression needs a seekable input (two passes over the data)")]
    UnseekableInput,

    #[error("Invalid header: {0}")]
    InvalidHeader(&'static str),

    // Body errors
    #[error("Stream ended after {decoded} of {expected} symbols")]
    TruncatedBody { expected: u64, decoded: u64 },

    #[error("Dictionary index {index} out of range (dictionary holds {size} entries)")]
    InvalidDictionaryIndex { index: usize, size: usize },

    #[error("Copy of {length} bytes exceeds the {remaining} bytes left in the block")]
    InvalidCopyLength { length: usize, remaining: usize },

    // Huffman limits
    #[error("Input of {0} bytes exceeds the 2^32-1 byte Huffman limit")]
    InputTooLarge(u64),

    // Internal errors
    #[error("Unexpected end of input")]
    UnexpectedEof,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
