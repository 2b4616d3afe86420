#![no_main]

use libfuzzer_sys::fuzz_target;
use lzoo::Algorithm;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Limit data size to avoid slowdowns
    let data = if data.len() > 64 * 1024 { &data[..64 * 1024] } else { data };

    // Compression of well-formed input must always succeed, and the
    // round-trip law must hold for every engine.
    for algorithm in
        [Algorithm::Huffman, Algorithm::Lz77, Algorithm::Lz78, Algorithm::Lzw]
    {
        let mut compressed = Vec::new();
        lzoo::compress(algorithm, Cursor::new(data), &mut compressed)
            .expect("compression of valid input failed");

        let mut restored = Vec::new();
        lzoo::decompress(compressed.as_slice(), &mut restored)
            .expect("decompression of our own output failed");

        assert_eq!(restored, data, "round-trip mismatch");
    }
});
