#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decompression of arbitrary bytes may fail - that's OK.
    // We're looking for panics, hangs and unbounded allocation, not errors.
    let mut output = Vec::new();
    let _ = lzoo::decompress(data, &mut output);
});
