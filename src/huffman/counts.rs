use crate::error::Result;
use std::io::Read;

/// Per-symbol occurrence table for a byte stream.
///
/// Models the stream as a memoryless source: each byte value gets the
/// number of times it occurred, and the table remembers how many bytes
/// were counted in total. Built in a single pass; immutable afterwards.
#[derive(Clone)]
pub struct FrequencyCounter {
    counts: [u64; 256],
    total: u64,
}

impl FrequencyCounter {
    /// Count every byte of `reader` until end of file.
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let mut counts = [0u64; 256];
        let mut total = 0u64;
        let mut buf = [0u8; 8192];

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            for &byte in &buf[..n] {
                counts[byte as usize] += 1;
            }
            total += n as u64;
        }

        Ok(Self { counts, total })
    }

    /// Occurrences of one symbol.
    pub fn count(&self, symbol: u8) -> u64 {
        self.counts[symbol as usize]
    }

    /// Total number of symbols counted.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct symbols seen.
    pub fn distinct(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// `(symbol, count)` pairs for every symbol that occurred, in
    /// ascending symbol order. The codebook's determinism depends on this
    /// ordering.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(sym, &c)| (sym as u8, c))
    }

    /// Relative frequency of each symbol that occurred, in ascending
    /// symbol order.
    pub fn frequencies(&self) -> Vec<(u8, f64)> {
        if self.total == 0 {
            return Vec::new();
        }
        self.iter().map(|(sym, c)| (sym, c as f64 / self.total as f64)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_total() {
        let data = b"abracadabra";
        let counter = FrequencyCounter::from_reader(&mut data.as_slice()).unwrap();

        assert_eq!(counter.total(), 11);
        assert_eq!(counter.count(b'a'), 5);
        assert_eq!(counter.count(b'b'), 2);
        assert_eq!(counter.count(b'r'), 2);
        assert_eq!(counter.count(b'c'), 1);
        assert_eq!(counter.count(b'd'), 1);
        assert_eq!(counter.count(b'z'), 0);
        assert_eq!(counter.distinct(), 5);
    }

    #[test]
    fn test_empty_input() {
        let counter = FrequencyCounter::from_reader(&mut [].as_slice()).unwrap();
        assert_eq!(counter.total(), 0);
        assert_eq!(counter.distinct(), 0);
        assert_eq!(counter.iter().count(), 0);
        assert!(counter.frequencies().is_empty());
    }

    #[test]
    fn test_iteration_is_ascending() {
        let data = b"cba";
        let counter = FrequencyCounter::from_reader(&mut data.as_slice()).unwrap();
        let symbols: Vec<u8> = counter.iter().map(|(sym, _)| sym).collect();
        assert_eq!(symbols, vec![b'a', b'b', b'c']);
    }

    #[test]
    fn test_sum_of_counts_equals_total() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let counter = FrequencyCounter::from_reader(&mut data.as_slice()).unwrap();
        let sum: u64 = counter.iter().map(|(_, c)| c).sum();
        assert_eq!(sum, counter.total());
    }

    #[test]
    fn test_frequencies() {
        let data = b"aab";
        let counter = FrequencyCounter::from_reader(&mut data.as_slice()).unwrap();
        let freqs = counter.frequencies();
        assert_eq!(freqs.len(), 2);
        assert_eq!(freqs[0].0, b'a');
        assert!((freqs[0].1 - 2.0 / 3.0).abs() < 1e-9);
        assert!((freqs[1].1 - 1.0 / 3.0).abs() < 1e-9);
    }
}
