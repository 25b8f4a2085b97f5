use hashbrown::HashSet;
use perceptual::Signature;
use std::time::Instant;
use tracing::debug;

use crate::{IndexError, MultiIndexTable};

/// `chunk` followed by every value one bit-flip away from it.
///
/// Flips start at the least significant bit and run up to the most
/// significant one, so the result always has `chunk.width() + 1` distinct
/// values with `chunk` first, whatever the chunk width.
pub fn expand_chunk(chunk: &Signature) -> Vec<Signature> {
    let width = chunk.width();
    let mut close = Vec::with_capacity(width + 1);
    close.push(chunk.clone());
    close.extend((0..width).rev().filter_map(|bit| chunk.flipped(bit)));
    close
}

/// Candidate retrieval
impl MultiIndexTable {
    /// Every stored signature sharing a band chunk within one bit of the
    /// query's chunk in that band.
    ///
    /// Each candidate appears once, in the order it was first seen (band
    /// order, then bucket order). The result may include the query itself
    /// and false positives; callers should re-score with
    /// [`perceptual::hamming_similarity`].
    pub fn lookup(&self, signature: &Signature) -> Result<Vec<Signature>, IndexError> {
        let start = Instant::now();
        let chunks = self.layout.split(signature)?;

        let mut seen: HashSet<Signature> = HashSet::new();
        let mut candidates = Vec::new();
        for (band, chunk) in chunks.into_iter().enumerate() {
            let close = expand_chunk(&chunk);
            self.store.visit(band, &close, &mut |bucket: &[Signature]| {
                for sig in bucket {
                    if !seen.contains(sig) {
                        seen.insert(sig.clone());
                        candidates.push(sig.clone());
                    }
                }
            })?;
        }

        debug!(
            bands = self.layout.bands(),
            candidates = candidates.len(),
            elapsed_micros = start.elapsed().as_micros() as u64,
            "index_lookup"
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(value: u64, width: usize) -> Signature {
        Signature::from_u64(value, width).unwrap()
    }

    #[test]
    fn expand_size_and_distinctness() {
        for width in [1usize, 2, 7, 8, 31, 64] {
            for value in [0u64, 1, 0b1010, u64::MAX >> (64 - width)] {
                let chunk = sig(value & (u64::MAX >> (64 - width)), width);
                let close = expand_chunk(&chunk);
                assert_eq!(close.len(), width + 1);
                assert_eq!(close[0], chunk);
                let distinct: std::collections::HashSet<&Signature> = close.iter().collect();
                assert_eq!(distinct.len(), width + 1);
                for other in &close[1..] {
                    assert_eq!(other.width(), width);
                    assert_eq!(other.hamming_distance(&chunk).unwrap(), 1);
                }
            }
        }
    }

    #[test]
    fn expand_zero_chunk() {
        let close: Vec<u64> = expand_chunk(&sig(0, 4))
            .iter()
            .map(|c| c.to_u64().unwrap())
            .collect();
        assert_eq!(close, vec![0, 1, 2, 4, 8]);
    }

    #[test]
    fn expand_chunk_wider_than_a_word() {
        let chunk = Signature::zeroed(130).unwrap();
        let close = expand_chunk(&chunk);
        assert_eq!(close.len(), 131);
        let distinct: std::collections::HashSet<&Signature> = close.iter().collect();
        assert_eq!(distinct.len(), 131);
        assert!(close[1..].iter().all(|c| c.count_ones() == 1));
    }

    #[test]
    fn lookup_on_empty_table_is_empty() {
        let table = MultiIndexTable::new(32, 4).unwrap();
        assert!(table.lookup(&sig(0xDEAD_BEEF, 32)).unwrap().is_empty());
    }

    #[test]
    fn lookup_finds_exact_match() {
        let table = MultiIndexTable::new(32, 4).unwrap();
        let s = sig(0x1CA0_E72C, 32);
        table.insert(&s).unwrap();
        assert_eq!(table.lookup(&s).unwrap(), vec![s]);
    }

    #[test]
    fn lookup_finds_one_bit_neighbour_in_each_band() {
        let table = MultiIndexTable::new(32, 4).unwrap();
        let stored = sig(0x1CA0_E72C, 32);
        table.insert(&stored).unwrap();
        for bit in 0..32 {
            let query = sig(0x1CA0_E72C ^ (1 << bit), 32);
            assert_eq!(table.lookup(&query).unwrap(), vec![stored.clone()], "bit {bit}");
        }
    }

    #[test]
    fn lookup_finds_one_bit_flip_per_band() {
        // One flip in every band: no exact band match, but each band is
        // within radius one.
        let table = MultiIndexTable::new(32, 4).unwrap();
        let stored = sig(0x0000_0000, 32);
        table.insert(&stored).unwrap();
        let query = sig(0x0101_0101, 32);
        assert_eq!(table.lookup(&query).unwrap(), vec![stored]);
    }

    #[test]
    fn lookup_misses_two_flips_in_every_band() {
        let table = MultiIndexTable::new(32, 4).unwrap();
        table.insert(&sig(0x0000_0000, 32)).unwrap();
        let query = sig(0x0303_0303, 32);
        assert!(table.lookup(&query).unwrap().is_empty());
    }

    #[test]
    fn lookup_returns_each_candidate_once() {
        let table = MultiIndexTable::new(32, 4).unwrap();
        let a = sig(0x1111_1111, 32);
        let b = sig(0x1111_1110, 32);
        table.insert(&a).unwrap();
        table.insert(&b).unwrap();
        let found = table.lookup(&a).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], a);
        assert!(found.contains(&b));
    }

    #[test]
    fn lookup_rejects_wrong_width() {
        let table = MultiIndexTable::new(32, 4).unwrap();
        assert_eq!(
            table.lookup(&sig(1, 16)),
            Err(IndexError::WidthMismatch {
                expected: 32,
                actual: 16
            })
        );
    }

    #[test]
    fn lookup_partial_last_band_uses_its_own_width() {
        // 10 bits, radius 3 → chunk 3, bands 4 (3 + 3 + 3 + 1)
        let table = MultiIndexTable::new(10, 3).unwrap();
        assert_eq!(table.bands(), 4);
        let stored = sig(0b000_000_000_0, 10);
        table.insert(&stored).unwrap();
        // differs in two bits of each of the first three bands, one bit in the last
        let query = sig(0b011_011_011_1, 10);
        assert_eq!(table.lookup(&query).unwrap(), vec![stored]);
    }

    #[test]
    fn single_band_wider_than_a_word() {
        let table = MultiIndexTable::new(128, 1).unwrap();
        assert_eq!(table.chunk_size(), 128);
        assert_eq!(table.bands(), 1);

        let stored = table.signature_from_tokens(&["one", "wide", "band"]).unwrap();
        table.insert(&stored).unwrap();
        assert_eq!(table.lookup(&stored).unwrap(), vec![stored.clone()]);

        for bit in [0, 63, 64, 127] {
            let query = stored.flipped(bit).unwrap();
            assert_eq!(table.lookup(&query).unwrap(), vec![stored.clone()], "bit {bit}");
        }
        let two_off = stored.flipped(0).unwrap().flipped(127).unwrap();
        assert!(table.lookup(&two_off).unwrap().is_empty());
    }
}
