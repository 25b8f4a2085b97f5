//! Fixed-width bit signatures.
//!
//! A [`Signature`] carries its width explicitly, so leading zero bits are
//! never lost the way they are with a bare integer. Bit `i` corresponds to
//! MinHash slot `i` and is stored most-significant-first: slot 0 is the
//! leftmost bit of the first word.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PerceptualError;

const WORD_BITS: usize = 64;

/// A bit vector of exactly `width` bits.
///
/// Unused low bits of the last word are always zero, so the derived
/// equality, hashing and ordering compare signatures by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawSignature", into = "RawSignature")]
pub struct Signature {
    width: usize,
    words: Vec<u64>,
}

/// Serialized form; validated on the way back in.
#[derive(Serialize, Deserialize)]
struct RawSignature {
    width: usize,
    words: Vec<u64>,
}

impl TryFrom<RawSignature> for Signature {
    type Error = PerceptualError;

    fn try_from(raw: RawSignature) -> Result<Self, Self::Error> {
        Signature::from_words(raw.width, raw.words)
    }
}

impl From<Signature> for RawSignature {
    fn from(sig: Signature) -> Self {
        RawSignature {
            width: sig.width,
            words: sig.words,
        }
    }
}

#[inline]
fn words_for(width: usize) -> usize {
    width.div_ceil(WORD_BITS)
}

/// Mask of the bits of the last word that belong to the signature.
#[inline]
fn tail_mask(width: usize) -> u64 {
    match width % WORD_BITS {
        0 => u64::MAX,
        used => !(u64::MAX >> used),
    }
}

impl Signature {
    /// An all-zero signature of `width` bits.
    pub fn zeroed(width: usize) -> Result<Self, PerceptualError> {
        if width == 0 {
            return Err(PerceptualError::InvalidBitCount { bit_count: 0 });
        }
        Ok(Self {
            width,
            words: vec![0; words_for(width)],
        })
    }

    /// Build a signature from bits in slot order (first bit is the MSB).
    pub fn from_bits<I>(bits: I) -> Result<Self, PerceptualError>
    where
        I: IntoIterator<Item = bool>,
    {
        let mut words = Vec::new();
        let mut width = 0usize;
        for bit in bits {
            if width % WORD_BITS == 0 {
                words.push(0);
            }
            if bit {
                let last = words.len() - 1;
                words[last] |= 1u64 << (WORD_BITS - 1 - width % WORD_BITS);
            }
            width += 1;
        }
        if width == 0 {
            return Err(PerceptualError::InvalidBitCount { bit_count: 0 });
        }
        Ok(Self { width, words })
    }

    /// Interpret the low `width` bits of `value` as a signature.
    ///
    /// `value` is the natural integer reading of the bit string, so
    /// `from_u64(0b0000_1010, 8)` keeps its four leading zeros.
    pub fn from_u64(value: u64, width: usize) -> Result<Self, PerceptualError> {
        if width == 0 || width > WORD_BITS {
            return Err(PerceptualError::InvalidBitCount { bit_count: width });
        }
        if width < WORD_BITS && value >> width != 0 {
            return Err(PerceptualError::ValueTooWide { value, width });
        }
        Ok(Self {
            width,
            words: vec![value << (WORD_BITS - width)],
        })
    }

    /// Build a signature from its packed words.
    pub fn from_words(width: usize, words: Vec<u64>) -> Result<Self, PerceptualError> {
        if width == 0 {
            return Err(PerceptualError::InvalidBitCount { bit_count: 0 });
        }
        let expected = words_for(width);
        if words.len() != expected {
            return Err(PerceptualError::WidthMismatch {
                expected: expected * WORD_BITS,
                actual: words.len() * WORD_BITS,
            });
        }
        let last = words[expected - 1];
        if last & !tail_mask(width) != 0 {
            return Err(PerceptualError::ValueTooWide { value: last, width });
        }
        Ok(Self { width, words })
    }

    /// Declared width in bits.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Packed words, most significant bit first.
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Value of bit `index`, or `None` past the end.
    pub fn bit(&self, index: usize) -> Option<bool> {
        if index >= self.width {
            return None;
        }
        let word = self.words[index / WORD_BITS];
        Some((word >> (WORD_BITS - 1 - index % WORD_BITS)) & 1 == 1)
    }

    pub(crate) fn set_bit(&mut self, index: usize) {
        debug_assert!(index < self.width);
        self.words[index / WORD_BITS] |= 1u64 << (WORD_BITS - 1 - index % WORD_BITS);
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Number of differing bits between two signatures of equal width.
    pub fn hamming_distance(&self, other: &Signature) -> Result<usize, PerceptualError> {
        if self.width != other.width {
            return Err(PerceptualError::WidthMismatch {
                expected: self.width,
                actual: other.width,
            });
        }
        Ok(self
            .words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a ^ b).count_ones() as usize)
            .sum())
    }

    /// Read `len` bits starting at bit `start` as an unsigned integer.
    ///
    /// `len` must be in `1..=64` and the range must lie inside the
    /// signature. The first bit read becomes the most significant bit of
    /// the result.
    pub fn extract(&self, start: usize, len: usize) -> Result<u64, PerceptualError> {
        let end = start.saturating_add(len);
        if len == 0 || len > WORD_BITS || end > self.width {
            return Err(PerceptualError::RangeOutOfBounds {
                start,
                end,
                width: self.width,
            });
        }
        let idx = start / WORD_BITS;
        let offset = start % WORD_BITS;
        let mut aligned = self.words[idx] << offset;
        if offset + len > WORD_BITS {
            aligned |= self.words[idx + 1] >> (WORD_BITS - offset);
        }
        Ok(aligned >> (WORD_BITS - len))
    }

    /// Copy of bits `start..start + len` as a signature of width `len`.
    ///
    /// Unlike [`Signature::extract`], `len` is not limited to 64 bits.
    pub fn slice(&self, start: usize, len: usize) -> Result<Signature, PerceptualError> {
        let end = start.saturating_add(len);
        if len == 0 || end > self.width {
            return Err(PerceptualError::RangeOutOfBounds {
                start,
                end,
                width: self.width,
            });
        }
        let mut words = Vec::with_capacity(words_for(len));
        for offset in (0..len).step_by(WORD_BITS) {
            let n = WORD_BITS.min(len - offset);
            let value = self.extract(start + offset, n)?;
            words.push(value << (WORD_BITS - n));
        }
        Ok(Self { width: len, words })
    }

    /// Copy of this signature with bit `index` inverted, or `None` past the end.
    pub fn flipped(&self, index: usize) -> Option<Signature> {
        if index >= self.width {
            return None;
        }
        let mut out = self.clone();
        out.words[index / WORD_BITS] ^= 1u64 << (WORD_BITS - 1 - index % WORD_BITS);
        Some(out)
    }

    /// The whole signature as an integer; only valid for widths up to 64.
    pub fn to_u64(&self) -> Result<u64, PerceptualError> {
        if self.width > WORD_BITS {
            return Err(PerceptualError::WidthMismatch {
                expected: WORD_BITS,
                actual: self.width,
            });
        }
        self.extract(0, self.width)
    }
}

impl fmt::Display for Signature {
    /// Zero-padded binary string of exactly `width` digits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.width {
            let bit = (self.words[i / WORD_BITS] >> (WORD_BITS - 1 - i % WORD_BITS)) & 1;
            f.write_str(if bit == 1 { "1" } else { "0" })?;
        }
        Ok(())
    }
}
