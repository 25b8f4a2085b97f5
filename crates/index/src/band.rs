//! Banding: slicing a fixed-width signature into per-band chunk values.
//!
//! Chunk boundaries are always derived from the declared signature width,
//! never from the natural bit length of its value, so a signature with
//! leading zero bits is sliced exactly like any other.

use perceptual::Signature;
use serde::{Deserialize, Serialize};

use crate::IndexError;

/// Partition of a `hash_iter`-bit signature into `bands` chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandLayout {
    hash_iter: usize,
    chunk_size: usize,
    bands: usize,
}

impl BandLayout {
    /// Layout for `hash_iter` bits cut into `chunk_size`-bit chunks.
    pub fn new(hash_iter: usize, chunk_size: usize) -> Result<Self, IndexError> {
        if hash_iter == 0 {
            return Err(IndexError::InvalidHashIter { hash_iter });
        }
        if chunk_size == 0 || chunk_size > hash_iter {
            return Err(IndexError::InvalidChunkSize {
                chunk_size,
                hash_iter,
            });
        }
        Ok(Self {
            hash_iter,
            chunk_size,
            bands: hash_iter.div_ceil(chunk_size),
        })
    }

    pub fn hash_iter(&self) -> usize {
        self.hash_iter
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    /// First bit of `band`.
    #[inline]
    pub fn band_start(&self, band: usize) -> usize {
        band * self.chunk_size
    }

    /// Bits actually covered by `band`; only the last band can be narrower.
    #[inline]
    pub fn band_width(&self, band: usize) -> usize {
        self.chunk_size
            .min(self.hash_iter.saturating_sub(self.band_start(band)))
    }

    /// Band chunks of `sig`, most significant band first.
    ///
    /// Each chunk is a signature of that band's width, so chunks wider than
    /// a machine word are kept whole.
    pub fn split(&self, sig: &Signature) -> Result<Vec<Signature>, IndexError> {
        if sig.width() != self.hash_iter {
            return Err(IndexError::WidthMismatch {
                expected: self.hash_iter,
                actual: sig.width(),
            });
        }
        let mut chunks = Vec::with_capacity(self.bands);
        for band in 0..self.bands {
            chunks.push(sig.slice(self.band_start(band), self.band_width(band))?);
        }
        Ok(chunks)
    }
}

/// Split `signature` into `ceil(hash_iter / chunk_size)` chunks.
///
/// A trailing partial band holds only the remaining bits; its integer value
/// is the same as left-padding it with zeros to `chunk_size` bits.
pub fn split_into_bands(
    signature: &Signature,
    hash_iter: usize,
    chunk_size: usize,
) -> Result<Vec<Signature>, IndexError> {
    BandLayout::new(hash_iter, chunk_size)?.split(signature)
}
