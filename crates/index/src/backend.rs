use hashbrown::HashMap;
use perceptual::Signature;
use std::sync::RwLock;

use crate::IndexError;

/// One band's chunk → signatures mapping.
///
/// Keys are width-tagged chunks, so a band may be wider than 64 bits.
pub(crate) type Buckets = HashMap<Signature, Vec<Signature>>;

/// In-memory band storage: one `RwLock` around a `HashMap` per band.
///
/// Insert and lookup touch bands one at a time and never hold two band
/// locks at once, so band locks cannot deadlock against each other.
pub(crate) struct BandStore {
    bands: Vec<RwLock<Buckets>>,
}

impl BandStore {
    pub(crate) fn new(bands: usize) -> Self {
        Self {
            bands: (0..bands).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    pub(crate) fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Add `sig` to the bucket `chunk` of `band` unless it is already there.
    ///
    /// Returns `true` when the signature was appended.
    pub(crate) fn put(
        &self,
        band: usize,
        chunk: Signature,
        sig: &Signature,
    ) -> Result<bool, IndexError> {
        let mut guard = self.bands[band]
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        let bucket = guard.entry(chunk).or_default();
        if bucket.contains(sig) {
            return Ok(false);
        }
        bucket.push(sig.clone());
        Ok(true)
    }

    /// Visit the bucket of every key in `chunks` that exists in `band`.
    pub(crate) fn visit(
        &self,
        band: usize,
        chunks: &[Signature],
        visitor: &mut dyn FnMut(&[Signature]),
    ) -> Result<(), IndexError> {
        // The read lock is held for the duration of the visit.
        let guard = self.bands[band]
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        for chunk in chunks {
            if let Some(bucket) = guard.get(chunk) {
                visitor(bucket);
            }
        }
        Ok(())
    }

    pub(crate) fn bucket_count(&self, band: usize) -> Result<usize, IndexError> {
        let guard = self.bands[band]
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(guard.len())
    }

    /// Total entries across all buckets of `band`.
    pub(crate) fn entry_count(&self, band: usize) -> Result<usize, IndexError> {
        let guard = self.bands[band]
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(guard.values().map(Vec::len).sum())
    }

    /// Copy of a band's buckets, sorted by chunk value.
    pub(crate) fn dump(&self, band: usize) -> Result<Vec<(Signature, Vec<Signature>)>, IndexError> {
        let guard = self.bands[band]
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        let mut out: Vec<(Signature, Vec<Signature>)> =
            guard.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        out.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}
