//! # lshdup Index
//!
//! An in-memory multi-index table for fixed-width bit signatures. Given a
//! query signature it returns every stored signature that matches the query
//! within one bit in at least one band, without comparing against the whole
//! collection.
//!
//! ## How it works
//!
//! - **Banding**: a `hash_iter`-bit signature is cut into `bands` chunks of
//!   `chunk_size = hash_iter / radius` bits (see [`BandLayout`]). The last
//!   band may be narrower when `chunk_size` does not divide `hash_iter`.
//! - **Insertion**: each chunk is stored in its band's map, keyed by the
//!   width-tagged chunk (any width, not limited to 64 bits), with the full
//!   signature as payload. A signature is added to a given `(band, chunk)`
//!   bucket at most once.
//! - **Lookup**: each query chunk is expanded to itself plus its one-bit
//!   neighbours ([`expand_chunk`]); the union of all buckets hit in any band
//!   is returned.
//!
//! A stored signature is returned whenever at least one band of it differs
//! from the query's band in at most one bit. In particular, by pigeonhole,
//! two signatures that differ in fewer than `2 * bands` bits always share
//! such a band. Results can contain false positives, so re-score candidates
//! with [`perceptual::hamming_similarity`] before accepting them.
//!
//! ## Concurrency
//!
//! Every band sits behind its own `RwLock`. `insert` and `lookup` take
//! `&self`, visit bands in order and hold one band lock at a time, so the
//! table can be shared across threads with an `Arc`. A lookup that races an
//! insert may observe the new signature in some bands only.
//!
//! ## Example Usage
//!
//! ```
//! use index::MultiIndexTable;
//!
//! let table = MultiIndexTable::new(32, 4).unwrap();
//! let stored = table.signature_from_tokens(&["the", "quick", "brown", "fox"]).unwrap();
//! table.insert(&stored).unwrap();
//!
//! let query = table.signature_from_tokens(&["the", "quick", "brown", "fox"]).unwrap();
//! assert!(table.lookup(&query).unwrap().contains(&stored));
//! ```

mod backend;
mod band;
mod query;

use std::time::Instant;

use hashbrown::HashSet;
use perceptual::{generate_signature_with, PerceptualError, Signature, SignatureConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::backend::BandStore;

pub use band::{split_into_bands, BandLayout};
pub use query::expand_chunk;

/// Bump this value whenever the [`IndexSnapshot`] layout changes.
pub const SNAPSHOT_VERSION: u16 = 1;

/// Table parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Signature width in bits.
    pub hash_iter: usize,
    /// Number of bands the signature is cut into; `chunk_size = hash_iter / radius`.
    pub radius: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            hash_iter: 32,
            radius: 4,
        }
    }
}

impl IndexConfig {
    pub fn new(hash_iter: usize, radius: usize) -> Self {
        Self { hash_iter, radius }
    }

    pub fn with_hash_iter(mut self, hash_iter: usize) -> Self {
        self.hash_iter = hash_iter;
        self
    }

    pub fn with_radius(mut self, radius: usize) -> Self {
        self.radius = radius;
        self
    }

    /// Bits per band chunk; meaningful only for a valid config.
    pub fn chunk_size(&self) -> usize {
        self.hash_iter.checked_div(self.radius).unwrap_or(0)
    }

    /// Validate the parameters and derive the band layout.
    pub fn layout(&self) -> Result<BandLayout, IndexError> {
        if self.hash_iter == 0 {
            return Err(IndexError::InvalidHashIter {
                hash_iter: self.hash_iter,
            });
        }
        if self.radius == 0 || self.radius > self.hash_iter {
            return Err(IndexError::InvalidRadius {
                radius: self.radius,
                hash_iter: self.hash_iter,
            });
        }
        BandLayout::new(self.hash_iter, self.chunk_size())
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        self.layout().map(|_| ())
    }
}

/// Custom error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("invalid config: hash_iter must be >= 1 (got {hash_iter})")]
    InvalidHashIter { hash_iter: usize },
    #[error("invalid config: radius must be in 1..={hash_iter} (got {radius})")]
    InvalidRadius { radius: usize, hash_iter: usize },
    #[error("invalid config: chunk_size must be in 1..={hash_iter} (got {chunk_size})")]
    InvalidChunkSize { chunk_size: usize, hash_iter: usize },
    #[error("signature width mismatch: table expects {expected} bits, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },
    #[error("signature error: {0}")]
    Signature(#[from] PerceptualError),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("invalid snapshot: {0}")]
    Snapshot(String),
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Point-in-time counters for a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub hash_iter: usize,
    pub radius: usize,
    pub chunk_size: usize,
    pub bands: usize,
    /// Distinct chunk values stored per band.
    pub buckets_per_band: Vec<usize>,
    /// Distinct signatures inserted.
    pub signatures: usize,
}

/// Serializable copy of a table's band mappings.
///
/// Each band lists its `(chunk, signatures)` buckets sorted by chunk;
/// bucket order is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub version: u16,
    pub config: IndexConfig,
    pub bands: Vec<Vec<(Signature, Vec<Signature>)>>,
}

/// Banded signature index
pub struct MultiIndexTable {
    cfg: IndexConfig,
    layout: BandLayout,
    store: BandStore,
}

impl MultiIndexTable {
    /// Table for `hash_iter`-bit signatures cut into `radius` bands.
    pub fn new(hash_iter: usize, radius: usize) -> Result<Self, IndexError> {
        Self::with_config(IndexConfig::new(hash_iter, radius))
    }

    /// Build an empty table; invalid parameters are rejected here, not on
    /// first use.
    pub fn with_config(cfg: IndexConfig) -> Result<Self, IndexError> {
        let layout = cfg.layout()?;
        Ok(Self {
            cfg,
            layout,
            store: BandStore::new(layout.bands()),
        })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.cfg
    }

    pub fn layout(&self) -> &BandLayout {
        &self.layout
    }

    pub fn hash_iter(&self) -> usize {
        self.cfg.hash_iter
    }

    pub fn radius(&self) -> usize {
        self.cfg.radius
    }

    pub fn chunk_size(&self) -> usize {
        self.layout.chunk_size()
    }

    pub fn bands(&self) -> usize {
        self.layout.bands()
    }

    /// Signature of the table's width for `tokens`, using the default seed.
    pub fn signature_from_tokens<S>(&self, tokens: &[S]) -> Result<Signature, IndexError>
    where
        S: AsRef<str> + Sync,
    {
        let cfg = SignatureConfig::default().with_bit_count(self.cfg.hash_iter);
        Ok(generate_signature_with(tokens, &cfg)?)
    }

    /// Store `signature` under its chunk in every band.
    ///
    /// Re-inserting a signature leaves the table unchanged.
    pub fn insert(&self, signature: &Signature) -> Result<(), IndexError> {
        let start = Instant::now();
        let chunks = self.layout.split(signature)?;
        let mut appended = 0usize;
        for (band, chunk) in chunks.into_iter().enumerate() {
            if self.store.put(band, chunk, signature)? {
                appended += 1;
            }
        }
        debug!(
            bands = self.layout.bands(),
            appended,
            elapsed_micros = start.elapsed().as_micros() as u64,
            "index_insert"
        );
        Ok(())
    }

    /// Number of distinct signatures stored.
    ///
    /// Every signature occupies exactly one bucket of band 0, so that band's
    /// entry count is the table size.
    pub fn len(&self) -> Result<usize, IndexError> {
        self.store.entry_count(0)
    }

    pub fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len()? == 0)
    }

    pub fn stats(&self) -> Result<IndexStats, IndexError> {
        let buckets_per_band = (0..self.store.band_count())
            .map(|band| self.store.bucket_count(band))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(IndexStats {
            hash_iter: self.cfg.hash_iter,
            radius: self.cfg.radius,
            chunk_size: self.layout.chunk_size(),
            bands: self.layout.bands(),
            buckets_per_band,
            signatures: self.len()?,
        })
    }

    /// Copy the band mappings out for external persistence.
    pub fn snapshot(&self) -> Result<IndexSnapshot, IndexError> {
        let bands = (0..self.store.band_count())
            .map(|band| self.store.dump(band))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(IndexSnapshot {
            version: SNAPSHOT_VERSION,
            config: self.cfg,
            bands,
        })
    }

    /// Rebuild a table from [`MultiIndexTable::snapshot`] output.
    ///
    /// The config is re-validated, every stored signature must have the
    /// table width and sit under its own chunk, and every band must hold
    /// the same set of signatures.
    pub fn from_snapshot(snapshot: IndexSnapshot) -> Result<Self, IndexError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(IndexError::Snapshot(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        let table = Self::with_config(snapshot.config)?;
        if snapshot.bands.len() != table.bands() {
            return Err(IndexError::Snapshot(format!(
                "expected {} bands, found {}",
                table.bands(),
                snapshot.bands.len()
            )));
        }
        let mut members: Vec<HashSet<Signature>> = vec![HashSet::new(); table.bands()];
        for (band, buckets) in snapshot.bands.into_iter().enumerate() {
            for (chunk, signatures) in buckets {
                for sig in signatures {
                    let chunks = table.layout.split(&sig)?;
                    if chunks[band] != chunk {
                        return Err(IndexError::Snapshot(format!(
                            "signature {sig} filed under chunk {chunk} in band {band}"
                        )));
                    }
                    table.store.put(band, chunk.clone(), &sig)?;
                    members[band].insert(sig);
                }
            }
        }
        for (band, set) in members.iter().enumerate().skip(1) {
            if *set != members[0] {
                return Err(IndexError::Snapshot(format!(
                    "band {band} does not hold the same signatures as band 0"
                )));
            }
        }
        Ok(table)
    }
}
