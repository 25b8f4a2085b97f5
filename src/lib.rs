//! Workspace umbrella crate for lshdup near-duplicate detection.
//!
//! This crate stitches together tokenization, MinHash bit-sampling
//! signatures and the banded multi-index table so callers can index and
//! query raw text through a single API entry point.
//!
//! ```
//! use lshdup::{DedupConfig, DuplicateDetector};
//!
//! let detector = DuplicateDetector::new(&DedupConfig::default()).unwrap();
//! detector.add("the quick brown fox").unwrap();
//!
//! let matches = detector.find_duplicates("the quick brown fox").unwrap();
//! assert_eq!(matches.len(), 1);
//! assert_eq!(matches[0].similarity, 1.0);
//! ```

pub mod config;
mod tokenize;

pub use config::{
    ConfigLoadError, DedupConfig, IndexYamlConfig, MatcherYamlConfig, SignatureYamlConfig,
};
pub use index::{
    BandLayout, IndexConfig, IndexError, IndexSnapshot, IndexStats, MultiIndexTable,
    expand_chunk, split_into_bands,
};
pub use perceptual::{
    PerceptualError, Signature, SignatureConfig, bit_sample, generate_signature,
    generate_signature_with, hamming_distance, hamming_similarity, minhash, minhash_similarity,
};
pub use tokenize::{Tokenizer, WhitespaceTokenizer};

use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while fingerprinting or matching a document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("signature generation failed: {0}")]
    Signature(#[from] PerceptualError),
    #[error("index failure: {0}")]
    Index(#[from] IndexError),
    #[error("invalid detector configuration: {0}")]
    Config(String),
}

impl From<ConfigLoadError> for PipelineError {
    fn from(value: ConfigLoadError) -> Self {
        PipelineError::Config(value.to_string())
    }
}

/// Metrics observer for pipeline stages.
pub trait PipelineMetrics: Send + Sync {
    fn record_signature(&self, latency: Duration, result: Result<(), PerceptualError>);
    fn record_insert(&self, latency: Duration, result: Result<(), IndexError>);
    /// `result` carries the candidate count on success.
    fn record_lookup(&self, latency: Duration, result: Result<usize, IndexError>);
}

/// Install or clear the global pipeline metrics recorder.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

struct MetricsSpan {
    recorder: Arc<dyn PipelineMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    fn record_signature(self, result: Result<(), PerceptualError>) {
        self.recorder.record_signature(self.start.elapsed(), result);
    }

    fn record_insert(self, result: Result<(), IndexError>) {
        self.recorder.record_insert(self.start.elapsed(), result);
    }

    fn record_lookup(self, result: Result<usize, IndexError>) {
        self.recorder.record_lookup(self.start.elapsed(), result);
    }
}

fn signature_for_tokens(
    tokens: &[String],
    cfg: &SignatureConfig,
) -> Result<Signature, PipelineError> {
    let span = MetricsSpan::start();
    let result = generate_signature_with(tokens, cfg);
    if let Some(span) = span {
        span.record_signature(result.as_ref().map(|_| ()).map_err(Clone::clone));
    }
    Ok(result?)
}

/// Tokenize `text` on whitespace and generate its signature.
pub fn process_document(text: &str, cfg: &SignatureConfig) -> Result<Signature, PipelineError> {
    process_document_with(text, &WhitespaceTokenizer, cfg)
}

/// Signature helper that accepts a custom tokenizer.
pub fn process_document_with(
    text: &str,
    tokenizer: &dyn Tokenizer,
    cfg: &SignatureConfig,
) -> Result<Signature, PipelineError> {
    signature_for_tokens(&tokenizer.tokenize(text), cfg)
}

/// A stored signature that survived re-scoring against a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub signature: Signature,
    /// Hamming similarity to the query in `[0, 1]`.
    pub similarity: f64,
    /// Differing bits between the query and `signature`.
    pub distance: usize,
}

/// Text-in, matches-out duplicate detector.
///
/// Candidates from the banded table are re-scored with
/// [`hamming_similarity`] over the full signature width; matches below the
/// configured threshold are dropped and the rest are returned best first.
pub struct DuplicateDetector {
    tokenizer: Box<dyn Tokenizer>,
    signature_cfg: SignatureConfig,
    table: MultiIndexTable,
    threshold: f64,
    max_results: usize,
}

impl DuplicateDetector {
    /// Detector using [`WhitespaceTokenizer`].
    pub fn new(cfg: &DedupConfig) -> Result<Self, PipelineError> {
        Self::with_tokenizer(cfg, WhitespaceTokenizer)
    }

    pub fn with_tokenizer<T>(cfg: &DedupConfig, tokenizer: T) -> Result<Self, PipelineError>
    where
        T: Tokenizer + 'static,
    {
        cfg.validate()?;
        let signature_cfg = cfg.signature_config();
        signature_cfg.validate()?;
        let table = MultiIndexTable::with_config(cfg.index_config())?;
        if table.hash_iter() != signature_cfg.bit_count {
            return Err(PipelineError::Config(format!(
                "signature width {} does not match index width {}",
                signature_cfg.bit_count,
                table.hash_iter()
            )));
        }
        Ok(Self {
            tokenizer: Box::new(tokenizer),
            signature_cfg,
            table,
            threshold: cfg.matcher.threshold,
            max_results: cfg.matcher.max_results,
        })
    }

    pub fn signature_config(&self) -> &SignatureConfig {
        &self.signature_cfg
    }

    pub fn table(&self) -> &MultiIndexTable {
        &self.table
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Signature of `text` under this detector's tokenizer and config.
    pub fn signature(&self, text: &str) -> Result<Signature, PipelineError> {
        signature_for_tokens(&self.tokenizer.tokenize(text), &self.signature_cfg)
    }

    /// Index `text` and return its signature.
    pub fn add(&self, text: &str) -> Result<Signature, PipelineError> {
        let sig = self.signature(text)?;
        self.add_signature(&sig)?;
        Ok(sig)
    }

    pub fn add_signature(&self, signature: &Signature) -> Result<(), PipelineError> {
        let span = MetricsSpan::start();
        let result = self.table.insert(signature);
        if let Some(span) = span {
            span.record_insert(result.clone());
        }
        Ok(result?)
    }

    /// Stored documents that look like duplicates of `text`.
    pub fn find_duplicates(&self, text: &str) -> Result<Vec<DuplicateMatch>, PipelineError> {
        let sig = self.signature(text)?;
        self.find_duplicates_of(&sig)
    }

    pub fn find_duplicates_of(
        &self,
        signature: &Signature,
    ) -> Result<Vec<DuplicateMatch>, PipelineError> {
        let span = MetricsSpan::start();
        let lookup = self.table.lookup(signature);
        if let Some(span) = span {
            span.record_lookup(lookup.as_ref().map(Vec::len).map_err(Clone::clone));
        }
        let candidates = lookup?;
        let candidate_count = candidates.len();

        let width = self.table.hash_iter();
        let mut matches = Vec::new();
        for candidate in candidates {
            let similarity = hamming_similarity(signature, &candidate, width)?;
            if similarity < self.threshold {
                continue;
            }
            let distance = hamming_distance(signature, &candidate)?;
            matches.push(DuplicateMatch {
                signature: candidate,
                similarity,
                distance,
            });
        }
        // Stable: ties keep lookup order.
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(self.max_results);

        debug!(
            candidates = candidate_count,
            matches = matches.len(),
            threshold = self.threshold,
            "duplicates_found"
        );
        Ok(matches)
    }
}
