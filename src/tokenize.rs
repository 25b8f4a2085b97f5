//! Tokenizer seam between raw documents and signature generation.
//!
//! Signatures are only reproducible when tokenization is, so every
//! [`Tokenizer`] must return the same tokens for the same input. Case
//! folding, punctuation stripping and similar normalization belong to the
//! tokenizer implementation, not to the signature layer.

/// Turns a document into an ordered list of normalized tokens.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, document: &str) -> Vec<String>;
}

/// Splits on Unicode whitespace and keeps tokens exactly as written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, document: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut start: Option<usize> = None;

        for (idx, ch) in document.char_indices() {
            if ch.is_whitespace() {
                if let Some(token_start) = start.take() {
                    tokens.push(document[token_start..idx].to_string());
                }
            } else if start.is_none() {
                start = Some(idx);
            }
        }

        if let Some(token_start) = start {
            tokens.push(document[token_start..].to_string());
        }

        tokens
    }
}
