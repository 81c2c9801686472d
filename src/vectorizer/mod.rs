//! Text vectorization and feature matrix assembly.
//!
//! [`TfidfVectorizer`] learns a bounded n-gram vocabulary over normalized
//! snippets. [`matrix`] glues its output to the keyword columns so that fit
//! and transform build rows through exactly one code path.
pub mod matrix;
pub mod tfidf;
pub mod tokenizer;

pub use matrix::{FeatureMatrix, FeatureRow, fit_transform, transform};
pub use tfidf::TfidfVectorizer;

use thiserror::Error;

/// Sparse vector as `(column, value)` pairs sorted by column.
pub type SparseVector = Vec<(usize, f32)>;

/// Errors that can occur during vectorization.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorizerError {
    #[error("vectorizer has not been fitted")]
    NotFitted,

    #[error("invalid vectorizer configuration: {0}")]
    InvalidConfig(String),
}

/// Trait for text vectorizers.
///
/// Implementations must be `Send + Sync` so a fitted vectorizer can be shared
/// across concurrent scoring calls.
pub trait Vectorizer: Send + Sync {
    /// Vectorize a single (already normalized) text.
    fn transform(&self, text: &str) -> Result<SparseVector, VectorizerError>;

    /// Vectorize multiple texts.
    fn transform_batch(&self, texts: &[&str]) -> Result<Vec<SparseVector>, VectorizerError>;

    /// Number of text columns produced.
    fn dimensions(&self) -> usize;
}
