//! Error taxonomy shared by every stage of the pipeline.
//!
//! Provider errors ([`EmbeddingFailed`](DocentError::EmbeddingFailed),
//! [`ProviderTimeout`](DocentError::ProviderTimeout),
//! [`CompletionFailed`](DocentError::CompletionFailed)) are transient and may
//! be retried by the caller. The rest indicate configuration or data bugs and
//! are fatal to the call (or to startup, for corpus loading).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocentError>;

#[derive(Debug, Error)]
pub enum DocentError {
    /// The tokenizer has no encoding for this model identifier.
    #[error("unknown model: '{model}'")]
    UnknownModel { model: String },

    /// Two embedding vectors of different dimensionality were compared.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("{operation} timed out after {secs}s")]
    ProviderTimeout { operation: &'static str, secs: u64 },

    #[error("completion failed: {0}")]
    CompletionFailed(String),

    /// The persisted corpus file is missing or malformed.
    #[error("failed to load corpus from {path}: {reason}")]
    CorpusLoadFailed { path: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Token ids that do not form valid UTF-8, e.g. a cut inside a character.
    #[error("cannot decode tokens for {model}: {reason}")]
    Decode { model: String, reason: String },

    #[error("query is empty")]
    EmptyQuery,
}

impl DocentError {
    /// True for provider errors that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DocentError::EmbeddingFailed(_)
                | DocentError::ProviderTimeout { .. }
                | DocentError::CompletionFailed(_)
        )
    }

    /// Shorthand for [`DocentError::CorpusLoadFailed`].
    pub fn corpus(path: impl Into<String>, reason: impl Into<String>) -> Self {
        DocentError::CorpusLoadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
