//! Retrieval error types.

use ragpilot_core::error::ProviderError;

use crate::formatter::Collection;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] ProviderError),

    #[error("embedding backend returned no vector")]
    EmptyEmbedding,

    #[error("query has {query} dimensions but collection '{collection}' has {stored}")]
    DimensionMismatch {
        collection: Collection,
        query: usize,
        stored: usize,
    },

    #[error("search failed: {0}")]
    Search(String),

    #[error("failed to load index {path}: {reason}")]
    Load { path: String, reason: String },
}
