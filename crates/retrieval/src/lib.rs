//! Knowledge-base retrieval.
//!
//! A query is embedded through the model backend's embedding endpoint,
//! matched against a [`VectorStore`], and the hits rendered by the
//! [`formatter`] either as numbered text blocks for a model or as scored
//! items for a UI.

pub mod error;
pub mod formatter;
pub mod retriever;
pub mod store;

pub use error::RetrievalError;
pub use formatter::{
    Collection, FormatMode, Formatted, ItemType, RawResults, ResultItem, StructuredResult, format,
};
pub use retriever::{RetrievalResponse, Retriever, SearchOptions};
pub use store::{InMemoryVectorStore, VectorStore, cosine_similarity};
