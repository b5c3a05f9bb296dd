//! Vector stores.
//!
//! [`VectorStore`] is the seam the retriever searches through. The bundled
//! [`InMemoryVectorStore`] ranks by brute-force cosine similarity, which is
//! plenty for indexes that fit in a JSON file.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::RetrievalError;
use crate::formatter::Collection;

/// A searchable index of embedded pages and chunks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Up to `limit` hits from `collection`, best first. Each hit is an
    /// object carrying the stored fields plus a numeric `score`.
    async fn search(
        &self,
        collection: Collection,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<Value>, RetrievalError>;
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 for empty, mismatched, or zero-magnitude vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold((0.0f64, 0.0f64, 0.0f64), |acc, (x, y)| {
        let (x, y) = (f64::from(*x), f64::from(*y));
        (acc.0 + x * y, acc.1 + x * x, acc.2 + y * y)
    });

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

#[derive(Debug, Clone)]
struct Entry {
    embedding: Vec<f32>,
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct IndexFile {
    #[serde(default)]
    pages: Vec<Map<String, Value>>,
    #[serde(default)]
    chunks: Vec<Map<String, Value>>,
}

/// Brute-force cosine search over entries held in memory.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: HashMap<Collection, Vec<Entry>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one entry. `fields` are returned verbatim in search hits.
    pub fn insert(&mut self, collection: Collection, embedding: Vec<f32>, fields: Map<String, Value>) {
        self.collections
            .entry(collection)
            .or_default()
            .push(Entry { embedding, fields });
    }

    pub fn len(&self, collection: Collection) -> usize {
        self.collections.get(&collection).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.collections.values().all(Vec::is_empty)
    }

    /// Parse an index document: `{"pages": [...], "chunks": [...]}` where
    /// every record carries an `embedding` array next to its fields.
    pub fn from_json(source: &str) -> Result<Self, RetrievalError> {
        let index: IndexFile = serde_json::from_str(source).map_err(|e| RetrievalError::Load {
            path: "<inline>".into(),
            reason: e.to_string(),
        })?;

        let mut store = Self::new();
        for (collection, records) in [
            (Collection::Pages, index.pages),
            (Collection::Chunks, index.chunks),
        ] {
            for (position, mut fields) in records.into_iter().enumerate() {
                let embedding = fields
                    .remove("embedding")
                    .and_then(|v| serde_json::from_value::<Vec<f32>>(v).ok())
                    .ok_or_else(|| RetrievalError::Load {
                        path: "<inline>".into(),
                        reason: format!("{collection}[{position}] has no numeric 'embedding' array"),
                    })?;
                store.insert(collection, embedding, fields);
            }
        }
        Ok(store)
    }

    /// Load an index file from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RetrievalError> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RetrievalError::Load {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let store = Self::from_json(&source).map_err(|e| match e {
            RetrievalError::Load { reason, .. } => RetrievalError::Load {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })?;

        tracing::info!(
            path = %path.display(),
            pages = store.len(Collection::Pages),
            chunks = store.len(Collection::Chunks),
            "Loaded vector index"
        );
        Ok(store)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn search(
        &self,
        collection: Collection,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<Value>, RetrievalError> {
        let Some(entries) = self.collections.get(&collection) else {
            return Ok(Vec::new());
        };

        if let Some(stored) = entries.first().map(|e| e.embedding.len())
            && stored != embedding.len()
        {
            return Err(RetrievalError::DimensionMismatch {
                collection,
                query: embedding.len(),
                stored,
            });
        }

        let mut scored: Vec<(f32, &Entry)> = entries
            .iter()
            .map(|entry| (cosine_similarity(embedding, &entry.embedding), entry))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(score, entry)| {
                let mut hit = entry.fields.clone();
                hit.insert("score".into(), Value::from(f64::from(score)));
                Value::Object(hit)
            })
            .collect())
    }
}
