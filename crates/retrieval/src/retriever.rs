//! Query embedding plus vector search, answered as an assistant turn.
//!
//! The retriever never fails outward: a missing query or a backend error
//! becomes the content of the assistant message it appends.

use std::sync::Arc;

use ragpilot_config::RetrievalConfig;
use ragpilot_core::message::{Message, Transcript};
use ragpilot_core::provider::{EmbeddingRequest, Provider, Usage};
use serde::Serialize;

use crate::error::RetrievalError;
use crate::formatter::{self, Collection, RawResults, StructuredResult};
use crate::store::VectorStore;

pub const NO_QUERY: &str = "No query provided.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub collection: Collection,
    pub limit: usize,
    pub include_scores: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            collection: Collection::Chunks,
            limit: 5,
            include_scores: true,
        }
    }
}

impl SearchOptions {
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            collection: Collection::Chunks,
            limit: config.limit,
            include_scores: config.include_scores,
        }
    }

    pub fn with_collection(mut self, collection: Collection) -> Self {
        self.collection = collection;
        self
    }
}

/// A search answer shaped like a model turn.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResponse {
    /// Formatted text, also the content of the appended assistant message.
    pub content: String,
    pub structured: StructuredResult,
    /// Input messages plus the assistant answer.
    pub transcript: Transcript,
    pub model: String,
    /// Approximate: query and content lengths in characters.
    pub usage: Usage,
}

pub struct Retriever {
    provider: Arc<dyn Provider>,
    store: Arc<dyn VectorStore>,
    embedding_model: String,
}

impl Retriever {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn VectorStore>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            embedding_model: embedding_model.into(),
        }
    }

    /// Search one collection for the last user message.
    pub async fn search(&self, messages: Vec<Message>, options: SearchOptions) -> RetrievalResponse {
        let model = format!("retrieval-{}", options.collection);
        let transcript = Transcript::new(messages);
        let Some(query) = query_of(&transcript) else {
            return respond(transcript, NO_QUERY.into(), StructuredResult::default(), model, Usage::default());
        };

        let outcome = async {
            let embedding = self.embed(&query).await?;
            let hits = self
                .store
                .search(options.collection, &embedding, options.limit)
                .await?;
            Ok::<_, RetrievalError>(vec![RawResults::new(options.collection, hits)])
        }
        .await;

        match outcome {
            Ok(batches) => {
                let content = formatter::format_text_results(&batches, options.include_scores);
                let structured = formatter::format_structured_results(&batches);
                tracing::debug!(
                    collection = %options.collection,
                    items = structured.items.len(),
                    "Search complete"
                );
                let usage = approximate_usage(&query, &content);
                respond(transcript, content, structured, model, usage)
            }
            Err(e) => {
                tracing::error!(error = %e, collection = %options.collection, "Knowledge base search failed");
                let content = format!("Error searching knowledge base: {e}");
                respond(transcript, content, StructuredResult::default(), "retrieval-error".into(), Usage::default())
            }
        }
    }

    /// Search pages then chunks with one query embedding.
    pub async fn hybrid_search(
        &self,
        messages: Vec<Message>,
        page_limit: usize,
        chunk_limit: usize,
    ) -> RetrievalResponse {
        let model = "retrieval-hybrid".to_string();
        let transcript = Transcript::new(messages);
        let Some(query) = query_of(&transcript) else {
            return respond(transcript, NO_QUERY.into(), StructuredResult::default(), model, Usage::default());
        };

        let outcome = async {
            let embedding = self.embed(&query).await?;
            let pages = self.store.search(Collection::Pages, &embedding, page_limit).await?;
            let chunks = self.store.search(Collection::Chunks, &embedding, chunk_limit).await?;
            Ok::<_, RetrievalError>(vec![
                RawResults::new(Collection::Pages, pages),
                RawResults::new(Collection::Chunks, chunks),
            ])
        }
        .await;

        match outcome {
            Ok(batches) => {
                let content = formatter::format_text_results(&batches, true);
                let structured = formatter::format_structured_results(&batches);
                let usage = approximate_usage(&query, &content);
                respond(transcript, content, structured, model, usage)
            }
            Err(e) => {
                tracing::error!(error = %e, "Hybrid search failed");
                let content = format!("Error in hybrid search: {e}");
                respond(transcript, content, StructuredResult::default(), "retrieval-error".into(), Usage::default())
            }
        }
    }

    async fn embed(&self, query: &str) -> Result<Vec<f32>, RetrievalError> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.embedding_model.clone(),
                inputs: vec![query.to_string()],
            })
            .await?;
        response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or(RetrievalError::EmptyEmbedding)
    }
}

fn query_of(transcript: &Transcript) -> Option<String> {
    transcript
        .last_user_content()
        .filter(|q| !q.trim().is_empty())
        .map(str::to_string)
}

fn approximate_usage(query: &str, content: &str) -> Usage {
    let len = |s: &str| u32::try_from(s.chars().count()).unwrap_or(u32::MAX);
    Usage::new(len(query), len(content))
}

fn respond(
    mut transcript: Transcript,
    content: String,
    structured: StructuredResult,
    model: String,
    usage: Usage,
) -> RetrievalResponse {
    transcript.push(Message::assistant(content.clone()));
    RetrievalResponse {
        content,
        structured,
        transcript,
        model,
        usage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::{ItemType, NO_RESULTS};
    use crate::store::InMemoryVectorStore;
    use ragpilot_core::error::ProviderError;
    use ragpilot_core::message::Role;
    use ragpilot_core::provider::{EmbeddingResponse, ModelTurn, ProviderRequest};
    use serde_json::{Map, Value, json};
    use std::sync::Mutex;

    /// Embeds every input as a fixed vector and records the inputs.
    struct FixedEmbedder {
        vector: Vec<f32>,
        inputs: Mutex<Vec<String>>,
        fail: bool,
    }

    impl FixedEmbedder {
        fn new(vector: Vec<f32>) -> Self {
            Self {
                vector,
                inputs: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(Vec::new())
            }
        }
    }

    #[async_trait::async_trait]
    impl Provider for FixedEmbedder {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ModelTurn, ProviderError> {
            Err(ProviderError::NotConfigured("completion".into()))
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            if self.fail {
                return Err(ProviderError::Network("connection refused".into()));
            }
            self.inputs.lock().unwrap().extend(request.inputs);
            Ok(EmbeddingResponse {
                embeddings: vec![self.vector.clone()],
                model: request.model,
            })
        }
    }

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn sample_store() -> Arc<InMemoryVectorStore> {
        let mut store = InMemoryVectorStore::new();
        store.insert(
            Collection::Chunks,
            vec![1.0, 0.0],
            obj(json!({"filename": "guide.pdf", "page": 2, "chunk_text": "Install with cargo.", "location": "2.1"})),
        );
        store.insert(
            Collection::Chunks,
            vec![0.0, 1.0],
            obj(json!({"filename": "other.pdf", "page": 9, "chunk_text": "Unrelated."})),
        );
        store.insert(
            Collection::Pages,
            vec![0.6, 0.8],
            obj(json!({"file_id": "guide.pdf", "local_page_num": 2, "summary": "Setup steps"})),
        );
        Arc::new(store)
    }

    fn retriever(provider: FixedEmbedder) -> (Retriever, Arc<FixedEmbedder>) {
        let provider = Arc::new(provider);
        let r = Retriever::new(provider.clone(), sample_store(), "embed-model");
        (r, provider)
    }

    #[tokio::test]
    async fn search_formats_best_chunks() {
        let (r, provider) = retriever(FixedEmbedder::new(vec![1.0, 0.0]));
        let options = SearchOptions {
            limit: 1,
            ..SearchOptions::default()
        };
        let response = r
            .search(vec![Message::user("earlier"), Message::assistant("ok"), Message::user("how to install?")], options)
            .await;

        assert_eq!(*provider.inputs.lock().unwrap(), vec!["how to install?"]);
        assert!(response.content.starts_with("[Result 1] (Similarity: 100.0%)\nSource: guide.pdf (Page 2)\nLocation: 2.1"));
        assert!(!response.content.contains("other.pdf"));
        assert_eq!(response.model, "retrieval-chunks");
        assert_eq!(response.structured.items.len(), 1);
        assert_eq!(response.structured.items[0].kind, ItemType::Chunk);

        assert_eq!(response.transcript.len(), 4);
        let last = response.transcript.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, response.content);

        assert_eq!(response.usage.prompt_tokens, 15);
        assert_eq!(response.usage.completion_tokens as usize, response.content.chars().count());
    }

    #[tokio::test]
    async fn missing_query_short_circuits() {
        let (r, provider) = retriever(FixedEmbedder::new(vec![1.0, 0.0]));
        let response = r.search(vec![Message::system("be brief")], SearchOptions::default()).await;

        assert_eq!(response.content, NO_QUERY);
        assert_eq!(response.usage, Usage::default());
        assert!(provider.inputs.lock().unwrap().is_empty());
        assert_eq!(response.transcript.len(), 2);

        let blank = r.search(vec![Message::user("   ")], SearchOptions::default()).await;
        assert_eq!(blank.content, NO_QUERY);
    }

    #[tokio::test]
    async fn embedding_failure_becomes_content() {
        let (r, _) = retriever(FixedEmbedder::failing());
        let response = r.search(vec![Message::user("anything")], SearchOptions::default()).await;

        assert!(response.content.starts_with("Error searching knowledge base: embedding failed"));
        assert_eq!(response.model, "retrieval-error");
        assert!(response.structured.items.is_empty());
    }

    #[tokio::test]
    async fn dimension_mismatch_becomes_content() {
        let (r, _) = retriever(FixedEmbedder::new(vec![1.0, 0.0, 0.0]));
        let response = r.search(vec![Message::user("q")], SearchOptions::default()).await;
        assert!(response.content.contains("dimensions"));
    }

    #[tokio::test]
    async fn empty_collection_reports_no_results() {
        let provider = Arc::new(FixedEmbedder::new(vec![1.0]));
        let r = Retriever::new(provider, Arc::new(InMemoryVectorStore::new()), "m");
        let response = r.search(vec![Message::user("q")], SearchOptions::default()).await;
        assert_eq!(response.content, NO_RESULTS);
        assert_eq!(response.structured.diagnostics, vec!["no usable chunks results"]);
    }

    #[tokio::test]
    async fn hybrid_combines_pages_and_chunks() {
        let (r, provider) = retriever(FixedEmbedder::new(vec![1.0, 0.0]));
        let response = r.hybrid_search(vec![Message::user("setup")], 2, 5).await;

        assert_eq!(provider.inputs.lock().unwrap().len(), 1);
        assert!(response.content.starts_with("RELEVANT PAGES:\n\n[Result 1] (Similarity: 60.0%)\nFile: guide.pdf"));
        assert!(response.content.contains("DETAILED CONTENT:\n\n[Result 1] (Similarity: 100.0%)"));
        assert_eq!(response.model, "retrieval-hybrid");

        let kinds: Vec<ItemType> = response.structured.items.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![ItemType::Chunk, ItemType::Page, ItemType::Chunk]);
    }

    #[tokio::test]
    async fn hybrid_failure_uses_its_own_prefix() {
        let (r, _) = retriever(FixedEmbedder::failing());
        let response = r.hybrid_search(vec![Message::user("setup")], 2, 5).await;
        assert!(response.content.starts_with("Error in hybrid search:"));
    }

    #[test]
    fn options_from_config() {
        let mut config = RetrievalConfig::default();
        config.limit = 8;
        config.include_scores = false;
        let options = SearchOptions::from_config(&config).with_collection(Collection::Pages);
        assert_eq!(options.limit, 8);
        assert!(!options.include_scores);
        assert_eq!(options.collection, Collection::Pages);
    }
}
