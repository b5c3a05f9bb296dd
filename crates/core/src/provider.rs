//! Provider trait: the abstraction over model backends.
//!
//! A Provider sends a transcript plus tool schemas to a chat-completion
//! endpoint and decodes the answer into a [`ModelTurn`]. The backend's own
//! stop/finish signal is interpreted here, once; nothing downstream inspects
//! backend sentinels.
//!
//! Implementations: Ollama, OpenAI-compatible endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;
use crate::tool::{ToolCallRequest, ToolDescriptor};

/// One request to the model backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "qwen2.5:3b", "gpt-4o")
    pub model: String,

    /// The transcript so far
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A tool definition in the shape the model backend expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

impl From<&ToolDescriptor> for ToolDefinition {
    fn from(descriptor: &ToolDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            parameters: descriptor.input_schema.clone(),
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

/// A decoded model response.
#[derive(Debug, Clone)]
pub enum ModelTurn {
    /// The model is done; `message.content` is the answer.
    FinalAnswer { message: Message, usage: Usage },

    /// The model wants tools run. `message` is the raw assistant turn
    /// (already carrying `calls`) and must be echoed back to the backend.
    /// `calls` may be empty when the backend signalled tool use but sent
    /// nothing usable.
    ToolRequests {
        message: Message,
        calls: Vec<ToolCallRequest>,
        usage: Usage,
    },
}

impl ModelTurn {
    /// Decode an assistant message plus the backend's finish signal.
    ///
    /// Non-empty `tool_calls`, or a finish reason of `"tool_calls"` /
    /// `"tool_use"`, means the model wants tools; anything else is final.
    pub fn decode(message: Message, usage: Usage, finish_reason: Option<&str>) -> Self {
        let wants_tools = !message.tool_calls.is_empty()
            || matches!(finish_reason, Some("tool_calls") | Some("tool_use"));
        if wants_tools {
            let calls = message.tool_calls.clone();
            Self::ToolRequests { message, calls, usage }
        } else {
            Self::FinalAnswer { message, usage }
        }
    }

    pub fn message(&self) -> &Message {
        match self {
            Self::FinalAnswer { message, .. } | Self::ToolRequests { message, .. } => message,
        }
    }

    pub fn usage(&self) -> Usage {
        match self {
            Self::FinalAnswer { usage, .. } | Self::ToolRequests { usage, .. } => *usage,
        }
    }
}

/// An embedding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// The model to use for embeddings (e.g., "nomic-embed-text").
    pub model: String,

    /// The texts to embed.
    pub inputs: Vec<String>,
}

/// An embedding response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The embedding vectors, one per input text.
    pub embeddings: Vec<Vec<f32>>,

    /// Which model was used.
    pub model: String,
}

/// The model backend.
///
/// The orchestrator calls `complete()` without knowing which backend is
/// behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama", "openai").
    fn name(&self) -> &str;

    /// Send a request and decode the response into a [`ModelTurn`].
    ///
    /// No retries: transport and parse failures are returned as-is.
    async fn complete(&self, request: ProviderRequest) -> Result<ModelTurn, ProviderError>;

    /// Generate embeddings for the given texts.
    ///
    /// Default implementation returns an error indicating embeddings aren't supported.
    async fn embed(&self, _request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Err(ProviderError::NotConfigured(format!(
            "Provider '{}' does not support embeddings",
            self.name()
        )))
    }

    /// List available models for this provider.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}
