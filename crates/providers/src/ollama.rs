//! Native Ollama provider (`/api/chat`, `/api/embed`, `/api/tags`).
//!
//! Ollama sends tool-call arguments as JSON objects and usually omits call
//! ids, so ids are synthesized here before the turn leaves the provider.

use async_trait::async_trait;
use ragpilot_core::error::ProviderError;
use ragpilot_core::message::{Message, Role};
use ragpilot_core::provider::*;
use ragpilot_core::tool::ToolCallRequest;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http;

pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http::client(),
        }
    }

    /// `http://localhost:11434`
    pub fn local() -> Self {
        Self::new("http://localhost:11434")
    }

    fn to_api_messages(messages: &[Message]) -> Vec<OllamaMessage> {
        messages
            .iter()
            .map(|m| OllamaMessage {
                role: match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => "system",
                    Role::Tool => "tool",
                }
                .into(),
                content: m.content.clone(),
                tool_calls: m
                    .tool_calls
                    .iter()
                    .map(|tc| OllamaToolCall {
                        id: Some(tc.id.clone()),
                        function: OllamaFunction {
                            name: tc.name.clone(),
                            arguments: http::arguments_as_object(&tc.arguments),
                        },
                    })
                    .collect(),
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    fn build_body(request: &ProviderRequest) -> serde_json::Value {
        let mut options = serde_json::json!({ "temperature": request.temperature });
        if let Some(max_tokens) = request.max_tokens {
            options["num_predict"] = serde_json::json!(max_tokens);
        }

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "stream": false,
            "options": options,
        });

        if !request.tools.is_empty() {
            let tools: Vec<serde_json::Value> = request
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = serde_json::Value::Array(tools);
        }

        body
    }

    fn decode_response(resp: ChatResponse) -> ModelTurn {
        let calls: Vec<ToolCallRequest> = resp
            .message
            .tool_calls
            .into_iter()
            .map(|tc| {
                let id = tc
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
                ToolCallRequest::new(id, tc.function.name, tc.function.arguments)
            })
            .collect();

        let message = Message::assistant_with_calls(resp.message.content, calls);
        let usage = Usage::new(resp.prompt_eval_count, resp.eval_count);

        ModelTurn::decode(message, usage, resp.done_reason.as_deref())
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ModelTurn, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = Self::build_body(&request);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending Ollama chat request"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;

        let response = http::check_status("ollama", response).await?;
        let chat: ChatResponse = http::decode(response).await?;
        Ok(Self::decode_response(chat))
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        let url = format!("{}/api/embed", self.base_url);
        let body = serde_json::json!({
            "model": request.model,
            "input": request.inputs,
        });

        debug!(model = %request.model, count = request.inputs.len(), "Sending Ollama embed request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;

        let response = http::check_status("ollama", response).await?;
        let embed: EmbedResponse = http::decode(response).await?;

        Ok(EmbeddingResponse {
            embeddings: embed.embeddings,
            model: embed.model.unwrap_or(request.model),
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(http::transport_error)?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let tags: TagsResponse = http::decode(response).await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(http::transport_error)?;

        Ok(response.status().is_success())
    }
}

// --- Ollama API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    function: OllamaFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: OllamaMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    model: Option<String>,
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}
