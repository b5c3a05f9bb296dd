//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI, OpenRouter, vLLM, LM Studio, and any endpoint exposing
//! `/chat/completions`. Tool-call arguments arrive as JSON text and are kept
//! raw; the orchestrator normalizes them.

use async_trait::async_trait;
use ragpilot_core::error::ProviderError;
use ragpilot_core::message::{Message, Role};
use ragpilot_core::provider::*;
use ragpilot_core::tool::ToolCallRequest;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http;

/// An OpenAI-compatible chat-completion provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: http::client(),
        }
    }

    /// OpenAI's hosted API.
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: role_str(m.role).into(),
                content: Some(m.content.clone()),
                tool_calls: (!m.tool_calls.is_empty()).then(|| {
                    m.tool_calls
                        .iter()
                        .map(|tc| ApiToolCall {
                            id: Some(tc.id.clone()),
                            r#type: Some("function".into()),
                            function: ApiFunction {
                                name: tc.name.clone(),
                                arguments: serde_json::Value::String(
                                    http::arguments_as_string(&tc.arguments),
                                ),
                            },
                        })
                        .collect()
                }),
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn build_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        body
    }

    /// Decode a parsed response body into a `ModelTurn`.
    fn decode_response(api_response: ApiResponse) -> Result<ModelTurn, ProviderError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".into()))?;

        let calls: Vec<ToolCallRequest> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                let id = tc
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
                ToolCallRequest::new(id, tc.function.name, tc.function.arguments)
            })
            .collect();

        let message =
            Message::assistant_with_calls(choice.message.content.unwrap_or_default(), calls);

        let usage = api_response
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(ModelTurn::decode(
            message,
            usage,
            choice.finish_reason.as_deref(),
        ))
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            builder
        } else {
            builder.header("Authorization", format!("Bearer {}", self.api_key))
        }
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
        Role::Tool => "tool",
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ModelTurn, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::build_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;

        let response = http::check_status(&self.name, response).await?;
        let api_response: ApiResponse = http::decode(response).await?;
        Self::decode_response(api_response)
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = serde_json::json!({
            "model": request.model,
            "input": request.inputs,
            "encoding_format": "float",
        });

        debug!(
            provider = %self.name,
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;

        let response = http::check_status(&self.name, response).await?;
        let api_resp: EmbeddingApiResponse = http::decode(response).await?;

        Ok(EmbeddingResponse {
            embeddings: api_resp.data.into_iter().map(|d| d.embedding).collect(),
            model: api_resp.model,
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(http::transport_error)?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let body: serde_json::Value = http::decode(response).await?;
        let models = body["data"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["id"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(http::transport_error)?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    r#type: Option<String>,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    /// Normally a JSON string; some servers send an object.
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_server::serve_once;
    use ragpilot_core::tool::ToolResult;

    #[test]
    fn openai_constructor() {
        let provider = OpenAiCompatProvider::openai("sk-test");
        assert_eq!(provider.name(), "openai");
        assert!(provider.base_url.contains("api.openai.com"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = OpenAiCompatProvider::new("vllm", "http://localhost:8000/v1/", "");
        assert_eq!(provider.base_url, "http://localhost:8000/v1");
    }

    #[test]
    fn tool_calls_are_echoed_with_string_arguments() {
        let msg = Message::assistant_with_calls(
            "",
            vec![ToolCallRequest::new(
                "call_1",
                "read_file",
                serde_json::json!({"filename": "notes.txt"}),
            )],
        );
        let api_msgs = OpenAiCompatProvider::to_api_messages(&[msg]);
        let tc = &api_msgs[0].tool_calls.as_ref().unwrap()[0];
        assert_eq!(tc.function.name, "read_file");
        assert_eq!(
            tc.function.arguments,
            serde_json::json!(r#"{"filename":"notes.txt"}"#)
        );
    }

    #[test]
    fn tool_result_message_conversion() {
        let msg = Message::tool_result("call_1", &ToolResult::text("result data"));
        let api_msgs = OpenAiCompatProvider::to_api_messages(&[msg]);
        assert_eq!(api_msgs[0].role, "tool");
        assert_eq!(api_msgs[0].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(api_msgs[0].content.as_deref(), Some("result data"));
    }

    #[test]
    fn body_includes_tools_only_when_present() {
        let mut request = ProviderRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![Message::user("hi")],
            temperature: 0.7,
            max_tokens: Some(200),
            tools: Vec::new(),
        };
        let body = OpenAiCompatProvider::build_body(&request);
        assert!(body.get("tools").is_none());
        assert_eq!(body["max_tokens"], 200);
        assert_eq!(body["stream"], false);

        request.tools.push(ToolDefinition {
            name: "list_files".into(),
            description: "List all files".into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        });
        let body = OpenAiCompatProvider::build_body(&request);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "list_files");
    }

    #[test]
    fn decode_keeps_raw_string_arguments() {
        let data = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "read_file", "arguments": "{\"filename\":\"a.txt\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20}
        }"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        match OpenAiCompatProvider::decode_response(parsed).unwrap() {
            ModelTurn::ToolRequests { calls, usage, message } => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].id, "call_abc");
                assert_eq!(calls[0].arguments, serde_json::json!("{\"filename\":\"a.txt\"}"));
                assert_eq!(usage.total_tokens, 20);
                assert_eq!(message.content, "");
            }
            other => panic!("expected ToolRequests, got {other:?}"),
        }
    }

    #[test]
    fn decode_missing_call_id_is_synthesized() {
        let data = r#"{"choices":[{"message":{"role":"assistant","tool_calls":[{"function":{"name":"list_files","arguments":"{}"}}]}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        let turn = OpenAiCompatProvider::decode_response(parsed).unwrap();
        let ModelTurn::ToolRequests { calls, .. } = turn else {
            panic!("expected ToolRequests");
        };
        assert!(calls[0].id.starts_with("call_"));
    }

    #[test]
    fn decode_empty_choices_is_malformed() {
        let parsed: ApiResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        let err = OpenAiCompatProvider::decode_response(parsed).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn complete_against_local_server() {
        let (url, handle) = serve_once(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"Two files."},"finish_reason":"stop"}],"usage":{"prompt_tokens":5,"completion_tokens":3,"total_tokens":8}}"#,
        )
        .await;

        let provider = OpenAiCompatProvider::new("test", url, "sk-test");
        let turn = provider
            .complete(ProviderRequest {
                model: "gpt-4o-mini".into(),
                messages: vec![Message::user("what files?")],
                temperature: 0.7,
                max_tokens: None,
                tools: Vec::new(),
            })
            .await
            .unwrap();

        assert!(matches!(turn, ModelTurn::FinalAnswer { .. }));
        assert_eq!(turn.message().content, "Two files.");

        let raw_request = handle.await.unwrap();
        assert!(raw_request.starts_with("POST /chat/completions"));
        assert!(raw_request.to_lowercase().contains("authorization: bearer sk-test"));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let (url, _handle) = serve_once(401, r#"{"error":"bad key"}"#).await;
        let provider = OpenAiCompatProvider::new("test", url, "sk-bad");
        let err = provider
            .complete(ProviderRequest {
                model: "m".into(),
                messages: vec![Message::user("hi")],
                temperature: 0.7,
                max_tokens: None,
                tools: Vec::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
    }

    #[test]
    fn parse_embedding_response() {
        let data = r#"{
            "data": [
                {"embedding": [0.1, 0.2, 0.3], "index": 0},
                {"embedding": [0.4, 0.5, 0.6], "index": 1}
            ],
            "model": "text-embedding-3-small"
        }"#;
        let parsed: EmbeddingApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[1].embedding, vec![0.4, 0.5, 0.6]);
    }
}
