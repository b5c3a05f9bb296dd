//! Scripted fakes shared by the orchestrator tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use ragpilot_core::error::{ProviderError, ToolError};
use ragpilot_core::message::Message;
use ragpilot_core::provider::{ModelTurn, Provider, ProviderRequest, Usage};
use ragpilot_core::tool::{ToolArguments, ToolCallRequest, ToolDescriptor, ToolProvider, ToolResult};

/// A provider that replays a queue of scripted turns and records every
/// request it receives.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ModelTurn, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    /// Returned once the script runs dry.
    fallback: Option<ModelTurn>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<ModelTurn, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            fallback: None,
            delay: None,
        }
    }

    /// Answers every request with the same turn.
    pub fn always(turn: ModelTurn) -> Self {
        let mut provider = Self::new(Vec::new());
        provider.fallback = Some(turn);
        provider
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ModelTurn, ProviderError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(turn), _) => turn,
            (None, Some(turn)) => Ok(turn.clone()),
            (None, None) => panic!("ScriptedProvider: script exhausted"),
        }
    }
}

pub fn final_answer(text: &str) -> ModelTurn {
    ModelTurn::FinalAnswer {
        message: Message::assistant(text),
        usage: Usage::new(10, 5),
    }
}

pub fn tool_requests(calls: Vec<ToolCallRequest>) -> ModelTurn {
    ModelTurn::ToolRequests {
        message: Message::assistant_with_calls("", calls.clone()),
        calls,
        usage: Usage::new(20, 3),
    }
}

pub fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest::new(id, name, arguments)
}

/// A tool provider that records invocations in order.
pub struct RecordingToolProvider {
    tools: Vec<ToolDescriptor>,
    calls: Mutex<Vec<(String, ToolArguments)>>,
    fail_discovery: bool,
}

impl RecordingToolProvider {
    pub fn new(names: &[&str]) -> Self {
        Self {
            tools: names
                .iter()
                .map(|n| ToolDescriptor {
                    name: n.to_string(),
                    description: format!("{n} tool"),
                    input_schema: serde_json::json!({"type": "object", "properties": {}}),
                })
                .collect(),
            calls: Mutex::new(Vec::new()),
            fail_discovery: false,
        }
    }

    pub fn unavailable() -> Self {
        let mut provider = Self::new(&[]);
        provider.fail_discovery = true;
        provider
    }

    pub fn calls(&self) -> Vec<(String, ToolArguments)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls().into_iter().map(|(n, _)| n).collect()
    }
}

#[async_trait::async_trait]
impl ToolProvider for RecordingToolProvider {
    fn name(&self) -> &str {
        "recording"
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        if self.fail_discovery {
            return Err(ToolError::Provider("tool server unreachable".into()));
        }
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: &ToolArguments) -> Result<ToolResult, ToolError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        match name {
            "broken" => Ok(ToolResult::error("Error: disk on fire")),
            _ if self.tools.iter().any(|t| t.name == name) => {
                Ok(ToolResult::text(format!("{name} output")))
            }
            _ => Err(ToolError::NotFound(name.to_string())),
        }
    }
}
