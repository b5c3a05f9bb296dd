//! Tool types and the two tool seams.
//!
//! - [`ToolProvider`] is the boundary to an external, MCP-like tool server:
//!   it lists tool descriptors and executes calls by name.
//! - [`Tool`] is an in-process capability. A [`ToolRegistry`] of tools is
//!   itself a `ToolProvider`, so built-in tools and remote servers are
//!   interchangeable from the orchestrator's point of view.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ToolError;

/// Structured tool arguments after normalization.
pub type ToolArguments = serde_json::Map<String, serde_json::Value>;

/// A tool as advertised by a tool provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name
    pub name: String,

    /// What the tool does (shown to the model)
    #[serde(default)]
    pub description: String,

    /// JSON-schema-like description of the arguments
    #[serde(rename = "inputSchema", alias = "input_schema", default = "empty_schema")]
    pub input_schema: serde_json::Value,
}

fn empty_schema() -> serde_json::Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// A tool call requested by the model inside an assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Call ID, echoed back as the tool message's `tool_call_id`
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments exactly as the backend sent them: either a JSON object or a
    /// string containing serialized JSON.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// The normalized outcome of a tool call. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Text or structured payload (MCP content blocks, JSON, ...)
    pub content: serde_json::Value,

    /// Whether the call failed
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolResult {
    /// A successful plain-text result.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: serde_json::Value::String(content.into()),
            is_error: false,
        }
    }

    /// A failed result carrying an error description.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: serde_json::Value::String(message.into()),
            is_error: true,
        }
    }

    /// Render the payload as text for the transcript.
    ///
    /// Plain strings pass through; MCP `[{type: "text", text}]` blocks are
    /// joined line by line; anything else is serialized as JSON.
    pub fn content_text(&self) -> String {
        match &self.content {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(blocks) => {
                let texts: Vec<&str> = blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
                    .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                    .collect();
                if !texts.is_empty() && texts.len() == blocks.len() {
                    texts.join("\n")
                } else {
                    self.content.to_string()
                }
            }
            other => other.to_string(),
        }
    }
}

/// An external tool server (MCP-like).
///
/// Implementations may perform arbitrary I/O; they must be safe to share
/// between concurrent runs.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// A human-readable name for this provider (e.g. "local-files", "mcp:gdrive").
    fn name(&self) -> &str;

    /// Discover the available tools.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError>;

    /// Execute one tool call.
    ///
    /// Provider-level failures are `Err`; tool-level failures reported by the
    /// server come back as `Ok` with `is_error: true`.
    async fn call_tool(&self, name: &str, arguments: &ToolArguments) -> Result<ToolResult, ToolError>;
}

/// An in-process tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "list_files", "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolResult, ToolError>;

    /// Describe this tool the way a tool provider advertises it.
    fn to_descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters_schema(),
        }
    }
}

/// A registry of in-process tools, served through [`ToolProvider`].
///
/// Tools are kept sorted by name so discovery order is stable.
pub struct ToolRegistry {
    name: String,
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(registry = %self.name, tool = %name, "Replaced existing tool");
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolProvider for ToolRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        Ok(self.tools.values().map(|t| t.to_descriptor()).collect())
    }

    async fn call_tool(&self, name: &str, arguments: &ToolArguments) -> Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(arguments).await
    }
}
