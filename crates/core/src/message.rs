//! Message and Transcript domain types.
//!
//! These are the value objects that flow through an orchestration run:
//! caller supplies messages → model answers or requests tools → tool results
//! are appended → model answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::tool::{ToolCallRequest, ToolResult};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The model
    Assistant,
    /// System instructions
    System,
    /// Tool execution result
    Tool,
}

/// A single message in a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    #[serde(default = "new_id")]
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content (structured tool payloads are rendered to text)
    #[serde(default)]
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Set on tool messages whose execution failed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            is_error: false,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create an assistant message that requests tool calls.
    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        let mut msg = Self::with_role(Role::Assistant, content);
        msg.tool_calls = calls;
        msg
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a tool result message answering `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, result: &ToolResult) -> Self {
        let mut msg = Self::with_role(Role::Tool, result.content_text());
        msg.tool_call_id = Some(tool_call_id.into());
        msg.is_error = result.is_error;
        msg
    }
}

/// The ordered message sequence of one orchestration run.
///
/// Append-only: there is no way to remove or mutate a message once pushed.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Start a transcript from caller-supplied messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append a tool result for a call emitted earlier in this transcript.
    ///
    /// Fails if no preceding assistant message emitted `tool_call_id`.
    pub fn push_tool_result(&mut self, tool_call_id: &str, result: &ToolResult) -> Result<(), Error> {
        if !self.has_tool_call(tool_call_id) {
            return Err(Error::Internal(format!(
                "tool result references unknown tool_call_id '{tool_call_id}'"
            )));
        }
        self.messages.push(Message::tool_result(tool_call_id, result));
        Ok(())
    }

    /// Whether an assistant message in this transcript emitted `tool_call_id`.
    pub fn has_tool_call(&self, tool_call_id: &str) -> bool {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .flat_map(|m| m.tool_calls.iter())
            .any(|c| c.id == tool_call_id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The content of the last user message, used as a retrieval query.
    pub fn last_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("list files");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "list files");
        assert!(msg.tool_calls.is_empty());
        assert!(!msg.is_error);
    }

    #[test]
    fn tool_result_message_carries_id_and_error_flag() {
        let msg = Message::tool_result("c1", &ToolResult::error("boom"));
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("c1"));
        assert!(msg.is_error);
        assert_eq!(msg.content, "boom");
    }

    #[test]
    fn message_deserializes_from_minimal_json() {
        let msg: Message = serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "hi");
        assert!(!msg.id.is_empty());
    }

    #[test]
    fn error_flag_is_omitted_when_false() {
        let json = serde_json::to_string(&Message::user("x")).unwrap();
        assert!(!json.contains("is_error"));
    }

    #[test]
    fn transcript_rejects_orphan_tool_result() {
        let mut t = Transcript::new(vec![Message::user("hi")]);
        let err = t.push_tool_result("nope", &ToolResult::text("x")).unwrap_err();
        assert!(err.to_string().contains("nope"));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn transcript_accepts_result_for_emitted_call() {
        let mut t = Transcript::new(vec![Message::user("list files")]);
        t.push(Message::assistant_with_calls(
            "",
            vec![ToolCallRequest::new("c1", "list_files", serde_json::json!({}))],
        ));
        t.push_tool_result("c1", &ToolResult::text("[\"a.txt\"]")).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.last().unwrap().tool_call_id.as_deref(), Some("c1"));
    }

    #[test]
    fn last_user_content_skips_other_roles() {
        let t = Transcript::new(vec![
            Message::user("first"),
            Message::assistant("reply"),
            Message::user("second"),
            Message::assistant("reply 2"),
        ]);
        assert_eq!(t.last_user_content(), Some("second"));
    }
}
