//! Tool-call argument normalization.
//!
//! Backends disagree on how arguments travel: Ollama sends a JSON object,
//! OpenAI-style servers send a string of serialized JSON, and small models
//! sometimes send nothing at all. Everything is reduced to a JSON object
//! here, before any tool sees it.

use ragpilot_core::error::ToolError;
use ragpilot_core::tool::ToolArguments;
use serde_json::Value;

/// Normalize raw arguments into a JSON object.
///
/// | raw                               | result                  |
/// |-----------------------------------|-------------------------|
/// | object                            | the object              |
/// | string holding a JSON object      | the parsed object       |
/// | `null`, `""`, whitespace-only     | `{}`                    |
/// | anything else                     | `MalformedArguments`    |
pub fn normalize_arguments(raw: &Value) -> Result<ToolArguments, ToolError> {
    match raw {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(ToolArguments::new()),
        Value::String(s) if s.trim().is_empty() => Ok(ToolArguments::new()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ToolError::MalformedArguments(format!(
                "expected a JSON object, got {}",
                kind(&other)
            ))),
            Err(e) => Err(ToolError::MalformedArguments(format!(
                "arguments are not valid JSON: {e}"
            ))),
        },
        other => Err(ToolError::MalformedArguments(format!(
            "expected a JSON object, got {}",
            kind(other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
