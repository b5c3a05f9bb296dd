//! `read_file` - read a file from the allowed directory.

use std::path::PathBuf;

use async_trait::async_trait;
use ragpilot_core::error::ToolError;
use ragpilot_core::tool::{Tool, ToolArguments, ToolResult};
use tracing::debug;

use crate::path::resolve_within;

pub struct FileReadTool {
    root: PathBuf,
}

impl FileReadTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file from the allowed directory"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "Name of the file to read"
                }
            },
            "required": ["filename"]
        })
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolResult, ToolError> {
        let Some(filename) = arguments.get("filename").and_then(|v| v.as_str()) else {
            return Ok(ToolResult::error("Error: missing required argument 'filename'"));
        };

        let path = match resolve_within(&self.root, filename) {
            Ok(path) => path,
            Err(e) => return Ok(ToolResult::error(format!("Error: {e}"))),
        };

        debug!(path = %path.display(), "Reading file");

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(ToolResult::text(content)),
            Err(e) => Ok(ToolResult::error(format!(
                "Error: failed to read '{filename}': {e}"
            ))),
        }
    }
}
