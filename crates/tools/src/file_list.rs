//! `list_files` - list the entries of the allowed directory.

use std::path::PathBuf;

use async_trait::async_trait;
use ragpilot_core::error::ToolError;
use ragpilot_core::tool::{Tool, ToolArguments, ToolResult};

use crate::path::canonical_root;

pub struct FileListTool {
    root: PathBuf,
}

impl FileListTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn entries(&self) -> Result<Vec<String>, String> {
        let root = canonical_root(&self.root).map_err(|e| e.to_string())?;
        let mut dir = tokio::fs::read_dir(&root).await.map_err(|e| e.to_string())?;

        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| e.to_string())? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl Tool for FileListTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List all files in the allowed directory"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: &ToolArguments) -> Result<ToolResult, ToolError> {
        match self.entries().await {
            Ok(names) => {
                let listing = serde_json::to_string_pretty(&names).map_err(|e| {
                    ToolError::ExecutionFailed {
                        tool_name: "list_files".into(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(ToolResult::text(listing))
            }
            Err(reason) => Ok(ToolResult::error(format!("Error: {reason}"))),
        }
    }
}
