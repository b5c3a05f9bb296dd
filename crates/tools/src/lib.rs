//! Tool discovery and execution for RagPilot.
//!
//! - [`ToolCatalog`] discovers tools once and caches them.
//! - [`ToolInvoker`] runs one call and never fails.
//! - [`McpToolProvider`] talks to an MCP server over stdio.
//! - `list_files` / `read_file` are built-in tools confined to one directory.

pub mod catalog;
pub mod file_list;
pub mod file_read;
pub mod invoker;
pub mod mcp;
pub mod path;

use std::path::PathBuf;
use std::sync::Arc;

use ragpilot_config::AppConfig;
use ragpilot_core::tool::{ToolProvider, ToolRegistry};

pub use catalog::ToolCatalog;
pub use invoker::ToolInvoker;
pub use mcp::{McpServerConfig, McpToolProvider};

/// A registry holding the built-in file tools, confined to `root`.
pub fn local_registry(root: impl Into<PathBuf>) -> ToolRegistry {
    let root = root.into();
    let mut registry = ToolRegistry::new("local-files");
    registry.register(Box::new(file_list::FileListTool::new(root.clone())));
    registry.register(Box::new(file_read::FileReadTool::new(root)));
    registry
}

/// The tool source selected by `config.tools`.
pub enum ToolSource {
    Local(Arc<ToolRegistry>),
    Mcp(Arc<McpToolProvider>),
}

impl ToolSource {
    pub fn provider(&self) -> Arc<dyn ToolProvider> {
        match self {
            Self::Local(registry) => registry.clone(),
            Self::Mcp(mcp) => mcp.clone(),
        }
    }

    /// Stop any server process backing this source.
    pub async fn shutdown(&self) {
        if let Self::Mcp(mcp) = self {
            mcp.shutdown().await;
        }
    }
}

/// Build the tool source named by `config.tools.source`.
///
/// The MCP server inherits `LOCAL_FILE_PATH` pointing at `tools.root_dir`.
pub fn build_from_config(config: &AppConfig) -> ToolSource {
    let tools = &config.tools;
    match (tools.source.as_str(), &tools.mcp_command) {
        ("mcp", Some(command)) => {
            let server = McpServerConfig::new(command.clone(), tools.mcp_args.clone())
                .with_env("LOCAL_FILE_PATH", tools.root_dir.clone());
            let mut provider = McpToolProvider::new(server);
            if let Some(ms) = config.orchestration.timeout_ms {
                provider = provider.with_request_timeout(std::time::Duration::from_millis(ms));
            }
            ToolSource::Mcp(Arc::new(provider))
        }
        _ => ToolSource::Local(Arc::new(local_registry(&tools.root_dir))),
    }
}
