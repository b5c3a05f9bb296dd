//! Tool invoker: executes one call and folds every failure into a result.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ragpilot_core::error::ToolError;
use ragpilot_core::tool::{ToolArguments, ToolProvider, ToolResult};
use tracing::{debug, warn};

/// Runs tool calls against a [`ToolProvider`].
///
/// `invoke` never fails: unknown tools, provider errors, timeouts and
/// server-side `isError` payloads all come back as `ToolResult { is_error: true }`.
#[derive(Clone)]
pub struct ToolInvoker {
    provider: Arc<dyn ToolProvider>,
    timeout: Option<Duration>,
}

impl ToolInvoker {
    pub fn new(provider: Arc<dyn ToolProvider>) -> Self {
        Self {
            provider,
            timeout: None,
        }
    }

    /// Bound each call to `timeout_ms` milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout = timeout_ms.map(Duration::from_millis);
        self
    }

    pub async fn invoke(&self, name: &str, arguments: &ToolArguments) -> ToolResult {
        let start = Instant::now();

        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.provider.call_tool(name, arguments))
                .await
                .unwrap_or_else(|_| {
                    Err(ToolError::Timeout {
                        tool_name: name.to_string(),
                        timeout_ms: limit.as_millis() as u64,
                    })
                }),
            None => self.provider.call_tool(name, arguments).await,
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                if result.is_error {
                    warn!(tool = %name, elapsed_ms, "Tool reported an error");
                } else {
                    debug!(tool = %name, elapsed_ms, "Tool succeeded");
                }
                result
            }
            Err(e) => {
                warn!(tool = %name, elapsed_ms, error = %e, "Tool call failed");
                ToolResult::error(describe(name, &e))
            }
        }
    }
}

fn describe(name: &str, err: &ToolError) -> String {
    match err {
        ToolError::NotFound(_) => format!("Error: Unknown tool: {name}"),
        other => format!("Error: {other}"),
    }
}
