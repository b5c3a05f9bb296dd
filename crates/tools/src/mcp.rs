//! MCP client over stdio.
//!
//! Speaks newline-delimited JSON-RPC 2.0 to a tool server child process:
//! `initialize`, then the `notifications/initialized` notification, then
//! any number of `tools/list` / `tools/call` requests. The process is
//! spawned lazily on first use and shared by every caller; requests are
//! serialized behind a mutex, so at most one is in flight.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use ragpilot_core::error::ToolError;
use ragpilot_core::tool::{ToolArguments, ToolDescriptor, ToolProvider, ToolResult};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, trace, warn};

const PROTOCOL_VERSION: &str = "2024-11-05";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How to launch the MCP server.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Extra environment for the child (e.g. `LOCAL_FILE_PATH`).
    pub env: Vec<(String, String)>,
}

impl McpServerConfig {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: Vec::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

type Reader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// One live JSON-RPC connection.
struct McpSession {
    reader: Reader,
    writer: Writer,
    child: Option<Child>,
    next_id: u64,
}

impl McpSession {
    fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
        child: Option<Child>,
    ) -> Self {
        Self {
            reader: BufReader::new(Box::new(reader)),
            writer: Box::new(writer),
            child,
            next_id: 1,
        }
    }

    fn spawn(config: &McpServerConfig) -> Result<Self, ToolError> {
        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .envs(config.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            ToolError::Provider(format!(
                "failed to start MCP server '{}': {e}",
                config.command
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ToolError::Provider("failed to open MCP stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ToolError::Provider("failed to open MCP stdout".into()))?;

        Ok(Self::new(stdout, stdin, Some(child)))
    }

    async fn handshake(&mut self) -> Result<(), ToolError> {
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "ragpilot",
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }),
            )
            .await?;

        let server = result["serverInfo"]["name"].as_str().unwrap_or("unknown");
        info!(server, "MCP session initialized");

        self.notify("notifications/initialized", json!({})).await
    }

    async fn write_line(&mut self, message: &Value) -> Result<(), ToolError> {
        let mut line = message.to_string();
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ToolError::Provider(format!("MCP write failed: {e}")))?;
        self.writer
            .flush()
            .await
            .map_err(|e| ToolError::Provider(format!("MCP write failed: {e}")))
    }

    async fn notify(&mut self, method: &str, params: Value) -> Result<(), ToolError> {
        self.write_line(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }))
        .await
    }

    /// Send a request and wait for the response carrying its id.
    ///
    /// Server notifications, responses to abandoned requests, and non-JSON
    /// lines are skipped.
    async fn request(&mut self, method: &str, params: Value) -> Result<Value, ToolError> {
        let id = self.next_id;
        self.next_id += 1;

        trace!(id, method, "MCP request");
        self.write_line(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .await?;

        let mut line = String::new();
        loop {
            line.clear();
            let n = self
                .reader
                .read_line(&mut line)
                .await
                .map_err(|e| ToolError::Provider(format!("MCP read failed: {e}")))?;
            if n == 0 {
                return Err(ToolError::Provider(
                    "MCP server closed the connection".into(),
                ));
            }

            let Ok(message) = serde_json::from_str::<Value>(line.trim()) else {
                debug!(line = line.trim(), "Skipping non-JSON line from MCP server");
                continue;
            };

            if message.get("id").and_then(Value::as_u64) != Some(id) {
                continue;
            }

            if let Some(error) = message.get("error") {
                let msg = error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                return Err(ToolError::Provider(format!("MCP error: {msg}")));
            }

            return Ok(message.get("result").cloned().unwrap_or(Value::Null));
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListToolsResult {
    #[serde(default)]
    tools: Vec<ToolDescriptor>,
    #[serde(default, rename = "nextCursor")]
    next_cursor: Option<String>,
}

/// A [`ToolProvider`] backed by an MCP server child process.
pub struct McpToolProvider {
    name: String,
    config: McpServerConfig,
    request_timeout: Duration,
    session: OnceCell<Mutex<McpSession>>,
}

impl McpToolProvider {
    pub fn new(config: McpServerConfig) -> Self {
        Self {
            name: format!("mcp:{}", config.command),
            config,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session: OnceCell::new(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Connect over an already-open transport instead of spawning a process.
    pub async fn connect(
        name: impl Into<String>,
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Result<Self, ToolError> {
        let mut session = McpSession::new(reader, writer, None);
        session.handshake().await?;
        Ok(Self {
            name: name.into(),
            config: McpServerConfig::new("", Vec::new()),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session: OnceCell::new_with(Some(Mutex::new(session))),
        })
    }

    async fn session(&self) -> Result<&Mutex<McpSession>, ToolError> {
        self.session
            .get_or_try_init(|| async {
                info!(command = %self.config.command, args = ?self.config.args, "Starting MCP server");
                let mut session = McpSession::spawn(&self.config)?;
                tokio::time::timeout(self.request_timeout, session.handshake())
                    .await
                    .map_err(|_| ToolError::Provider("MCP initialize timed out".into()))??;
                Ok::<_, ToolError>(Mutex::new(session))
            })
            .await
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ToolError> {
        let session = self.session().await?;
        let mut session = session.lock().await;
        tokio::time::timeout(self.request_timeout, session.request(method, params))
            .await
            .map_err(|_| ToolError::Provider(format!("MCP request '{method}' timed out")))?
    }

    /// Kill the server process, if one was started.
    pub async fn shutdown(&self) {
        let Some(session) = self.session.get() else {
            return;
        };
        let mut session = session.lock().await;
        if let Some(child) = session.child.as_mut() {
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to stop MCP server");
            } else {
                info!("MCP server stopped");
            }
        }
    }
}

#[async_trait]
impl ToolProvider for McpToolProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = match &cursor {
                Some(c) => json!({ "cursor": c }),
                None => json!({}),
            };
            let result = self
                .request("tools/list", params)
                .await
                .map_err(|e| ToolError::CatalogUnavailable(e.to_string()))?;
            let page: ListToolsResult = serde_json::from_value(result).map_err(|e| {
                ToolError::CatalogUnavailable(format!("invalid tools/list result: {e}"))
            })?;

            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: &ToolArguments) -> Result<ToolResult, ToolError> {
        let result = self
            .request(
                "tools/call",
                json!({
                    "name": name,
                    "arguments": arguments,
                }),
            )
            .await?;

        Ok(ToolResult {
            content: result.get("content").cloned().unwrap_or(Value::Null),
            is_error: result
                .get("isError")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }
}
