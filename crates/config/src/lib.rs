//! Configuration loading, validation, and management for RagPilot.
//!
//! Loads configuration from `~/.ragpilot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ragpilot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for OpenAI-compatible backends (Ollama needs none)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model backend: "ollama" or "openai"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Chat model
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Ollama backend settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// OpenAI-compatible backend settings
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Orchestration loop limits
    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    /// Where tools come from
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Vector retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "qwen2.5:3b".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    200
}
fn default_true() -> bool {
    true
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("ollama", &self.ollama)
            .field("openai", &self.openai)
            .field("orchestration", &self.orchestration)
            .field("tools", &self.tools)
            .field("retrieval", &self.retrieval)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
}

fn default_ollama_url() -> String {
    "http://localhost:11434".into()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
        }
    }
}

/// Limits for one orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// Maximum model round trips before the run fails
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Per-call timeout for model and tool calls, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Optional system prompt prepended to every run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_max_iterations() -> u32 {
    10
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            timeout_ms: None,
            system_prompt: None,
        }
    }
}

/// Tool source selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// "local" (built-in file tools) or "mcp" (stdio MCP server)
    #[serde(default = "default_tool_source")]
    pub source: String,

    /// Directory the local file tools are confined to
    #[serde(default = "default_root_dir")]
    pub root_dir: String,

    /// Command that starts the MCP server (e.g. "node")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_command: Option<String>,

    /// Arguments for the MCP server command
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mcp_args: Vec<String>,
}

fn default_tool_source() -> String {
    "local".into()
}
fn default_root_dir() -> String {
    ".".into()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            source: default_tool_source(),
            root_dir: default_root_dir(),
            mcp_command: None,
            mcp_args: Vec::new(),
        }
    }
}

/// Vector retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Embedding model used for queries
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// JSON file holding the pages/chunks index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_path: Option<String>,

    /// Results per single-collection search
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Pages in a hybrid search
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,

    /// Chunks in a hybrid search
    #[serde(default = "default_limit")]
    pub chunk_limit: usize,

    /// Annotate text output with similarity scores
    #[serde(default = "default_true")]
    pub include_scores: bool,
}

fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}
fn default_limit() -> usize {
    5
}
fn default_page_limit() -> usize {
    2
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            embedding_model: default_embedding_model(),
            index_path: None,
            limit: default_limit(),
            page_limit: default_page_limit(),
            chunk_limit: default_limit(),
            include_scores: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.ragpilot/config.toml),
    /// then apply environment overrides:
    /// - `RAGPILOT_API_KEY`, then `OPENAI_API_KEY` (only if no key in file)
    /// - `RAGPILOT_PROVIDER`, `RAGPILOT_MODEL`
    /// - `OLLAMA_URL`
    /// - `LOCAL_FILE_PATH` (local tool root)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("RAGPILOT_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(provider) = lookup("RAGPILOT_PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = lookup("RAGPILOT_MODEL") {
            self.model = model;
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.ollama.url = url;
        }
        if let Some(root) = lookup("LOCAL_FILE_PATH") {
            self.tools.root_dir = root;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ragpilot")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if !matches!(self.provider.as_str(), "ollama" | "openai") {
            return Err(ConfigError::ValidationError(format!(
                "unknown provider '{}' (expected \"ollama\" or \"openai\")",
                self.provider
            )));
        }

        if self.orchestration.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "orchestration.max_iterations must be at least 1".into(),
            ));
        }

        match self.tools.source.as_str() {
            "local" => {}
            "mcp" if self.tools.mcp_command.is_none() => {
                return Err(ConfigError::ValidationError(
                    "tools.source = \"mcp\" requires tools.mcp_command".into(),
                ));
            }
            "mcp" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown tools.source '{other}' (expected \"local\" or \"mcp\")"
                )));
            }
        }

        let r = &self.retrieval;
        if r.limit == 0 || r.page_limit == 0 || r.chunk_limit == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval limits must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            ollama: OllamaConfig::default(),
            openai: OpenAiConfig::default(),
            orchestration: OrchestrationConfig::default(),
            tools: ToolsConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
