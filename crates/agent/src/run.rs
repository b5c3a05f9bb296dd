//! Run configuration and outcomes.

use ragpilot_config::AppConfig;
use ragpilot_core::error::ProviderError;
use ragpilot_core::message::Transcript;
use ragpilot_core::provider::Usage;
use serde::Serialize;

/// Iteration bound used when the caller sets none.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Per-run settings.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub model: String,
    /// Maximum model round trips; `None` means [`DEFAULT_MAX_ITERATIONS`].
    pub max_iterations: Option<u32>,
    /// Per-call timeout for the model and for each tool call.
    pub timeout_ms: Option<u64>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl RunConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_iterations: None,
            timeout_ms: None,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_iterations: Some(config.orchestration.max_iterations),
            timeout_ms: config.orchestration.timeout_ms,
            temperature: config.temperature,
            max_tokens: Some(config.max_tokens),
        }
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn iteration_bound(&self) -> u32 {
        self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Canceled,
}

/// The outcome of a run that did not fail.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub status: RunStatus,
    /// The model's answer; `None` when the run was canceled.
    pub final_text: Option<String>,
    pub transcript: Transcript,
    pub usage: Usage,
    pub iterations: u32,
    pub model: String,
}

/// Fatal run failures. Both variants keep what was accumulated so far.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("model backend failed on iteration {iteration}: {source}")]
    Backend {
        iteration: u32,
        source: ProviderError,
        transcript: Transcript,
        usage: Usage,
    },

    #[error("no final answer after {max_iterations} iterations")]
    IterationBoundExceeded {
        max_iterations: u32,
        transcript: Transcript,
        usage: Usage,
    },
}

impl OrchestrationError {
    pub fn transcript(&self) -> &Transcript {
        match self {
            Self::Backend { transcript, .. } | Self::IterationBoundExceeded { transcript, .. } => {
                transcript
            }
        }
    }

    pub fn usage(&self) -> Usage {
        match self {
            Self::Backend { usage, .. } | Self::IterationBoundExceeded { usage, .. } => *usage,
        }
    }

    /// `true` when the backend could not be reached at all.
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::Backend { source, .. } if source.is_unavailable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bound_is_ten() {
        assert_eq!(RunConfig::new("m").iteration_bound(), 10);
        assert_eq!(RunConfig::new("m").with_max_iterations(3).iteration_bound(), 3);
    }

    #[test]
    fn from_config_copies_limits() {
        let mut app = AppConfig::default();
        app.orchestration.max_iterations = 4;
        app.orchestration.timeout_ms = Some(1500);

        let config = RunConfig::from_config(&app);
        assert_eq!(config.model, "qwen2.5:3b");
        assert_eq!(config.iteration_bound(), 4);
        assert_eq!(config.timeout_ms, Some(1500));
        assert_eq!(config.max_tokens, Some(200));
    }

    #[test]
    fn error_exposes_transcript_and_usage() {
        let err = OrchestrationError::Backend {
            iteration: 2,
            source: ProviderError::Network("connection refused".into()),
            transcript: Transcript::default(),
            usage: Usage::new(5, 5),
        };
        assert!(err.is_backend_unavailable());
        assert_eq!(err.usage().total_tokens, 10);
        assert!(err.transcript().is_empty());
        assert!(err.to_string().contains("iteration 2"));
    }
}
