//! Provider selection from configuration.

use std::sync::Arc;

use ragpilot_config::AppConfig;
use ragpilot_core::provider::Provider;
use tracing::info;

use crate::ollama::OllamaProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the model backend named by `config.provider`.
///
/// Unknown names are rejected by `AppConfig::validate`; anything other than
/// `"openai"` falls through to Ollama.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    match config.provider.as_str() {
        "openai" => {
            info!(base_url = %config.openai.base_url, "Using OpenAI-compatible backend");
            Arc::new(OpenAiCompatProvider::new(
                "openai",
                &config.openai.base_url,
                config.api_key.clone().unwrap_or_default(),
            ))
        }
        _ => {
            info!(url = %config.ollama.url, "Using Ollama backend");
            Arc::new(OllamaProvider::new(&config.ollama.url))
        }
    }
}
