//! Model backend clients for RagPilot.
//!
//! All providers implement the `ragpilot_core::Provider` trait and decode
//! backend responses into a `ModelTurn` at this boundary.
//! [`build_from_config`] selects the backend named in the configuration.

pub mod factory;
mod http;
pub mod ollama;
pub mod openai_compat;

pub use factory::build_from_config;
pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
