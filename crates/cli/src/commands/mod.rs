pub mod chat;
pub mod config_cmd;
pub mod search;
pub mod tools;

use std::sync::Arc;

use ragpilot_agent::Orchestrator;
use ragpilot_config::AppConfig;
use ragpilot_core::event::EventBus;
use ragpilot_tools::{ToolCatalog, ToolSource};

pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Everything a chat session needs, wired from config.
pub(crate) struct Session {
    pub orchestrator: Orchestrator,
    pub catalog: Arc<ToolCatalog>,
    pub tools: ToolSource,
    pub events: Arc<EventBus>,
}

impl Session {
    pub fn from_config(config: &AppConfig) -> Self {
        let provider = ragpilot_providers::build_from_config(config);
        let tools = ragpilot_tools::build_from_config(config);
        let catalog = Arc::new(ToolCatalog::new(tools.provider()));
        let events = Arc::new(EventBus::default());
        let orchestrator = Orchestrator::new(provider, catalog.clone(), events.clone());
        Self {
            orchestrator,
            catalog,
            tools,
            events,
        }
    }
}
