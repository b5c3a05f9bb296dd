//! Domain event system: observable progress of orchestration runs.
//!
//! The orchestrator publishes events as a run moves through its states.
//! Subscribers (CLI progress output, tests, metrics) react without coupling
//! to the loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// An orchestration run started
    RunStarted {
        run_id: String,
        model: String,
        messages: usize,
        timestamp: DateTime<Utc>,
    },

    /// Tool discovery failed; the run continues without tools
    ToolCatalogUnavailable {
        run_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// The model backend answered one iteration
    ModelResponded {
        run_id: String,
        iteration: u32,
        tool_calls: usize,
        tokens_used: u32,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed (successfully or not)
    ToolExecuted {
        run_id: String,
        tool_name: String,
        tool_call_id: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A run reached a terminal state
    RunFinished {
        run_id: String,
        outcome: String,
        iterations: u32,
        timestamp: DateTime<Utc>,
    },
}

/// Fan-out of run events to any number of listeners.
///
/// Slow listeners lag and lose the oldest events; publishers never block.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// `capacity` events are buffered per listener.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Listen for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
