//! # RagPilot Core
//!
//! Domain types, traits, and error definitions for the RagPilot
//! tool-calling assistant. This crate has **no I/O of its own**; it defines
//! the model that the provider, tool, agent and retrieval crates implement
//! against.
//!
//! ## Seams
//!
//! Every external collaborator is a trait here:
//! - [`Provider`]: the model backend (chat completion + embeddings)
//! - [`ToolProvider`]: an MCP-like tool server (discovery + invocation)
//! - [`Tool`]: an in-process tool, collected in a [`ToolRegistry`]
//!
//! Tests substitute fakes for any of them per run.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, Role, Transcript};
pub use provider::{ModelTurn, Provider, ProviderRequest, ToolDefinition, Usage};
pub use tool::{Tool, ToolCallRequest, ToolDescriptor, ToolProvider, ToolRegistry, ToolResult};
