//! The tool-calling orchestration loop.
//!
//! A run alternates between the model and the tools:
//!
//! 1. **Ask** the model, sending the transcript and the tool definitions
//! 2. **If it answers**: the run is complete
//! 3. **If it requests tools**: execute them in order, append each result
//!    under its call id, and go back to step 1
//!
//! The loop is bounded by an iteration cap and can be canceled between
//! calls. Backend failures end the run; tool failures are fed back to the
//! model as error-flagged tool messages.

pub mod arguments;
pub mod orchestrator;
pub mod run;

#[cfg(test)]
mod test_helpers;

pub use arguments::normalize_arguments;
pub use orchestrator::Orchestrator;
pub use run::{DEFAULT_MAX_ITERATIONS, OrchestrationError, RunConfig, RunResult, RunStatus};
pub use tokio_util::sync::CancellationToken;
