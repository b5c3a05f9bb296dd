//! The orchestration loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use ragpilot_core::error::ProviderError;
use ragpilot_core::event::{DomainEvent, EventBus};
use ragpilot_core::message::{Message, Transcript};
use ragpilot_core::provider::{ModelTurn, Provider, ProviderRequest, ToolDefinition, Usage};
use ragpilot_core::tool::{ToolCallRequest, ToolResult};
use ragpilot_tools::{ToolCatalog, ToolInvoker};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::arguments::normalize_arguments;
use crate::run::{OrchestrationError, RunConfig, RunResult, RunStatus};

const CANCELED_TOOL_MESSAGE: &str = "Error: canceled before execution";

/// Drives one model through repeated tool-calling rounds until it answers.
///
/// Each run:
///
/// 1. starts a transcript from the caller's messages,
/// 2. asks the model for a turn (with the discovered tool definitions),
/// 3. if the turn requests tools, runs them one by one in emission order
///    and appends each result under the originating call id,
/// 4. repeats until the model answers, the iteration bound is hit, the
///    backend fails, or the run is canceled.
///
/// The orchestrator holds no per-run state and can serve concurrent runs.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    catalog: Arc<ToolCatalog>,
    invoker: ToolInvoker,
    event_bus: Arc<EventBus>,
}

/// Mutable state of one run.
struct RunState {
    run_id: String,
    transcript: Transcript,
    usage: Usage,
    iteration: u32,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        catalog: Arc<ToolCatalog>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let invoker = ToolInvoker::new(catalog.provider());
        Self {
            provider,
            catalog,
            invoker,
            event_bus,
        }
    }

    /// Run to completion without external cancellation.
    pub async fn run(
        &self,
        messages: Vec<Message>,
        config: &RunConfig,
    ) -> Result<RunResult, OrchestrationError> {
        self.run_with_cancel(messages, config, CancellationToken::new())
            .await
    }

    /// Run until the model answers or `cancel` fires.
    ///
    /// Cancellation is checked before each model call and before each tool
    /// call; an in-flight call is allowed to finish.
    pub async fn run_with_cancel(
        &self,
        messages: Vec<Message>,
        config: &RunConfig,
        cancel: CancellationToken,
    ) -> Result<RunResult, OrchestrationError> {
        let mut state = RunState {
            run_id: uuid::Uuid::new_v4().to_string(),
            transcript: Transcript::new(messages),
            usage: Usage::default(),
            iteration: 0,
        };
        let max_iterations = config.iteration_bound();

        info!(
            run_id = %state.run_id,
            model = %config.model,
            messages = state.transcript.len(),
            max_iterations,
            "Starting orchestration run"
        );
        self.event_bus.publish(DomainEvent::RunStarted {
            run_id: state.run_id.clone(),
            model: config.model.clone(),
            messages: state.transcript.len(),
            timestamp: Utc::now(),
        });

        let tools = self.discover_tools(&state.run_id).await;
        let invoker = self.invoker.clone().with_timeout_ms(config.timeout_ms);

        loop {
            state.iteration += 1;

            if cancel.is_cancelled() {
                // This iteration never reached the model.
                let completed = state.iteration - 1;
                return Ok(self.canceled(state, config, completed));
            }

            if state.iteration > max_iterations {
                warn!(
                    run_id = %state.run_id,
                    max_iterations,
                    "Iteration bound reached without a final answer"
                );
                self.finished(&state, "bound_exceeded", max_iterations);
                return Err(OrchestrationError::IterationBoundExceeded {
                    max_iterations,
                    transcript: state.transcript,
                    usage: state.usage,
                });
            }

            debug!(run_id = %state.run_id, iteration = state.iteration, "Awaiting model");

            let request = ProviderRequest {
                model: config.model.clone(),
                messages: state.transcript.messages().to_vec(),
                temperature: config.temperature,
                max_tokens: config.max_tokens,
                tools: tools.clone(),
            };

            let turn = match self.call_model(request, config.timeout_ms).await {
                Ok(turn) => turn,
                Err(source) => return Err(self.backend_failure(state, source)),
            };

            state.usage += turn.usage();
            let requested = match &turn {
                ModelTurn::FinalAnswer { .. } => 0,
                ModelTurn::ToolRequests { calls, .. } => calls.len(),
            };
            self.event_bus.publish(DomainEvent::ModelResponded {
                run_id: state.run_id.clone(),
                iteration: state.iteration,
                tool_calls: requested,
                tokens_used: turn.usage().total_tokens,
                timestamp: Utc::now(),
            });

            match turn {
                ModelTurn::FinalAnswer { message, .. } => {
                    let final_text = message.content.clone();
                    state.transcript.push(message);

                    info!(
                        run_id = %state.run_id,
                        iterations = state.iteration,
                        total_tokens = state.usage.total_tokens,
                        "Run completed"
                    );
                    self.finished(&state, "completed", state.iteration);

                    return Ok(RunResult {
                        status: RunStatus::Completed,
                        final_text: Some(final_text),
                        transcript: state.transcript,
                        usage: state.usage,
                        iterations: state.iteration,
                        model: config.model.clone(),
                    });
                }
                ModelTurn::ToolRequests { message, calls, .. } => {
                    state.transcript.push(message);

                    if calls.is_empty() {
                        debug!(
                            run_id = %state.run_id,
                            "Tool use signalled without calls, asking again"
                        );
                        continue;
                    }

                    debug!(run_id = %state.run_id, count = calls.len(), "Executing tool calls");

                    for (index, call) in calls.iter().enumerate() {
                        if cancel.is_cancelled() {
                            let canceled = ToolResult::error(CANCELED_TOOL_MESSAGE);
                            for pending in &calls[index..] {
                                if let Err(e) =
                                    state.transcript.push_tool_result(&pending.id, &canceled)
                                {
                                    return Err(self.backend_failure(
                                        state,
                                        ProviderError::MalformedResponse(e.to_string()),
                                    ));
                                }
                            }
                            let completed = state.iteration;
                            return Ok(self.canceled(state, config, completed));
                        }

                        let result = self.execute_call(&state.run_id, call, &invoker).await;
                        if let Err(e) = state.transcript.push_tool_result(&call.id, &result) {
                            return Err(self.backend_failure(
                                state,
                                ProviderError::MalformedResponse(e.to_string()),
                            ));
                        }
                    }
                }
            }
        }
    }

    async fn discover_tools(&self, run_id: &str) -> Vec<ToolDefinition> {
        match self.catalog.definitions().await {
            Ok(tools) => {
                debug!(run_id = %run_id, count = tools.len(), "Tools available");
                tools
            }
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "Continuing without tools");
                self.event_bus.publish(DomainEvent::ToolCatalogUnavailable {
                    run_id: run_id.to_string(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                Vec::new()
            }
        }
    }

    async fn call_model(
        &self,
        request: ProviderRequest,
        timeout_ms: Option<u64>,
    ) -> Result<ModelTurn, ProviderError> {
        match timeout_ms {
            Some(ms) => {
                tokio::time::timeout(Duration::from_millis(ms), self.provider.complete(request))
                    .await
                    .unwrap_or_else(|_| {
                        Err(ProviderError::Timeout(format!(
                            "no response from '{}' within {ms}ms",
                            self.provider.name()
                        )))
                    })
            }
            None => self.provider.complete(request).await,
        }
    }

    async fn execute_call(
        &self,
        run_id: &str,
        call: &ToolCallRequest,
        invoker: &ToolInvoker,
    ) -> ToolResult {
        let start = Instant::now();

        let result = match normalize_arguments(&call.arguments) {
            Ok(arguments) => invoker.invoke(&call.name, &arguments).await,
            Err(e) => {
                warn!(run_id = %run_id, tool = %call.name, error = %e, "Rejected tool arguments");
                ToolResult::error(format!("Error: {e}"))
            }
        };

        self.event_bus.publish(DomainEvent::ToolExecuted {
            run_id: run_id.to_string(),
            tool_name: call.name.clone(),
            tool_call_id: call.id.clone(),
            success: !result.is_error,
            duration_ms: start.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });

        result
    }

    fn backend_failure(&self, state: RunState, source: ProviderError) -> OrchestrationError {
        warn!(
            run_id = %state.run_id,
            iteration = state.iteration,
            error = %source,
            "Model backend failed"
        );
        self.finished(&state, "backend_error", state.iteration);
        OrchestrationError::Backend {
            iteration: state.iteration,
            source,
            transcript: state.transcript,
            usage: state.usage,
        }
    }

    fn canceled(&self, state: RunState, config: &RunConfig, iterations: u32) -> RunResult {
        info!(run_id = %state.run_id, iterations, "Run canceled");
        self.finished(&state, "canceled", iterations);
        RunResult {
            status: RunStatus::Canceled,
            final_text: None,
            transcript: state.transcript,
            usage: state.usage,
            iterations,
            model: config.model.clone(),
        }
    }

    fn finished(&self, state: &RunState, outcome: &str, iterations: u32) {
        self.event_bus.publish(DomainEvent::RunFinished {
            run_id: state.run_id.clone(),
            outcome: outcome.to_string(),
            iterations,
            timestamp: Utc::now(),
        });
    }
}
