//! `ragpilot chat`: single-message or interactive chat.

use std::sync::Arc;

use clap::Args;
use ragpilot_agent::{CancellationToken, OrchestrationError, RunConfig, RunResult, RunStatus};
use ragpilot_config::AppConfig;
use ragpilot_core::event::DomainEvent;
use ragpilot_core::message::Message;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};

use super::{Session, load_config};

#[derive(Args)]
pub struct ChatArgs {
    /// Send a single message instead of entering interactive mode
    #[arg(short, long)]
    pub message: Option<String>,

    /// Override the configured model
    #[arg(long)]
    pub model: Option<String>,

    /// Maximum model round trips per question
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Per-call timeout for the model and each tool, in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl ChatArgs {
    fn run_config(&self, config: &AppConfig) -> RunConfig {
        let mut run_config = RunConfig::from_config(config);
        if let Some(model) = &self.model {
            run_config.model = model.clone();
        }
        if let Some(max) = self.max_iterations {
            run_config = run_config.with_max_iterations(max);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            run_config = run_config.with_timeout_ms(timeout_ms);
        }
        run_config
    }
}

pub async fn run(args: ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let run_config = args.run_config(&config);
    let session = Session::from_config(&config);
    let progress = spawn_progress(session.events.subscribe());

    let mut history = initial_history(&config);
    let outcome = match args.message {
        Some(message) => {
            history.push(Message::user(message));
            single(&session, history, &run_config).await
        }
        None => interactive(&session, history, &config, &run_config).await,
    };

    progress.abort();
    session.tools.shutdown().await;
    outcome
}

fn initial_history(config: &AppConfig) -> Vec<Message> {
    config
        .orchestration
        .system_prompt
        .iter()
        .map(Message::system)
        .collect()
}

/// Run one question, canceling on Ctrl-C.
async fn ask(
    session: &Session,
    messages: Vec<Message>,
    run_config: &RunConfig,
) -> Result<RunResult, OrchestrationError> {
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let result = session
        .orchestrator
        .run_with_cancel(messages, run_config, cancel)
        .await;
    watcher.abort();

    if let Ok(done) = &result {
        tracing::debug!(
            iterations = done.iterations,
            total_tokens = done.usage.total_tokens,
            "Run finished"
        );
    }
    result
}

async fn single(
    session: &Session,
    messages: Vec<Message>,
    run_config: &RunConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = ask(session, messages, run_config).await?;
    match (result.status, result.final_text) {
        (RunStatus::Completed, Some(text)) => println!("{text}"),
        (RunStatus::Completed, None) => println!(),
        (RunStatus::Canceled, _) => eprintln!("Canceled."),
    }
    Ok(())
}

async fn interactive(
    session: &Session,
    mut history: Vec<Message>,
    config: &AppConfig,
    run_config: &RunConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let tool_names: Vec<String> = match session.catalog.list_tools().await {
        Ok(tools) => tools.into_iter().map(|t| t.name).collect(),
        Err(_) => Vec::new(),
    };

    println!();
    println!("  RagPilot (interactive)");
    println!();
    println!("  Provider:  {}", config.provider);
    println!("  Model:     {}", run_config.model);
    println!(
        "  Tools:     {}",
        if tool_names.is_empty() { "none".to_string() } else { tool_names.join(", ") }
    );
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' to quit; Ctrl+C cancels a running question.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }

        history.push(Message::user(input));
        match ask(session, history.clone(), run_config).await {
            Ok(result) if result.status == RunStatus::Completed => {
                println!();
                for line in result.final_text.as_deref().unwrap_or_default().lines() {
                    println!("  Assistant > {line}");
                }
                println!();
                history = result.transcript.into_messages();
            }
            Ok(_) => {
                eprintln!("  [Canceled]");
                history.pop();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                history.pop();
            }
        }
    }

    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    use std::io::Write;
    print!("  You > ");
    std::io::stdout().flush()
}

/// Print tool activity to stderr as the run progresses.
fn spawn_progress(mut rx: broadcast::Receiver<Arc<DomainEvent>>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match event.as_ref() {
                    DomainEvent::ToolExecuted {
                        tool_name,
                        success,
                        duration_ms,
                        ..
                    } => {
                        let status = if *success { "ok" } else { "failed" };
                        eprintln!("  [tool] {tool_name} {status} ({duration_ms} ms)");
                    }
                    DomainEvent::ToolCatalogUnavailable { error_message, .. } => {
                        eprintln!("  [tools unavailable] {error_message}");
                    }
                    _ => {}
                },
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}
