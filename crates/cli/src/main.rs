//! RagPilot CLI: the main entry point.
//!
//! Commands:
//! - `chat`    Ask a question (single message or interactive)
//! - `tools`   List the tools the assistant can call
//! - `search`  Query the knowledge-base index directly
//! - `config`  Show or locate configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "ragpilot",
    about = "RagPilot: a tool-calling assistant over local documents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant
    Chat(commands::chat::ChatArgs),

    /// List the tools the assistant can call
    Tools,

    /// Search the knowledge-base index
    Search(commands::search::SearchArgs),

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config_cmd::ConfigAction,
    },
}

/// Log level used when `RUST_LOG` is unset.
fn default_filter(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so answers on stdout stay pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter(cli.verbose))),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat(args) => commands::chat::run(args).await?,
        Commands::Tools => commands::tools::run().await?,
        Commands::Search(args) => commands::search::run(args).await?,
        Commands::Config { action } => commands::config_cmd::run(action).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_is_info_unless_verbose() {
        assert_eq!(default_filter(false), "info");
        assert_eq!(default_filter(true), "debug");
    }

    #[test]
    fn verbose_flag_is_global() {
        let cli = Cli::try_parse_from(["ragpilot", "tools", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Tools));
    }
}
