//! `ragpilot config`: configuration management commands.

use clap::Subcommand;
use ragpilot_config::AppConfig;

use super::load_config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (file plus environment)
    Show,
    /// Print the built-in defaults as TOML
    Default,
    /// Print the config file path
    Path,
}

pub async fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let mut config = load_config()?;
            if config.api_key.is_some() {
                config.api_key = Some("***".into());
            }
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Default => println!("{}", AppConfig::default_toml()),
        ConfigAction::Path => println!("{}", config_path().display()),
    }
    Ok(())
}

fn config_path() -> std::path::PathBuf {
    AppConfig::config_dir().join("config.toml")
}
