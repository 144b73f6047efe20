//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use footprint_store::{SettingsStore, default_config_dir};
use tracing::info;

use super::context::{load_settings, settings_path};
use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show all settings.
    #[command(visible_alias = "show")]
    List,

    /// Show one setting.
    Get {
        /// Setting name.
        key: String,
    },

    /// Change one setting.
    Set {
        /// Setting name.
        key: String,
        /// New value.
        value: String,
    },

    /// Show configuration paths.
    Path,

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::List => list_config(cli).await,
        ConfigAction::Get { key } => get_key(key, cli).await,
        ConfigAction::Set { key, value } => set_key(key, value, cli).await,
        ConfigAction::Path => show_paths(cli).await,
        ConfigAction::Reset => reset_config(cli).await,
    }
}

async fn list_config(cli: &Cli) -> Result<()> {
    let store = load_settings(cli).await?;

    match cli.format {
        OutputFormat::Text => {
            println!("Footprint Configuration");
            println!("{}", "─".repeat(40));
            println!();
            for key in SettingsStore::keys() {
                println!("{key:<22} {}", store.get_key(key).await?);
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&store.get().await)?);
        }
    }

    Ok(())
}

async fn get_key(key: &str, cli: &Cli) -> Result<()> {
    let store = load_settings(cli).await?;
    let value = store.get_key(key).await?;

    match cli.format {
        OutputFormat::Text => println!("{value}"),
        OutputFormat::Json => println!("{}", serde_json::json!({ key: value })),
    }

    Ok(())
}

async fn set_key(key: &str, value: &str, cli: &Cli) -> Result<()> {
    let store = load_settings(cli).await?;
    store.set_key(key, value).await?;
    store.save().await?;

    let stored = store.get_key(key).await?;
    info!(key, value = %stored, "Setting updated");
    println!("{key} = {stored}");

    Ok(())
}

async fn show_paths(cli: &Cli) -> Result<()> {
    let config_dir = default_config_dir();
    let settings_file = settings_path(cli);
    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => load_settings(cli).await?.get().await.resolved_data_dir(),
    };

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:    {}", config_dir.display());
            println!("Settings file: {}", settings_file.display());
            println!("Ledger dir:    {}", data_dir.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": settings_file.display().to_string(),
                "ledger_dir": data_dir.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

async fn reset_config(cli: &Cli) -> Result<()> {
    let path = settings_path(cli);

    if tokio::fs::try_exists(&path).await? {
        tokio::fs::remove_file(&path).await?;
        info!(path = %path.display(), "Settings reset");
        println!("Configuration reset to defaults");
    } else {
        println!("No configuration file to reset");
    }

    Ok(())
}
