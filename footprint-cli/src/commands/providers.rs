//! Providers command - list site adapters and tracked API hosts.

use anyhow::Result;
use footprint_core::ApiProvider;
use footprint_ingest::{AdapterRegistry, SiteAdapter};
use tracing::info;

use super::context::load_settings;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the providers command.
pub async fn run(cli: &Cli) -> Result<()> {
    info!("Listing providers");

    let settings = load_settings(cli).await?.get().await;
    let adapters: Vec<(&dyn SiteAdapter, bool)> = AdapterRegistry::all()
        .iter()
        .map(|a| (a.as_ref(), settings.is_adapter_enabled(a.kind())))
        .collect();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);

            println!("{}", formatter.format_adapters_header());
            println!("{}", "─".repeat(70));
            for (adapter, enabled) in &adapters {
                println!("{}", formatter.format_adapter_line(*adapter, *enabled));
            }

            println!();
            println!("Tracked API hosts:");
            for provider in ApiProvider::all() {
                println!("  {}", formatter.format_api_line(*provider));
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_providers(&adapters, ApiProvider::all())?);
        }
    }

    Ok(())
}
