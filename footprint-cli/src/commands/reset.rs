//! Reset command - archive today and start from zero.

use anyhow::Result;
use tracing::info;

use super::context::AppContext;
use crate::{Cli, OutputFormat};

/// Runs the reset command.
pub async fn run(cli: &Cli) -> Result<()> {
    let ctx = AppContext::open(cli).await?;
    let before = ctx.daily_data().await;
    let result = match before {
        Ok(before) => ctx.reset().await.map(|()| before),
        Err(e) => Err(e),
    };
    ctx.close().await?;
    let before = result?;

    info!(date = %before.date, tokens = before.total_tokens, "Ledger reset");

    match cli.format {
        OutputFormat::Text => println!(
            "Archived {} ({} tokens) and reset today's totals",
            before.date.format("%Y-%m-%d"),
            before.total_tokens
        ),
        OutputFormat::Json => println!("{}", serde_json::json!({ "success": true })),
    }

    Ok(())
}
