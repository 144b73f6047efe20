//! Status command - today's totals and impact.

use anyhow::Result;
use footprint_core::ImpactSummary;
use tracing::info;

use super::context::AppContext;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the status command.
pub async fn run(cli: &Cli) -> Result<()> {
    let ctx = AppContext::open(cli).await?;
    let ledger = ctx.daily_data().await;
    let goal = ctx.settings.daily_goal();
    ctx.close().await?;
    let ledger = ledger?;

    let summary = ImpactSummary::new(&ledger, goal);
    info!(tokens = ledger.total_tokens, level = %summary.level, "Loaded today's ledger");

    match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_status(&summary));
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&summary)?);
        }
    }

    Ok(())
}
