//! History command - archived days.

use anyhow::Result;
use clap::Args;

use super::context::AppContext;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the history command.
#[derive(Args)]
pub struct HistoryArgs {
    /// Show at most this many days, most recent first.
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

/// Runs the history command.
pub async fn run(args: &HistoryArgs, cli: &Cli) -> Result<()> {
    let ctx = AppContext::open(cli).await?;
    let history = ctx.history().await;
    ctx.close().await?;

    let mut history = history?;
    if let Some(limit) = args.limit {
        history.truncate(limit);
    }

    match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_history(&history));
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&history)?);
        }
    }

    Ok(())
}
