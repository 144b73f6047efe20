//! Estimate command - token and impact estimate without recording.

use anyhow::Result;
use clap::Args;
use footprint_core::{EstimationMode, to_impact};
use tokio::io::AsyncReadExt;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the estimate command.
#[derive(Args)]
pub struct EstimateArgs {
    /// Text to estimate. Read from stdin when omitted.
    pub text: Option<String>,

    /// Use the quick word-count estimate used for drafts.
    #[arg(long)]
    pub quick: bool,
}

/// Runs the estimate command.
pub async fn run(args: &EstimateArgs, cli: &Cli) -> Result<()> {
    let text = match &args.text {
        Some(text) => text.clone(),
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };

    let mode = if args.quick {
        EstimationMode::Quick
    } else {
        EstimationMode::Precise
    };
    let tokens = mode.estimate(&text);
    let impact = to_impact(tokens);

    match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_estimate(tokens, &impact));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_estimate(tokens, &mode.to_string(), &impact)?);
        }
    }

    Ok(())
}
