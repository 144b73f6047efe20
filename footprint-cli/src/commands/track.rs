//! Track command - record one turn.

use anyhow::{Result, bail};
use clap::Args;
use footprint_core::{EstimationMode, Role, TokenCount, TrackTokensPayload};
use footprint_store::TrackOutcome;
use tracing::info;

use super::context::{AppContext, Submitted};
use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the track command.
#[derive(Args)]
pub struct TrackArgs {
    /// Turn text; its tokens are estimated.
    pub text: Option<String>,

    /// Token count, instead of estimating from text.
    #[arg(long, short = 'n', allow_negative_numbers = true, conflicts_with = "text")]
    pub tokens: Option<i64>,

    /// Who wrote the turn (user or assistant).
    #[arg(long, short, default_value = "user")]
    pub role: Role,

    /// Provider label.
    #[arg(long, short, default_value = "Unknown")]
    pub provider: String,

    /// Use the quick word-count estimate.
    #[arg(long)]
    pub quick: bool,

    /// Dedupe key; a key already recorded today is ignored.
    #[arg(long)]
    pub turn_key: Option<String>,
}

impl TrackArgs {
    fn payload(&self) -> Result<TrackTokensPayload> {
        let mut payload = match (&self.text, self.tokens) {
            (Some(text), _) => {
                let mode = if self.quick {
                    EstimationMode::Quick
                } else {
                    EstimationMode::Precise
                };
                TrackTokensPayload::new(mode.estimate(text), &self.provider, self.role)
                    .with_preview(text)
            }
            (None, Some(tokens)) => {
                let mut payload =
                    TrackTokensPayload::new(TokenCount::ZERO, &self.provider, self.role);
                payload.tokens = tokens;
                payload
            }
            (None, None) => bail!("Provide turn text or --tokens"),
        };
        if let Some(key) = &self.turn_key {
            payload = payload.with_turn_key(key);
        }
        Ok(payload.with_timestamp(chrono::Utc::now().timestamp_millis()))
    }
}

/// Runs the track command.
pub async fn run(args: &TrackArgs, cli: &Cli) -> Result<()> {
    let payload = args.payload()?;
    let ctx = AppContext::open(cli).await?;

    let submitted = ctx.submit(payload.clone()).await;
    let ledger = ctx.daily_data().await;
    ctx.close().await?;
    let (submitted, ledger) = (submitted?, ledger?);

    info!(tokens = payload.tokens, role = %payload.message_type, ?submitted, "Tracked turn");

    match cli.format {
        OutputFormat::Text => match submitted {
            Submitted::Applied(TrackOutcome::Recorded) => println!(
                "Recorded {} tokens ({}). Today: {} tokens",
                payload.tokens, payload.message_type, ledger.total_tokens
            ),
            Submitted::Applied(TrackOutcome::Duplicate) => {
                println!("Already recorded today; skipped");
            }
            Submitted::Queued(pid) => println!(
                "Queued {} tokens ({}) for the running host (pid {pid})",
                payload.tokens, payload.message_type
            ),
        },
        OutputFormat::Json => {
            let output = serde_json::json!({
                "recorded": submitted == Submitted::Applied(TrackOutcome::Recorded),
                "queued": matches!(submitted, Submitted::Queued(_)),
                "tokens": payload.tokens,
                "today": ledger,
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(())
}
