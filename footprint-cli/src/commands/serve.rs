//! Serve command - extension message protocol over stdin/stdout.
//!
//! Each input line is one JSON request such as `{"action":"getDailyData"}`;
//! each gets exactly one JSON response line. Malformed lines get a failed
//! acknowledgment rather than ending the session.

use anyhow::{Result, bail};
use footprint_store::{Ack, LedgerHandle, Request, Response};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use super::context::AppContext;
use crate::Cli;

/// Answers one request line.
pub async fn respond(handle: &LedgerHandle, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => handle.dispatch(request).await,
        Err(e) => {
            debug!(error = %e, "Malformed request");
            Response::Ack(Ack::failed(format!("invalid request: {e}")))
        }
    }
}

/// Serves requests from `reader` until it closes, writing responses to `writer`.
pub async fn serve<R, W>(handle: &LedgerHandle, reader: R, mut writer: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut served = 0;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = respond(handle, &line).await;
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
        served += 1;
    }

    Ok(served)
}

/// Runs the serve command.
pub async fn run(cli: &Cli) -> Result<()> {
    let ctx = AppContext::open_host(cli).await?;
    let Some(handle) = ctx.handle().cloned() else {
        let pid = ctx.host().map_or(0, |host| host.pid);
        ctx.close().await?;
        bail!("the ledger is already hosted by process {pid}");
    };
    info!("Serving ledger protocol on stdin");

    let result = serve(&handle, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await;
    ctx.close().await?;

    let served = result?;
    info!(served, "Input closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use footprint_core::ManualClock;
    use footprint_store::{LedgerService, LedgerStore, ServiceConfig};
    use std::sync::Arc;

    async fn handle() -> LedgerHandle {
        let clock = ManualClock::at_noon(chrono::NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        LedgerService::spawn(LedgerStore::in_memory(), Arc::new(clock), ServiceConfig::default())
            .await
    }

    #[tokio::test]
    async fn test_serve_answers_each_line() {
        let handle = handle().await;
        let input = concat!(
            r#"{"action":"trackTokens","data":{"tokens":12,"provider":"Claude","messageType":"user"}}"#,
            "\n",
            "garbage\n",
            "\n",
            r#"{"action":"getDailyData"}"#,
            "\n"
        );
        let mut output = Vec::new();

        let served = serve(&handle, input.as_bytes(), &mut output).await.unwrap();
        assert_eq!(served, 3);

        let lines: Vec<serde_json::Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["success"], true);
        assert_eq!(lines[1]["success"], false);
        assert_eq!(lines[2]["totalTokens"], 12);
        assert_eq!(lines[2]["queries"], 1);
    }
}
