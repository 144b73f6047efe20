//! JSON output formatting.

use anyhow::Result;
use footprint_core::{ApiProvider, ImpactQuantity, TokenCount};
use footprint_ingest::SiteAdapter;
use footprint_store::PumpStats;
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// Token estimate output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateOutput {
    pub tokens: u64,
    pub mode: String,
    pub energy_wh: f64,
    pub carbon_grams: f64,
    pub water_ml: f64,
}

/// Site adapter info output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterInfoOutput {
    pub display_name: String,
    pub cli_name: String,
    pub hostnames: Vec<String>,
    pub settle_ms: u64,
    pub tracks_drafts: bool,
    pub enabled: bool,
}

/// Tracked API host output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHostOutput {
    pub provider: String,
    pub hostname: String,
}

/// Providers command output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvidersOutput {
    pub adapters: Vec<AdapterInfoOutput>,
    pub api_hosts: Vec<ApiHostOutput>,
}

/// Ingest outcome output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutput {
    pub recorded: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub unsaved: usize,
    pub queued: usize,
    pub invalid_lines: usize,
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a token estimate.
    pub fn format_estimate(
        &self,
        tokens: TokenCount,
        mode: &str,
        impact: &ImpactQuantity,
    ) -> Result<String> {
        self.format(&EstimateOutput {
            tokens: tokens.get(),
            mode: mode.to_string(),
            energy_wh: impact.energy_wh,
            carbon_grams: impact.carbon_grams,
            water_ml: impact.water_ml,
        })
    }

    /// Formats the adapter and API host lists.
    pub fn format_providers(
        &self,
        adapters: &[(&dyn SiteAdapter, bool)],
        api_hosts: &[ApiProvider],
    ) -> Result<String> {
        let output = ProvidersOutput {
            adapters: adapters
                .iter()
                .map(|(adapter, enabled)| AdapterInfoOutput {
                    display_name: adapter.kind().display_name().to_string(),
                    cli_name: adapter.kind().cli_name().to_string(),
                    hostnames: adapter.hostnames().iter().map(|h| (*h).to_string()).collect(),
                    settle_ms: u64::try_from(adapter.settle_timeout().as_millis())
                        .unwrap_or(u64::MAX),
                    tracks_drafts: adapter.tracks_drafts(),
                    enabled: *enabled,
                })
                .collect(),
            api_hosts: api_hosts
                .iter()
                .map(|p| ApiHostOutput {
                    provider: p.display_name().to_string(),
                    hostname: p.hostname().to_string(),
                })
                .collect(),
        };
        self.format(&output)
    }

    /// Formats the outcome of an ingest run.
    pub fn format_ingest(&self, stats: &PumpStats, invalid_lines: usize) -> Result<String> {
        self.format(&IngestOutput {
            recorded: stats.recorded,
            duplicates: stats.duplicates,
            rejected: stats.rejected,
            unsaved: stats.unsaved,
            queued: stats.queued,
            invalid_lines,
        })
    }
}
