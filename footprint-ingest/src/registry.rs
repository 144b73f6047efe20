//! Adapter registry.
//!
//! The registry provides static access to every site adapter and is the
//! central point for deciding which adapter, if any, activates on a page.

use footprint_core::ProviderKind;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::adapters::{ChatGptAdapter, ClaudeAdapter, GeminiAdapter, SiteAdapter};

// ============================================================================
// Static Registry
// ============================================================================

/// Static storage for all adapters.
static ADAPTERS: OnceLock<Vec<Box<dyn SiteAdapter>>> = OnceLock::new();

/// Static storage for CLI name to provider kind mapping.
static CLI_NAME_MAP: OnceLock<HashMap<String, ProviderKind>> = OnceLock::new();

/// Extra CLI names accepted for each provider.
const CLI_ALIASES: &[(&str, ProviderKind)] = &[
    ("openai", ProviderKind::ChatGpt),
    ("anthropic", ProviderKind::Claude),
    ("google", ProviderKind::Gemini),
];

fn init_adapters() -> Vec<Box<dyn SiteAdapter>> {
    vec![
        Box::new(ChatGptAdapter),
        Box::new(ClaudeAdapter),
        Box::new(GeminiAdapter::gemini()),
        Box::new(GeminiAdapter::bard()),
    ]
}

fn build_cli_name_map(adapters: &[Box<dyn SiteAdapter>]) -> HashMap<String, ProviderKind> {
    let mut map: HashMap<String, ProviderKind> = adapters
        .iter()
        .map(|a| (a.kind().cli_name().to_string(), a.kind()))
        .collect();

    for (alias, kind) in CLI_ALIASES {
        map.insert((*alias).to_string(), *kind);
    }

    map
}

// ============================================================================
// Adapter Registry
// ============================================================================

/// Global registry of site adapters.
pub struct AdapterRegistry;

impl AdapterRegistry {
    /// Returns all adapters.
    pub fn all() -> &'static [Box<dyn SiteAdapter>] {
        ADAPTERS.get_or_init(init_adapters)
    }

    /// Gets the adapter for a provider.
    pub fn get(kind: ProviderKind) -> Option<&'static dyn SiteAdapter> {
        Self::all().iter().find(|a| a.kind() == kind).map(AsRef::as_ref)
    }

    /// Finds the adapter that activates on a page hostname.
    ///
    /// Matching is exact and case-insensitive; unknown hosts get no adapter.
    pub fn for_host(host: &str) -> Option<&'static dyn SiteAdapter> {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        Self::all()
            .iter()
            .find(|a| a.hostnames().contains(&host.as_str()))
            .map(AsRef::as_ref)
    }

    /// Returns the CLI name to provider kind mapping.
    pub fn cli_name_map() -> &'static HashMap<String, ProviderKind> {
        CLI_NAME_MAP.get_or_init(|| build_cli_name_map(Self::all()))
    }

    /// Looks up an adapter by CLI name or alias.
    pub fn get_by_cli_name(name: &str) -> Option<&'static dyn SiteAdapter> {
        let kind = Self::cli_name_map().get(&name.to_ascii_lowercase())?;
        Self::get(*kind)
    }

    /// Returns all provider kinds with an adapter.
    pub fn kinds() -> Vec<ProviderKind> {
        Self::all().iter().map(|a| a.kind()).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
