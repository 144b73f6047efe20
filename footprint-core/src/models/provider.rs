//! Provider-related types.
//!
//! - [`ProviderKind`] - Chat sites that have a page adapter
//! - [`ApiProvider`] - API hosts recognised by network observation

use serde::{Deserialize, Serialize};

/// Display label used when a turn cannot be attributed to a known site.
pub const UNKNOWN_PROVIDER: &str = "Unknown";

// ============================================================================
// Provider Kind
// ============================================================================

/// Chat sites with a dedicated page adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI ChatGPT
    ChatGpt,
    /// Anthropic Claude
    Claude,
    /// Google Gemini
    Gemini,
    /// Google Bard (legacy Gemini host)
    Bard,
}

impl ProviderKind {
    /// Returns the display name for this provider.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ChatGpt => "ChatGPT",
            Self::Claude => "Claude",
            Self::Gemini => "Gemini",
            Self::Bard => "Bard",
        }
    }

    /// Returns all available provider kinds.
    pub fn all() -> &'static [ProviderKind] {
        &[Self::ChatGpt, Self::Claude, Self::Gemini, Self::Bard]
    }

    /// Returns the CLI name for this provider (lowercase, no spaces).
    pub fn cli_name(&self) -> &'static str {
        match self {
            Self::ChatGpt => "chatgpt",
            Self::Claude => "claude",
            Self::Gemini => "gemini",
            Self::Bard => "bard",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// API Provider
// ============================================================================

/// Hosted model APIs whose requests can be observed directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiProvider {
    /// api.openai.com
    OpenAI,
    /// api.anthropic.com
    Anthropic,
    /// api.cohere.ai
    Cohere,
    /// api.together.xyz
    Together,
    /// api.replicate.com
    Replicate,
}

impl ApiProvider {
    /// Returns all tracked API providers.
    pub fn all() -> &'static [ApiProvider] {
        &[
            Self::OpenAI,
            Self::Anthropic,
            Self::Cohere,
            Self::Together,
            Self::Replicate,
        ]
    }

    /// Returns the API hostname this provider is recognised by.
    pub fn hostname(&self) -> &'static str {
        match self {
            Self::OpenAI => "api.openai.com",
            Self::Anthropic => "api.anthropic.com",
            Self::Cohere => "api.cohere.ai",
            Self::Together => "api.together.xyz",
            Self::Replicate => "api.replicate.com",
        }
    }

    /// Returns the display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Cohere => "Cohere",
            Self::Together => "Together",
            Self::Replicate => "Replicate",
        }
    }

    /// Looks up a provider by exact hostname.
    ///
    /// Unrecognised hosts return `None`; there is no fallback provider.
    pub fn from_hostname(host: &str) -> Option<Self> {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        Self::all().iter().copied().find(|p| p.hostname() == host)
    }
}

impl std::fmt::Display for ApiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hostname_known() {
        assert_eq!(ApiProvider::from_hostname("api.openai.com"), Some(ApiProvider::OpenAI));
        assert_eq!(
            ApiProvider::from_hostname("API.Anthropic.com"),
            Some(ApiProvider::Anthropic)
        );
        assert_eq!(ApiProvider::from_hostname("api.cohere.ai."), Some(ApiProvider::Cohere));
    }

    #[test]
    fn test_from_hostname_unknown_is_none() {
        assert_eq!(ApiProvider::from_hostname("openai.com"), None);
        assert_eq!(ApiProvider::from_hostname("api.example.com"), None);
        assert_eq!(ApiProvider::from_hostname(""), None);
    }

    #[test]
    fn test_every_provider_roundtrips_through_hostname() {
        for p in ApiProvider::all() {
            assert_eq!(ApiProvider::from_hostname(p.hostname()), Some(*p));
        }
    }

    #[test]
    fn test_provider_kind_names() {
        assert_eq!(ProviderKind::ChatGpt.display_name(), "ChatGPT");
        assert_eq!(ProviderKind::ChatGpt.cli_name(), "chatgpt");
        assert_eq!(ProviderKind::all().len(), 4);
    }
}
