//! Gemini and Bard adapter.
//!
//! Both hosts render replies the same way and never expose rendered user
//! turns, so user queries are counted from submitted drafts instead.

use footprint_core::{ProviderKind, Role};
use std::time::Duration;

use super::SiteAdapter;
use crate::element::RenderedElement;

const RESPONSE_CLASS: &str = "model-response-text";

/// Turn recognition for gemini.google.com and its bard.google.com predecessor.
#[derive(Debug, Clone, Copy)]
pub struct GeminiAdapter {
    kind: ProviderKind,
}

impl GeminiAdapter {
    /// Adapter for gemini.google.com.
    pub const fn gemini() -> Self {
        Self {
            kind: ProviderKind::Gemini,
        }
    }

    /// Adapter for bard.google.com.
    pub const fn bard() -> Self {
        Self {
            kind: ProviderKind::Bard,
        }
    }
}

impl SiteAdapter for GeminiAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn hostnames(&self) -> &'static [&'static str] {
        match self.kind {
            ProviderKind::Bard => &["bard.google.com"],
            _ => &["gemini.google.com"],
        }
    }

    fn settle_timeout(&self) -> Duration {
        Duration::from_secs(2)
    }

    fn tracks_drafts(&self) -> bool {
        true
    }

    fn classify(&self, element: &RenderedElement) -> Option<Role> {
        element.has_class(RESPONSE_CLASS).then_some(Role::Assistant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_responses_classify() {
        let adapter = GeminiAdapter::gemini();
        let reply = RenderedElement::new("div")
            .with_class(RESPONSE_CLASS)
            .with_text("Paris is the capital.");
        assert_eq!(adapter.classify(&reply), Some(Role::Assistant));
        assert_eq!(adapter.classify(&RenderedElement::new("div").with_text("Hi")), None);
    }

    #[test]
    fn test_hosts_per_kind() {
        assert_eq!(GeminiAdapter::gemini().hostnames(), &["gemini.google.com"]);
        assert_eq!(GeminiAdapter::bard().hostnames(), &["bard.google.com"]);
        assert_eq!(GeminiAdapter::bard().kind(), ProviderKind::Bard);
        assert!(GeminiAdapter::bard().tracks_drafts());
    }
}
