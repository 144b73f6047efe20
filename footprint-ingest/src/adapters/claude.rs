//! Claude adapter.

use footprint_core::{ProviderKind, Role};
use std::time::Duration;

use super::SiteAdapter;
use crate::element::RenderedElement;

/// Turn recognition for claude.ai.
///
/// Both roles are marked with `data-is-author`; replies still being
/// streamed carry `data-is-streaming="true"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaudeAdapter;

impl SiteAdapter for ClaudeAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn hostnames(&self) -> &'static [&'static str] {
        &["claude.ai"]
    }

    fn settle_timeout(&self) -> Duration {
        Duration::from_secs(2)
    }

    fn classify(&self, element: &RenderedElement) -> Option<Role> {
        match element.attr("data-is-author")? {
            "true" => Some(Role::User),
            "false" => Some(Role::Assistant),
            _ => None,
        }
    }

    fn is_settled(&self, element: &RenderedElement) -> bool {
        !element
            .descendants()
            .iter()
            .any(|el| el.attr_is("data-is-streaming", "true"))
    }
}
