//! Site adapters.
//!
//! Each supported chat site has one adapter implementing [`SiteAdapter`].
//! An adapter knows which rendered elements are turns on its site, who
//! authored them, when they have finished rendering, how to read their
//! text, and how to key them for deduplication. Everything else (settling,
//! dedupe bookkeeping, estimation) lives in
//! [`AdapterSession`](crate::session::AdapterSession).
//!
//! | Adapter | Hosts | User turns | Assistant turns | Settle |
//! |---------|-------|------------|-----------------|--------|
//! | ChatGPT | chat.openai.com, chatgpt.com | `.user-message-bubble-color` | `p[data-start][data-end]` | 1 s |
//! | Claude | claude.ai | `[data-is-author="true"]` | `[data-is-author="false"]` | 2 s |
//! | Gemini | gemini.google.com | submitted drafts | `.model-response-text` | 2 s |
//! | Bard | bard.google.com | submitted drafts | `.model-response-text` | 2 s |

mod chatgpt;
mod claude;
mod gemini;

pub use chatgpt::ChatGptAdapter;
pub use claude::ClaudeAdapter;
pub use gemini::GeminiAdapter;

use footprint_core::{ProviderKind, Role};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

use crate::element::RenderedElement;

/// Minimum characters of collapsed text for a turn to count.
pub const MIN_TURN_CHARS: usize = 3;

/// Characters of turn text folded into a dedupe key.
pub const KEY_PREFIX_CHARS: usize = 20;

// ============================================================================
// Adapter Trait
// ============================================================================

/// Site-specific turn recognition.
pub trait SiteAdapter: Send + Sync {
    /// Which site this adapter serves.
    fn kind(&self) -> ProviderKind;

    /// Page hostnames this adapter activates on.
    fn hostnames(&self) -> &'static [&'static str];

    /// How long to wait after a turn appears before reading its text.
    fn settle_timeout(&self) -> Duration;

    /// Whether submitted drafts should be counted as user turns.
    ///
    /// Only adapters that never see rendered user turns opt in, so a turn is
    /// never counted from both its draft and its rendered form.
    fn tracks_drafts(&self) -> bool {
        false
    }

    /// Returns the author if `element` is a turn on this site.
    fn classify(&self, element: &RenderedElement) -> Option<Role>;

    /// Returns false while the element is still being written.
    fn is_settled(&self, _element: &RenderedElement) -> bool {
        true
    }

    /// Reads the turn text, before whitespace collapsing.
    fn extract_text(&self, element: &RenderedElement) -> String {
        fallback_text(element)
    }

    /// Stable identity for a turn, unique within one page session.
    fn dedupe_key(&self, element: &RenderedElement, role: Role, index: usize) -> String {
        format!("{role}-{index}-{}", key_fragment(&element.text_content()))
    }
}

// ============================================================================
// Shared Helpers
// ============================================================================

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap_or_else(|_| unreachable!("static pattern")))
}

/// Collapses whitespace runs to single spaces and trims.
pub fn collapse_whitespace(text: &str) -> String {
    whitespace_run().replace_all(text, " ").trim().to_string()
}

/// First [`KEY_PREFIX_CHARS`] characters with whitespace runs turned into `-`.
pub fn key_fragment(text: &str) -> String {
    let prefix: String = text.chars().take(KEY_PREFIX_CHARS).collect();
    whitespace_run().replace_all(&prefix, "-").into_owned()
}

/// Returns true for page chrome that is never part of a turn's text.
pub fn is_chrome(element: &RenderedElement) -> bool {
    matches!(element.tag.as_str(), "button" | "svg")
        || element.has_class("sr-only")
        || element.attr_is("aria-hidden", "true")
}

/// Text content with buttons, icons and screen-reader-only nodes removed.
pub fn fallback_text(element: &RenderedElement) -> String {
    element.without(&is_chrome).text_content()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b   c "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_key_fragment_truncates_and_dashes() {
        assert_eq!(key_fragment("Hello there  friend, how are you"), "Hello-there-friend,");
        assert_eq!(key_fragment("short"), "short");
    }

    #[test]
    fn test_fallback_strips_chrome() {
        let el = RenderedElement::new("div")
            .with_child(RenderedElement::new("span").with_text("Answer "))
            .with_child(RenderedElement::new("button").with_text("Copy"))
            .with_child(RenderedElement::new("svg").with_text("icon"))
            .with_child(RenderedElement::new("span").with_class("sr-only").with_text("You said:"))
            .with_child(
                RenderedElement::new("span")
                    .with_attr("aria-hidden", "true")
                    .with_text("*"),
            )
            .with_child(RenderedElement::new("span").with_text("text"));

        assert_eq!(fallback_text(&el), "Answer text");
    }
}
