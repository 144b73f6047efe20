//! ChatGPT adapter.

use footprint_core::{ProviderKind, Role};
use std::time::Duration;

use super::{SiteAdapter, fallback_text, key_fragment};
use crate::element::RenderedElement;

const USER_BUBBLE_CLASS: &str = "user-message-bubble-color";
const USER_TEXT_CLASS: &str = "whitespace-pre-wrap";

/// Turn recognition for chatgpt.com.
///
/// Assistant replies are rendered as paragraphs carrying source offsets
/// (`data-start`/`data-end`), which give each one a stable key.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatGptAdapter;

impl SiteAdapter for ChatGptAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ChatGpt
    }

    fn hostnames(&self) -> &'static [&'static str] {
        &["chat.openai.com", "chatgpt.com"]
    }

    fn settle_timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    fn classify(&self, element: &RenderedElement) -> Option<Role> {
        if element.has_class(USER_BUBBLE_CLASS) {
            Some(Role::User)
        } else if element.tag == "p" && element.has_attr("data-start") && element.has_attr("data-end")
        {
            Some(Role::Assistant)
        } else {
            None
        }
    }

    fn extract_text(&self, element: &RenderedElement) -> String {
        if element.has_class(USER_BUBBLE_CLASS) {
            if let Some(inner) = element.find_descendant(|el| el.has_class(USER_TEXT_CLASS)) {
                return inner.text_content();
            }
        }
        fallback_text(element)
    }

    fn dedupe_key(&self, element: &RenderedElement, role: Role, index: usize) -> String {
        match (role, element.attr("data-start"), element.attr("data-end")) {
            (Role::Assistant, Some(start), Some(end)) => format!("assistant-{start}-{end}"),
            _ => format!("user-{index}-{}", key_fragment(&element.text_content())),
        }
    }
}
