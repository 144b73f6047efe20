//! Heuristic token estimation.
//!
//! Observed chat text is never run through a real tokenizer. Two estimators
//! are provided instead:
//!
//! - [`estimate_precise`] for finished turns: takes the larger of a
//!   word-based and a character-based approximation, then adjusts for code
//!   fences, URLs and non-ASCII script. Undercounting is worse than
//!   overcounting here.
//! - [`estimate_quick`] for in-flight drafts: word count only.

use serde::{Deserialize, Serialize};

use crate::models::TokenCount;

/// Tokens per whitespace-separated word.
pub const TOKENS_PER_WORD: f64 = 1.3;

/// Characters per token for the character-based approximation.
pub const CHARS_PER_TOKEN: f64 = 4.0;

/// Flat surcharge when the text contains a fenced code block.
pub const CODE_FENCE_SURCHARGE: f64 = 10.0;

/// Flat surcharge when the text contains a URL-like substring.
pub const URL_SURCHARGE: f64 = 5.0;

/// Multiplier applied when the text contains non-ASCII characters.
pub const NON_ASCII_MULTIPLIER: f64 = 1.2;

const CODE_FENCE: &str = "```";
const URL_MARKER: &str = "http";

// ============================================================================
// Estimation Mode
// ============================================================================

/// Which estimator an observation path uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EstimationMode {
    /// Finished turn: word/char max plus adjustments.
    #[default]
    Precise,
    /// Draft still being typed: word count only.
    Quick,
}

impl EstimationMode {
    /// Runs the estimator for this mode.
    pub fn estimate(self, text: &str) -> TokenCount {
        match self {
            Self::Precise => estimate_precise(text),
            Self::Quick => estimate_quick(text),
        }
    }

    /// Runs the estimator on a loosely typed value.
    ///
    /// Anything that is not a JSON string counts as zero.
    pub fn estimate_json(self, value: &serde_json::Value) -> TokenCount {
        value
            .as_str()
            .map_or(TokenCount::ZERO, |text| self.estimate(text))
    }
}

impl std::fmt::Display for EstimationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Precise => write!(f, "precise"),
            Self::Quick => write!(f, "quick"),
        }
    }
}

// ============================================================================
// Estimators
// ============================================================================

/// Estimates the token count of a finished turn.
///
/// Returns `0` for empty or whitespace-only text and at least `1` otherwise.
pub fn estimate_precise(text: &str) -> TokenCount {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return TokenCount::ZERO;
    }

    let word_based = word_estimate(trimmed);
    let char_based = (trimmed.chars().count() as f64 / CHARS_PER_TOKEN).ceil();

    let mut tokens = word_based.max(char_based);

    if trimmed.contains(CODE_FENCE) {
        tokens += CODE_FENCE_SURCHARGE;
    }
    if trimmed.contains(URL_MARKER) {
        tokens += URL_SURCHARGE;
    }
    if !trimmed.is_ascii() {
        tokens *= NON_ASCII_MULTIPLIER;
    }

    TokenCount::new((tokens.floor() as u64).max(1))
}

/// Estimates the token count of a draft with the word-count approximation only.
pub fn estimate_quick(text: &str) -> TokenCount {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return TokenCount::ZERO;
    }
    TokenCount::new(word_estimate(trimmed) as u64)
}

/// Precise estimate of a loosely typed value; non-strings count as zero.
pub fn estimate_json(value: &serde_json::Value) -> TokenCount {
    EstimationMode::Precise.estimate_json(value)
}

fn word_estimate(trimmed: &str) -> f64 {
    let words = trimmed.split_whitespace().count();
    (words as f64 * TOKENS_PER_WORD).ceil()
}

// ============================================================================
// Tests
// ============================================================================
