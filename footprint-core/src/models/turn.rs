//! Turn-level types.
//!
//! - [`TokenCount`] - Non-negative token estimate
//! - [`Role`] - Who authored a turn
//! - [`TrackTokensPayload`] - What an adapter submits for one turn

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

use crate::error::CoreError;

// ============================================================================
// Token Count
// ============================================================================

/// Approximate number of tokens in a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenCount(u64);

impl TokenCount {
    /// No tokens.
    pub const ZERO: TokenCount = TokenCount(0);

    /// Wraps a raw count.
    pub const fn new(tokens: u64) -> Self {
        Self(tokens)
    }

    /// Returns the raw count.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns true if no tokens were counted.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<i64> for TokenCount {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| CoreError::NegativeTokens(value))
    }
}

impl From<u64> for TokenCount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Add for TokenCount {
    type Output = TokenCount;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for TokenCount {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for TokenCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl std::fmt::Display for TokenCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Role
// ============================================================================

/// Author of a conversational turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A message typed by the person using the chat.
    User,
    /// A message generated by the model.
    Assistant,
}

impl Role {
    /// Returns the lowercase label used in payloads and dedupe keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" | "input" => Ok(Self::User),
            "assistant" | "output" => Ok(Self::Assistant),
            other => Err(CoreError::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

// ============================================================================
// Track Tokens Payload
// ============================================================================

/// Maximum characters kept in a message preview.
pub const PREVIEW_CHARS: usize = 100;

/// One observed turn submitted to the ledger.
///
/// `tokens` is signed on the wire so a negative count can be rejected at the
/// boundary instead of wrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackTokensPayload {
    /// Estimated tokens for the turn.
    pub tokens: i64,
    /// Provider display name ("ChatGPT", "Claude", "Unknown", ...).
    #[serde(default = "unknown_provider")]
    pub provider: String,
    /// Who authored the turn.
    #[serde(alias = "role")]
    pub message_type: Role,
    /// Observation time in milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Leading characters of the turn. Display only.
    #[serde(default)]
    pub message_preview: String,
    /// Adapter dedupe key, used to drop redelivered turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_key: Option<String>,
}

fn unknown_provider() -> String {
    "Unknown".to_string()
}

impl TrackTokensPayload {
    /// Creates a payload with no preview, timestamp or dedupe key.
    pub fn new(tokens: TokenCount, provider: impl Into<String>, role: Role) -> Self {
        Self {
            tokens: i64::try_from(tokens.get()).unwrap_or(i64::MAX),
            provider: provider.into(),
            message_type: role,
            timestamp: None,
            message_preview: String::new(),
            turn_key: None,
        }
    }

    /// Sets the preview, truncated to [`PREVIEW_CHARS`] characters.
    #[must_use]
    pub fn with_preview(mut self, text: &str) -> Self {
        self.message_preview = text.chars().take(PREVIEW_CHARS).collect();
        self
    }

    /// Sets the dedupe key.
    #[must_use]
    pub fn with_turn_key(mut self, key: impl Into<String>) -> Self {
        self.turn_key = Some(key.into());
        self
    }

    /// Sets the observation timestamp in epoch milliseconds.
    #[must_use]
    pub fn with_timestamp(mut self, millis: i64) -> Self {
        self.timestamp = Some(millis);
        self
    }

    /// Validates the token count.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NegativeTokens`] if the count is negative.
    pub fn token_count(&self) -> Result<TokenCount, CoreError> {
        TokenCount::try_from(self.tokens)
    }
}
