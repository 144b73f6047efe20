//! Domain models for footprint.
//!
//! ## Submodules
//!
//! - [`ledger`] - Daily ledger aggregate
//! - [`provider`] - Chat sites and API hosts
//! - [`turn`] - Token counts, roles and turn payloads

mod ledger;
mod provider;
mod turn;

pub use ledger::{ArchivedLedger, DailyLedger};
pub use provider::{ApiProvider, ProviderKind, UNKNOWN_PROVIDER};
pub use turn::{PREVIEW_CHARS, Role, TokenCount, TrackTokensPayload};
#[cfg(test)]
mod serde_tests;
