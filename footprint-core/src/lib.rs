// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

//! # Footprint Core
//!
//! Core types and pure computations for footprint.
//!
//! This crate has no I/O. It provides:
//!
//! - Token estimation from observed text ([`estimate_precise`], [`estimate_quick`])
//! - The linear impact model ([`to_impact`]) and its derived views
//!   ([`impact_level`], [`comparisons`], [`goal_progress`], [`efficiency_tips`])
//! - The [`DailyLedger`] aggregate
//! - Turn payloads and provider identification
//! - The [`Clock`] abstraction used for calendar-day decisions
//!
//! ## Key Types
//!
//! - [`TokenCount`] - Non-negative token estimate
//! - [`ImpactQuantity`] - Energy, carbon and water for some tokens
//! - [`DailyLedger`] - One day's running totals
//! - [`TrackTokensPayload`] - One observed turn as submitted to the ledger
//! - [`ProviderKind`] / [`ApiProvider`] - Chat sites and API hosts

pub mod clock;
pub mod error;
pub mod estimator;
pub mod impact;
pub mod models;

// Re-export error types
pub use error::CoreError;

pub use clock::{Clock, ManualClock, SystemClock, until_next_midnight};
pub use estimator::{EstimationMode, estimate_json, estimate_precise, estimate_quick};
pub use impact::{
    Comparisons, DEFAULT_DAILY_GOAL_GRAMS, GoalProgress, ImpactLevel, ImpactQuantity,
    ImpactSummary, comparisons, efficiency_tips, format_number, goal_progress, impact_level,
    to_impact,
};

// Re-export all model types
pub use models::{
    ApiProvider, ArchivedLedger, DailyLedger, PREVIEW_CHARS, ProviderKind, Role, TokenCount,
    TrackTokensPayload, UNKNOWN_PROVIDER,
};
