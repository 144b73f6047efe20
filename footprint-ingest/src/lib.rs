// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Footprint Ingest
//!
//! Turn extraction for footprint.
//!
//! This crate turns what a browser sees into [`TrackTokensPayload`]s for the
//! ledger service:
//!
//! - **Site adapters**: one [`SiteAdapter`] per chat site, looked up through
//!   the [`AdapterRegistry`]
//! - **Sessions**: an [`AdapterSession`] per browsing context, owning the
//!   dedupe set and the settle timeout
//! - **Feeds**: JSON-lines [`Observation`] streams
//! - **Requests**: counting calls to known model API hosts
//!
//! ## Usage
//!
//! ```ignore
//! use footprint_ingest::{AdapterSession, SessionOptions, feed};
//! use tokio::sync::mpsc;
//!
//! let (tx, rx) = mpsc::channel(64);
//! let observations = feed::observations(tokio::io::BufReader::new(tokio::io::stdin()));
//! tokio::spawn(AdapterSession::new(SessionOptions::default()).run(observations, tx));
//! let stats = handle.pump(rx).await;
//! ```
//!
//! [`TrackTokensPayload`]: footprint_core::TrackTokensPayload

pub mod adapters;
pub mod element;
pub mod error;
pub mod feed;
pub mod registry;
pub mod request;
pub mod session;

pub use adapters::{
    ChatGptAdapter, ClaudeAdapter, GeminiAdapter, MIN_TURN_CHARS, SiteAdapter,
    collapse_whitespace,
};
pub use element::RenderedElement;
pub use error::IngestError;
pub use registry::AdapterRegistry;
pub use request::{estimate_request_tokens, observe_request, provider_for_url};
pub use session::{AdapterSession, Observation, SessionOptions, SessionStats};

#[cfg(test)]
mod session_tests;
