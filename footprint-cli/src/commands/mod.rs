//! CLI command implementations.

pub mod config;
pub mod context;
pub mod estimate;
pub mod history;
pub mod ingest;
pub mod providers;
pub mod reset;
pub mod serve;
pub mod status;
pub mod track;
pub mod watch;
