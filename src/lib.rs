//! Core pipeline for a macro market dashboard: source adapters for free
//! public endpoints, a fallback-aware fetch orchestrator, a TTL cache that
//! serves stale data rather than failing, and the derived indicators the
//! tiles display.

pub mod config;
pub mod core;
pub mod dashboard;
pub mod error;
pub mod fetcher;
pub mod indicators;
pub mod models;

pub use config::Settings;
pub use dashboard::Dashboard;
pub use error::FetchError;
pub use models::{FetchResult, FetchStatus, NormalizedSeries};
