//! boardlens: client core for the team Jira dashboard server.
//!
//! Turns filter selections into canonical server queries, drives the
//! board → timeline refresh sequence (including the cache-miss
//! confirmation branch), aggregates per-assignee metrics into team
//! tables, and projects server payloads into render-ready views. The
//! server side (query engine, cache store, Jira connector) sits behind
//! the [`api::DashboardApi`] trait.

pub mod api;
pub mod config;
pub mod metrics;
pub mod query;
pub mod refresh;
pub mod state;
pub mod types;
pub mod views;

pub use api::{ApiError, DashboardApi, ExportLinks, HttpDashboardApi};
pub use query::{CanonicalQuery, FilterSelection, PeriodWindow, SourceMode};
pub use refresh::{ConfirmLivePull, RefreshOrchestrator, RefreshOutcome};
pub use state::{DashboardState, ViewState};
pub use types::ViewMode;
