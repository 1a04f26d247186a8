//! Filter selection and canonical query construction.
//!
//! Every refresh rebuilds the selection into a `CanonicalQuery`: an ordered
//! list of key/value pairs with a fixed schema order, omitting unset fields.
//! The same query feeds the data endpoints and the export links, so the
//! encoding must be deterministic.

use chrono::NaiveDate;

/// Where the server should read issue data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Cache for this query if present, else newest cache.
    Auto,
    /// Always the newest cache entry.
    Latest,
    /// Cache for this query only; miss otherwise.
    Requested,
    /// An explicitly selected cache entry.
    CacheId,
}

impl SourceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMode::Auto => "auto",
            SourceMode::Latest => "latest",
            SourceMode::Requested => "requested",
            SourceMode::CacheId => "cache_id",
        }
    }
}

/// Reporting period preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodWindow {
    Weekly,
    Rolling7d,
    Sprint,
    /// Explicit start/end dates.
    Custom,
}

impl PeriodWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodWindow::Weekly => "weekly",
            PeriodWindow::Rolling7d => "rolling_7d",
            PeriodWindow::Sprint => "sprint",
            PeriodWindow::Custom => "custom",
        }
    }
}

/// The user's current filter choices. Rebuilt fresh for every refresh;
/// never persisted.
///
/// `cache_id` only matters when `source_mode` is [`SourceMode::CacheId`],
/// and `period_start`/`period_end` only when `window` is
/// [`PeriodWindow::Custom`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSelection {
    pub source_mode: Option<SourceMode>,
    pub cache_id: Option<String>,
    pub window: Option<PeriodWindow>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub keyword: Option<String>,
    pub custom_jql: Option<String>,
}

/// Period boundaries are pinned to the team's reporting timezone, UTC+8,
/// regardless of where the client runs.
const PERIOD_START_SUFFIX: &str = "T00:00:00+08:00";
const PERIOD_END_SUFFIX: &str = "T23:59:59+08:00";

impl FilterSelection {
    /// Build the canonical query for this selection. Total: no selection
    /// can fail to encode. Unset or empty fields are omitted entirely.
    pub fn to_query(&self) -> CanonicalQuery {
        let mut query = CanonicalQuery::default();

        if let Some(mode) = self.source_mode {
            query.push("source", mode.as_str());
            if mode == SourceMode::CacheId {
                if let Some(id) = non_empty(self.cache_id.as_deref()) {
                    query.push("cache_id", id);
                }
            }
        }
        if let Some(window) = self.window {
            query.push("window", window.as_str());
        }
        if let Some(date) = self.period_start {
            query.push("start", format!("{}{PERIOD_START_SUFFIX}", date.format("%Y-%m-%d")));
        }
        if let Some(date) = self.period_end {
            query.push("end", format!("{}{PERIOD_END_SUFFIX}", date.format("%Y-%m-%d")));
        }
        if let Some(assignee) = non_empty(self.assignee.as_deref()) {
            query.push("assignee", assignee);
        }
        if let Some(priority) = non_empty(self.priority.as_deref()) {
            query.push("priority", priority);
        }
        if let Some(keyword) = non_empty(self.keyword.as_deref()) {
            query.push("q", keyword);
        }
        if let Some(jql) = non_empty(self.custom_jql.as_deref()) {
            query.push("jql", jql);
        }

        query
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Deterministic key/value encoding of a [`FilterSelection`]. Key order is
/// the fixed schema order, not the order fields were filled in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalQuery {
    pairs: Vec<(&'static str, String)>,
}

impl CanonicalQuery {
    fn push(&mut self, key: &'static str, value: impl Into<String>) {
        self.pairs.push((key, value.into()));
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Value for `key`, if the selection produced one.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Percent-encoded query string, e.g. `source=auto&window=weekly`.
    pub fn to_query_string(&self) -> String {
        self.to_query_string_with(&[])
    }

    /// Query string with extra pairs appended after the canonical ones
    /// (used for `mode` and `confirmed` parameters).
    pub fn to_query_string_with(&self, extra: &[(&str, &str)]) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.pairs {
            serializer.append_pair(key, value);
        }
        for (key, value) in extra {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}
