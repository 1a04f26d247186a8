//! Wire types for the dashboard server payloads.
//!
//! Field names follow the server's snake_case JSON exactly. Everything the
//! server may omit is `Option` or `#[serde(default)]` so a sparse payload
//! never fails to decode; the projection layer owns the display fallbacks.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Gantt lane grouping requested from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// One lane per metric owner.
    #[default]
    Member,
    /// One lane per sprint.
    Sprint,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Member => "member",
            ViewMode::Sprint => "sprint",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(ViewMode::Member),
            "sprint" => Ok(ViewMode::Sprint),
            other => Err(format!("mode must be member or sprint, got '{other}'")),
        }
    }
}

/// Lifecycle instants of a card, as reported by the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardTimeline {
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub product_assigned_at: Option<String>,
    #[serde(default)]
    pub product_assigned_to: Option<String>,
    #[serde(default)]
    pub dev_manager_assigned_at: Option<String>,
    #[serde(default)]
    pub dev_manager_assigned_from: Option<String>,
    #[serde(default)]
    pub dev_manager_assigned_to: Option<String>,
    #[serde(default)]
    pub developer_started_at: Option<String>,
    #[serde(default)]
    pub review_at: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<String>,
}

/// A single board card (one tracked issue).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Card {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub column: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub timeline: CardTimeline,
}

/// One assignee's rollup for the period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricRow {
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub resolved: u32,
    #[serde(default)]
    pub resolved_issue_keys: Vec<String>,
    #[serde(default)]
    pub resolution_rate: f64,
    #[serde(default)]
    pub wip: u32,
    #[serde(default)]
    pub avg_lead_time_hours: Option<f64>,
    #[serde(default)]
    pub weighted_progress: f64,
}

/// Manager summary counters. All optional so missing counters render "-".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerSummaryCards {
    #[serde(default)]
    pub assigned_total: Option<i64>,
    #[serde(default)]
    pub resolved_total: Option<i64>,
    #[serde(default)]
    pub unresolved_total: Option<i64>,
    #[serde(default)]
    pub reopened_event_total: Option<i64>,
    #[serde(default)]
    pub new_issue_total: Option<i64>,
    #[serde(default)]
    pub transfer_out_issue_total: Option<i64>,
    #[serde(default)]
    pub transfer_out_event_total: Option<i64>,
    #[serde(default)]
    pub net_change: Option<i64>,
}

/// Issue-key lists backing the manager summary counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerIssueKeys {
    #[serde(default)]
    pub assigned: Vec<String>,
    #[serde(default)]
    pub resolved: Vec<String>,
    #[serde(default)]
    pub unresolved: Vec<String>,
    #[serde(default)]
    pub reopened: Vec<String>,
    #[serde(default)]
    pub new_issue: Vec<String>,
    #[serde(default)]
    pub transfer_out: Vec<String>,
}

/// Card reopened within the selected period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReopenedItem {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub reopen_count: Option<u32>,
    #[serde(default)]
    pub metric_owner: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub last_reopened_at: Option<String>,
}

/// Card newly created within the selected period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewIssueItem {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub metric_owner: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// One transfer-out record (card left a team after assessment).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferItem {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "from")]
    pub from_owner: Option<String>,
    #[serde(default, rename = "to")]
    pub to_owner: Option<String>,
    #[serde(default)]
    pub event_count: Option<u32>,
    #[serde(default)]
    pub latest_transfer_out_at: Option<String>,
}

/// Transfer-out records grouped per team by the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferTeam {
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub items: Vec<TransferItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReopenedSection {
    #[serde(default)]
    pub items: Vec<ReopenedItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewIssueSection {
    #[serde(default)]
    pub items: Vec<NewIssueItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferSection {
    #[serde(default)]
    pub teams: Vec<TransferTeam>,
}

/// Cards flagged as reopened / newly created / transferred out in the period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeriodFocus {
    #[serde(default)]
    pub reopened: ReopenedSection,
    #[serde(default)]
    pub new_issue: NewIssueSection,
    #[serde(default)]
    pub transfer_out: TransferSection,
}

/// Filter option enumerations computed by the server from the loaded cards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterOptions {
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub priorities: Vec<String>,
}

/// Full board response: kanban columns, metrics, manager summary, focus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardPayload {
    #[serde(default)]
    pub columns: HashMap<String, Vec<Card>>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub metrics: Vec<MetricRow>,
    #[serde(default)]
    pub filters: FilterOptions,
    #[serde(default)]
    pub jql_preview: Option<String>,
    #[serde(default)]
    pub cache_source: Option<String>,
    #[serde(default)]
    pub cache_mode: Option<String>,
    #[serde(default)]
    pub cache_id: Option<String>,
    #[serde(default)]
    pub cache_fallback: bool,
    #[serde(default)]
    pub manager_summary_cards: ManagerSummaryCards,
    #[serde(default)]
    pub manager_summary_issue_keys: ManagerIssueKeys,
    #[serde(default)]
    pub manager_summary_text: Option<String>,
    #[serde(default)]
    pub period_focus: PeriodFocus,
}

/// One gantt row. `start`/`end` are ISO-8601 instants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GanttRow {
    #[serde(default)]
    pub lane: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Timeline (gantt) response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelinePayload {
    #[serde(default)]
    pub rows: Vec<GanttRow>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub jql_preview: Option<String>,
    #[serde(default)]
    pub cache_source: Option<String>,
    #[serde(default)]
    pub cache_fallback: bool,
}

/// One server-side cache entry (a previously executed query's dataset).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSourceEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub issue_count: u32,
    #[serde(default)]
    pub jql_preview: Option<String>,
    #[serde(default)]
    pub custom_jql: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSourcesResponse {
    #[serde(default)]
    pub sources: Vec<CacheSourceEntry>,
}

/// A previously cached query, deduplicated by the server per JQL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CachedQueryEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub issue_count: u32,
    #[serde(default)]
    pub jql_preview: Option<String>,
    #[serde(default)]
    pub custom_jql: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CachedQueriesResponse {
    #[serde(default)]
    pub queries: Vec<CachedQueryEntry>,
    #[serde(default)]
    pub default_jql: Option<String>,
}

/// Acknowledgement of a confirmed live pull.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunQueryResponse {
    #[serde(default)]
    pub issue_count: u32,
    #[serde(default)]
    pub jql_preview: Option<String>,
    #[serde(default)]
    pub cache_file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_board_payload_decodes() {
        let payload: BoardPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.columns.is_empty());
        assert!(payload.metrics.is_empty());
        assert!(!payload.cache_fallback);
        assert!(payload.manager_summary_cards.assigned_total.is_none());
    }

    #[test]
    fn transfer_item_maps_from_to_keywords() {
        let item: TransferItem =
            serde_json::from_str(r#"{"key":"DEV-1","from":"alice","to":"bob","event_count":2}"#)
                .unwrap();
        assert_eq!(item.from_owner.as_deref(), Some("alice"));
        assert_eq!(item.to_owner.as_deref(), Some("bob"));
        assert_eq!(item.event_count, Some(2));
    }

    #[test]
    fn view_mode_round_trip() {
        assert_eq!("member".parse::<ViewMode>().unwrap(), ViewMode::Member);
        assert_eq!("sprint".parse::<ViewMode>().unwrap(), ViewMode::Sprint);
        assert!("week".parse::<ViewMode>().is_err());
        assert_eq!(ViewMode::Sprint.to_string(), "sprint");
    }
}
