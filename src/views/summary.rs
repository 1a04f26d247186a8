//! Manager summary and period-focus display mapping.
//!
//! Read-through projection with explicit fallbacks: every optional payload
//! field maps to "-" (or "0" for counters) so nothing ever renders empty.

use crate::types::{BoardPayload, ManagerIssueKeys};

/// Manager summary cards plus the issue-key breakdown block.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryView {
    pub assigned: String,
    pub resolved: String,
    pub unresolved: String,
    pub reopened: String,
    pub new_issue: String,
    /// "{issues}个问题 / {events}次"
    pub transfer_out: String,
    pub net_change: String,
    pub summary_text: String,
    /// The 问题号明细 block: header plus six fixed detail lines.
    pub issue_keys_block: String,
}

/// A row of the reopened-issues focus table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReopenedRowView {
    pub key: String,
    pub url: String,
    pub reopen_count: String,
    pub owner: String,
    pub last_reopened_at: String,
}

/// A row of the new-issues focus table.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIssueRowView {
    pub key: String,
    pub url: String,
    pub owner: String,
    pub created_at: String,
    pub status: String,
}

/// A row of the transfer-out focus table (flattened across teams).
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRowView {
    pub key: String,
    pub url: String,
    pub team: String,
    /// "{from} → {to}"
    pub flow: String,
    pub event_count: String,
    pub latest_at: String,
}

/// The three period-focus tables.
#[derive(Debug, Clone, Default)]
pub struct FocusView {
    pub reopened: Vec<ReopenedRowView>,
    pub new_issue: Vec<NewIssueRowView>,
    pub transfer_out: Vec<TransferRowView>,
}

pub fn project_summary(payload: &BoardPayload) -> SummaryView {
    let cards = &payload.manager_summary_cards;
    let transfer_issues = cards.transfer_out_issue_total.unwrap_or(0);
    let transfer_events = cards.transfer_out_event_total.unwrap_or(0);

    SummaryView {
        assigned: count_or_dash(cards.assigned_total),
        resolved: count_or_dash(cards.resolved_total),
        unresolved: count_or_dash(cards.unresolved_total),
        reopened: count_or_dash(cards.reopened_event_total),
        new_issue: count_or_dash(cards.new_issue_total),
        transfer_out: format!("{transfer_issues}个问题 / {transfer_events}次"),
        net_change: count_or_dash(cards.net_change),
        summary_text: text_or(payload.manager_summary_text.as_deref(), "-"),
        issue_keys_block: issue_keys_block(&payload.manager_summary_issue_keys),
    }
}

fn issue_keys_block(keys: &ManagerIssueKeys) -> String {
    [
        "问题号明细".to_string(),
        issue_line("本周期分配", &keys.assigned),
        issue_line("本周期已解决", &keys.resolved),
        issue_line("本周期未解决", &keys.unresolved),
        issue_line("重开事件", &keys.reopened),
        issue_line("New Issue", &keys.new_issue),
        issue_line("评估后转出", &keys.transfer_out),
    ]
    .join("\n")
}

fn issue_line(label: &str, keys: &[String]) -> String {
    if keys.is_empty() {
        format!("{label}: -")
    } else {
        format!("{label}: {}", keys.join(", "))
    }
}

pub fn project_focus(payload: &BoardPayload) -> FocusView {
    let focus = &payload.period_focus;

    let reopened = focus
        .reopened
        .items
        .iter()
        .map(|item| ReopenedRowView {
            key: text_or(item.key.as_deref(), "-"),
            url: text_or(item.url.as_deref(), "#"),
            reopen_count: item.reopen_count.unwrap_or(0).to_string(),
            owner: owner_or_dash(item.metric_owner.as_deref(), item.assignee.as_deref()),
            last_reopened_at: text_or(item.last_reopened_at.as_deref(), "-"),
        })
        .collect();

    let new_issue = focus
        .new_issue
        .items
        .iter()
        .map(|item| NewIssueRowView {
            key: text_or(item.key.as_deref(), "-"),
            url: text_or(item.url.as_deref(), "#"),
            owner: owner_or_dash(item.metric_owner.as_deref(), item.assignee.as_deref()),
            created_at: text_or(item.created_at.as_deref(), "-"),
            status: text_or(item.status.as_deref(), "-"),
        })
        .collect();

    let mut transfer_out = Vec::new();
    for team in &focus.transfer_out.teams {
        let team_label = text_or(
            team.team_name.as_deref(),
            &text_or(team.team_id.as_deref(), "-"),
        );
        for item in &team.items {
            transfer_out.push(TransferRowView {
                key: text_or(item.key.as_deref(), "-"),
                url: text_or(item.url.as_deref(), "#"),
                team: team_label.clone(),
                flow: format!(
                    "{} → {}",
                    text_or(item.from_owner.as_deref(), "-"),
                    text_or(item.to_owner.as_deref(), "-"),
                ),
                event_count: item.event_count.unwrap_or(0).to_string(),
                latest_at: text_or(item.latest_transfer_out_at.as_deref(), "-"),
            });
        }
    }

    FocusView {
        reopened,
        new_issue,
        transfer_out,
    }
}

fn count_or_dash(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn text_or(value: Option<&str>, fallback: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn owner_or_dash(metric_owner: Option<&str>, assignee: Option<&str>) -> String {
    metric_owner
        .filter(|v| !v.is_empty())
        .or(assignee.filter(|v| !v.is_empty()))
        .unwrap_or("-")
        .to_string()
}
