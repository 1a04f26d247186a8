//! Per-assignee metric rows grouped into team tables with subtotals.
//!
//! The server sends flat rows; grouping and subtotal math happen here on
//! every aggregation pass. Subtotals are derived values, never stored
//! apart from the rows they summarize.

use crate::types::MetricRow;

/// Bucket for rows whose assignee matched no configured team.
pub const OTHER_TEAM: &str = "其他团队";

/// Derived subtotal line for one team table.
///
/// Resolved issue keys and weighted progress are intentionally absent:
/// neither aggregates meaningfully across assignees and both render as
/// not applicable.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamSubtotal {
    pub total: u32,
    pub resolved: u32,
    pub wip: u32,
    /// resolved / total × 100, 2 decimal places. 0.00 for an empty team,
    /// never NaN.
    pub resolution_rate: f64,
    /// Total-weighted mean over rows that report a lead time. `None` when
    /// no weighted row carries one.
    pub avg_lead_time_hours: Option<f64>,
}

/// One team's table: ordered member rows plus the derived subtotal.
#[derive(Debug, Clone)]
pub struct TeamGroup {
    pub team_name: String,
    pub rows: Vec<MetricRow>,
    pub subtotal: TeamSubtotal,
}

/// Group flat metric rows by team and compute subtotals.
///
/// Teams are ordered by name with the [`OTHER_TEAM`] bucket always last.
/// Row order within a team is preserved as sent by the server.
pub fn aggregate(rows: &[MetricRow]) -> Vec<TeamGroup> {
    let mut groups: Vec<(String, Vec<MetricRow>)> = Vec::new();

    for row in rows {
        let team_name = row
            .team_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(OTHER_TEAM)
            .to_string();
        match groups.iter_mut().find(|(name, _)| *name == team_name) {
            Some((_, members)) => members.push(row.clone()),
            None => groups.push((team_name, vec![row.clone()])),
        }
    }

    groups.sort_by(|(left, _), (right, _)| {
        (left == OTHER_TEAM, left).cmp(&(right == OTHER_TEAM, right))
    });

    groups
        .into_iter()
        .map(|(team_name, rows)| {
            let subtotal = subtotal_for(&rows);
            TeamGroup {
                team_name,
                rows,
                subtotal,
            }
        })
        .collect()
}

fn subtotal_for(rows: &[MetricRow]) -> TeamSubtotal {
    let total: u32 = rows.iter().map(|row| row.total).sum();
    let resolved: u32 = rows.iter().map(|row| row.resolved).sum();
    let wip: u32 = rows.iter().map(|row| row.wip).sum();

    let resolution_rate = if total > 0 {
        round2(f64::from(resolved) / f64::from(total) * 100.0)
    } else {
        0.0
    };

    // Weight each row's average by its issue count. Averaging the
    // per-member averages directly would overweight low-volume members.
    // Rows without a lead time drop out of numerator and denominator both.
    let mut lead_numerator = 0.0;
    let mut lead_denominator = 0u32;
    for row in rows {
        if let Some(lead) = row.avg_lead_time_hours {
            lead_numerator += lead * f64::from(row.total);
            lead_denominator += row.total;
        }
    }
    let avg_lead_time_hours = if lead_denominator > 0 {
        Some(round2(lead_numerator / f64::from(lead_denominator)))
    } else {
        None
    };

    TeamSubtotal {
        total,
        resolved,
        wip,
        resolution_rate,
        avg_lead_time_hours,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
