//! Gantt lane grouping and bar sizing.

use chrono::DateTime;

use crate::types::GanttRow;

/// Visual cap on bar width, in hour units. Applies to the rendered width
/// only; `duration_hours` stays uncapped for anything downstream that
/// needs the real span.
pub const MAX_BAR_WIDTH_HOURS: f64 = 240.0;

/// One bar in a lane.
#[derive(Debug, Clone)]
pub struct GanttBar {
    pub key: String,
    pub summary: String,
    /// Hours between start and end, floored to 1 so zero- and
    /// negative-span items still draw a visible bar.
    pub duration_hours: f64,
    /// Display width in hour units, capped at [`MAX_BAR_WIDTH_HOURS`].
    pub width: f64,
}

/// One lane of bars, in the order the rows arrived.
#[derive(Debug, Clone)]
pub struct GanttLane {
    pub name: String,
    pub bars: Vec<GanttBar>,
}

/// Group timeline rows into lanes, preserving first-seen lane order.
pub fn project_lanes(rows: &[GanttRow]) -> Vec<GanttLane> {
    let mut lanes: Vec<GanttLane> = Vec::new();

    for row in rows {
        let duration_hours = span_hours(&row.start, &row.end).max(1.0);
        let bar = GanttBar {
            key: row.key.clone(),
            summary: row.summary.clone(),
            duration_hours,
            width: duration_hours.min(MAX_BAR_WIDTH_HOURS),
        };
        match lanes.iter_mut().find(|lane| lane.name == row.lane) {
            Some(lane) => lane.bars.push(bar),
            None => lanes.push(GanttLane {
                name: row.lane.clone(),
                bars: vec![bar],
            }),
        }
    }

    lanes
}

/// Hours from `start` to `end`. Unparseable instants count as a zero span
/// (the caller floors to the minimum bar anyway).
fn span_hours(start: &str, end: &str) -> f64 {
    let (Ok(start), Ok(end)) = (
        DateTime::parse_from_rfc3339(start),
        DateTime::parse_from_rfc3339(end),
    ) else {
        return 0.0;
    };
    (end - start).num_seconds() as f64 / 3600.0
}
