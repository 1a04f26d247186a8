//! Published view state and refresh-cycle bookkeeping.
//!
//! The view is an explicit value replaced wholesale at commit points,
//! never mutated field-by-field mid-step. Each refresh cycle takes a
//! monotonically increasing id; only the newest-started cycle may commit,
//! so a slow stale cycle can never overwrite a newer one's result.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};
use parking_lot::Mutex;

use crate::api::ExportLinks;
use crate::metrics::TeamGroup;
use crate::views::gantt::GanttLane;
use crate::views::kanban::KanbanColumn;
use crate::views::summary::{FocusView, SummaryView};

/// The fixed status location: query preview (or error text) plus the
/// cache-source annotation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusLine {
    pub query_preview: String,
    pub cache_source: String,
}

/// Render-ready board view committed at the end of the board step.
#[derive(Debug, Clone)]
pub struct BoardView {
    pub columns: Vec<KanbanColumn>,
    pub metrics: Vec<TeamGroup>,
    pub summary: SummaryView,
    pub focus: FocusView,
    /// Filter option lists come from the server, not from local cards.
    pub assignees: Vec<String>,
    pub priorities: Vec<String>,
}

/// Render-ready timeline view committed at the end of the timeline step.
#[derive(Debug, Clone)]
pub struct TimelineView {
    pub lanes: Vec<GanttLane>,
}

/// Everything the frontends read. Board and timeline are independent
/// views: a timeline failure leaves the board from the same cycle intact.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub board: Option<BoardView>,
    pub timeline: Option<TimelineView>,
    pub status: StatusLine,
    pub last_refresh_at: Option<DateTime<Local>>,
    pub export_links: Option<ExportLinks>,
}

/// Shared holder for the published view plus the cycle counter.
#[derive(Default)]
pub struct DashboardState {
    view: Mutex<ViewState>,
    cycle: AtomicU64,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a refresh cycle; the returned id stays valid for commits
    /// until the next cycle begins.
    pub fn begin_cycle(&self) -> u64 {
        self.cycle.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Replace the board portion of the view (and the status line).
    /// Returns false without touching anything if a newer cycle started.
    pub fn commit_board(&self, cycle: u64, board: BoardView, status: StatusLine) -> bool {
        self.commit(cycle, |view| {
            view.board = Some(board);
            view.status = status;
        })
    }

    /// Replace the timeline portion, stamp the refresh time, and record
    /// the recomputed export links.
    pub fn commit_timeline(&self, cycle: u64, timeline: TimelineView, links: ExportLinks) -> bool {
        self.commit(cycle, |view| {
            view.timeline = Some(timeline);
            view.last_refresh_at = Some(Local::now());
            view.export_links = Some(links);
        })
    }

    /// Surface a terminal condition: only the status line changes, all
    /// views keep their previous content.
    pub fn commit_status(&self, cycle: u64, status: StatusLine) -> bool {
        self.commit(cycle, |view| {
            view.status = status;
        })
    }

    fn commit(&self, cycle: u64, apply: impl FnOnce(&mut ViewState)) -> bool {
        // Take the lock first so the staleness check and the write are
        // one atomic step relative to other committers.
        let mut view = self.view.lock();
        if self.cycle.load(Ordering::SeqCst) != cycle {
            log::debug!("dropping commit from superseded refresh cycle {cycle}");
            return false;
        }
        apply(&mut view);
        true
    }

    pub fn snapshot(&self) -> ViewState {
        self.view.lock().clone()
    }
}
