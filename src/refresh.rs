//! Refresh orchestration: the board → timeline state machine and the
//! cache-miss confirmation branch.
//!
//! One `refresh()` call is one independent cycle. Cycles never retry on
//! their own; every network failure is terminal for the cycle and lands
//! in the status line, never as a panic or an error escaping this module.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::api::{ApiError, DashboardApi};
use crate::metrics;
use crate::query::FilterSelection;
use crate::state::{BoardView, DashboardState, StatusLine, TimelineView};
use crate::types::{CacheSourceEntry, ViewMode};
use crate::views::{gantt, kanban, summary};

/// Server-side cache directory, quoted in cache-source annotations when
/// no concrete source is known.
pub const CACHE_ROOT: &str = "storage/jira_query_cache";

const LIVE_PULL_PROMPT: &str = "本地缓存不存在或已失效，是否连接 JIRA 拉取最新数据？";
const MSG_CANCELLED: &str = "已取消连接 JIRA。请使用本地缓存或稍后重试。";
const FALLBACK_QUERY_FAILED: &str = "JQL查询失败";
const FALLBACK_BOARD_FAILED: &str = "看板构建失败";
const FALLBACK_TIMELINE_FAILED: &str = "甘特构建失败";
const FALLBACK_SYNC_FAILED: &str = "从JIRA更新失败";

/// Decision point for the cache-miss branch. The refresh suspends on this
/// until a decision arrives; swap in a scripted double for tests.
#[async_trait]
pub trait ConfirmLivePull: Send + Sync {
    async fn confirm_live_pull(&self, prompt: &str) -> bool;
}

/// How a refresh cycle ended. Failure variants carry the message that was
/// also committed to the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Completed,
    /// The user declined the live pull after a cache miss.
    Cancelled,
    /// The confirmed live pull itself failed.
    QueryFailed(String),
    /// Board fetch failed (including a second cache miss after a
    /// successful live pull).
    BoardFailed(String),
    /// Timeline fetch failed; the board committed this cycle stays.
    TimelineFailed(String),
    /// A newer cycle started before this one could commit.
    Superseded,
}

/// Drives the end-to-end refresh sequence over the API and confirmation
/// collaborators, committing results into [`DashboardState`].
pub struct RefreshOrchestrator<A, C> {
    api: A,
    confirm: C,
    state: Arc<DashboardState>,
    filters: Mutex<FilterSelection>,
    mode: Mutex<ViewMode>,
    cache_sources: Mutex<Vec<CacheSourceEntry>>,
}

impl<A: DashboardApi, C: ConfirmLivePull> RefreshOrchestrator<A, C> {
    pub fn new(api: A, confirm: C, state: Arc<DashboardState>) -> Self {
        Self {
            api,
            confirm,
            state,
            filters: Mutex::new(FilterSelection::default()),
            mode: Mutex::new(ViewMode::default()),
            cache_sources: Mutex::new(Vec::new()),
        }
    }

    /// Current filter selection (a copy; the live one only changes through
    /// [`set_filters`](Self::set_filters) and the hydration steps).
    pub fn filters(&self) -> FilterSelection {
        self.filters.lock().clone()
    }

    pub fn set_filters(&self, filters: FilterSelection) {
        *self.filters.lock() = filters;
    }

    pub fn mode(&self) -> ViewMode {
        *self.mode.lock()
    }

    pub fn set_mode(&self, mode: ViewMode) {
        *self.mode.lock() = mode;
    }

    /// Cache sources from the last hydration, newest first.
    pub fn cache_sources(&self) -> Vec<CacheSourceEntry> {
        self.cache_sources.lock().clone()
    }

    /// Fill the raw JQL field from the newest cached query, else the
    /// server default. With `preserve_input`, an already non-empty field
    /// is left alone. Hydration failure is not terminal: the field simply
    /// keeps its current value and the refresh continues.
    pub async fn hydrate_cached_queries(&self, preserve_input: bool) {
        let already_set = self
            .filters
            .lock()
            .custom_jql
            .as_deref()
            .is_some_and(|jql| !jql.is_empty());
        if preserve_input && already_set {
            return;
        }

        match self.api.cached_queries().await {
            Ok(response) => {
                let jql = response
                    .queries
                    .first()
                    .and_then(|entry| entry.custom_jql.clone())
                    .filter(|jql| !jql.is_empty())
                    .or_else(|| response.default_jql.clone().filter(|jql| !jql.is_empty()));
                if let Some(jql) = jql {
                    self.filters.lock().custom_jql = Some(jql);
                }
            }
            Err(err) => log::warn!("cached query hydration failed: {err}"),
        }
    }

    /// Refresh the selectable cache-source list. The previously selected
    /// cache id survives when still present; otherwise selection moves to
    /// the newest entry.
    pub async fn hydrate_cache_sources(&self) -> Result<(), ApiError> {
        let sources = self.api.cache_sources().await?.sources;

        let mut filters = self.filters.lock();
        let keep_selection = filters
            .cache_id
            .as_ref()
            .is_some_and(|id| sources.iter().any(|source| &source.id == id));
        if !keep_selection {
            filters.cache_id = sources.first().map(|source| source.id.clone());
        }
        drop(filters);

        *self.cache_sources.lock() = sources;
        Ok(())
    }

    /// Run one full refresh cycle. Safe to call repeatedly and
    /// concurrently; each call is an independent attempt and only the
    /// newest-started cycle may commit.
    pub async fn refresh(&self) -> RefreshOutcome {
        let cycle = self.state.begin_cycle();
        log::info!("refresh cycle {cycle} started");

        // Step 1: hydrate the raw JQL field (non-fatal).
        self.hydrate_cached_queries(true).await;

        // Step 2: canonical query from the current selection.
        let query = self.filters.lock().to_query();
        let mode = *self.mode.lock();

        // Step 3: board fetch, with the confirmation branch on cache miss.
        let board = match self.api.board(&query).await {
            Ok(payload) => payload,
            Err(ApiError::CacheMiss) => {
                if !self.confirm.confirm_live_pull(LIVE_PULL_PROMPT).await {
                    log::info!("refresh cycle {cycle}: live pull declined");
                    self.state.commit_status(
                        cycle,
                        StatusLine {
                            query_preview: MSG_CANCELLED.to_string(),
                            cache_source: cache_note_missed(),
                        },
                    );
                    return RefreshOutcome::Cancelled;
                }

                if let Err(err) = self.api.run_query(&query).await {
                    let message = err.surfaced_message(FALLBACK_QUERY_FAILED);
                    log::warn!("refresh cycle {cycle}: live pull failed: {err}");
                    self.state.commit_status(
                        cycle,
                        StatusLine {
                            query_preview: message.clone(),
                            cache_source: cache_note_query_failed(),
                        },
                    );
                    return RefreshOutcome::QueryFailed(message);
                }

                // Exactly one retry. A miss here means the live pull did
                // not produce a usable cache: hard failure, no re-prompt.
                match self.api.board(&query).await {
                    Ok(payload) => payload,
                    Err(err) => return self.fail_board(cycle, err),
                }
            }
            Err(err) => return self.fail_board(cycle, err),
        };

        // Step 4: project and publish the board.
        let board_view = BoardView {
            columns: kanban::project_columns(&board.columns),
            metrics: metrics::aggregate(&board.metrics),
            summary: summary::project_summary(&board),
            focus: summary::project_focus(&board),
            assignees: board.filters.assignees.clone(),
            priorities: board.filters.priorities.clone(),
        };
        let status = StatusLine {
            query_preview: board
                .jql_preview
                .clone()
                .filter(|preview| !preview.is_empty())
                .unwrap_or_else(|| "-".to_string()),
            cache_source: cache_note_hit(board.cache_source.as_deref(), board.cache_fallback),
        };
        if !self.state.commit_board(cycle, board_view, status) {
            return RefreshOutcome::Superseded;
        }

        // Step 5: timeline fetch. Board data published above stays put
        // whatever happens here; the two views are independent.
        let timeline = match self.api.timeline(&query, mode).await {
            Ok(payload) => payload,
            Err(err) => {
                let message = err.surfaced_message(FALLBACK_TIMELINE_FAILED);
                log::warn!("refresh cycle {cycle}: timeline fetch failed: {err}");
                self.state.commit_status(
                    cycle,
                    StatusLine {
                        query_preview: message.clone(),
                        cache_source: cache_note_missed(),
                    },
                );
                return RefreshOutcome::TimelineFailed(message);
            }
        };

        // Step 6: publish the timeline, stamp the refresh, recompute
        // export targets from the query that actually ran.
        let timeline_view = TimelineView {
            lanes: gantt::project_lanes(&timeline.rows),
        };
        let links = self.api.export_links(&query, mode);
        if !self.state.commit_timeline(cycle, timeline_view, links) {
            return RefreshOutcome::Superseded;
        }

        log::info!("refresh cycle {cycle} completed");
        RefreshOutcome::Completed
    }

    /// Explicit "pull from Jira now": run the live query, re-hydrate the
    /// cache-source list, then do a full refresh.
    pub async fn sync_and_refresh(&self) -> RefreshOutcome {
        let cycle = self.state.begin_cycle();
        let query = self.filters.lock().to_query();

        if let Err(err) = self.api.run_query(&query).await {
            let message = err.surfaced_message(FALLBACK_SYNC_FAILED);
            log::warn!("sync: live pull failed: {err}");
            self.state.commit_status(
                cycle,
                StatusLine {
                    query_preview: message.clone(),
                    cache_source: cache_note_query_failed(),
                },
            );
            return RefreshOutcome::QueryFailed(message);
        }

        if let Err(err) = self.hydrate_cache_sources().await {
            log::warn!("sync: cache source hydration failed: {err}");
        }

        self.refresh().await
    }

    fn fail_board(&self, cycle: u64, err: ApiError) -> RefreshOutcome {
        let message = err.surfaced_message(FALLBACK_BOARD_FAILED);
        log::warn!("refresh cycle {cycle}: board fetch failed: {err}");
        self.state.commit_status(
            cycle,
            StatusLine {
                query_preview: message.clone(),
                cache_source: cache_note_missed(),
            },
        );
        RefreshOutcome::BoardFailed(message)
    }
}

fn cache_note_missed() -> String {
    format!("缓存来源：{CACHE_ROOT}（未命中）")
}

fn cache_note_query_failed() -> String {
    format!("缓存来源：{CACHE_ROOT}（查询失败）")
}

fn cache_note_hit(source: Option<&str>, fallback: bool) -> String {
    let source = source.filter(|s| !s.is_empty()).unwrap_or(CACHE_ROOT);
    let suffix = if fallback { "（离线回退）" } else { "" };
    format!("缓存来源：{source}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::types::{
        BoardPayload, CacheSourcesResponse, CachedQueriesResponse, CachedQueryEntry, Card,
        CacheSourceEntry, FilterOptions, GanttRow, MetricRow, RunQueryResponse, TimelinePayload,
    };

    #[derive(Default)]
    struct MockInner {
        boards: Mutex<VecDeque<Result<BoardPayload, ApiError>>>,
        timelines: Mutex<VecDeque<Result<TimelinePayload, ApiError>>>,
        run_queries: Mutex<VecDeque<Result<RunQueryResponse, ApiError>>>,
        cached_queries: Mutex<CachedQueriesResponse>,
        cache_sources: Mutex<CacheSourcesResponse>,
        board_calls: AtomicUsize,
        timeline_calls: AtomicUsize,
        run_query_calls: AtomicUsize,
        last_mode: Mutex<Option<ViewMode>>,
    }

    #[derive(Clone, Default)]
    struct MockApi {
        inner: Arc<MockInner>,
    }

    impl MockApi {
        fn queue_board(&self, result: Result<BoardPayload, ApiError>) {
            self.inner.boards.lock().push_back(result);
        }

        fn queue_timeline(&self, result: Result<TimelinePayload, ApiError>) {
            self.inner.timelines.lock().push_back(result);
        }

        fn queue_run_query(&self, result: Result<RunQueryResponse, ApiError>) {
            self.inner.run_queries.lock().push_back(result);
        }

        fn set_cached_queries(&self, response: CachedQueriesResponse) {
            *self.inner.cached_queries.lock() = response;
        }

        fn set_cache_sources(&self, sources: Vec<CacheSourceEntry>) {
            *self.inner.cache_sources.lock() = CacheSourcesResponse { sources };
        }

        fn board_calls(&self) -> usize {
            self.inner.board_calls.load(Ordering::SeqCst)
        }

        fn timeline_calls(&self) -> usize {
            self.inner.timeline_calls.load(Ordering::SeqCst)
        }

        fn run_query_calls(&self) -> usize {
            self.inner.run_query_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DashboardApi for MockApi {
        async fn cached_queries(&self) -> Result<CachedQueriesResponse, ApiError> {
            Ok(self.inner.cached_queries.lock().clone())
        }

        async fn cache_sources(&self) -> Result<CacheSourcesResponse, ApiError> {
            Ok(self.inner.cache_sources.lock().clone())
        }

        async fn run_query(
            &self,
            _query: &crate::query::CanonicalQuery,
        ) -> Result<RunQueryResponse, ApiError> {
            self.inner.run_query_calls.fetch_add(1, Ordering::SeqCst);
            self.inner
                .run_queries
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(RunQueryResponse::default()))
        }

        async fn board(
            &self,
            _query: &crate::query::CanonicalQuery,
        ) -> Result<BoardPayload, ApiError> {
            self.inner.board_calls.fetch_add(1, Ordering::SeqCst);
            self.inner
                .boards
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(make_board_payload()))
        }

        async fn timeline(
            &self,
            _query: &crate::query::CanonicalQuery,
            mode: ViewMode,
        ) -> Result<TimelinePayload, ApiError> {
            self.inner.timeline_calls.fetch_add(1, Ordering::SeqCst);
            *self.inner.last_mode.lock() = Some(mode);
            self.inner
                .timelines
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(make_timeline_payload()))
        }

        fn export_links(
            &self,
            query: &crate::query::CanonicalQuery,
            mode: ViewMode,
        ) -> crate::api::ExportLinks {
            crate::api::ExportLinks {
                csv: format!("/api/export/csv?{}", query.to_query_string()),
                xlsx: format!("/api/export/xlsx?{}", query.to_query_string()),
                png: format!(
                    "/api/export/png?{}",
                    query.to_query_string_with(&[("mode", mode.as_str())])
                ),
            }
        }
    }

    struct ScriptedConfirm {
        answer: bool,
        calls: AtomicUsize,
    }

    impl ScriptedConfirm {
        fn new(answer: bool) -> Self {
            Self {
                answer,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConfirmLivePull for ScriptedConfirm {
        async fn confirm_live_pull(&self, _prompt: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    /// Confirms, but starts a newer cycle first, like a rapid second
    /// refresh superseding the one stuck on the dialog.
    struct SupersedingConfirm {
        state: Arc<DashboardState>,
    }

    #[async_trait]
    impl ConfirmLivePull for SupersedingConfirm {
        async fn confirm_live_pull(&self, _prompt: &str) -> bool {
            self.state.begin_cycle();
            true
        }
    }

    fn make_board_payload() -> BoardPayload {
        let mut payload = BoardPayload {
            cards: vec![Card {
                key: "DEV-1".to_string(),
                column: "Done".to_string(),
                ..Default::default()
            }],
            metrics: vec![MetricRow {
                team_name: Some("平台组".to_string()),
                assignee: "alice".to_string(),
                total: 4,
                resolved: 2,
                ..Default::default()
            }],
            filters: FilterOptions {
                assignees: vec!["alice".to_string()],
                priorities: vec!["High".to_string()],
            },
            jql_preview: Some("project = DEV".to_string()),
            cache_source: Some("storage/jira_query_cache/abc.json".to_string()),
            ..Default::default()
        };
        payload
            .columns
            .insert("Done".to_string(), payload.cards.clone());
        payload
    }

    fn make_timeline_payload() -> TimelinePayload {
        TimelinePayload {
            rows: vec![GanttRow {
                lane: "alice".to_string(),
                key: "DEV-1".to_string(),
                start: "2024-03-01T08:00:00+08:00".to_string(),
                end: "2024-03-01T18:00:00+08:00".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn make_orchestrator(
        api: MockApi,
        confirm: ScriptedConfirm,
    ) -> (
        RefreshOrchestrator<MockApi, ScriptedConfirm>,
        Arc<DashboardState>,
    ) {
        let state = Arc::new(DashboardState::new());
        let orchestrator = RefreshOrchestrator::new(api, confirm, state.clone());
        (orchestrator, state)
    }

    #[tokio::test]
    async fn successful_refresh_publishes_board_and_timeline() {
        let api = MockApi::default();
        let (orchestrator, state) = make_orchestrator(api.clone(), ScriptedConfirm::new(true));

        let outcome = orchestrator.refresh().await;
        assert_eq!(outcome, RefreshOutcome::Completed);

        let snapshot = state.snapshot();
        let board = snapshot.board.expect("board published");
        assert_eq!(board.columns.len(), 4);
        assert_eq!(board.metrics[0].team_name, "平台组");
        assert_eq!(board.assignees, vec!["alice".to_string()]);
        assert!(snapshot.timeline.is_some());
        assert!(snapshot.last_refresh_at.is_some());
        assert!(snapshot.export_links.is_some());
        assert_eq!(snapshot.status.query_preview, "project = DEV");
        assert_eq!(
            snapshot.status.cache_source,
            "缓存来源：storage/jira_query_cache/abc.json"
        );
    }

    #[tokio::test]
    async fn offline_fallback_is_annotated() {
        let api = MockApi::default();
        let mut payload = make_board_payload();
        payload.cache_fallback = true;
        api.queue_board(Ok(payload));

        let (orchestrator, state) = make_orchestrator(api, ScriptedConfirm::new(true));
        orchestrator.refresh().await;
        assert_eq!(
            state.snapshot().status.cache_source,
            "缓存来源：storage/jira_query_cache/abc.json（离线回退）"
        );
    }

    #[tokio::test]
    async fn cache_miss_declined_cancels_without_touching_views() {
        let api = MockApi::default();
        let (orchestrator, state) = make_orchestrator(api.clone(), ScriptedConfirm::new(true));
        // Seed a previous successful view first.
        assert_eq!(orchestrator.refresh().await, RefreshOutcome::Completed);
        let before = state.snapshot();

        let api2 = MockApi::default();
        api2.queue_board(Err(ApiError::CacheMiss));
        let confirm = ScriptedConfirm::new(false);
        let orchestrator = RefreshOrchestrator::new(api2.clone(), confirm, state.clone());

        let outcome = orchestrator.refresh().await;
        assert_eq!(outcome, RefreshOutcome::Cancelled);
        assert_eq!(api2.run_query_calls(), 0);

        let after = state.snapshot();
        assert!(after.board.is_some());
        assert_eq!(
            after.board.as_ref().unwrap().assignees,
            before.board.as_ref().unwrap().assignees
        );
        assert!(after.timeline.is_some());
        assert_eq!(after.status.query_preview, MSG_CANCELLED);
        assert_eq!(
            after.status.cache_source,
            "缓存来源：storage/jira_query_cache（未命中）"
        );
    }

    #[tokio::test]
    async fn cache_miss_accepted_pulls_then_retries_once() {
        let api = MockApi::default();
        api.queue_board(Err(ApiError::CacheMiss));
        api.queue_board(Ok(make_board_payload()));

        let confirm = ScriptedConfirm::new(true);
        let (orchestrator, state) = make_orchestrator(api.clone(), confirm);

        let outcome = orchestrator.refresh().await;
        assert_eq!(outcome, RefreshOutcome::Completed);
        assert_eq!(api.run_query_calls(), 1);
        assert_eq!(api.board_calls(), 2);
        assert!(state.snapshot().board.is_some());
        assert!(state.snapshot().timeline.is_some());
    }

    #[tokio::test]
    async fn failed_live_pull_surfaces_its_error_without_retry() {
        let api = MockApi::default();
        api.queue_board(Err(ApiError::CacheMiss));
        api.queue_run_query(Err(ApiError::Server("JIRA连接超时".to_string())));

        let (orchestrator, state) = make_orchestrator(api.clone(), ScriptedConfirm::new(true));

        let outcome = orchestrator.refresh().await;
        assert_eq!(outcome, RefreshOutcome::QueryFailed("JIRA连接超时".to_string()));
        assert_eq!(api.board_calls(), 1);
        assert_eq!(api.timeline_calls(), 0);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.status.query_preview, "JIRA连接超时");
        assert_eq!(
            snapshot.status.cache_source,
            "缓存来源：storage/jira_query_cache（查询失败）"
        );
    }

    #[tokio::test]
    async fn second_cache_miss_is_a_hard_failure() {
        let api = MockApi::default();
        api.queue_board(Err(ApiError::CacheMiss));
        api.queue_board(Err(ApiError::CacheMiss));

        let confirm = ScriptedConfirm::new(true);
        let (orchestrator, state) = make_orchestrator(api.clone(), confirm);

        let outcome = orchestrator.refresh().await;
        assert_eq!(
            outcome,
            RefreshOutcome::BoardFailed(FALLBACK_BOARD_FAILED.to_string())
        );
        // Prompted exactly once; the retry miss never re-prompts.
        assert_eq!(orchestrator.confirm.calls(), 1);
        assert_eq!(api.board_calls(), 2);
        assert_eq!(api.timeline_calls(), 0);
        assert!(state.snapshot().board.is_none());
    }

    #[tokio::test]
    async fn generic_board_failure_skips_timeline() {
        let api = MockApi::default();
        api.queue_board(Err(ApiError::Server("JQL语法错误".to_string())));

        let confirm = ScriptedConfirm::new(true);
        let (orchestrator, state) = make_orchestrator(api.clone(), confirm);

        let outcome = orchestrator.refresh().await;
        assert_eq!(outcome, RefreshOutcome::BoardFailed("JQL语法错误".to_string()));
        assert_eq!(api.timeline_calls(), 0);
        assert_eq!(state.snapshot().status.query_preview, "JQL语法错误");
    }

    #[tokio::test]
    async fn confirmation_is_not_asked_on_generic_failure() {
        let api = MockApi::default();
        api.queue_board(Err(ApiError::Server("boom".to_string())));
        let confirm = ScriptedConfirm::new(true);
        let state = Arc::new(DashboardState::new());
        let orchestrator = RefreshOrchestrator::new(api, confirm, state);
        orchestrator.refresh().await;
        assert_eq!(orchestrator.confirm.calls(), 0);
    }

    #[tokio::test]
    async fn timeline_failure_keeps_the_published_board() {
        let api = MockApi::default();
        api.queue_timeline(Err(ApiError::Server("甘特服务不可用".to_string())));

        let (orchestrator, state) = make_orchestrator(api, ScriptedConfirm::new(true));

        let outcome = orchestrator.refresh().await;
        assert_eq!(
            outcome,
            RefreshOutcome::TimelineFailed("甘特服务不可用".to_string())
        );

        let snapshot = state.snapshot();
        assert!(snapshot.board.is_some());
        assert!(snapshot.timeline.is_none());
        assert!(snapshot.last_refresh_at.is_none());
        assert_eq!(snapshot.status.query_preview, "甘特服务不可用");
    }

    #[tokio::test]
    async fn hydration_fills_only_an_empty_jql_field() {
        let api = MockApi::default();
        api.set_cached_queries(CachedQueriesResponse {
            queries: vec![CachedQueryEntry {
                custom_jql: Some("project = DEV AND status = Open".to_string()),
                ..Default::default()
            }],
            default_jql: Some("project = DEV".to_string()),
        });

        let (orchestrator, _state) = make_orchestrator(api.clone(), ScriptedConfirm::new(true));
        orchestrator.refresh().await;
        assert_eq!(
            orchestrator.filters().custom_jql.as_deref(),
            Some("project = DEV AND status = Open")
        );

        // A user-entered JQL survives hydration.
        let (orchestrator, _state) = make_orchestrator(api, ScriptedConfirm::new(true));
        orchestrator.set_filters(FilterSelection {
            custom_jql: Some("labels = urgent".to_string()),
            ..Default::default()
        });
        orchestrator.refresh().await;
        assert_eq!(
            orchestrator.filters().custom_jql.as_deref(),
            Some("labels = urgent")
        );
    }

    #[tokio::test]
    async fn hydration_falls_back_to_server_default_jql() {
        let api = MockApi::default();
        api.set_cached_queries(CachedQueriesResponse {
            queries: Vec::new(),
            default_jql: Some("project = DEV".to_string()),
        });

        let (orchestrator, _state) = make_orchestrator(api, ScriptedConfirm::new(true));
        orchestrator.hydrate_cached_queries(true).await;
        assert_eq!(orchestrator.filters().custom_jql.as_deref(), Some("project = DEV"));
    }

    #[tokio::test]
    async fn cache_source_hydration_preserves_valid_selection() {
        let api = MockApi::default();
        api.set_cache_sources(vec![
            CacheSourceEntry {
                id: "newest".to_string(),
                ..Default::default()
            },
            CacheSourceEntry {
                id: "older".to_string(),
                ..Default::default()
            },
        ]);

        let (orchestrator, _state) = make_orchestrator(api.clone(), ScriptedConfirm::new(true));
        orchestrator.set_filters(FilterSelection {
            cache_id: Some("older".to_string()),
            ..Default::default()
        });
        orchestrator.hydrate_cache_sources().await.unwrap();
        assert_eq!(orchestrator.filters().cache_id.as_deref(), Some("older"));

        // A vanished selection moves to the newest entry.
        orchestrator.set_filters(FilterSelection {
            cache_id: Some("gone".to_string()),
            ..Default::default()
        });
        orchestrator.hydrate_cache_sources().await.unwrap();
        assert_eq!(orchestrator.filters().cache_id.as_deref(), Some("newest"));
        assert_eq!(orchestrator.cache_sources().len(), 2);
    }

    #[tokio::test]
    async fn sync_runs_query_then_full_refresh() {
        let api = MockApi::default();
        api.set_cache_sources(vec![CacheSourceEntry {
            id: "fresh".to_string(),
            ..Default::default()
        }]);

        let (orchestrator, state) = make_orchestrator(api.clone(), ScriptedConfirm::new(true));
        let outcome = orchestrator.sync_and_refresh().await;
        assert_eq!(outcome, RefreshOutcome::Completed);
        assert_eq!(api.run_query_calls(), 1);
        assert_eq!(orchestrator.filters().cache_id.as_deref(), Some("fresh"));
        assert!(state.snapshot().board.is_some());
    }

    #[tokio::test]
    async fn sync_failure_surfaces_and_skips_refresh() {
        let api = MockApi::default();
        api.queue_run_query(Err(ApiError::Server("认证失败".to_string())));

        let (orchestrator, state) = make_orchestrator(api.clone(), ScriptedConfirm::new(true));
        let outcome = orchestrator.sync_and_refresh().await;
        assert_eq!(outcome, RefreshOutcome::QueryFailed("认证失败".to_string()));
        assert_eq!(api.board_calls(), 0);
        assert_eq!(state.snapshot().status.query_preview, "认证失败");
    }

    #[tokio::test]
    async fn superseded_cycle_commits_nothing() {
        let api = MockApi::default();
        api.queue_board(Err(ApiError::CacheMiss));
        api.queue_board(Ok(make_board_payload()));

        let state = Arc::new(DashboardState::new());
        let confirm = SupersedingConfirm {
            state: state.clone(),
        };
        let orchestrator = RefreshOrchestrator::new(api, confirm, state.clone());

        let outcome = orchestrator.refresh().await;
        assert_eq!(outcome, RefreshOutcome::Superseded);
        assert!(state.snapshot().board.is_none());
        assert_eq!(state.snapshot().status, StatusLine::default());
    }

    #[tokio::test]
    async fn timeline_is_fetched_in_the_active_mode() {
        let api = MockApi::default();
        let (orchestrator, _state) = make_orchestrator(api.clone(), ScriptedConfirm::new(true));
        orchestrator.set_mode(ViewMode::Sprint);
        orchestrator.refresh().await;
        assert_eq!(*api.inner.last_mode.lock(), Some(ViewMode::Sprint));
    }
}
