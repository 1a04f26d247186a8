//! Dashboard server API: the collaborator contract consumed by the
//! refresh orchestrator, and its reqwest implementation.
//!
//! The server distinguishes a cache miss (HTTP 409) from generic failures
//! (JSON `{"error": ...}` bodies); that distinction drives the
//! confirmation branch, so it is preserved as a dedicated error variant.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::query::CanonicalQuery;
use crate::types::{
    BoardPayload, CacheSourcesResponse, CachedQueriesResponse, RunQueryResponse, TimelinePayload,
    ViewMode,
};

/// Errors from dashboard server calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The server has no cached dataset for the query (HTTP 409).
    /// Recoverable: a confirmed live pull repopulates the cache.
    #[error("query cache not found on the server")]
    CacheMiss,
    /// The server rejected the request and said why.
    #[error("{0}")]
    Server(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Message to surface to the user: the server's own words when it
    /// provided any, otherwise the caller's generic fallback. Transport
    /// and decode detail goes to the log, not the status line.
    pub fn surfaced_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Server(message) if !message.is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Derived export endpoint addresses. Computed from the canonical query,
/// never fetched by the client itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportLinks {
    pub csv: String,
    pub xlsx: String,
    pub png: String,
}

/// Everything the refresh orchestrator needs from the server side.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// Previously cached queries plus the server's default JQL.
    async fn cached_queries(&self) -> Result<CachedQueriesResponse, ApiError>;

    /// Cache entries selectable as an explicit source.
    async fn cache_sources(&self) -> Result<CacheSourcesResponse, ApiError>;

    /// Execute a live pull and repopulate the cache for `query`.
    /// Always sent with `confirmed=true`; the confirmation decision is the
    /// orchestrator's job.
    async fn run_query(&self, query: &CanonicalQuery) -> Result<RunQueryResponse, ApiError>;

    /// Board payload for `query`, or [`ApiError::CacheMiss`].
    async fn board(&self, query: &CanonicalQuery) -> Result<BoardPayload, ApiError>;

    /// Timeline payload for `query` in the given lane mode.
    async fn timeline(
        &self,
        query: &CanonicalQuery,
        mode: ViewMode,
    ) -> Result<TimelinePayload, ApiError>;

    /// Export link targets for `query` and `mode`.
    fn export_links(&self, query: &CanonicalQuery, mode: ViewMode) -> ExportLinks;
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

/// HTTP implementation against the Flask dashboard server.
pub struct HttpDashboardApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDashboardApi {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str, query_string: &str) -> String {
        if query_string.is_empty() {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}{path}?{query_string}", self.base_url)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        log::debug!("GET {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::decode_json(response).await
    }

    async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if status == reqwest::StatusCode::CONFLICT {
            return Err(ApiError::CacheMiss);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .map(|b| b.error)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("server returned {status}"));
            return Err(ApiError::Server(message));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn cached_queries(&self) -> Result<CachedQueriesResponse, ApiError> {
        self.get_json(self.url("/api/cached_queries", "")).await
    }

    async fn cache_sources(&self) -> Result<CacheSourcesResponse, ApiError> {
        self.get_json(self.url("/api/cache_sources", "")).await
    }

    async fn run_query(&self, query: &CanonicalQuery) -> Result<RunQueryResponse, ApiError> {
        let url = self.url(
            "/api/query",
            &query.to_query_string_with(&[("confirmed", "true")]),
        );
        log::info!("POST {url}");
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::decode_json(response).await
    }

    async fn board(&self, query: &CanonicalQuery) -> Result<BoardPayload, ApiError> {
        self.get_json(self.url("/api/kanban", &query.to_query_string()))
            .await
    }

    async fn timeline(
        &self,
        query: &CanonicalQuery,
        mode: ViewMode,
    ) -> Result<TimelinePayload, ApiError> {
        let url = self.url(
            "/api/gantt",
            &query.to_query_string_with(&[("mode", mode.as_str())]),
        );
        self.get_json(url).await
    }

    fn export_links(&self, query: &CanonicalQuery, mode: ViewMode) -> ExportLinks {
        let query_string = query.to_query_string();
        ExportLinks {
            csv: self.url("/api/export/csv", &query_string),
            xlsx: self.url("/api/export/xlsx", &query_string),
            png: self.url(
                "/api/export/png",
                &query.to_query_string_with(&[("mode", mode.as_str())]),
            ),
        }
    }
}
