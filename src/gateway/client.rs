use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::address::LocationCoordinate;
use crate::config::RetryConfig;
use crate::equipment::EquipmentRecord;
use crate::gateway::errors::GatewayError;
use crate::workflow::requests::WorkflowRequest;

/// Search response, shaped exactly as the backend returns it. Result
/// ordering is the backend's; we never reorder or deduplicate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchOutcome {
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub total: usize,
    #[serde(default, rename = "resultados", alias = "results")]
    pub results: Vec<EquipmentRecord>,
}

impl SearchOutcome {
    /// A single result is treated as a direct hit by callers.
    pub fn direct_hit(&self) -> Option<&EquipmentRecord> {
        if self.found && self.total == 1 {
            self.results.first()
        } else {
            None
        }
    }
}

/// Acknowledgement shape shared by the mutating endpoints. Some reply
/// `{ok: bool}`, others `{status: "ok"|"error", message}`.
#[derive(Debug, Deserialize)]
struct Ack {
    #[serde(default)]
    ok: Option<bool>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl Ack {
    fn accepted(&self) -> bool {
        match (self.ok, self.status.as_deref()) {
            (Some(ok), _) => ok,
            (None, Some(status)) => status == "ok",
            (None, None) => false,
        }
    }

    fn message(self) -> String {
        self.message
            .unwrap_or_else(|| "no detail provided".to_string())
    }
}

/// Backend operations the orchestrator needs. Trait seam so workflow
/// tests can run against an in-memory store.
#[async_trait]
pub trait EquipmentStore: Send + Sync {
    /// `Ok(None)` means the slot is empty; callers treat that as the
    /// new-equipment entry point, never as a failure.
    async fn fetch_by_coordinate(
        &self,
        coord: &LocationCoordinate,
    ) -> Result<Option<EquipmentRecord>, GatewayError>;

    async fn search(&self, query: &str) -> Result<SearchOutcome, GatewayError>;

    /// Dispatch a mutating request. Consumes it: one confirmation, one
    /// send.
    async fn submit(&self, request: WorkflowRequest) -> Result<(), GatewayError>;
}

/// HTTP client for the inventory backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, retry: RetryConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self {
            http,
            base_url,
            retry,
        })
    }

    pub fn from_config() -> anyhow::Result<Self> {
        let config = crate::config::config()?;
        Ok(Self::new(
            config.backend.base_url.clone(),
            Duration::from_secs(config.backend.timeout_seconds),
            config.backend.retry.clone(),
        )?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Bounded exponential retry. Every attempt rebuilds the request
    /// from scratch; anything non-retryable returns immediately.
    ///
    /// Reads retry on any transient failure. Mutations retry only on
    /// connect failures, where the request never reached the backend;
    /// a timed-out mutation may already have been applied, so it is
    /// surfaced as an error instead of being sent again.
    async fn send_with_retry<F, Fut>(
        &self,
        kind: RequestKind,
        build: F,
    ) -> Result<reqwest::Response, GatewayError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut delay = Duration::from_millis(self.retry.base_delay_ms);
        let max_delay = Duration::from_millis(self.retry.max_delay_ms);

        for attempt in 1..=max_attempts {
            let err = match build().await {
                Ok(response)
                    if kind == RequestKind::Read
                        && response.status().is_server_error()
                        && attempt < max_attempts =>
                {
                    GatewayError::UnexpectedResponse(format!(
                        "server error {}",
                        response.status()
                    ))
                }
                Ok(response) => return Ok(response),
                Err(err) => GatewayError::from(err),
            };

            if attempt < max_attempts && retryable(&err, kind) {
                warn!(attempt, max_attempts, error = %err, "transient backend failure, backing off");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(max_delay);
            } else {
                return Err(err);
            }
        }
        unreachable!("retry loop returns before attempts are exhausted")
    }

    /// A response that landed on the login boundary (or came back as
    /// HTML where JSON was expected) means the session died.
    fn check_session(response: &reqwest::Response) -> Result<(), GatewayError> {
        if response.url().path().starts_with("/login") {
            return Err(GatewayError::SessionExpired);
        }
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GatewayError::SessionExpired);
        }
        // Only an HTML page served with a success status is the login
        // screen; an HTML 5xx error page is just a failed request.
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("text/html"));
        if is_html && response.status().is_success() {
            return Err(GatewayError::SessionExpired);
        }
        Ok(())
    }
}

/// Whether the request can still be retried safely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Read,
    Mutation,
}

fn retryable(err: &GatewayError, kind: RequestKind) -> bool {
    match (err, kind) {
        // Connection never opened, so nothing was delivered.
        (GatewayError::Transport(inner), _) if inner.is_connect() => true,
        (_, RequestKind::Mutation) => false,
        (GatewayError::UnexpectedResponse(msg), _) => msg.starts_with("server error"),
        (other, _) => other.is_transient(),
    }
}

#[async_trait]
impl EquipmentStore for BackendClient {
    async fn fetch_by_coordinate(
        &self,
        coord: &LocationCoordinate,
    ) -> Result<Option<EquipmentRecord>, GatewayError> {
        let url = self.url(&format!(
            "/equipment/{}/{}/{}/{}",
            coord.warehouse_id, coord.rack, coord.row, coord.column
        ));
        debug!(%url, "fetching equipment by coordinate");

        let response = match self
            .send_with_retry(RequestKind::Read, || self.http.get(&url).send())
            .await
        {
            Ok(response) => response,
            Err(GatewayError::SessionExpired) => return Err(GatewayError::SessionExpired),
            Err(err) => {
                // Absence of a record is "slot is empty", never fatal.
                warn!(%url, error = %err, "lookup degraded to empty slot");
                return Ok(None);
            }
        };
        Self::check_session(&response)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            warn!(%url, status = %response.status(), "lookup degraded to empty slot");
            return Ok(None);
        }

        // The backend answers `{}` for an empty slot.
        match response.json::<serde_json::Value>().await {
            Ok(value) => {
                if value.as_object().is_some_and(|o| o.is_empty()) || value.is_null() {
                    return Ok(None);
                }
                match serde_json::from_value::<EquipmentRecord>(value) {
                    Ok(record) => Ok(Some(record)),
                    Err(err) => {
                        warn!(%url, error = %err, "record decode failed, treating slot as empty");
                        Ok(None)
                    }
                }
            }
            Err(err) => {
                warn!(%url, error = %err, "response body unreadable, treating slot as empty");
                Ok(None)
            }
        }
    }

    async fn search(&self, query: &str) -> Result<SearchOutcome, GatewayError> {
        let url = self.url("/search");
        debug!(%url, query, "searching equipment");

        let response = match self
            .send_with_retry(RequestKind::Read, || {
                self.http.get(&url).query(&[("q", query)]).send()
            })
            .await
        {
            Ok(response) => response,
            Err(GatewayError::SessionExpired) => return Err(GatewayError::SessionExpired),
            Err(err) => {
                warn!(query, error = %err, "search degraded to empty outcome");
                return Ok(SearchOutcome::default());
            }
        };
        Self::check_session(&response)?;

        if !response.status().is_success() {
            warn!(query, status = %response.status(), "search degraded to empty outcome");
            return Ok(SearchOutcome::default());
        }

        match response.json::<SearchOutcome>().await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(query, error = %err, "search decode failed, returning empty outcome");
                Ok(SearchOutcome::default())
            }
        }
    }

    async fn submit(&self, request: WorkflowRequest) -> Result<(), GatewayError> {
        let url = self.url(request.endpoint());
        debug!(%url, kind = request.kind(), "submitting workflow request");

        let response = self
            .send_with_retry(RequestKind::Mutation, || {
                self.http.post(&url).json(&request).send()
            })
            .await?;
        Self::check_session(&response)?;

        let status = response.status();
        let ack = response.json::<Ack>().await.map_err(|err| {
            GatewayError::UnexpectedResponse(format!("unparseable acknowledgement: {err}"))
        })?;

        if status.is_success() && ack.accepted() {
            debug!(kind = request.kind(), "workflow request accepted");
            Ok(())
        } else {
            Err(GatewayError::ConflictRejected {
                message: ack.message(),
            })
        }
    }
}
