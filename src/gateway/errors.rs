use thiserror::Error;

/// Errors the gateway can surface to the orchestrator.
///
/// Lookup paths swallow `Transport` into "slot is empty" after the
/// bounded retries run out; mutating paths propagate everything.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("session expired; re-authentication required")]
    SessionExpired,

    /// The backend refused a transition because of a state
    /// precondition. Recoverable by refreshing state, never retried
    /// automatically.
    #[error("backend rejected the request: {message}")]
    ConflictRejected { message: String },

    #[error("unexpected response from backend: {0}")]
    UnexpectedResponse(String),
}

impl GatewayError {
    /// Transient failures worth another attempt inside the bounded
    /// retry loop. Rejections and expiry are never retried.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Transport(err) => {
                err.is_timeout() || err.is_connect() || err.status().is_some_and(|s| s.is_server_error())
            }
            GatewayError::SessionExpired
            | GatewayError::ConflictRejected { .. }
            | GatewayError::UnexpectedResponse(_) => false,
        }
    }
}
