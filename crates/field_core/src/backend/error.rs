/// Errors surfaced by a [`DispatchBackend`](super::DispatchBackend) call.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No network path to the backend. Callers treat this as a no-op.
    #[error("backend unreachable")]
    Offline,

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl BackendError {
    pub fn is_offline(&self) -> bool {
        matches!(self, BackendError::Offline)
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            BackendError::Offline
        } else if err.is_timeout() {
            BackendError::Timeout
        } else if let Some(status) = err.status() {
            BackendError::Status(status.as_u16())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}
