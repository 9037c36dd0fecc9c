use thiserror::Error;

pub type Result<T> = std::result::Result<T, TriageError>;

/// Failure taxonomy for the triage flow.
///
/// `Validation` is detected before any network call and never moves the
/// flow controller out of its current phase. `Transport` covers network
/// failures and non-success statuses; the session id is retained so a
/// user-initiated retry can reuse it. `Protocol` means the service
/// answered successfully but the response is missing or misusing a field
/// the branch decision depends on; no default branch is guessed.
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl TriageError {
    /// Human-readable cause category for the uniform "operation failed"
    /// notification surfaced to the presenter.
    pub fn category(&self) -> &'static str {
        match self {
            TriageError::Validation(_) => "validation",
            TriageError::Transport(_) => "transport",
            TriageError::Protocol(_) => "protocol",
        }
    }

    /// Only transport failures are safe to replay: the remote operations
    /// are idempotent and the request that failed never changed state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TriageError::Transport(_))
    }
}

impl From<reqwest::Error> for TriageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TriageError::Protocol(err.to_string())
        } else {
            TriageError::Transport(err.to_string())
        }
    }
}
