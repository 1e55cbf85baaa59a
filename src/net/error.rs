//! Failure taxonomy for `SafeFetch`.

use thiserror::Error;

use super::abort::AbortReason;

/// Why a fetch produced no response.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The request was cancelled, by the caller or by the internal timeout.
    #[error("request aborted: {0}")]
    Aborted(AbortReason),

    /// No response could be obtained (DNS, connect, reset, unreadable body).
    #[error("network request failed: {0}")]
    Network(String),
}

impl FetchError {
    /// Returns `true` for cancellations that only warrant a debug log.
    #[must_use]
    pub fn is_expected_abort(&self) -> bool {
        match self {
            Self::Aborted(reason) => reason.is_expected(),
            Self::Network(_) => false,
        }
    }

    /// Best-effort description of the underlying cause.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Aborted(reason) => reason.describe(),
            Self::Network(message) if message.trim().is_empty() => "unknown".to_string(),
            Self::Network(message) => message.clone(),
        }
    }
}
