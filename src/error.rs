//! Error taxonomy shared by the stores, the state machine and the command surface.

use serde::Serialize;
use thiserror::Error;

/// Every failure an engine operation can report to its caller.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("unknown or finalized session")]
    InvalidSession,
    #[error("invalid move: {reason}")]
    InvalidMove { reason: &'static str },
    #[error("move submitted too soon, retry in {retry_after_ms} ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("completion after {elapsed_ms} ms is faster than the {minimum_ms} ms minimum")]
    ImplausibleTiming { elapsed_ms: i64, minimum_ms: u64 },
    #[error("session has not been completed")]
    NotCompleted,
    #[error("invalid display name: {reason}")]
    InvalidName { reason: &'static str },
    /// The source is kept for logs; the message itself stays generic.
    #[error("storage unavailable")]
    StorageUnavailable(#[from] sqlx::Error),
}

/// Machine-readable error kind, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidSession,
    InvalidMove,
    RateLimited,
    ImplausibleTiming,
    NotCompleted,
    InvalidName,
    StorageUnavailable,
    BadRequest,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidSession => "invalid_session",
            Self::InvalidMove => "invalid_move",
            Self::RateLimited => "rate_limited",
            Self::ImplausibleTiming => "implausible_timing",
            Self::NotCompleted => "not_completed",
            Self::InvalidName => "invalid_name",
            Self::StorageUnavailable => "storage_unavailable",
            Self::BadRequest => "bad_request",
        }
    }

    /// HTTP-equivalent status class.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidSession => 404,
            Self::RateLimited => 429,
            Self::StorageUnavailable => 500,
            Self::InvalidMove
            | Self::ImplausibleTiming
            | Self::NotCompleted
            | Self::InvalidName
            | Self::BadRequest => 400,
        }
    }

    /// Whether the UI should offer a retry for this kind.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::StorageUnavailable)
    }
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSession => ErrorKind::InvalidSession,
            Self::InvalidMove { .. } => ErrorKind::InvalidMove,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::ImplausibleTiming { .. } => ErrorKind::ImplausibleTiming,
            Self::NotCompleted => ErrorKind::NotCompleted,
            Self::InvalidName { .. } => ErrorKind::InvalidName,
            Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
        }
    }

    /// Wraps a row that cannot be turned back into a domain value.
    pub(crate) fn corrupt_row(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::StorageUnavailable(sqlx::Error::Decode(message.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes_follow_kind() {
        assert_eq!(GameError::InvalidSession.kind().status(), 404);
        assert_eq!(
            GameError::RateLimited { retry_after_ms: 10 }.kind().status(),
            429
        );
        assert_eq!(
            GameError::InvalidMove { reason: "x" }.kind().status(),
            400
        );
        assert_eq!(GameError::corrupt_row("bad").kind().status(), 500);
    }

    #[test]
    fn storage_message_does_not_leak_details() {
        let err = GameError::corrupt_row("column deck held garbage");
        assert_eq!(err.to_string(), "storage unavailable");
        assert!(err.kind().is_retryable());
        assert!(!GameError::NotCompleted.kind().is_retryable());
    }
}
