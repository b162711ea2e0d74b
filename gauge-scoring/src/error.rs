//! Error types for gauge-scoring

use gauge_core::{CoreError, SessionId};
use thiserror::Error;

/// Error type for a single scoring attempt.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// Inputs cannot be scored (session not completed, foreign answers, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A dependency timed out or was briefly unavailable; worth retrying.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// The session already has a result.
    #[error("Session {0} already scored")]
    AlreadyScored(SessionId),

    /// The result store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ScoringError {
    /// Whether retrying the same call can succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Stable tag used in lifecycle events.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Transient(_) => "transient",
            Self::AlreadyScored(_) => "already_scored",
            Self::Storage(_) => "storage",
            Self::Core(e) => e.error_type(),
        }
    }
}

/// Error returned by the resilient orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The circuit is open; the call was not attempted.
    #[error("Scoring circuit is open")]
    CircuitOpen,

    /// Every attempt failed with a transient error.
    #[error("Scoring failed after {attempts} attempt(s): {last}")]
    RetriesExhausted { attempts: u32, last: ScoringError },

    /// A non-retryable scoring failure.
    #[error(transparent)]
    Scoring(ScoringError),
}

impl OrchestratorError {
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::CircuitOpen => "circuit_open",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::Scoring(e) => e.error_type(),
        }
    }
}

/// Result type alias for scoring operations
pub type Result<T> = std::result::Result<T, ScoringError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(ScoringError::Transient("timeout".into()).is_transient());
        assert!(!ScoringError::Validation("bad".into()).is_transient());
        assert!(!ScoringError::Storage("down".into()).is_transient());
    }

    #[test]
    fn orchestrator_error_tags() {
        assert_eq!(OrchestratorError::CircuitOpen.error_type(), "circuit_open");
        let err = OrchestratorError::RetriesExhausted {
            attempts: 3,
            last: ScoringError::Transient("timeout".into()),
        };
        assert_eq!(err.error_type(), "retries_exhausted");
        assert!(err.to_string().contains("3 attempt"));
    }
}
