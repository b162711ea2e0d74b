//! Error types for gauge-core

use thiserror::Error;

/// Error type for domain-model operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A session was asked to move to a state it cannot reach.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    /// An answer does not fit the question it responds to.
    #[error("Invalid answer for question {question_id}: {reason}")]
    InvalidAnswer { question_id: String, reason: String },

    /// A referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A backing store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Stable tag used in lifecycle events.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidStateTransition { .. } => "invalid_state_transition",
            Self::InvalidAnswer { .. } => "invalid_answer",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
