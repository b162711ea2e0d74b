//! Error types for gauge-pipeline

use gauge_core::CoreError;
use gauge_psychometrics::PsychometricsError;
use gauge_scoring::{OrchestratorError, ScoringError};
use thiserror::Error;

/// Error type for the completion pipeline and its workers.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The session cannot be completed as requested.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Scoring failed after the resilience policy gave up.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error(transparent)]
    Psychometrics(#[from] PsychometricsError),

    /// A side-effect sink failed.
    #[error("Sink error: {0}")]
    Sink(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl PipelineError {
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Orchestrator(e) => e.error_type(),
            Self::Scoring(e) => e.error_type(),
            Self::Psychometrics(e) => e.error_type(),
            Self::Sink(_) => "sink",
            Self::Core(e) => e.error_type(),
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
