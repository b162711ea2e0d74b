//! Error types for gauge-psychometrics

use gauge_core::{CoreError, QuestionId, ValidityStatus};
use thiserror::Error;

/// Error type for psychometric analysis and review.
#[derive(Debug, Error)]
pub enum PsychometricsError {
    /// The request cannot be analyzed (sample too small, overlapping groups, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A manual review was attempted on an item that is not awaiting review.
    #[error("Question {question_id} is {status}, only FLAGGED_FOR_REVIEW items can be reviewed")]
    NotUnderReview {
        question_id: QuestionId,
        status: ValidityStatus,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl PsychometricsError {
    /// Stable tag for logs and events.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotUnderReview { .. } => "not_under_review",
            Self::Core(e) => e.error_type(),
        }
    }
}

/// Result type alias for psychometric operations
pub type Result<T> = std::result::Result<T, PsychometricsError>;
