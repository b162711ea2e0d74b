//! Manual review of flagged items.
//!
//! A FLAGGED_FOR_REVIEW item can be retired or reinstated, always with a
//! written reason. Every decision yields a [`ReviewRecord`] for the audit trail.

use chrono::{DateTime, Utc};
use gauge_core::{Inventory, QuestionId, ValidityStatus, ValidityWriter};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PsychometricsError, Result};

/// Outcome chosen by a reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Retire,
    Reinstate,
}

impl ReviewDecision {
    #[must_use]
    pub fn target(&self) -> ValidityStatus {
        match self {
            Self::Retire => ValidityStatus::Retired,
            Self::Reinstate => ValidityStatus::Active,
        }
    }
}

/// Audit entry for one review decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub question_id: QuestionId,
    pub from: ValidityStatus,
    pub to: ValidityStatus,
    pub reviewer: String,
    pub reason: String,
    pub reviewed_at: DateTime<Utc>,
}

/// Applies review decisions through a [`ValidityWriter`].
#[derive(Debug, Clone)]
pub struct ReviewWorkflow {
    min_reason_chars: usize,
}

impl ReviewWorkflow {
    pub fn new(min_reason_chars: usize) -> Self {
        Self { min_reason_chars }
    }

    /// Review a flagged question.
    ///
    /// Fails with a validation error if the trimmed reason is too short, and
    /// with [`PsychometricsError::NotUnderReview`] unless the item is flagged.
    pub fn review<C>(
        &self,
        catalog: &C,
        question_id: &QuestionId,
        decision: ReviewDecision,
        reviewer: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<ReviewRecord>
    where
        C: Inventory + ValidityWriter + ?Sized,
    {
        let reason = reason.trim();
        if reason.chars().count() < self.min_reason_chars {
            return Err(PsychometricsError::Validation(format!(
                "review reason must be at least {} characters",
                self.min_reason_chars
            )));
        }
        if reviewer.trim().is_empty() {
            return Err(PsychometricsError::Validation(
                "reviewer is required".to_string(),
            ));
        }

        let question = catalog
            .question(question_id)
            .ok_or_else(|| gauge_core::CoreError::NotFound(format!("question {question_id}")))?;
        if question.validity != ValidityStatus::FlaggedForReview {
            return Err(PsychometricsError::NotUnderReview {
                question_id: *question_id,
                status: question.validity,
            });
        }

        let from = ValidityStatus::FlaggedForReview;
        let to = decision.target();
        if !catalog.set_validity_if(question_id, from, to)? {
            let status = catalog
                .question(question_id)
                .map_or(question.validity, |q| q.validity);
            return Err(PsychometricsError::NotUnderReview {
                question_id: *question_id,
                status,
            });
        }
        info!(
            question_id = %question_id,
            from = %from,
            to = %to,
            reviewer,
            "Item review applied"
        );

        Ok(ReviewRecord {
            question_id: *question_id,
            from,
            to,
            reviewer: reviewer.trim().to_string(),
            reason: reason.to_string(),
            reviewed_at: now,
        })
    }
}

impl Default for ReviewWorkflow {
    fn default() -> Self {
        Self::new(gauge_core::config::PsychometricsConfig::default().min_review_reason_chars)
    }
}
