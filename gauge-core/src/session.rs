//! Test sessions and recorded answers.
//!
//! A session moves NOT_STARTED → IN_PROGRESS → {COMPLETED | ABANDONED | TIMED_OUT}.
//! Answers are normalized once, when recorded, and are immutable afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Question, QuestionType};
use crate::error::{CoreError, Result};
use crate::ids::{CandidateId, OptionId, QuestionId, SessionId, TemplateId};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Abandoned,
    TimedOut,
}

impl SessionStatus {
    /// Whether no further transitions are possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned | Self::TimedOut)
    }

    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Abandoned => "ABANDONED",
            Self::TimedOut => "TIMED_OUT",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One assessment attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSession {
    pub id: SessionId,
    pub template_id: TemplateId,
    pub candidate_id: CandidateId,
    status: SessionStatus,
    /// Ordered question set produced by assembly.
    pub question_order: Vec<QuestionId>,
    pub created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl TestSession {
    /// Create a session that has not started yet.
    #[must_use]
    pub fn new(
        template_id: TemplateId,
        candidate_id: CandidateId,
        question_order: Vec<QuestionId>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            template_id,
            candidate_id,
            status: SessionStatus::NotStarted,
            question_order,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// When the session reached a terminal state.
    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn start(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.transition(SessionStatus::NotStarted, SessionStatus::InProgress)?;
        self.started_at = Some(at);
        Ok(())
    }

    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.finish(SessionStatus::Completed, at)
    }

    pub fn abandon(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.finish(SessionStatus::Abandoned, at)
    }

    pub fn time_out(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.finish(SessionStatus::TimedOut, at)
    }

    fn finish(&mut self, to: SessionStatus, at: DateTime<Utc>) -> Result<()> {
        self.transition(SessionStatus::InProgress, to)?;
        self.finished_at = Some(at);
        Ok(())
    }

    fn transition(&mut self, expected: SessionStatus, to: SessionStatus) -> Result<()> {
        if self.status != expected {
            return Err(CoreError::InvalidStateTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }
}

/// Raw response to a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Skipped,
    Likert(u8),
    Choice(OptionId),
    MultiChoice(Vec<OptionId>),
    /// Externally graded credit in 0.0–1.0.
    Numeric(f64),
}

/// One immutable response within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestAnswer {
    session_id: SessionId,
    question_id: QuestionId,
    value: AnswerValue,
    normalized_score: Option<f64>,
    answered_at: DateTime<Utc>,
}

impl TestAnswer {
    /// Record an answer, normalizing it against the question.
    pub fn record(
        session_id: SessionId,
        question: &Question,
        value: AnswerValue,
        answered_at: DateTime<Utc>,
    ) -> Result<Self> {
        let normalized_score = normalize(question, &value)?;
        Ok(Self {
            session_id,
            question_id: question.id,
            value,
            normalized_score,
            answered_at,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn value(&self) -> &AnswerValue {
        &self.value
    }

    /// Credit in 0.0–1.0, `None` when skipped.
    #[must_use]
    pub fn normalized_score(&self) -> Option<f64> {
        self.normalized_score
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self.value, AnswerValue::Skipped)
    }

    #[must_use]
    pub fn answered_at(&self) -> DateTime<Utc> {
        self.answered_at
    }
}

fn invalid(question: &Question, reason: impl Into<String>) -> CoreError {
    CoreError::InvalidAnswer {
        question_id: question.id.to_string(),
        reason: reason.into(),
    }
}

/// Convert a raw response into credit in 0.0–1.0.
fn normalize(question: &Question, value: &AnswerValue) -> Result<Option<f64>> {
    let score = match (question.question_type, value) {
        (_, AnswerValue::Skipped) => return Ok(None),
        (QuestionType::Likert, AnswerValue::Likert(v)) => {
            let max = question.scale_max.max(2);
            if *v < 1 || *v > max {
                return Err(invalid(question, format!("likert value {v} outside 1..={max}")));
            }
            let raw = f64::from(*v - 1) / f64::from(max - 1);
            if question.reverse_scored { 1.0 - raw } else { raw }
        }
        (
            QuestionType::MultipleChoice
            | QuestionType::SituationalJudgment
            | QuestionType::CapabilityAssessment,
            AnswerValue::Choice(option_id),
        ) => question
            .option(option_id)
            .map(|o| o.score)
            .ok_or_else(|| invalid(question, format!("unknown option {option_id}")))?,
        (QuestionType::MultiSelect, AnswerValue::MultiChoice(selected)) => {
            let available: f64 = question
                .options
                .iter()
                .filter(|o| o.score > 0.0)
                .map(|o| o.score)
                .sum();
            if available <= 0.0 {
                return Err(invalid(question, "no creditable options"));
            }
            let mut earned = 0.0;
            for id in selected {
                let option = question
                    .option(id)
                    .ok_or_else(|| invalid(question, format!("unknown option {id}")))?;
                if option.score > 0.0 {
                    earned += option.score;
                } else {
                    earned -= available / question.options.len().max(1) as f64;
                }
            }
            earned / available
        }
        (QuestionType::Numeric, AnswerValue::Numeric(v)) => {
            if !v.is_finite() {
                return Err(invalid(question, "numeric score is not finite"));
            }
            *v
        }
        (question_type, other) => {
            return Err(invalid(
                question,
                format!("{other:?} does not fit {question_type:?}"),
            ));
        }
    };
    Ok(Some(score.clamp(0.0, 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AnswerOption, DifficultyLevel, ValidityStatus};
    use crate::ids::IndicatorId;

    fn question(question_type: QuestionType, options: Vec<AnswerOption>) -> Question {
        Question {
            id: QuestionId::new(),
            indicator_id: IndicatorId::new(),
            text: "q".to_string(),
            question_type,
            difficulty: DifficultyLevel::Intermediate,
            active: true,
            validity: ValidityStatus::Active,
            options,
            scale_max: 5,
            reverse_scored: false,
            weight: 1.0,
            big_five_trait: None,
        }
    }

    fn option(score: f64) -> AnswerOption {
        AnswerOption {
            id: OptionId::new(),
            label: format!("option {score}"),
            score,
        }
    }

    #[test]
    fn session_follows_state_machine() {
        let mut session = TestSession::new(TemplateId::new(), "cand-1".into(), vec![]);
        assert_eq!(session.status(), SessionStatus::NotStarted);

        session.start(Utc::now()).unwrap();
        assert_eq!(session.status(), SessionStatus::InProgress);

        session.complete(Utc::now()).unwrap();
        assert_eq!(session.status(), SessionStatus::Completed);
        assert!(session.status().is_terminal());
        assert!(session.finished_at().is_some());
    }

    #[test]
    fn session_cannot_complete_before_start() {
        let mut session = TestSession::new(TemplateId::new(), "cand-1".into(), vec![]);
        let err = session.complete(Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStateTransition { .. }));
        assert_eq!(session.status(), SessionStatus::NotStarted);
    }

    #[test]
    fn terminal_session_rejects_further_transitions() {
        let mut session = TestSession::new(TemplateId::new(), "cand-1".into(), vec![]);
        session.start(Utc::now()).unwrap();
        session.time_out(Utc::now()).unwrap();
        assert!(session.abandon(Utc::now()).is_err());
        assert_eq!(session.status(), SessionStatus::TimedOut);
    }

    #[test]
    fn likert_normalizes_and_reverses() {
        let mut q = question(QuestionType::Likert, vec![]);
        let a = TestAnswer::record(SessionId::new(), &q, AnswerValue::Likert(5), Utc::now())
            .unwrap();
        assert_eq!(a.normalized_score(), Some(1.0));

        q.reverse_scored = true;
        let a = TestAnswer::record(SessionId::new(), &q, AnswerValue::Likert(2), Utc::now())
            .unwrap();
        assert_eq!(a.normalized_score(), Some(0.75));
    }

    #[test]
    fn likert_out_of_range_is_rejected() {
        let q = question(QuestionType::Likert, vec![]);
        let err = TestAnswer::record(SessionId::new(), &q, AnswerValue::Likert(6), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidAnswer { .. }));
    }

    #[test]
    fn choice_uses_option_score() {
        let graded = option(0.5);
        let q = question(
            QuestionType::SituationalJudgment,
            vec![option(1.0), graded.clone(), option(0.0)],
        );
        let a = TestAnswer::record(
            SessionId::new(),
            &q,
            AnswerValue::Choice(graded.id),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(a.normalized_score(), Some(0.5));
    }

    #[test]
    fn multi_select_penalizes_wrong_picks() {
        let right_a = option(1.0);
        let right_b = option(1.0);
        let wrong = option(0.0);
        let q = question(
            QuestionType::MultiSelect,
            vec![right_a.clone(), right_b.clone(), wrong.clone(), option(0.0)],
        );

        let all_right = TestAnswer::record(
            SessionId::new(),
            &q,
            AnswerValue::MultiChoice(vec![right_a.id, right_b.id]),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(all_right.normalized_score(), Some(1.0));

        let mixed = TestAnswer::record(
            SessionId::new(),
            &q,
            AnswerValue::MultiChoice(vec![right_a.id, wrong.id]),
            Utc::now(),
        )
        .unwrap();
        // (1.0 - 2.0 / 4) / 2.0
        assert_eq!(mixed.normalized_score(), Some(0.25));
    }

    #[test]
    fn skipped_answer_has_no_score() {
        let q = question(QuestionType::Likert, vec![]);
        let a = TestAnswer::record(SessionId::new(), &q, AnswerValue::Skipped, Utc::now())
            .unwrap();
        assert!(a.is_skipped());
        assert_eq!(a.normalized_score(), None);
    }

    #[test]
    fn mismatched_answer_kind_is_rejected() {
        let q = question(QuestionType::Likert, vec![]);
        let err = TestAnswer::record(
            SessionId::new(),
            &q,
            AnswerValue::Choice(OptionId::new()),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidAnswer { .. }));
    }
}
