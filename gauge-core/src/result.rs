//! Scored outcome of a completed session.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::BigFiveTrait;
use crate::ids::{CandidateId, CompetencyId, IndicatorId, ResultId, SessionId, TemplateId};
use crate::strategy::AssessmentStrategy;

/// Score of one behavioral indicator (0–100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorScore {
    pub indicator_id: IndicatorId,
    pub score: f64,
    pub weight: f64,
    pub answered: usize,
    pub skipped: usize,
}

/// Score of one competency (0–100) with its indicator breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetencyScore {
    pub competency_id: CompetencyId,
    pub name: String,
    pub score: f64,
    pub indicators: Vec<IndicatorScore>,
}

/// Result of a completed session.
///
/// Created once per session by scoring. Only the percentile changes
/// afterwards, through [`TestResult::set_percentile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: ResultId,
    pub session_id: SessionId,
    pub template_id: TemplateId,
    pub candidate_id: CandidateId,
    pub strategy: AssessmentStrategy,
    pub competency_scores: Vec<CompetencyScore>,
    pub overall_percentage: f64,
    pub passed: bool,
    percentile: Option<u8>,
    /// Big Five trait averages (0–100), OVERVIEW only.
    pub big_five: Option<BTreeMap<BigFiveTrait, f64>>,
    pub answered_count: usize,
    pub skipped_count: usize,
    pub completed_at: DateTime<Utc>,
    pub scored_at: DateTime<Utc>,
}

impl TestResult {
    /// Percentile rank within the template cohort, once computed.
    #[must_use]
    pub fn percentile(&self) -> Option<u8> {
        self.percentile
    }

    /// Update the percentile. Returns whether the stored value changed.
    pub fn set_percentile(&mut self, percentile: u8) -> bool {
        let percentile = percentile.min(100);
        if self.percentile == Some(percentile) {
            return false;
        }
        self.percentile = Some(percentile);
        true
    }

    /// Look up a competency score.
    #[must_use]
    pub fn competency(&self, id: &CompetencyId) -> Option<&CompetencyScore> {
        self.competency_scores.iter().find(|c| &c.competency_id == id)
    }
}

/// Builder-style constructor arguments for [`TestResult`].
#[derive(Debug, Clone)]
pub struct NewTestResult {
    pub session_id: SessionId,
    pub template_id: TemplateId,
    pub candidate_id: CandidateId,
    pub strategy: AssessmentStrategy,
    pub competency_scores: Vec<CompetencyScore>,
    pub overall_percentage: f64,
    pub passed: bool,
    pub big_five: Option<BTreeMap<BigFiveTrait, f64>>,
    pub answered_count: usize,
    pub skipped_count: usize,
    pub completed_at: DateTime<Utc>,
}

impl From<NewTestResult> for TestResult {
    fn from(new: NewTestResult) -> Self {
        Self {
            id: ResultId::new(),
            session_id: new.session_id,
            template_id: new.template_id,
            candidate_id: new.candidate_id,
            strategy: new.strategy,
            competency_scores: new.competency_scores,
            overall_percentage: new.overall_percentage,
            passed: new.passed,
            percentile: None,
            big_five: new.big_five,
            answered_count: new.answered_count,
            skipped_count: new.skipped_count,
            completed_at: new.completed_at,
            scored_at: Utc::now(),
        }
    }
}
