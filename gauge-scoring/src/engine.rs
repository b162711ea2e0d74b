//! Turns a completed session's answers into a [`TestResult`].
//!
//! Indicator score is the weighted mean of its questions' normalized scores
//! (skipped questions count as 0). Competency score is the indicator-weighted
//! mean, clamped to 0..=100 whatever the weights sum to. The overall score is
//! the plain mean for OVERVIEW and a template-weighted mean otherwise.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use gauge_core::{
    AssessmentStrategy, CompetencyId, CompetencyScore, EngineEvent, EventEmitter, IndicatorId,
    IndicatorScore, Inventory, NewTestResult, Question, QuestionId, RequestContext,
    SessionStatus, TemplateId, TestAnswer, TestResult, TestSession,
};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, info, warn};

use crate::big_five;
use crate::error::{Result, ScoringError};

/// Default passing threshold (percent).
pub const DEFAULT_PASSING_THRESHOLD: f64 = 70.0;

/// Scoring configuration of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateScoring {
    pub template_id: TemplateId,
    pub strategy: AssessmentStrategy,
    pub passing_threshold: f64,
    /// Per-competency weight in the overall score (JOB_FIT / TEAM_FIT).
    /// Missing competencies weigh 1.0.
    #[serde(default)]
    pub competency_weights: BTreeMap<CompetencyId, f64>,
}

impl TemplateScoring {
    #[must_use]
    pub fn new(template_id: TemplateId, strategy: AssessmentStrategy) -> Self {
        Self {
            template_id,
            strategy,
            passing_threshold: DEFAULT_PASSING_THRESHOLD,
            competency_weights: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_passing_threshold(mut self, threshold: f64) -> Self {
        self.passing_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_competency_weights(mut self, weights: BTreeMap<CompetencyId, f64>) -> Self {
        self.competency_weights = weights;
        self
    }

    fn weight_of(&self, competency: &CompetencyId) -> f64 {
        self.competency_weights.get(competency).copied().unwrap_or(1.0)
    }
}

/// Something that can score a completed session.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(
        &self,
        session: &TestSession,
        answers: &[TestAnswer],
        template: &TemplateScoring,
        ctx: &RequestContext,
    ) -> Result<TestResult>;
}

/// The scoring engine.
pub struct ScoringEngine {
    inventory: Arc<dyn Inventory>,
    emitter: Option<EventEmitter>,
}

impl ScoringEngine {
    pub fn new(inventory: Arc<dyn Inventory>) -> Self {
        Self {
            inventory,
            emitter: None,
        }
    }

    #[must_use]
    pub fn with_emitter(mut self, emitter: EventEmitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Pure computation, no events.
    pub fn compute(
        &self,
        session: &TestSession,
        answers: &[TestAnswer],
        template: &TemplateScoring,
    ) -> Result<TestResult> {
        if session.status() != SessionStatus::Completed {
            return Err(ScoringError::Validation(format!(
                "session {} is {}, not COMPLETED",
                session.id,
                session.status()
            )));
        }
        if session.template_id != template.template_id {
            return Err(ScoringError::Validation(format!(
                "session {} belongs to template {}, not {}",
                session.id, session.template_id, template.template_id
            )));
        }

        let in_session: HashSet<QuestionId> = session.question_order.iter().copied().collect();
        let mut by_question: HashMap<QuestionId, &TestAnswer> = HashMap::new();
        for answer in answers {
            if answer.session_id() != session.id {
                return Err(ScoringError::Validation(format!(
                    "answer to {} belongs to session {}",
                    answer.question_id(),
                    answer.session_id()
                )));
            }
            if !in_session.contains(&answer.question_id()) {
                return Err(ScoringError::Validation(format!(
                    "question {} is not part of session {}",
                    answer.question_id(),
                    session.id
                )));
            }
            if by_question.insert(answer.question_id(), answer).is_some() {
                return Err(ScoringError::Validation(format!(
                    "question {} answered twice",
                    answer.question_id()
                )));
            }
        }

        let mut tally = Tally::default();
        let mut personality = Vec::new();
        let mut answered_count = 0;
        let mut skipped_count = 0;

        for question_id in &session.question_order {
            let question = self.inventory.question(question_id).ok_or_else(|| {
                ScoringError::Validation(format!("question {question_id} not in catalog"))
            })?;
            // Missing answers count as skipped
            let score = by_question
                .get(question_id)
                .and_then(|a| a.normalized_score());
            if score.is_some() {
                answered_count += 1;
            } else {
                skipped_count += 1;
            }

            if let Some(trait_) = question.big_five_trait {
                personality.push((trait_, score));
                continue;
            }
            tally.add(self.inventory.as_ref(), &question, score)?;
        }

        let competency_scores = tally.finish(self.inventory.as_ref());
        let overall_percentage = overall_score(&competency_scores, template);
        let big_five = if template.strategy == AssessmentStrategy::Overview && !personality.is_empty()
        {
            Some(big_five::aggregate(personality)).filter(|m| !m.is_empty())
        } else {
            None
        };

        Ok(NewTestResult {
            session_id: session.id,
            template_id: template.template_id,
            candidate_id: session.candidate_id.clone(),
            strategy: template.strategy,
            competency_scores,
            overall_percentage,
            passed: overall_percentage >= template.passing_threshold,
            big_five,
            answered_count,
            skipped_count,
            completed_at: session.finished_at().unwrap_or(session.created_at),
        }
        .into())
    }

    fn emit(&self, strategy: AssessmentStrategy, ctx: &RequestContext, event: EngineEvent) {
        if let Some(emitter) = &self.emitter {
            emitter.emit(strategy, ctx, event);
        }
    }
}

#[async_trait]
impl Scorer for ScoringEngine {
    async fn score(
        &self,
        session: &TestSession,
        answers: &[TestAnswer],
        template: &TemplateScoring,
        ctx: &RequestContext,
    ) -> Result<TestResult> {
        let span = ctx.span("score");
        async move {
            let strategy = template.strategy;
            self.emit(
                strategy,
                ctx,
                EngineEvent::ScoringStarted {
                    answer_count: answers.len(),
                },
            );
            let started = Instant::now();
            let result = self.compute(session, answers, template);
            let duration_ms = started.elapsed().as_millis() as u64;

            match &result {
                Ok(r) => {
                    info!(
                        session_id = %session.id,
                        score = r.overall_percentage,
                        passed = r.passed,
                        duration_ms,
                        "Scoring completed"
                    );
                    self.emit(
                        strategy,
                        ctx,
                        EngineEvent::ScoringCompleted {
                            score: r.overall_percentage,
                            passed: r.passed,
                            duration_ms,
                        },
                    );
                }
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "Scoring failed");
                    self.emit(
                        strategy,
                        ctx,
                        EngineEvent::ScoringFailed {
                            error_type: e.error_type().to_string(),
                            duration_ms,
                        },
                    );
                }
            }
            result
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for ScoringEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringEngine")
            .field("emits_events", &self.emitter.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
struct IndicatorTally {
    weighted: f64,
    weight: f64,
    plain: f64,
    count: usize,
    answered: usize,
    skipped: usize,
}

/// Accumulates question scores per indicator, keeping first-seen order.
#[derive(Debug, Default)]
struct Tally {
    competency_order: Vec<CompetencyId>,
    indicators: HashMap<IndicatorId, (CompetencyId, f64, IndicatorTally)>,
    indicator_order: Vec<IndicatorId>,
}

impl Tally {
    fn add(&mut self, inventory: &dyn Inventory, question: &Question, score: Option<f64>) -> Result<()> {
        if !self.indicators.contains_key(&question.indicator_id) {
            let indicator = inventory.indicator(&question.indicator_id).ok_or_else(|| {
                ScoringError::Validation(format!(
                    "indicator {} of question {} not in catalog",
                    question.indicator_id, question.id
                ))
            })?;
            if !self.competency_order.contains(&indicator.competency_id) {
                self.competency_order.push(indicator.competency_id);
            }
            self.indicator_order.push(indicator.id);
            self.indicators.insert(
                indicator.id,
                (indicator.competency_id, indicator.weight, IndicatorTally::default()),
            );
        }

        if let Some((_, _, t)) = self.indicators.get_mut(&question.indicator_id) {
            let s = score.unwrap_or(0.0);
            let w = question.weight.max(0.0);
            t.weighted += w * s;
            t.weight += w;
            t.plain += s;
            t.count += 1;
            if score.is_some() {
                t.answered += 1;
            } else {
                t.skipped += 1;
            }
        }
        Ok(())
    }

    fn finish(mut self, inventory: &dyn Inventory) -> Vec<CompetencyScore> {
        let mut per_competency: HashMap<CompetencyId, Vec<IndicatorScore>> = HashMap::new();
        for id in &self.indicator_order {
            if let Some((competency_id, weight, t)) = self.indicators.remove(id) {
                let mean = if t.weight > 0.0 {
                    t.weighted / t.weight
                } else {
                    t.plain / t.count.max(1) as f64
                };
                per_competency
                    .entry(competency_id)
                    .or_default()
                    .push(IndicatorScore {
                        indicator_id: *id,
                        score: (mean * 100.0).clamp(0.0, 100.0),
                        weight,
                        answered: t.answered,
                        skipped: t.skipped,
                    });
            }
        }

        self.competency_order
            .into_iter()
            .map(|competency_id| {
                let indicators = per_competency.remove(&competency_id).unwrap_or_default();
                let score = competency_score(&indicators);
                let name = inventory
                    .competency(&competency_id)
                    .map(|c| c.name)
                    .unwrap_or_else(|| competency_id.to_string());
                debug!(competency_id = %competency_id, score, "Competency scored");
                CompetencyScore {
                    competency_id,
                    name,
                    score,
                    indicators,
                }
            })
            .collect()
    }
}

/// Indicator-weighted mean, plain mean when the weights sum to 0.
#[must_use]
pub fn competency_score(indicators: &[IndicatorScore]) -> f64 {
    if indicators.is_empty() {
        return 0.0;
    }
    let total_weight: f64 = indicators.iter().map(|i| i.weight.max(0.0)).sum();
    let score = if total_weight > 0.0 {
        indicators
            .iter()
            .map(|i| i.weight.max(0.0) * i.score)
            .sum::<f64>()
            / total_weight
    } else {
        indicators.iter().map(|i| i.score).sum::<f64>() / indicators.len() as f64
    };
    score.clamp(0.0, 100.0)
}

/// Overall percentage for a template's strategy.
#[must_use]
pub fn overall_score(competencies: &[CompetencyScore], template: &TemplateScoring) -> f64 {
    if competencies.is_empty() {
        return 0.0;
    }
    let mean = competencies.iter().map(|c| c.score).sum::<f64>() / competencies.len() as f64;
    match template.strategy {
        AssessmentStrategy::Overview => mean,
        AssessmentStrategy::JobFit | AssessmentStrategy::TeamFit => {
            let total: f64 = competencies
                .iter()
                .map(|c| template.weight_of(&c.competency_id).max(0.0))
                .sum();
            if total <= 0.0 {
                return mean;
            }
            competencies
                .iter()
                .map(|c| template.weight_of(&c.competency_id).max(0.0) * c.score)
                .sum::<f64>()
                / total
        }
    }
}
