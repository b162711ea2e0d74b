//! Side-effect workers run after a result is saved.
//!
//! Each worker owns one concern and is driven by the
//! [`SideEffectDispatcher`](crate::dispatcher::SideEffectDispatcher) on its own
//! task. A failing worker never affects the scored result or the other workers.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use gauge_core::{
    Inventory, PassportStore, PassportUpdate, QuestionId, ValidityWriter, to_passport_score,
};
use gauge_psychometrics::{ItemResponse, ItemStatisticsAnalyzer};
use gauge_scoring::PercentileEngine;
use tracing::{debug, info, warn};

use crate::audit::{AuditRecord, AuditSink};
use crate::error::Result;
use crate::history::{ItemStatisticsStore, ResponseHistory};
use crate::signal::ScoringSignal;

/// A side effect of a scored session.
#[async_trait]
pub trait SideEffectWorker: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn handle(&self, signal: &ScoringSignal) -> Result<()>;
}

/// Re-ranks recent results of the signal's template.
pub struct PercentileWorker {
    engine: Arc<PercentileEngine>,
}

impl PercentileWorker {
    pub fn new(engine: Arc<PercentileEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl SideEffectWorker for PercentileWorker {
    fn name(&self) -> &'static str {
        "percentile"
    }

    async fn handle(&self, signal: &ScoringSignal) -> Result<()> {
        let report = self
            .engine
            .recalculate_recent(&signal.result.template_id, Utc::now())
            .await?;
        debug!(
            template_id = %signal.result.template_id,
            examined = report.examined,
            updated = report.updated,
            "Percentile worker pass"
        );
        Ok(())
    }
}

/// Writes competency scores and Big Five averages to the candidate's passport.
///
/// Competencies not covered by this result keep the values of the candidate's
/// current valid passport.
pub struct PassportWorker {
    store: Arc<dyn PassportStore>,
    validity_days: i64,
}

impl PassportWorker {
    pub fn new(store: Arc<dyn PassportStore>, validity_days: i64) -> Self {
        Self {
            store,
            validity_days,
        }
    }
}

#[async_trait]
impl SideEffectWorker for PassportWorker {
    fn name(&self) -> &'static str {
        "passport"
    }

    async fn handle(&self, signal: &ScoringSignal) -> Result<()> {
        let result = &signal.result;
        let existing = self
            .store
            .find_valid(&result.candidate_id, Utc::now())
            .await?;

        let (mut competency_scores, mut big_five) = existing
            .map(|p| (p.competency_scores, p.big_five))
            .unwrap_or_default();
        for score in &result.competency_scores {
            competency_scores.insert(score.competency_id, to_passport_score(score.score));
        }
        if let Some(traits) = &result.big_five {
            big_five.extend(traits.iter().map(|(t, v)| (*t, *v)));
        }

        let passport = self
            .store
            .upsert(PassportUpdate {
                candidate_id: result.candidate_id.clone(),
                competency_scores,
                big_five,
                source_result_id: result.id,
                validity_days: self.validity_days,
            })
            .await?;
        info!(
            candidate_id = %passport.candidate_id,
            competencies = passport.competency_scores.len(),
            expires_at = %passport.expires_at,
            "Passport updated"
        );
        Ok(())
    }
}

/// Persists an [`AuditRecord`] per scored session.
pub struct AuditWorker {
    sink: Arc<dyn AuditSink>,
}

impl AuditWorker {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl SideEffectWorker for AuditWorker {
    fn name(&self) -> &'static str {
        "audit"
    }

    async fn handle(&self, signal: &ScoringSignal) -> Result<()> {
        self.sink
            .write(AuditRecord::from_signal(signal, Utc::now()))
            .await
    }
}

/// Records responses and recomputes statistics of every answered item.
///
/// The total test score of a respondent is the result's overall percentage.
/// Presented items without an answer are recorded with zero credit.
/// Personality items are not analyzed. Validity changes go through the
/// [`ValidityWriter`] so concurrent assembly sees them on its next read.
pub struct ItemAnalysisWorker {
    inventory: Arc<dyn Inventory>,
    writer: Arc<dyn ValidityWriter>,
    history: Arc<dyn ResponseHistory>,
    stats: Arc<dyn ItemStatisticsStore>,
    analyzer: ItemStatisticsAnalyzer,
}

impl ItemAnalysisWorker {
    pub fn new(
        inventory: Arc<dyn Inventory>,
        writer: Arc<dyn ValidityWriter>,
        history: Arc<dyn ResponseHistory>,
        stats: Arc<dyn ItemStatisticsStore>,
        analyzer: ItemStatisticsAnalyzer,
    ) -> Self {
        Self {
            inventory,
            writer,
            history,
            stats,
            analyzer,
        }
    }

    async fn analyze(&self, question_id: QuestionId) -> Result<()> {
        let Some(question) = self.inventory.question(&question_id) else {
            warn!(question_id = %question_id, "Answered question missing from catalog");
            return Ok(());
        };
        let responses = self.history.responses(&question_id).await?;
        let previous = self.stats.get(&question_id).await?;
        let mut stats = self.analyzer.analyze(
            question_id,
            &responses,
            question.validity,
            previous.as_ref(),
            Utc::now(),
        );

        if stats.validity != question.validity {
            if self
                .writer
                .set_validity_if(&question_id, question.validity, stats.validity)?
            {
                warn!(
                    question_id = %question_id,
                    from = %question.validity,
                    to = %stats.validity,
                    discrimination = ?stats.discrimination,
                    "Item validity changed"
                );
            } else {
                // Someone else moved the item meanwhile; their status wins
                let current = self
                    .inventory
                    .question(&question_id)
                    .map_or(question.validity, |q| q.validity);
                debug!(
                    question_id = %question_id,
                    current = %current,
                    computed = %stats.validity,
                    "Validity changed concurrently, keeping current status"
                );
                stats.validity = current;
            }
        }
        self.stats.put(stats).await
    }
}

#[async_trait]
impl SideEffectWorker for ItemAnalysisWorker {
    fn name(&self) -> &'static str {
        "item_analysis"
    }

    async fn handle(&self, signal: &ScoringSignal) -> Result<()> {
        let total_score = signal.result.overall_percentage;
        let mut scores: BTreeMap<QuestionId, f64> = BTreeMap::new();

        // Presented but unanswered items count as zero credit
        for question_id in &signal.question_order {
            scores.insert(*question_id, 0.0);
        }
        for answer in &signal.answers {
            scores.insert(answer.question_id(), answer.normalized_score().unwrap_or(0.0));
        }

        let mut analyzed = Vec::with_capacity(scores.len());
        for (question_id, item_score) in scores {
            if self
                .inventory
                .question(&question_id)
                .is_none_or(|q| q.is_personality())
            {
                continue;
            }
            self.history
                .record(
                    question_id,
                    ItemResponse {
                        session_id: signal.result.session_id,
                        item_score,
                        total_score,
                    },
                )
                .await?;
            analyzed.push(question_id);
        }

        for question_id in &analyzed {
            self.analyze(*question_id).await?;
        }
        debug!(items = analyzed.len(), "Item analysis pass");
        Ok(())
    }
}
