//! The blueprint assembler.
//!
//! Each strategy turns its blueprint into a [`Plan`] (which competencies, at
//! what difficulty, how many questions per indicator). Picking is shared, so
//! every strategy gets the same fallback, borrowing and health reporting.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use gauge_core::{
    AssessmentStrategy, BehavioralIndicator, BigFiveTrait, CandidateId, CompetencyId,
    DifficultyLevel, EngineEvent, EventEmitter, InMemoryPassportStore, Inventory, PassportStore,
    Question, QuestionId, RequestContext, TemplateId, TestSession,
};
use gauge_core::config::AssemblyConfig;
use serde::Serialize;
use tracing::{Instrument, debug, info, warn};

use crate::blueprint::{Blueprint, ValidatedBlueprint};
use crate::collaborators::{
    BenchmarkLookup, StaticBenchmarkLookup, StaticTeamProfileLookup, TeamProfileLookup,
};
use crate::error::{AssemblyError, Result};
use crate::health::HealthEntry;
use crate::selector::Selector;
use crate::warnings::{Warning, WarningCode};
use crate::{job_fit, overview, team_fit};

/// One competency to assess.
#[derive(Debug, Clone)]
pub(crate) struct PlannedCompetency {
    pub competency_id: CompetencyId,
    pub target: DifficultyLevel,
    pub per_indicator: usize,
    /// Allowed difficulty distance from `target`; `None` is unlimited.
    pub max_distance: Option<usize>,
    /// Weight of this competency in the overall score.
    pub scoring_weight: f64,
}

/// Output of a strategy's planning step.
#[derive(Debug, Default)]
pub(crate) struct Plan {
    pub competencies: Vec<PlannedCompetency>,
    pub warnings: Vec<Warning>,
}

/// Ordered question set and diagnostics for a new session.
#[derive(Debug, Clone, Serialize)]
pub struct AssemblyOutcome {
    pub strategy: AssessmentStrategy,
    pub questions: Vec<Question>,
    pub warnings: Vec<Warning>,
    pub health: Vec<HealthEntry>,
    /// Weight of each assessed competency in the overall score.
    pub competency_weights: BTreeMap<CompetencyId, f64>,
}

impl AssemblyOutcome {
    #[must_use]
    pub fn question_ids(&self) -> Vec<QuestionId> {
        self.questions.iter().map(|q| q.id).collect()
    }

    #[must_use]
    pub fn has_warning(&self, code: WarningCode) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }

    /// Create a not-yet-started session over the assembled questions.
    #[must_use]
    pub fn into_session(self, template_id: TemplateId, candidate_id: CandidateId) -> TestSession {
        TestSession::new(template_id, candidate_id, self.question_ids())
    }
}

/// Selects questions for a session according to a blueprint.
pub struct BlueprintAssembler {
    inventory: Arc<dyn Inventory>,
    benchmarks: Arc<dyn BenchmarkLookup>,
    teams: Arc<dyn TeamProfileLookup>,
    passports: Arc<dyn PassportStore>,
    config: AssemblyConfig,
    emitter: Option<EventEmitter>,
}

impl BlueprintAssembler {
    /// Create an assembler with empty benchmark, team and passport sources.
    pub fn new(inventory: Arc<dyn Inventory>, config: AssemblyConfig) -> Self {
        Self {
            inventory,
            benchmarks: Arc::new(StaticBenchmarkLookup::new()),
            teams: Arc::new(StaticTeamProfileLookup::new()),
            passports: Arc::new(InMemoryPassportStore::new()),
            config,
            emitter: None,
        }
    }

    #[must_use]
    pub fn with_benchmarks(mut self, benchmarks: Arc<dyn BenchmarkLookup>) -> Self {
        self.benchmarks = benchmarks;
        self
    }

    #[must_use]
    pub fn with_team_profiles(mut self, teams: Arc<dyn TeamProfileLookup>) -> Self {
        self.teams = teams;
        self
    }

    #[must_use]
    pub fn with_passports(mut self, passports: Arc<dyn PassportStore>) -> Self {
        self.passports = passports;
        self
    }

    #[must_use]
    pub fn with_emitter(mut self, emitter: EventEmitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    #[must_use]
    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Validate a raw blueprint against this assembler's defaults.
    pub fn validate(&self, blueprint: Blueprint) -> Result<ValidatedBlueprint> {
        ValidatedBlueprint::new(blueprint, &self.config)
    }

    /// Assemble the ordered question set for one session.
    ///
    /// `candidate` is used by JOB_FIT to look up a passport. Fails with a
    /// configuration error when nothing in scope has an active indicator.
    pub async fn assemble(
        &self,
        blueprint: &ValidatedBlueprint,
        candidate: Option<&CandidateId>,
        ctx: &RequestContext,
    ) -> Result<AssemblyOutcome> {
        let strategy = blueprint.strategy();
        let span = ctx.span("assemble");
        async move {
            self.emit(strategy, ctx, EngineEvent::AssemblyStarted);
            let started = Instant::now();

            let result = match self.plan(blueprint, candidate).await {
                Ok(plan) => self.execute(blueprint, plan),
                Err(e) => Err(e),
            };
            let duration_ms = started.elapsed().as_millis() as u64;

            match &result {
                Ok(outcome) => {
                    info!(
                        strategy = %strategy,
                        question_count = outcome.questions.len(),
                        warning_count = outcome.warnings.len(),
                        duration_ms,
                        "Assembly completed"
                    );
                    self.emit(
                        strategy,
                        ctx,
                        EngineEvent::AssemblyCompleted {
                            duration_ms,
                            question_count: outcome.questions.len(),
                        },
                    );
                }
                Err(e) => {
                    warn!(strategy = %strategy, error = %e, duration_ms, "Assembly failed");
                    self.emit(
                        strategy,
                        ctx,
                        EngineEvent::AssemblyFailed {
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

    async fn plan(
        &self,
        blueprint: &ValidatedBlueprint,
        candidate: Option<&CandidateId>,
    ) -> Result<Plan> {
        match blueprint.blueprint() {
            Blueprint::Overview(b) => Ok(overview::plan(b, blueprint)),
            Blueprint::JobFit(b) => {
                job_fit::plan(
                    b,
                    blueprint,
                    self.benchmarks.as_ref(),
                    self.passports.as_ref(),
                    candidate,
                    Utc::now(),
                )
                .await
            }
            Blueprint::TeamFit(b) => team_fit::plan(b, blueprint, self.teams.as_ref()).await,
        }
    }

    fn execute(&self, blueprint: &ValidatedBlueprint, plan: Plan) -> Result<AssemblyOutcome> {
        let inventory = self.inventory.as_ref();
        let settings = blueprint.settings();
        let mut selector = Selector::new(inventory, settings.seed);
        let mut warnings = plan.warnings;
        let mut health = Vec::new();
        let mut competency_weights = BTreeMap::new();

        for planned in &plan.competencies {
            let Some(competency) = inventory
                .competency(&planned.competency_id)
                .filter(|c| c.active)
            else {
                warnings.push(
                    Warning::warning(
                        WarningCode::CompetencyNotFound,
                        format!("competency {} is missing or inactive", planned.competency_id),
                    )
                    .for_competency(planned.competency_id),
                );
                continue;
            };

            let siblings = active_indicators(inventory, &competency.id);
            if siblings.is_empty() {
                warnings.push(
                    Warning::warning(
                        WarningCode::CompetencyNoActiveIndicators,
                        format!("{} has no active indicators", competency.name),
                    )
                    .for_competency(competency.id),
                );
                continue;
            }
            let indicators = limit_indicators(&siblings, settings.indicators_per_competency);

            let entry = HealthEntry::measure(inventory, competency.id, planned.target);
            if let Some(w) = entry.warning(&competency.name) {
                warnings.push(w);
            }
            health.push(entry);
            competency_weights.insert(competency.id, planned.scoring_weight);

            debug!(
                competency_id = %competency.id,
                indicators = indicators.len(),
                per_indicator = planned.per_indicator,
                target = %planned.target,
                "Selecting competency"
            );
            for indicator in &indicators {
                selector.fill_indicator(
                    &competency,
                    indicator,
                    &siblings,
                    planned.target,
                    planned.per_indicator,
                    planned.max_distance,
                );
            }
        }

        if competency_weights.is_empty() {
            warnings.push(Warning::error(
                WarningCode::NoActiveIndicators,
                "no competency in scope has an active indicator",
            ));
            return Err(AssemblyError::NoActiveIndicators { warnings });
        }

        if let Blueprint::Overview(b) = blueprint.blueprint()
            && b.include_big_five
        {
            let per_trait = blueprint.personality_items_per_trait() as usize;
            for trait_ in BigFiveTrait::ALL {
                selector.fill_trait(trait_, per_trait);
            }
        }

        if settings.shuffle {
            selector.shuffle();
        }

        let (questions, selection_warnings) = selector.into_parts();
        warnings.extend(selection_warnings);

        Ok(AssemblyOutcome {
            strategy: blueprint.strategy(),
            questions,
            warnings,
            health,
            competency_weights,
        })
    }

    fn emit(&self, strategy: AssessmentStrategy, ctx: &RequestContext, event: EngineEvent) {
        if let Some(emitter) = &self.emitter {
            emitter.emit(strategy, ctx, event);
        }
    }
}

impl std::fmt::Debug for BlueprintAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlueprintAssembler")
            .field("config", &self.config)
            .field("emits_events", &self.emitter.is_some())
            .finish()
    }
}

/// Active indicators of a competency ordered by (order_index, id).
fn active_indicators(inventory: &dyn Inventory, competency: &CompetencyId) -> Vec<BehavioralIndicator> {
    let mut indicators: Vec<BehavioralIndicator> = inventory
        .indicators(competency)
        .into_iter()
        .filter(|i| i.active)
        .collect();
    indicators.sort_by(|a, b| a.order_index.cmp(&b.order_index).then(a.id.cmp(&b.id)));
    indicators
}

/// Keep the `limit` highest-weight indicators, in their original order.
fn limit_indicators(indicators: &[BehavioralIndicator], limit: Option<usize>) -> Vec<BehavioralIndicator> {
    let Some(limit) = limit.filter(|l| *l < indicators.len()) else {
        return indicators.to_vec();
    };
    let mut by_weight: Vec<(usize, &BehavioralIndicator)> = indicators.iter().enumerate().collect();
    by_weight.sort_by(|a, b| b.1.weight.total_cmp(&a.1.weight).then(a.0.cmp(&b.0)));
    let mut kept: Vec<(usize, &BehavioralIndicator)> = by_weight.into_iter().take(limit).collect();
    kept.sort_by_key(|(idx, _)| *idx);
    kept.into_iter().map(|(_, i)| i.clone()).collect()
}
