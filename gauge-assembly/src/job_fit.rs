//! JOB_FIT: gap-driven delta testing against an occupational benchmark.
//!
//! With a valid passport, each competency gets questions in proportion to
//! `target - passport` (floored at 0). Without one every gap is maximal and
//! the candidate takes the full assessment.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use gauge_core::passport::{PASSPORT_MAX, PASSPORT_MIN};
use gauge_core::{CandidateId, CompetencyId, CompetencyPassport, DifficultyLevel, PassportStore};
use tracing::{info, warn};

use crate::assembler::{Plan, PlannedCompetency};
use crate::blueprint::{JobFitBlueprint, ValidatedBlueprint};
use crate::collaborators::BenchmarkLookup;
use crate::error::{AssemblyError, Result};
use crate::selector::max_distance_for_strictness;
use crate::warnings::{Warning, WarningCode};

/// Largest possible gap on the passport scale.
pub const MAX_GAP: f64 = PASSPORT_MAX - PASSPORT_MIN;

/// Gap between a benchmark target and the candidate's passport score.
#[must_use]
pub fn competency_gap(target: f64, passport_score: Option<f64>) -> f64 {
    match passport_score {
        Some(score) => (target - score).clamp(0.0, MAX_GAP),
        None => MAX_GAP,
    }
}

/// Questions per indicator for a gap.
#[must_use]
pub fn questions_for_gap(questions_per_indicator: u32, gap: f64) -> usize {
    ((f64::from(questions_per_indicator) * gap / MAX_GAP).ceil() as usize).max(1)
}

pub(crate) async fn plan(
    blueprint: &JobFitBlueprint,
    validated: &ValidatedBlueprint,
    benchmarks: &dyn BenchmarkLookup,
    passports: &dyn PassportStore,
    candidate: Option<&CandidateId>,
    now: DateTime<Utc>,
) -> Result<Plan> {
    let mut warnings = Vec::new();
    let requested: BTreeSet<CompetencyId> = blueprint.competencies.iter().copied().collect();
    let max_distance = max_distance_for_strictness(blueprint.strictness);
    let qpi = validated.questions_per_indicator();

    // competency -> benchmark target; None when there is no benchmark
    let targets: BTreeMap<CompetencyId, Option<f64>> =
        match benchmarks.find(&blueprint.occupation_code).await? {
            Some(profile) => {
                for id in requested.iter().filter(|id| !profile.targets.contains_key(id)) {
                    warnings.push(
                        Warning::warning(
                            WarningCode::BenchmarkCompetencyUnknown,
                            format!(
                                "benchmark {} has no target for competency {id}",
                                profile.occupation_code
                            ),
                        )
                        .for_competency(*id),
                    );
                }
                profile
                    .targets
                    .iter()
                    .filter(|(id, _)| requested.is_empty() || requested.contains(id))
                    .map(|(id, t)| (*id, Some(t.clamp(PASSPORT_MIN, PASSPORT_MAX))))
                    .collect()
            }
            None => {
                warn!(occupation_code = %blueprint.occupation_code, "Benchmark not found, assessing in full");
                warnings.push(Warning::warning(
                    WarningCode::BenchmarkNotFound,
                    format!(
                        "no benchmark for occupation {}; running a full assessment",
                        blueprint.occupation_code
                    ),
                ));
                requested.iter().map(|id| (*id, None)).collect()
            }
        };

    if targets.is_empty() {
        return Err(AssemblyError::Configuration {
            message: format!(
                "job fit blueprint for {} resolves to no competencies",
                blueprint.occupation_code
            ),
            warnings,
        });
    }

    let passport = find_passport(passports, candidate, now).await?;
    if passport.is_none() {
        warnings.push(Warning::info(
            WarningCode::PassportNotFound,
            "no valid competency passport; treating every gap as maximal",
        ));
    }

    let mut gaps: Vec<(CompetencyId, Option<f64>, f64)> = targets
        .into_iter()
        .map(|(id, target)| {
            let gap = match (target, &passport) {
                (Some(target), Some(passport)) => competency_gap(target, passport.score(&id)),
                _ => MAX_GAP,
            };
            (id, target, gap)
        })
        .collect();
    // Largest deficit first
    gaps.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)));

    let all_closed = gaps.iter().all(|(_, _, gap)| *gap <= 0.0);
    if all_closed {
        info!("Every benchmark gap is closed, assessing each competency lightly");
    }

    let mut competencies = Vec::with_capacity(gaps.len());
    for (competency_id, target, gap) in gaps {
        if gap <= 0.0 && !all_closed {
            warnings.push(
                Warning::info(
                    WarningCode::CompetencyGapClosed,
                    format!("competency {competency_id} already meets the benchmark"),
                )
                .for_competency(competency_id),
            );
            continue;
        }
        let per_indicator = if all_closed {
            1
        } else {
            questions_for_gap(qpi, gap)
        };
        competencies.push(PlannedCompetency {
            competency_id,
            target: target.map_or(
                blueprint.settings.preferred_difficulty,
                DifficultyLevel::from_proficiency,
            ),
            per_indicator,
            max_distance,
            scoring_weight: target.unwrap_or(1.0),
        });
    }

    Ok(Plan {
        competencies,
        warnings,
    })
}

async fn find_passport(
    passports: &dyn PassportStore,
    candidate: Option<&CandidateId>,
    now: DateTime<Utc>,
) -> Result<Option<CompetencyPassport>> {
    match candidate {
        Some(candidate) => Ok(passports.find_valid(candidate, now).await?),
        None => Ok(None),
    }
}
