//! TEAM_FIT: bias selection toward competencies the team lacks.

use std::collections::BTreeSet;

use gauge_core::CompetencyId;
use tracing::warn;

use crate::assembler::{Plan, PlannedCompetency};
use crate::blueprint::{TeamFitBlueprint, ValidatedBlueprint};
use crate::collaborators::TeamProfileLookup;
use crate::error::{AssemblyError, Result};
use crate::warnings::{Warning, WarningCode};

/// Questions per indicator for a competency at `saturation`.
#[must_use]
pub fn questions_for_saturation(questions_per_indicator: u32, saturation: f64, threshold: f64) -> usize {
    if saturation >= threshold {
        return 1;
    }
    let qpi = f64::from(questions_per_indicator);
    questions_per_indicator as usize + (qpi * (threshold - saturation) / threshold).ceil() as usize
}

pub(crate) async fn plan(
    blueprint: &TeamFitBlueprint,
    validated: &ValidatedBlueprint,
    teams: &dyn TeamProfileLookup,
) -> Result<Plan> {
    let mut warnings = Vec::new();
    let threshold = validated.saturation_threshold();
    let proficiency = validated.member_proficiency_score();

    let profile = teams
        .find(&blueprint.team_id)
        .await?
        .filter(|p| !p.members.is_empty());
    if profile.is_none() {
        warn!(team_id = %blueprint.team_id, "Team profile unavailable, treating team as unsaturated");
        warnings.push(Warning::warning(
            WarningCode::TeamProfileUnavailable,
            format!(
                "no member profiles for team {}; every competency is treated as uncovered",
                blueprint.team_id
            ),
        ));
    }

    let scope: BTreeSet<CompetencyId> = if blueprint.competencies.is_empty() {
        profile
            .as_ref()
            .map(|p| p.competencies())
            .unwrap_or_default()
    } else {
        blueprint.competencies.iter().copied().collect()
    };
    if scope.is_empty() {
        return Err(AssemblyError::Configuration {
            message: format!("team fit blueprint for {} has no competencies", blueprint.team_id),
            warnings,
        });
    }

    let mut saturations: Vec<(CompetencyId, f64)> = scope
        .into_iter()
        .map(|id| {
            let s = profile
                .as_ref()
                .map_or(0.0, |p| p.saturation(&id, proficiency));
            (id, s)
        })
        .collect();
    saturations.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let target = blueprint.settings.preferred_difficulty;
    let competencies = saturations
        .into_iter()
        .map(|(competency_id, saturation)| {
            if saturation >= threshold {
                warnings.push(
                    Warning::info(
                        WarningCode::CompetencySaturated,
                        format!(
                            "competency {competency_id} covered by {:.0}% of the team",
                            saturation * 100.0
                        ),
                    )
                    .for_competency(competency_id),
                );
            }
            PlannedCompetency {
                competency_id,
                target,
                per_indicator: questions_for_saturation(
                    validated.questions_per_indicator(),
                    saturation,
                    threshold,
                ),
                max_distance: None,
                scoring_weight: 1.0 + (threshold - saturation).max(0.0),
            }
        })
        .collect();

    Ok(Plan {
        competencies,
        warnings,
    })
}
