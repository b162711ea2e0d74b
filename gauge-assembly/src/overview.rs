//! OVERVIEW: broad coverage of a chosen competency set.

use crate::assembler::{Plan, PlannedCompetency};
use crate::blueprint::{OverviewBlueprint, ValidatedBlueprint};

/// Questions per indicator for a competency weight multiplier.
#[must_use]
pub fn questions_for_weight(questions_per_indicator: u32, weight: f64) -> usize {
    ((f64::from(questions_per_indicator) * weight).round() as usize).max(1)
}

pub(crate) fn plan(blueprint: &OverviewBlueprint, validated: &ValidatedBlueprint) -> Plan {
    let target = blueprint.settings.preferred_difficulty;
    let competencies = blueprint
        .competencies
        .iter()
        .map(|c| PlannedCompetency {
            competency_id: c.competency_id,
            target,
            per_indicator: questions_for_weight(validated.questions_per_indicator(), c.weight),
            max_distance: None,
            scoring_weight: c.weight,
        })
        .collect();

    Plan {
        competencies,
        warnings: Vec::new(),
    }
}
