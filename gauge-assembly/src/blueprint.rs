//! Typed blueprints, one struct per assessment strategy.
//!
//! A [`Blueprint`] is what a template stores. [`ValidatedBlueprint`] is what the
//! assembler accepts: it is checked once at construction and carries the
//! resolved defaults, so assembly never re-validates fields.

use gauge_core::config::AssemblyConfig;
use gauge_core::{AssessmentStrategy, CompetencyId, DifficultyLevel, OccupationCode, TeamId};
use serde::{Deserialize, Serialize};

use crate::error::{AssemblyError, Result};

/// Lowest accepted per-competency weight multiplier.
pub const MIN_COMPETENCY_WEIGHT: f64 = 0.5;
/// Highest accepted per-competency weight multiplier.
pub const MAX_COMPETENCY_WEIGHT: f64 = 2.0;

/// Settings shared by every strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblySettings {
    /// Falls back to `assembly.default_questions_per_indicator`.
    pub questions_per_indicator: Option<u32>,
    pub preferred_difficulty: DifficultyLevel,
    /// Keep only the highest-weight indicators of each competency.
    pub indicators_per_competency: Option<usize>,
    pub shuffle: bool,
    /// Fixed seed for reproducible selection.
    pub seed: Option<u64>,
}

/// A competency with its OVERVIEW weight multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedCompetency {
    pub competency_id: CompetencyId,
    #[serde(default = "default_multiplier")]
    pub weight: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewBlueprint {
    pub competencies: Vec<WeightedCompetency>,
    #[serde(default)]
    pub include_big_five: bool,
    #[serde(default)]
    pub settings: AssemblySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFitBlueprint {
    pub occupation_code: OccupationCode,
    /// 0 (lenient) to 100 (exact difficulty only).
    #[serde(default = "default_strictness")]
    pub strictness: u8,
    /// Optional restriction of the benchmark's competencies.
    #[serde(default)]
    pub competencies: Vec<CompetencyId>,
    #[serde(default)]
    pub settings: AssemblySettings,
}

fn default_strictness() -> u8 {
    50
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamFitBlueprint {
    pub team_id: TeamId,
    /// Falls back to `assembly.saturation_threshold`.
    #[serde(default)]
    pub saturation_threshold: Option<f64>,
    /// Defaults to every competency in the team profile.
    #[serde(default)]
    pub competencies: Vec<CompetencyId>,
    #[serde(default)]
    pub settings: AssemblySettings,
}

/// Assembly recipe of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Blueprint {
    Overview(OverviewBlueprint),
    JobFit(JobFitBlueprint),
    TeamFit(TeamFitBlueprint),
}

impl Blueprint {
    #[must_use]
    pub fn strategy(&self) -> AssessmentStrategy {
        match self {
            Self::Overview(_) => AssessmentStrategy::Overview,
            Self::JobFit(_) => AssessmentStrategy::JobFit,
            Self::TeamFit(_) => AssessmentStrategy::TeamFit,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &AssemblySettings {
        match self {
            Self::Overview(b) => &b.settings,
            Self::JobFit(b) => &b.settings,
            Self::TeamFit(b) => &b.settings,
        }
    }
}

/// A blueprint that passed validation, with defaults resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBlueprint {
    blueprint: Blueprint,
    questions_per_indicator: u32,
    saturation_threshold: f64,
    member_proficiency_score: f64,
    personality_items_per_trait: u32,
}

impl ValidatedBlueprint {
    /// Validate `blueprint`, resolving unset fields from `config`.
    pub fn new(blueprint: Blueprint, config: &AssemblyConfig) -> Result<Self> {
        let settings = blueprint.settings();
        let questions_per_indicator = settings
            .questions_per_indicator
            .unwrap_or(config.default_questions_per_indicator);
        if questions_per_indicator == 0 {
            return Err(AssemblyError::configuration(
                "questions_per_indicator must be at least 1",
            ));
        }
        if settings.indicators_per_competency == Some(0) {
            return Err(AssemblyError::configuration(
                "indicators_per_competency must be at least 1 when set",
            ));
        }

        let mut saturation_threshold = config.saturation_threshold;
        match &blueprint {
            Blueprint::Overview(b) => {
                if b.competencies.is_empty() {
                    return Err(AssemblyError::configuration(
                        "overview blueprint needs at least one competency",
                    ));
                }
                let mut seen = std::collections::HashSet::new();
                for c in &b.competencies {
                    if !(MIN_COMPETENCY_WEIGHT..=MAX_COMPETENCY_WEIGHT).contains(&c.weight) {
                        return Err(AssemblyError::configuration(format!(
                            "competency {} weight {} outside {MIN_COMPETENCY_WEIGHT}..={MAX_COMPETENCY_WEIGHT}",
                            c.competency_id, c.weight
                        )));
                    }
                    if !seen.insert(c.competency_id) {
                        return Err(AssemblyError::configuration(format!(
                            "competency {} listed twice",
                            c.competency_id
                        )));
                    }
                }
            }
            Blueprint::JobFit(b) => {
                if b.occupation_code.as_str().trim().is_empty() {
                    return Err(AssemblyError::configuration(
                        "job fit blueprint needs an occupation code",
                    ));
                }
                if b.strictness > 100 {
                    return Err(AssemblyError::configuration(format!(
                        "strictness {} outside 0..=100",
                        b.strictness
                    )));
                }
            }
            Blueprint::TeamFit(b) => {
                if b.team_id.as_str().trim().is_empty() {
                    return Err(AssemblyError::configuration(
                        "team fit blueprint needs a team id",
                    ));
                }
                if let Some(threshold) = b.saturation_threshold {
                    saturation_threshold = threshold;
                }
                if !(saturation_threshold > 0.0 && saturation_threshold <= 1.0) {
                    return Err(AssemblyError::configuration(format!(
                        "saturation threshold {saturation_threshold} outside (0, 1]"
                    )));
                }
            }
        }

        Ok(Self {
            blueprint,
            questions_per_indicator,
            saturation_threshold,
            member_proficiency_score: config.member_proficiency_score,
            personality_items_per_trait: config.personality_items_per_trait,
        })
    }

    #[must_use]
    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    #[must_use]
    pub fn strategy(&self) -> AssessmentStrategy {
        self.blueprint.strategy()
    }

    #[must_use]
    pub fn settings(&self) -> &AssemblySettings {
        self.blueprint.settings()
    }

    #[must_use]
    pub fn questions_per_indicator(&self) -> u32 {
        self.questions_per_indicator
    }

    #[must_use]
    pub fn saturation_threshold(&self) -> f64 {
        self.saturation_threshold
    }

    #[must_use]
    pub fn member_proficiency_score(&self) -> f64 {
        self.member_proficiency_score
    }

    #[must_use]
    pub fn personality_items_per_trait(&self) -> u32 {
        self.personality_items_per_trait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overview(weights: &[f64]) -> Blueprint {
        Blueprint::Overview(OverviewBlueprint {
            competencies: weights
                .iter()
                .map(|w| WeightedCompetency {
                    competency_id: CompetencyId::new(),
                    weight: *w,
                })
                .collect(),
            include_big_five: false,
            settings: AssemblySettings::default(),
        })
    }

    #[test]
    fn defaults_are_resolved_from_config() {
        let validated = ValidatedBlueprint::new(overview(&[1.0]), &AssemblyConfig::default()).unwrap();
        assert_eq!(validated.questions_per_indicator(), 3);
        assert_eq!(validated.strategy(), AssessmentStrategy::Overview);
    }

    #[test]
    fn overview_rejects_empty_set_and_bad_weights() {
        let config = AssemblyConfig::default();
        assert!(matches!(
            ValidatedBlueprint::new(overview(&[]), &config),
            Err(AssemblyError::Configuration { .. })
        ));
        assert!(ValidatedBlueprint::new(overview(&[2.5]), &config).is_err());
        assert!(ValidatedBlueprint::new(overview(&[0.5, 2.0]), &config).is_ok());
    }

    #[test]
    fn zero_questions_per_indicator_is_rejected() {
        let mut blueprint = overview(&[1.0]);
        if let Blueprint::Overview(b) = &mut blueprint {
            b.settings.questions_per_indicator = Some(0);
        }
        let err = ValidatedBlueprint::new(blueprint, &AssemblyConfig::default()).unwrap_err();
        assert_eq!(err.error_type(), "configuration");
    }

    #[test]
    fn team_fit_threshold_must_be_a_fraction() {
        let blueprint = Blueprint::TeamFit(TeamFitBlueprint {
            team_id: TeamId::new("platform"),
            saturation_threshold: Some(1.5),
            competencies: vec![],
            settings: AssemblySettings::default(),
        });
        assert!(ValidatedBlueprint::new(blueprint, &AssemblyConfig::default()).is_err());
    }

    #[test]
    fn job_fit_deserializes_with_strategy_tag() {
        let json = r#"{
            "strategy": "job_fit",
            "occupation_code": "15-1252.00",
            "strictness": 85,
            "settings": { "questions_per_indicator": 4, "seed": 7 }
        }"#;
        let blueprint: Blueprint = serde_json::from_str(json).unwrap();
        assert_eq!(blueprint.strategy(), AssessmentStrategy::JobFit);
        assert_eq!(blueprint.settings().seed, Some(7));

        let validated = ValidatedBlueprint::new(blueprint, &AssemblyConfig::default()).unwrap();
        assert_eq!(validated.questions_per_indicator(), 4);
    }
}
