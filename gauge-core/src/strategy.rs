//! Assessment strategy tag carried by blueprints, results and events.

use serde::{Deserialize, Serialize};

/// How a template assembles and weights its questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentStrategy {
    /// Broad assessment across a chosen competency set.
    #[default]
    Overview,
    /// Gap-driven assessment against an occupational benchmark.
    JobFit,
    /// Complementarity-driven assessment against a team's coverage.
    TeamFit,
}

impl AssessmentStrategy {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overview => "OVERVIEW",
            Self::JobFit => "JOB_FIT",
            Self::TeamFit => "TEAM_FIT",
        }
    }
}

impl std::fmt::Display for AssessmentStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
