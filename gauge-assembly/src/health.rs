//! Inventory health classification per (competency, difficulty).

use gauge_core::{CompetencyId, DifficultyLevel, Inventory};
use serde::{Deserialize, Serialize};

use crate::warnings::{Severity, Warning, WarningCode};

/// Depth of the selectable pool for one (competency, difficulty) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryHealth {
    /// Fewer than 3 questions.
    Critical,
    /// 3 to 5 questions.
    Moderate,
    /// More than 5 questions.
    Healthy,
}

impl InventoryHealth {
    #[must_use]
    pub fn classify(active_questions: usize) -> Self {
        match active_questions {
            0..=2 => Self::Critical,
            3..=5 => Self::Moderate,
            _ => Self::Healthy,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Moderate => "MODERATE",
            Self::Healthy => "HEALTHY",
        }
    }
}

impl std::fmt::Display for InventoryHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Health of one in-scope pair at assembly time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthEntry {
    pub competency_id: CompetencyId,
    pub difficulty: DifficultyLevel,
    pub active_questions: usize,
    pub health: InventoryHealth,
}

impl HealthEntry {
    /// Query the inventory and classify.
    pub fn measure(
        inventory: &dyn Inventory,
        competency_id: CompetencyId,
        difficulty: DifficultyLevel,
    ) -> Self {
        let active_questions = inventory.active_question_count(&competency_id, difficulty);
        Self {
            competency_id,
            difficulty,
            active_questions,
            health: InventoryHealth::classify(active_questions),
        }
    }

    /// Warning to surface for this entry, if any.
    #[must_use]
    pub fn warning(&self, competency_name: &str) -> Option<Warning> {
        let (severity, code) = match self.health {
            InventoryHealth::Critical => (Severity::Warning, WarningCode::InventoryCritical),
            InventoryHealth::Moderate => (Severity::Info, WarningCode::InventoryModerate),
            InventoryHealth::Healthy => return None,
        };
        let message = format!(
            "{competency_name}: {} active {} questions",
            self.active_questions, self.difficulty
        );
        Some(Warning::new(severity, code, message).for_competency(self.competency_id))
    }
}
