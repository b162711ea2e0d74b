//! Competency catalog: competencies, behavioral indicators and questions.
//!
//! The catalog is hierarchical (Competency 1→N Indicator 1→N Question). Readers
//! go through the [`Inventory`] trait. Validity changes made by psychometric
//! analysis go through [`ValidityWriter`] and can race with readers, so
//! selectability must always be asked of the inventory at pick time.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::ids::{CompetencyId, IndicatorId, OptionId, QuestionId};

/// Difficulty level of a question, ordered from easiest to hardest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DifficultyLevel {
    Foundational,
    #[default]
    Intermediate,
    Advanced,
    Expert,
    Specialized,
}

impl DifficultyLevel {
    /// All levels, easiest first.
    pub const ALL: [DifficultyLevel; 5] = [
        Self::Foundational,
        Self::Intermediate,
        Self::Advanced,
        Self::Expert,
        Self::Specialized,
    ];

    /// Position on the difficulty scale (0 = easiest).
    #[must_use]
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Number of steps between two levels.
    #[must_use]
    pub fn distance(self, other: DifficultyLevel) -> usize {
        self.ordinal().abs_diff(other.ordinal())
    }

    /// Level matching a target proficiency on the 1.0–5.0 passport scale.
    #[must_use]
    pub fn from_proficiency(score: f64) -> Self {
        let idx = (score.clamp(1.0, 5.0).round() as usize).saturating_sub(1);
        Self::ALL[idx.min(Self::ALL.len() - 1)]
    }

    /// Levels ordered by distance from `self`; ties go to the easier level.
    #[must_use]
    pub fn by_proximity(self) -> Vec<DifficultyLevel> {
        let mut levels = Self::ALL.to_vec();
        levels.sort_by_key(|l| (l.distance(self), l.ordinal()));
        levels
    }

    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Foundational => "FOUNDATIONAL",
            Self::Intermediate => "INTERMEDIATE",
            Self::Advanced => "ADVANCED",
            Self::Expert => "EXPERT",
            Self::Specialized => "SPECIALIZED",
        }
    }
}

impl std::fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a question is answered and therefore scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    /// Agreement scale from 1 to `scale_max`.
    Likert,
    /// Scenario with graded response options.
    SituationalJudgment,
    /// Single correct option.
    MultipleChoice,
    /// Any number of options may be selected.
    MultiSelect,
    /// Self-rated capability on a graded option list.
    CapabilityAssessment,
    /// Score assigned externally (e.g. manual grading), already in 0.0–1.0.
    Numeric,
}

/// Psychometric validity status of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidityStatus {
    #[default]
    Active,
    FlaggedForReview,
    Retired,
}

impl ValidityStatus {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::FlaggedForReview => "FLAGGED_FOR_REVIEW",
            Self::Retired => "RETIRED",
        }
    }
}

impl std::fmt::Display for ValidityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Big Five personality traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BigFiveTrait {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    EmotionalStability,
}

impl BigFiveTrait {
    pub const ALL: [BigFiveTrait; 5] = [
        Self::Openness,
        Self::Conscientiousness,
        Self::Extraversion,
        Self::Agreeableness,
        Self::EmotionalStability,
    ];

    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Openness => "OPENNESS",
            Self::Conscientiousness => "CONSCIENTIOUSNESS",
            Self::Extraversion => "EXTRAVERSION",
            Self::Agreeableness => "AGREEABLENESS",
            Self::EmotionalStability => "EMOTIONAL_STABILITY",
        }
    }
}

impl std::fmt::Display for BigFiveTrait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A competency at the top of the catalog hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competency {
    pub id: CompetencyId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Observable behavior that evidences a competency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralIndicator {
    pub id: IndicatorId,
    pub competency_id: CompetencyId,
    pub title: String,
    /// Contribution to the competency score (0.0–1.0).
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub order_index: u32,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// One scoreable option of a choice-based question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: OptionId,
    pub label: String,
    /// Normalized credit for choosing this option (0.0–1.0).
    pub score: f64,
}

/// An assessment item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub indicator_id: IndicatorId,
    pub text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub difficulty: DifficultyLevel,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub validity: ValidityStatus,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    #[serde(default = "default_scale_max")]
    pub scale_max: u8,
    #[serde(default)]
    pub reverse_scored: bool,
    /// Weight within its indicator score.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Set for personality items; these are excluded from competency scoring.
    #[serde(default)]
    pub big_five_trait: Option<BigFiveTrait>,
}

impl Question {
    /// Whether the item may be placed in a new session.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        self.active && self.validity != ValidityStatus::Retired
    }

    /// Whether the item measures a Big Five trait.
    #[must_use]
    pub fn is_personality(&self) -> bool {
        self.big_five_trait.is_some()
    }

    /// Look up an answer option by id.
    #[must_use]
    pub fn option(&self, id: &OptionId) -> Option<&AnswerOption> {
        self.options.iter().find(|o| &o.id == id)
    }
}

fn default_true() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

fn default_scale_max() -> u8 {
    5
}

/// Read access to the item inventory.
///
/// Implementations must reflect the current validity of each question on every
/// call; callers never cache selectability.
pub trait Inventory: Send + Sync {
    fn competency(&self, id: &CompetencyId) -> Option<Competency>;

    /// All indicators of a competency, active or not.
    fn indicators(&self, competency: &CompetencyId) -> Vec<BehavioralIndicator>;

    fn indicator(&self, id: &IndicatorId) -> Option<BehavioralIndicator>;

    /// All questions of an indicator, selectable or not.
    fn questions(&self, indicator: &IndicatorId) -> Vec<Question>;

    fn question(&self, id: &QuestionId) -> Option<Question>;

    /// Personality items measuring `trait_`.
    fn personality_questions(&self, trait_: BigFiveTrait) -> Vec<Question>;

    /// Live selectability check.
    fn is_selectable(&self, id: &QuestionId) -> bool {
        self.question(id).is_some_and(|q| q.is_selectable())
    }

    /// Count of selectable, non-personality questions for a (competency, difficulty) pair.
    fn active_question_count(&self, competency: &CompetencyId, difficulty: DifficultyLevel)
    -> usize;
}

/// Out-of-band mutation of item validity.
pub trait ValidityWriter: Send + Sync {
    /// Set the validity of a question, returning the previous status.
    fn set_validity(&self, id: &QuestionId, status: ValidityStatus) -> Result<ValidityStatus>;

    /// Set the validity only if it still equals `expected`.
    ///
    /// Returns `false` and leaves the question untouched when another writer
    /// changed the status first.
    fn set_validity_if(
        &self,
        id: &QuestionId,
        expected: ValidityStatus,
        status: ValidityStatus,
    ) -> Result<bool>;
}

/// Serializable form of a whole catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub competencies: Vec<Competency>,
    #[serde(default)]
    pub indicators: Vec<BehavioralIndicator>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Default)]
struct CatalogData {
    competencies: BTreeMap<CompetencyId, Competency>,
    indicators: BTreeMap<IndicatorId, BehavioralIndicator>,
    questions: BTreeMap<QuestionId, Question>,
}

/// In-memory catalog, safe for concurrent readers and validity writers.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    data: RwLock<CatalogData>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let catalog = Self::new();
        for c in snapshot.competencies {
            catalog.insert_competency(c);
        }
        for i in snapshot.indicators {
            catalog.insert_indicator(i);
        }
        for q in snapshot.questions {
            catalog.insert_question(q);
        }
        catalog
    }

    /// Load a catalog from a JSON snapshot file.
    pub fn load_json(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let snapshot: CatalogSnapshot = serde_json::from_str(&contents)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn insert_competency(&self, competency: Competency) {
        self.write().competencies.insert(competency.id, competency);
    }

    pub fn insert_indicator(&self, indicator: BehavioralIndicator) {
        self.write().indicators.insert(indicator.id, indicator);
    }

    pub fn insert_question(&self, question: Question) {
        self.write().questions.insert(question.id, question);
    }

    /// Deactivate a question (it stays in the catalog but is unselectable).
    pub fn deactivate_question(&self, id: &QuestionId) {
        if let Some(q) = self.write().questions.get_mut(id) {
            q.active = false;
        }
    }

    /// Take a serializable copy of the catalog.
    #[must_use]
    pub fn snapshot(&self) -> CatalogSnapshot {
        let data = self.read();
        CatalogSnapshot {
            competencies: data.competencies.values().cloned().collect(),
            indicators: data.indicators.values().cloned().collect(),
            questions: data.questions.values().cloned().collect(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogData> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogData> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Inventory for InMemoryCatalog {
    fn competency(&self, id: &CompetencyId) -> Option<Competency> {
        self.read().competencies.get(id).cloned()
    }

    fn indicators(&self, competency: &CompetencyId) -> Vec<BehavioralIndicator> {
        self.read()
            .indicators
            .values()
            .filter(|i| &i.competency_id == competency)
            .cloned()
            .collect()
    }

    fn indicator(&self, id: &IndicatorId) -> Option<BehavioralIndicator> {
        self.read().indicators.get(id).cloned()
    }

    fn questions(&self, indicator: &IndicatorId) -> Vec<Question> {
        self.read()
            .questions
            .values()
            .filter(|q| &q.indicator_id == indicator)
            .cloned()
            .collect()
    }

    fn question(&self, id: &QuestionId) -> Option<Question> {
        self.read().questions.get(id).cloned()
    }

    fn personality_questions(&self, trait_: BigFiveTrait) -> Vec<Question> {
        self.read()
            .questions
            .values()
            .filter(|q| q.big_five_trait == Some(trait_))
            .cloned()
            .collect()
    }

    fn active_question_count(
        &self,
        competency: &CompetencyId,
        difficulty: DifficultyLevel,
    ) -> usize {
        let data = self.read();
        data.questions
            .values()
            .filter(|q| q.is_selectable() && !q.is_personality() && q.difficulty == difficulty)
            .filter(|q| {
                data.indicators
                    .get(&q.indicator_id)
                    .is_some_and(|i| i.active && &i.competency_id == competency)
            })
            .count()
    }
}

impl ValidityWriter for InMemoryCatalog {
    fn set_validity(&self, id: &QuestionId, status: ValidityStatus) -> Result<ValidityStatus> {
        let mut data = self.write();
        let question = data
            .questions
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(format!("question {id}")))?;
        let previous = question.validity;
        question.validity = status;
        Ok(previous)
    }

    fn set_validity_if(
        &self,
        id: &QuestionId,
        expected: ValidityStatus,
        status: ValidityStatus,
    ) -> Result<bool> {
        let mut data = self.write();
        let question = data
            .questions
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(format!("question {id}")))?;
        if question.validity != expected {
            return Ok(false);
        }
        question.validity = status;
        Ok(true)
    }
}
