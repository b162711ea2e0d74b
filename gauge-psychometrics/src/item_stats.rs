//! Per-item difficulty and discrimination.
//!
//! Difficulty is the mean item score (the proportion correct for
//! dichotomous items). Discrimination is the Pearson correlation between the
//! item score and the respondent's total test score, which reduces to the
//! point-biserial for dichotomous items.
//!
//! Below `min_responses` the metrics are still reported but marked
//! provisional, and no flag or status change is derived from them.

use chrono::{DateTime, Utc};
use gauge_core::config::{PsychometricsConfig, ScoringConfig};
use gauge_core::{QuestionId, SessionId, ValidityStatus};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Difficulty classification of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DifficultyFlag {
    TooHard,
    TooEasy,
    #[serde(rename = "NONE")]
    Normal,
}

impl DifficultyFlag {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooHard => "TOO_HARD",
            Self::TooEasy => "TOO_EASY",
            Self::Normal => "NONE",
        }
    }
}

/// Discrimination classification of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscriminationFlag {
    /// Stronger candidates do worse on this item.
    Negative,
    Critical,
    /// Marginal discrimination.
    Warning,
    #[serde(rename = "NONE")]
    Normal,
}

impl DiscriminationFlag {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negative => "NEGATIVE",
            Self::Critical => "CRITICAL",
            Self::Warning => "WARNING",
            Self::Normal => "NONE",
        }
    }

    /// Whether an ACTIVE item with this flag goes to manual review.
    #[must_use]
    pub fn requires_review(&self) -> bool {
        matches!(self, Self::Negative | Self::Critical)
    }
}

impl std::fmt::Display for DifficultyFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for DiscriminationFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One respondent's answer to the analyzed item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemResponse {
    pub session_id: SessionId,
    /// Normalized item score, 0.0–1.0.
    pub item_score: f64,
    /// The respondent's total test score.
    pub total_score: f64,
}

/// Aggregate statistics of one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStatistics {
    pub question_id: QuestionId,
    pub response_count: usize,
    /// p-value, `None` without responses.
    pub difficulty: Option<f64>,
    /// Point-biserial, `None` when undefined (n < 2 or zero variance).
    pub discrimination: Option<f64>,
    /// Discrimination from the previous computation, for trend comparison.
    pub previous_discrimination: Option<f64>,
    /// `None` while provisional.
    pub difficulty_flag: Option<DifficultyFlag>,
    /// `None` while provisional or when discrimination is undefined.
    pub discrimination_flag: Option<DiscriminationFlag>,
    /// Validity status after this computation.
    pub validity: ValidityStatus,
    /// Too few responses for the flags to be trusted.
    pub provisional: bool,
    pub computed_at: DateTime<Utc>,
}

impl ItemStatistics {
    /// Change in discrimination since the previous computation.
    #[must_use]
    pub fn discrimination_trend(&self) -> Option<f64> {
        Some(self.discrimination? - self.previous_discrimination?)
    }

    /// Whether this computation moved the item into review.
    #[must_use]
    pub fn newly_flagged(&self, previous_status: ValidityStatus) -> bool {
        previous_status == ValidityStatus::Active
            && self.validity == ValidityStatus::FlaggedForReview
    }
}

/// Classify a p-value.
#[must_use]
pub fn classify_difficulty(p: f64, config: &PsychometricsConfig) -> DifficultyFlag {
    if p < config.too_hard_below {
        DifficultyFlag::TooHard
    } else if p > config.too_easy_above {
        DifficultyFlag::TooEasy
    } else {
        DifficultyFlag::Normal
    }
}

/// Classify a point-biserial correlation.
#[must_use]
pub fn classify_discrimination(rpb: f64, config: &PsychometricsConfig) -> DiscriminationFlag {
    if rpb < 0.0 {
        DiscriminationFlag::Negative
    } else if rpb < config.critical_below {
        DiscriminationFlag::Critical
    } else if rpb < config.warning_below {
        DiscriminationFlag::Warning
    } else {
        DiscriminationFlag::Normal
    }
}

/// Pearson correlation, `None` for fewer than two pairs or a constant series.
#[must_use]
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    let n = pairs.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / nf;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Computes [`ItemStatistics`] from an item's full response history.
///
/// Difficulty is the proportion of responses scoring at least
/// `correct_threshold`. Discrimination uses the continuous item score.
#[derive(Debug, Clone)]
pub struct ItemStatisticsAnalyzer {
    config: PsychometricsConfig,
    correct_threshold: f64,
}

impl Default for ItemStatisticsAnalyzer {
    fn default() -> Self {
        Self::new(
            PsychometricsConfig::default(),
            ScoringConfig::default().correct_threshold,
        )
    }
}

impl ItemStatisticsAnalyzer {
    /// `correct_threshold`: normalized score at which a response counts as correct.
    pub fn new(config: PsychometricsConfig, correct_threshold: f64) -> Self {
        Self {
            config,
            correct_threshold,
        }
    }

    pub fn config(&self) -> &PsychometricsConfig {
        &self.config
    }

    /// Analyze one question.
    ///
    /// `current` is the item's validity right now; `previous` is the last
    /// stored statistics, whose discrimination becomes the trend baseline.
    pub fn analyze(
        &self,
        question_id: QuestionId,
        responses: &[ItemResponse],
        current: ValidityStatus,
        previous: Option<&ItemStatistics>,
        now: DateTime<Utc>,
    ) -> ItemStatistics {
        let response_count = responses.len();
        let difficulty = (response_count > 0).then(|| {
            let correct = responses
                .iter()
                .filter(|r| r.item_score >= self.correct_threshold)
                .count();
            correct as f64 / response_count as f64
        });
        let pairs: Vec<(f64, f64)> = responses
            .iter()
            .map(|r| (r.item_score, r.total_score))
            .collect();
        let discrimination = pearson(&pairs);
        let provisional = response_count < self.config.min_responses;

        let (difficulty_flag, discrimination_flag) = if provisional {
            (None, None)
        } else {
            (
                difficulty.map(|p| classify_difficulty(p, &self.config)),
                discrimination.map(|r| classify_discrimination(r, &self.config)),
            )
        };

        let validity = match (current, discrimination_flag) {
            (ValidityStatus::Active, Some(flag)) if flag.requires_review() => {
                ValidityStatus::FlaggedForReview
            }
            _ => current,
        };

        debug!(
            question_id = %question_id,
            response_count,
            difficulty = ?difficulty,
            discrimination = ?discrimination,
            provisional,
            validity = %validity,
            "Item statistics computed"
        );

        ItemStatistics {
            question_id,
            response_count,
            difficulty,
            discrimination,
            previous_discrimination: previous.and_then(|p| p.discrimination),
            difficulty_flag,
            discrimination_flag,
            validity,
            provisional,
            computed_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PsychometricsConfig {
        PsychometricsConfig::default()
    }

    #[test]
    fn difficulty_thresholds() {
        let cfg = config();
        assert_eq!(classify_difficulty(0.15, &cfg), DifficultyFlag::TooHard);
        assert_eq!(classify_difficulty(0.95, &cfg), DifficultyFlag::TooEasy);
        assert_eq!(classify_difficulty(0.20, &cfg), DifficultyFlag::Normal);
        assert_eq!(classify_difficulty(0.90, &cfg), DifficultyFlag::Normal);
    }

    #[test]
    fn discrimination_thresholds() {
        let cfg = config();
        assert_eq!(classify_discrimination(-0.05, &cfg), DiscriminationFlag::Negative);
        assert_eq!(classify_discrimination(0.0, &cfg), DiscriminationFlag::Critical);
        assert_eq!(classify_discrimination(0.09, &cfg), DiscriminationFlag::Critical);
        assert_eq!(classify_discrimination(0.10, &cfg), DiscriminationFlag::Warning);
        assert_eq!(classify_discrimination(0.25, &cfg), DiscriminationFlag::Normal);
        assert!(DiscriminationFlag::Negative.requires_review());
        assert!(!DiscriminationFlag::Warning.requires_review());
    }

    #[test]
    fn pearson_edge_cases() {
        assert_eq!(pearson(&[(1.0, 2.0)]), None);
        assert_eq!(pearson(&[(1.0, 2.0), (1.0, 3.0)]), None);
        let r = pearson(&[(0.0, 1.0), (1.0, 2.0), (1.0, 3.0)]).unwrap();
        assert!(r > 0.8);
    }

    #[test]
    fn flag_serializes_as_none() {
        let json = serde_json::to_string(&DifficultyFlag::Normal).unwrap();
        assert_eq!(json, "\"NONE\"");
        let json = serde_json::to_string(&DiscriminationFlag::Negative).unwrap();
        assert_eq!(json, "\"NEGATIVE\"");
    }

    #[test]
    fn trend_needs_both_values() {
        let analyzer = ItemStatisticsAnalyzer::default();
        let responses: Vec<ItemResponse> = (0..10)
            .map(|i| ItemResponse {
                session_id: SessionId::new(),
                item_score: if i % 2 == 0 { 1.0 } else { 0.0 },
                total_score: f64::from(i),
            })
            .collect();
        let first = analyzer.analyze(
            QuestionId::new(),
            &responses,
            ValidityStatus::Active,
            None,
            Utc::now(),
        );
        assert_eq!(first.discrimination_trend(), None);

        let second = analyzer.analyze(
            first.question_id,
            &responses,
            first.validity,
            Some(&first),
            Utc::now(),
        );
        assert_eq!(second.previous_discrimination, first.discrimination);
        assert!(second.discrimination_trend().unwrap().abs() < 1e-12);
    }

    #[test]
    fn partial_credit_below_threshold_is_not_correct() {
        let analyzer = ItemStatisticsAnalyzer::default();
        let responses: Vec<ItemResponse> = (0..60)
            .map(|i| ItemResponse {
                session_id: SessionId::new(),
                item_score: 0.4,
                total_score: f64::from(i),
            })
            .collect();

        let stats = analyzer.analyze(
            QuestionId::new(),
            &responses,
            ValidityStatus::Active,
            None,
            Utc::now(),
        );

        assert_eq!(stats.difficulty, Some(0.0));
        assert_eq!(stats.difficulty_flag, Some(DifficultyFlag::TooHard));
    }

    #[test]
    fn threshold_counts_partial_credit_at_or_above_as_correct() {
        let analyzer = ItemStatisticsAnalyzer::new(PsychometricsConfig::default(), 0.75);
        let scores = [0.75, 1.0, 0.5, 0.7];
        let responses: Vec<ItemResponse> = scores
            .iter()
            .zip(0u32..)
            .map(|(score, i)| ItemResponse {
                session_id: SessionId::new(),
                item_score: *score,
                total_score: f64::from(i),
            })
            .collect();

        let stats = analyzer.analyze(
            QuestionId::new(),
            &responses,
            ValidityStatus::Active,
            None,
            Utc::now(),
        );

        assert_eq!(stats.difficulty, Some(0.5));
        // Continuous scores still drive discrimination
        assert!(stats.discrimination.is_some());
    }
}
