//! Engine configuration.
//!
//! One TOML document configures assembly, scoring, percentile ranking,
//! psychometric thresholds, DIF preconditions, resilience and passport expiry.
//! Every section has defaults, so a partial file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Main configuration for the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub assembly: AssemblyConfig,
    pub scoring: ScoringConfig,
    pub percentile: PercentileConfig,
    pub psychometrics: PsychometricsConfig,
    pub dif: DifConfig,
    pub resilience: ResilienceConfig,
    pub passport: PassportConfig,
}

impl EngineConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Load from `path` if given, else from the default location if it exists,
    /// else fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Platform config location: `<config_dir>/gauge/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gauge").join("config.toml"))
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))
    }
}

/// Blueprint assembly defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Used when a blueprint does not set questions per indicator.
    pub default_questions_per_indicator: u32,
    /// Team coverage at which a competency counts as saturated.
    pub saturation_threshold: f64,
    /// Member score (1.0–5.0) at which a member covers a competency.
    pub member_proficiency_score: f64,
    /// Big Five items appended per trait when personality is enabled.
    pub personality_items_per_trait: u32,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            default_questions_per_indicator: 3,
            saturation_threshold: 0.75,
            member_proficiency_score: 3.5,
            personality_items_per_trait: 2,
        }
    }
}

/// Scoring defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Overall percentage needed to pass.
    pub passing_threshold: f64,
    /// Normalized score at which an answer counts as correct.
    pub correct_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            passing_threshold: 70.0,
            correct_threshold: 0.5,
        }
    }
}

/// Percentile recalculation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentileConfig {
    /// Trailing window of results re-ranked on each recalculation.
    pub window_seconds: u64,
}

impl Default for PercentileConfig {
    fn default() -> Self {
        Self { window_seconds: 300 }
    }
}

impl PercentileConfig {
    #[must_use]
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.window_seconds as i64)
    }
}

/// Item statistics thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsychometricsConfig {
    /// Fewer responses than this leaves metrics provisional.
    pub min_responses: usize,
    /// p-value below which an item is too hard.
    pub too_hard_below: f64,
    /// p-value above which an item is too easy.
    pub too_easy_above: f64,
    /// Discrimination below which (and ≥ 0) an item is critical.
    pub critical_below: f64,
    /// Discrimination below which an item is marginal.
    pub warning_below: f64,
    /// Minimum length of a manual review reason.
    pub min_review_reason_chars: usize,
}

impl Default for PsychometricsConfig {
    fn default() -> Self {
        Self {
            min_responses: 50,
            too_hard_below: 0.20,
            too_easy_above: 0.90,
            critical_below: 0.10,
            warning_below: 0.25,
            min_review_reason_chars: 10,
        }
    }
}

/// Mantel-Haenszel DIF preconditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifConfig {
    pub min_total: usize,
    pub min_group: usize,
    /// Number of ability strata (quintiles by default).
    pub strata: usize,
}

impl Default for DifConfig {
    fn default() -> Self {
        Self {
            min_total: 100,
            min_group: 20,
            strata: 5,
        }
    }
}

/// Retry and circuit-breaker policy for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    /// 1.0 gives a fixed backoff.
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
    /// Failure rate (0.0–1.0) over the window that opens the circuit.
    pub failure_rate_threshold: f64,
    pub sliding_window_size: usize,
    /// Calls needed in the window before the failure rate is evaluated.
    pub minimum_calls: usize,
    pub open_duration_ms: u64,
    /// Successful trial calls needed to close a half-open circuit.
    pub half_open_permitted_calls: u32,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            backoff_multiplier: 2.0,
            max_backoff_ms: 2000,
            failure_rate_threshold: 0.5,
            sliding_window_size: 10,
            minimum_calls: 5,
            open_duration_ms: 30_000,
            half_open_permitted_calls: 2,
        }
    }
}

impl ResilienceConfig {
    #[must_use]
    pub fn open_duration(&self) -> Duration {
        Duration::from_millis(self.open_duration_ms)
    }
}

/// Passport write settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassportConfig {
    pub validity_days: i64,
}

impl Default for PassportConfig {
    fn default() -> Self {
        Self { validity_days: 180 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_default_values() {
        let config = EngineConfig::default();

        assert_eq!(config.assembly.default_questions_per_indicator, 3);
        assert_eq!(config.assembly.saturation_threshold, 0.75);
        assert_eq!(config.scoring.passing_threshold, 70.0);
        assert_eq!(config.percentile.window_seconds, 300);
        assert_eq!(config.psychometrics.min_responses, 50);
        assert_eq!(config.dif.min_total, 100);
        assert_eq!(config.dif.min_group, 20);
        assert_eq!(config.dif.strata, 5);
        assert_eq!(config.resilience.max_attempts, 3);
        assert_eq!(config.passport.validity_days, 180);
    }

    #[test]
    fn engine_config_partial_deserialize() {
        let toml_str = r#"
            [scoring]
            passing_threshold = 60.0

            [resilience]
            max_attempts = 5
        "#;

        let config = EngineConfig::from_toml_str(toml_str).expect("parse partial config");

        assert_eq!(config.scoring.passing_threshold, 60.0);
        assert_eq!(config.resilience.max_attempts, 5);
        assert_eq!(config.scoring.correct_threshold, 0.5);
        assert_eq!(config.resilience.sliding_window_size, 10);
        assert_eq!(config.dif.strata, 5);
    }

    #[test]
    fn engine_config_serialization_roundtrip() {
        let config = EngineConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = EngineConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn engine_config_rejects_bad_types() {
        let err = EngineConfig::from_toml_str("[dif]\nstrata = \"five\"").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn load_or_default_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[percentile]\nwindow_seconds = 60\n").unwrap();

        let config = EngineConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.percentile.window_seconds, 60);
        assert_eq!(config.percentile.window(), chrono::Duration::seconds(60));
    }
}
