//! Inventory and configuration warnings attached to an assembly outcome.
//!
//! Codes are stable strings so clients can localize them.

use gauge_core::{CompetencyId, IndicatorId};
use serde::{Deserialize, Serialize};

/// Severity of a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Machine-readable warning code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    /// Questions taken from an adjacent difficulty level.
    IndicatorExhaustedBorrowing,
    /// Questions taken from a sibling indicator of the same competency.
    IndicatorExhaustedBorrowingSibling,
    /// Indicator could not be filled even after borrowing.
    IndicatorUnderfilled,
    InventoryCritical,
    InventoryModerate,
    BenchmarkNotFound,
    /// Blueprint asks for a competency the benchmark does not rate.
    BenchmarkCompetencyUnknown,
    PassportNotFound,
    /// Candidate already meets the benchmark for a competency.
    CompetencyGapClosed,
    TeamProfileUnavailable,
    CompetencySaturated,
    CompetencyNotFound,
    CompetencyNoActiveIndicators,
    PersonalityItemsUnavailable,
    NoActiveIndicators,
}

impl WarningCode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IndicatorExhaustedBorrowing => "INDICATOR_EXHAUSTED_BORROWING",
            Self::IndicatorExhaustedBorrowingSibling => "INDICATOR_EXHAUSTED_BORROWING_SIBLING",
            Self::IndicatorUnderfilled => "INDICATOR_UNDERFILLED",
            Self::InventoryCritical => "INVENTORY_CRITICAL",
            Self::InventoryModerate => "INVENTORY_MODERATE",
            Self::BenchmarkNotFound => "BENCHMARK_NOT_FOUND",
            Self::BenchmarkCompetencyUnknown => "BENCHMARK_COMPETENCY_UNKNOWN",
            Self::PassportNotFound => "PASSPORT_NOT_FOUND",
            Self::CompetencyGapClosed => "COMPETENCY_GAP_CLOSED",
            Self::TeamProfileUnavailable => "TEAM_PROFILE_UNAVAILABLE",
            Self::CompetencySaturated => "COMPETENCY_SATURATED",
            Self::CompetencyNotFound => "COMPETENCY_NOT_FOUND",
            Self::CompetencyNoActiveIndicators => "COMPETENCY_NO_ACTIVE_INDICATORS",
            Self::PersonalityItemsUnavailable => "PERSONALITY_ITEMS_UNAVAILABLE",
            Self::NoActiveIndicators => "NO_ACTIVE_INDICATORS",
        }
    }
}

impl std::fmt::Display for WarningCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One warning produced while assembling a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub severity: Severity,
    pub code: WarningCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competency_id: Option<CompetencyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator_id: Option<IndicatorId>,
}

impl Warning {
    pub fn new(severity: Severity, code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            competency_id: None,
            indicator_id: None,
        }
    }

    pub fn info(code: WarningCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn warning(code: WarningCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn error(code: WarningCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    #[must_use]
    pub fn for_competency(mut self, id: CompetencyId) -> Self {
        self.competency_id = Some(id);
        self
    }

    #[must_use]
    pub fn for_indicator(mut self, id: IndicatorId) -> Self {
        self.indicator_id = Some(id);
        self
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_as_stable_strings() {
        let json = serde_json::to_string(&WarningCode::IndicatorExhaustedBorrowingSibling).unwrap();
        assert_eq!(json, "\"INDICATOR_EXHAUSTED_BORROWING_SIBLING\"");
        for code in [
            WarningCode::InventoryCritical,
            WarningCode::PassportNotFound,
            WarningCode::NoActiveIndicators,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn warning_display_includes_severity_and_code() {
        let w = Warning::warning(WarningCode::IndicatorUnderfilled, "2 of 3 questions");
        assert_eq!(w.to_string(), "[WARNING] INDICATOR_UNDERFILLED: 2 of 3 questions");
    }

    #[test]
    fn severity_orders_info_first() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }
}
