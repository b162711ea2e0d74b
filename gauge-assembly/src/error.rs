//! Error types for gauge-assembly

use gauge_core::CoreError;
use thiserror::Error;

use crate::warnings::Warning;

/// Error type for blueprint validation and assembly.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// The blueprint is unusable as written.
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        warnings: Vec<Warning>,
    },

    /// None of the blueprint's competencies has an active indicator.
    #[error("No active indicators for the blueprint's competency set")]
    NoActiveIndicators { warnings: Vec<Warning> },

    /// A benchmark, team or passport lookup failed.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl AssemblyError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            warnings: Vec::new(),
        }
    }

    /// Stable tag used in `AssemblyFailed` events.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::NoActiveIndicators { .. } => "no_active_indicators",
            Self::Collaborator(_) => "collaborator",
            Self::Core(e) => e.error_type(),
        }
    }

    /// Warnings gathered before the failure, explaining the inventory gap.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        match self {
            Self::Configuration { warnings, .. } | Self::NoActiveIndicators { warnings } => {
                warnings
            }
            _ => &[],
        }
    }
}

/// Result type alias for assembly operations
pub type Result<T> = std::result::Result<T, AssemblyError>;
