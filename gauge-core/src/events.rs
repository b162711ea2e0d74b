//! Lifecycle events emitted by assembly, scoring and the resilience layer.
//!
//! Events are consumed by audit, metrics and passport listeners outside the
//! engine. Every event is tagged with the assessment strategy so downstream
//! aggregation can split by OVERVIEW / JOB_FIT / TEAM_FIT.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::ids::EventId;
use crate::strategy::AssessmentStrategy;

/// Payload of a lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    AssemblyStarted,
    AssemblyCompleted {
        duration_ms: u64,
        question_count: usize,
    },
    AssemblyFailed {
        error_type: String,
        duration_ms: u64,
    },
    ScoringStarted {
        answer_count: usize,
    },
    ScoringCompleted {
        score: f64,
        passed: bool,
        duration_ms: u64,
    },
    ScoringFailed {
        error_type: String,
        duration_ms: u64,
    },
    RetryAttempted {
        operation: String,
        attempt_number: u32,
        max_attempts: u32,
        error_type: String,
    },
    FallbackInvoked {
        operation: String,
        reason: String,
        error_type: String,
    },
}

impl EngineEvent {
    /// Short name of the event kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AssemblyStarted => "assembly_started",
            Self::AssemblyCompleted { .. } => "assembly_completed",
            Self::AssemblyFailed { .. } => "assembly_failed",
            Self::ScoringStarted { .. } => "scoring_started",
            Self::ScoringCompleted { .. } => "scoring_completed",
            Self::ScoringFailed { .. } => "scoring_failed",
            Self::RetryAttempted { .. } => "retry_attempted",
            Self::FallbackInvoked { .. } => "fallback_invoked",
        }
    }
}

/// An event with its identity, strategy tag and request context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub strategy: AssessmentStrategy,
    pub context: RequestContext,
    pub emitted_at: DateTime<Utc>,
    pub event: EngineEvent,
}

impl EventEnvelope {
    #[must_use]
    pub fn new(strategy: AssessmentStrategy, context: RequestContext, event: EngineEvent) -> Self {
        Self {
            event_id: EventId::new(),
            strategy,
            context,
            emitted_at: Utc::now(),
            event,
        }
    }
}
