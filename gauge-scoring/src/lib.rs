//! gauge-scoring: Session scoring and percentile ranking
//!
//! - [`ScoringEngine`] scores a completed session into a [`gauge_core::TestResult`]
//! - [`PercentileEngine`] ranks results within their template cohort
//! - [`ResilientScoringOrchestrator`] wraps any [`Scorer`] with bounded retry
//!   and a [`CircuitBreaker`]

pub mod big_five;
pub mod circuit_breaker;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod percentile;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerSettings, CircuitState, CircuitTransition};
pub use engine::{
    DEFAULT_PASSING_THRESHOLD, Scorer, ScoringEngine, TemplateScoring, competency_score,
    overall_score,
};
pub use error::{OrchestratorError, Result, ScoringError};
pub use orchestrator::{ResilientScoringOrchestrator, SCORE_OPERATION};
pub use percentile::{
    FIRST_RESULT_PERCENTILE, InMemoryResultStore, PercentileEngine, RecalculationReport,
    ResultStore, percentile_rank,
};
pub use retry::RetryPolicy;
