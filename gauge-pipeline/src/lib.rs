//! gauge-pipeline: Session completion and side effects
//!
//! [`AssessmentPipeline::complete_session`] scores a session through the
//! resilient orchestrator, saves the result once and returns it. Everything
//! else happens afterwards on isolated [`SideEffectWorker`]s:
//!
//! - [`PercentileWorker`] - re-ranks recent results of the template
//! - [`PassportWorker`] - refreshes the candidate's Competency Passport
//! - [`AuditWorker`] - writes an [`AuditRecord`]
//! - [`ItemAnalysisWorker`] - updates item statistics and validity flags

pub mod audit;
pub mod dispatcher;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod signal;
pub mod workers;

pub use audit::{AuditRecord, AuditSink, InMemoryAuditSink};
pub use dispatcher::{SideEffectDispatcher, WorkerStats};
pub use error::{PipelineError, Result};
pub use history::{
    InMemoryItemStatisticsStore, InMemoryResponseHistory, ItemStatisticsStore, ResponseHistory,
};
pub use pipeline::AssessmentPipeline;
pub use signal::ScoringSignal;
pub use workers::{
    AuditWorker, ItemAnalysisWorker, PassportWorker, PercentileWorker, SideEffectWorker,
};
