//! gauge-core: Domain model for the gauge assessment engine
//!
//! This crate holds the types every other gauge crate shares:
//!
//! - **Catalog** - [`Competency`], [`BehavioralIndicator`], [`Question`] and the
//!   [`Inventory`] / [`ValidityWriter`] traits with [`InMemoryCatalog`]
//! - **Sessions** - [`TestSession`] state machine and immutable [`TestAnswer`]s
//! - **Results** - [`TestResult`] with competency and indicator breakdowns
//! - **Passport** - [`CompetencyPassport`] and the [`PassportStore`] contract
//! - **Events** - [`EngineEvent`] lifecycle events, [`EventLog`], [`EventEmitter`]
//! - **Context** - [`RequestContext`] threaded through every operation
//! - **Configuration** - [`EngineConfig`] loaded from TOML

pub mod catalog;
pub mod config;
pub mod context;
pub mod emitter;
pub mod error;
pub mod events;
pub mod ids;
pub mod log;
pub mod passport;
pub mod result;
pub mod session;
pub mod strategy;

pub use catalog::{
    AnswerOption, BehavioralIndicator, BigFiveTrait, CatalogSnapshot, Competency,
    DifficultyLevel, InMemoryCatalog, Inventory, Question, QuestionType, ValidityStatus,
    ValidityWriter,
};
pub use config::EngineConfig;
pub use context::RequestContext;
pub use emitter::EventEmitter;
pub use error::{CoreError, Result};
pub use events::{EngineEvent, EventEnvelope};
pub use ids::{
    CandidateId, CompetencyId, EventId, IndicatorId, OccupationCode, OptionId, QuestionId,
    ResultId, SessionId, TeamId, TemplateId,
};
pub use log::{EventLog, InMemoryEventLog};
pub use passport::{
    CompetencyPassport, InMemoryPassportStore, PassportStore, PassportUpdate, to_passport_score,
};
pub use result::{CompetencyScore, IndicatorScore, NewTestResult, TestResult};
pub use session::{AnswerValue, SessionStatus, TestAnswer, TestSession};
pub use strategy::AssessmentStrategy;
