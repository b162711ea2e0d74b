//! gauge-assembly: Blueprint-driven question selection
//!
//! [`BlueprintAssembler`] turns a [`ValidatedBlueprint`] into an ordered list
//! of questions plus [`Warning`]s about inventory gaps. Three strategies are
//! supported:
//!
//! - **OVERVIEW** - a chosen competency set, optionally weighted, with optional
//!   Big Five items
//! - **JOB_FIT** - delta testing against an occupational benchmark and the
//!   candidate's Competency Passport
//! - **TEAM_FIT** - more questions for competencies the team does not cover
//!
//! Selection is deterministic for a fixed seed when shuffling is off.

pub mod assembler;
pub mod blueprint;
pub mod collaborators;
pub mod error;
pub mod health;
pub mod job_fit;
pub mod overview;
pub mod selector;
pub mod team_fit;
pub mod warnings;

pub use assembler::{AssemblyOutcome, BlueprintAssembler};
pub use blueprint::{
    AssemblySettings, Blueprint, JobFitBlueprint, OverviewBlueprint, TeamFitBlueprint,
    ValidatedBlueprint, WeightedCompetency,
};
pub use collaborators::{
    BenchmarkLookup, BenchmarkProfile, StaticBenchmarkLookup, StaticTeamProfileLookup,
    TeamMemberProfile, TeamProfile, TeamProfileLookup,
};
pub use error::{AssemblyError, Result};
pub use health::{HealthEntry, InventoryHealth};
pub use warnings::{Severity, Warning, WarningCode};
