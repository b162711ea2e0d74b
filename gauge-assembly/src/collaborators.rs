//! Query contracts for benchmark and team data owned outside the engine.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use async_trait::async_trait;
use gauge_core::{CompetencyId, OccupationCode, TeamId};
use serde::{Deserialize, Serialize};

use crate::error::{AssemblyError, Result};

/// Target proficiency per competency for an occupation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkProfile {
    pub occupation_code: OccupationCode,
    #[serde(default)]
    pub title: Option<String>,
    /// Targets on the 1.0–5.0 passport scale.
    pub targets: BTreeMap<CompetencyId, f64>,
}

/// Lookup of occupational benchmark profiles.
#[async_trait]
pub trait BenchmarkLookup: Send + Sync {
    /// `Ok(None)` for unknown codes.
    async fn find(&self, code: &OccupationCode) -> Result<Option<BenchmarkProfile>>;
}

/// One team member's competency scores (1.0–5.0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMemberProfile {
    pub member_id: String,
    pub scores: BTreeMap<CompetencyId, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamProfile {
    pub team_id: TeamId,
    pub members: Vec<TeamMemberProfile>,
}

impl TeamProfile {
    /// Every competency at least one member has a score for.
    #[must_use]
    pub fn competencies(&self) -> BTreeSet<CompetencyId> {
        self.members
            .iter()
            .flat_map(|m| m.scores.keys().copied())
            .collect()
    }

    /// Fraction of members scoring at least `proficiency` on `competency`.
    #[must_use]
    pub fn saturation(&self, competency: &CompetencyId, proficiency: f64) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        let covered = self
            .members
            .iter()
            .filter(|m| m.scores.get(competency).is_some_and(|s| *s >= proficiency))
            .count();
        covered as f64 / self.members.len() as f64
    }
}

/// Lookup of team member profiles.
#[async_trait]
pub trait TeamProfileLookup: Send + Sync {
    /// `Ok(None)` for unknown teams.
    async fn find(&self, team: &TeamId) -> Result<Option<TeamProfile>>;
}

/// Fixed set of benchmark profiles.
#[derive(Debug, Clone, Default)]
pub struct StaticBenchmarkLookup {
    profiles: HashMap<OccupationCode, BenchmarkProfile>,
}

impl StaticBenchmarkLookup {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_profile(mut self, profile: BenchmarkProfile) -> Self {
        self.profiles.insert(profile.occupation_code.clone(), profile);
        self
    }

    /// Load a JSON array of profiles.
    pub fn load_json(path: &Path) -> Result<Self> {
        let profiles: Vec<BenchmarkProfile> = read_json(path)?;
        Ok(profiles
            .into_iter()
            .fold(Self::new(), |lookup, p| lookup.with_profile(p)))
    }
}

#[async_trait]
impl BenchmarkLookup for StaticBenchmarkLookup {
    async fn find(&self, code: &OccupationCode) -> Result<Option<BenchmarkProfile>> {
        Ok(self.profiles.get(code).cloned())
    }
}

/// Fixed set of team profiles.
#[derive(Debug, Clone, Default)]
pub struct StaticTeamProfileLookup {
    teams: HashMap<TeamId, TeamProfile>,
}

impl StaticTeamProfileLookup {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_team(mut self, team: TeamProfile) -> Self {
        self.teams.insert(team.team_id.clone(), team);
        self
    }

    /// Load a JSON array of team profiles.
    pub fn load_json(path: &Path) -> Result<Self> {
        let teams: Vec<TeamProfile> = read_json(path)?;
        Ok(teams.into_iter().fold(Self::new(), |lookup, t| lookup.with_team(t)))
    }
}

#[async_trait]
impl TeamProfileLookup for StaticTeamProfileLookup {
    async fn find(&self, team: &TeamId) -> Result<Option<TeamProfile>> {
        Ok(self.teams.get(team).cloned())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).map_err(gauge_core::CoreError::from)?;
    serde_json::from_str(&contents)
        .map_err(|e| AssemblyError::Collaborator(format!("{}: {e}", path.display())))
}
