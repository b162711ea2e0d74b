//! Competency Passport: a reusable, time-limited record of a candidate's scores.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::catalog::BigFiveTrait;
use crate::error::Result;
use crate::ids::{CandidateId, CompetencyId, ResultId};

/// Lowest score on the passport scale.
pub const PASSPORT_MIN: f64 = 1.0;
/// Highest score on the passport scale.
pub const PASSPORT_MAX: f64 = 5.0;

/// Convert a 0–100 percentage to the 1.0–5.0 passport scale.
#[must_use]
pub fn to_passport_score(percentage: f64) -> f64 {
    (percentage / 20.0).clamp(PASSPORT_MIN, PASSPORT_MAX)
}

/// Stored passport for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetencyPassport {
    pub candidate_id: CandidateId,
    /// Per-competency scores on the 1.0–5.0 scale.
    pub competency_scores: BTreeMap<CompetencyId, f64>,
    /// Big Five trait averages (0–100).
    pub big_five: BTreeMap<BigFiveTrait, f64>,
    pub source_result_id: ResultId,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CompetencyPassport {
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    #[must_use]
    pub fn score(&self, competency: &CompetencyId) -> Option<f64> {
        self.competency_scores.get(competency).copied()
    }
}

/// Data written to the passport store after scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct PassportUpdate {
    pub candidate_id: CandidateId,
    pub competency_scores: BTreeMap<CompetencyId, f64>,
    pub big_five: BTreeMap<BigFiveTrait, f64>,
    pub source_result_id: ResultId,
    pub validity_days: i64,
}

impl PassportUpdate {
    /// Materialize the update at a point in time.
    #[must_use]
    pub fn into_passport(self, now: DateTime<Utc>) -> CompetencyPassport {
        CompetencyPassport {
            candidate_id: self.candidate_id,
            competency_scores: self.competency_scores,
            big_five: self.big_five,
            source_result_id: self.source_result_id,
            updated_at: now,
            expires_at: now + Duration::days(self.validity_days),
        }
    }
}

/// Storage of candidate passports.
#[async_trait]
pub trait PassportStore: Send + Sync {
    /// Get the candidate's passport if one exists and has not expired.
    async fn find_valid(
        &self,
        candidate: &CandidateId,
        now: DateTime<Utc>,
    ) -> Result<Option<CompetencyPassport>>;

    /// Insert or replace the candidate's passport.
    async fn upsert(&self, update: PassportUpdate) -> Result<CompetencyPassport>;
}

/// In-memory passport store.
#[derive(Debug, Default)]
pub struct InMemoryPassportStore {
    passports: RwLock<HashMap<CandidateId, CompetencyPassport>>,
}

impl InMemoryPassportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a passport directly (test and seeding helper).
    pub async fn insert(&self, passport: CompetencyPassport) {
        self.passports
            .write()
            .await
            .insert(passport.candidate_id.clone(), passport);
    }

    /// Get a passport regardless of expiry.
    pub async fn get(&self, candidate: &CandidateId) -> Option<CompetencyPassport> {
        self.passports.read().await.get(candidate).cloned()
    }
}

#[async_trait]
impl PassportStore for InMemoryPassportStore {
    async fn find_valid(
        &self,
        candidate: &CandidateId,
        now: DateTime<Utc>,
    ) -> Result<Option<CompetencyPassport>> {
        Ok(self
            .passports
            .read()
            .await
            .get(candidate)
            .filter(|p| p.is_valid_at(now))
            .cloned())
    }

    async fn upsert(&self, update: PassportUpdate) -> Result<CompetencyPassport> {
        let passport = update.into_passport(Utc::now());
        self.passports
            .write()
            .await
            .insert(passport.candidate_id.clone(), passport.clone());
        Ok(passport)
    }
}
