//! Rank-based percentiles within a template cohort.
//!
//! Results completed close together are ranked without a global lock, so a
//! percentile may be briefly stale. Re-running [`PercentileEngine::recalculate_recent`]
//! converges: it recomputes from source counts and only writes changed values.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gauge_core::{ResultId, SessionId, TemplateId, TestResult};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Result, ScoringError};

/// Percentile given to a result with no population to rank against.
pub const FIRST_RESULT_PERCENTILE: u8 = 50;

/// Storage of scored results.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Save a new result. Fails if the session already has one.
    async fn save(&self, result: TestResult) -> Result<()>;

    async fn get(&self, id: &ResultId) -> Result<Option<TestResult>>;

    async fn find_by_session(&self, session: &SessionId) -> Result<Option<TestResult>>;

    /// Every result for a template.
    async fn for_template(&self, template: &TemplateId) -> Result<Vec<TestResult>>;

    /// Store a new percentile. Returns whether the stored value changed.
    async fn update_percentile(&self, id: &ResultId, percentile: u8) -> Result<bool>;
}

#[derive(Debug, Default)]
struct StoreData {
    results: HashMap<ResultId, TestResult>,
    by_session: HashMap<SessionId, ResultId>,
}

/// In-memory result store.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    data: RwLock<StoreData>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.results.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn save(&self, result: TestResult) -> Result<()> {
        let mut data = self.data.write().await;
        if data.by_session.contains_key(&result.session_id) {
            return Err(ScoringError::AlreadyScored(result.session_id));
        }
        data.by_session.insert(result.session_id, result.id);
        data.results.insert(result.id, result);
        Ok(())
    }

    async fn get(&self, id: &ResultId) -> Result<Option<TestResult>> {
        Ok(self.data.read().await.results.get(id).cloned())
    }

    async fn find_by_session(&self, session: &SessionId) -> Result<Option<TestResult>> {
        let data = self.data.read().await;
        Ok(data
            .by_session
            .get(session)
            .and_then(|id| data.results.get(id))
            .cloned())
    }

    async fn for_template(&self, template: &TemplateId) -> Result<Vec<TestResult>> {
        let mut results: Vec<TestResult> = self
            .data
            .read()
            .await
            .results
            .values()
            .filter(|r| &r.template_id == template)
            .cloned()
            .collect();
        results.sort_by_key(|r| r.id);
        Ok(results)
    }

    async fn update_percentile(&self, id: &ResultId, percentile: u8) -> Result<bool> {
        let mut data = self.data.write().await;
        let result = data
            .results
            .get_mut(id)
            .ok_or_else(|| ScoringError::Storage(format!("result {id} not found")))?;
        Ok(result.set_percentile(percentile))
    }
}

/// Percentile of `score` in a population that includes it.
///
/// `below` counts strictly lower scores; a population of one ranks at 50.
#[must_use]
pub fn percentile_rank(score: f64, population: &[f64]) -> u8 {
    let total = population.len();
    if total <= 1 {
        return FIRST_RESULT_PERCENTILE;
    }
    let below = population.iter().filter(|s| **s < score).count();
    ((100.0 * below as f64 / total as f64).round() as i64).clamp(0, 100) as u8
}

/// Outcome of one recalculation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecalculationReport {
    /// Results inside the window that were re-ranked.
    pub examined: usize,
    /// Results whose stored percentile changed.
    pub updated: usize,
}

/// Recomputes percentiles for recent results of a template.
pub struct PercentileEngine {
    store: Arc<dyn ResultStore>,
    window: Duration,
}

impl PercentileEngine {
    pub fn new(store: Arc<dyn ResultStore>, window: Duration) -> Self {
        Self { store, window }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Re-rank every result of `template` completed within the window before `now`.
    pub async fn recalculate_recent(
        &self,
        template: &TemplateId,
        now: DateTime<Utc>,
    ) -> Result<RecalculationReport> {
        let results = self.store.for_template(template).await?;
        let population: Vec<f64> = results.iter().map(|r| r.overall_percentage).collect();
        let since = now - self.window;

        let mut report = RecalculationReport::default();
        for result in results.iter().filter(|r| r.completed_at >= since) {
            report.examined += 1;
            let percentile = percentile_rank(result.overall_percentage, &population);
            if result.percentile() == Some(percentile) {
                continue;
            }
            if self.store.update_percentile(&result.id, percentile).await? {
                debug!(result_id = %result.id, percentile, "Percentile updated");
                report.updated += 1;
            }
        }

        info!(
            template_id = %template,
            population = population.len(),
            examined = report.examined,
            updated = report.updated,
            "Percentiles recalculated"
        );
        Ok(report)
    }

    /// Re-rank a single result against its whole template cohort.
    pub async fn recalculate_result(&self, id: &ResultId) -> Result<Option<u8>> {
        let Some(result) = self.store.get(id).await? else {
            return Ok(None);
        };
        let population: Vec<f64> = self
            .store
            .for_template(&result.template_id)
            .await?
            .iter()
            .map(|r| r.overall_percentage)
            .collect();
        let percentile = percentile_rank(result.overall_percentage, &population);
        self.store.update_percentile(id, percentile).await?;
        Ok(Some(percentile))
    }
}

impl std::fmt::Debug for PercentileEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PercentileEngine")
            .field("window_seconds", &self.window.num_seconds())
            .finish()
    }
}
