//! Response history and stored item statistics feeding item analysis.

use std::collections::HashMap;

use async_trait::async_trait;
use gauge_core::QuestionId;
use gauge_psychometrics::{ItemResponse, ItemStatistics};
use tokio::sync::RwLock;

use crate::error::Result;

/// Every recorded response, per question.
#[async_trait]
pub trait ResponseHistory: Send + Sync {
    /// Record a response. A second response from the same session replaces the first.
    async fn record(&self, question: QuestionId, response: ItemResponse) -> Result<()>;

    /// Full history of one question.
    async fn responses(&self, question: &QuestionId) -> Result<Vec<ItemResponse>>;
}

/// Latest computed statistics per question.
#[async_trait]
pub trait ItemStatisticsStore: Send + Sync {
    async fn get(&self, question: &QuestionId) -> Result<Option<ItemStatistics>>;

    async fn put(&self, stats: ItemStatistics) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryResponseHistory {
    responses: RwLock<HashMap<QuestionId, Vec<ItemResponse>>>,
}

impl InMemoryResponseHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total responses across all questions.
    pub async fn len(&self) -> usize {
        self.responses.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ResponseHistory for InMemoryResponseHistory {
    async fn record(&self, question: QuestionId, response: ItemResponse) -> Result<()> {
        let mut responses = self.responses.write().await;
        let history = responses.entry(question).or_default();
        match history
            .iter_mut()
            .find(|r| r.session_id == response.session_id)
        {
            Some(existing) => *existing = response,
            None => history.push(response),
        }
        Ok(())
    }

    async fn responses(&self, question: &QuestionId) -> Result<Vec<ItemResponse>> {
        Ok(self
            .responses
            .read()
            .await
            .get(question)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryItemStatisticsStore {
    stats: RwLock<HashMap<QuestionId, ItemStatistics>>,
}

impl InMemoryItemStatisticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored entry, ordered by question id.
    pub async fn all(&self) -> Vec<ItemStatistics> {
        let mut all: Vec<ItemStatistics> = self.stats.read().await.values().cloned().collect();
        all.sort_by_key(|s| s.question_id);
        all
    }
}

#[async_trait]
impl ItemStatisticsStore for InMemoryItemStatisticsStore {
    async fn get(&self, question: &QuestionId) -> Result<Option<ItemStatistics>> {
        Ok(self.stats.read().await.get(question).cloned())
    }

    async fn put(&self, stats: ItemStatistics) -> Result<()> {
        self.stats.write().await.insert(stats.question_id, stats);
        Ok(())
    }
}
