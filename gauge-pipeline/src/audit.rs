//! Audit trail of scored sessions.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gauge_core::{AssessmentStrategy, CandidateId, ResultId, SessionId, TemplateId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::signal::ScoringSignal;

/// One audit entry per scored session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub correlation_id: Uuid,
    pub result_id: ResultId,
    pub session_id: SessionId,
    pub template_id: TemplateId,
    pub candidate_id: CandidateId,
    pub strategy: AssessmentStrategy,
    pub overall_percentage: f64,
    pub passed: bool,
    pub answered_count: usize,
    pub skipped_count: usize,
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn from_signal(signal: &ScoringSignal, now: DateTime<Utc>) -> Self {
        let result = &signal.result;
        Self {
            id: Uuid::now_v7(),
            correlation_id: signal.context.correlation_id,
            result_id: result.id,
            session_id: result.session_id,
            template_id: result.template_id,
            candidate_id: result.candidate_id.clone(),
            strategy: signal.strategy,
            overall_percentage: result.overall_percentage,
            passed: result.passed,
            answered_count: result.answered_count,
            skipped_count: result.skipped_count,
            recorded_at: now,
        }
    }
}

/// Destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn write(&self, record: AuditRecord) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn write(&self, record: AuditRecord) -> Result<()> {
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
        Ok(())
    }
}
