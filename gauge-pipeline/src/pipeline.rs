//! Session completion: score, save, then hand off side effects.

use std::sync::Arc;

use gauge_core::{RequestContext, SessionStatus, TestAnswer, TestResult, TestSession};
use gauge_scoring::{ResilientScoringOrchestrator, ResultStore, ScoringError, TemplateScoring};
use tracing::{Instrument, info};

use crate::dispatcher::{SideEffectDispatcher, WorkerStats};
use crate::error::{PipelineError, Result};
use crate::signal::ScoringSignal;

/// The critical path of a completed session.
///
/// Scoring and saving are synchronous for the caller. Percentile, passport,
/// audit and item analysis run afterwards on the dispatcher's workers and
/// cannot fail or delay the returned result.
pub struct AssessmentPipeline {
    orchestrator: Arc<ResilientScoringOrchestrator>,
    results: Arc<dyn ResultStore>,
    dispatcher: SideEffectDispatcher,
}

impl AssessmentPipeline {
    pub fn new(
        orchestrator: Arc<ResilientScoringOrchestrator>,
        results: Arc<dyn ResultStore>,
        dispatcher: SideEffectDispatcher,
    ) -> Self {
        Self {
            orchestrator,
            results,
            dispatcher,
        }
    }

    /// Score a completed session and save its result.
    ///
    /// Fails if the session is not COMPLETED or already has a result.
    pub async fn complete_session(
        &self,
        session: &TestSession,
        answers: &[TestAnswer],
        template: &TemplateScoring,
        ctx: &RequestContext,
    ) -> Result<TestResult> {
        let ctx = ctx
            .clone()
            .with_session(session.id)
            .with_candidate(session.candidate_id.clone())
            .with_template(session.template_id);
        let span = ctx.span("complete_session");
        self.score_and_save(session, answers, template, &ctx)
            .instrument(span)
            .await
    }

    async fn score_and_save(
        &self,
        session: &TestSession,
        answers: &[TestAnswer],
        template: &TemplateScoring,
        ctx: &RequestContext,
    ) -> Result<TestResult> {
        if session.status() != SessionStatus::Completed {
            return Err(PipelineError::Validation(format!(
                "session {} is {}, not COMPLETED",
                session.id,
                session.status()
            )));
        }
        if self.results.find_by_session(&session.id).await?.is_some() {
            return Err(ScoringError::AlreadyScored(session.id).into());
        }

        let result = self.orchestrator.score(session, answers, template, ctx).await?;
        self.results.save(result.clone()).await?;
        info!(
            result_id = %result.id,
            score = result.overall_percentage,
            passed = result.passed,
            "Session result saved"
        );

        self.dispatcher.dispatch(
            ScoringSignal::new(result.clone(), answers.to_vec(), ctx.clone())
                .with_question_order(session.question_order.clone()),
        );
        Ok(result)
    }

    pub fn results(&self) -> &Arc<dyn ResultStore> {
        &self.results
    }

    /// Stop the side-effect workers once their queues are drained.
    pub async fn shutdown(self) -> Vec<WorkerStats> {
        self.dispatcher.shutdown().await
    }
}

impl std::fmt::Debug for AssessmentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssessmentPipeline")
            .field("orchestrator", &self.orchestrator)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
