//! End-to-end tests for session completion and its side effects.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use gauge_core::config::{PsychometricsConfig, ResilienceConfig};
use gauge_core::{
    AnswerValue, AssessmentStrategy, BehavioralIndicator, CandidateId, Competency, CompetencyId,
    DifficultyLevel, InMemoryCatalog, InMemoryPassportStore, IndicatorId, Inventory, Question,
    NewTestResult, QuestionId, QuestionType, RequestContext, SessionId, TemplateId, TestAnswer,
    TestSession, ValidityStatus, ValidityWriter, to_passport_score,
};
use gauge_pipeline::{
    AssessmentPipeline, AuditWorker, InMemoryAuditSink, InMemoryItemStatisticsStore,
    InMemoryResponseHistory, ItemAnalysisWorker, ItemStatisticsStore, PassportWorker,
    PercentileWorker, PipelineError, ResponseHistory, ScoringSignal, SideEffectDispatcher,
    SideEffectWorker,
};
use gauge_psychometrics::{ItemResponse, ItemStatisticsAnalyzer};
use gauge_scoring::{
    InMemoryResultStore, PercentileEngine, ResilientScoringOrchestrator, ResultStore,
    ScoringEngine, TemplateScoring,
};

struct Harness {
    pipeline: AssessmentPipeline,
    catalog: Arc<InMemoryCatalog>,
    results: Arc<InMemoryResultStore>,
    passports: Arc<InMemoryPassportStore>,
    audit: Arc<InMemoryAuditSink>,
    stats: Arc<InMemoryItemStatisticsStore>,
    competency: CompetencyId,
    questions: Vec<QuestionId>,
    template: TemplateScoring,
}

fn harness(min_responses: usize) -> Harness {
    let catalog = Arc::new(InMemoryCatalog::new());
    let competency = Competency {
        id: CompetencyId::new(),
        name: "Analytical thinking".into(),
        description: None,
        active: true,
    };
    let indicator = BehavioralIndicator {
        id: IndicatorId::new(),
        competency_id: competency.id,
        title: "Breaks problems down".into(),
        weight: 1.0,
        order_index: 0,
        active: true,
    };
    catalog.insert_competency(competency.clone());
    catalog.insert_indicator(indicator.clone());

    let questions: Vec<QuestionId> = (0..3)
        .map(|idx| {
            let question = Question {
                id: QuestionId::new(),
                indicator_id: indicator.id,
                text: format!("task {idx}"),
                question_type: QuestionType::Numeric,
                difficulty: DifficultyLevel::Intermediate,
                active: true,
                validity: ValidityStatus::Active,
                options: vec![],
                scale_max: 5,
                reverse_scored: false,
                weight: 1.0,
                big_five_trait: None,
            };
            let id = question.id;
            catalog.insert_question(question);
            id
        })
        .collect();

    let results = Arc::new(InMemoryResultStore::new());
    let passports = Arc::new(InMemoryPassportStore::new());
    let audit = Arc::new(InMemoryAuditSink::new());
    let stats = Arc::new(InMemoryItemStatisticsStore::new());

    let percentiles = Arc::new(PercentileEngine::new(
        results.clone(),
        chrono::Duration::minutes(5),
    ));
    let analyzer = ItemStatisticsAnalyzer::new(
        PsychometricsConfig {
            min_responses,
            ..PsychometricsConfig::default()
        },
        0.5,
    );
    let workers: Vec<Arc<dyn SideEffectWorker>> = vec![
        Arc::new(PercentileWorker::new(percentiles)),
        Arc::new(PassportWorker::new(passports.clone(), 180)),
        Arc::new(AuditWorker::new(audit.clone())),
        Arc::new(ItemAnalysisWorker::new(
            catalog.clone(),
            catalog.clone(),
            Arc::new(InMemoryResponseHistory::new()),
            stats.clone(),
            analyzer,
        )),
    ];

    let scorer = Arc::new(ScoringEngine::new(catalog.clone()));
    let orchestrator = Arc::new(ResilientScoringOrchestrator::new(
        scorer,
        &ResilienceConfig::default(),
    ));
    let pipeline = AssessmentPipeline::new(
        orchestrator,
        results.clone(),
        SideEffectDispatcher::start(workers),
    );

    Harness {
        pipeline,
        catalog,
        results,
        passports,
        audit,
        stats,
        competency: competency.id,
        questions,
        template: TemplateScoring::new(TemplateId::new(), AssessmentStrategy::Overview),
    }
}

/// A completed session answering every question with the given credits.
fn completed(h: &Harness, candidate: &str, credits: &[f64]) -> (TestSession, Vec<TestAnswer>) {
    let mut session = TestSession::new(
        h.template.template_id,
        CandidateId::new(candidate),
        h.questions.clone(),
    );
    session.start(Utc::now()).unwrap();
    let answers = h
        .questions
        .iter()
        .zip(credits)
        .map(|(id, credit)| {
            let question = h.catalog.question(id).unwrap();
            TestAnswer::record(session.id, &question, AnswerValue::Numeric(*credit), Utc::now())
                .unwrap()
        })
        .collect();
    session.complete(Utc::now()).unwrap();
    (session, answers)
}

#[tokio::test]
async fn completion_runs_every_side_effect() {
    let h = harness(50);
    let (session, answers) = completed(&h, "cand-1", &[1.0, 0.5, 0.0]);

    let result = h
        .pipeline
        .complete_session(&session, &answers, &h.template, &RequestContext::new())
        .await
        .unwrap();
    assert!((result.overall_percentage - 50.0).abs() < 1e-9);
    assert!(!result.passed);

    let stats = h.pipeline.shutdown().await;
    assert_eq!(stats.len(), 4);
    for worker in &stats {
        assert_eq!(worker.processed, 1, "{} did not run", worker.name);
        assert_eq!(worker.failed, 0);
    }

    let stored = h.results.get(&result.id).await.unwrap().unwrap();
    assert_eq!(stored.percentile(), Some(50));

    let passport = h.passports.get(&CandidateId::new("cand-1")).await.unwrap();
    assert_eq!(passport.source_result_id, result.id);
    assert_eq!(passport.score(&h.competency), Some(to_passport_score(50.0)));

    let audit = h.audit.records();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].session_id, session.id);

    // Below min_responses: provisional, no flags
    let item = h.stats.get(&h.questions[0]).await.unwrap().unwrap();
    assert!(item.provisional);
    assert_eq!(item.response_count, 1);
}

#[tokio::test]
async fn session_is_scored_only_once() {
    let h = harness(50);
    let (session, answers) = completed(&h, "cand-1", &[1.0, 1.0, 1.0]);

    h.pipeline
        .complete_session(&session, &answers, &h.template, &RequestContext::new())
        .await
        .unwrap();
    let err = h
        .pipeline
        .complete_session(&session, &answers, &h.template, &RequestContext::new())
        .await
        .unwrap_err();

    assert_eq!(err.error_type(), "already_scored");
    assert_eq!(h.results.len().await, 1);
    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn unfinished_session_is_rejected() {
    let h = harness(50);
    let mut session = TestSession::new(
        h.template.template_id,
        CandidateId::new("cand-1"),
        h.questions.clone(),
    );
    session.start(Utc::now()).unwrap();

    let err = h
        .pipeline
        .complete_session(&session, &[], &h.template, &RequestContext::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Validation(_)));
    assert!(h.results.is_empty().await);
    let stats = h.pipeline.shutdown().await;
    assert!(stats.iter().all(|s| s.processed == 0));
}

#[tokio::test]
async fn inverted_item_is_flagged_for_review() {
    let h = harness(4);

    // First two questions rise with ability, the third falls
    for k in 0..6u32 {
        let credit = f64::from(k) / 5.0;
        let inverted = if k < 3 { 1.0 } else { 0.0 };
        let (session, answers) = completed(&h, &format!("cand-{k}"), &[credit, credit, inverted]);
        h.pipeline
            .complete_session(&session, &answers, &h.template, &RequestContext::new())
            .await
            .unwrap();
    }
    h.pipeline.shutdown().await;

    let inverted = h.catalog.question(&h.questions[2]).unwrap();
    assert_eq!(inverted.validity, ValidityStatus::FlaggedForReview);
    let stats = h.stats.get(&h.questions[2]).await.unwrap().unwrap();
    assert!(stats.discrimination.unwrap() < 0.0);
    assert!(!stats.provisional);
    assert_eq!(stats.response_count, 6);
    assert!(stats.previous_discrimination.is_some());

    for id in &h.questions[..2] {
        assert_eq!(h.catalog.question(id).unwrap().validity, ValidityStatus::Active);
    }
}

#[tokio::test]
async fn unanswered_items_are_recorded_as_zero() {
    let h = harness(50);
    // The third question is presented but never answered
    let (session, answers) = completed(&h, "cand-1", &[1.0, 1.0]);
    assert_eq!(answers.len(), 2);

    h.pipeline
        .complete_session(&session, &answers, &h.template, &RequestContext::new())
        .await
        .unwrap();
    h.pipeline.shutdown().await;

    let skipped = h.stats.get(&h.questions[2]).await.unwrap().unwrap();
    assert_eq!(skipped.response_count, 1);
    assert_eq!(skipped.difficulty, Some(0.0));
    let answered = h.stats.get(&h.questions[0]).await.unwrap().unwrap();
    assert_eq!(answered.difficulty, Some(1.0));
}

/// History whose reads coincide with a reviewer retiring the item.
struct RetiredDuringAnalysis {
    inner: InMemoryResponseHistory,
    catalog: Arc<InMemoryCatalog>,
}

#[async_trait]
impl ResponseHistory for RetiredDuringAnalysis {
    async fn record(
        &self,
        question: QuestionId,
        response: ItemResponse,
    ) -> gauge_pipeline::Result<()> {
        self.inner.record(question, response).await
    }

    async fn responses(
        &self,
        question: &QuestionId,
    ) -> gauge_pipeline::Result<Vec<ItemResponse>> {
        self.catalog
            .set_validity(question, ValidityStatus::Retired)
            .unwrap();
        self.inner.responses(question).await
    }
}

#[tokio::test]
async fn concurrent_retirement_survives_item_analysis() {
    let h = harness(4);
    let target = h.questions[2];
    let history = Arc::new(RetiredDuringAnalysis {
        inner: InMemoryResponseHistory::new(),
        catalog: h.catalog.clone(),
    });

    // Strong respondents miss the item, weak ones get it right
    for k in 0..5u32 {
        history
            .inner
            .record(
                target,
                ItemResponse {
                    session_id: SessionId::new(),
                    item_score: if k < 3 { 1.0 } else { 0.0 },
                    total_score: f64::from(k) * 20.0,
                },
            )
            .await
            .unwrap();
    }

    let worker = ItemAnalysisWorker::new(
        h.catalog.clone(),
        h.catalog.clone(),
        history,
        h.stats.clone(),
        ItemStatisticsAnalyzer::new(
            PsychometricsConfig {
                min_responses: 4,
                ..PsychometricsConfig::default()
            },
            0.5,
        ),
    );
    let result = NewTestResult {
        session_id: SessionId::new(),
        template_id: h.template.template_id,
        candidate_id: CandidateId::new("cand-strong"),
        strategy: AssessmentStrategy::Overview,
        competency_scores: vec![],
        overall_percentage: 100.0,
        passed: true,
        big_five: None,
        answered_count: 0,
        skipped_count: 1,
        completed_at: Utc::now(),
    }
    .into();
    let signal =
        ScoringSignal::new(result, vec![], RequestContext::new()).with_question_order(vec![target]);

    worker.handle(&signal).await.unwrap();

    assert_eq!(
        h.catalog.question(&target).unwrap().validity,
        ValidityStatus::Retired
    );
    let stats = h.stats.get(&target).await.unwrap().unwrap();
    assert!(stats.discrimination.unwrap() < 0.0);
    assert_eq!(stats.validity, ValidityStatus::Retired);
    h.pipeline.shutdown().await;
}
