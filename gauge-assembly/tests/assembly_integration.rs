//! Integration tests for blueprint assembly across all three strategies.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use gauge_assembly::{
    AssemblyError, AssemblySettings, BenchmarkProfile, Blueprint, BlueprintAssembler,
    InventoryHealth, JobFitBlueprint, OverviewBlueprint, Severity, StaticBenchmarkLookup,
    StaticTeamProfileLookup, TeamFitBlueprint, TeamMemberProfile, TeamProfile, WarningCode,
    WeightedCompetency,
};
use gauge_core::config::AssemblyConfig;
use gauge_core::{
    BehavioralIndicator, BigFiveTrait, CandidateId, Competency, CompetencyId, DifficultyLevel,
    EngineEvent, EventEmitter, InMemoryCatalog, InMemoryEventLog, InMemoryPassportStore,
    IndicatorId, Inventory, PassportStore, PassportUpdate, Question, QuestionId, QuestionType,
    RequestContext, ResultId, TeamId, ValidityStatus, ValidityWriter,
};

fn question(indicator: IndicatorId, difficulty: DifficultyLevel) -> Question {
    Question {
        id: QuestionId::new(),
        indicator_id: indicator,
        text: format!("{difficulty} item"),
        question_type: QuestionType::Numeric,
        difficulty,
        active: true,
        validity: ValidityStatus::Active,
        options: vec![],
        scale_max: 5,
        reverse_scored: false,
        weight: 1.0,
        big_five_trait: None,
    }
}

/// Add a competency with `indicators` indicators, each holding `levels` questions.
fn add_competency(
    catalog: &InMemoryCatalog,
    name: &str,
    indicators: usize,
    levels: &[(DifficultyLevel, usize)],
) -> (CompetencyId, Vec<IndicatorId>) {
    let competency = Competency {
        id: CompetencyId::new(),
        name: name.into(),
        description: None,
        active: true,
    };
    catalog.insert_competency(competency.clone());

    let mut ids = Vec::new();
    for idx in 0..indicators {
        let indicator = BehavioralIndicator {
            id: IndicatorId::new(),
            competency_id: competency.id,
            title: format!("{name}-{idx}"),
            weight: 0.5,
            order_index: idx as u32,
            active: true,
        };
        catalog.insert_indicator(indicator.clone());
        for (level, count) in levels {
            for _ in 0..*count {
                catalog.insert_question(question(indicator.id, *level));
            }
        }
        ids.push(indicator.id);
    }
    (competency.id, ids)
}

fn overview(competencies: &[CompetencyId], settings: AssemblySettings) -> Blueprint {
    Blueprint::Overview(OverviewBlueprint {
        competencies: competencies
            .iter()
            .map(|id| WeightedCompetency {
                competency_id: *id,
                weight: 1.0,
            })
            .collect(),
        include_big_five: false,
        settings,
    })
}

fn seeded(seed: u64) -> AssemblySettings {
    AssemblySettings {
        seed: Some(seed),
        ..AssemblySettings::default()
    }
}

#[tokio::test]
async fn same_seed_without_shuffle_is_reproducible() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let (a, _) = add_competency(&catalog, "a", 3, &[(DifficultyLevel::Intermediate, 8)]);
    let (b, _) = add_competency(&catalog, "b", 2, &[(DifficultyLevel::Intermediate, 8)]);
    let assembler = BlueprintAssembler::new(catalog, AssemblyConfig::default());
    let blueprint = assembler.validate(overview(&[a, b], seeded(42))).unwrap();
    let ctx = RequestContext::new();

    let first = assembler.assemble(&blueprint, None, &ctx).await.unwrap();
    let second = assembler.assemble(&blueprint, None, &ctx).await.unwrap();

    assert_eq!(first.question_ids(), second.question_ids());
    assert_eq!(first.questions.len(), 5 * 3);
}

#[tokio::test]
async fn output_is_grouped_by_competency_then_indicator() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let (a, a_inds) = add_competency(&catalog, "a", 2, &[(DifficultyLevel::Intermediate, 5)]);
    let (b, b_inds) = add_competency(&catalog, "b", 1, &[(DifficultyLevel::Intermediate, 5)]);
    let assembler = BlueprintAssembler::new(catalog, AssemblyConfig::default());
    let blueprint = assembler.validate(overview(&[b, a], seeded(9))).unwrap();

    let outcome = assembler
        .assemble(&blueprint, None, &RequestContext::new())
        .await
        .unwrap();

    let order: Vec<IndicatorId> = outcome.questions.iter().map(|q| q.indicator_id).collect();
    let expected: Vec<IndicatorId> = [b_inds[0], a_inds[0], a_inds[1]]
        .iter()
        .flat_map(|id| std::iter::repeat_n(*id, 3))
        .collect();
    assert_eq!(order, expected);
}

#[tokio::test]
async fn never_selects_retired_inactive_or_duplicate_questions() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let (a, inds) = add_competency(
        &catalog,
        "a",
        3,
        &[
            (DifficultyLevel::Foundational, 2),
            (DifficultyLevel::Intermediate, 2),
            (DifficultyLevel::Advanced, 2),
        ],
    );
    let mut excluded = HashSet::new();
    for (i, q) in catalog.questions(&inds[0]).into_iter().enumerate() {
        if i % 2 == 0 {
            catalog
                .set_validity(&q.id, ValidityStatus::Retired)
                .unwrap();
        } else {
            catalog.deactivate_question(&q.id);
        }
        excluded.insert(q.id);
    }

    let assembler = BlueprintAssembler::new(catalog.clone(), AssemblyConfig::default());
    let settings = AssemblySettings {
        questions_per_indicator: Some(5),
        seed: Some(1),
        shuffle: true,
        ..AssemblySettings::default()
    };
    let blueprint = assembler.validate(overview(&[a], settings)).unwrap();
    let outcome = assembler
        .assemble(&blueprint, None, &RequestContext::new())
        .await
        .unwrap();

    let ids = outcome.question_ids();
    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
    assert!(ids.iter().all(|id| !excluded.contains(id)));
    // 12 selectable questions remain; 15 were requested
    assert_eq!(ids.len(), 12);
    assert!(outcome.has_warning(WarningCode::IndicatorExhaustedBorrowing));
    assert!(outcome.has_warning(WarningCode::IndicatorExhaustedBorrowingSibling));
    assert!(outcome.has_warning(WarningCode::IndicatorUnderfilled));
}

#[tokio::test]
async fn health_is_reported_per_competency_and_difficulty() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let (two, _) = add_competency(&catalog, "two", 1, &[(DifficultyLevel::Intermediate, 2)]);
    let (four, _) = add_competency(&catalog, "four", 1, &[(DifficultyLevel::Intermediate, 4)]);
    let (six, _) = add_competency(&catalog, "six", 1, &[(DifficultyLevel::Intermediate, 6)]);
    let assembler = BlueprintAssembler::new(catalog, AssemblyConfig::default());
    let blueprint = assembler
        .validate(overview(&[two, four, six], seeded(3)))
        .unwrap();

    let outcome = assembler
        .assemble(&blueprint, None, &RequestContext::new())
        .await
        .unwrap();

    let health: HashMap<CompetencyId, InventoryHealth> = outcome
        .health
        .iter()
        .map(|h| (h.competency_id, h.health))
        .collect();
    assert_eq!(health[&two], InventoryHealth::Critical);
    assert_eq!(health[&four], InventoryHealth::Moderate);
    assert_eq!(health[&six], InventoryHealth::Healthy);

    let critical: Vec<_> = outcome
        .warnings
        .iter()
        .filter(|w| w.code == WarningCode::InventoryCritical)
        .collect();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].severity, Severity::Warning);
    assert_eq!(critical[0].competency_id, Some(two));
}

#[tokio::test]
async fn no_active_indicators_fails_with_warnings_and_event() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let competency = Competency {
        id: CompetencyId::new(),
        name: "empty".into(),
        description: None,
        active: true,
    };
    catalog.insert_competency(competency.clone());
    let log = Arc::new(InMemoryEventLog::new());
    let emitter = EventEmitter::new(log.clone());
    let mut events = emitter.subscribe();
    let assembler =
        BlueprintAssembler::new(catalog, AssemblyConfig::default()).with_emitter(emitter);
    let blueprint = assembler
        .validate(overview(&[competency.id], seeded(1)))
        .unwrap();

    let err = assembler
        .assemble(&blueprint, None, &RequestContext::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AssemblyError::NoActiveIndicators { .. }));
    let codes: Vec<_> = err.warnings().iter().map(|w| w.code).collect();
    assert!(codes.contains(&WarningCode::CompetencyNoActiveIndicators));
    assert!(
        err.warnings()
            .iter()
            .any(|w| w.code == WarningCode::NoActiveIndicators && w.severity == Severity::Error)
    );

    let started = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(started.event, EngineEvent::AssemblyStarted);
    let failed = events.recv().await.unwrap();
    match failed.event {
        EngineEvent::AssemblyFailed { error_type, .. } => {
            assert_eq!(error_type, "no_active_indicators");
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(failed.strategy, gauge_core::AssessmentStrategy::Overview);
}

#[tokio::test]
async fn big_five_items_are_appended_per_trait() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let (a, inds) = add_competency(&catalog, "a", 1, &[(DifficultyLevel::Intermediate, 3)]);
    for trait_ in BigFiveTrait::ALL {
        for _ in 0..3 {
            let mut q = question(inds[0], DifficultyLevel::Intermediate);
            q.question_type = QuestionType::Likert;
            q.big_five_trait = Some(trait_);
            catalog.insert_question(q);
        }
    }
    let assembler = BlueprintAssembler::new(catalog, AssemblyConfig::default());
    let mut blueprint = overview(&[a], seeded(11));
    if let Blueprint::Overview(b) = &mut blueprint {
        b.include_big_five = true;
    }
    let blueprint = assembler.validate(blueprint).unwrap();

    let outcome = assembler
        .assemble(&blueprint, None, &RequestContext::new())
        .await
        .unwrap();

    let personality = outcome
        .questions
        .iter()
        .filter(|q| q.is_personality())
        .count();
    assert_eq!(personality, 5 * 2);
    assert_eq!(outcome.questions.len(), 3 + 10);
    assert!(outcome.questions[..3].iter().all(|q| !q.is_personality()));
}

#[tokio::test]
async fn job_fit_allocates_by_gap_and_skips_closed_gaps() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let (a, _) = add_competency(&catalog, "a", 2, &[(DifficultyLevel::Expert, 3)]);
    let (b, _) = add_competency(&catalog, "b", 2, &[(DifficultyLevel::Advanced, 3)]);

    let benchmarks = StaticBenchmarkLookup::new().with_profile(BenchmarkProfile {
        occupation_code: "15-1252.00".into(),
        title: None,
        targets: BTreeMap::from([(a, 4.0), (b, 3.0)]),
    });
    let passports = Arc::new(InMemoryPassportStore::new());
    let candidate = CandidateId::new("cand-1");
    passports
        .upsert(PassportUpdate {
            candidate_id: candidate.clone(),
            competency_scores: BTreeMap::from([(a, 2.0), (b, 3.5)]),
            big_five: BTreeMap::new(),
            source_result_id: ResultId::new(),
            validity_days: 30,
        })
        .await
        .unwrap();

    let assembler = BlueprintAssembler::new(catalog, AssemblyConfig::default())
        .with_benchmarks(Arc::new(benchmarks))
        .with_passports(passports);
    let blueprint = assembler
        .validate(Blueprint::JobFit(JobFitBlueprint {
            occupation_code: "15-1252.00".into(),
            strictness: 90,
            competencies: vec![],
            settings: seeded(5),
        }))
        .unwrap();

    let outcome = assembler
        .assemble(&blueprint, Some(&candidate), &RequestContext::new())
        .await
        .unwrap();

    // gap 2.0 of 4.0 with 3 per indicator -> 2 per indicator
    assert_eq!(outcome.questions.len(), 4);
    assert!(
        outcome
            .questions
            .iter()
            .all(|q| q.difficulty == DifficultyLevel::Expert)
    );
    assert!(outcome.has_warning(WarningCode::CompetencyGapClosed));
    assert!(!outcome.has_warning(WarningCode::PassportNotFound));
    assert_eq!(outcome.competency_weights.get(&a), Some(&4.0));
    assert!(!outcome.competency_weights.contains_key(&b));
}

#[tokio::test]
async fn job_fit_without_benchmark_runs_full_assessment() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let (a, _) = add_competency(&catalog, "a", 2, &[(DifficultyLevel::Intermediate, 4)]);
    let assembler = BlueprintAssembler::new(catalog, AssemblyConfig::default());
    let blueprint = assembler
        .validate(Blueprint::JobFit(JobFitBlueprint {
            occupation_code: "00-0000.00".into(),
            strictness: 50,
            competencies: vec![a],
            settings: seeded(5),
        }))
        .unwrap();

    let outcome = assembler
        .assemble(&blueprint, Some(&CandidateId::new("nobody")), &RequestContext::new())
        .await
        .unwrap();

    assert!(outcome.has_warning(WarningCode::BenchmarkNotFound));
    assert!(outcome.has_warning(WarningCode::PassportNotFound));
    assert_eq!(outcome.questions.len(), 2 * 3);
}

#[tokio::test]
async fn job_fit_without_benchmark_or_competencies_is_a_configuration_error() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let assembler = BlueprintAssembler::new(catalog, AssemblyConfig::default());
    let blueprint = assembler
        .validate(Blueprint::JobFit(JobFitBlueprint {
            occupation_code: "00-0000.00".into(),
            strictness: 50,
            competencies: vec![],
            settings: AssemblySettings::default(),
        }))
        .unwrap();

    let err = assembler
        .assemble(&blueprint, None, &RequestContext::new())
        .await
        .unwrap_err();
    assert_eq!(err.error_type(), "configuration");
    assert!(
        err.warnings()
            .iter()
            .any(|w| w.code == WarningCode::BenchmarkNotFound)
    );
}

#[tokio::test]
async fn team_fit_favors_uncovered_competencies() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let (covered, covered_inds) =
        add_competency(&catalog, "covered", 1, &[(DifficultyLevel::Intermediate, 6)]);
    let (gap, gap_inds) = add_competency(&catalog, "gap", 1, &[(DifficultyLevel::Intermediate, 6)]);

    let member = |id: &str| TeamMemberProfile {
        member_id: id.into(),
        scores: BTreeMap::from([(covered, 4.0), (gap, 2.0)]),
    };
    let teams = StaticTeamProfileLookup::new().with_team(TeamProfile {
        team_id: TeamId::new("platform"),
        members: vec![member("m1"), member("m2")],
    });
    let assembler = BlueprintAssembler::new(catalog, AssemblyConfig::default())
        .with_team_profiles(Arc::new(teams));
    let blueprint = assembler
        .validate(Blueprint::TeamFit(TeamFitBlueprint {
            team_id: TeamId::new("platform"),
            saturation_threshold: None,
            competencies: vec![],
            settings: AssemblySettings {
                questions_per_indicator: Some(2),
                seed: Some(8),
                ..AssemblySettings::default()
            },
        }))
        .unwrap();

    let outcome = assembler
        .assemble(&blueprint, None, &RequestContext::new())
        .await
        .unwrap();

    let order: Vec<IndicatorId> = outcome.questions.iter().map(|q| q.indicator_id).collect();
    assert_eq!(
        order,
        vec![gap_inds[0], gap_inds[0], gap_inds[0], gap_inds[0], covered_inds[0]]
    );
    assert!(outcome.has_warning(WarningCode::CompetencySaturated));
    assert!(outcome.competency_weights[&gap] > outcome.competency_weights[&covered]);
}

#[tokio::test]
async fn team_fit_with_unknown_team_warns_and_assesses_blueprint_list() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let (a, _) = add_competency(&catalog, "a", 1, &[(DifficultyLevel::Intermediate, 6)]);
    let assembler = BlueprintAssembler::new(catalog, AssemblyConfig::default());
    let blueprint = assembler
        .validate(Blueprint::TeamFit(TeamFitBlueprint {
            team_id: TeamId::new("ghost"),
            saturation_threshold: Some(0.5),
            competencies: vec![a],
            settings: seeded(2),
        }))
        .unwrap();

    let outcome = assembler
        .assemble(&blueprint, None, &RequestContext::new())
        .await
        .unwrap();

    assert!(outcome.has_warning(WarningCode::TeamProfileUnavailable));
    // saturation 0 -> 3 + 3
    assert_eq!(outcome.questions.len(), 6);
}

/// Serves question lists captured before a retirement, like a reader that
/// raced a validity writer.
struct StaleInventory {
    live: Arc<InMemoryCatalog>,
    stale: HashMap<IndicatorId, Vec<Question>>,
}

impl Inventory for StaleInventory {
    fn competency(&self, id: &CompetencyId) -> Option<Competency> {
        self.live.competency(id)
    }

    fn indicators(&self, competency: &CompetencyId) -> Vec<BehavioralIndicator> {
        self.live.indicators(competency)
    }

    fn indicator(&self, id: &IndicatorId) -> Option<BehavioralIndicator> {
        self.live.indicator(id)
    }

    fn questions(&self, indicator: &IndicatorId) -> Vec<Question> {
        self.stale.get(indicator).cloned().unwrap_or_default()
    }

    fn question(&self, id: &QuestionId) -> Option<Question> {
        self.live.question(id)
    }

    fn personality_questions(&self, trait_: BigFiveTrait) -> Vec<Question> {
        self.live.personality_questions(trait_)
    }

    fn active_question_count(
        &self,
        competency: &CompetencyId,
        difficulty: DifficultyLevel,
    ) -> usize {
        self.live.active_question_count(competency, difficulty)
    }
}

#[tokio::test]
async fn question_retired_after_read_is_not_selected() {
    let live = Arc::new(InMemoryCatalog::new());
    let (a, inds) = add_competency(&live, "a", 1, &[(DifficultyLevel::Intermediate, 4)]);
    let stale: HashMap<IndicatorId, Vec<Question>> =
        HashMap::from([(inds[0], live.questions(&inds[0]))]);
    let retired = stale[&inds[0]][0].id;
    live.set_validity(&retired, ValidityStatus::Retired).unwrap();

    let inventory = Arc::new(StaleInventory {
        live: live.clone(),
        stale,
    });
    let assembler = BlueprintAssembler::new(inventory, AssemblyConfig::default());
    let settings = AssemblySettings {
        questions_per_indicator: Some(4),
        seed: Some(4),
        ..AssemblySettings::default()
    };
    let blueprint = assembler.validate(overview(&[a], settings)).unwrap();

    let outcome = assembler
        .assemble(&blueprint, None, &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(outcome.questions.len(), 3);
    assert!(!outcome.question_ids().contains(&retired));
    assert!(outcome.has_warning(WarningCode::IndicatorUnderfilled));
}

#[test]
fn blueprint_parses_from_toml() {
    let id = CompetencyId::new();
    let toml_str = format!(
        r#"
        strategy = "overview"
        include_big_five = true

        [[competencies]]
        competency_id = "{id}"
        weight = 1.5

        [settings]
        questions_per_indicator = 2
        preferred_difficulty = "ADVANCED"
        shuffle = true
        seed = 99
        "#
    );

    let blueprint: Blueprint = toml::from_str(&toml_str).unwrap();
    match &blueprint {
        Blueprint::Overview(b) => {
            assert_eq!(b.competencies[0].competency_id, id);
            assert_eq!(b.competencies[0].weight, 1.5);
            assert_eq!(b.settings.preferred_difficulty, DifficultyLevel::Advanced);
        }
        other => panic!("unexpected blueprint {other:?}"),
    }
}
