//! Differential Item Functioning with the Mantel-Haenszel procedure.
//!
//! Respondents of both groups are pooled and cut into ability strata by total
//! test score. Per item and stratum a 2×2 table is built:
//!
//! ```text
//!              correct   incorrect
//! reference       A          B
//! focal           C          D
//! ```
//!
//! α_MH = Σ(AD/N) / Σ(BC/N), and the ETS delta is −2.35·ln(α_MH). Negative
//! delta means the item favors the reference group.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use gauge_core::config::DifConfig;
use gauge_core::{QuestionId, SessionId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PsychometricsError, Result};

/// ETS delta scale factor.
pub const ETS_DELTA_SCALE: f64 = -2.35;

/// Delta magnitude below which an item shows no direction.
const DIRECTION_EPSILON: f64 = 1e-9;

/// Scores of one respondent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespondentScores {
    pub session_id: SessionId,
    pub total_score: f64,
    /// Normalized score per answered item.
    pub scores: BTreeMap<QuestionId, f64>,
}

/// Raw score matrix: respondents × items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreMatrix {
    #[serde(default)]
    respondents: Vec<RespondentScores>,
}

impl ScoreMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a respondent with an explicit total score.
    pub fn insert_with_total(
        &mut self,
        session_id: SessionId,
        total_score: f64,
        scores: BTreeMap<QuestionId, f64>,
    ) {
        self.respondents.push(RespondentScores {
            session_id,
            total_score,
            scores,
        });
    }

    /// Add a respondent whose total is the sum of their item scores.
    pub fn insert(&mut self, session_id: SessionId, scores: BTreeMap<QuestionId, f64>) {
        let total = scores.values().sum();
        self.insert_with_total(session_id, total, scores);
    }

    pub fn respondents(&self) -> &[RespondentScores] {
        &self.respondents
    }

    pub fn len(&self) -> usize {
        self.respondents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.respondents.is_empty()
    }

    /// Every item answered by at least one respondent.
    pub fn items(&self) -> BTreeSet<QuestionId> {
        self.respondents
            .iter()
            .flat_map(|r| r.scores.keys().copied())
            .collect()
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(gauge_core::CoreError::from)?;
        let matrix = serde_json::from_str(&raw).map_err(gauge_core::CoreError::from)?;
        Ok(matrix)
    }
}

/// Focal/reference partition and items to analyze.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DifRequest {
    pub focal: BTreeSet<SessionId>,
    pub reference: BTreeSet<SessionId>,
    pub items: Vec<QuestionId>,
}

/// ETS classification of DIF magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DifClassification {
    #[serde(rename = "A_NEGLIGIBLE")]
    ANegligible,
    #[serde(rename = "B_MODERATE")]
    BModerate,
    #[serde(rename = "C_LARGE")]
    CLarge,
}

impl DifClassification {
    #[must_use]
    pub fn from_delta(delta: f64) -> Self {
        let magnitude = delta.abs();
        if magnitude < 1.0 {
            Self::ANegligible
        } else if magnitude < 1.5 {
            Self::BModerate
        } else {
            Self::CLarge
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ANegligible => "A_NEGLIGIBLE",
            Self::BModerate => "B_MODERATE",
            Self::CLarge => "C_LARGE",
        }
    }
}

impl std::fmt::Display for DifClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which group an item advantages after ability matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DifDirection {
    FavorsFocal,
    FavorsReference,
}

impl DifDirection {
    #[must_use]
    pub fn from_delta(delta: f64) -> Option<Self> {
        if delta.abs() < DIRECTION_EPSILON {
            None
        } else if delta < 0.0 {
            Some(Self::FavorsReference)
        } else {
            Some(Self::FavorsFocal)
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FavorsFocal => "FAVORS_FOCAL",
            Self::FavorsReference => "FAVORS_REFERENCE",
        }
    }
}

/// DIF statistics of one item.
///
/// All statistics are `None` when no stratum has respondents from both groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifItemResult {
    pub question_id: QuestionId,
    pub odds_ratio: Option<f64>,
    pub ets_delta: Option<f64>,
    pub chi_square: Option<f64>,
    pub p_value: Option<f64>,
    pub classification: Option<DifClassification>,
    pub direction: Option<DifDirection>,
    /// Strata that contributed to the pooled statistic.
    pub strata_used: usize,
    pub focal_responses: usize,
    pub reference_responses: usize,
}

impl DifItemResult {
    fn insufficient(question_id: QuestionId, focal: usize, reference: usize) -> Self {
        Self {
            question_id,
            odds_ratio: None,
            ets_delta: None,
            chi_square: None,
            p_value: None,
            classification: None,
            direction: None,
            strata_used: 0,
            focal_responses: focal,
            reference_responses: reference,
        }
    }
}

/// Result of one DIF analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifReport {
    pub focal_count: usize,
    pub reference_count: usize,
    pub strata: usize,
    pub items: Vec<DifItemResult>,
}

impl DifReport {
    /// Items classified C_LARGE.
    pub fn large(&self) -> impl Iterator<Item = &DifItemResult> {
        self.items
            .iter()
            .filter(|i| i.classification == Some(DifClassification::CLarge))
    }

    pub fn item(&self, id: &QuestionId) -> Option<&DifItemResult> {
        self.items.iter().find(|i| &i.question_id == id)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Table {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

impl Table {
    fn n(&self) -> f64 {
        self.a + self.b + self.c + self.d
    }

    fn usable(&self) -> bool {
        self.a + self.b > 0.0 && self.c + self.d > 0.0
    }

    fn corrected(&self) -> Self {
        Self {
            a: self.a + 0.5,
            b: self.b + 0.5,
            c: self.c + 0.5,
            d: self.d + 0.5,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Group {
    Focal,
    Reference,
}

/// Mantel-Haenszel DIF analyzer.
#[derive(Debug, Clone)]
pub struct DifAnalyzer {
    config: DifConfig,
    correct_threshold: f64,
}

impl DifAnalyzer {
    /// `correct_threshold`: normalized score at which a response counts as correct.
    pub fn new(config: DifConfig, correct_threshold: f64) -> Self {
        Self {
            config,
            correct_threshold,
        }
    }

    /// Analyze the requested items. Fails fast on an invalid request.
    pub fn analyze(&self, matrix: &ScoreMatrix, request: &DifRequest) -> Result<DifReport> {
        self.validate(matrix, request)?;

        let members: Vec<(Group, &RespondentScores)> = matrix
            .respondents()
            .iter()
            .filter_map(|r| {
                if request.focal.contains(&r.session_id) {
                    Some((Group::Focal, r))
                } else if request.reference.contains(&r.session_id) {
                    Some((Group::Reference, r))
                } else {
                    None
                }
            })
            .collect();
        let focal_count = members.iter().filter(|(g, _)| *g == Group::Focal).count();
        let reference_count = members.len() - focal_count;

        let cuts = stratum_cuts(
            members.iter().map(|(_, r)| r.total_score).collect(),
            self.config.strata.max(1),
        );
        let strata: Vec<usize> = members
            .iter()
            .map(|(_, r)| stratum_of(r.total_score, &cuts))
            .collect();

        let items = request
            .items
            .iter()
            .map(|item| {
                let mut tables = vec![Table::default(); cuts.len() + 1];
                let (mut focal, mut reference) = (0, 0);
                for ((group, respondent), stratum) in members.iter().zip(&strata) {
                    let Some(score) = respondent.scores.get(item) else {
                        continue;
                    };
                    let correct = *score >= self.correct_threshold;
                    let table = &mut tables[*stratum];
                    match (group, correct) {
                        (Group::Reference, true) => table.a += 1.0,
                        (Group::Reference, false) => table.b += 1.0,
                        (Group::Focal, true) => table.c += 1.0,
                        (Group::Focal, false) => table.d += 1.0,
                    }
                    match group {
                        Group::Focal => focal += 1,
                        Group::Reference => reference += 1,
                    }
                }
                mantel_haenszel(*item, &tables, focal, reference)
            })
            .collect::<Vec<_>>();

        let report = DifReport {
            focal_count,
            reference_count,
            strata: cuts.len() + 1,
            items,
        };
        info!(
            focal = focal_count,
            reference = reference_count,
            items = report.items.len(),
            large = report.large().count(),
            "DIF analysis completed"
        );
        Ok(report)
    }

    fn validate(&self, matrix: &ScoreMatrix, request: &DifRequest) -> Result<()> {
        if request.items.is_empty() {
            return Err(PsychometricsError::Validation(
                "at least one question id is required".to_string(),
            ));
        }
        if let Some(overlap) = request.focal.intersection(&request.reference).next() {
            return Err(PsychometricsError::Validation(format!(
                "session {overlap} is in both focal and reference groups"
            )));
        }

        let present: BTreeSet<SessionId> =
            matrix.respondents().iter().map(|r| r.session_id).collect();
        let focal = request.focal.intersection(&present).count();
        let reference = request.reference.intersection(&present).count();

        if focal < self.config.min_group || reference < self.config.min_group {
            return Err(PsychometricsError::Validation(format!(
                "each group needs at least {} respondents (focal {focal}, reference {reference})",
                self.config.min_group
            )));
        }
        if focal + reference < self.config.min_total {
            return Err(PsychometricsError::Validation(format!(
                "at least {} respondents required, got {}",
                self.config.min_total,
                focal + reference
            )));
        }
        Ok(())
    }
}

/// Cut points at quantile positions of the sorted pooled totals.
fn stratum_cuts(mut totals: Vec<f64>, strata: usize) -> Vec<f64> {
    totals.sort_by(f64::total_cmp);
    let n = totals.len();
    if n == 0 {
        return Vec::new();
    }
    (1..strata).map(|k| totals[(n * k / strata).min(n - 1)]).collect()
}

/// Stratum index: number of cut points at or below `total`.
fn stratum_of(total: f64, cuts: &[f64]) -> usize {
    cuts.iter().filter(|cut| **cut <= total).count()
}

fn mantel_haenszel(
    question_id: QuestionId,
    tables: &[Table],
    focal: usize,
    reference: usize,
) -> DifItemResult {
    let usable: Vec<Table> = tables.iter().copied().filter(Table::usable).collect();
    if usable.is_empty() {
        debug!(question_id = %question_id, "No stratum has both groups");
        return DifItemResult::insufficient(question_id, focal, reference);
    }

    let alpha = match cross_products(&usable) {
        (num, den) if num > 0.0 && den > 0.0 => num / den,
        (num, den) if num == 0.0 && den == 0.0 => 1.0,
        _ => {
            let corrected: Vec<Table> = usable.iter().map(Table::corrected).collect();
            let (num, den) = cross_products(&corrected);
            num / den
        }
    };
    let delta = ETS_DELTA_SCALE * alpha.ln();
    let chi_square = chi_square(&usable);
    let p_value = chi_square_p_value(chi_square);

    DifItemResult {
        question_id,
        odds_ratio: Some(alpha),
        ets_delta: Some(delta),
        chi_square: Some(chi_square),
        p_value: Some(p_value),
        classification: Some(DifClassification::from_delta(delta)),
        direction: DifDirection::from_delta(delta),
        strata_used: usable.len(),
        focal_responses: focal,
        reference_responses: reference,
    }
}

fn cross_products(tables: &[Table]) -> (f64, f64) {
    tables.iter().fold((0.0, 0.0), |(num, den), t| {
        let n = t.n();
        (num + t.a * t.d / n, den + t.b * t.c / n)
    })
}

/// MH chi-square with continuity correction.
fn chi_square(tables: &[Table]) -> f64 {
    let (mut observed, mut expected, mut variance) = (0.0, 0.0, 0.0);
    for t in tables {
        let n = t.n();
        let reference = t.a + t.b;
        let focal = t.c + t.d;
        let correct = t.a + t.c;
        let incorrect = t.b + t.d;
        observed += t.a;
        expected += reference * correct / n;
        if n > 1.0 {
            variance += reference * focal * correct * incorrect / (n * n * (n - 1.0));
        }
    }
    if variance <= 0.0 {
        return 0.0;
    }
    let deviation = ((observed - expected).abs() - 0.5).max(0.0);
    deviation * deviation / variance
}

/// Upper-tail p-value of a chi-square statistic with one degree of freedom.
#[must_use]
pub fn chi_square_p_value(chi_square: f64) -> f64 {
    if chi_square <= 0.0 {
        return 1.0;
    }
    erfc((chi_square / 2.0).sqrt()).clamp(0.0, 1.0)
}

/// Complementary error function (Chebyshev fit, fractional error < 1.2e-7).
#[must_use]
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let result = t * poly.exp();
    if x >= 0.0 { result } else { 2.0 - result }
}
