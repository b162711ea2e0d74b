//! Question picking with difficulty fallback and sibling borrowing.
//!
//! Candidates are read from the inventory, but each pick is confirmed with
//! [`Inventory::is_selectable`] at the moment it is taken, so an item retired
//! between the read and the pick is skipped.

use std::collections::HashSet;

use gauge_core::{
    BehavioralIndicator, BigFiveTrait, Competency, DifficultyLevel, Inventory, Question,
    QuestionId, ValidityStatus,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, trace};

use crate::warnings::{Warning, WarningCode};

/// Maximum difficulty distance allowed for a JOB_FIT strictness level.
#[must_use]
pub fn max_distance_for_strictness(strictness: u8) -> Option<usize> {
    match strictness {
        80.. => Some(0),
        50..=79 => Some(1),
        20..=49 => Some(2),
        _ => None,
    }
}

fn validity_rank(status: ValidityStatus) -> u8 {
    match status {
        ValidityStatus::Active => 0,
        ValidityStatus::FlaggedForReview => 1,
        ValidityStatus::Retired => 2,
    }
}

/// Stateful picker for one assembly call.
pub(crate) struct Selector<'a> {
    inventory: &'a dyn Inventory,
    rng: StdRng,
    chosen: HashSet<QuestionId>,
    picked: Vec<Question>,
    pub(crate) warnings: Vec<Warning>,
}

impl<'a> Selector<'a> {
    pub(crate) fn new(inventory: &'a dyn Inventory, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            inventory,
            rng,
            chosen: HashSet::new(),
            picked: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Fill one indicator with `count` questions near `target`.
    ///
    /// Order of preference: the indicator at the target difficulty, the
    /// indicator at adjacent difficulties, then siblings (ascending weight,
    /// then order index, then id), each closest-difficulty first.
    pub(crate) fn fill_indicator(
        &mut self,
        competency: &Competency,
        indicator: &BehavioralIndicator,
        siblings: &[BehavioralIndicator],
        target: DifficultyLevel,
        count: usize,
        max_distance: Option<usize>,
    ) -> usize {
        let levels: Vec<DifficultyLevel> = target
            .by_proximity()
            .into_iter()
            .filter(|l| max_distance.is_none_or(|max| l.distance(target) <= max))
            .collect();

        let mut remaining = count;
        let pool = self.candidates(self.inventory.questions(&indicator.id));
        for level in &levels {
            if remaining == 0 {
                break;
            }
            let taken = self.take_at_level(&pool, *level, remaining);
            if taken > 0 && *level != target {
                self.warnings.push(
                    Warning::warning(
                        WarningCode::IndicatorExhaustedBorrowing,
                        format!(
                            "{}: borrowed {taken} {level} question(s) for {target}",
                            indicator.title
                        ),
                    )
                    .for_competency(competency.id)
                    .for_indicator(indicator.id),
                );
            }
            remaining -= taken;
        }

        if remaining > 0 {
            let mut ordered: Vec<&BehavioralIndicator> =
                siblings.iter().filter(|s| s.id != indicator.id).collect();
            ordered.sort_by(|a, b| {
                a.weight
                    .total_cmp(&b.weight)
                    .then(a.order_index.cmp(&b.order_index))
                    .then(a.id.cmp(&b.id))
            });
            for sibling in ordered {
                if remaining == 0 {
                    break;
                }
                let pool = self.candidates(self.inventory.questions(&sibling.id));
                let mut taken = 0;
                for level in &levels {
                    if remaining == taken {
                        break;
                    }
                    taken += self.take_at_level(&pool, *level, remaining - taken);
                }
                if taken > 0 {
                    self.warnings.push(
                        Warning::warning(
                            WarningCode::IndicatorExhaustedBorrowingSibling,
                            format!(
                                "{}: borrowed {taken} question(s) from {}",
                                indicator.title, sibling.title
                            ),
                        )
                        .for_competency(competency.id)
                        .for_indicator(indicator.id),
                    );
                }
                remaining -= taken;
            }
        }

        if remaining > 0 {
            self.warnings.push(
                Warning::warning(
                    WarningCode::IndicatorUnderfilled,
                    format!(
                        "{}: {} of {count} question(s) available",
                        indicator.title,
                        count - remaining
                    ),
                )
                .for_competency(competency.id)
                .for_indicator(indicator.id),
            );
        }

        debug!(indicator_id = %indicator.id, requested = count, filled = count - remaining, "Indicator filled");
        count - remaining
    }

    /// Append up to `count` personality items for one trait.
    pub(crate) fn fill_trait(&mut self, trait_: BigFiveTrait, count: usize) -> usize {
        let mut pool = self.inventory.personality_questions(trait_);
        pool.retain(|q| q.is_selectable() && !self.chosen.contains(&q.id));
        sort_candidates(&mut pool);
        let taken = self.take_ranked(pool, count);
        if taken < count {
            self.warnings.push(Warning::warning(
                WarningCode::PersonalityItemsUnavailable,
                format!("{trait_}: {taken} of {count} personality item(s) available"),
            ));
        }
        taken
    }

    /// Shuffle the picked questions in place.
    pub(crate) fn shuffle(&mut self) {
        self.picked.shuffle(&mut self.rng);
    }

    pub(crate) fn into_parts(self) -> (Vec<Question>, Vec<Warning>) {
        (self.picked, self.warnings)
    }

    fn candidates(&self, mut questions: Vec<Question>) -> Vec<Question> {
        questions.retain(|q| !q.is_personality() && q.is_selectable());
        sort_candidates(&mut questions);
        questions
    }

    fn take_at_level(&mut self, pool: &[Question], level: DifficultyLevel, want: usize) -> usize {
        let at_level: Vec<Question> = pool
            .iter()
            .filter(|q| q.difficulty == level && !self.chosen.contains(&q.id))
            .cloned()
            .collect();
        self.take_ranked(at_level, want)
    }

    /// Pick from `sorted` (already ordered by validity rank then id): random
    /// within each rank, better ranks first.
    fn take_ranked(&mut self, sorted: Vec<Question>, want: usize) -> usize {
        let mut taken = 0;
        let mut start = 0;
        while start < sorted.len() && taken < want {
            let rank = validity_rank(sorted[start].validity);
            let end = sorted[start..]
                .iter()
                .position(|q| validity_rank(q.validity) != rank)
                .map_or(sorted.len(), |offset| start + offset);

            let mut group: Vec<&Question> = sorted[start..end].iter().collect();
            group.shuffle(&mut self.rng);
            for question in group {
                if taken == want {
                    break;
                }
                if self.chosen.contains(&question.id) {
                    continue;
                }
                if !self.inventory.is_selectable(&question.id) {
                    trace!(question_id = %question.id, "Question became unselectable, skipping");
                    continue;
                }
                self.chosen.insert(question.id);
                self.picked.push(question.clone());
                taken += 1;
            }
            start = end;
        }
        taken
    }
}

fn sort_candidates(questions: &mut [Question]) {
    questions.sort_by(|a, b| {
        validity_rank(a.validity)
            .cmp(&validity_rank(b.validity))
            .then(a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauge_core::{CompetencyId, IndicatorId, InMemoryCatalog, QuestionType};

    fn competency() -> Competency {
        Competency {
            id: CompetencyId::new(),
            name: "Analysis".into(),
            description: None,
            active: true,
        }
    }

    fn indicator(competency: &Competency, weight: f64, order_index: u32) -> BehavioralIndicator {
        BehavioralIndicator {
            id: IndicatorId::new(),
            competency_id: competency.id,
            title: format!("indicator-{order_index}"),
            weight,
            order_index,
            active: true,
        }
    }

    fn question(indicator: &BehavioralIndicator, difficulty: DifficultyLevel) -> Question {
        Question {
            id: QuestionId::new(),
            indicator_id: indicator.id,
            text: "q".into(),
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

    #[test]
    fn strictness_bands() {
        assert_eq!(max_distance_for_strictness(100), Some(0));
        assert_eq!(max_distance_for_strictness(80), Some(0));
        assert_eq!(max_distance_for_strictness(79), Some(1));
        assert_eq!(max_distance_for_strictness(50), Some(1));
        assert_eq!(max_distance_for_strictness(20), Some(2));
        assert_eq!(max_distance_for_strictness(19), None);
    }

    #[test]
    fn borrows_adjacent_difficulty_before_siblings() {
        let catalog = InMemoryCatalog::new();
        let c = competency();
        let target = indicator(&c, 0.5, 0);
        let sibling = indicator(&c, 0.5, 1);
        catalog.insert_question(question(&target, DifficultyLevel::Advanced));
        catalog.insert_question(question(&target, DifficultyLevel::Expert));
        catalog.insert_question(question(&sibling, DifficultyLevel::Advanced));

        let mut selector = Selector::new(&catalog, Some(1));
        let siblings = vec![target.clone(), sibling.clone()];
        let filled =
            selector.fill_indicator(&c, &target, &siblings, DifficultyLevel::Advanced, 2, None);

        assert_eq!(filled, 2);
        let (picked, warnings) = selector.into_parts();
        assert!(picked.iter().all(|q| q.indicator_id == target.id));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, WarningCode::IndicatorExhaustedBorrowing);
    }

    #[test]
    fn siblings_are_tried_by_ascending_weight() {
        let catalog = InMemoryCatalog::new();
        let c = competency();
        let target = indicator(&c, 0.5, 0);
        let heavy = indicator(&c, 0.9, 1);
        let light = indicator(&c, 0.2, 2);
        catalog.insert_question(question(&heavy, DifficultyLevel::Intermediate));
        catalog.insert_question(question(&light, DifficultyLevel::Intermediate));

        let mut selector = Selector::new(&catalog, Some(3));
        let siblings = vec![target.clone(), heavy.clone(), light.clone()];
        selector.fill_indicator(&c, &target, &siblings, DifficultyLevel::Intermediate, 1, None);

        let (picked, warnings) = selector.into_parts();
        assert_eq!(picked[0].indicator_id, light.id);
        assert_eq!(warnings[0].code, WarningCode::IndicatorExhaustedBorrowingSibling);
    }

    #[test]
    fn exact_strictness_reports_underfill() {
        let catalog = InMemoryCatalog::new();
        let c = competency();
        let target = indicator(&c, 1.0, 0);
        catalog.insert_question(question(&target, DifficultyLevel::Foundational));

        let mut selector = Selector::new(&catalog, Some(5));
        let filled = selector.fill_indicator(
            &c,
            &target,
            std::slice::from_ref(&target),
            DifficultyLevel::Advanced,
            1,
            Some(0),
        );

        assert_eq!(filled, 0);
        let (_, warnings) = selector.into_parts();
        assert_eq!(warnings[0].code, WarningCode::IndicatorUnderfilled);
    }

    #[test]
    fn flagged_items_rank_after_active_ones() {
        let catalog = InMemoryCatalog::new();
        let c = competency();
        let target = indicator(&c, 1.0, 0);
        let mut flagged = question(&target, DifficultyLevel::Intermediate);
        flagged.validity = ValidityStatus::FlaggedForReview;
        let active = question(&target, DifficultyLevel::Intermediate);
        catalog.insert_question(flagged);
        catalog.insert_question(active.clone());

        for seed in 0..10 {
            let mut selector = Selector::new(&catalog, Some(seed));
            selector.fill_indicator(
                &c,
                &target,
                std::slice::from_ref(&target),
                DifficultyLevel::Intermediate,
                1,
                None,
            );
            let (picked, _) = selector.into_parts();
            assert_eq!(picked[0].id, active.id);
        }
    }
}
