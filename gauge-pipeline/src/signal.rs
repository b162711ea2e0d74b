//! Message sent to side-effect workers once a result is saved.

use gauge_core::{AssessmentStrategy, QuestionId, RequestContext, TestAnswer, TestResult};

/// A scored session, handed to every side-effect worker.
#[derive(Debug, Clone)]
pub struct ScoringSignal {
    pub result: TestResult,
    pub answers: Vec<TestAnswer>,
    /// Every question presented in the session, answered or not.
    pub question_order: Vec<QuestionId>,
    pub strategy: AssessmentStrategy,
    pub context: RequestContext,
}

impl ScoringSignal {
    pub fn new(result: TestResult, answers: Vec<TestAnswer>, context: RequestContext) -> Self {
        Self {
            strategy: result.strategy,
            result,
            answers,
            question_order: Vec::new(),
            context,
        }
    }

    #[must_use]
    pub fn with_question_order(mut self, question_order: Vec<QuestionId>) -> Self {
        self.question_order = question_order;
        self
    }
}
