//! Request-scoped context passed explicitly through assembly and scoring.
//!
//! Carries correlation and identity attributes. Call sites pass it down by
//! reference and open spans from it; there is no thread-local state.

use serde::{Deserialize, Serialize};
use tracing::Span;
use tracing::field::{Empty, display};
use uuid::Uuid;

use crate::ids::{CandidateId, SessionId, TemplateId};

/// Correlation and identity attributes for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub correlation_id: Uuid,
    pub session_id: Option<SessionId>,
    pub candidate_id: Option<CandidateId>,
    pub template_id: Option<TemplateId>,
}

impl RequestContext {
    /// Create a context with a fresh correlation id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::now_v7(),
            session_id: None,
            candidate_id: None,
            template_id: None,
        }
    }

    #[must_use]
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    #[must_use]
    pub fn with_candidate(mut self, candidate_id: CandidateId) -> Self {
        self.candidate_id = Some(candidate_id);
        self
    }

    #[must_use]
    pub fn with_template(mut self, template_id: TemplateId) -> Self {
        self.template_id = Some(template_id);
        self
    }

    /// Open an info-level span carrying this context's attributes.
    pub fn span(&self, operation: &'static str) -> Span {
        let span = tracing::info_span!(
            "gauge",
            operation,
            correlation_id = %self.correlation_id,
            session_id = Empty,
            candidate_id = Empty,
            template_id = Empty,
        );
        if let Some(session_id) = &self.session_id {
            span.record("session_id", display(session_id));
        }
        if let Some(candidate_id) = &self.candidate_id {
            span.record("candidate_id", display(candidate_id));
        }
        if let Some(template_id) = &self.template_id {
            span.record("template_id", display(template_id));
        }
        span
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
