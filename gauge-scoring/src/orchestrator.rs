//! Retry and circuit-breaker policy around a [`Scorer`].
//!
//! Only transient errors are retried and counted by the breaker. When retries
//! run out or the circuit is open the attempt fails cleanly; a partial result
//! is never returned.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use gauge_core::config::ResilienceConfig;
use gauge_core::{EngineEvent, EventEmitter, RequestContext, TestAnswer, TestResult, TestSession};
use tracing::{debug, info, warn};

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerSettings, CircuitState, CircuitTransition};
use crate::engine::{Scorer, TemplateScoring};
use crate::error::OrchestratorError;
use crate::retry::RetryPolicy;

/// Operation name carried by retry and fallback events.
pub const SCORE_OPERATION: &str = "score_session";

/// Scorer wrapper with bounded retry and a circuit breaker.
pub struct ResilientScoringOrchestrator {
    scorer: Arc<dyn Scorer>,
    retry: RetryPolicy,
    breaker: Mutex<CircuitBreaker>,
    emitter: Option<EventEmitter>,
}

impl ResilientScoringOrchestrator {
    pub fn new(scorer: Arc<dyn Scorer>, config: &ResilienceConfig) -> Self {
        Self::with_policies(
            scorer,
            RetryPolicy::from(config),
            CircuitBreakerSettings::from(config),
        )
    }

    pub fn with_policies(
        scorer: Arc<dyn Scorer>,
        retry: RetryPolicy,
        breaker: CircuitBreakerSettings,
    ) -> Self {
        Self {
            scorer,
            retry,
            breaker: Mutex::new(CircuitBreaker::new(breaker)),
            emitter: None,
        }
    }

    #[must_use]
    pub fn with_emitter(mut self, emitter: EventEmitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker().state()
    }

    /// Score a session under the retry and breaker policy.
    pub async fn score(
        &self,
        session: &TestSession,
        answers: &[TestAnswer],
        template: &TemplateScoring,
        ctx: &RequestContext,
    ) -> Result<TestResult, OrchestratorError> {
        let strategy = template.strategy;
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let (allowed, transition) = self.breaker().allow_call_at(Instant::now());
            log_transition(transition);
            if !allowed {
                let reason = match self.circuit_state() {
                    CircuitState::HalfOpen => "circuit breaker half-open, trial calls in flight",
                    _ => "circuit breaker open",
                };
                warn!(session_id = %session.id, reason, "Scoring circuit open, failing fast");
                self.emit(
                    strategy,
                    ctx,
                    EngineEvent::FallbackInvoked {
                        operation: SCORE_OPERATION.to_string(),
                        reason: reason.to_string(),
                        error_type: OrchestratorError::CircuitOpen.error_type().to_string(),
                    },
                );
                return Err(OrchestratorError::CircuitOpen);
            }

            match self.scorer.score(session, answers, template, ctx).await {
                Ok(result) => {
                    log_transition(self.breaker().record_success());
                    return Ok(result);
                }
                Err(e) if !e.is_transient() => {
                    self.breaker().release_trial();
                    debug!(error = %e, "Non-transient scoring error, not retrying");
                    return Err(OrchestratorError::Scoring(e));
                }
                Err(e) => {
                    log_transition(self.breaker().record_failure_at(Instant::now()));

                    if attempt >= max_attempts {
                        warn!(
                            session_id = %session.id,
                            attempts = attempt,
                            error = %e,
                            "Scoring retries exhausted"
                        );
                        self.emit(
                            strategy,
                            ctx,
                            EngineEvent::FallbackInvoked {
                                operation: SCORE_OPERATION.to_string(),
                                reason: format!("retries exhausted after {attempt} attempt(s)"),
                                error_type: e.error_type().to_string(),
                            },
                        );
                        return Err(OrchestratorError::RetriesExhausted {
                            attempts: attempt,
                            last: e,
                        });
                    }

                    let delay = self.retry.delay_for(attempt);
                    info!(
                        session_id = %session.id,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying scoring"
                    );
                    self.emit(
                        strategy,
                        ctx,
                        EngineEvent::RetryAttempted {
                            operation: SCORE_OPERATION.to_string(),
                            attempt_number: attempt,
                            max_attempts,
                            error_type: e.error_type().to_string(),
                        },
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn breaker(&self) -> MutexGuard<'_, CircuitBreaker> {
        self.breaker.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(
        &self,
        strategy: gauge_core::AssessmentStrategy,
        ctx: &RequestContext,
        event: EngineEvent,
    ) {
        if let Some(emitter) = &self.emitter {
            emitter.emit(strategy, ctx, event);
        }
    }
}

impl std::fmt::Debug for ResilientScoringOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientScoringOrchestrator")
            .field("retry", &self.retry)
            .field("breaker", &*self.breaker())
            .finish()
    }
}

fn log_transition(transition: Option<CircuitTransition>) {
    match transition {
        Some(CircuitTransition::Opened { failure_rate }) => {
            warn!(failure_rate, "Scoring circuit opened");
        }
        Some(CircuitTransition::HalfOpened) => info!("Scoring circuit half-open"),
        Some(CircuitTransition::Closed) => info!("Scoring circuit closed"),
        None => {}
    }
}
