//! Circuit breaker around scoring calls.
//!
//! Count-based sliding window: the last `sliding_window_size` outcomes are
//! kept, and once at least `minimum_calls` are recorded a failure rate at or
//! above the threshold opens the circuit. While half-open at most
//! `half_open_permitted_calls` trial calls are in flight; the rest are rejected.
//!
//! ```text
//!   ┌────────┐  failure rate   ┌──────┐  open_duration  ┌──────────┐
//!   │ Closed │ ──≥ threshold─► │ Open │ ───elapsed────► │ HalfOpen │
//!   └───▲────┘                 └──▲───┘                 └────┬─────┘
//!       │                         │        any failure       │
//!       │                         └──────────────────────────┤
//!       │            N successes                             │
//!       └────────────────────────────────────────────────────┘
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use gauge_core::config::ResilienceConfig;

/// State of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CircuitState {
    /// Calls flow; outcomes are recorded.
    #[default]
    Closed,
    /// Calls are rejected until the open duration elapses.
    Open,
    /// A limited number of trial calls test recovery.
    HalfOpen,
}

/// Transition emitted when state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum CircuitTransition {
    Opened { failure_rate: f64 },
    HalfOpened,
    Closed,
}

/// Breaker thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerSettings {
    pub failure_rate_threshold: f64,
    pub sliding_window_size: usize,
    pub minimum_calls: usize,
    pub open_duration: Duration,
    pub half_open_permitted_calls: u32,
}

impl From<&ResilienceConfig> for CircuitBreakerSettings {
    fn from(config: &ResilienceConfig) -> Self {
        Self {
            failure_rate_threshold: config.failure_rate_threshold,
            sliding_window_size: config.sliding_window_size.max(1),
            minimum_calls: config.minimum_calls.max(1),
            open_duration: config.open_duration(),
            half_open_permitted_calls: config.half_open_permitted_calls.max(1),
        }
    }
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self::from(&ResilienceConfig::default())
    }
}

/// Failure-rate circuit breaker.
pub struct CircuitBreaker {
    settings: CircuitBreakerSettings,
    state: CircuitState,
    /// `true` = failure, newest at the back.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    half_open_successes: u32,
    half_open_in_flight: u32,
}

impl CircuitBreaker {
    pub fn new(settings: CircuitBreakerSettings) -> Self {
        Self {
            window: VecDeque::with_capacity(settings.sliding_window_size),
            settings,
            state: CircuitState::Closed,
            opened_at: None,
            half_open_successes: 0,
            half_open_in_flight: 0,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Failure rate over the current window (0.0 when empty).
    pub fn failure_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let failures = self.window.iter().filter(|f| **f).count();
        failures as f64 / self.window.len() as f64
    }

    /// Move Open to HalfOpen once the open duration has elapsed.
    pub fn poll_at(&mut self, now: Instant) -> Option<CircuitTransition> {
        if self.state == CircuitState::Open
            && let Some(opened_at) = self.opened_at
            && now.duration_since(opened_at) >= self.settings.open_duration
        {
            self.state = CircuitState::HalfOpen;
            self.half_open_successes = 0;
            self.half_open_in_flight = 0;
            return Some(CircuitTransition::HalfOpened);
        }
        None
    }

    /// Whether a call may proceed at `now`. Polls the open timer first.
    ///
    /// A call allowed while half-open takes a trial slot that is returned by
    /// the next recorded outcome or by [`release_trial`](Self::release_trial).
    pub fn allow_call_at(&mut self, now: Instant) -> (bool, Option<CircuitTransition>) {
        let transition = self.poll_at(now);
        let allowed = match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if self.half_open_in_flight < self.settings.half_open_permitted_calls {
                    self.half_open_in_flight += 1;
                    true
                } else {
                    false
                }
            }
        };
        (allowed, transition)
    }

    /// Return a trial slot for a call whose outcome is not counted.
    pub fn release_trial(&mut self) {
        if self.state == CircuitState::HalfOpen {
            self.half_open_in_flight = self.half_open_in_flight.saturating_sub(1);
        }
    }

    pub fn record_success(&mut self) -> Option<CircuitTransition> {
        match self.state {
            CircuitState::Closed => {
                self.push(false);
                None
            }
            CircuitState::HalfOpen => {
                self.half_open_successes += 1;
                self.half_open_in_flight = self.half_open_in_flight.saturating_sub(1);
                if self.half_open_successes >= self.settings.half_open_permitted_calls {
                    self.state = CircuitState::Closed;
                    self.window.clear();
                    self.opened_at = None;
                    self.half_open_in_flight = 0;
                    return Some(CircuitTransition::Closed);
                }
                None
            }
            CircuitState::Open => None,
        }
    }

    pub fn record_failure_at(&mut self, now: Instant) -> Option<CircuitTransition> {
        match self.state {
            CircuitState::Closed => {
                self.push(true);
                let rate = self.failure_rate();
                if self.window.len() >= self.settings.minimum_calls
                    && rate >= self.settings.failure_rate_threshold
                {
                    self.open(now);
                    return Some(CircuitTransition::Opened { failure_rate: rate });
                }
                None
            }
            CircuitState::HalfOpen => {
                self.open(now);
                Some(CircuitTransition::Opened { failure_rate: 1.0 })
            }
            CircuitState::Open => None,
        }
    }

    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
        self.window.clear();
        self.half_open_successes = 0;
        self.half_open_in_flight = 0;
    }

    fn push(&mut self, failure: bool) {
        if self.window.len() == self.settings.sliding_window_size {
            self.window.pop_front();
        }
        self.window.push_back(failure);
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("state", &self.state)
            .field("failure_rate", &self.failure_rate())
            .field("window_len", &self.window.len())
            .field("threshold", &self.settings.failure_rate_threshold)
            .finish()
    }
}
