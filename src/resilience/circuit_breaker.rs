//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: testing if the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: after open_duration cooldown
//! Half-Open → Closed: half_open_trials successive trial successes
//! Half-Open → Open: any single trial failure
//! ```
//!
//! # Design Decisions
//! - Per-service breaker (not global), one mutex per breaker
//! - Fail fast in Open state: the underlying operation is never invoked
//! - Half-open admission is bounded; excess calls are rejected as if Open
//!   so a thundering herd cannot re-trip a recovering dependency

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::BreakerSettings;
use crate::error::ResilienceError;

/// Breaker state, serialized snake_case for status endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Observable status of one breaker.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BreakerStatus {
    pub state: CircuitState,
    pub failure_count: u32,
}

/// A state transition observed while recording an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_successes: u32,
    half_open_in_flight: u32,
    last_failure: Option<Instant>,
    last_state_change: Instant,
}

/// One circuit breaker, owned by the registry for the process lifetime.
#[derive(Debug)]
pub struct CircuitBreaker {
    service: String,
    settings: BreakerSettings,
    inner: Mutex<Inner>,
}

/// Admission token for a single call. Dropping an unsettled half-open
/// permit releases the trial slot (the call future was cancelled).
#[derive(Debug)]
pub struct CallPermit {
    breaker: Arc<CircuitBreaker>,
    half_open_trial: bool,
    settled: bool,
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if self.half_open_trial && !self.settled {
            self.breaker.abandon_trial();
        }
    }
}

impl CircuitBreaker {
    pub fn new(service: impl Into<String>, settings: BreakerSettings) -> Self {
        Self {
            service: service.into(),
            settings,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                half_open_successes: 0,
                half_open_in_flight: 0,
                last_failure: None,
                last_state_change: Instant::now(),
            }),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn status(&self) -> BreakerStatus {
        let inner = self.lock();
        BreakerStatus {
            state: inner.state,
            failure_count: inner.consecutive_failures,
        }
    }

    /// Seconds since the last recorded failure, if any.
    pub fn seconds_since_last_failure(&self) -> Option<u64> {
        self.lock().last_failure.map(|at| at.elapsed().as_secs())
    }

    /// Decide whether a call may proceed. Flips Open → Half-Open once the
    /// cooldown has elapsed; the admitted call becomes the first trial.
    pub fn try_acquire(self: &Arc<Self>) -> Result<CallPermit, ResilienceError> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(self.permit(false)),
            CircuitState::Open => {
                let cooldown = Duration::from_millis(self.settings.open_duration_ms);
                if inner.last_state_change.elapsed() >= cooldown {
                    inner.state = CircuitState::HalfOpen;
                    inner.last_state_change = Instant::now();
                    inner.half_open_successes = 0;
                    inner.half_open_in_flight = 1;
                    tracing::info!(
                        service = %self.service,
                        trials = self.settings.half_open_trials,
                        "Circuit breaker half-open, probing recovery"
                    );
                    Ok(self.permit(true))
                } else {
                    Err(ResilienceError::CircuitOpen {
                        service: self.service.clone(),
                    })
                }
            }
            CircuitState::HalfOpen => {
                let admitted = inner.half_open_in_flight + inner.half_open_successes;
                if admitted < self.settings.half_open_trials {
                    inner.half_open_in_flight += 1;
                    Ok(self.permit(true))
                } else {
                    // Trial quota exhausted; reject exactly as if Open.
                    Err(ResilienceError::CircuitOpen {
                        service: self.service.clone(),
                    })
                }
            }
        }
    }

    /// Record a successful call. Returns the transition if one occurred.
    pub fn on_success(&self, mut permit: CallPermit) -> Option<Transition> {
        permit.settled = true;
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
                None
            }
            CircuitState::HalfOpen => {
                if permit.half_open_trial {
                    inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
                }
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.settings.half_open_trials {
                    inner.state = CircuitState::Closed;
                    inner.last_state_change = Instant::now();
                    inner.consecutive_failures = 0;
                    inner.half_open_successes = 0;
                    inner.half_open_in_flight = 0;
                    Some(Transition {
                        from: CircuitState::HalfOpen,
                        to: CircuitState::Closed,
                    })
                } else {
                    None
                }
            }
            // A trial completed after another trial's failure reopened the
            // circuit; its bookkeeping was already reset.
            CircuitState::Open => None,
        }
    }

    /// Record a failed call. Returns the transition if one occurred.
    pub fn on_failure(&self, mut permit: CallPermit) -> Option<Transition> {
        permit.settled = true;
        let mut inner = self.lock();
        inner.last_failure = Some(Instant::now());
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.settings.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.last_state_change = Instant::now();
                    inner.half_open_successes = 0;
                    inner.half_open_in_flight = 0;
                    Some(Transition {
                        from: CircuitState::Closed,
                        to: CircuitState::Open,
                    })
                } else {
                    None
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.last_state_change = Instant::now();
                inner.consecutive_failures = 0;
                inner.half_open_successes = 0;
                inner.half_open_in_flight = 0;
                Some(Transition {
                    from: CircuitState::HalfOpen,
                    to: CircuitState::Open,
                })
            }
            CircuitState::Open => None,
        }
    }

    /// Force the breaker back to Closed with clean counters.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.half_open_successes = 0;
        inner.half_open_in_flight = 0;
        inner.last_state_change = Instant::now();
    }

    fn abandon_trial(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
    }

    fn permit(self: &Arc<Self>, half_open_trial: bool) -> CallPermit {
        CallPermit {
            breaker: self.clone(),
            half_open_trial,
            settled: false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("circuit breaker mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(threshold: u32, cooldown_ms: u64, trials: u32) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: threshold,
            open_duration_ms: cooldown_ms,
            half_open_trials: trials,
        }
    }

    fn breaker(threshold: u32, cooldown_ms: u64, trials: u32) -> Arc<CircuitBreaker> {
        Arc::new(CircuitBreaker::new(
            "test",
            settings(threshold, cooldown_ms, trials),
        ))
    }

    fn fail_once(breaker: &Arc<CircuitBreaker>) -> Option<Transition> {
        let permit = breaker.try_acquire().unwrap();
        breaker.on_failure(permit)
    }

    #[test]
    fn trips_only_at_threshold() {
        let breaker = breaker(3, 1_000, 1);
        assert!(fail_once(&breaker).is_none());
        assert!(fail_once(&breaker).is_none());
        assert_eq!(breaker.state(), CircuitState::Closed);

        let transition = fail_once(&breaker).unwrap();
        assert_eq!(transition.to, CircuitState::Open);
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn open_rejects_without_acquire() {
        let breaker = breaker(1, 60_000, 1);
        fail_once(&breaker);
        let err = breaker.try_acquire().unwrap_err();
        assert!(err.is_circuit_open());
    }

    #[test]
    fn success_resets_failure_streak() {
        let breaker = breaker(3, 1_000, 1);
        fail_once(&breaker);
        fail_once(&breaker);
        let permit = breaker.try_acquire().unwrap();
        breaker.on_success(permit);
        // Two more failures do not reach the threshold again.
        fail_once(&breaker);
        fail_once(&breaker);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_after_cooldown_then_closes() {
        let breaker = breaker(1, 0, 2);
        fail_once(&breaker);
        assert_eq!(breaker.state(), CircuitState::Open);

        let first = breaker.try_acquire().unwrap();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.on_success(first).is_none());

        let second = breaker.try_acquire().unwrap();
        let transition = breaker.on_success(second).unwrap();
        assert_eq!(transition.to, CircuitState::Closed);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens() {
        let breaker = breaker(1, 0, 3);
        fail_once(&breaker);
        let trial = breaker.try_acquire().unwrap();
        let transition = breaker.on_failure(trial).unwrap();
        assert_eq!(transition.from, CircuitState::HalfOpen);
        assert_eq!(transition.to, CircuitState::Open);
    }

    #[test]
    fn half_open_admission_is_bounded() {
        let breaker = breaker(1, 0, 2);
        fail_once(&breaker);

        let first = breaker.try_acquire().unwrap();
        let second = breaker.try_acquire().unwrap();
        // Quota of two is in flight; a third concurrent call is rejected.
        assert!(breaker.try_acquire().unwrap_err().is_circuit_open());

        breaker.on_success(first);
        // One success plus one in flight still occupies the full quota.
        assert!(breaker.try_acquire().unwrap_err().is_circuit_open());
        drop(second);
    }

    #[test]
    fn dropped_permit_releases_trial_slot() {
        let breaker = breaker(1, 0, 1);
        fail_once(&breaker);
        let trial = breaker.try_acquire().unwrap();
        drop(trial);
        assert!(breaker.try_acquire().is_ok());
    }

    #[test]
    fn reset_restores_closed() {
        let breaker = breaker(1, 60_000, 1);
        fail_once(&breaker);
        breaker.reset();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.status().failure_count, 0);
    }
}
