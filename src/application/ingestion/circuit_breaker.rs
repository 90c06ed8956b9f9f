//! Circuit breaker guarding calls into the durable store.
//!
//! State machine:
//!
//! - **Closed** → **Open**: the failure counter reaches `failure_threshold`.
//!   Successes in Closed decrement the counter instead of resetting it, so an
//!   isolated failure does not linger and a steady trickle of failures still trips.
//! - **Open** → **HalfOpen**: `reset_timeout` has elapsed since the last
//!   failure; the caller that observes this becomes the single probe.
//! - **HalfOpen** → **Closed** on probe success, → **Open** on probe failure.
//!
//! Admission and every transition happen under one mutex. The lock is never
//! held across the wrapped operation.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::clock::Clock;
use crate::infrastructure::telemetry;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failure count at which the circuit opens.
    pub failure_threshold: u32,
    /// Cooldown after the last failure before a probe is allowed.
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(10),
        }
    }
}

/// Error returned by [`CircuitBreaker::call`].
#[derive(Debug, thiserror::Error)]
pub enum BreakerError<E> {
    /// The circuit is open; the operation was not invoked.
    #[error("circuit breaker is open")]
    Open,

    /// The operation ran and failed.
    #[error("{0}")]
    Inner(E),
}

struct BreakerInner {
    state: CircuitState,
    failures: u32,
    last_failure: Option<DateTime<Utc>>,
    /// Set while a HalfOpen probe is in flight.
    probe_started: Option<DateTime<Utc>>,
}

/// Thread-safe circuit breaker around any async fallible operation.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        let breaker = Self {
            name: name.into(),
            config,
            clock,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failures: 0,
                last_failure: None,
                probe_started: None,
            }),
        };
        telemetry::record_breaker_state(&breaker.name, CircuitState::Closed);
        breaker
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn failures(&self) -> u32 {
        self.inner.lock().failures
    }

    /// Runs `operation` unless the circuit is open.
    ///
    /// # Errors
    ///
    /// Returns [`BreakerError::Open`] without invoking `operation` when the
    /// circuit is open (or a HalfOpen probe is already running), otherwise
    /// [`BreakerError::Inner`] wrapping the operation's own error.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.try_acquire() {
            telemetry::record_breaker_rejection(&self.name);
            return Err(BreakerError::Open);
        }

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                self.record_failure();
                Err(BreakerError::Inner(e))
            }
        }
    }

    /// Decides whether a call may proceed, performing Open → HalfOpen when due.
    fn try_acquire(&self) -> bool {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled_down = inner
                    .last_failure
                    .is_none_or(|at| self.elapsed_since(at, now) >= self.config.reset_timeout);

                if !cooled_down {
                    return false;
                }

                inner.state = CircuitState::HalfOpen;
                inner.probe_started = Some(now);
                info!(breaker = %self.name, "Circuit breaker Open -> HalfOpen, probing");
                telemetry::record_breaker_state(&self.name, CircuitState::HalfOpen);
                true
            }
            CircuitState::HalfOpen => {
                // A probe abandoned mid-flight (its future dropped) would otherwise
                // wedge the breaker, so a stale probe slot can be re-taken.
                let stale = inner
                    .probe_started
                    .is_none_or(|at| self.elapsed_since(at, now) >= self.config.reset_timeout);

                if stale {
                    inner.probe_started = Some(now);
                    debug!(breaker = %self.name, "Previous probe abandoned, admitting a new one");
                }
                stale
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Closed;
                inner.failures = 0;
                inner.probe_started = None;
                info!(breaker = %self.name, "Circuit breaker HalfOpen -> Closed");
                telemetry::record_breaker_state(&self.name, CircuitState::Closed);
            }
            CircuitState::Closed => {
                inner.failures = inner.failures.saturating_sub(1);
            }
            // A call admitted before the circuit opened finished late.
            CircuitState::Open => {}
        }
    }

    fn record_failure(&self) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        inner.failures = inner.failures.saturating_add(1);
        inner.last_failure = Some(now);

        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.failures = inner.failures.max(self.config.failure_threshold);
                inner.probe_started = None;
                warn!(breaker = %self.name, "Circuit breaker probe failed, HalfOpen -> Open");
                telemetry::record_breaker_state(&self.name, CircuitState::Open);
            }
            CircuitState::Closed if inner.failures >= self.config.failure_threshold => {
                inner.state = CircuitState::Open;
                warn!(
                    breaker = %self.name,
                    failures = inner.failures,
                    "Circuit breaker Closed -> Open"
                );
                telemetry::record_breaker_state(&self.name, CircuitState::Open);
            }
            _ => {}
        }
    }

    fn elapsed_since(&self, earlier: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        (now - earlier).to_std().unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn breaker(clock: Arc<ManualClock>) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                failure_threshold: 3,
                reset_timeout: Duration::from_secs(10),
            },
            clock,
        )
    }

    async fn fail(cb: &CircuitBreaker) -> Result<(), BreakerError<&'static str>> {
        cb.call(|| async { Err::<(), _>("boom") }).await
    }

    async fn succeed(cb: &CircuitBreaker) -> Result<(), BreakerError<&'static str>> {
        cb.call(|| async { Ok::<(), &'static str>(()) }).await
    }

    #[tokio::test]
    async fn test_opens_after_threshold_failures() {
        let cb = breaker(Arc::new(ManualClock::default()));

        for _ in 0..3 {
            assert!(matches!(fail(&cb).await, Err(BreakerError::Inner("boom"))));
        }

        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_open_circuit_rejects_without_invoking() {
        let cb = breaker(Arc::new(ManualClock::default()));
        for _ in 0..3 {
            let _ = fail(&cb).await;
        }

        let invoked = AtomicUsize::new(0);
        let result = cb
            .call(|| async {
                invoked.fetch_add(1, Ordering::SeqCst);
                Ok::<(), &'static str>(())
            })
            .await;

        assert!(matches!(result, Err(BreakerError::Open)));
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_decrements_failures_in_closed() {
        let cb = breaker(Arc::new(ManualClock::default()));

        let _ = fail(&cb).await;
        let _ = fail(&cb).await;
        assert_eq!(cb.failures(), 2);

        succeed(&cb).await.unwrap();
        assert_eq!(cb.failures(), 1);

        succeed(&cb).await.unwrap();
        succeed(&cb).await.unwrap();
        assert_eq!(cb.failures(), 0);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_interleaved_success_delays_opening() {
        let cb = breaker(Arc::new(ManualClock::default()));

        let _ = fail(&cb).await;
        let _ = fail(&cb).await;
        succeed(&cb).await.unwrap();
        let _ = fail(&cb).await;

        assert_eq!(cb.state(), CircuitState::Closed);

        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_probe_success_closes_circuit() {
        let clock = Arc::new(ManualClock::default());
        let cb = breaker(clock.clone());
        for _ in 0..3 {
            let _ = fail(&cb).await;
        }

        clock.advance(Duration::from_secs(9));
        assert!(matches!(succeed(&cb).await, Err(BreakerError::Open)));

        clock.advance(Duration::from_secs(1));
        succeed(&cb).await.unwrap();

        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failures(), 0);
    }

    #[tokio::test]
    async fn test_probe_failure_reopens_circuit() {
        let clock = Arc::new(ManualClock::default());
        let cb = breaker(clock.clone());
        for _ in 0..3 {
            let _ = fail(&cb).await;
        }

        clock.advance(Duration::from_secs(10));
        assert!(matches!(fail(&cb).await, Err(BreakerError::Inner(_))));

        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.failures() >= 3);

        // Cooldown restarts from the failed probe.
        clock.advance(Duration::from_secs(5));
        assert!(matches!(succeed(&cb).await, Err(BreakerError::Open)));
    }

    #[tokio::test]
    async fn test_half_open_admits_single_probe() {
        let clock = Arc::new(ManualClock::default());
        let cb = Arc::new(breaker(clock.clone()));
        for _ in 0..3 {
            let _ = fail(&cb).await;
        }
        clock.advance(Duration::from_secs(10));

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();

        let probe_cb = cb.clone();
        let probe = tokio::spawn(async move {
            probe_cb
                .call(|| async move {
                    let _ = started_tx.send(());
                    let _ = release_rx.await;
                    Ok::<(), &'static str>(())
                })
                .await
        });

        started_rx.await.unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(matches!(succeed(&cb).await, Err(BreakerError::Open)));

        release_tx.send(()).unwrap();
        probe.await.unwrap().unwrap();

        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_concurrent_callers_see_consistent_state() {
        let clock = Arc::new(ManualClock::default());
        let cb = Arc::new(breaker(clock));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let cb = cb.clone();
            handles.push(tokio::spawn(async move {
                cb.call(|| async { Err::<(), _>("down") }).await
            }));
        }

        let mut invoked = 0;
        for handle in handles {
            if let Err(BreakerError::Inner(_)) = handle.await.unwrap() {
                invoked += 1;
            }
        }

        assert!(invoked >= 3);
        assert_eq!(cb.state(), CircuitState::Open);
    }
}
