//! Circuit breaker guarding outbound registry fetches.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::TrustError;

const FAILURE_THRESHOLD: usize = 5;
const FAILURE_WINDOW: Duration = Duration::from_secs(30);
const OPEN_DURATION: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

struct BreakerInner {
    state: BreakerState,
    failures: VecDeque<Instant>,
    opened_at: Option<Instant>,
}

/// Opens after 5 failures within 30 seconds; stays open 30 seconds, then
/// lets one probe call through (half-open). A successful probe closes the
/// breaker, a failed one re-opens it.
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    failure_threshold: usize,
    failure_window: Duration,
    open_duration: Duration,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::with_settings(FAILURE_THRESHOLD, FAILURE_WINDOW, OPEN_DURATION)
    }

    pub fn with_settings(
        failure_threshold: usize,
        failure_window: Duration,
        open_duration: Duration,
    ) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failures: VecDeque::new(),
                opened_at: None,
            }),
            failure_threshold,
            failure_window,
            open_duration,
        }
    }

    /// Gate a call. Fails fast while open; transitions to half-open once
    /// the open interval has elapsed.
    pub fn try_acquire(&self) -> Result<(), TrustError> {
        let mut inner = self.inner.lock().expect("breaker lock");
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => Ok(()),
            BreakerState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.open_duration {
                    inner.state = BreakerState::HalfOpen;
                    tracing::info!("circuit breaker half-open, allowing probe");
                    Ok(())
                } else {
                    Err(TrustError::CircuitOpen)
                }
            }
        }
    }

    /// Record a successful call; closes the breaker and clears history.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("breaker lock");
        if inner.state != BreakerState::Closed {
            tracing::info!("circuit breaker closed");
        }
        inner.state = BreakerState::Closed;
        inner.failures.clear();
        inner.opened_at = None;
    }

    /// Record a failed call; may trip the breaker.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("breaker lock");
        let now = Instant::now();

        if inner.state == BreakerState::HalfOpen {
            inner.state = BreakerState::Open;
            inner.opened_at = Some(now);
            tracing::warn!("probe failed, circuit breaker re-opened");
            return;
        }

        inner.failures.push_back(now);
        let window = self.failure_window;
        while let Some(front) = inner.failures.front() {
            if front.elapsed() > window {
                inner.failures.pop_front();
            } else {
                break;
            }
        }

        if inner.failures.len() >= self.failure_threshold {
            inner.state = BreakerState::Open;
            inner.opened_at = Some(now);
            tracing::warn!(
                failures = inner.failures.len(),
                "circuit breaker opened"
            );
        }
    }

    /// Current state (primarily for tests and diagnostics).
    pub fn state(&self) -> BreakerState {
        self.inner.lock().expect("breaker lock").state
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_closed() {
        let breaker = CircuitBreaker::new();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert!(breaker.try_acquire().is_ok());
    }

    #[test]
    fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::new();
        for _ in 0..4 {
            breaker.record_failure();
            assert_eq!(breaker.state(), BreakerState::Closed);
        }
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(matches!(breaker.try_acquire(), Err(TrustError::CircuitOpen)));
    }

    #[test]
    fn test_success_resets_failure_count() {
        let breaker = CircuitBreaker::new();
        for _ in 0..4 {
            breaker.record_failure();
        }
        breaker.record_success();
        for _ in 0..4 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn test_half_open_after_interval() {
        let breaker =
            CircuitBreaker::with_settings(1, Duration::from_secs(30), Duration::from_millis(0));
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);

        // Open interval already elapsed: the next acquire is the probe.
        assert!(breaker.try_acquire().is_ok());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
    }

    #[test]
    fn test_half_open_success_closes() {
        let breaker =
            CircuitBreaker::with_settings(1, Duration::from_secs(30), Duration::from_millis(0));
        breaker.record_failure();
        breaker.try_acquire().unwrap();
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let breaker =
            CircuitBreaker::with_settings(1, Duration::from_secs(30), Duration::from_millis(0));
        breaker.record_failure();
        breaker.try_acquire().unwrap();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn test_stale_failures_fall_out_of_window() {
        let breaker =
            CircuitBreaker::with_settings(3, Duration::from_millis(1), Duration::from_secs(30));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(5));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(5));
        breaker.record_failure();
        // Each failure aged out before the next arrived; never trips.
        assert_eq!(breaker.state(), BreakerState::Closed);
    }
}
