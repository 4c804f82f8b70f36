//! # Circuit Breaker Module
//!
//! This module implements the circuit breaker pattern for product lookups.
//! When the food database keeps failing, lookups fail fast for a while
//! instead of making every user wait for a timeout.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::LookupConfig;

/// Circuit breaker for product lookup requests
///
/// ## State Machine
///
/// ```text
/// CLOSED ────failures ≥ threshold────► OPEN
///    ▲                                   │
///    │                              reset timeout
///    │                                   ▼
///    └──────────success────────────  HALF-OPEN
///                                        │
///                                        └──failure──► OPEN
/// ```
///
/// - **CLOSED → OPEN**: consecutive failure count reaches `threshold`
/// - **OPEN → HALF-OPEN**: `reset_timeout` elapsed since the last failure;
///   the counter is reset and the next request goes through
/// - **HALF-OPEN → CLOSED**: on success
/// - **HALF-OPEN → OPEN**: on failure, once the counter reaches the threshold again
///
/// Only transport failures count. A "product not found" answer is a
/// successful exchange with the database.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    threshold: u32,
    reset_timeout: Duration,
}

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    ///
    /// # Examples
    ///
    /// ```rust
    /// use is_it_safe::circuit_breaker::CircuitBreaker;
    /// use std::time::Duration;
    ///
    /// let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
    /// assert!(!breaker.is_open());
    /// ```
    pub fn new(threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            threshold: threshold.max(1),
            reset_timeout,
        }
    }

    pub fn from_config(config: &LookupConfig) -> Self {
        Self::new(
            config.circuit_breaker_threshold,
            Duration::from_secs(config.circuit_breaker_reset_secs),
        )
    }

    /// Check if circuit breaker is open (blocking requests)
    ///
    /// Resets the counters once the reset timeout has elapsed, which lets the
    /// next request test whether the service recovered.
    pub fn is_open(&self) -> bool {
        let mut state = self.state.lock();

        if state.failure_count >= self.threshold {
            if let Some(last_time) = state.last_failure_time {
                if last_time.elapsed() < self.reset_timeout {
                    return true;
                }
                *state = BreakerState::default();
            }
        }
        false
    }

    /// Record a failure to increment the failure counter
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());
    }

    /// Record a success to reset the failure counter
    pub fn record_success(&self) {
        *self.state.lock() = BreakerState::default();
    }

    /// Current consecutive failure count
    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        breaker.record_failure();
        assert!(!breaker.is_open());
        breaker.record_failure();
        assert!(breaker.is_open());
    }

    #[test]
    fn test_success_resets() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 1);
    }

    #[test]
    fn test_half_open_after_reset_timeout() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(20));
        breaker.record_failure();
        assert!(breaker.is_open());

        thread::sleep(Duration::from_millis(40));
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);

        breaker.record_failure();
        assert!(breaker.is_open());
    }

    #[test]
    fn test_zero_threshold_is_clamped() {
        let breaker = CircuitBreaker::new(0, Duration::from_secs(60));
        assert!(!breaker.is_open());
        breaker.record_failure();
        assert!(breaker.is_open());
    }
}
