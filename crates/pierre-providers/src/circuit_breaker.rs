// ABOUTME: Circuit breaker guarding calls to an external pose-estimation model
// ABOUTME: Fails fast while the model is down so analysis ticks are not stalled by timeouts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::errors::PoseEstimatorError;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through
    Closed,
    /// Calls fail immediately
    Open,
    /// A single trial call is in flight
    HalfOpen,
}

impl CircuitState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Closed,
            1 => Self::Open,
            _ => Self::HalfOpen,
        }
    }

    const fn to_u8(self) -> u8 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// Time the circuit stays open before a trial call is allowed
    pub recovery_timeout: Duration,
    /// Trial successes needed to close the circuit
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(10),
            success_threshold: 1,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new circuit breaker configuration
    #[must_use]
    pub const fn new(
        failure_threshold: u32,
        recovery_timeout: Duration,
        success_threshold: u32,
    ) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            success_threshold,
        }
    }

    /// Trip quickly; suited to a fallback model that should not absorb a dead primary's load
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            failure_threshold: 2,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

/// Lock-free circuit breaker for pose-model calls
///
/// # States
///
/// - **Closed**: calls pass through and consecutive failures are counted
/// - **Open**: after `failure_threshold` failures every call fails immediately
/// - **Half-Open**: after `recovery_timeout` one trial call is let through
pub struct CircuitBreaker {
    estimator: String,
    state: AtomicU8,
    failure_count: AtomicU32,
    success_count: AtomicU32,
    /// Millis since `started` when the circuit last opened
    opened_at_ms: AtomicU64,
    config: CircuitBreakerConfig,
    started: Instant,
}

impl CircuitBreaker {
    /// Create a circuit breaker with default configuration
    #[must_use]
    pub fn new(estimator: &str) -> Self {
        Self::with_config(estimator, CircuitBreakerConfig::default())
    }

    /// Create a circuit breaker with custom configuration
    #[must_use]
    pub fn with_config(estimator: &str, config: CircuitBreakerConfig) -> Self {
        Self {
            estimator: estimator.to_owned(),
            state: AtomicU8::new(CircuitState::Closed.to_u8()),
            failure_count: AtomicU32::new(0),
            success_count: AtomicU32::new(0),
            opened_at_ms: AtomicU64::new(0),
            config,
            started: Instant::now(),
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Consecutive failures in the closed state
    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::SeqCst)
    }

    /// Whether a call may proceed now
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => self.try_half_open(),
            CircuitState::HalfOpen => false,
        }
    }

    fn try_half_open(&self) -> bool {
        if self.millis_since_open() < self.recovery_ms() {
            return false;
        }
        let opened = self
            .state
            .compare_exchange(
                CircuitState::Open.to_u8(),
                CircuitState::HalfOpen.to_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if opened {
            info!(estimator = %self.estimator, "Circuit breaker half-open, probing pose model");
        }
        opened
    }

    #[allow(clippy::cast_possible_truncation)] // Safe: process uptime in millis fits in u64
    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    #[allow(clippy::cast_possible_truncation)] // Safe: recovery timeouts are seconds
    const fn recovery_ms(&self) -> u64 {
        self.config.recovery_timeout.as_millis() as u64
    }

    fn millis_since_open(&self) -> u64 {
        self.elapsed_ms()
            .saturating_sub(self.opened_at_ms.load(Ordering::SeqCst))
    }

    fn open(&self) {
        self.state.store(CircuitState::Open.to_u8(), Ordering::SeqCst);
        self.opened_at_ms.store(self.elapsed_ms(), Ordering::SeqCst);
        self.success_count.store(0, Ordering::SeqCst);
    }

    /// Record a successful call
    pub fn record_success(&self) {
        match self.state() {
            CircuitState::Closed => self.failure_count.store(0, Ordering::SeqCst),
            CircuitState::HalfOpen => {
                let successes = self.success_count.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.config.success_threshold {
                    self.reset_counters();
                    self.state
                        .store(CircuitState::Closed.to_u8(), Ordering::SeqCst);
                    info!(estimator = %self.estimator, "Circuit breaker closed, pose model recovered");
                } else {
                    // Allow the next trial call through
                    self.state.store(CircuitState::Open.to_u8(), Ordering::SeqCst);
                    self.opened_at_ms.store(0, Ordering::SeqCst);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        match self.state() {
            CircuitState::Closed => {
                let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= self.config.failure_threshold {
                    self.open();
                    warn!(
                        estimator = %self.estimator,
                        failures,
                        recovery_timeout_ms = self.recovery_ms(),
                        "Circuit breaker opened, pose model failing"
                    );
                }
            }
            CircuitState::HalfOpen => {
                self.open();
                warn!(estimator = %self.estimator, "Circuit breaker re-opened, trial call failed");
            }
            CircuitState::Open => {
                self.opened_at_ms.store(self.elapsed_ms(), Ordering::SeqCst);
            }
        }
    }

    /// Run a pose-model call under circuit breaker protection
    ///
    /// Only retryable failures count against the circuit.
    ///
    /// # Errors
    ///
    /// Returns `CircuitOpen` without running `operation` while the circuit is
    /// open, otherwise the operation's own error
    pub async fn call<F, T>(&self, operation: F) -> Result<T, PoseEstimatorError>
    where
        F: Future<Output = Result<T, PoseEstimatorError>>,
    {
        if !self.is_allowed() {
            return Err(PoseEstimatorError::CircuitOpen {
                estimator: self.estimator.clone(),
                retry_after_secs: self.seconds_until_trial(),
            });
        }

        match operation.await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(error) => {
                if error.is_retryable() {
                    self.record_failure();
                } else if self.state() == CircuitState::HalfOpen {
                    // A non-retryable error still proves the model is reachable
                    self.record_success();
                }
                Err(error)
            }
        }
    }

    fn seconds_until_trial(&self) -> u64 {
        self.recovery_ms()
            .saturating_sub(self.millis_since_open())
            .saturating_add(999)
            / 1000
    }

    fn reset_counters(&self) {
        self.failure_count.store(0, Ordering::SeqCst);
        self.success_count.store(0, Ordering::SeqCst);
    }

    /// Force the circuit closed
    pub fn reset(&self) {
        self.reset_counters();
        self.state
            .store(CircuitState::Closed.to_u8(), Ordering::SeqCst);
        info!(estimator = %self.estimator, "Circuit breaker manually reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing() -> PoseEstimatorError {
        PoseEstimatorError::Status {
            estimator: "test".to_owned(),
            status: 503,
            body: String::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_threshold_and_recovers() {
        let breaker = CircuitBreaker::with_config(
            "test",
            CircuitBreakerConfig::new(2, Duration::from_secs(5), 1),
        );

        for _ in 0..2 {
            let result: Result<(), _> = breaker.call(async { Err(failing()) }).await;
            assert!(result.is_err());
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        let blocked: Result<(), _> = breaker.call(async { Ok(()) }).await;
        assert!(matches!(blocked, Err(PoseEstimatorError::CircuitOpen { .. })));

        tokio::time::advance(Duration::from_secs(6)).await;
        let trial: Result<(), _> = breaker.call(async { Ok(()) }).await;
        assert!(trial.is_ok());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_do_not_trip() {
        let breaker = CircuitBreaker::with_config(
            "test",
            CircuitBreakerConfig::new(1, Duration::from_secs(5), 1),
        );
        let result: Result<(), _> = breaker
            .call(async { Err(PoseEstimatorError::InvalidImage("empty".to_owned())) })
            .await;
        assert!(result.is_err());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
