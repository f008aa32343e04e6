// ABOUTME: Pose-estimation model clients for the Pierre form analysis pipeline
// ABOUTME: Estimator trait, HTTP client, fallback chain, circuit breaker and shared HTTP client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! External model providers.
//!
//! Raw camera frames are turned into landmark lists by an external
//! pose-estimation model. This crate wraps that model behind the
//! [`PoseEstimator`] trait so streaming sessions do not depend on transport.

/// Circuit breaker pattern for model resilience
pub mod circuit_breaker;
/// Estimator error types
pub mod errors;
/// Shared HTTP client for model calls
pub mod http_client;
/// Pose estimator trait and implementations
pub mod pose;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use errors::{PoseEstimatorError, PoseResult};
pub use http_client::{initialize_shared_client, shared_client};
pub use pose::{
    FallbackPoseEstimator, HttpPoseEstimator, PoseEstimator, PoseRequest,
    UnconfiguredPoseEstimator,
};
