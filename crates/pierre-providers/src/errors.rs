// ABOUTME: Error type for pose-estimation model calls
// ABOUTME: Classifies failures as retryable or not and maps them onto unified error codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pierre_core::errors::AppError;
use thiserror::Error;

/// Failures from a pose-estimation model
#[derive(Debug, Error)]
pub enum PoseEstimatorError {
    /// Image payload is not valid base64 or is empty
    #[error("Invalid image payload: {0}")]
    InvalidImage(String),

    /// HTTP request could not be completed
    #[error("Pose model request to {estimator} failed: {source}")]
    Request {
        /// Estimator name
        estimator: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// Model answered with a non-success status
    #[error("Pose model {estimator} returned HTTP {status}: {body}")]
    Status {
        /// Estimator name
        estimator: String,
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Model response did not match the landmark schema
    #[error("Pose model {estimator} returned an unreadable response: {message}")]
    InvalidResponse {
        /// Estimator name
        estimator: String,
        /// Parse failure
        message: String,
    },

    /// Circuit breaker is open
    #[error("Pose model {estimator} unavailable, retry after {retry_after_secs}s")]
    CircuitOpen {
        /// Estimator name
        estimator: String,
        /// Seconds until a recovery trial call is allowed
        retry_after_secs: u64,
    },

    /// No estimator is configured for raw image frames
    #[error("No pose model is configured; send pre-extracted landmarks instead")]
    NotConfigured,
}

impl PoseEstimatorError {
    /// Whether a retry may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request { source, .. } => source.is_connect() || source.is_timeout(),
            Self::Status { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::InvalidResponse { .. } => true,
            Self::InvalidImage(_) | Self::CircuitOpen { .. } | Self::NotConfigured => false,
        }
    }
}

/// Result alias for estimator calls
pub type PoseResult<T> = Result<T, PoseEstimatorError>;

impl From<PoseEstimatorError> for AppError {
    fn from(error: PoseEstimatorError) -> Self {
        match error {
            PoseEstimatorError::InvalidImage(message) => Self::input(message),
            other => Self::upstream_model(other.to_string()),
        }
    }
}
