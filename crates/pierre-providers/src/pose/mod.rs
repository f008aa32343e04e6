// ABOUTME: Pose-estimation model abstraction turning raw images into landmark lists
// ABOUTME: Defines the PoseEstimator trait and a primary/fallback chain used by streaming sessions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Pose Estimation
//!
//! The pose model is a black box: it receives a base64 image and returns up
//! to 33 landmarks. Implementations must be cheap to share behind an `Arc`.

use async_trait::async_trait;
use pierre_core::models::LandmarkInput;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::errors::{PoseEstimatorError, PoseResult};

/// HTTP implementation
pub mod http;

pub use http::HttpPoseEstimator;

/// One image submitted for pose estimation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseRequest {
    /// Frame sequence, echoed for tracing
    pub sequence: u64,
    /// Capture timestamp
    pub timestamp_ms: u64,
    /// Base64-encoded image
    pub image: String,
}

/// External pose-estimation model
#[async_trait]
pub trait PoseEstimator: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Extract landmarks from an image
    ///
    /// # Errors
    ///
    /// Returns an error if the image is invalid or the model call fails
    async fn estimate(&self, request: &PoseRequest) -> PoseResult<Vec<LandmarkInput>>;
}

/// Primary estimator with a single retry
///
/// A failed call is retried once, on the fallback estimator when one is
/// configured and on the primary otherwise. Invalid images are not retried.
#[derive(Clone)]
pub struct FallbackPoseEstimator {
    primary: Arc<dyn PoseEstimator>,
    fallback: Option<Arc<dyn PoseEstimator>>,
}

impl FallbackPoseEstimator {
    /// Wrap a primary estimator and optional fallback
    #[must_use]
    pub fn new(primary: Arc<dyn PoseEstimator>, fallback: Option<Arc<dyn PoseEstimator>>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl PoseEstimator for FallbackPoseEstimator {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn estimate(&self, request: &PoseRequest) -> PoseResult<Vec<LandmarkInput>> {
        match self.primary.estimate(request).await {
            Ok(landmarks) => Ok(landmarks),
            Err(error @ PoseEstimatorError::InvalidImage(_)) => Err(error),
            Err(error) => {
                let retry = self.fallback.as_ref().unwrap_or(&self.primary);
                warn!(
                    estimator = %self.primary.name(),
                    retry_with = %retry.name(),
                    sequence = request.sequence,
                    error = %error,
                    "Pose estimation failed, retrying once"
                );
                retry.estimate(request).await
            }
        }
    }
}

/// Estimator used when no pose model is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredPoseEstimator;

#[async_trait]
impl PoseEstimator for UnconfiguredPoseEstimator {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn estimate(&self, _request: &PoseRequest) -> PoseResult<Vec<LandmarkInput>> {
        Err(PoseEstimatorError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Scripted {
        name: &'static str,
        fail: bool,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl PoseEstimator for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn estimate(&self, _request: &PoseRequest) -> PoseResult<Vec<LandmarkInput>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(PoseEstimatorError::Status {
                    estimator: self.name.to_owned(),
                    status: 503,
                    body: String::new(),
                })
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn request() -> PoseRequest {
        PoseRequest {
            sequence: 1,
            timestamp_ms: 0,
            image: "aGVsbG8=".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_fallback_used_once() {
        let primary = Scripted::new("primary", true);
        let fallback = Scripted::new("fallback", false);
        let chain = FallbackPoseEstimator::new(primary.clone(), Some(fallback.clone()));
        assert!(chain.estimate(&request()).await.is_ok());
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_primary_retried_without_fallback() {
        let primary = Scripted::new("primary", true);
        let chain = FallbackPoseEstimator::new(primary.clone(), None);
        assert!(chain.estimate(&request()).await.is_err());
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
    }
}
