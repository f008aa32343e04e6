// ABOUTME: HTTP pose-estimation client posting base64 images to a model endpoint
// ABOUTME: Validates payloads locally and guards the endpoint with a circuit breaker
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pierre_core::models::LandmarkInput;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, instrument};

use super::{PoseEstimator, PoseRequest};
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::errors::{PoseEstimatorError, PoseResult};

/// Longest response body kept in error messages
const MAX_ERROR_BODY: usize = 256;

/// Accepted response shapes: `{"landmarks": [...]}` or a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PoseModelResponse {
    Wrapped { landmarks: Vec<LandmarkInput> },
    Bare(Vec<LandmarkInput>),
}

impl PoseModelResponse {
    fn into_landmarks(self) -> Vec<LandmarkInput> {
        match self {
            Self::Wrapped { landmarks } | Self::Bare(landmarks) => landmarks,
        }
    }
}

/// Pose model reached over HTTP
pub struct HttpPoseEstimator {
    name: String,
    url: String,
    client: Client,
    circuit_breaker: CircuitBreaker,
}

impl HttpPoseEstimator {
    /// Create a client for `url`
    #[must_use]
    pub fn new(name: &str, url: &str, client: Client, breaker: CircuitBreakerConfig) -> Self {
        Self {
            name: name.to_owned(),
            url: url.to_owned(),
            client,
            circuit_breaker: CircuitBreaker::with_config(name, breaker),
        }
    }

    /// Circuit breaker guarding this endpoint
    #[must_use]
    pub const fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    fn validate_image(image: &str) -> PoseResult<()> {
        if image.is_empty() {
            return Err(PoseEstimatorError::InvalidImage("image is empty".to_owned()));
        }
        STANDARD
            .decode(image)
            .map(|_| ())
            .map_err(|e| PoseEstimatorError::InvalidImage(format!("image is not base64: {e}")))
    }

    async fn post(&self, request: &PoseRequest) -> PoseResult<Vec<LandmarkInput>> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|source| PoseEstimatorError::Request {
                estimator: self.name.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| PoseEstimatorError::Request {
                estimator: self.name.clone(),
                source,
            })?;

        if !status.is_success() {
            error!(estimator = %self.name, status = %status, "Pose model error");
            return Err(PoseEstimatorError::Status {
                estimator: self.name.clone(),
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let parsed: PoseModelResponse =
            serde_json::from_str(&body).map_err(|e| PoseEstimatorError::InvalidResponse {
                estimator: self.name.clone(),
                message: e.to_string(),
            })?;
        Ok(parsed.into_landmarks())
    }
}

#[async_trait]
impl PoseEstimator for HttpPoseEstimator {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, request), fields(estimator = %self.name, sequence = request.sequence))]
    async fn estimate(&self, request: &PoseRequest) -> PoseResult<Vec<LandmarkInput>> {
        Self::validate_image(&request.image)?;
        let landmarks = self.circuit_breaker.call(self.post(request)).await?;
        debug!(count = landmarks.len(), "Pose model returned landmarks");
        Ok(landmarks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and return the endpoint URL
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0_u8; 16 * 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/pose")
    }

    fn request(image: &str) -> PoseRequest {
        PoseRequest {
            sequence: 3,
            timestamp_ms: 300,
            image: image.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_parses_wrapped_landmarks() {
        let url = serve_once(
            "200 OK",
            r#"{"landmarks":[{"id":0,"x":0.5,"y":0.1,"z":0.0,"visibility":0.9}]}"#,
        )
        .await;
        let estimator =
            HttpPoseEstimator::new("test", &url, Client::new(), CircuitBreakerConfig::default());
        let landmarks = estimator.estimate(&request("aGVsbG8=")).await.unwrap();
        assert_eq!(landmarks.len(), 1);
        assert_eq!(landmarks[0].id, Some(0));
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let url = serve_once("503 Service Unavailable", "{}").await;
        let estimator =
            HttpPoseEstimator::new("test", &url, Client::new(), CircuitBreakerConfig::default());
        let err = estimator.estimate(&request("aGVsbG8=")).await.unwrap_err();
        assert!(matches!(err, PoseEstimatorError::Status { status: 503, .. }));
        assert!(err.is_retryable());
        assert_eq!(estimator.circuit_breaker().failure_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_base64_rejected_locally() {
        let estimator = HttpPoseEstimator::new(
            "test",
            "http://127.0.0.1:9/unused",
            Client::new(),
            CircuitBreakerConfig::default(),
        );
        let err = estimator.estimate(&request("not base64!")).await.unwrap_err();
        assert!(matches!(err, PoseEstimatorError::InvalidImage(_)));
    }
}
