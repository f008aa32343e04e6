// ABOUTME: Unified error handling with machine-readable codes for the form analysis pipeline
// ABOUTME: Defines ErrorCode, AppError and the JSON error response shared by REST and streaming
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Every failure that reaches a consumer (WebSocket `error` message or REST
//! response) is expressed as an [`AppError`] carrying an [`ErrorCode`].
//! Codes serialize as `SCREAMING_SNAKE_CASE` so clients can branch on them.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the form analysis server
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication
    /// No token supplied
    AuthRequired,
    /// Token failed validation
    AuthInvalid,

    // Input
    /// Malformed or incomplete landmark frame
    InputError,
    /// Client message could not be parsed or is not valid in the current state
    InvalidMessage,
    /// Requested exercise has no profile in the ideal-range table
    UnsupportedExercise,
    /// Too few visible landmarks to evaluate form
    LowConfidence,

    // Sessions
    /// Session id is unknown
    SessionNotFound,
    /// Session was discarded after exhausting reconnect attempts
    SessionExpired,

    // External services
    /// Streaming transport failed
    TransportError,
    /// External pose-estimation call failed
    UpstreamModelError,

    // Configuration
    /// Configuration is invalid
    ConfigInvalid,

    // Internal
    /// Unexpected internal failure
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InputError | Self::InvalidMessage | Self::UnsupportedExercise => 400,
            Self::AuthRequired | Self::AuthInvalid => 401,
            Self::SessionNotFound => 404,
            Self::SessionExpired => 410,
            Self::LowConfidence => 422,
            Self::TransportError | Self::UpstreamModelError => 502,
            Self::ConfigInvalid | Self::InternalError => 500,
        }
    }

    /// Whether the session can keep running after this error
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        matches!(
            self,
            Self::InputError
                | Self::InvalidMessage
                | Self::LowConfidence
                | Self::UpstreamModelError
                | Self::UnsupportedExercise
        )
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AuthRequired => "Authentication is required to start an analysis session",
            Self::AuthInvalid => "The provided authentication token is invalid",
            Self::InputError => "The landmark frame is malformed or incomplete",
            Self::InvalidMessage => "The message could not be understood",
            Self::UnsupportedExercise => "The exercise type is not supported",
            Self::LowConfidence => "Not enough of the body is visible to analyze form",
            Self::SessionNotFound => "The analysis session was not found",
            Self::SessionExpired => "The analysis session expired",
            Self::TransportError => "The streaming connection failed",
            Self::UpstreamModelError => "The pose estimation service failed",
            Self::ConfigInvalid => "Configuration is invalid",
            Self::InternalError => "An internal server error occurred",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Serialized form doubles as the wire code
        let code = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_else(|| format!("{self:?}"));
        f.write_str(&code)
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional structured details for the consumer
    pub details: Option<serde_json::Value>,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Attach structured details
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Authentication required
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "Authentication token required")
    }

    /// Invalid authentication
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Malformed input
    pub fn input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InputError, message)
    }

    /// Unparseable or out-of-order protocol message
    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidMessage, message)
    }

    /// Too few visible landmarks
    pub fn low_confidence(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::LowConfidence, message)
    }

    /// Unknown exercise
    pub fn unsupported_exercise(exercise: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::UnsupportedExercise,
            format!("No ideal-range profile for exercise '{exercise}'"),
        )
    }

    /// Session id not found
    pub fn session_not_found(session_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::SessionNotFound,
            format!("Session {session_id} not found"),
        )
    }

    /// Session discarded
    pub fn session_expired(session_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::SessionExpired,
            format!("Session {session_id} expired after exhausting reconnect attempts"),
        )
    }

    /// Transport failure
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TransportError, message)
    }

    /// Pose-estimation upstream failure
    pub fn upstream_model(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamModelError, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalid, message)
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error body
    pub error: ErrorResponseDetails,
}

/// Error body carried by [`ErrorResponse`]
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    /// Machine-readable code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional structured details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message: error.message,
                details: error.details,
            },
        }
    }
}

#[cfg(feature = "http-response")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = http::StatusCode::from_u16(self.http_status())
            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(code = %self.code, message = %self.message, "Request failed");
        } else {
            tracing::debug!(code = %self.code, message = %self.message, "Request rejected");
        }
        (status, axum::Json(ErrorResponse::from(self))).into_response()
    }
}
