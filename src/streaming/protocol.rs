// ABOUTME: JSON message protocol for the streaming form analysis WebSocket
// ABOUTME: Client and server messages tagged by type, plus status and close reasons
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::{AppError, ErrorCode};
use pierre_core::models::{AnalysisResult, CameraSetup, ExerciseType, LandmarkInput, Phase};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent by the client
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a session, or resume one when `session_id` is given
    Start {
        /// JWT, optionally prefixed with `Bearer `
        #[serde(default)]
        token: Option<String>,
        /// Exercise name, parsed leniently
        exercise_type: String,
        /// Session to resume
        #[serde(default)]
        session_id: Option<Uuid>,
    },
    /// Raw camera frame for the pose model
    Frame {
        /// Monotonic frame number
        sequence: u64,
        /// Capture time
        timestamp_ms: u64,
        /// Base64-encoded image
        image: String,
    },
    /// Landmarks already extracted on the client
    Landmarks {
        /// Monotonic frame number
        sequence: u64,
        /// Capture time
        timestamp_ms: u64,
        /// Up to 33 landmarks
        landmarks: Vec<LandmarkInput>,
    },
    /// Calibration update; omitted fields keep their value
    Calibration {
        /// Athlete height for centimetre moment arms
        #[serde(default)]
        reference_height_cm: Option<f64>,
        /// Camera roll in degrees
        #[serde(default)]
        camera_angle_deg: Option<f64>,
    },
    /// Settings update; omitted fields keep their value
    Settings {
        /// Switch exercise, resetting the window and phase
        #[serde(default)]
        exercise_type: Option<String>,
        /// New analysis interval
        #[serde(default)]
        analysis_interval_ms: Option<u64>,
    },
    /// Request camera diagnostics for the latest frame
    CameraCheck,
    /// End the session
    Stop,
    /// Liveness check
    Ping,
}

/// Why a status message was sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusReason {
    /// No frames arrived within the idle timeout
    Idle,
    /// Frames arrived again after an idle period
    Active,
    /// Camera placement passed the setup check
    CameraReady,
    /// Exercise changed; window and phase were reset
    ExerciseChanged,
    /// Calibration was applied
    CalibrationUpdated,
    /// Analysis interval changed
    IntervalChanged,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Client sent `stop`
    Stopped,
    /// No frames arrived within the teardown timeout
    IdleTimeout,
    /// Reconnect attempts were exhausted
    Expired,
    /// Server is shutting down
    ServerShutdown,
}

impl CloseReason {
    /// Wire name of the reason
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::IdleTimeout => "idle_timeout",
            Self::Expired => "expired",
            Self::ServerShutdown => "server_shutdown",
        }
    }
}

/// Messages sent by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Session is attached to this connection
    SessionStarted {
        /// Session id, used to resume
        session_id: Uuid,
        /// Active exercise
        exercise_type: ExerciseType,
        /// Whether an existing session was reattached
        resumed: bool,
    },
    /// Analysis for one tick
    Analysis {
        /// Result, immutable once sent
        result: Box<AnalysisResult>,
    },
    /// Camera placement diagnostics
    CameraSetup {
        /// Diagnostics
        setup: CameraSetup,
        /// Adjustment hint, when placement is not ready
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
    /// Session state change without an analysis
    Status {
        /// Current phase
        phase: Phase,
        /// Why the status was sent
        reason: StatusReason,
    },
    /// Typed error; the session stays open unless followed by `session_closed`
    Error {
        /// Machine-readable code
        code: ErrorCode,
        /// Human-readable message
        message: String,
    },
    /// Session ended
    SessionClosed {
        /// Why it ended
        reason: CloseReason,
    },
    /// Reply to `ping`
    Pong,
}

impl ServerMessage {
    /// Camera diagnostics with the matching hint
    #[must_use]
    pub fn camera_setup(setup: CameraSetup) -> Self {
        Self::CameraSetup {
            setup,
            hint: setup.hint().map(str::to_owned),
        }
    }

    /// Wire name of the message type
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::Analysis { .. } => "analysis",
            Self::CameraSetup { .. } => "camera_setup",
            Self::Status { .. } => "status",
            Self::Error { .. } => "error",
            Self::SessionClosed { .. } => "session_closed",
            Self::Pong => "pong",
        }
    }
}

impl From<AppError> for ServerMessage {
    fn from(error: AppError) -> Self {
        Self::Error {
            code: error.code,
            message: error.message,
        }
    }
}

impl From<&AppError> for ServerMessage {
    fn from(error: &AppError) -> Self {
        Self::Error {
            code: error.code,
            message: error.message.clone(),
        }
    }
}
