// ABOUTME: Camera-setup diagnostic models reported before and during analysis
// ABOUTME: Position, angle and visibility classifications plus an overall readiness flag
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};

/// Athlete placement within the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraPosition {
    /// Body fills too much of the frame
    TooClose,
    /// Body fills too little of the frame
    TooFar,
    /// Body is not horizontally centered
    OffCenter,
    /// Placement is fine
    Good,
}

/// Camera orientation relative to the athlete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraAngle {
    /// Camera looks down on the athlete
    TooHigh,
    /// Camera looks up at the athlete
    TooLow,
    /// Camera is rotated away from the preferred view
    Tilted,
    /// Orientation is fine
    Good,
}

/// How much of the skeleton is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityLevel {
    /// At least 85% of landmarks visible
    Full,
    /// At least 70% of landmarks visible
    Partial,
    /// Fewer than 70% of landmarks visible
    Poor,
}

/// Camera-setup diagnostics for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSetup {
    /// Placement classification
    pub position: CameraPosition,
    /// Orientation classification
    pub angle: CameraAngle,
    /// Visibility classification
    pub visibility: VisibilityLevel,
    /// Overall confidence in [0, 100]
    pub confidence: f64,
    /// Whether analysis may proceed
    pub ready: bool,
}

impl CameraSetup {
    /// Diagnostics for a frame with no visible landmarks
    #[must_use]
    pub const fn nothing_visible() -> Self {
        Self {
            position: CameraPosition::TooFar,
            angle: CameraAngle::Tilted,
            visibility: VisibilityLevel::Poor,
            confidence: 0.0,
            ready: false,
        }
    }

    /// Short human-readable adjustment hint, if any
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        match (self.position, self.angle, self.visibility) {
            (CameraPosition::TooClose, _, _) => Some("Move the camera further away"),
            (CameraPosition::TooFar, _, _) => Some("Move the camera closer"),
            (CameraPosition::OffCenter, _, _) => Some("Center yourself in the frame"),
            (_, CameraAngle::TooHigh, _) => Some("Lower the camera"),
            (_, CameraAngle::TooLow, _) => Some("Raise the camera"),
            (_, CameraAngle::Tilted, _) => Some("Turn the camera to face your side"),
            (_, _, VisibilityLevel::Poor) => Some("Make sure your whole body is visible"),
            _ => None,
        }
    }
}
