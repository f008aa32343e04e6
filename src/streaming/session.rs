// ABOUTME: Per-session analysis state owned by a single streaming session task
// ABOUTME: Holds the exercise profile, snapshot window, phase state, calibration and ordering cursor
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use pierre_core::models::{Calibration, ExerciseType, LandmarkFrame, Phase};
use pierre_intelligence::{ExerciseProfile, PhaseState, SnapshotWindow};
use uuid::Uuid;

/// State of one exercise session
///
/// Only the session's own task mutates it; the analysis stages borrow it.
#[derive(Debug, Clone)]
pub struct ExerciseSession {
    /// Session id
    pub id: Uuid,
    /// Authenticated user
    pub user_id: String,
    /// Active exercise profile
    pub profile: ExerciseProfile,
    /// Recent snapshots
    pub window: SnapshotWindow,
    /// Phase detector state
    pub phase_state: PhaseState,
    /// Client calibration
    pub calibration: Calibration,
    /// Camera placement has passed once
    pub camera_confirmed: bool,
    /// Latest analyzed frame, for on-demand camera checks
    pub last_frame: Option<LandmarkFrame>,
    /// Highest accepted frame sequence
    pub last_sequence: Option<u64>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl ExerciseSession {
    /// Create a session with an empty window
    #[must_use]
    pub fn new(id: Uuid, user_id: &str, profile: ExerciseProfile, window_size: usize) -> Self {
        Self {
            id,
            user_id: user_id.to_owned(),
            profile,
            window: SnapshotWindow::new(window_size),
            phase_state: PhaseState::default(),
            calibration: Calibration::default(),
            camera_confirmed: false,
            last_frame: None,
            last_sequence: None,
            created_at: Utc::now(),
        }
    }

    /// Active exercise
    #[must_use]
    pub const fn exercise_type(&self) -> ExerciseType {
        self.profile.exercise_type
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase_state.phase
    }

    /// Accept a frame sequence if it is newer than every accepted one
    pub fn accept_sequence(&mut self, sequence: u64) -> bool {
        if self.last_sequence.is_some_and(|last| sequence <= last) {
            return false;
        }
        self.last_sequence = Some(sequence);
        true
    }

    /// Switch exercise, discarding the window, phase and camera confirmation
    pub fn switch_exercise(&mut self, profile: ExerciseProfile) {
        self.profile = profile;
        self.reset();
    }

    /// Discard temporal state while keeping identity, calibration and ordering
    pub fn reset(&mut self) {
        self.window.clear();
        self.phase_state = PhaseState::default();
        self.camera_confirmed = false;
        self.last_frame = None;
    }

    /// Merge a calibration update; `None` keeps the current value
    pub fn calibrate(&mut self, reference_height_cm: Option<f64>, camera_angle_deg: Option<f64>) {
        if let Some(height) = reference_height_cm.filter(|h| h.is_finite() && *h > 0.0) {
            self.calibration.reference_height_cm = Some(height);
        }
        if let Some(angle) = camera_angle_deg.filter(|a| a.is_finite()) {
            self.calibration.camera_angle_deg = angle;
        }
    }
}
