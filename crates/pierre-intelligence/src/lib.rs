// ABOUTME: Form analysis engine turning landmark frames into angles, phases, scores and feedback
// ABOUTME: Pure, deterministic algorithms shared by the streaming session manager and REST fallback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Intelligence
//!
//! The per-frame analysis stages of the form pipeline. Every stage is pure:
//! it sees a frame or a window handed in by reference and returns a value.
//!
//! ## Modules
//!
//! - **config**: ideal-range table, exercise profiles and tuning thresholds
//! - **biomechanics**: joint angles, symmetry and moment arms
//! - **camera_setup**: camera placement diagnostics
//! - **phase_detector**: movement phase state machine over a snapshot window
//! - **form_scorer**: per-joint scoring and prioritized feedback

/// Ideal-range table, exercise profiles and thresholds
pub mod config;

/// Analysis error types
pub mod errors;

/// Joint-angle and derived-metric computation
pub mod biomechanics;

/// Camera placement diagnostics
pub mod camera_setup;

/// Movement phase state machine
pub mod phase_detector;

/// Form scoring and feedback generation
pub mod form_scorer;

pub use biomechanics::{BiomechanicsCalculator, BiomechanicsOutput};
pub use camera_setup::CameraSetupEvaluator;
pub use config::{
    CameraConfig, ConfigError, ExerciseProfile, ExerciseRanges, IdealRangeTable,
    PhaseDetectorConfig, ScoringConfig,
};
pub use errors::AnalysisError;
pub use form_scorer::{FormScorer, ScoreCard};
pub use phase_detector::{PhaseDetector, PhaseSnapshot, PhaseState, SnapshotWindow};
