// ABOUTME: Core data models for the Pierre form analysis pipeline
// ABOUTME: Re-exports landmark frames, exercise vocabulary, analysis results and camera diagnostics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! This module contains the data structures shared by every stage of the form
//! analysis pipeline, from raw landmark frames to the emitted result.
//!
//! ## Design Principles
//!
//! - **Undefined is explicit**: joints that cannot be measured carry `None`, never 0
//! - **Immutable outputs**: angle sets and results are built once and never mutated
//! - **Serializable**: all models support JSON for the streaming protocol and REST API
//!
//! ## Core Models
//!
//! - `LandmarkFrame`: 33 skeletal points for one instant
//! - `JointAngleSet`: joint angles computed from a frame
//! - `Phase`: movement phase within a repetition
//! - `AnalysisResult`: score, per-joint breakdown and feedback for one tick
//! - `CameraSetup`: camera placement diagnostics

mod analysis;
mod camera;
mod exercise;
mod landmark;

// Landmark domain
pub use landmark::{InputIssue, Landmark, LandmarkFrame, LandmarkInput, NormalizedFrame, PoseLandmark};

// Exercise vocabulary
pub use exercise::{BodySide, CameraView, ExerciseType, Joint, Phase};

// Analysis outputs
pub use analysis::{
    AnalysisResult, AngleScore, AngleStatus, Calibration, DerivedMetrics, Feedback,
    FeedbackSeverity, IdealRange, JointAngleSet, JointMeasurement, MomentArm, MomentArmKind,
};

// Camera diagnostics
pub use camera::{CameraAngle, CameraPosition, CameraSetup, VisibilityLevel};
