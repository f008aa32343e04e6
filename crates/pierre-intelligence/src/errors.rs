// ABOUTME: Error type for analysis ticks that cannot produce a result
// ABOUTME: Converts into the unified AppError so transports can report a machine-readable code
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pierre_core::errors::AppError;
use pierre_core::models::{ExerciseType, Joint};
use serde_json::json;
use thiserror::Error;

/// Reasons an analysis tick yields no result
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    /// Neither the full nor the simplified path had enough data
    #[error("primary joint {primary} is undefined and only {defined} of {required} joints are measurable")]
    LowConfidence {
        /// Joint the simplified path depends on
        primary: Joint,
        /// Joints with a defined angle
        defined: usize,
        /// Joints the profile requires
        required: usize,
    },

    /// Frame is missing landmarks
    #[error("frame has {present} of 33 landmarks")]
    IncompleteFrame {
        /// Landmarks present
        present: usize,
    },

    /// No profile is loaded for the exercise
    #[error("no ideal-range profile for {0}")]
    UnsupportedExercise(ExerciseType),
}

impl From<AnalysisError> for AppError {
    fn from(error: AnalysisError) -> Self {
        match &error {
            AnalysisError::LowConfidence {
                primary,
                defined,
                required,
            } => Self::low_confidence(error.to_string()).with_details(json!({
                "primary_joint": primary,
                "defined_joints": defined,
                "required_joints": required,
            })),
            AnalysisError::IncompleteFrame { present } => Self::low_confidence(error.to_string())
                .with_details(json!({ "landmarks_present": present })),
            AnalysisError::UnsupportedExercise(exercise) => Self::unsupported_exercise(exercise),
        }
    }
}
