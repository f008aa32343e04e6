// ABOUTME: Configuration module for pierre-intelligence crate
// ABOUTME: Re-exports the ideal-range table, exercise profiles and tuning thresholds
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Configuration error types
pub mod error;

/// Ideal-range table and exercise profiles
pub mod ideal_ranges;

/// Phase, scoring and camera thresholds
pub mod thresholds;

pub use error::ConfigError;
pub use ideal_ranges::{ExerciseProfile, ExerciseRanges, IdealRangeTable, IDEAL_RANGES_PATH_ENV};
pub use thresholds::{CameraConfig, PhaseDetectorConfig, ScoringConfig};
