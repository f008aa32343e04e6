// ABOUTME: Configuration error types for ideal-range and threshold validation
// ABOUTME: Defines error variants for unreadable files, parse failures and invalid ranges
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration error types for form analysis validation.

use pierre_core::errors::AppError;
use pierre_core::models::ExerciseType;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Ideal-range file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that was requested
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Ideal-range YAML did not parse
    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Range bounds are inverted or outside [0, 180]
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Required configuration field is missing
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Exercise has no entry in the table
    #[error("No profile for exercise: {0}")]
    UnsupportedExercise(ExerciseType),

    /// Numeric value outside valid range for parameter
    #[error("Value out of range: {0}")]
    ValueOutOfRange(&'static str),
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::UnsupportedExercise(exercise) => Self::unsupported_exercise(exercise),
            other => Self::config(other.to_string()),
        }
    }
}
