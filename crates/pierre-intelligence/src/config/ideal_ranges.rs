// ABOUTME: Ideal joint-angle range table loaded once from YAML and shared read-only
// ABOUTME: Resolves per-exercise profiles with phase-specific range overrides
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pierre_core::models::{CameraView, ExerciseType, IdealRange, Joint, Phase};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use tracing::info;

use super::error::ConfigError;

/// Table compiled into the binary
const EMBEDDED_TABLE: &str = include_str!("default_ideal_ranges.yaml");

/// Environment variable naming an override file
pub const IDEAL_RANGES_PATH_ENV: &str = "FORM_IDEAL_RANGES_PATH";

/// Ranges and movement parameters for one exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRanges {
    /// Joint whose trajectory drives phase detection
    pub primary_joint: Joint,
    /// Preferred camera view
    pub view: CameraView,
    /// Primary-joint angle at or below which the eccentric phase bottoms out
    pub bottom_angle: f64,
    /// Primary-joint angle at lockout, when not learned from the athlete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_angle: Option<f64>,
    /// Base range per joint
    pub joints: BTreeMap<Joint, IdealRange>,
    /// Ranges that replace the base range during a phase
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub phases: BTreeMap<Phase, BTreeMap<Joint, IdealRange>>,
}

/// Ideal-range table keyed by exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdealRangeTable {
    exercises: BTreeMap<ExerciseType, ExerciseRanges>,
}

impl IdealRangeTable {
    /// Parse and validate a YAML table
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or any range is invalid
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let table: Self = serde_yaml::from_str(yaml)?;
        table.validate()?;
        Ok(table)
    }

    /// Table compiled into the binary
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded YAML is invalid
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_yaml_str(EMBEDDED_TABLE)
    }

    /// Load a table from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_yaml_str(&yaml)?;
        info!(
            path = %path.display(),
            exercises = table.exercises.len(),
            "Loaded ideal-range table"
        );
        Ok(table)
    }

    /// Load from `path` when given, else from `FORM_IDEAL_RANGES_PATH`, else the embedded table
    ///
    /// # Errors
    ///
    /// Returns an error if the selected table cannot be loaded
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match env::var(IDEAL_RANGES_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load(Path::new(path.trim())),
            _ => Self::embedded(),
        }
    }

    /// Check every range is ordered and within [0, 180]
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid entry
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exercises.is_empty() {
            return Err(ConfigError::MissingField(
                "at least one exercise".to_owned(),
            ));
        }
        for (exercise, ranges) in &self.exercises {
            if !ranges.joints.contains_key(&ranges.primary_joint) {
                return Err(ConfigError::MissingField(format!(
                    "{exercise}.joints.{}",
                    ranges.primary_joint
                )));
            }
            if !(0.0..=180.0).contains(&ranges.bottom_angle) {
                return Err(ConfigError::InvalidRange(format!(
                    "{exercise}.bottom_angle must be within 0-180"
                )));
            }
            let base = ranges.joints.iter().map(|(joint, r)| (None, joint, r));
            let overrides = ranges.phases.iter().flat_map(|(phase, joints)| {
                joints.iter().map(move |(joint, r)| (Some(phase), joint, r))
            });
            for (phase, joint, range) in base.chain(overrides) {
                let valid = range.min.is_finite()
                    && range.max.is_finite()
                    && range.min <= range.max
                    && range.min >= 0.0
                    && range.max <= 180.0;
                if !valid {
                    let location = phase.map_or_else(
                        || format!("{exercise}.joints.{joint}"),
                        |phase| format!("{exercise}.phases.{phase}.{joint}"),
                    );
                    return Err(ConfigError::InvalidRange(format!(
                        "{location}: [{}, {}] must be ordered within 0-180",
                        range.min, range.max
                    )));
                }
            }
        }
        Ok(())
    }

    /// Ranges for an exercise, if loaded
    #[must_use]
    pub fn get(&self, exercise: ExerciseType) -> Option<&ExerciseRanges> {
        self.exercises.get(&exercise)
    }

    /// Exercises present in the table
    pub fn exercises(&self) -> impl Iterator<Item = ExerciseType> + '_ {
        self.exercises.keys().copied()
    }

    /// Resolve the profile a session analyzes against
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedExercise` if the table has no entry for `exercise`
    pub fn profile(&self, exercise: ExerciseType) -> Result<ExerciseProfile, ConfigError> {
        self.exercises
            .get(&exercise)
            .map(|ranges| ExerciseProfile {
                exercise_type: exercise,
                ranges: ranges.clone(),
            })
            .ok_or(ConfigError::UnsupportedExercise(exercise))
    }
}

/// Exercise-specific view of the range table, resolved once per session
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseProfile {
    /// Exercise the profile describes
    pub exercise_type: ExerciseType,
    ranges: ExerciseRanges,
}

impl ExerciseProfile {
    /// Joint whose trajectory drives phase detection
    #[must_use]
    pub const fn primary_joint(&self) -> Joint {
        self.ranges.primary_joint
    }

    /// Preferred camera view
    #[must_use]
    pub const fn view(&self) -> CameraView {
        self.ranges.view
    }

    /// Primary-joint angle that marks the bottom
    #[must_use]
    pub const fn bottom_angle(&self) -> f64 {
        self.ranges.bottom_angle
    }

    /// Configured lockout angle, if any
    #[must_use]
    pub const fn top_angle(&self) -> Option<f64> {
        self.ranges.top_angle
    }

    /// Joints scored for this exercise
    pub fn required_joints(&self) -> impl Iterator<Item = Joint> + '_ {
        self.ranges.joints.keys().copied()
    }

    /// Number of joints scored for this exercise
    #[must_use]
    pub fn required_count(&self) -> usize {
        self.ranges.joints.len()
    }

    /// Range for a joint in a phase; phase overrides win over the base range
    #[must_use]
    pub fn range_for(&self, joint: Joint, phase: Phase) -> Option<IdealRange> {
        self.ranges
            .phases
            .get(&phase)
            .and_then(|overrides| overrides.get(&joint))
            .or_else(|| self.ranges.joints.get(&joint))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_table_covers_all_exercises() {
        let table = IdealRangeTable::embedded().unwrap();
        for exercise in ExerciseType::ALL {
            let profile = table.profile(exercise).unwrap();
            assert_eq!(profile.view(), exercise.preferred_view());
        }
    }

    #[test]
    fn test_phase_override_precedence() {
        let table = IdealRangeTable::embedded().unwrap();
        let squat = table.profile(ExerciseType::Squat).unwrap();
        let bottom = squat.range_for(Joint::Knee, Phase::Bottom).unwrap();
        let base = squat.range_for(Joint::Knee, Phase::Eccentric).unwrap();
        assert!((bottom.min - 70.0).abs() < f64::EPSILON);
        assert!((base.min - 60.0).abs() < f64::EPSILON);
        assert!(squat.range_for(Joint::Elbow, Phase::Bottom).is_none());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let yaml = "squat:\n  primary_joint: knee\n  view: side\n  bottom_angle: 90\n  joints:\n    knee: { min: 120, max: 60 }\n";
        let err = IdealRangeTable::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRange(_)));
    }

    #[test]
    fn test_missing_primary_joint_rejected() {
        let yaml = "squat:\n  primary_joint: knee\n  view: side\n  bottom_angle: 90\n  joints:\n    hip: { min: 60, max: 180 }\n";
        let err = IdealRangeTable::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn test_load_from_file_and_unsupported_exercise() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "squat:\n  primary_joint: knee\n  view: side\n  bottom_angle: 85\n  joints:\n    knee: {{ min: 60, max: 180 }}\n"
        )
        .unwrap();
        let table = IdealRangeTable::load(file.path()).unwrap();
        assert_eq!(table.exercises().count(), 1);
        assert!(matches!(
            table.profile(ExerciseType::Deadlift),
            Err(ConfigError::UnsupportedExercise(ExerciseType::Deadlift))
        ));
    }
}
