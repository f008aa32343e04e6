// ABOUTME: Exercise, joint and movement-phase vocabulary shared by the analysis pipeline
// ABOUTME: Includes the legal phase transition table and per-exercise preferred camera view
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;

/// Supported exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseType {
    /// Back squat
    Squat,
    /// Conventional deadlift
    Deadlift,
    /// Flat bench press
    BenchPress,
}

impl ExerciseType {
    /// All supported exercises
    pub const ALL: [Self; 3] = [Self::Squat, Self::Deadlift, Self::BenchPress];

    /// Wire name of the exercise
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Squat => "squat",
            Self::Deadlift => "deadlift",
            Self::BenchPress => "bench_press",
        }
    }

    /// Camera view that shows this exercise's primary joints best
    #[must_use]
    pub const fn preferred_view(self) -> CameraView {
        match self {
            Self::Squat | Self::Deadlift => CameraView::Side,
            Self::BenchPress => CameraView::ThreeQuarter,
        }
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "squat" => Ok(Self::Squat),
            "deadlift" => Ok(Self::Deadlift),
            "bench_press" | "bench" => Ok(Self::BenchPress),
            _ => Err(AppError::unsupported_exercise(s)),
        }
    }
}

/// Camera viewpoint relative to the athlete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraView {
    /// Camera faces the athlete
    Front,
    /// Camera is perpendicular to the athlete's sagittal plane
    Side,
    /// Camera is roughly 45 degrees off the front
    ThreeQuarter,
}

impl fmt::Display for CameraView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Front => "front",
            Self::Side => "side",
            Self::ThreeQuarter => "three_quarter",
        })
    }
}

/// Body side a measurement was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodySide {
    /// Athlete's left
    Left,
    /// Athlete's right
    Right,
}

/// Joint angles tracked by the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    /// Hip-knee-ankle
    Knee,
    /// Shoulder-hip-knee
    Hip,
    /// Knee-ankle-foot index
    Ankle,
    /// Shoulder-elbow-wrist
    Elbow,
    /// Elbow-shoulder-hip
    Shoulder,
    /// Elbow-wrist against vertical
    Wrist,
    /// Shoulder-hip line against vertical
    Back,
}

impl Joint {
    /// All tracked joints
    pub const ALL: [Self; 7] = [
        Self::Knee,
        Self::Hip,
        Self::Ankle,
        Self::Elbow,
        Self::Shoulder,
        Self::Wrist,
        Self::Back,
    ];

    /// Wire name of the joint
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Knee => "knee",
            Self::Hip => "hip",
            Self::Ankle => "ankle",
            Self::Elbow => "elbow",
            Self::Shoulder => "shoulder",
            Self::Wrist => "wrist",
            Self::Back => "back",
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Movement phase within a repetition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Before the first movement
    Setup,
    /// Lowering
    Eccentric,
    /// Lowest position
    Bottom,
    /// Raising
    Concentric,
    /// Lockout
    Top,
    /// No meaningful motion
    Rest,
}

impl Phase {
    /// Whether moving from `self` to `next` is legal
    ///
    /// Staying in the same phase is always legal, and any phase may fall back
    /// to rest after sustained stillness.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (_, Self::Rest)
                | (Self::Setup, Self::Setup | Self::Eccentric)
                | (Self::Eccentric, Self::Eccentric | Self::Bottom)
                | (Self::Bottom, Self::Bottom | Self::Concentric)
                | (Self::Concentric, Self::Concentric | Self::Top)
                | (Self::Top, Self::Top | Self::Eccentric)
                | (Self::Rest, Self::Eccentric | Self::Concentric)
        )
    }

    /// Wire name of the phase
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Eccentric => "eccentric",
            Self::Bottom => "bottom",
            Self::Concentric => "concentric",
            Self::Top => "top",
            Self::Rest => "rest",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exercise_parsing() {
        assert_eq!("squat".parse::<ExerciseType>().unwrap(), ExerciseType::Squat);
        assert_eq!(
            "Bench-Press".parse::<ExerciseType>().unwrap(),
            ExerciseType::BenchPress
        );
        let err = "curl".parse::<ExerciseType>().unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::UnsupportedExercise);
    }

    #[test]
    fn test_exercise_wire_name_round_trips() {
        for exercise in ExerciseType::ALL {
            let json = serde_json::to_string(&exercise).unwrap();
            assert_eq!(json, format!("\"{exercise}\""));
        }
    }

    #[test]
    fn test_phase_transition_table() {
        assert!(Phase::Setup.can_transition_to(Phase::Eccentric));
        assert!(Phase::Eccentric.can_transition_to(Phase::Bottom));
        assert!(Phase::Bottom.can_transition_to(Phase::Concentric));
        assert!(Phase::Concentric.can_transition_to(Phase::Top));
        assert!(Phase::Top.can_transition_to(Phase::Eccentric));
        assert!(Phase::Rest.can_transition_to(Phase::Eccentric));
        assert!(Phase::Bottom.can_transition_to(Phase::Rest));

        assert!(!Phase::Setup.can_transition_to(Phase::Top));
        assert!(!Phase::Eccentric.can_transition_to(Phase::Top));
        assert!(!Phase::Top.can_transition_to(Phase::Bottom));
        assert!(!Phase::Rest.can_transition_to(Phase::Setup));
    }

    #[test]
    fn test_phases_order_through_the_cycle() {
        let keyed: std::collections::BTreeMap<Phase, &str> = [
            (Phase::Rest, "rest"),
            (Phase::Bottom, "bottom"),
            (Phase::Setup, "setup"),
            (Phase::Top, "top"),
        ]
        .into_iter()
        .collect();
        let order: Vec<_> = keyed.keys().copied().collect();
        assert_eq!(order, vec![Phase::Setup, Phase::Bottom, Phase::Top, Phase::Rest]);
    }
}
