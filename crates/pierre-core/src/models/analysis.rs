// ABOUTME: Joint measurements, per-joint scores, feedback and the immutable analysis result
// ABOUTME: Also holds calibration input and derived metrics such as symmetry and moment arms
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::exercise::{BodySide, ExerciseType, Joint, Phase};

/// One joint angle computed from three landmarks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointMeasurement {
    /// Angle in degrees within [0, 180], `None` when undefined
    pub angle: Option<f64>,
    /// Minimum visibility of the source landmarks
    pub confidence: f64,
    /// Body side that produced the measurement
    pub side: BodySide,
}

impl JointMeasurement {
    /// Undefined measurement
    #[must_use]
    pub const fn undefined(side: BodySide, confidence: f64) -> Self {
        Self {
            angle: None,
            confidence,
            side,
        }
    }

    /// Whether the angle is defined
    #[must_use]
    pub const fn is_defined(&self) -> bool {
        self.angle.is_some()
    }
}

/// Joint angles computed for one frame
///
/// Every requested joint has an entry. Undefined joints carry `angle: None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointAngleSet {
    joints: BTreeMap<Joint, JointMeasurement>,
}

impl JointAngleSet {
    /// Build a set from computed measurements
    #[must_use]
    pub fn from_measurements(measurements: impl IntoIterator<Item = (Joint, JointMeasurement)>) -> Self {
        Self {
            joints: measurements.into_iter().collect(),
        }
    }

    /// Measurement for a joint, if it was requested
    #[must_use]
    pub fn get(&self, joint: Joint) -> Option<&JointMeasurement> {
        self.joints.get(&joint)
    }

    /// Defined angle for a joint
    #[must_use]
    pub fn angle(&self, joint: Joint) -> Option<f64> {
        self.joints.get(&joint).and_then(|m| m.angle)
    }

    /// Iterate over all measurements
    pub fn iter(&self) -> impl Iterator<Item = (Joint, &JointMeasurement)> {
        self.joints.iter().map(|(joint, m)| (*joint, m))
    }

    /// Number of defined joints
    #[must_use]
    pub fn defined_count(&self) -> usize {
        self.joints.values().filter(|m| m.is_defined()).count()
    }

    /// Number of requested joints
    #[must_use]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// Whether no joints were requested
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

/// Acceptable angle range for a joint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IdealRange {
    /// Lower bound in degrees
    pub min: f64,
    /// Upper bound in degrees
    pub max: f64,
    /// Target angle, if the range has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideal: Option<f64>,
}

impl IdealRange {
    /// Create a range without an ideal target
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            ideal: None,
        }
    }

    /// Whether an angle is inside the range (bounds inclusive)
    #[must_use]
    pub fn contains(&self, angle: f64) -> bool {
        angle >= self.min && angle <= self.max
    }

    /// Signed distance outside the range: negative below, positive above, 0 inside
    #[must_use]
    pub fn signed_deviation(&self, angle: f64) -> f64 {
        if angle < self.min {
            angle - self.min
        } else if angle > self.max {
            angle - self.max
        } else {
            0.0
        }
    }
}

/// Per-joint classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleStatus {
    /// Inside the ideal range
    Good,
    /// Slightly outside
    Warning,
    /// Far outside
    Critical,
    /// Angle could not be measured
    Undefined,
}

/// Score for one joint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleScore {
    /// Measured angle, `None` when undefined
    pub angle: Option<f64>,
    /// Range the angle was judged against
    pub ideal_range: IdealRange,
    /// Classification
    pub status: AngleStatus,
    /// Score in [0, 100], `None` when undefined
    pub score: Option<f64>,
    /// Signed distance outside the range
    pub deviation: f64,
}

/// Severity of a feedback item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSeverity {
    /// Informational
    Info,
    /// Worth correcting
    Warning,
    /// Correct before continuing
    Critical,
}

/// One coaching cue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// 1-based rank, 1 is most important
    pub priority: u8,
    /// Human-readable cue
    pub message: String,
    /// Joint the cue refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joint: Option<Joint>,
    /// Severity
    pub severity: FeedbackSeverity,
}

/// Load-line reference for a moment arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentArmKind {
    /// Hip to the vertical through the ankle
    HipToMidfoot,
    /// Knee to the vertical through the ankle
    KneeToMidfoot,
    /// Hip to the vertical through the bar (wrists)
    HipToBar,
    /// Shoulder to the vertical through the bar (wrists)
    ShoulderToBar,
}

/// Horizontal distance between a joint and the load line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentArm {
    /// Which joint and load line
    pub kind: MomentArmKind,
    /// Distance in normalized image units
    pub normalized: f64,
    /// Distance in centimetres when a reference height is calibrated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centimeters: Option<f64>,
}

/// Metrics derived alongside the joint angles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// |left - right| per joint when both sides are defined
    pub symmetry: BTreeMap<Joint, f64>,
    /// Moment arms for the exercise
    pub moment_arms: Vec<MomentArm>,
}

/// Per-session calibration supplied by the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Athlete height used to convert normalized distances
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_height_cm: Option<f64>,
    /// Camera roll in degrees, rotates the vertical reference axis
    #[serde(default)]
    pub camera_angle_deg: f64,
}

/// Output of one analysis tick
///
/// Results are immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Frame sequence the result was computed from
    pub sequence: u64,
    /// Capture timestamp of that frame
    pub timestamp_ms: u64,
    /// Exercise being analyzed
    pub exercise_type: ExerciseType,
    /// Overall form score in [0, 100]
    pub score: f64,
    /// Mean score over the session window
    pub smoothed_score: f64,
    /// Current movement phase
    pub phase: Phase,
    /// Completed repetitions
    pub rep_count: u32,
    /// Score per joint
    pub angle_scores: BTreeMap<Joint, AngleScore>,
    /// Prioritized feedback
    pub feedback: Vec<Feedback>,
    /// Percentage of required joints with defined angles
    pub confidence: f64,
    /// Symmetry and moment arms
    pub metrics: DerivedMetrics,
    /// Produced by the simplified path
    pub degraded: bool,
    /// Time spent computing the result
    pub processing_time_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ideal_range_signed_deviation() {
        let range = IdealRange::new(70.0, 100.0);
        assert!((range.signed_deviation(60.0) + 10.0).abs() < f64::EPSILON);
        assert!((range.signed_deviation(110.0) - 10.0).abs() < f64::EPSILON);
        assert!(range.signed_deviation(85.0).abs() < f64::EPSILON);
        assert!(range.contains(70.0));
        assert!(range.contains(100.0));
    }

    #[test]
    fn test_undefined_joint_serializes_as_null() {
        let set = JointAngleSet::from_measurements([
            (
                Joint::Knee,
                JointMeasurement {
                    angle: Some(92.5),
                    confidence: 0.9,
                    side: BodySide::Left,
                },
            ),
            (Joint::Hip, JointMeasurement::undefined(BodySide::Left, 0.2)),
        ]);
        assert_eq!(set.defined_count(), 1);
        let json = serde_json::to_value(&set).unwrap();
        assert!(json["hip"]["angle"].is_null());
        assert!((json["knee"]["angle"].as_f64().unwrap() - 92.5).abs() < f64::EPSILON);
    }
}
