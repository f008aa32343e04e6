// ABOUTME: Skeletal landmark and landmark frame models produced by the pose-estimation model
// ABOUTME: Normalizes raw landmark lists into fixed 33-slot frames and records input issues
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::skeleton::{DEFAULT_VISIBILITY, LANDMARK_COUNT};

/// Fixed skeletal index of the 33-point pose topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PoseLandmark {
    /// Nose
    Nose = 0,
    /// Left eye (inner)
    LeftEyeInner = 1,
    /// Left eye
    LeftEye = 2,
    /// Left eye (outer)
    LeftEyeOuter = 3,
    /// Right eye (inner)
    RightEyeInner = 4,
    /// Right eye
    RightEye = 5,
    /// Right eye (outer)
    RightEyeOuter = 6,
    /// Left ear
    LeftEar = 7,
    /// Right ear
    RightEar = 8,
    /// Mouth (left corner)
    MouthLeft = 9,
    /// Mouth (right corner)
    MouthRight = 10,
    /// Left shoulder
    LeftShoulder = 11,
    /// Right shoulder
    RightShoulder = 12,
    /// Left elbow
    LeftElbow = 13,
    /// Right elbow
    RightElbow = 14,
    /// Left wrist
    LeftWrist = 15,
    /// Right wrist
    RightWrist = 16,
    /// Left pinky knuckle
    LeftPinky = 17,
    /// Right pinky knuckle
    RightPinky = 18,
    /// Left index knuckle
    LeftIndex = 19,
    /// Right index knuckle
    RightIndex = 20,
    /// Left thumb
    LeftThumb = 21,
    /// Right thumb
    RightThumb = 22,
    /// Left hip
    LeftHip = 23,
    /// Right hip
    RightHip = 24,
    /// Left knee
    LeftKnee = 25,
    /// Right knee
    RightKnee = 26,
    /// Left ankle
    LeftAnkle = 27,
    /// Right ankle
    RightAnkle = 28,
    /// Left heel
    LeftHeel = 29,
    /// Right heel
    RightHeel = 30,
    /// Left foot index (toe)
    LeftFootIndex = 31,
    /// Right foot index (toe)
    RightFootIndex = 32,
}

impl PoseLandmark {
    /// Every landmark in index order
    pub const ALL: [Self; LANDMARK_COUNT] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::MouthLeft,
        Self::MouthRight,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    /// Slot index of this landmark
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look up a landmark by slot index
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// One tracked skeletal point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Fixed skeletal index (0-32)
    pub id: u8,
    /// Normalized horizontal image coordinate
    pub x: f64,
    /// Normalized vertical image coordinate (grows downward)
    pub y: f64,
    /// Relative depth
    pub z: f64,
    /// Detection confidence in [0, 1]
    pub visibility: f64,
}

impl Landmark {
    /// Create a landmark for a known skeletal point
    #[must_use]
    pub const fn new(point: PoseLandmark, x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self {
            id: point as u8,
            x,
            y,
            z,
            visibility,
        }
    }

    /// Whether the landmark's visibility meets `threshold`
    #[must_use]
    pub fn is_visible(&self, threshold: f64) -> bool {
        self.visibility >= threshold
    }
}

/// Landmark as received on the wire, before normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkInput {
    /// Skeletal index; list position is used when omitted
    #[serde(default)]
    pub id: Option<u32>,
    /// Normalized horizontal coordinate
    pub x: f64,
    /// Normalized vertical coordinate
    pub y: f64,
    /// Relative depth
    #[serde(default)]
    pub z: f64,
    /// Detection confidence; assumed fully visible when omitted
    #[serde(default)]
    pub visibility: Option<f64>,
}

/// Problem found while normalizing a landmark list
///
/// Issues never reject a frame. The affected landmark is dropped or demoted
/// so that dependent joints become undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputIssue {
    /// Index outside 0-32
    UnknownId {
        /// Offending index
        id: u32,
    },
    /// Index supplied twice; the first entry is kept
    DuplicateId {
        /// Repeated index
        id: u8,
    },
    /// NaN or infinite coordinate; visibility demoted to 0
    NonFinite {
        /// Affected index
        id: u8,
    },
    /// Fewer than 33 landmarks present
    Incomplete {
        /// Landmarks present
        present: usize,
    },
}

impl fmt::Display for InputIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownId { id } => write!(f, "landmark id {id} is outside 0-32"),
            Self::DuplicateId { id } => write!(f, "landmark id {id} appears more than once"),
            Self::NonFinite { id } => write!(f, "landmark {id} has a non-finite coordinate"),
            Self::Incomplete { present } => {
                write!(f, "only {present} of {LANDMARK_COUNT} landmarks present")
            }
        }
    }
}

/// Full set of landmarks for one instant
///
/// Slots are indexed by skeletal id, so `id` alone determines position.
/// Missing landmarks leave an empty slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Monotonically increasing frame number within a session
    pub sequence: u64,
    /// Capture timestamp in milliseconds
    pub timestamp_ms: u64,
    slots: Vec<Option<Landmark>>,
}

/// Normalized frame plus the issues found while building it
#[derive(Debug, Clone)]
pub struct NormalizedFrame {
    /// Cleaned frame
    pub frame: LandmarkFrame,
    /// Recoverable problems found in the input
    pub issues: Vec<InputIssue>,
}

impl LandmarkFrame {
    /// Build a frame from already-typed landmarks
    ///
    /// Later duplicates and out-of-range ids are ignored; use
    /// [`LandmarkFrame::normalize`] to have them reported.
    #[must_use]
    pub fn from_landmarks(sequence: u64, timestamp_ms: u64, landmarks: &[Landmark]) -> Self {
        let mut slots = vec![None; LANDMARK_COUNT];
        for landmark in landmarks {
            if let Some(slot) = slots.get_mut(usize::from(landmark.id)) {
                if slot.is_none() {
                    *slot = Some(*landmark);
                }
            }
        }
        Self {
            sequence,
            timestamp_ms,
            slots,
        }
    }

    /// Clean a raw landmark list into a fixed-slot frame
    #[must_use]
    pub fn normalize(sequence: u64, timestamp_ms: u64, inputs: &[LandmarkInput]) -> NormalizedFrame {
        let mut slots: Vec<Option<Landmark>> = vec![None; LANDMARK_COUNT];
        let mut issues = Vec::new();

        for (position, input) in inputs.iter().enumerate() {
            let raw_id = input
                .id
                .unwrap_or_else(|| u32::try_from(position).unwrap_or(u32::MAX));
            let Some(id) = u8::try_from(raw_id)
                .ok()
                .filter(|id| usize::from(*id) < LANDMARK_COUNT)
            else {
                issues.push(InputIssue::UnknownId { id: raw_id });
                continue;
            };

            let slot = &mut slots[usize::from(id)];
            if slot.is_some() {
                issues.push(InputIssue::DuplicateId { id });
                continue;
            }

            let finite = input.x.is_finite() && input.y.is_finite() && input.z.is_finite();
            let visibility = if finite {
                input
                    .visibility
                    .filter(|v| v.is_finite())
                    .unwrap_or(DEFAULT_VISIBILITY)
                    .clamp(0.0, 1.0)
            } else {
                issues.push(InputIssue::NonFinite { id });
                0.0
            };

            *slot = Some(Landmark {
                id,
                x: if input.x.is_finite() { input.x } else { 0.0 },
                y: if input.y.is_finite() { input.y } else { 0.0 },
                z: if input.z.is_finite() { input.z } else { 0.0 },
                visibility,
            });
        }

        let frame = Self {
            sequence,
            timestamp_ms,
            slots,
        };
        let present = frame.present_count();
        if present < LANDMARK_COUNT {
            issues.push(InputIssue::Incomplete { present });
        }

        NormalizedFrame { frame, issues }
    }

    /// Landmark at a skeletal point, if present
    #[must_use]
    pub fn get(&self, point: PoseLandmark) -> Option<&Landmark> {
        self.slots.get(point.index()).and_then(Option::as_ref)
    }

    /// Landmark at a skeletal point if present and at least `threshold` visible
    #[must_use]
    pub fn visible(&self, point: PoseLandmark, threshold: f64) -> Option<&Landmark> {
        self.get(point).filter(|l| l.is_visible(threshold))
    }

    /// Iterate over present landmarks in id order
    pub fn iter(&self) -> impl Iterator<Item = &Landmark> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Number of present landmarks
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Number of landmarks strictly above `threshold`
    #[must_use]
    pub fn count_above(&self, threshold: f64) -> usize {
        self.iter().filter(|l| l.visibility > threshold).count()
    }

    /// Whether all 33 landmarks are present
    ///
    /// Incomplete frames are low-confidence: camera diagnostics may use them,
    /// phase detection and scoring may not.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.present_count() == LANDMARK_COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(id: Option<u32>, x: f64, visibility: Option<f64>) -> LandmarkInput {
        LandmarkInput {
            id,
            x,
            y: 0.5,
            z: 0.0,
            visibility,
        }
    }

    #[test]
    fn test_position_defines_id_when_omitted() {
        let inputs: Vec<_> = (0..LANDMARK_COUNT)
            .map(|_| input(None, 0.5, Some(0.9)))
            .collect();
        let normalized = LandmarkFrame::normalize(1, 0, &inputs);
        assert!(normalized.issues.is_empty());
        assert!(normalized.frame.is_complete());
        assert_eq!(
            normalized.frame.get(PoseLandmark::RightFootIndex).map(|l| l.id),
            Some(32)
        );
    }

    #[test]
    fn test_issues_are_recorded_not_fatal() {
        let inputs = vec![
            input(Some(40), 0.5, Some(0.9)),
            input(Some(11), 0.4, Some(0.9)),
            input(Some(11), 0.6, Some(0.9)),
            input(Some(12), f64::NAN, Some(0.9)),
        ];
        let normalized = LandmarkFrame::normalize(7, 100, &inputs);

        assert!(normalized
            .issues
            .contains(&InputIssue::UnknownId { id: 40 }));
        assert!(normalized
            .issues
            .contains(&InputIssue::DuplicateId { id: 11 }));
        assert!(normalized.issues.contains(&InputIssue::NonFinite { id: 12 }));
        assert!(normalized
            .issues
            .contains(&InputIssue::Incomplete { present: 2 }));

        let frame = &normalized.frame;
        assert!((frame.get(PoseLandmark::LeftShoulder).unwrap().x - 0.4).abs() < f64::EPSILON);
        assert!(frame.visible(PoseLandmark::RightShoulder, 0.5).is_none());
        assert!(!frame.is_complete());
    }

    #[test]
    fn test_visibility_defaults_and_clamps() {
        let inputs = vec![input(Some(0), 0.5, None), input(Some(1), 0.5, Some(1.7))];
        let frame = LandmarkFrame::normalize(1, 0, &inputs).frame;
        assert!((frame.get(PoseLandmark::Nose).unwrap().visibility - 1.0).abs() < f64::EPSILON);
        assert!(
            (frame.get(PoseLandmark::LeftEyeInner).unwrap().visibility - 1.0).abs() < f64::EPSILON
        );
    }

    #[test]
    fn test_wire_defaults_fill_omitted_fields() {
        let parsed: LandmarkInput = serde_json::from_str(r#"{"x": 0.5, "y": 0.5}"#).unwrap();
        assert_eq!(parsed, input(None, 0.5, None));
        assert_ne!(parsed, input(Some(0), 0.5, None));
    }
}
