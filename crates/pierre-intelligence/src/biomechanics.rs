// ABOUTME: Joint-angle computation from three-landmark triples on either body side
// ABOUTME: Derives left/right symmetry deltas and load-line moment arms from the same frame
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Biomechanics calculator
//!
//! Angles are measured in the image plane from normalized `x`/`y`
//! coordinates. Each joint is the angle at a center landmark between rays to
//! two other landmarks. Back inclination and wrist deviation use a synthetic
//! point one unit along the camera's vertical axis, which is rotated by the
//! calibrated camera roll.

use pierre_core::constants::skeleton::VISIBILITY_THRESHOLD;
use pierre_core::models::{
    BodySide, Calibration, DerivedMetrics, ExerciseType, Joint, JointAngleSet, JointMeasurement,
    Landmark, LandmarkFrame, MomentArm, MomentArmKind, PoseLandmark,
};
use std::collections::BTreeMap;

use crate::config::ExerciseProfile;

/// Rays shorter than this are degenerate
const MIN_RAY_LENGTH: f64 = 1e-9;

/// Joints compared left against right
const PAIRED_JOINTS: [Joint; 5] = [
    Joint::Knee,
    Joint::Hip,
    Joint::Ankle,
    Joint::Elbow,
    Joint::Shoulder,
];

/// Endpoint of a ray from the center landmark
#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Landmark(PoseLandmark),
    Up,
    Down,
}

/// Landmarks measured for a joint on one side: `(first, center, second)`
fn triple(joint: Joint, side: BodySide) -> (PoseLandmark, PoseLandmark, Endpoint) {
    use PoseLandmark as P;
    let left = matches!(side, BodySide::Left);
    let pick = |l: P, r: P| if left { l } else { r };
    match joint {
        Joint::Knee => (
            pick(P::LeftHip, P::RightHip),
            pick(P::LeftKnee, P::RightKnee),
            Endpoint::Landmark(pick(P::LeftAnkle, P::RightAnkle)),
        ),
        Joint::Hip => (
            pick(P::LeftShoulder, P::RightShoulder),
            pick(P::LeftHip, P::RightHip),
            Endpoint::Landmark(pick(P::LeftKnee, P::RightKnee)),
        ),
        Joint::Ankle => (
            pick(P::LeftKnee, P::RightKnee),
            pick(P::LeftAnkle, P::RightAnkle),
            Endpoint::Landmark(pick(P::LeftFootIndex, P::RightFootIndex)),
        ),
        Joint::Elbow => (
            pick(P::LeftShoulder, P::RightShoulder),
            pick(P::LeftElbow, P::RightElbow),
            Endpoint::Landmark(pick(P::LeftWrist, P::RightWrist)),
        ),
        Joint::Shoulder => (
            pick(P::LeftElbow, P::RightElbow),
            pick(P::LeftShoulder, P::RightShoulder),
            Endpoint::Landmark(pick(P::LeftHip, P::RightHip)),
        ),
        Joint::Back => (
            pick(P::LeftShoulder, P::RightShoulder),
            pick(P::LeftHip, P::RightHip),
            Endpoint::Up,
        ),
        Joint::Wrist => (
            pick(P::LeftElbow, P::RightElbow),
            pick(P::LeftWrist, P::RightWrist),
            Endpoint::Down,
        ),
    }
}

/// Angle in degrees at `center` between rays to `a` and `c`
///
/// Returns `None` when either ray is degenerate. The result always lies in
/// [0, 180] and does not depend on the order of `a` and `c`.
#[must_use]
pub fn three_point_angle(a: (f64, f64), center: (f64, f64), c: (f64, f64)) -> Option<f64> {
    let v1 = (a.0 - center.0, a.1 - center.1);
    let v2 = (c.0 - center.0, c.1 - center.1);
    if v1.0.hypot(v1.1) < MIN_RAY_LENGTH || v2.0.hypot(v2.1) < MIN_RAY_LENGTH {
        return None;
    }
    let cross = v1.0.mul_add(v2.1, -(v1.1 * v2.0));
    let dot = v1.0.mul_add(v2.0, v1.1 * v2.1);
    let degrees = cross.abs().atan2(dot).to_degrees();
    degrees.is_finite().then(|| normalize_angle(degrees))
}

/// Fold any angle into [0, 180]
#[must_use]
pub fn normalize_angle(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped > 180.0 {
        360.0 - wrapped
    } else {
        wrapped
    }
}

/// Joint angles plus metrics derived from the same frame
#[derive(Debug, Clone, PartialEq)]
pub struct BiomechanicsOutput {
    /// Angle per required joint, from the more confident side
    pub angles: JointAngleSet,
    /// Symmetry deltas and moment arms
    pub metrics: DerivedMetrics,
}

/// Computes joint angles and derived metrics from a landmark frame
#[derive(Debug, Clone, Copy)]
pub struct BiomechanicsCalculator {
    visibility_threshold: f64,
}

impl Default for BiomechanicsCalculator {
    fn default() -> Self {
        Self::new(VISIBILITY_THRESHOLD)
    }
}

impl BiomechanicsCalculator {
    /// Create a calculator with a landmark visibility threshold
    #[must_use]
    pub const fn new(visibility_threshold: f64) -> Self {
        Self {
            visibility_threshold,
        }
    }

    /// Measure one joint on one side
    #[must_use]
    pub fn measure(
        &self,
        frame: &LandmarkFrame,
        joint: Joint,
        side: BodySide,
        calibration: &Calibration,
    ) -> JointMeasurement {
        let (first, center, second) = triple(joint, side);
        let mut points = vec![first, center];
        if let Endpoint::Landmark(point) = second {
            points.push(point);
        }

        let landmarks: Option<Vec<&Landmark>> = points.iter().map(|p| frame.get(*p)).collect();
        let Some(landmarks) = landmarks else {
            return JointMeasurement::undefined(side, 0.0);
        };
        let confidence = landmarks
            .iter()
            .map(|l| l.visibility)
            .fold(1.0_f64, f64::min);
        if confidence < self.visibility_threshold {
            return JointMeasurement::undefined(side, confidence);
        }

        let a = (landmarks[0].x, landmarks[0].y);
        let b = (landmarks[1].x, landmarks[1].y);
        let c = match second {
            Endpoint::Landmark(_) => (landmarks[2].x, landmarks[2].y),
            Endpoint::Up => offset(b, vertical_axis(calibration.camera_angle_deg, true)),
            Endpoint::Down => offset(b, vertical_axis(calibration.camera_angle_deg, false)),
        };

        JointMeasurement {
            angle: three_point_angle(a, b, c),
            confidence,
            side,
        }
    }

    /// Measure a joint on both sides and keep the more confident one
    ///
    /// A defined measurement always beats an undefined one; ties go left.
    #[must_use]
    pub fn measure_best(
        &self,
        frame: &LandmarkFrame,
        joint: Joint,
        calibration: &Calibration,
    ) -> (JointMeasurement, JointMeasurement, JointMeasurement) {
        let left = self.measure(frame, joint, BodySide::Left, calibration);
        let right = self.measure(frame, joint, BodySide::Right, calibration);
        let best = if (right.is_defined(), right.confidence) > (left.is_defined(), left.confidence)
        {
            right
        } else {
            left
        };
        (best, left, right)
    }

    /// Compute the requested joints
    #[must_use]
    pub fn compute_angles(
        &self,
        frame: &LandmarkFrame,
        joints: impl IntoIterator<Item = Joint>,
        calibration: &Calibration,
    ) -> JointAngleSet {
        JointAngleSet::from_measurements(
            joints
                .into_iter()
                .map(|joint| (joint, self.measure_best(frame, joint, calibration).0)),
        )
    }

    /// Compute the profile's joints, symmetry deltas and moment arms
    #[must_use]
    pub fn analyze(
        &self,
        frame: &LandmarkFrame,
        profile: &ExerciseProfile,
        calibration: &Calibration,
    ) -> BiomechanicsOutput {
        let mut measurements = Vec::with_capacity(profile.required_count());
        let mut symmetry = BTreeMap::new();

        for joint in profile.required_joints() {
            let (best, left, right) = self.measure_best(frame, joint, calibration);
            if PAIRED_JOINTS.contains(&joint) {
                if let (Some(l), Some(r)) = (left.angle, right.angle) {
                    symmetry.insert(joint, (l - r).abs());
                }
            }
            measurements.push((joint, best));
        }

        let angles = JointAngleSet::from_measurements(measurements);
        let side = angles
            .get(profile.primary_joint())
            .map_or(BodySide::Left, |m| m.side);
        let moment_arms = self.moment_arms(frame, profile.exercise_type, side, calibration);

        BiomechanicsOutput {
            angles,
            metrics: DerivedMetrics {
                symmetry,
                moment_arms,
            },
        }
    }

    /// Horizontal joint-to-load-line distances for an exercise
    #[must_use]
    pub fn moment_arms(
        &self,
        frame: &LandmarkFrame,
        exercise: ExerciseType,
        side: BodySide,
        calibration: &Calibration,
    ) -> Vec<MomentArm> {
        use PoseLandmark as P;
        let left = matches!(side, BodySide::Left);
        let pick = |l: P, r: P| if left { l } else { r };
        let hip = pick(P::LeftHip, P::RightHip);
        let knee = pick(P::LeftKnee, P::RightKnee);
        let ankle = pick(P::LeftAnkle, P::RightAnkle);
        let wrist = pick(P::LeftWrist, P::RightWrist);
        let shoulder = pick(P::LeftShoulder, P::RightShoulder);

        let pairs: &[(MomentArmKind, PoseLandmark, PoseLandmark)] = match exercise {
            ExerciseType::Squat => &[
                (MomentArmKind::HipToMidfoot, hip, ankle),
                (MomentArmKind::KneeToMidfoot, knee, ankle),
            ],
            ExerciseType::Deadlift => &[
                (MomentArmKind::HipToBar, hip, wrist),
                (MomentArmKind::ShoulderToBar, shoulder, wrist),
            ],
            ExerciseType::BenchPress => &[(MomentArmKind::ShoulderToBar, shoulder, wrist)],
        };

        let scale = self.centimeters_per_unit(frame, side, calibration);
        pairs
            .iter()
            .filter_map(|(kind, joint, load)| {
                let joint = frame.visible(*joint, self.visibility_threshold)?;
                let load = frame.visible(*load, self.visibility_threshold)?;
                let normalized = (joint.x - load.x).abs();
                Some(MomentArm {
                    kind: *kind,
                    normalized,
                    centimeters: scale.map(|s| normalized * s),
                })
            })
            .collect()
    }

    /// Centimetres per normalized unit, from the nose-to-ankle span and reference height
    fn centimeters_per_unit(
        &self,
        frame: &LandmarkFrame,
        side: BodySide,
        calibration: &Calibration,
    ) -> Option<f64> {
        let height = calibration.reference_height_cm.filter(|h| *h > 0.0)?;
        let ankle = match side {
            BodySide::Left => PoseLandmark::LeftAnkle,
            BodySide::Right => PoseLandmark::RightAnkle,
        };
        let nose = frame.visible(PoseLandmark::Nose, self.visibility_threshold)?;
        let ankle = frame.visible(ankle, self.visibility_threshold)?;
        let span = (nose.x - ankle.x).hypot(nose.y - ankle.y);
        (span > MIN_RAY_LENGTH).then(|| height / span)
    }
}

/// Unit vector along the camera's vertical axis, rotated by the camera roll
///
/// Image `y` grows downward, so "up" is negative `y` before rotation.
fn vertical_axis(camera_angle_deg: f64, up: bool) -> (f64, f64) {
    let (sin, cos) = camera_angle_deg.to_radians().sin_cos();
    if up {
        (sin, -cos)
    } else {
        (-sin, cos)
    }
}

fn offset(point: (f64, f64), direction: (f64, f64)) -> (f64, f64) {
    (point.0 + direction.0, point.1 + direction.1)
}
