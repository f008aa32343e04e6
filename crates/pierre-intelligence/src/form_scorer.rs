// ABOUTME: Scores joint angles against ideal ranges and builds prioritized coaching feedback
// ABOUTME: Falls back to a primary-joint-only path when too few joints are measurable
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Form scorer and feedback generator
//!
//! Per-joint scores are 100 inside the ideal range and fall off linearly
//! with distance outside it. The overall score is the confidence-weighted
//! mean over defined joints; undefined joints are left out, never counted
//! as zero.

#![allow(clippy::cast_precision_loss)] // Safe: joint counts are single digits

use pierre_core::models::{
    AngleScore, AngleStatus, DerivedMetrics, Feedback, FeedbackSeverity, IdealRange, Joint,
    JointAngleSet, Phase,
};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::config::{ExerciseProfile, ScoringConfig};
use crate::errors::AnalysisError;

/// Scoring output for one tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    /// Overall score in [0, 100]
    pub score: f64,
    /// Score per scored joint
    pub angle_scores: BTreeMap<Joint, AngleScore>,
    /// Prioritized feedback
    pub feedback: Vec<Feedback>,
    /// Percentage of required joints with defined angles
    pub confidence: f64,
    /// Produced by the simplified path
    pub degraded: bool,
}

/// Feedback candidate before ranking
struct Finding {
    severity: FeedbackSeverity,
    magnitude: f64,
    joint: Joint,
    message: String,
}

/// Scores form against an exercise profile
#[derive(Debug, Clone, Copy, Default)]
pub struct FormScorer {
    config: ScoringConfig,
}

impl FormScorer {
    /// Create a scorer with explicit thresholds
    #[must_use]
    pub const fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Score one joint against a range
    #[must_use]
    pub fn score_joint(&self, angle: Option<f64>, range: IdealRange) -> AngleScore {
        let Some(angle) = angle else {
            return AngleScore {
                angle: None,
                ideal_range: range,
                status: AngleStatus::Undefined,
                score: None,
                deviation: 0.0,
            };
        };
        let deviation = range.signed_deviation(angle);
        let distance = deviation.abs();
        let (status, score) = if distance <= 0.0 {
            (AngleStatus::Good, 100.0)
        } else {
            let score = (100.0 * (1.0 - distance / self.config.max_deviation_deg)).max(0.0);
            let status = if distance <= self.config.warning_deviation_deg {
                AngleStatus::Warning
            } else {
                AngleStatus::Critical
            };
            (status, score)
        };
        AngleScore {
            angle: Some(angle),
            ideal_range: range,
            status,
            score: Some(score),
            deviation,
        }
    }

    /// Score a tick, falling back to the simplified path when too few joints are defined
    ///
    /// # Errors
    ///
    /// Returns `LowConfidence` when the primary joint is undefined and the
    /// full path lacks enough joints
    pub fn evaluate(
        &self,
        angles: &JointAngleSet,
        metrics: &DerivedMetrics,
        phase: Phase,
        profile: &ExerciseProfile,
    ) -> Result<ScoreCard, AnalysisError> {
        let required = profile.required_count();
        let defined = profile
            .required_joints()
            .filter(|joint| angles.angle(*joint).is_some())
            .count();
        let fraction = if required == 0 {
            0.0
        } else {
            defined as f64 / required as f64
        };

        if defined > 0 && fraction >= self.config.min_full_path_confidence {
            return Ok(self.score_full(angles, metrics, phase, profile));
        }
        self.score_simplified(angles, phase, profile)
            .ok_or(AnalysisError::LowConfidence {
                primary: profile.primary_joint(),
                defined,
                required,
            })
    }

    /// Score every required joint plus symmetry
    #[must_use]
    pub fn score_full(
        &self,
        angles: &JointAngleSet,
        metrics: &DerivedMetrics,
        phase: Phase,
        profile: &ExerciseProfile,
    ) -> ScoreCard {
        let angle_scores: BTreeMap<Joint, AngleScore> = profile
            .required_joints()
            .filter_map(|joint| {
                let range = profile.range_for(joint, phase)?;
                Some((joint, self.score_joint(angles.angle(joint), range)))
            })
            .collect();

        let mut findings = self.joint_findings(&angle_scores);
        findings.extend(
            metrics
                .symmetry
                .iter()
                .filter(|(_, delta)| **delta > self.config.symmetry_warning_deg)
                .map(|(joint, delta)| Finding {
                    severity: FeedbackSeverity::Warning,
                    magnitude: *delta,
                    joint: *joint,
                    message: format!(
                        "Uneven {joint}: left and right differ by {delta:.0}°, keep both sides moving together"
                    ),
                }),
        );

        ScoreCard {
            score: Self::weighted_mean(&angle_scores, angles),
            feedback: self.rank(findings),
            confidence: Self::confidence(angles, profile),
            angle_scores,
            degraded: false,
        }
    }

    /// Score only the primary joint
    ///
    /// Returns `None` when the primary joint is undefined.
    #[must_use]
    pub fn score_simplified(
        &self,
        angles: &JointAngleSet,
        phase: Phase,
        profile: &ExerciseProfile,
    ) -> Option<ScoreCard> {
        let primary = profile.primary_joint();
        let angle = angles.angle(primary)?;
        let range = profile.range_for(primary, phase)?;
        let angle_score = self.score_joint(Some(angle), range);
        let angle_scores = BTreeMap::from([(primary, angle_score)]);
        let findings = self.joint_findings(&angle_scores);

        Some(ScoreCard {
            score: angle_score.score.unwrap_or(0.0),
            feedback: self.rank(findings),
            confidence: Self::confidence(angles, profile),
            angle_scores,
            degraded: true,
        })
    }

    fn confidence(angles: &JointAngleSet, profile: &ExerciseProfile) -> f64 {
        let required = profile.required_count();
        if required == 0 {
            return 0.0;
        }
        let defined = profile
            .required_joints()
            .filter(|joint| angles.angle(*joint).is_some())
            .count();
        100.0 * defined as f64 / required as f64
    }

    fn weighted_mean(scores: &BTreeMap<Joint, AngleScore>, angles: &JointAngleSet) -> f64 {
        let (total, weight) = scores
            .iter()
            .filter_map(|(joint, s)| {
                let score = s.score?;
                let weight = angles.get(*joint).map_or(0.0, |m| m.confidence);
                Some((score * weight, weight))
            })
            .fold((0.0, 0.0), |(t, w), (s, x)| (t + s, w + x));
        if weight > 0.0 {
            (total / weight).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    fn joint_findings(&self, scores: &BTreeMap<Joint, AngleScore>) -> Vec<Finding> {
        scores
            .iter()
            .filter_map(|(joint, s)| {
                let severity = match s.status {
                    AngleStatus::Warning => FeedbackSeverity::Warning,
                    AngleStatus::Critical => FeedbackSeverity::Critical,
                    AngleStatus::Good | AngleStatus::Undefined => return None,
                };
                let angle = s.angle?;
                Some(Finding {
                    severity,
                    magnitude: s.deviation.abs(),
                    joint: *joint,
                    message: format!(
                        "{} ({joint} {angle:.0}°, target {:.0}-{:.0}°)",
                        cue(*joint, s.deviation < 0.0),
                        s.ideal_range.min,
                        s.ideal_range.max
                    ),
                })
            })
            .collect()
    }

    fn rank(&self, mut findings: Vec<Finding>) -> Vec<Feedback> {
        findings.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.magnitude.partial_cmp(&a.magnitude).unwrap_or(Ordering::Equal))
                .then_with(|| a.joint.cmp(&b.joint))
        });
        findings
            .into_iter()
            .take(self.config.max_feedback_items)
            .zip(1_u8..)
            .map(|(finding, priority)| Feedback {
                priority,
                message: finding.message,
                joint: Some(finding.joint),
                severity: finding.severity,
            })
            .collect()
    }
}

/// Coaching cue for a joint that is below (`too_low`) or above its range
const fn cue(joint: Joint, too_low: bool) -> &'static str {
    match (joint, too_low) {
        (Joint::Knee, true) => "Knees are bending past the target; stop a little higher",
        (Joint::Knee, false) => "Bend your knees more to reach depth",
        (Joint::Hip, true) => "Hips are folding too far; keep your chest up",
        (Joint::Hip, false) => "Push your hips back further",
        (Joint::Ankle, true) => "Ankles are flexing too far; keep your weight over midfoot",
        (Joint::Ankle, false) => "Let your knees travel forward over your toes",
        (Joint::Elbow, true) => "Elbows are bending too deep; control the bottom",
        (Joint::Elbow, false) => "Lower the bar further toward your chest",
        (Joint::Shoulder, true) => "Elbows are tucked too tight to your body",
        (Joint::Shoulder, false) => "Tuck your elbows in; they are flaring too wide",
        (Joint::Wrist, true) => "Keep your wrists straight",
        (Joint::Wrist, false) => "Stack your wrists over your elbows",
        (Joint::Back, true) => "Let your torso lean forward slightly",
        (Joint::Back, false) => "Keep your torso more upright",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdealRangeTable;
    use pierre_core::models::{BodySide, ExerciseType, JointMeasurement};

    fn squat() -> ExerciseProfile {
        IdealRangeTable::embedded()
            .unwrap()
            .profile(ExerciseType::Squat)
            .unwrap()
    }

    fn angles(values: &[(Joint, Option<f64>)]) -> JointAngleSet {
        JointAngleSet::from_measurements(values.iter().map(|(joint, angle)| {
            (
                *joint,
                JointMeasurement {
                    angle: *angle,
                    confidence: 0.9,
                    side: BodySide::Left,
                },
            )
        }))
    }

    #[test]
    fn test_joint_score_bands() {
        let scorer = FormScorer::default();
        let range = IdealRange::new(70.0, 100.0);
        let inside = scorer.score_joint(Some(80.0), range);
        let warning = scorer.score_joint(Some(110.0), range);
        let critical = scorer.score_joint(Some(140.0), range);
        let undefined = scorer.score_joint(None, range);

        assert_eq!(inside.status, AngleStatus::Good);
        assert!((inside.score.unwrap() - 100.0).abs() < f64::EPSILON);
        assert_eq!(warning.status, AngleStatus::Warning);
        assert!((warning.score.unwrap() - 100.0 * (1.0 - 10.0 / 30.0)).abs() < 1e-9);
        assert_eq!(critical.status, AngleStatus::Critical);
        assert!(critical.score.unwrap().abs() < f64::EPSILON);
        assert_eq!(undefined.status, AngleStatus::Undefined);
        assert!(undefined.score.is_none());
    }

    #[test]
    fn test_undefined_joints_excluded_from_mean() {
        let profile = squat();
        let set = angles(&[
            (Joint::Knee, Some(120.0)),
            (Joint::Hip, Some(120.0)),
            (Joint::Back, Some(20.0)),
            (Joint::Ankle, None),
        ]);
        let card = FormScorer::default()
            .evaluate(&set, &DerivedMetrics::default(), Phase::Eccentric, &profile)
            .unwrap();
        assert!((card.score - 100.0).abs() < 1e-9);
        assert!((card.confidence - 75.0).abs() < 1e-9);
        assert!(!card.degraded);
        assert_eq!(card.angle_scores[&Joint::Ankle].status, AngleStatus::Undefined);
    }

    #[test]
    fn test_simplified_path_and_low_confidence() {
        let profile = squat();
        let scorer = FormScorer::default();
        let primary_only = angles(&[
            (Joint::Knee, Some(85.0)),
            (Joint::Hip, None),
            (Joint::Back, None),
            (Joint::Ankle, None),
        ]);
        let card = scorer
            .evaluate(&primary_only, &DerivedMetrics::default(), Phase::Bottom, &profile)
            .unwrap();
        assert!(card.degraded);
        assert_eq!(card.angle_scores.len(), 1);

        let nothing = angles(&[
            (Joint::Knee, None),
            (Joint::Hip, None),
            (Joint::Back, Some(10.0)),
            (Joint::Ankle, None),
        ]);
        let err = scorer
            .evaluate(&nothing, &DerivedMetrics::default(), Phase::Bottom, &profile)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::LowConfidence { defined: 1, required: 4, .. }));
    }

    #[test]
    fn test_feedback_ordering_and_symmetry() {
        let profile = squat();
        let set = angles(&[
            (Joint::Knee, Some(105.0)),
            (Joint::Hip, Some(85.0)),
            (Joint::Back, Some(70.0)),
            (Joint::Ankle, Some(85.0)),
        ]);
        let metrics = DerivedMetrics {
            symmetry: BTreeMap::from([(Joint::Knee, 20.0)]),
            moment_arms: Vec::new(),
        };
        let card = FormScorer::default()
            .evaluate(&set, &metrics, Phase::Bottom, &profile)
            .unwrap();

        // back is 25° outside (critical), knee 5° (warning), knee asymmetry 20° (warning)
        assert_eq!(card.feedback[0].joint, Some(Joint::Back));
        assert_eq!(card.feedback[0].severity, FeedbackSeverity::Critical);
        assert_eq!(card.feedback[0].priority, 1);
        assert!(card.feedback[1].message.starts_with("Uneven knee"));
        assert_eq!(card.feedback[2].joint, Some(Joint::Knee));
        assert!(card.feedback.len() <= 5);
    }
}
