// ABOUTME: Camera placement diagnostics from the bounding box of visible landmarks
// ABOUTME: Classifies distance, centering, orientation for the preferred view and visibility
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Camera setup evaluator
//!
//! Works on partial frames too, so it can guide the athlete into view before
//! the full skeleton is detected.

#![allow(clippy::cast_precision_loss)] // Safe: landmark counts are at most 33

use pierre_core::constants::{camera::GOOD_CLASSIFICATION_BONUS, skeleton::LANDMARK_COUNT};
use pierre_core::models::{
    CameraAngle, CameraPosition, CameraSetup, CameraView, Landmark, LandmarkFrame, PoseLandmark,
    VisibilityLevel,
};

use crate::config::CameraConfig;

/// Hip widths narrower than this make the shoulder/hip ratio meaningless
const MIN_HIP_WIDTH: f64 = 1e-3;

#[derive(Debug, Clone, Copy)]
struct BoundingBox {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl BoundingBox {
    fn around<'a>(landmarks: impl IntoIterator<Item = &'a Landmark>) -> Option<Self> {
        landmarks.into_iter().fold(None, |acc, l| {
            Some(acc.map_or(
                Self {
                    min_x: l.x,
                    max_x: l.x,
                    min_y: l.y,
                    max_y: l.y,
                },
                |b: Self| Self {
                    min_x: b.min_x.min(l.x),
                    max_x: b.max_x.max(l.x),
                    min_y: b.min_y.min(l.y),
                    max_y: b.max_y.max(l.y),
                },
            ))
        })
    }

    fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Evaluates whether the camera is placed well enough to analyze an exercise
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraSetupEvaluator {
    config: CameraConfig,
}

impl CameraSetupEvaluator {
    /// Create an evaluator with explicit thresholds
    #[must_use]
    pub const fn new(config: CameraConfig) -> Self {
        Self { config }
    }

    /// Diagnose a frame for an exercise's preferred view
    #[must_use]
    pub fn evaluate(&self, frame: &LandmarkFrame, view: CameraView) -> CameraSetup {
        let threshold = self.config.visibility_threshold;
        let visible: Vec<&Landmark> = frame.iter().filter(|l| l.visibility > threshold).collect();
        let Some(bounds) = BoundingBox::around(visible.iter().copied()) else {
            return CameraSetup::nothing_visible();
        };

        let position = self.classify_position(&bounds);
        let angle = match view {
            CameraView::Side => self
                .side_view_ratio(frame)
                .map_or_else(
                    || self.classify_vertical(&bounds),
                    |ratio| {
                        if ratio < self.config.side_view_min_ratio {
                            CameraAngle::Tilted
                        } else {
                            CameraAngle::Good
                        }
                    },
                ),
            CameraView::Front | CameraView::ThreeQuarter => self.classify_vertical(&bounds),
        };

        let ratio = visible.len() as f64 / LANDMARK_COUNT as f64;
        let visibility = if ratio >= self.config.full_visibility_ratio {
            VisibilityLevel::Full
        } else if ratio >= self.config.partial_visibility_ratio {
            VisibilityLevel::Partial
        } else {
            VisibilityLevel::Poor
        };

        let mut score = ratio;
        if position == CameraPosition::Good {
            score += GOOD_CLASSIFICATION_BONUS;
        }
        if angle == CameraAngle::Good {
            score += GOOD_CLASSIFICATION_BONUS;
        }

        CameraSetup {
            position,
            angle,
            visibility,
            confidence: score.min(1.0) * 100.0,
            ready: position == CameraPosition::Good
                && angle == CameraAngle::Good
                && visibility != VisibilityLevel::Poor,
        }
    }

    fn classify_position(&self, bounds: &BoundingBox) -> CameraPosition {
        let (width, height) = (bounds.width(), bounds.height());
        if width < self.config.min_box_width || height < self.config.min_box_height {
            CameraPosition::TooFar
        } else if width > self.config.max_box_width || height > self.config.max_box_height {
            CameraPosition::TooClose
        } else if (bounds.center().0 - 0.5).abs() > self.config.max_center_deviation {
            CameraPosition::OffCenter
        } else {
            CameraPosition::Good
        }
    }

    fn classify_vertical(&self, bounds: &BoundingBox) -> CameraAngle {
        let center_y = bounds.center().1;
        if center_y < self.config.vertical_center_low {
            CameraAngle::TooLow
        } else if center_y > self.config.vertical_center_high {
            CameraAngle::TooHigh
        } else {
            CameraAngle::Good
        }
    }

    /// Shoulder width over hip width, when all four landmarks are seen
    fn side_view_ratio(&self, frame: &LandmarkFrame) -> Option<f64> {
        let threshold = self.config.visibility_threshold;
        let seen = |p| frame.get(p).filter(|l| l.visibility > threshold);
        let shoulders =
            (seen(PoseLandmark::LeftShoulder)?.x - seen(PoseLandmark::RightShoulder)?.x).abs();
        let hips = (seen(PoseLandmark::LeftHip)?.x - seen(PoseLandmark::RightHip)?.x).abs();
        (hips >= MIN_HIP_WIDTH).then(|| shoulders / hips)
    }
}
