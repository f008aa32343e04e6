// ABOUTME: Tuning thresholds for phase detection, scoring and camera diagnostics
// ABOUTME: Defaults come from pierre-core constants and can be overridden from the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use pierre_core::constants::{camera, phase, scoring, skeleton};
use serde::{Deserialize, Serialize};
use std::env;

use super::error::ConfigError;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Phase detector thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseDetectorConfig {
    /// Steps smaller than this neither extend nor break a run
    pub noise_tolerance_deg: f64,
    /// Displacement a debounced run needs
    pub min_transition_delta_deg: f64,
    /// Displacement that commits a run immediately
    pub decisive_delta_deg: f64,
    /// Snapshots a debounced run must span
    pub debounce_count: usize,
    /// Non-decreasing snapshots that count as a local minimum
    pub local_minimum_snapshots: usize,
    /// Band below the reference top angle that counts as top
    pub top_tolerance_deg: f64,
    /// Stillness after which any phase becomes rest
    pub rest_timeout_ms: u64,
}

impl Default for PhaseDetectorConfig {
    fn default() -> Self {
        Self {
            noise_tolerance_deg: phase::NOISE_TOLERANCE_DEG,
            min_transition_delta_deg: phase::MIN_TRANSITION_DELTA_DEG,
            decisive_delta_deg: phase::DECISIVE_DELTA_DEG,
            debounce_count: phase::DEBOUNCE_COUNT,
            local_minimum_snapshots: phase::LOCAL_MINIMUM_SNAPSHOTS,
            top_tolerance_deg: phase::TOP_TOLERANCE_DEG,
            rest_timeout_ms: phase::REST_TIMEOUT_MS,
        }
    }
}

impl PhaseDetectorConfig {
    /// Load phase detector thresholds from environment
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            noise_tolerance_deg: env_or("FORM_PHASE_NOISE_TOLERANCE_DEG", defaults.noise_tolerance_deg),
            min_transition_delta_deg: env_or(
                "FORM_PHASE_MIN_TRANSITION_DELTA_DEG",
                defaults.min_transition_delta_deg,
            ),
            decisive_delta_deg: env_or("FORM_PHASE_DECISIVE_DELTA_DEG", defaults.decisive_delta_deg),
            debounce_count: env_or("FORM_PHASE_DEBOUNCE_COUNT", defaults.debounce_count),
            local_minimum_snapshots: env_or(
                "FORM_PHASE_LOCAL_MINIMUM_SNAPSHOTS",
                defaults.local_minimum_snapshots,
            ),
            top_tolerance_deg: env_or("FORM_PHASE_TOP_TOLERANCE_DEG", defaults.top_tolerance_deg),
            rest_timeout_ms: env_or("FORM_PHASE_REST_TIMEOUT_MS", defaults.rest_timeout_ms),
        }
    }

    /// Validate threshold ordering
    ///
    /// # Errors
    ///
    /// Returns an error if thresholds are non-positive or inverted
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.noise_tolerance_deg < 0.0 {
            return Err(ConfigError::ValueOutOfRange(
                "noise_tolerance_deg must be non-negative",
            ));
        }
        if self.min_transition_delta_deg <= self.noise_tolerance_deg {
            return Err(ConfigError::ValueOutOfRange(
                "min_transition_delta_deg must exceed noise_tolerance_deg",
            ));
        }
        if self.decisive_delta_deg < self.min_transition_delta_deg {
            return Err(ConfigError::ValueOutOfRange(
                "decisive_delta_deg must be at least min_transition_delta_deg",
            ));
        }
        if self.debounce_count < 2 || self.local_minimum_snapshots == 0 {
            return Err(ConfigError::ValueOutOfRange(
                "debounce_count must be at least 2 and local_minimum_snapshots positive",
            ));
        }
        if self.rest_timeout_ms == 0 {
            return Err(ConfigError::ValueOutOfRange("rest_timeout_ms must be positive"));
        }
        Ok(())
    }
}

/// Form scorer thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Deviation at which a joint scores 0
    pub max_deviation_deg: f64,
    /// Deviation up to which a joint is a warning
    pub warning_deviation_deg: f64,
    /// Left/right difference that triggers an uneven warning
    pub symmetry_warning_deg: f64,
    /// Feedback items per result
    pub max_feedback_items: usize,
    /// Fraction of required joints the full path needs
    pub min_full_path_confidence: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_deviation_deg: scoring::MAX_DEVIATION_DEG,
            warning_deviation_deg: scoring::WARNING_DEVIATION_DEG,
            symmetry_warning_deg: scoring::SYMMETRY_WARNING_DEG,
            max_feedback_items: scoring::MAX_FEEDBACK_ITEMS,
            min_full_path_confidence: scoring::MIN_FULL_PATH_CONFIDENCE,
        }
    }
}

impl ScoringConfig {
    /// Load scoring thresholds from environment
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_deviation_deg: env_or("FORM_SCORING_MAX_DEVIATION_DEG", defaults.max_deviation_deg),
            warning_deviation_deg: env_or(
                "FORM_SCORING_WARNING_DEVIATION_DEG",
                defaults.warning_deviation_deg,
            ),
            symmetry_warning_deg: env_or(
                "FORM_SCORING_SYMMETRY_WARNING_DEG",
                defaults.symmetry_warning_deg,
            ),
            max_feedback_items: env_or("FORM_SCORING_MAX_FEEDBACK_ITEMS", defaults.max_feedback_items),
            min_full_path_confidence: env_or(
                "FORM_SCORING_MIN_FULL_PATH_CONFIDENCE",
                defaults.min_full_path_confidence,
            ),
        }
    }

    /// Validate scoring thresholds
    ///
    /// # Errors
    ///
    /// Returns an error if deviations are non-positive or the confidence fraction is outside [0, 1]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_deviation_deg <= 0.0 || self.warning_deviation_deg <= 0.0 {
            return Err(ConfigError::ValueOutOfRange("scoring deviations must be positive"));
        }
        if self.warning_deviation_deg > self.max_deviation_deg {
            return Err(ConfigError::ValueOutOfRange(
                "warning_deviation_deg must not exceed max_deviation_deg",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_full_path_confidence) {
            return Err(ConfigError::ValueOutOfRange(
                "min_full_path_confidence must be within 0-1",
            ));
        }
        if self.max_feedback_items == 0 {
            return Err(ConfigError::ValueOutOfRange("max_feedback_items must be positive"));
        }
        Ok(())
    }
}

/// Camera diagnostic thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Landmarks strictly above this visibility count as seen
    pub visibility_threshold: f64,
    /// Smallest acceptable box width
    pub min_box_width: f64,
    /// Smallest acceptable box height
    pub min_box_height: f64,
    /// Largest acceptable box width
    pub max_box_width: f64,
    /// Largest acceptable box height
    pub max_box_height: f64,
    /// Largest acceptable horizontal center deviation
    pub max_center_deviation: f64,
    /// Smallest shoulder/hip width ratio for a side view
    pub side_view_min_ratio: f64,
    /// Vertical center below which the camera is too low
    pub vertical_center_low: f64,
    /// Vertical center above which the camera is too high
    pub vertical_center_high: f64,
    /// Visible ratio for full visibility
    pub full_visibility_ratio: f64,
    /// Visible ratio for partial visibility
    pub partial_visibility_ratio: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: skeleton::VISIBILITY_THRESHOLD,
            min_box_width: camera::MIN_BOX_WIDTH,
            min_box_height: camera::MIN_BOX_HEIGHT,
            max_box_width: camera::MAX_BOX_WIDTH,
            max_box_height: camera::MAX_BOX_HEIGHT,
            max_center_deviation: camera::MAX_CENTER_DEVIATION,
            side_view_min_ratio: camera::SIDE_VIEW_MIN_RATIO,
            vertical_center_low: camera::VERTICAL_CENTER_LOW,
            vertical_center_high: camera::VERTICAL_CENTER_HIGH,
            full_visibility_ratio: camera::FULL_VISIBILITY_RATIO,
            partial_visibility_ratio: camera::PARTIAL_VISIBILITY_RATIO,
        }
    }
}
