// ABOUTME: Shared test utilities and fixtures for form analysis integration tests
// ABOUTME: Provides quiet logging, synthetic squat landmarks and wired server resources
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `pierre_form_server`

use pierre_core::models::{LandmarkFrame, LandmarkInput, PoseLandmark};
use pierre_form_server::config::ServerConfig;
use pierre_form_server::server::ServerResources;
use pierre_intelligence::IdealRangeTable;
use pierre_providers::{PoseEstimator, UnconfiguredPoseEstimator};
use std::sync::{Arc, Once};

static INIT_LOGGER: Once = Once::new();

/// Secret shared by test token issuers and validators
pub const TEST_JWT_SECRET: &str = "form-test-secret";

/// Visibility of landmarks the fixture treats as seen
pub const VISIBLE: f64 = 0.9;

/// Visibility of landmarks the fixture hides
pub const HIDDEN: f64 = 0.1;

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Side-view squatter with the given knee angle, every landmark visible
///
/// Shin vertical, thigh swinging back from the knee, torso upright, arms
/// straight forward. Left and right sides are offset 0.04 horizontally so
/// both sides measure the same angles.
pub fn squat_landmarks(knee_deg: f64) -> Vec<LandmarkInput> {
    squat_landmarks_hiding(knee_deg, &[])
}

/// Squatter fixture with some landmarks reported at low visibility
pub fn squat_landmarks_hiding(knee_deg: f64, hidden: &[PoseLandmark]) -> Vec<LandmarkInput> {
    use PoseLandmark as P;

    let theta = knee_deg.to_radians();
    let ankle = (0.45, 0.85);
    let knee = (0.45, 0.65);
    let hip = (knee.0 - 0.2 * theta.sin(), knee.1 + 0.2 * theta.cos());
    let shoulder = (hip.0, hip.1 - 0.3);
    let elbow = (shoulder.0 + 0.15, shoulder.1);
    let wrist = (shoulder.0 + 0.3, shoulder.1);
    let hand = (wrist.0 + 0.02, wrist.1);
    let nose = (shoulder.0 + 0.05, shoulder.1 - 0.1);
    let eye = (nose.0, nose.1 - 0.02);
    let ear = (nose.0 - 0.05, nose.1);
    let mouth = (nose.0, nose.1 + 0.02);
    let heel = (ankle.0 - 0.05, ankle.1 + 0.02);
    let foot = (ankle.0 + 0.12, ankle.1 + 0.02);

    PoseLandmark::ALL
        .iter()
        .map(|point| {
            let (base, side) = match point {
                P::Nose => (nose, 0.0),
                P::LeftEyeInner | P::LeftEye | P::LeftEyeOuter => (eye, -1.0),
                P::RightEyeInner | P::RightEye | P::RightEyeOuter => (eye, 1.0),
                P::LeftEar => (ear, -1.0),
                P::RightEar => (ear, 1.0),
                P::MouthLeft => (mouth, -1.0),
                P::MouthRight => (mouth, 1.0),
                P::LeftShoulder => (shoulder, -1.0),
                P::RightShoulder => (shoulder, 1.0),
                P::LeftElbow => (elbow, -1.0),
                P::RightElbow => (elbow, 1.0),
                P::LeftWrist => (wrist, -1.0),
                P::RightWrist => (wrist, 1.0),
                P::LeftPinky | P::LeftIndex | P::LeftThumb => (hand, -1.0),
                P::RightPinky | P::RightIndex | P::RightThumb => (hand, 1.0),
                P::LeftHip => (hip, -1.0),
                P::RightHip => (hip, 1.0),
                P::LeftKnee => (knee, -1.0),
                P::RightKnee => (knee, 1.0),
                P::LeftAnkle => (ankle, -1.0),
                P::RightAnkle => (ankle, 1.0),
                P::LeftHeel => (heel, -1.0),
                P::RightHeel => (heel, 1.0),
                P::LeftFootIndex => (foot, -1.0),
                P::RightFootIndex => (foot, 1.0),
            };
            let visibility = if hidden.contains(point) { HIDDEN } else { VISIBLE };
            LandmarkInput {
                id: Some(u32::try_from(point.index()).unwrap()),
                x: base.0 + side * 0.02,
                y: base.1,
                z: 0.0,
                visibility: Some(visibility),
            }
        })
        .collect()
}

/// Normalized squat frame at 100 ms spacing
pub fn squat_frame(sequence: u64, knee_deg: f64) -> LandmarkFrame {
    LandmarkFrame::normalize(sequence, sequence * 100, &squat_landmarks(knee_deg)).frame
}

/// Configuration with a fixed secret and default streaming cadence
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.auth.jwt_secret = Some(TEST_JWT_SECRET.to_owned());
    config
}

/// Server resources over the embedded range table with no pose model
pub fn test_resources() -> Arc<ServerResources> {
    test_resources_with(test_config(), Arc::new(UnconfiguredPoseEstimator))
}

/// Server resources with explicit configuration and pose model
pub fn test_resources_with(
    config: ServerConfig,
    pose: Arc<dyn PoseEstimator>,
) -> Arc<ServerResources> {
    init_test_logging();
    let table = IdealRangeTable::embedded().expect("embedded range table");
    Arc::new(ServerResources::new(config, Arc::new(table), pose))
}

/// Signed session token for a user
pub fn token(resources: &ServerResources, user_id: &str) -> String {
    resources
        .auth_manager
        .generate_token(user_id)
        .expect("token generation")
}
