// ABOUTME: Integration tests for the REST form analysis, camera-check and health routes
// ABOUTME: Exercises authentication, request validation and response shapes through the full router
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use axum::Router;
use common::{squat_landmarks, squat_landmarks_hiding, test_resources, token};
use helpers::axum_test::AxumTestRequest;
use pierre_core::models::PoseLandmark;
use pierre_form_server::server::{FormServer, ServerResources};
use serde_json::{json, Value};
use std::sync::Arc;

fn app() -> (Router, Arc<ServerResources>) {
    let resources = test_resources();
    let router = FormServer::new(resources.clone()).router();
    (router, resources)
}

fn analyze_body(exercise: &str, knee_deg: f64) -> Value {
    json!({
        "exercise_type": exercise,
        "sequence": 12,
        "timestamp_ms": 1_200,
        "landmarks": squat_landmarks(knee_deg),
        "calibration": { "reference_height_cm": 178.0 }
    })
}

#[tokio::test]
async fn test_analyze_returns_camel_case_result() {
    let (app, resources) = app();

    let body: Value = AxumTestRequest::post("/api/form/analyze")
        .bearer(&token(&resources, "athlete-1"))
        .json(&analyze_body("squat", 150.0))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();

    assert_eq!(body["sequence"], 12);
    assert_eq!(body["timestampMs"], 1_200);
    assert_eq!(body["exerciseType"], "squat");
    assert_eq!(body["phase"], "setup");
    assert_eq!(body["repCount"], 0);
    assert_eq!(body["degraded"], false);
    let score = body["score"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&score));
    assert!(body["smoothedScore"].is_number());
    assert!(body["angleScores"]["knee"].is_object());
    assert!(body["feedback"].is_array());
}

#[tokio::test]
async fn test_analyze_accepts_exercise_aliases() {
    let (app, resources) = app();

    let body: Value = AxumTestRequest::post("/api/form/analyze")
        .bearer(&token(&resources, "athlete-1"))
        .json(&analyze_body("Squat", 120.0))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["exerciseType"], "squat");
}

#[tokio::test]
async fn test_analyze_requires_token() {
    let (app, _) = app();

    let code = AxumTestRequest::post("/api/form/analyze")
        .json(&analyze_body("squat", 150.0))
        .send(app)
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .error_code();
    assert_eq!(code, "AUTH_REQUIRED");
}

#[tokio::test]
async fn test_analyze_rejects_forged_token() {
    let (app, _) = app();

    let code = AxumTestRequest::post("/api/form/analyze")
        .bearer("not.a.token")
        .json(&analyze_body("squat", 150.0))
        .send(app)
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .error_code();
    assert_eq!(code, "AUTH_INVALID");
}

#[tokio::test]
async fn test_malformed_body_is_input_error() {
    let (app, resources) = app();

    let code = AxumTestRequest::post("/api/form/analyze")
        .bearer(&token(&resources, "athlete-1"))
        .raw_json("{\"exercise_type\": \"squat\", \"landmarks\": ")
        .send(app)
        .await
        .assert_status(StatusCode::BAD_REQUEST)
        .error_code();
    assert_eq!(code, "INPUT_ERROR");
}

#[tokio::test]
async fn test_unknown_exercise_is_rejected() {
    let (app, resources) = app();

    let code = AxumTestRequest::post("/api/form/analyze")
        .bearer(&token(&resources, "athlete-1"))
        .json(&analyze_body("pistol_squat", 150.0))
        .send(app)
        .await
        .assert_status(StatusCode::BAD_REQUEST)
        .error_code();
    assert_eq!(code, "UNSUPPORTED_EXERCISE");
}

#[tokio::test]
async fn test_empty_landmarks_are_input_error() {
    let (app, resources) = app();

    let code = AxumTestRequest::post("/api/form/analyze")
        .bearer(&token(&resources, "athlete-1"))
        .json(&json!({ "exercise_type": "squat", "landmarks": [] }))
        .send(app)
        .await
        .assert_status(StatusCode::BAD_REQUEST)
        .error_code();
    assert_eq!(code, "INPUT_ERROR");
}

#[tokio::test]
async fn test_partial_frame_is_low_confidence() {
    let (app, resources) = app();
    let partial: Vec<_> = squat_landmarks(150.0).into_iter().take(20).collect();

    let code = AxumTestRequest::post("/api/form/analyze")
        .bearer(&token(&resources, "athlete-1"))
        .json(&json!({ "exercise_type": "squat", "landmarks": partial }))
        .send(app)
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
        .error_code();
    assert_eq!(code, "LOW_CONFIDENCE");
}

#[tokio::test]
async fn test_camera_check_reports_ready_placement() {
    let (app, resources) = app();

    let body: Value = AxumTestRequest::post("/api/form/camera-check")
        .bearer(&token(&resources, "athlete-1"))
        .json(&json!({ "exercise_type": "squat", "landmarks": squat_landmarks(170.0) }))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();

    assert_eq!(body["setup"]["ready"], true);
    assert_eq!(body["setup"]["visibility"], "full");
    assert!(body.get("hint").is_none());
}

#[tokio::test]
async fn test_camera_check_hints_when_body_hidden() {
    let (app, resources) = app();
    let hidden: Vec<PoseLandmark> = PoseLandmark::ALL[..20].to_vec();

    let body: Value = AxumTestRequest::post("/api/form/camera-check")
        .bearer(&token(&resources, "athlete-1"))
        .json(&json!({ "landmarks": squat_landmarks_hiding(170.0, &hidden) }))
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();

    assert_eq!(body["setup"]["ready"], false);
    assert_eq!(body["setup"]["visibility"], "poor");
    assert!(body["hint"].is_string());
}

#[tokio::test]
async fn test_exercises_lists_loaded_table() {
    let (app, _) = app();

    let body: Value = AxumTestRequest::get("/api/form/exercises")
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();

    assert_eq!(body["squat"]["primary_joint"], "knee");
    assert_eq!(body["squat"]["view"], "side");
    assert!(body["deadlift"].is_object());
    assert!(body["bench_press"].is_object());
}

#[tokio::test]
async fn test_health_reports_sessions_and_exercises() {
    let (app, _) = app();

    let body: Value = AxumTestRequest::get("/health")
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "pierre-form-server");
    assert_eq!(body["active_sessions"], 0);
    assert_eq!(body["exercises"].as_array().unwrap().len(), 3);
}
