// ABOUTME: REST fallback for form analysis when a WebSocket cannot be held open
// ABOUTME: Single-shot analysis, on-demand camera diagnostics and the loaded range table
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Form analysis routes
//!
//! `analyze` and `camera-check` require a Bearer token. Both run the same
//! pipeline code as streaming sessions.

use crate::{
    auth::Claims,
    constants::routes,
    errors::{AppError, AppResult},
    logging::FormLogger,
    server::ServerResources,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::AUTHORIZATION, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use pierre_core::models::{
    AnalysisResult, Calibration, CameraSetup, CameraView, ExerciseType, InputIssue, LandmarkFrame,
    LandmarkInput,
};
use pierre_intelligence::IdealRangeTable;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Body of `POST /api/form/analyze`
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    /// Exercise name, parsed leniently
    pub exercise_type: String,
    /// Frame number echoed in the result
    #[serde(default)]
    pub sequence: u64,
    /// Capture time echoed in the result
    #[serde(default)]
    pub timestamp_ms: u64,
    /// Up to 33 landmarks
    pub landmarks: Vec<LandmarkInput>,
    /// Optional calibration
    #[serde(default)]
    pub calibration: Calibration,
}

/// Body of `POST /api/form/camera-check`
#[derive(Debug, Clone, Deserialize)]
pub struct CameraCheckRequest {
    /// Exercise whose preferred view is checked; side view when omitted
    #[serde(default)]
    pub exercise_type: Option<String>,
    /// Up to 33 landmarks
    pub landmarks: Vec<LandmarkInput>,
}

/// Response of `POST /api/form/camera-check`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraCheckResponse {
    /// Diagnostics for the submitted landmarks
    pub setup: CameraSetup,
    /// Suggested adjustment when placement is not ready
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Problems found while normalizing the landmarks
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<InputIssue>,
}

/// Form analysis routes implementation
pub struct FormRoutes;

impl FormRoutes {
    /// Create the REST fallback routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(routes::FORM_ANALYZE, post(Self::handle_analyze))
            .route(routes::FORM_CAMERA_CHECK, post(Self::handle_camera_check))
            .route(routes::FORM_EXERCISES, get(Self::handle_exercises))
            .with_state(resources)
    }

    fn authenticate(headers: &HeaderMap, resources: &ServerResources) -> AppResult<Claims> {
        let header = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok());
        match resources.auth_manager.authenticate(header) {
            Ok(claims) => {
                FormLogger::log_auth_event("rest", Some(&claims.sub), true);
                Ok(claims)
            }
            Err(e) => {
                FormLogger::log_auth_event("rest", None, false);
                Err(e)
            }
        }
    }

    fn body<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
        body.map(|Json(inner)| inner)
            .map_err(|e| AppError::input(format!("Invalid request body: {e}")))
    }

    /// Handle POST /api/form/analyze - Run one analysis tick
    async fn handle_analyze(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: Result<Json<AnalyzeRequest>, JsonRejection>,
    ) -> AppResult<Json<AnalysisResult>> {
        let claims = Self::authenticate(&headers, &resources)?;
        let request = Self::body(body)?;
        let exercise = request.exercise_type.parse::<ExerciseType>()?;

        let result = resources.pipeline.analyze_once(
            &claims.sub,
            exercise,
            request.calibration,
            request.sequence,
            request.timestamp_ms,
            &request.landmarks,
        )?;
        debug!(
            user_id = %claims.sub,
            exercise = %exercise,
            score = result.score,
            processing_time_ms = result.processing_time_ms,
            "Single-shot analysis complete"
        );
        Ok(Json(result))
    }

    /// Handle POST /api/form/camera-check - Camera diagnostics for one frame
    async fn handle_camera_check(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: Result<Json<CameraCheckRequest>, JsonRejection>,
    ) -> AppResult<Json<CameraCheckResponse>> {
        Self::authenticate(&headers, &resources)?;
        let request = Self::body(body)?;

        let view = match request.exercise_type.as_deref() {
            Some(name) => resources.pipeline.profile(name.parse::<ExerciseType>()?)?.view(),
            None => CameraView::Side,
        };
        let normalized = LandmarkFrame::normalize(0, 0, &request.landmarks);
        let setup = resources.pipeline.camera_check(&normalized.frame, view);

        Ok(Json(CameraCheckResponse {
            setup,
            hint: setup.hint().map(str::to_owned),
            issues: normalized.issues,
        }))
    }

    /// Handle GET /api/form/exercises - The loaded ideal-range table
    async fn handle_exercises(
        State(resources): State<Arc<ServerResources>>,
    ) -> Json<IdealRangeTable> {
        Json(resources.pipeline.table().clone())
    }
}
