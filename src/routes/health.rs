// ABOUTME: Health check route handlers for service monitoring
// ABOUTME: Reports liveness, loaded exercises and the number of live analysis sessions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Health check routes for load balancers and monitoring

use crate::constants::{routes, service_names};
use crate::server::ServerResources;
use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use pierre_core::models::ExerciseType;
use serde_json::{json, Value};
use std::sync::Arc;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(routes::HEALTH, get(Self::handle_health))
            .route("/ready", get(Self::handle_ready))
            .with_state(resources)
    }

    async fn handle_health(State(resources): State<Arc<ServerResources>>) -> Json<Value> {
        let exercises: Vec<ExerciseType> = resources.pipeline.table().exercises().collect();
        Json(json!({
            "status": "healthy",
            "service": service_names::PIERRE_FORM_SERVER,
            "version": env!("CARGO_PKG_VERSION"),
            "active_sessions": resources.sessions.active_sessions(),
            "exercises": exercises,
            "timestamp": Utc::now().to_rfc3339()
        }))
    }

    async fn handle_ready() -> Json<Value> {
        Json(json!({
            "status": "ready",
            "timestamp": Utc::now().to_rfc3339()
        }))
    }
}
