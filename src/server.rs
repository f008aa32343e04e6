// ABOUTME: Shared server resources and the HTTP server hosting REST and WebSocket routes
// ABOUTME: Builds the axum router with tracing and CORS layers and runs it until shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// NOTE: All `.clone()` calls in this file are Safe - they are necessary for:
// - Arc resource clones handed to each route group

use crate::auth::AuthManager;
use crate::config::ServerConfig;
use crate::errors::{AppError, AppResult};
use crate::middleware::{create_request_span, setup_cors};
use crate::routes::{FormRoutes, HealthRoutes, WebSocketRoutes};
use crate::streaming::{AnalysisPipeline, SessionManager};
use crate::websocket::FormWebSocketHandler;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use pierre_intelligence::IdealRangeTable;
use pierre_providers::PoseEstimator;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Everything request handlers and session tasks share
pub struct ServerResources {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,
    /// Token validation
    pub auth_manager: Arc<AuthManager>,
    /// Analysis pipeline over the read-only range table
    pub pipeline: Arc<AnalysisPipeline>,
    /// Streaming sessions
    pub sessions: Arc<SessionManager>,
}

impl ServerResources {
    /// Wire resources from configuration, the range table and a pose model
    #[must_use]
    pub fn new(
        config: ServerConfig,
        table: Arc<IdealRangeTable>,
        pose: Arc<dyn PoseEstimator>,
    ) -> Self {
        let auth_manager = Arc::new(AuthManager::from_config(&config.auth));
        let pipeline = Arc::new(AnalysisPipeline::new(table, &config.analysis));
        let sessions = Arc::new(SessionManager::new(
            pipeline.clone(),
            pose,
            config.streaming,
        ));
        Self {
            config: Arc::new(config),
            auth_manager,
            pipeline,
            sessions,
        }
    }
}

/// HTTP server for form analysis
pub struct FormServer {
    resources: Arc<ServerResources>,
}

impl FormServer {
    /// Create a server over shared resources
    #[must_use]
    pub const fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    /// Shared resources
    #[must_use]
    pub const fn resources(&self) -> &Arc<ServerResources> {
        &self.resources
    }

    /// Build the complete router
    pub fn router(&self) -> Router {
        let handler = Arc::new(FormWebSocketHandler::new(
            self.resources.sessions.clone(),
            self.resources.auth_manager.clone(),
        ));

        Router::new()
            .merge(HealthRoutes::routes(self.resources.clone()))
            .merge(FormRoutes::routes(self.resources.clone()))
            .merge(WebSocketRoutes::routes(handler))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|request: &Request<Body>| create_request_span(request)),
            )
            .layer(setup_cors(&self.resources.config))
    }

    /// Serve on `port` until ctrl-c, then close every session
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be bound or the server fails
    pub async fn run(self, port: u16) -> AppResult<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
        info!(address = %addr, "Form analysis server listening");

        let sessions = self.resources.sessions.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                if let Err(e) = signal::ctrl_c().await {
                    warn!(error = %e, "Failed to listen for shutdown signal");
                }
                info!(
                    active_sessions = sessions.active_sessions(),
                    "Shutdown requested, closing sessions"
                );
                sessions.shutdown();
            })
            .await
            .map_err(|e| AppError::internal(format!("Server error: {e}")))
    }
}
