// ABOUTME: WebSocket route for streaming form analysis
// ABOUTME: Upgrades /ws/form connections and hands them to the form socket handler
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::routes;
use crate::websocket::FormWebSocketHandler;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::{debug, info};

/// WebSocket routes implementation
pub struct WebSocketRoutes;

impl WebSocketRoutes {
    /// Create the streaming analysis route with an injected handler
    pub fn routes(handler: Arc<FormWebSocketHandler>) -> Router {
        Router::new()
            .route(routes::FORM_WEBSOCKET, get(Self::handle_websocket))
            .with_state(handler)
    }

    /// Upgrade the connection; authentication happens on the `start` message
    async fn handle_websocket(
        ws: WebSocketUpgrade,
        State(handler): State<Arc<FormWebSocketHandler>>,
    ) -> impl IntoResponse {
        info!(
            active_sessions = handler.manager().active_sessions(),
            "New form analysis connection request"
        );

        ws.on_upgrade(move |socket: WebSocket| async move {
            debug!("WebSocket upgraded, delegating to form handler");
            handler.handle_connection(socket).await;
        })
    }
}
