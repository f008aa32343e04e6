// ABOUTME: WebSocket connection handler for streaming form analysis
// ABOUTME: Parses client messages, authenticates session starts and relays session output
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// NOTE: All `.clone()` calls in this file are Safe - they are necessary for:
// - Arc resource clones shared between the router and connection handlers

//! `WebSocket` support for streaming form analysis
//!
//! A connection attaches to at most one session at a time. Frames go to
//! the session's latest-frame slot, control messages to its command queue,
//! and everything the session emits is written back as JSON text.

use crate::auth::AuthManager;
use crate::errors::{AppError, AppResult};
use crate::logging::FormLogger;
use crate::streaming::{
    ClientMessage, InboundFrame, ServerMessage, SessionCommand, SessionLink, SessionManager,
};
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use pierre_core::models::ExerciseType;
use std::future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Serves streaming form analysis connections
#[derive(Clone)]
pub struct FormWebSocketHandler {
    manager: Arc<SessionManager>,
    auth_manager: Arc<AuthManager>,
}

impl FormWebSocketHandler {
    /// Create a handler over the shared session manager
    #[must_use]
    pub const fn new(manager: Arc<SessionManager>, auth_manager: Arc<AuthManager>) -> Self {
        Self {
            manager,
            auth_manager,
        }
    }

    /// Session manager behind this handler
    #[must_use]
    pub const fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Handle one upgraded connection until it closes
    pub async fn handle_connection(&self, ws: WebSocket) {
        let (mut ws_tx, mut ws_rx) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        let connection_id = Uuid::new_v4();
        let mut link: Option<SessionLink> = None;

        // Spawn task to forward messages to `WebSocket`
        let ws_send_task = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if ws_tx.send(message).await.is_err() {
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                incoming = ws_rx.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        self.handle_text(&text, &mut link, &tx).await;
                    }
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
                outgoing = next_outbound(&mut link) => match outgoing {
                    Some(message) => send_json(&tx, &message),
                    None => {
                        debug!(connection_id = %connection_id, "Session ended, connection stays open");
                        link = None;
                    }
                },
            }
        }

        // Dropping the link detaches the session so it can be resumed
        if let Some(link) = link.take() {
            debug!(
                connection_id = %connection_id,
                session_id = %link.session_id(),
                "Connection closed, detaching session"
            );
        }
        ws_send_task.abort();
    }

    async fn handle_text(
        &self,
        text: &str,
        link: &mut Option<SessionLink>,
        tx: &mpsc::UnboundedSender<Message>,
    ) {
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                let error = AppError::invalid_message(format!("Invalid message format: {e}"));
                send_json(tx, &error.into());
                return;
            }
        };

        if let Err(error) = self.dispatch(message, link, tx).await {
            send_json(tx, &error.into());
        }
    }

    async fn dispatch(
        &self,
        message: ClientMessage,
        link: &mut Option<SessionLink>,
        tx: &mpsc::UnboundedSender<Message>,
    ) -> AppResult<()> {
        match message {
            ClientMessage::Start {
                token,
                exercise_type,
                session_id,
            } => {
                if link.is_some() {
                    return Err(AppError::invalid_message(
                        "A session is already attached to this connection",
                    ));
                }
                *link = Some(self.start(token.as_deref(), &exercise_type, session_id).await?);
                Ok(())
            }
            ClientMessage::Ping => {
                send_json(tx, &ServerMessage::Pong);
                Ok(())
            }
            ClientMessage::Frame {
                sequence,
                timestamp_ms,
                image,
            } => {
                submit(
                    attached(link.as_ref())?,
                    InboundFrame::Image {
                        sequence,
                        timestamp_ms,
                        image,
                    },
                );
                Ok(())
            }
            ClientMessage::Landmarks {
                sequence,
                timestamp_ms,
                landmarks,
            } => {
                submit(
                    attached(link.as_ref())?,
                    InboundFrame::Landmarks {
                        sequence,
                        timestamp_ms,
                        landmarks,
                    },
                );
                Ok(())
            }
            ClientMessage::Calibration {
                reference_height_cm,
                camera_angle_deg,
            } => attached(link.as_ref())?.command(SessionCommand::Calibrate {
                reference_height_cm,
                camera_angle_deg,
            }),
            ClientMessage::Settings {
                exercise_type,
                analysis_interval_ms,
            } => {
                let session = attached(link.as_ref())?;
                let exercise = exercise_type
                    .as_deref()
                    .map(str::parse::<ExerciseType>)
                    .transpose()?;
                session.command(SessionCommand::Settings {
                    exercise,
                    analysis_interval_ms,
                })
            }
            ClientMessage::CameraCheck => {
                attached(link.as_ref())?.command(SessionCommand::CameraCheck)
            }
            ClientMessage::Stop => attached(link.as_ref())?.command(SessionCommand::Stop),
        }
    }

    async fn start(
        &self,
        token: Option<&str>,
        exercise_type: &str,
        session_id: Option<Uuid>,
    ) -> AppResult<SessionLink> {
        let claims = match self.auth_manager.authenticate(token) {
            Ok(claims) => {
                FormLogger::log_auth_event("websocket", Some(&claims.sub), true);
                claims
            }
            Err(e) => {
                FormLogger::log_auth_event("websocket", None, false);
                return Err(e);
            }
        };

        match session_id {
            Some(session_id) => self.manager.resume(&claims.sub, session_id).await,
            None => {
                let exercise = exercise_type.parse::<ExerciseType>()?;
                self.manager.start(&claims.sub, exercise)
            }
        }
    }
}

fn attached(link: Option<&SessionLink>) -> AppResult<&SessionLink> {
    link.ok_or_else(|| AppError::invalid_message("Send a start message first"))
}

fn submit(link: &SessionLink, frame: InboundFrame) {
    let sequence = frame.sequence();
    if !link.submit(frame) {
        debug!(
            session_id = %link.session_id(),
            sequence,
            "Dropped out-of-order frame"
        );
    }
}

async fn next_outbound(link: &mut Option<SessionLink>) -> Option<ServerMessage> {
    match link {
        Some(link) => link.recv().await,
        None => future::pending().await,
    }
}

fn send_json(tx: &mpsc::UnboundedSender<Message>, message: &ServerMessage) {
    match serde_json::to_string(message) {
        Ok(json) => {
            if let Err(e) = tx.send(Message::Text(json)) {
                warn!(
                    message_type = message.kind(),
                    error = ?e,
                    "Failed to send message over WebSocket"
                );
            }
        }
        Err(e) => warn!(
            message_type = message.kind(),
            error = %e,
            "Failed to serialize server message"
        ),
    }
}
