// ABOUTME: Session-aware logging helpers for streaming form analysis
// ABOUTME: Structured lifecycle and per-tick metric events keyed by session id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::streaming::TICK_BUDGET_MS;
use pierre_core::models::{ExerciseType, Phase};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Measurements for one analysis tick
#[derive(Debug, Clone, Copy)]
pub struct TickMetrics {
    /// Session the tick belongs to
    pub session_id: Uuid,
    /// Frame sequence analyzed
    pub sequence: u64,
    /// Phase after the tick
    pub phase: Phase,
    /// Overall score, when the tick produced one
    pub score: Option<f64>,
    /// Whether the simplified path was used
    pub degraded: bool,
    /// Wall time spent in the pipeline
    pub processing_time_ms: f64,
}

/// Session lifecycle and tick logging
pub struct FormLogger;

impl FormLogger {
    /// Log a new or resumed session
    pub fn log_session_started(
        session_id: Uuid,
        user_id: &str,
        exercise: ExerciseType,
        resumed: bool,
    ) {
        info!(
            session_id = %session_id,
            user_id = %user_id,
            exercise = %exercise,
            resumed,
            event_type = "session_started",
            "Form analysis session started"
        );
    }

    /// Log a transport loss while the session waits for a resume
    pub fn log_session_detached(session_id: Uuid, attempt: u32, delay_ms: u64) {
        info!(
            session_id = %session_id,
            attempt,
            delay_ms,
            event_type = "session_detached",
            "Session detached, waiting for resume"
        );
    }

    /// Log a session discarded after exhausting reconnect attempts
    pub fn log_session_expired(session_id: Uuid, attempts: u32) {
        warn!(
            session_id = %session_id,
            attempts,
            event_type = "session_expired",
            "Session expired without resume"
        );
    }

    /// Log a session ending
    pub fn log_session_closed(session_id: Uuid, reason: &str, rep_count: u32) {
        info!(
            session_id = %session_id,
            reason = %reason,
            rep_count,
            event_type = "session_closed",
            "Form analysis session closed"
        );
    }

    /// Log an authentication attempt on the streaming or REST surface
    pub fn log_auth_event(surface: &str, user_id: Option<&str>, success: bool) {
        if success {
            debug!(
                surface = %surface,
                user_id = user_id.unwrap_or("unknown"),
                event_type = "authentication",
                "Authentication successful"
            );
        } else {
            warn!(
                surface = %surface,
                event_type = "authentication",
                "Authentication failed"
            );
        }
    }

    /// Log one analysis tick, warning when it exceeds the soft budget
    pub fn log_tick(metrics: &TickMetrics) {
        #[allow(clippy::cast_precision_loss)] // Safe: budget is a small constant
        let over_budget = metrics.processing_time_ms > TICK_BUDGET_MS as f64;
        if over_budget {
            warn!(
                session_id = %metrics.session_id,
                sequence = metrics.sequence,
                processing_time_ms = metrics.processing_time_ms,
                budget_ms = TICK_BUDGET_MS,
                event_type = "analysis_tick",
                "Analysis tick over budget"
            );
        } else {
            debug!(
                session_id = %metrics.session_id,
                sequence = metrics.sequence,
                phase = %metrics.phase,
                score = ?metrics.score,
                degraded = metrics.degraded,
                processing_time_ms = metrics.processing_time_ms,
                event_type = "analysis_tick",
                "Analysis tick completed"
            );
        }
    }
}
