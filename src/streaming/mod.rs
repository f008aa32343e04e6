// ABOUTME: Streaming form analysis sessions and the JSON protocol they speak
// ABOUTME: Re-exports the session manager, analysis pipeline and message types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Streaming form analysis
//!
//! A [`SessionManager`] runs one task per session. Each task owns an
//! [`ExerciseSession`] and drives it through the [`AnalysisPipeline`] on a
//! fixed interval, always analyzing the most recent frame.

/// Session tasks, reconnect handling and lifecycle events
pub mod manager;
/// Per-tick analysis pipeline shared by streaming and REST
pub mod pipeline;
/// Client and server message types
pub mod protocol;
/// Per-session analysis state
pub mod session;

pub use manager::{InboundFrame, SessionCommand, SessionEvent, SessionLink, SessionManager};
pub use pipeline::{AnalysisPipeline, TickOutcome};
pub use protocol::{ClientMessage, CloseReason, ServerMessage, StatusReason};
pub use session::ExerciseSession;
