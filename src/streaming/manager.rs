// ABOUTME: Streaming session manager running one task per form analysis session
// ABOUTME: Latest-frame ingestion, fixed-interval ticks, idle rest, teardown and reconnect backoff
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// NOTE: All `.clone()` calls in this file are Safe - they are necessary for:
// - Arc and channel handle clones shared between the manager and session tasks
// - Frame payloads copied out of the watch slot so no borrow is held across an await

//! # Session Manager
//!
//! Each session runs in its own task and owns its [`ExerciseSession`].
//! Frames reach the task through a `watch` channel that only keeps the
//! latest frame, so a slow tick drops intermediate frames instead of
//! queueing them. Every suspension point races the server shutdown signal.
//!
//! A lost connection detaches the session. The task then waits through a
//! bounded exponential backoff for a resume before discarding the session.
//!
//! `stop` and detach also raise a per-session interrupt, so a pose-model
//! call or an outbound delivery already in flight is abandoned instead of
//! finishing behind the queued command.

use crate::config::StreamingConfig;
use crate::constants::streaming::{CONTROL_CHANNEL_CAPACITY, EVENT_CHANNEL_CAPACITY};
use crate::errors::{AppError, AppResult};
use crate::logging::{FormLogger, TickMetrics};
use crate::middleware::create_session_span;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use pierre_core::models::{ExerciseType, LandmarkFrame, LandmarkInput};
use pierre_providers::{PoseEstimator, PoseRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn, Instrument, Span};
use uuid::Uuid;

use super::pipeline::{AnalysisPipeline, TickOutcome};
use super::protocol::{CloseReason, ServerMessage, StatusReason};
use super::session::ExerciseSession;

/// How long expired session ids keep answering `SESSION_EXPIRED`
const EXPIRED_RETENTION_MINUTES: i64 = 60;

/// Frame submitted by a client
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Raw image for the pose model
    Image {
        /// Monotonic frame number
        sequence: u64,
        /// Capture time
        timestamp_ms: u64,
        /// Base64-encoded image
        image: String,
    },
    /// Landmarks extracted on the client
    Landmarks {
        /// Monotonic frame number
        sequence: u64,
        /// Capture time
        timestamp_ms: u64,
        /// Raw landmark list
        landmarks: Vec<LandmarkInput>,
    },
}

impl InboundFrame {
    /// Frame sequence number
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        match self {
            Self::Image { sequence, .. } | Self::Landmarks { sequence, .. } => *sequence,
        }
    }
}

/// Control messages for a session task
#[derive(Debug)]
pub enum SessionCommand {
    /// Merge a calibration update
    Calibrate {
        /// Athlete height
        reference_height_cm: Option<f64>,
        /// Camera roll
        camera_angle_deg: Option<f64>,
    },
    /// Change exercise and/or analysis interval
    Settings {
        /// New exercise
        exercise: Option<ExerciseType>,
        /// New analysis interval
        analysis_interval_ms: Option<u64>,
    },
    /// Camera diagnostics for the latest frame
    CameraCheck,
    /// End the session
    Stop,
    /// The given connection went away
    Detach {
        /// Connection that was lost
        connection_id: Uuid,
    },
    /// Route output to a new connection
    Attach {
        /// New connection
        connection_id: Uuid,
        /// Outbound queue of the new connection
        outbound: mpsc::Sender<ServerMessage>,
    },
}

/// Session lifecycle events for observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// New session created
    Started {
        /// Session id
        session_id: Uuid,
        /// Owner
        user_id: String,
        /// Exercise
        exercise: ExerciseType,
    },
    /// Connection lost, waiting for resume
    Detached {
        /// Session id
        session_id: Uuid,
    },
    /// Reattached to a new connection
    Resumed {
        /// Session id
        session_id: Uuid,
    },
    /// Discarded after exhausting reconnect attempts
    Expired {
        /// Session id
        session_id: Uuid,
    },
    /// Ended for any other reason
    Closed {
        /// Session id
        session_id: Uuid,
        /// Why it ended
        reason: CloseReason,
    },
}

/// Cancels work in flight for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Clear,
    Stop,
    /// Only the named connection's work is abandoned
    Detach(Uuid),
}

impl Interrupt {
    fn applies_to(self, connection_id: Option<Uuid>) -> bool {
        match self {
            Self::Clear => false,
            Self::Stop => true,
            Self::Detach(lost) => connection_id == Some(lost),
        }
    }
}

/// Manager-side handle to a running session task
#[derive(Clone)]
struct SessionHandle {
    user_id: String,
    frames: Arc<watch::Sender<Option<InboundFrame>>>,
    control: mpsc::Sender<SessionCommand>,
    interrupt: Arc<watch::Sender<Interrupt>>,
}

impl SessionHandle {
    fn raise(&self, interrupt: Interrupt) {
        // Stop is final and never downgraded to a detach
        self.interrupt.send_if_modified(|current| {
            if *current == Interrupt::Stop {
                return false;
            }
            *current = interrupt;
            true
        });
    }
}

/// A connection's attachment to a session
///
/// Dropping the link detaches the connection; the session then waits for
/// a resume.
pub struct SessionLink {
    session_id: Uuid,
    connection_id: Uuid,
    handle: SessionHandle,
    outbound: mpsc::Receiver<ServerMessage>,
}

impl SessionLink {
    /// Attached session
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Offer a frame; returns `false` when its sequence is not newer than
    /// the latest accepted frame
    pub fn submit(&self, frame: InboundFrame) -> bool {
        self.handle.frames.send_if_modified(|slot| match slot {
            Some(current) if frame.sequence() <= current.sequence() => false,
            _ => {
                *slot = Some(frame);
                true
            }
        })
    }

    /// Queue a control command without waiting
    ///
    /// `Stop` also interrupts any pose-model call or delivery in flight.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` when the command queue is full and a
    /// transport error if the session has ended
    pub fn command(&self, command: SessionCommand) -> AppResult<()> {
        if matches!(command, SessionCommand::Stop) {
            self.handle.raise(Interrupt::Stop);
        }
        self.handle.control.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => {
                AppError::invalid_message("Too many control messages, slow down and retry")
            }
            TrySendError::Closed(_) => {
                AppError::transport(format!("Session {} has ended", self.session_id))
            }
        })
    }

    /// Next message for the client; `None` once the session has ended
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.outbound.recv().await
    }
}

impl Drop for SessionLink {
    fn drop(&mut self) {
        self.handle.raise(Interrupt::Detach(self.connection_id));
        let detach = SessionCommand::Detach {
            connection_id: self.connection_id,
        };
        if self.handle.control.try_send(detach).is_err() {
            debug!(session_id = %self.session_id, "Session ended before detach");
        }
    }
}

/// Owns every streaming session
pub struct SessionManager {
    pipeline: Arc<AnalysisPipeline>,
    pose: Arc<dyn PoseEstimator>,
    config: StreamingConfig,
    sessions: Arc<DashMap<Uuid, SessionHandle>>,
    expired: Arc<DashMap<Uuid, DateTime<Utc>>>,
    events: broadcast::Sender<SessionEvent>,
    shutdown: watch::Sender<bool>,
}

impl SessionManager {
    /// Create a manager
    #[must_use]
    pub fn new(
        pipeline: Arc<AnalysisPipeline>,
        pose: Arc<dyn PoseEstimator>,
        config: StreamingConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown, _) = watch::channel(false);
        Self {
            pipeline,
            pose,
            config,
            sessions: Arc::new(DashMap::new()),
            expired: Arc::new(DashMap::new()),
            events,
            shutdown,
        }
    }

    /// Analysis pipeline shared by all sessions
    #[must_use]
    pub const fn pipeline(&self) -> &Arc<AnalysisPipeline> {
        &self.pipeline
    }

    /// Streaming settings
    #[must_use]
    pub const fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Subscribe to lifecycle events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Number of live sessions, attached or detached
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Whether a session is live
    #[must_use]
    pub fn contains(&self, session_id: Uuid) -> bool {
        self.sessions.contains_key(&session_id)
    }

    /// Close every session
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Start a new session and attach it to a connection
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedExercise` if the range table has no profile
    pub fn start(&self, user_id: &str, exercise: ExerciseType) -> AppResult<SessionLink> {
        let profile = self.pipeline.profile(exercise)?;
        let session_id = Uuid::new_v4();
        let connection_id = Uuid::new_v4();

        let (frames_tx, frames_rx) = watch::channel(None);
        let (control_tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.outbound_capacity);
        let (interrupt_tx, interrupt_rx) = watch::channel(Interrupt::Clear);

        let handle = SessionHandle {
            user_id: user_id.to_owned(),
            frames: Arc::new(frames_tx),
            control: control_tx,
            interrupt: Arc::new(interrupt_tx),
        };
        self.sessions.insert(session_id, handle.clone());

        let worker = SessionWorker {
            session: ExerciseSession::new(session_id, user_id, profile, self.config.window_size),
            pipeline: self.pipeline.clone(),
            pose: self.pose.clone(),
            config: self.config,
            frames: frames_rx,
            control: control_rx,
            interrupt: interrupt_rx,
            outbound: Some(outbound_tx),
            connection_id: Some(connection_id),
            shutdown: self.shutdown.subscribe(),
            sessions: self.sessions.clone(),
            expired: self.expired.clone(),
            events: self.events.clone(),
            interval: self.config.analysis_interval(),
            interval_changed: false,
            last_analyzed: None,
            last_frame_at: Instant::now(),
            idle: false,
        };
        tokio::spawn(
            worker
                .run(false)
                .instrument(create_session_span(session_id, user_id)),
        );

        FormLogger::log_session_started(session_id, user_id, exercise, false);
        publish(
            &self.events,
            SessionEvent::Started {
                session_id,
                user_id: user_id.to_owned(),
                exercise,
            },
        );

        Ok(SessionLink {
            session_id,
            connection_id,
            handle,
            outbound: outbound_rx,
        })
    }

    /// Reattach an existing session to a new connection
    ///
    /// Window, phase and calibration are preserved.
    ///
    /// # Errors
    ///
    /// Returns `SessionExpired` for a discarded session, `SessionNotFound`
    /// for an unknown id and `AuthInvalid` when the session belongs to
    /// another user
    pub async fn resume(&self, user_id: &str, session_id: Uuid) -> AppResult<SessionLink> {
        let Some(handle) = self.sessions.get(&session_id).map(|h| h.clone()) else {
            return Err(if self.expired.contains_key(&session_id) {
                AppError::session_expired(session_id)
            } else {
                AppError::session_not_found(session_id)
            });
        };
        if handle.user_id != user_id {
            return Err(AppError::auth_invalid(
                "Session belongs to a different user",
            ));
        }

        let connection_id = Uuid::new_v4();
        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.outbound_capacity);
        handle
            .control
            .send(SessionCommand::Attach {
                connection_id,
                outbound: outbound_tx,
            })
            .await
            .map_err(|_| AppError::session_expired(session_id))?;

        Ok(SessionLink {
            session_id,
            connection_id,
            handle,
            outbound: outbound_rx,
        })
    }
}

/// Resolves once a stop, or a detach of `connection_id`, has been raised
async fn interrupted(
    interrupt: &mut watch::Receiver<Interrupt>,
    connection_id: Option<Uuid>,
) -> Exit {
    let raised = interrupt
        .wait_for(|signal| signal.applies_to(connection_id))
        .await
        .map(|signal| *signal);
    match raised {
        Ok(Interrupt::Detach(_)) => Exit::Detach,
        // A dropped sender means the session is being torn down
        Ok(Interrupt::Stop | Interrupt::Clear) | Err(_) => Exit::Close(CloseReason::Stopped),
    }
}

fn publish(events: &broadcast::Sender<SessionEvent>, event: SessionEvent) {
    // No subscribers is normal
    if events.send(event).is_err() {
        debug!("No session event subscribers");
    }
}

/// How an attached stretch of the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Close(CloseReason),
    Detach,
}

/// The task that owns one session
struct SessionWorker {
    session: ExerciseSession,
    pipeline: Arc<AnalysisPipeline>,
    pose: Arc<dyn PoseEstimator>,
    config: StreamingConfig,
    frames: watch::Receiver<Option<InboundFrame>>,
    control: mpsc::Receiver<SessionCommand>,
    interrupt: watch::Receiver<Interrupt>,
    outbound: Option<mpsc::Sender<ServerMessage>>,
    connection_id: Option<Uuid>,
    shutdown: watch::Receiver<bool>,
    sessions: Arc<DashMap<Uuid, SessionHandle>>,
    expired: Arc<DashMap<Uuid, DateTime<Utc>>>,
    events: broadcast::Sender<SessionEvent>,
    interval: Duration,
    interval_changed: bool,
    last_analyzed: Option<u64>,
    last_frame_at: Instant,
    idle: bool,
}

impl SessionWorker {
    async fn run(mut self, resumed: bool) {
        let mut exit = self.greet(resumed).await;
        let reason = loop {
            match exit {
                Exit::Close(reason) => break reason,
                Exit::Detach => match self.await_resume().await {
                    Some(reason) => break reason,
                    None => exit = self.greet(true).await,
                },
            }
        };
        self.close(reason);
    }

    /// Announce the attachment, then serve the connection
    async fn greet(&mut self, resumed: bool) -> Exit {
        let started = ServerMessage::SessionStarted {
            session_id: self.session.id,
            exercise_type: self.session.exercise_type(),
            resumed,
        };
        match self.deliver(started).await {
            Some(exit) => exit,
            None => self.attached().await,
        }
    }

    async fn attached(&mut self) -> Exit {
        let mut ticker = Self::ticker(self.interval);
        loop {
            if *self.shutdown.borrow() {
                return Exit::Close(CloseReason::ServerShutdown);
            }
            if self.interval_changed {
                self.interval_changed = false;
                ticker = Self::ticker(self.interval);
            }
            let step = tokio::select! {
                _ = self.shutdown.changed() => Some(Exit::Close(CloseReason::ServerShutdown)),
                exit = interrupted(&mut self.interrupt, self.connection_id) => Some(exit),
                command = self.control.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => Some(Exit::Close(CloseReason::Stopped)),
                },
                _ = ticker.tick() => self.on_tick().await,
            };
            if let Some(exit) = step {
                return exit;
            }
        }
    }

    fn ticker(period: Duration) -> time::Interval {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    async fn handle_command(&mut self, command: SessionCommand) -> Option<Exit> {
        match command {
            SessionCommand::Calibrate {
                reference_height_cm,
                camera_angle_deg,
            } => {
                self.session.calibrate(reference_height_cm, camera_angle_deg);
                self.status(StatusReason::CalibrationUpdated).await
            }
            SessionCommand::Settings {
                exercise,
                analysis_interval_ms,
            } => self.apply_settings(exercise, analysis_interval_ms).await,
            SessionCommand::CameraCheck => {
                let message = self.session.last_frame.as_ref().map_or_else(
                    || AppError::invalid_message("No frame has been received yet").into(),
                    |frame| {
                        ServerMessage::camera_setup(
                            self.pipeline.camera_check(frame, self.session.profile.view()),
                        )
                    },
                );
                self.deliver(message).await
            }
            SessionCommand::Stop => Some(Exit::Close(CloseReason::Stopped)),
            SessionCommand::Detach { connection_id } => {
                // A superseded connection going away does not detach the current one
                (self.connection_id == Some(connection_id)).then_some(Exit::Detach)
            }
            SessionCommand::Attach {
                connection_id,
                outbound,
            } => {
                debug!(session_id = %self.session.id, "Connection superseded by resume");
                self.attach(connection_id, outbound);
                let started = ServerMessage::SessionStarted {
                    session_id: self.session.id,
                    exercise_type: self.session.exercise_type(),
                    resumed: true,
                };
                self.deliver(started).await
            }
        }
    }

    async fn apply_settings(
        &mut self,
        exercise: Option<ExerciseType>,
        analysis_interval_ms: Option<u64>,
    ) -> Option<Exit> {
        if let Some(exercise) = exercise.filter(|e| *e != self.session.exercise_type()) {
            match self.pipeline.profile(exercise) {
                Ok(profile) => {
                    self.session.switch_exercise(profile);
                    if let Some(exit) = self.status(StatusReason::ExerciseChanged).await {
                        return Some(exit);
                    }
                }
                Err(error) => {
                    if let Some(exit) = self.deliver(error.into()).await {
                        return Some(exit);
                    }
                }
            }
        }
        if let Some(requested) = analysis_interval_ms {
            self.interval = StreamingConfig::clamp_interval(requested);
            self.interval_changed = true;
            return self.status(StatusReason::IntervalChanged).await;
        }
        None
    }

    async fn on_tick(&mut self) -> Option<Exit> {
        if self.frames.has_changed().unwrap_or(false) {
            let latest = self.frames.borrow_and_update().clone();
            if let Some(frame) = latest {
                self.last_frame_at = Instant::now();
                if self.idle {
                    self.idle = false;
                    if let Some(exit) = self.status(StatusReason::Active).await {
                        return Some(exit);
                    }
                }
                if !self.config.frame_due(self.last_analyzed, frame.sequence()) {
                    return None;
                }
                self.last_analyzed = Some(frame.sequence());
                return self.process(frame).await;
            }
        }

        let silent = self.last_frame_at.elapsed();
        if silent >= self.config.teardown_timeout() {
            return Some(Exit::Close(CloseReason::IdleTimeout));
        }
        if silent >= self.config.idle_timeout() && !self.idle {
            self.idle = true;
            self.pipeline.force_rest(&mut self.session);
            debug!(session_id = %self.session.id, "No frames, session resting");
            return self.status(StatusReason::Idle).await;
        }
        None
    }

    async fn process(&mut self, inbound: InboundFrame) -> Option<Exit> {
        if !self.session.accept_sequence(inbound.sequence()) {
            return None;
        }

        let (sequence, timestamp_ms, landmarks) = match inbound {
            InboundFrame::Landmarks {
                sequence,
                timestamp_ms,
                landmarks,
            } => (sequence, timestamp_ms, landmarks),
            InboundFrame::Image {
                sequence,
                timestamp_ms,
                image,
            } => {
                let request = PoseRequest {
                    sequence,
                    timestamp_ms,
                    image,
                };
                let estimate = tokio::select! {
                    biased;
                    _ = self.shutdown.changed() => {
                        return Some(Exit::Close(CloseReason::ServerShutdown));
                    }
                    exit = interrupted(&mut self.interrupt, self.connection_id) => {
                        debug!(session_id = %self.session.id, sequence, "Pose estimation abandoned");
                        return Some(exit);
                    }
                    estimate = self.pose.estimate(&request) => estimate,
                };
                match estimate {
                    Ok(landmarks) => (sequence, timestamp_ms, landmarks),
                    Err(error) => {
                        warn!(
                            session_id = %self.session.id,
                            sequence,
                            error = %error,
                            "Pose estimation failed"
                        );
                        return self.deliver(AppError::from(error).into()).await;
                    }
                }
            }
        };

        let normalized = LandmarkFrame::normalize(sequence, timestamp_ms, &landmarks);
        if !normalized.issues.is_empty() {
            debug!(
                session_id = %self.session.id,
                sequence,
                issues = normalized.issues.len(),
                "Landmark input normalized with issues"
            );
        }

        match self
            .pipeline
            .analyze_tick(&mut self.session, normalized.frame)
        {
            TickOutcome::Analysis { result, camera } => {
                if let Some(setup) = camera {
                    if let Some(exit) = self.deliver(ServerMessage::camera_setup(setup)).await {
                        return Some(exit);
                    }
                    if let Some(exit) = self.status(StatusReason::CameraReady).await {
                        return Some(exit);
                    }
                }
                FormLogger::log_tick(&TickMetrics {
                    session_id: self.session.id,
                    sequence: result.sequence,
                    phase: result.phase,
                    score: Some(result.score),
                    degraded: result.degraded,
                    processing_time_ms: result.processing_time_ms,
                });
                self.deliver(ServerMessage::Analysis { result }).await
            }
            TickOutcome::CameraSetup(setup) => {
                self.deliver(ServerMessage::camera_setup(setup)).await
            }
            TickOutcome::Error(error) => self.deliver(error.into()).await,
        }
    }

    async fn status(&mut self, reason: StatusReason) -> Option<Exit> {
        let phase = self.session.phase();
        self.deliver(ServerMessage::Status { phase, reason }).await
    }

    /// Send to the attached connection; a closed connection detaches
    async fn deliver(&mut self, message: ServerMessage) -> Option<Exit> {
        let outbound = self.outbound.as_ref()?;
        tokio::select! {
            biased;
            _ = self.shutdown.changed() => Some(Exit::Close(CloseReason::ServerShutdown)),
            exit = interrupted(&mut self.interrupt, self.connection_id) => Some(exit),
            sent = outbound.send(message) => sent.err().map(|_| Exit::Detach),
        }
    }

    fn attach(&mut self, connection_id: Uuid, outbound: mpsc::Sender<ServerMessage>) {
        self.connection_id = Some(connection_id);
        self.outbound = Some(outbound);
        self.last_frame_at = Instant::now();
        FormLogger::log_session_started(
            self.session.id,
            &self.session.user_id,
            self.session.exercise_type(),
            true,
        );
        publish(
            &self.events,
            SessionEvent::Resumed {
                session_id: self.session.id,
            },
        );
    }

    /// Wait through the backoff schedule; `None` means a connection reattached
    async fn await_resume(&mut self) -> Option<CloseReason> {
        let session_id = self.session.id;
        self.outbound = None;
        self.connection_id = None;
        publish(&self.events, SessionEvent::Detached { session_id });

        for attempt in 0..self.config.max_reconnect_attempts {
            let delay = self.config.backoff_delay(attempt);
            FormLogger::log_session_detached(
                session_id,
                attempt + 1,
                u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            );
            let deadline = time::sleep(delay);
            tokio::pin!(deadline);

            loop {
                if *self.shutdown.borrow() {
                    return Some(CloseReason::ServerShutdown);
                }
                tokio::select! {
                    _ = self.shutdown.changed() => return Some(CloseReason::ServerShutdown),
                    // Only a stop applies while no connection is attached
                    _ = interrupted(&mut self.interrupt, None) => return Some(CloseReason::Stopped),
                    () = &mut deadline => break,
                    command = self.control.recv() => match command {
                        Some(SessionCommand::Attach { connection_id, outbound }) => {
                            self.attach(connection_id, outbound);
                            return None;
                        }
                        Some(SessionCommand::Stop) | None => return Some(CloseReason::Stopped),
                        // Everything else needs an attached connection
                        Some(_) => {}
                    },
                }
            }
        }

        FormLogger::log_session_expired(session_id, self.config.max_reconnect_attempts);
        Some(CloseReason::Expired)
    }

    fn close(&mut self, reason: CloseReason) {
        let session_id = self.session.id;
        self.sessions.remove(&session_id);

        if reason == CloseReason::Expired {
            let cutoff = Utc::now() - ChronoDuration::minutes(EXPIRED_RETENTION_MINUTES);
            self.expired.retain(|_, at| *at > cutoff);
            self.expired.insert(session_id, Utc::now());
            publish(&self.events, SessionEvent::Expired { session_id });
        } else {
            if let Some(outbound) = self.outbound.take() {
                if let Err(e) = outbound.try_send(ServerMessage::SessionClosed { reason }) {
                    debug!(session_id = %session_id, error = %e, "Close notice not delivered");
                }
            }
            publish(&self.events, SessionEvent::Closed { session_id, reason });
        }

        let rep_count = self.session.phase_state.rep_count;
        Span::current().record("rep_count", rep_count);
        FormLogger::log_session_closed(session_id, reason.as_str(), rep_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> (SessionHandle, watch::Receiver<Interrupt>) {
        let (frames, _) = watch::channel(None);
        let (control, _) = mpsc::channel(1);
        let (interrupt, interrupt_rx) = watch::channel(Interrupt::Clear);
        let handle = SessionHandle {
            user_id: "athlete-1".to_owned(),
            frames: Arc::new(frames),
            control,
            interrupt: Arc::new(interrupt),
        };
        (handle, interrupt_rx)
    }

    #[test]
    fn test_detach_only_interrupts_its_own_connection() {
        let (current, superseded) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(!Interrupt::Clear.applies_to(Some(current)));
        assert!(Interrupt::Stop.applies_to(None));
        assert!(Interrupt::Detach(current).applies_to(Some(current)));
        assert!(!Interrupt::Detach(superseded).applies_to(Some(current)));
        assert!(!Interrupt::Detach(current).applies_to(None));
    }

    #[test]
    fn test_stop_is_never_downgraded() {
        let (handle, interrupt) = handle();
        handle.raise(Interrupt::Detach(Uuid::new_v4()));
        handle.raise(Interrupt::Stop);
        handle.raise(Interrupt::Detach(Uuid::new_v4()));
        assert_eq!(*interrupt.borrow(), Interrupt::Stop);
    }

    #[tokio::test]
    async fn test_interrupted_maps_signal_to_exit() {
        let connection = Uuid::new_v4();
        let (handle, mut interrupt) = handle();

        handle.raise(Interrupt::Detach(connection));
        assert!(matches!(
            interrupted(&mut interrupt, Some(connection)).await,
            Exit::Detach
        ));

        handle.raise(Interrupt::Stop);
        assert!(matches!(
            interrupted(&mut interrupt, None).await,
            Exit::Close(CloseReason::Stopped)
        ));

        drop(handle);
        let (_, mut orphaned) = watch::channel(Interrupt::Clear);
        assert!(matches!(
            interrupted(&mut orphaned, None).await,
            Exit::Close(CloseReason::Stopped)
        ));
    }
}
