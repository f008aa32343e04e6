// ABOUTME: Per-tick analysis pipeline shared by streaming sessions and the REST fallback
// ABOUTME: Chains biomechanics, the camera gate, phase detection and scoring into one outcome
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Analysis Pipeline
//!
//! A tick runs frame → biomechanics → camera gate (until confirmed) →
//! phase detector → scorer. Every tick ends in exactly one
//! [`TickOutcome`]: an analysis, a camera diagnostic or a typed error.

use crate::config::AnalysisConfig;
use crate::errors::{AppError, AppResult};
use pierre_core::models::{
    AnalysisResult, Calibration, CameraSetup, CameraView, ExerciseType, LandmarkFrame,
    LandmarkInput,
};
use pierre_intelligence::{
    AnalysisError, BiomechanicsCalculator, CameraSetupEvaluator, ExerciseProfile, FormScorer,
    IdealRangeTable, PhaseDetector, PhaseSnapshot,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

use super::session::ExerciseSession;

/// Result of one analysis tick
#[derive(Debug)]
pub enum TickOutcome {
    /// Form analysis; `camera` is set on the tick that confirmed placement
    Analysis {
        /// The result
        result: Box<AnalysisResult>,
        /// Diagnostics from the confirming camera check
        camera: Option<CameraSetup>,
    },
    /// Placement is not yet good enough to analyze
    CameraSetup(CameraSetup),
    /// Typed failure; the session continues
    Error(AppError),
}

/// Stateless analysis stages plus the shared range table
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    table: Arc<IdealRangeTable>,
    biomechanics: BiomechanicsCalculator,
    camera: CameraSetupEvaluator,
    phase: PhaseDetector,
    scorer: FormScorer,
}

impl AnalysisPipeline {
    /// Build the pipeline around a loaded range table
    #[must_use]
    pub fn new(table: Arc<IdealRangeTable>, config: &AnalysisConfig) -> Self {
        Self {
            table,
            biomechanics: BiomechanicsCalculator::new(config.camera.visibility_threshold),
            camera: CameraSetupEvaluator::new(config.camera),
            phase: PhaseDetector::new(config.phase),
            scorer: FormScorer::new(config.scoring),
        }
    }

    /// Loaded range table
    #[must_use]
    pub fn table(&self) -> &IdealRangeTable {
        &self.table
    }

    /// Resolve the profile for an exercise
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedExercise` when the table has no entry
    pub fn profile(&self, exercise: ExerciseType) -> AppResult<ExerciseProfile> {
        Ok(self.table.profile(exercise)?)
    }

    /// Camera diagnostics for a frame
    #[must_use]
    pub fn camera_check(&self, frame: &LandmarkFrame, view: CameraView) -> CameraSetup {
        self.camera.evaluate(frame, view)
    }

    /// Move a session to rest because frames stopped arriving
    pub fn force_rest(&self, session: &mut ExerciseSession) {
        let sequence = session.last_sequence.unwrap_or(0);
        session.phase_state = self.phase.force_rest(session.phase_state, sequence);
    }

    /// Run one tick for a session
    ///
    /// Incomplete frames still reach the camera gate but are excluded from
    /// phase detection and scoring.
    pub fn analyze_tick(&self, session: &mut ExerciseSession, frame: LandmarkFrame) -> TickOutcome {
        let started = Instant::now();
        let profile = &session.profile;

        let mut confirmed_setup = None;
        if !session.camera_confirmed {
            let setup = self.camera.evaluate(&frame, profile.view());
            if !setup.ready {
                session.last_frame = Some(frame);
                return TickOutcome::CameraSetup(setup);
            }
            session.camera_confirmed = true;
            confirmed_setup = Some(setup);
        }

        if !frame.is_complete() {
            let present = frame.present_count();
            session.last_frame = Some(frame);
            return TickOutcome::Error(AnalysisError::IncompleteFrame { present }.into());
        }

        let output = self
            .biomechanics
            .analyze(&frame, profile, &session.calibration);
        session.window.push(PhaseSnapshot {
            sequence: frame.sequence,
            timestamp_ms: frame.timestamp_ms,
            angles: output.angles.clone(),
            phase: session.phase_state.phase,
            score: None,
        });
        session.phase_state = self
            .phase
            .advance(session.phase_state, &session.window, profile);
        let phase = session.phase_state.phase;

        let card = match self
            .scorer
            .evaluate(&output.angles, &output.metrics, phase, profile)
        {
            Ok(card) => card,
            Err(error) => {
                session.window.annotate_latest(phase, None);
                session.last_frame = Some(frame);
                debug!(session_id = %session.id, error = %error, "Tick could not be scored");
                return TickOutcome::Error(error.into());
            }
        };
        session.window.annotate_latest(phase, Some(card.score));

        let result = AnalysisResult {
            sequence: frame.sequence,
            timestamp_ms: frame.timestamp_ms,
            exercise_type: profile.exercise_type,
            score: card.score,
            smoothed_score: session.window.mean_score().unwrap_or(card.score),
            phase,
            rep_count: session.phase_state.rep_count,
            angle_scores: card.angle_scores,
            feedback: card.feedback,
            confidence: card.confidence,
            metrics: output.metrics,
            degraded: card.degraded,
            processing_time_ms: started.elapsed().as_secs_f64() * 1_000.0,
        };
        session.last_frame = Some(frame);

        TickOutcome::Analysis {
            result: Box::new(result),
            camera: confirmed_setup,
        }
    }

    /// Analyze a single landmark set outside any stream
    ///
    /// Runs the same tick as streaming sessions on a fresh session with
    /// placement treated as confirmed; camera diagnostics have their own
    /// endpoint.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedExercise`, `LowConfidence` or `InputError`
    pub fn analyze_once(
        &self,
        user_id: &str,
        exercise: ExerciseType,
        calibration: Calibration,
        sequence: u64,
        timestamp_ms: u64,
        landmarks: &[LandmarkInput],
    ) -> AppResult<AnalysisResult> {
        let normalized = LandmarkFrame::normalize(sequence, timestamp_ms, landmarks);
        if normalized.frame.present_count() == 0 {
            return Err(AppError::input("No usable landmarks in request")
                .with_details(serde_json::json!({ "issues": normalized.issues })));
        }

        let mut session = ExerciseSession::new(Uuid::new_v4(), user_id, self.profile(exercise)?, 1);
        session.calibration = calibration;
        session.camera_confirmed = true;

        match self.analyze_tick(&mut session, normalized.frame) {
            TickOutcome::Analysis { result, .. } => Ok(*result),
            TickOutcome::Error(error) => Err(error),
            TickOutcome::CameraSetup(_) => Err(AppError::internal(
                "Camera gate ran on a confirmed session",
            )),
        }
    }
}
