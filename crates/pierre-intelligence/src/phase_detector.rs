// ABOUTME: Movement phase state machine driven by the primary joint's trajectory
// ABOUTME: Debounces transitions over a bounded snapshot window and counts repetitions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Phase detector
//!
//! The detector is pure. It takes the previous [`PhaseState`] and the
//! session's [`SnapshotWindow`] by reference and returns the next state.
//!
//! ```text
//! setup ──▶ eccentric ──▶ bottom ──▶ concentric ──▶ top ──▶ eccentric ...
//!   any ──▶ rest (stillness)      rest ──▶ eccentric | concentric
//! ```
//!
//! Evidence for a transition only comes from snapshots taken since the
//! current phase was entered. Within that span the detector looks at the
//! trailing *run*: consecutive steps in one direction. Steps below the noise
//! tolerance are skipped and a reversal starts a new run.

use pierre_core::models::{JointAngleSet, Phase};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::config::{ExerciseProfile, PhaseDetectorConfig};

/// One analyzed frame kept in the session window
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSnapshot {
    /// Frame sequence number
    pub sequence: u64,
    /// Frame capture time
    pub timestamp_ms: u64,
    /// Angles computed for the frame
    pub angles: JointAngleSet,
    /// Phase after the frame was analyzed
    pub phase: Phase,
    /// Overall score, when the frame was scored
    pub score: Option<f64>,
}

/// Bounded window of recent snapshots, oldest first
#[derive(Debug, Clone)]
pub struct SnapshotWindow {
    capacity: usize,
    snapshots: VecDeque<PhaseSnapshot>,
}

impl SnapshotWindow {
    /// Create an empty window holding at most `capacity` snapshots
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            snapshots: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a snapshot, evicting the oldest when full
    pub fn push(&mut self, snapshot: PhaseSnapshot) {
        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    /// Most recent snapshot
    #[must_use]
    pub fn latest(&self) -> Option<&PhaseSnapshot> {
        self.snapshots.back()
    }

    /// Record the outcome of analyzing the most recent snapshot
    pub fn annotate_latest(&mut self, phase: Phase, score: Option<f64>) {
        if let Some(latest) = self.snapshots.back_mut() {
            latest.phase = phase;
            latest.score = score;
        }
    }

    /// Snapshots oldest first
    pub fn iter(&self) -> impl Iterator<Item = &PhaseSnapshot> {
        self.snapshots.iter()
    }

    /// Number of snapshots held
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the window is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Maximum number of snapshots held
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every snapshot
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// Mean score over scored snapshots
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Safe: window holds at most a few hundred snapshots
    pub fn mean_score(&self) -> Option<f64> {
        let (sum, count) = self
            .snapshots
            .iter()
            .filter_map(|s| s.score)
            .fold((0.0, 0_usize), |(sum, count), score| (sum + score, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Defined primary-joint angles from `since` onward, oldest first
    fn trajectory(&self, profile: &ExerciseProfile, since: Option<u64>) -> Vec<f64> {
        let joint = profile.primary_joint();
        self.snapshots
            .iter()
            .filter(|s| since.map_or(true, |seq| s.sequence >= seq))
            .filter_map(|s| s.angles.angle(joint))
            .collect()
    }
}

/// Reference point for stillness detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StillAnchor {
    /// Primary angle when stillness began
    pub angle: f64,
    /// Snapshot time when stillness began
    pub timestamp_ms: u64,
}

/// Detector state carried between ticks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseState {
    /// Current phase
    pub phase: Phase,
    /// Sequence of the snapshot that entered the phase; `None` before any transition
    pub entered_at: Option<u64>,
    /// Highest primary angle seen while standing, used as the lockout target
    pub reference_top: Option<f64>,
    /// Start of the current still period
    pub still_anchor: Option<StillAnchor>,
    /// Completed repetitions
    pub rep_count: u32,
}

impl Default for PhaseState {
    fn default() -> Self {
        Self {
            phase: Phase::Setup,
            entered_at: None,
            reference_top: None,
            still_anchor: None,
            rep_count: 0,
        }
    }
}

impl PhaseState {
    fn enter(self, phase: Phase, sequence: u64) -> Self {
        debug_assert!(
            self.phase.can_transition_to(phase),
            "illegal transition {} -> {phase}",
            self.phase
        );
        debug!(from = %self.phase, to = %phase, sequence, "Phase transition");
        Self {
            phase,
            entered_at: Some(sequence),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy)]
struct Run {
    direction: Direction,
    displacement: f64,
    snapshots: usize,
}

/// Phase state machine over the primary joint's trajectory
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseDetector {
    config: PhaseDetectorConfig,
}

impl PhaseDetector {
    /// Create a detector with explicit thresholds
    #[must_use]
    pub const fn new(config: PhaseDetectorConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use
    #[must_use]
    pub const fn config(&self) -> &PhaseDetectorConfig {
        &self.config
    }

    /// Compute the state after the window's latest snapshot
    ///
    /// A latest snapshot without a defined primary angle contributes no
    /// evidence and leaves the state unchanged.
    #[must_use]
    pub fn advance(
        &self,
        state: PhaseState,
        window: &SnapshotWindow,
        profile: &ExerciseProfile,
    ) -> PhaseState {
        let Some(latest) = window.latest() else {
            return state;
        };
        let Some(angle) = latest.angles.angle(profile.primary_joint()) else {
            return state;
        };
        let mut state = state;

        if matches!(state.phase, Phase::Setup | Phase::Top | Phase::Rest) {
            state.reference_top = Some(state.reference_top.map_or(angle, |top| top.max(angle)));
        }

        match state.still_anchor {
            Some(anchor) if (angle - anchor.angle).abs() < self.config.min_transition_delta_deg => {
                let still_for = latest.timestamp_ms.saturating_sub(anchor.timestamp_ms);
                if still_for >= self.config.rest_timeout_ms && state.phase != Phase::Rest {
                    return state.enter(Phase::Rest, latest.sequence);
                }
            }
            _ => {
                state.still_anchor = Some(StillAnchor {
                    angle,
                    timestamp_ms: latest.timestamp_ms,
                });
            }
        }

        let trajectory = window.trajectory(profile, state.entered_at);
        let run = self.trailing_run(&trajectory);
        let committed = |direction| run.is_some_and(|r| self.commits(r, direction));

        match state.phase {
            Phase::Setup | Phase::Top if committed(Direction::Down) => {
                state.enter(Phase::Eccentric, latest.sequence)
            }
            Phase::Rest if committed(Direction::Down) => {
                state.enter(Phase::Eccentric, latest.sequence)
            }
            Phase::Rest | Phase::Bottom if committed(Direction::Up) => {
                state.enter(Phase::Concentric, latest.sequence)
            }
            Phase::Eccentric
                if angle <= profile.bottom_angle()
                    || self.snapshots_since_minimum(&trajectory)
                        >= self.config.local_minimum_snapshots =>
            {
                state.enter(Phase::Bottom, latest.sequence)
            }
            Phase::Concentric => {
                let top = state
                    .reference_top
                    .or_else(|| profile.top_angle())
                    .unwrap_or_else(|| trajectory.iter().copied().fold(angle, f64::max));
                if angle >= top - self.config.top_tolerance_deg {
                    let mut next = state.enter(Phase::Top, latest.sequence);
                    next.rep_count += 1;
                    next
                } else {
                    state
                }
            }
            _ => state,
        }
    }

    /// Move to rest without trajectory evidence, e.g. when frames stop arriving
    #[must_use]
    pub fn force_rest(&self, state: PhaseState, sequence: u64) -> PhaseState {
        if state.phase == Phase::Rest {
            state
        } else {
            PhaseState {
                still_anchor: None,
                ..state.enter(Phase::Rest, sequence)
            }
        }
    }

    fn commits(&self, run: Run, direction: Direction) -> bool {
        run.direction == direction
            && ((run.displacement >= self.config.min_transition_delta_deg
                && run.snapshots >= self.config.debounce_count)
                || run.displacement >= self.config.decisive_delta_deg)
    }

    /// Trailing run of same-direction steps, ignoring sub-noise steps
    fn trailing_run(&self, trajectory: &[f64]) -> Option<Run> {
        let (&first, rest) = trajectory.split_first()?;
        let (mut anchor, mut last) = (first, first);
        let mut direction = None;
        let mut snapshots = 1;

        for &angle in rest {
            let step = angle - last;
            if step.abs() < self.config.noise_tolerance_deg {
                continue;
            }
            let step_direction = if step > 0.0 {
                Direction::Up
            } else {
                Direction::Down
            };
            if direction == Some(step_direction) {
                snapshots += 1;
            } else {
                anchor = last;
                direction = Some(step_direction);
                snapshots = 2;
            }
            last = angle;
        }

        direction.map(|direction| Run {
            direction,
            displacement: (last - anchor).abs(),
            snapshots,
        })
    }

    /// Snapshots observed after the lowest angle of the trajectory
    fn snapshots_since_minimum(&self, trajectory: &[f64]) -> usize {
        let mut min_index = 0;
        for (index, &angle) in trajectory.iter().enumerate() {
            if angle < trajectory[min_index] - self.config.noise_tolerance_deg {
                min_index = index;
            }
        }
        trajectory.len().saturating_sub(min_index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdealRangeTable;
    use pierre_core::models::{BodySide, ExerciseType, Joint, JointMeasurement};

    fn squat() -> ExerciseProfile {
        IdealRangeTable::embedded()
            .unwrap()
            .profile(ExerciseType::Squat)
            .unwrap()
    }

    fn snapshot(sequence: u64, knee: Option<f64>) -> PhaseSnapshot {
        PhaseSnapshot {
            sequence,
            timestamp_ms: sequence * 100,
            angles: JointAngleSet::from_measurements([(
                Joint::Knee,
                JointMeasurement {
                    angle: knee,
                    confidence: 0.9,
                    side: BodySide::Left,
                },
            )]),
            phase: Phase::Setup,
            score: None,
        }
    }

    fn run(angles: &[Option<f64>]) -> (Vec<Phase>, PhaseState) {
        let profile = squat();
        let detector = PhaseDetector::default();
        let mut window = SnapshotWindow::new(30);
        let mut state = PhaseState::default();
        let mut phases = Vec::new();
        for (i, angle) in angles.iter().enumerate() {
            window.push(snapshot(i as u64 + 1, *angle));
            state = detector.advance(state, &window, &profile);
            window.annotate_latest(state.phase, None);
            phases.push(state.phase);
        }
        (phases, state)
    }

    #[test]
    fn test_canonical_squat_rep() {
        let angles = [170.0, 140.0, 95.0, 70.0, 95.0, 140.0, 170.0].map(Some);
        let (phases, state) = run(&angles);
        assert_eq!(
            phases,
            vec![
                Phase::Setup,
                Phase::Eccentric,
                Phase::Eccentric,
                Phase::Bottom,
                Phase::Concentric,
                Phase::Concentric,
                Phase::Top,
            ]
        );
        assert_eq!(state.rep_count, 1);
    }

    #[test]
    fn test_oscillation_inside_band_never_transitions() {
        let angles: Vec<_> = (0..20)
            .map(|i| Some(if i % 2 == 0 { 166.0 } else { 174.0 }))
            .collect();
        let (phases, _) = run(&angles);
        assert!(phases.iter().all(|p| *p == Phase::Setup));
    }

    #[test]
    fn test_undefined_primary_contributes_nothing() {
        let angles = [Some(170.0), None, None, Some(168.0)];
        let (phases, _) = run(&angles);
        assert!(phases.iter().all(|p| *p == Phase::Setup));
    }

    #[test]
    fn test_local_minimum_reaches_bottom_above_threshold() {
        let angles = [170.0, 145.0, 120.0, 110.0, 110.5, 111.0, 110.0].map(Some);
        let (phases, _) = run(&angles);
        assert_eq!(phases.last(), Some(&Phase::Bottom));
    }

    #[test]
    fn test_stillness_moves_to_rest() {
        // 60 snapshots at 100 ms spacing holds still for 6 seconds.
        let angles: Vec<_> = (0..60).map(|_| Some(170.0)).collect();
        let (phases, _) = run(&angles);
        assert_eq!(phases.last(), Some(&Phase::Rest));
    }

    #[test]
    fn test_window_is_bounded_and_smooths_scores() {
        let mut window = SnapshotWindow::new(3);
        for i in 0..5 {
            window.push(snapshot(i, Some(170.0)));
            window.annotate_latest(Phase::Setup, Some(f64::from(u8::try_from(i).unwrap()) * 10.0));
        }
        assert_eq!(window.len(), 3);
        assert!((window.mean_score().unwrap() - 30.0).abs() < f64::EPSILON);
    }
}
