// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Skeleton layout, visibility thresholds, and streaming/protocol defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped into logical domains rather than being in a single large file.

/// Skeleton layout produced by the pose-estimation model
pub mod skeleton {
    /// Number of landmarks in a complete frame
    pub const LANDMARK_COUNT: usize = 33;
    /// Landmarks below this visibility are treated as not seen
    pub const VISIBILITY_THRESHOLD: f64 = 0.5;
    /// Visibility assumed when a producer omits it
    pub const DEFAULT_VISIBILITY: f64 = 1.0;
}

/// Camera-setup heuristics
pub mod camera {
    /// Bounding box narrower than this is too far
    pub const MIN_BOX_WIDTH: f64 = 0.3;
    /// Bounding box shorter than this is too far
    pub const MIN_BOX_HEIGHT: f64 = 0.4;
    /// Bounding box wider than this is too close
    pub const MAX_BOX_WIDTH: f64 = 0.8;
    /// Bounding box taller than this is too close
    pub const MAX_BOX_HEIGHT: f64 = 0.9;
    /// Horizontal deviation from frame center that counts as off-center
    pub const MAX_CENTER_DEVIATION: f64 = 0.2;
    /// Shoulder/hip width ratio below which a side view is tilted
    pub const SIDE_VIEW_MIN_RATIO: f64 = 0.7;
    /// Vertical center above which the camera is aimed too low
    pub const VERTICAL_CENTER_LOW: f64 = 0.35;
    /// Vertical center below which the camera is aimed too high
    pub const VERTICAL_CENTER_HIGH: f64 = 0.65;
    /// Visible ratio for full visibility
    pub const FULL_VISIBILITY_RATIO: f64 = 0.85;
    /// Visible ratio for partial visibility
    pub const PARTIAL_VISIBILITY_RATIO: f64 = 0.70;
    /// Confidence bonus per good classification
    pub const GOOD_CLASSIFICATION_BONUS: f64 = 0.2;
}

/// Scoring defaults
pub mod scoring {
    /// Deviation outside the ideal range at which a joint scores 0
    pub const MAX_DEVIATION_DEG: f64 = 30.0;
    /// Deviation up to which an out-of-range joint is a warning (critical beyond)
    pub const WARNING_DEVIATION_DEG: f64 = 12.0;
    /// Left/right difference that triggers an asymmetry warning
    pub const SYMMETRY_WARNING_DEG: f64 = 15.0;
    /// Maximum feedback items returned per result
    pub const MAX_FEEDBACK_ITEMS: usize = 5;
    /// Joint confidence fraction required for the full analysis path
    pub const MIN_FULL_PATH_CONFIDENCE: f64 = 0.5;
}

/// Phase detector defaults
pub mod phase {
    /// Steps smaller than this are noise
    pub const NOISE_TOLERANCE_DEG: f64 = 2.0;
    /// Run displacement needed for a debounced transition
    pub const MIN_TRANSITION_DELTA_DEG: f64 = 10.0;
    /// Run displacement that commits a transition immediately
    pub const DECISIVE_DELTA_DEG: f64 = 20.0;
    /// Consistent snapshots needed for a debounced transition
    pub const DEBOUNCE_COUNT: usize = 3;
    /// Non-decreasing snapshots that mark a local minimum
    pub const LOCAL_MINIMUM_SNAPSHOTS: usize = 3;
    /// Band around the reference top angle that counts as top
    pub const TOP_TOLERANCE_DEG: f64 = 15.0;
    /// Stillness that moves any phase to rest
    pub const REST_TIMEOUT_MS: u64 = 5_000;
}

/// Streaming session defaults
pub mod streaming {
    /// Snapshots kept in the sliding window
    pub const WINDOW_SIZE: usize = 30;
    /// Analysis tick interval
    pub const ANALYSIS_INTERVAL_MS: u64 = 100;
    /// Smallest accepted analysis interval
    pub const MIN_ANALYSIS_INTERVAL_MS: u64 = 16;
    /// Analyse every Nth frame by sequence; 1 analyses each frame a tick sees
    pub const ANALYSIS_FRAME_STRIDE: u64 = 1;
    /// Without frames for this long a session rests
    pub const IDLE_TIMEOUT_MS: u64 = 3_000;
    /// Without frames for this long a session is torn down
    pub const TEARDOWN_TIMEOUT_MS: u64 = 30_000;
    /// First reconnect backoff step
    pub const RECONNECT_BASE_DELAY_MS: u64 = 500;
    /// Largest reconnect backoff step
    pub const RECONNECT_MAX_DELAY_MS: u64 = 8_000;
    /// Reconnect attempts before a detached session is discarded
    pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
    /// Outbound messages buffered per session
    pub const OUTBOUND_CHANNEL_CAPACITY: usize = 64;
    /// Control messages buffered per session
    pub const CONTROL_CHANNEL_CAPACITY: usize = 16;
    /// Lifecycle events buffered for observers
    pub const EVENT_CHANNEL_CAPACITY: usize = 256;
    /// Soft per-tick processing budget
    pub const TICK_BUDGET_MS: u64 = 50;
}

/// Network ports
pub mod ports {
    /// Default HTTP port
    pub const DEFAULT_HTTP_PORT: u16 = 8081;
}

/// API routes
pub mod routes {
    /// Health route
    pub const HEALTH: &str = "/health";
    /// Streaming analysis WebSocket
    pub const FORM_WEBSOCKET: &str = "/ws/form";
    /// Single-shot analysis fallback
    pub const FORM_ANALYZE: &str = "/api/form/analyze";
    /// On-demand camera diagnostics
    pub const FORM_CAMERA_CHECK: &str = "/api/form/camera-check";
    /// Loaded ideal-range table
    pub const FORM_EXERCISES: &str = "/api/form/exercises";
}

/// Service names for structured logging
pub mod service_names {
    /// Form analysis server
    pub const PIERRE_FORM_SERVER: &str = "pierre-form-server";
    /// JWT audience
    pub const FORM_AUDIENCE: &str = "pierre-form";
}
