// ABOUTME: Environment configuration for the form analysis server
// ABOUTME: Parses ports, auth, streaming cadence, pose-model endpoints and analysis thresholds
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration management

use crate::constants::{ports, streaming};
use crate::errors::{AppError, AppResult};
use pierre_intelligence::{CameraConfig, PhaseDetectorConfig, ScoringConfig};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Token signing settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 secret; a random one is generated when unset
    pub jwt_secret: Option<String>,
    /// Lifetime of generated tokens
    pub jwt_expiry_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiry_hours: 24,
        }
    }
}

/// Session cadence, window and reconnect settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamingConfig {
    /// Snapshots kept per session
    pub window_size: usize,
    /// Analysis tick interval
    pub analysis_interval_ms: u64,
    /// Only frames at least this many sequence numbers past the last
    /// analysed frame are analysed
    pub analysis_frame_stride: u64,
    /// Without frames for this long a session rests
    pub idle_timeout_ms: u64,
    /// Without frames for this long a session is torn down
    pub teardown_timeout_ms: u64,
    /// First reconnect backoff step
    pub reconnect_base_delay_ms: u64,
    /// Largest reconnect backoff step
    pub reconnect_max_delay_ms: u64,
    /// Backoff steps before a detached session is discarded
    pub max_reconnect_attempts: u32,
    /// Outbound messages buffered per connection
    pub outbound_capacity: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            window_size: streaming::WINDOW_SIZE,
            analysis_interval_ms: streaming::ANALYSIS_INTERVAL_MS,
            analysis_frame_stride: streaming::ANALYSIS_FRAME_STRIDE,
            idle_timeout_ms: streaming::IDLE_TIMEOUT_MS,
            teardown_timeout_ms: streaming::TEARDOWN_TIMEOUT_MS,
            reconnect_base_delay_ms: streaming::RECONNECT_BASE_DELAY_MS,
            reconnect_max_delay_ms: streaming::RECONNECT_MAX_DELAY_MS,
            max_reconnect_attempts: streaming::MAX_RECONNECT_ATTEMPTS,
            outbound_capacity: streaming::OUTBOUND_CHANNEL_CAPACITY,
        }
    }
}

impl StreamingConfig {
    /// Analysis tick interval
    #[must_use]
    pub const fn analysis_interval(&self) -> Duration {
        Duration::from_millis(self.analysis_interval_ms)
    }

    /// Whether a frame is far enough past the last analysed one
    #[must_use]
    pub const fn frame_due(&self, last_analyzed: Option<u64>, sequence: u64) -> bool {
        match last_analyzed {
            Some(last) => sequence >= last.saturating_add(self.analysis_frame_stride),
            None => true,
        }
    }

    /// Idle timeout
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Teardown timeout
    #[must_use]
    pub const fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }

    /// Delay before the given zero-based reconnect attempt, doubling up to the cap
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1_u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay = self
            .reconnect_base_delay_ms
            .saturating_mul(factor)
            .min(self.reconnect_max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Full reconnect schedule
    #[must_use]
    pub fn backoff_schedule(&self) -> Vec<Duration> {
        (0..self.max_reconnect_attempts)
            .map(|attempt| self.backoff_delay(attempt))
            .collect()
    }

    /// Clamp a client-requested interval to the accepted minimum
    #[must_use]
    pub fn clamp_interval(requested_ms: u64) -> Duration {
        Duration::from_millis(requested_ms.max(streaming::MIN_ANALYSIS_INTERVAL_MS))
    }

    /// Validate cadence and timeout ordering
    ///
    /// # Errors
    ///
    /// Returns a config error for zero sizes or intervals and inverted timeouts
    pub fn validate(&self) -> AppResult<()> {
        if self.window_size == 0 {
            return Err(AppError::config("FORM_WINDOW_SIZE must be greater than 0"));
        }
        if self.analysis_interval_ms < streaming::MIN_ANALYSIS_INTERVAL_MS {
            return Err(AppError::config(format!(
                "FORM_ANALYSIS_INTERVAL_MS must be at least {}",
                streaming::MIN_ANALYSIS_INTERVAL_MS
            )));
        }
        if self.analysis_frame_stride == 0 {
            return Err(AppError::config("FORM_ANALYSIS_EVERY_N_FRAMES must be greater than 0"));
        }
        if self.idle_timeout_ms == 0 || self.idle_timeout_ms >= self.teardown_timeout_ms {
            return Err(AppError::config(
                "FORM_IDLE_TIMEOUT_MS must be positive and below FORM_TEARDOWN_TIMEOUT_MS",
            ));
        }
        if self.reconnect_base_delay_ms == 0
            || self.reconnect_base_delay_ms > self.reconnect_max_delay_ms
        {
            return Err(AppError::config(
                "FORM_RECONNECT_BASE_MS must be positive and not exceed FORM_RECONNECT_MAX_MS",
            ));
        }
        if self.max_reconnect_attempts == 0 || self.outbound_capacity == 0 {
            return Err(AppError::config(
                "FORM_RECONNECT_ATTEMPTS and FORM_OUTBOUND_CAPACITY must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// External pose-estimation model endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoseModelConfig {
    /// Primary model URL
    pub url: Option<String>,
    /// Model used for the single retry
    pub fallback_url: Option<String>,
    /// Request timeout
    pub timeout_ms: u64,
    /// Connect timeout
    pub connect_timeout_ms: u64,
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// Seconds the circuit stays open
    pub recovery_timeout_secs: u64,
}

impl Default for PoseModelConfig {
    fn default() -> Self {
        Self {
            url: None,
            fallback_url: None,
            timeout_ms: 2_000,
            connect_timeout_ms: 1_000,
            failure_threshold: 5,
            recovery_timeout_secs: 10,
        }
    }
}

/// Analysis tables and thresholds
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfig {
    /// Ideal-range YAML replacing the embedded table
    pub ideal_ranges_path: Option<PathBuf>,
    /// Phase detector thresholds
    pub phase: PhaseDetectorConfig,
    /// Scoring thresholds
    pub scoring: ScoringConfig,
    /// Camera diagnostic thresholds
    pub camera: CameraConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP and WebSocket port
    pub http_port: u16,
    /// Token settings
    pub auth: AuthConfig,
    /// Session cadence and reconnects
    pub streaming: StreamingConfig,
    /// Pose model endpoints
    pub pose_model: PoseModelConfig,
    /// Analysis tables and thresholds
    pub analysis: AnalysisConfig,
    /// Comma-separated allowed origins, `*` for any
    pub cors_allowed_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: ports::DEFAULT_HTTP_PORT,
            auth: AuthConfig::default(),
            streaming: StreamingConfig::default(),
            pose_model: PoseModelConfig::default(),
            analysis: AnalysisConfig::default(),
            cors_allowed_origins: "*".to_owned(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a config error when a variable is set but cannot be parsed,
    /// or when the resulting configuration is invalid
    pub fn from_env() -> AppResult<Self> {
        info!("Loading configuration from environment variables");
        let defaults = Self::default();
        let streaming_defaults = defaults.streaming;
        let pose_defaults = defaults.pose_model;

        let config = Self {
            http_port: env_parse("HTTP_PORT", defaults.http_port)?,
            auth: AuthConfig {
                jwt_secret: env_optional("JWT_SECRET"),
                jwt_expiry_hours: env_parse("JWT_EXPIRY_HOURS", defaults.auth.jwt_expiry_hours)?,
            },
            streaming: StreamingConfig {
                window_size: env_parse("FORM_WINDOW_SIZE", streaming_defaults.window_size)?,
                analysis_interval_ms: env_parse(
                    "FORM_ANALYSIS_INTERVAL_MS",
                    streaming_defaults.analysis_interval_ms,
                )?,
                analysis_frame_stride: env_parse(
                    "FORM_ANALYSIS_EVERY_N_FRAMES",
                    streaming_defaults.analysis_frame_stride,
                )?,
                idle_timeout_ms: env_parse(
                    "FORM_IDLE_TIMEOUT_MS",
                    streaming_defaults.idle_timeout_ms,
                )?,
                teardown_timeout_ms: env_parse(
                    "FORM_TEARDOWN_TIMEOUT_MS",
                    streaming_defaults.teardown_timeout_ms,
                )?,
                reconnect_base_delay_ms: env_parse(
                    "FORM_RECONNECT_BASE_MS",
                    streaming_defaults.reconnect_base_delay_ms,
                )?,
                reconnect_max_delay_ms: env_parse(
                    "FORM_RECONNECT_MAX_MS",
                    streaming_defaults.reconnect_max_delay_ms,
                )?,
                max_reconnect_attempts: env_parse(
                    "FORM_RECONNECT_ATTEMPTS",
                    streaming_defaults.max_reconnect_attempts,
                )?,
                outbound_capacity: env_parse(
                    "FORM_OUTBOUND_CAPACITY",
                    streaming_defaults.outbound_capacity,
                )?,
            },
            pose_model: PoseModelConfig {
                url: env_optional("POSE_MODEL_URL"),
                fallback_url: env_optional("POSE_MODEL_FALLBACK_URL"),
                timeout_ms: env_parse("POSE_MODEL_TIMEOUT_MS", pose_defaults.timeout_ms)?,
                connect_timeout_ms: env_parse(
                    "POSE_MODEL_CONNECT_TIMEOUT_MS",
                    pose_defaults.connect_timeout_ms,
                )?,
                failure_threshold: env_parse(
                    "POSE_MODEL_FAILURE_THRESHOLD",
                    pose_defaults.failure_threshold,
                )?,
                recovery_timeout_secs: env_parse(
                    "POSE_MODEL_RECOVERY_SECS",
                    pose_defaults.recovery_timeout_secs,
                )?,
            },
            analysis: AnalysisConfig {
                ideal_ranges_path: env_optional("FORM_IDEAL_RANGES_PATH").map(PathBuf::from),
                phase: PhaseDetectorConfig::from_env(),
                scoring: ScoringConfig::from_env(),
                camera: CameraConfig::default(),
            },
            cors_allowed_origins: env_optional("CORS_ALLOWED_ORIGINS")
                .unwrap_or(defaults.cors_allowed_origins),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns a config error describing the first invalid setting
    pub fn validate(&self) -> AppResult<()> {
        if self.http_port == 0 {
            return Err(AppError::config("HTTP_PORT must be greater than 0"));
        }
        if self.auth.jwt_expiry_hours <= 0 {
            return Err(AppError::config("JWT_EXPIRY_HOURS must be greater than 0"));
        }
        self.streaming.validate()?;
        self.analysis.phase.validate()?;
        self.analysis.scoring.validate()?;

        if self.pose_model.url.is_none() && self.pose_model.fallback_url.is_some() {
            warn!("POSE_MODEL_FALLBACK_URL is set without POSE_MODEL_URL; image frames are disabled");
        }
        if self.auth.jwt_secret.is_none() {
            warn!("JWT_SECRET is not set; tokens will not survive a restart");
        }
        Ok(())
    }

    /// Human-readable configuration summary for startup logs
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Pierre Form Server Configuration:\n\
             - HTTP Port: {}\n\
             - JWT Secret: {}\n\
             - Window Size: {}\n\
             - Analysis Interval: {} ms, every {} frame(s)\n\
             - Idle/Teardown Timeout: {} ms / {} ms\n\
             - Reconnect: {} attempts from {} ms up to {} ms\n\
             - Pose Model: {}\n\
             - Pose Model Fallback: {}\n\
             - Ideal Ranges: {}",
            self.http_port,
            if self.auth.jwt_secret.is_some() {
                "Configured"
            } else {
                "Generated"
            },
            self.streaming.window_size,
            self.streaming.analysis_interval_ms,
            self.streaming.analysis_frame_stride,
            self.streaming.idle_timeout_ms,
            self.streaming.teardown_timeout_ms,
            self.streaming.max_reconnect_attempts,
            self.streaming.reconnect_base_delay_ms,
            self.streaming.reconnect_max_delay_ms,
            self.pose_model.url.as_deref().unwrap_or("Disabled"),
            self.pose_model.fallback_url.as_deref().unwrap_or("None"),
            self.analysis
                .ideal_ranges_path
                .as_ref()
                .map_or_else(|| "Embedded".to_owned(), |p| p.display().to_string()),
        )
    }
}

/// Non-empty environment variable
fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` when unset
fn env_parse<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    env_optional(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|_| AppError::config(format!("Invalid value for {key}: '{raw}'")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        ServerConfig::default().validate().unwrap();
    }

    #[test]
    fn test_backoff_doubles_to_cap() {
        let schedule = StreamingConfig::default().backoff_schedule();
        let millis: Vec<u128> = schedule.iter().map(Duration::as_millis).collect();
        assert_eq!(millis, vec![500, 1_000, 2_000, 4_000, 8_000]);

        let config = StreamingConfig::default();
        assert_eq!(config.backoff_delay(10), Duration::from_millis(8_000));
        assert_eq!(config.backoff_delay(200), Duration::from_millis(8_000));
    }

    #[test]
    fn test_inverted_timeouts_rejected() {
        let config = StreamingConfig {
            idle_timeout_ms: 40_000,
            ..StreamingConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.message.contains("FORM_IDLE_TIMEOUT_MS"));
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = StreamingConfig {
            window_size: 0,
            ..StreamingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_frame_stride_counts_sequence_numbers() {
        let config = StreamingConfig {
            analysis_frame_stride: 3,
            ..StreamingConfig::default()
        };
        assert!(config.frame_due(None, 7));
        assert!(!config.frame_due(Some(7), 9));
        assert!(config.frame_due(Some(7), 10));
        assert!(StreamingConfig::default().frame_due(Some(7), 8));
    }

    #[test]
    fn test_interval_clamped() {
        assert_eq!(StreamingConfig::clamp_interval(1), Duration::from_millis(16));
        assert_eq!(StreamingConfig::clamp_interval(250), Duration::from_millis(250));
    }

    #[test]
    fn test_summary_mentions_disabled_pose_model() {
        let summary = ServerConfig::default().summary();
        assert!(summary.contains("Pose Model: Disabled"));
        assert!(summary.contains("Ideal Ranges: Embedded"));
    }
}
