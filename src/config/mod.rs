// ABOUTME: Configuration module for the form analysis server
// ABOUTME: Environment-driven server, auth, streaming, pose-model and analysis settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module
//!
//! All settings come from environment variables with defaults; the binary
//! applies CLI overrides on top.

/// Environment and server configuration
pub mod environment;

pub use environment::{AnalysisConfig, AuthConfig, PoseModelConfig, ServerConfig, StreamingConfig};
