// ABOUTME: Core types and constants for Pierre real-time form analysis
// ABOUTME: Foundation crate with error handling, landmark and analysis models, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Core
//!
//! Foundation crate providing shared types and constants for the Pierre form
//! analysis pipeline. This crate is designed to change infrequently, enabling
//! incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError` and machine-readable `ErrorCode`
//! - **constants**: Skeleton layout, thresholds and protocol defaults
//! - **models**: Landmark frames, joint angles, phases, camera diagnostics and analysis results

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core data models (landmarks, joints, phases, analysis results)
pub mod models;
