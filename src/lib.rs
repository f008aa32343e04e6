// ABOUTME: Main library entry point for the Pierre real-time form analysis server
// ABOUTME: Streams pose landmarks through biomechanics, phase detection and scoring
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Form Server
//!
//! Real-time exercise form analysis. Clients stream camera frames or
//! pre-extracted pose landmarks over a WebSocket and receive per-tick
//! form scores, movement phases, rep counts and coaching feedback.
//!
//! ## Architecture
//!
//! - **`pierre-core`**: landmark, exercise and result models plus the error taxonomy
//! - **`pierre-intelligence`**: biomechanics, camera gate, phase detector and scorer
//! - **`pierre-providers`**: pose model clients behind a circuit breaker
//! - **Streaming**: one task per session, latest-frame ingestion, reconnect backoff
//! - **Routes**: `/ws/form`, the REST fallback under `/api/form` and `/health`
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pierre_form_server::config::ServerConfig;
//! use pierre_form_server::errors::AppResult;
//!
//! fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Form server configured on port {}", config.http_port);
//!     Ok(())
//! }
//! ```

/// JWT validation for session starts and REST calls
pub mod auth;

/// Environment configuration
pub mod config;

/// Application constants
pub mod constants;

/// Unified error handling
pub mod errors;

/// Structured logging setup and form analysis log helpers
pub mod logging;

/// HTTP middleware for tracing and CORS
pub mod middleware;

/// Landmark, exercise and analysis models
pub mod models;

/// HTTP and WebSocket routes
pub mod routes;

/// Shared resources and the HTTP server
pub mod server;

/// Streaming sessions, pipeline and protocol
pub mod streaming;

/// WebSocket connection handling
pub mod websocket;
