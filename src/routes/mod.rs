// ABOUTME: Route module organization for the form analysis HTTP endpoints
// ABOUTME: Groups REST fallback, health and WebSocket routes by concern
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Route modules
//!
//! Each module holds route definitions and thin handlers that delegate to
//! the analysis pipeline or the session manager.

/// Single-shot analysis, camera diagnostics and the range table
pub mod analysis;
/// Health check routes
pub mod health;
/// Streaming analysis socket
pub mod websocket;

/// Form analysis REST routes
pub use analysis::FormRoutes;
/// Health route handlers
pub use health::HealthRoutes;
/// WebSocket route handlers
pub use websocket::WebSocketRoutes;
