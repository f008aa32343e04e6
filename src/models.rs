// ABOUTME: Domain model re-exports for the form analysis server
// ABOUTME: Landmark frames, exercises, phases and analysis results from pierre-core
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub use pierre_core::models::*;
