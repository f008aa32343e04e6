// ABOUTME: Constant re-exports for the form analysis server
// ABOUTME: Skeleton, camera, scoring, phase, streaming and route constants from pierre-core
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub use pierre_core::constants::*;
