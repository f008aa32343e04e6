// ABOUTME: Error type re-exports for the form analysis server
// ABOUTME: AppError, ErrorCode and response types live in pierre-core
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub use pierre_core::errors::*;
