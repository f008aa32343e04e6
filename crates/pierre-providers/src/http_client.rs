// ABOUTME: Shared HTTP client with connection pooling for pose-model calls
// ABOUTME: Singleton pattern with configurable timeouts initialized at server startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use reqwest::{Client, ClientBuilder};
use std::sync::OnceLock;
use std::time::Duration;

/// Default request timeout in milliseconds; a pose call must fit inside a tick budget window
const DEFAULT_TIMEOUT_MS: u64 = 2_000;

/// Default connection timeout in milliseconds
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1_000;

/// Configured timeout values for the shared client
static CLIENT_TIMEOUTS: OnceLock<(u64, u64)> = OnceLock::new();

/// Global shared HTTP client with configured timeouts
static SHARED_CLIENT: OnceLock<Client> = OnceLock::new();

/// Initialize the shared HTTP client timeout configuration
///
/// Must be called once at server startup before any estimator is created.
/// If not called, defaults of 2s request and 1s connect timeout are used.
pub fn initialize_shared_client(timeout_ms: u64, connect_timeout_ms: u64) {
    let _ = CLIENT_TIMEOUTS.set((timeout_ms, connect_timeout_ms));
}

/// Get the shared HTTP client for pose-model calls
///
/// Falls back to default timeouts if `initialize_shared_client()` was not called.
pub fn shared_client() -> &'static Client {
    SHARED_CLIENT.get_or_init(|| {
        let (timeout, connect_timeout) = CLIENT_TIMEOUTS
            .get()
            .copied()
            .unwrap_or((DEFAULT_TIMEOUT_MS, DEFAULT_CONNECT_TIMEOUT_MS));

        ClientBuilder::new()
            .timeout(Duration::from_millis(timeout))
            .connect_timeout(Duration::from_millis(connect_timeout))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| Client::new())
    })
}
