// ABOUTME: Request tracing helpers for correlation and structured logging
// ABOUTME: Creates spans for HTTP requests and streaming sessions keyed by request id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use axum::http::Request;
use tracing::{field, info_span, Span};
use uuid::Uuid;

/// Request id from `x-request-id`, or a freshly generated one
#[must_use]
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| format!("req_{}", Uuid::new_v4().simple()), str::to_owned)
}

/// Span for one HTTP request, used by the server's `TraceLayer`
#[must_use]
pub fn create_request_span<B>(request: &Request<B>) -> Span {
    info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id(request),
        user_id = field::Empty,
        status_code = field::Empty,
    )
}

/// Span wrapping a streaming session task
#[must_use]
pub fn create_session_span(session_id: Uuid, user_id: &str) -> Span {
    info_span!(
        "form_session",
        session_id = %session_id,
        user_id = %user_id,
        rep_count = field::Empty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_request_id_from_header() {
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "req_fixed")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_id(&request), "req_fixed");
    }

    #[test]
    fn test_request_id_generated() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        assert!(request_id(&request).starts_with("req_"));
    }
}
