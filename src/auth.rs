// ABOUTME: JWT validation for streaming and REST form analysis clients
// ABOUTME: Issues and verifies HS256 tokens carrying the user id, issue time and expiry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Authentication
//!
//! User accounts live outside this service. Clients present a JWT signed
//! with the shared HS256 secret and the server only validates it.

use crate::config::AuthConfig;
use crate::constants::service_names::FORM_AUDIENCE;
use crate::errors::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Length of a generated signing secret
const GENERATED_SECRET_BYTES: usize = 64;

/// `JWT` claims for form analysis clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User `ID`
    pub sub: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Audience (who the token is intended for)
    pub aud: String,
}

/// Validates and issues HS256 tokens
#[derive(Clone)]
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_hours: i64,
}

impl fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthManager")
            .field("token_expiry_hours", &self.token_expiry_hours)
            .finish_non_exhaustive()
    }
}

impl AuthManager {
    /// Create an authentication manager from a shared secret
    #[must_use]
    pub fn new(secret: &[u8], token_expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            token_expiry_hours,
        }
    }

    /// Create from configuration, generating a random secret when none is set
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        config.jwt_secret.as_ref().map_or_else(
            || {
                let mut secret = [0_u8; GENERATED_SECRET_BYTES];
                rand::thread_rng().fill_bytes(&mut secret);
                Self::new(&secret, config.jwt_expiry_hours)
            },
            |secret| Self::new(secret.as_bytes(), config.jwt_expiry_hours),
        )
    }

    /// Issue a token for a user
    ///
    /// # Errors
    ///
    /// Returns an internal error if signing fails
    pub fn generate_token(&self, user_id: &str) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_owned(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.token_expiry_hours)).timestamp(),
            aud: FORM_AUDIENCE.to_owned(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }

    /// Validate a raw token
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` for expired, malformed or wrongly signed tokens
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_audience(&[FORM_AUDIENCE]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| {
                debug!(user_id = %data.claims.sub, "JWT validated");
                data.claims
            })
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "token expired",
                    ErrorKind::InvalidSignature => "signature is invalid",
                    ErrorKind::InvalidAudience => "token audience mismatch",
                    _ => "token is malformed",
                };
                warn!(reason, "JWT validation failed");
                AppError::auth_invalid(format!("Authentication failed: {reason}"))
            })
    }

    /// Validate a token that may carry a `Bearer ` prefix
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` when no token is present, otherwise the
    /// validation error
    pub fn authenticate(&self, token: Option<&str>) -> AppResult<Claims> {
        let token = token
            .map(|t| t.strip_prefix("Bearer ").unwrap_or(t).trim())
            .filter(|t| !t.is_empty())
            .ok_or_else(AppError::auth_required)?;
        self.validate_token(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pierre_core::errors::ErrorCode;

    #[test]
    fn test_generate_and_validate() {
        let auth = AuthManager::new(b"test-secret", 1);
        let token = auth.generate_token("athlete-1").unwrap();
        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "athlete-1");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_bearer_prefix_accepted() {
        let auth = AuthManager::new(b"test-secret", 1);
        let token = auth.generate_token("athlete-1").unwrap();
        let header = format!("Bearer {token}");
        assert!(auth.authenticate(Some(&header)).is_ok());
    }

    #[test]
    fn test_missing_token_requires_auth() {
        let auth = AuthManager::new(b"test-secret", 1);
        let err = auth.authenticate(None).unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthRequired);
        let err = auth.authenticate(Some("Bearer ")).unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthRequired);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = AuthManager::new(b"secret-a", 1);
        let verifier = AuthManager::new(b"secret-b", 1);
        let token = issuer.generate_token("athlete-1").unwrap();
        let err = verifier.validate_token(&token).unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthInvalid);
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = AuthManager::new(b"test-secret", -2);
        let token = auth.generate_token("athlete-1").unwrap();
        let err = auth.validate_token(&token).unwrap_err();
        assert!(err.message.contains("expired"));
    }

    #[test]
    fn test_generated_secrets_differ() {
        let config = AuthConfig::default();
        let a = AuthManager::from_config(&config);
        let b = AuthManager::from_config(&config);
        let token = a.generate_token("athlete-1").unwrap();
        assert!(b.validate_token(&token).is_err());
    }
}
