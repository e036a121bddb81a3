// ABOUTME: JWT verification and the three call-site authentication policies
// ABOUTME: Validates HS256 Supabase tokens and maps failures to stable error codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Promptwise Contributors

//! # Authentication
//!
//! HS256 JWT verification against the shared Supabase secret, with an
//! audience check. Three policies cover the route surface:
//!
//! - [`AuthManager::authenticate`]: strict, 401 on missing or invalid
//!   credentials.
//! - [`AuthManager::authenticate_optional`]: anonymous on missing or
//!   invalid credentials, never an error.
//! - [`AuthManager::authenticate_detailed`]: strict, and additionally
//!   requires a non-empty subject claim. An empty subject in an otherwise
//!   valid token is a consistency defect on the issuer side, reported
//!   distinctly from an invalid token.

use crate::config::AuthConfig;
use crate::errors::{AppError, AppResult};
use http::header::AUTHORIZATION;
use http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims carried by a Supabase access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// User email, if present
    #[serde(default)]
    pub email: Option<String>,
    /// Audience
    pub aud: String,
    /// Role, if present
    #[serde(default)]
    pub role: Option<String>,
    /// Expiry (unix seconds)
    pub exp: usize,
}

/// The identity attached to an authenticated request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Stable user id (subject claim)
    pub user_id: String,
    /// Email, when the token carries one
    pub email: Option<String>,
}

/// JWT validation failures, by cause
#[derive(Debug, Error)]
pub enum JwtValidationError {
    #[error("token has expired")]
    TokenExpired,
    #[error("token is invalid: {0}")]
    TokenInvalid(String),
    #[error("token is malformed")]
    TokenMalformed,
}

impl From<JwtValidationError> for AppError {
    fn from(error: JwtValidationError) -> Self {
        match error {
            JwtValidationError::TokenExpired => Self::auth_expired(),
            JwtValidationError::TokenInvalid(reason) => Self::auth_invalid(reason),
            JwtValidationError::TokenMalformed => Self::auth_invalid("Malformed token"),
        }
    }
}

/// Verifies bearer tokens and applies the route authentication policies
pub struct AuthManager {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthManager {
    /// Build a manager from the auth configuration
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[config.jwt_audience.as_str()]);
        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Verify a raw token string and return its claims
    ///
    /// # Errors
    ///
    /// Returns a [`JwtValidationError`] classifying the failure.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtValidationError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    JwtValidationError::TokenExpired
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken
                | jsonwebtoken::errors::ErrorKind::Base64(_)
                | jsonwebtoken::errors::ErrorKind::Json(_)
                | jsonwebtoken::errors::ErrorKind::Utf8(_) => JwtValidationError::TokenMalformed,
                other => JwtValidationError::TokenInvalid(format!("{other:?}")),
            })
    }

    /// Strict policy: a valid bearer token is required
    ///
    /// # Errors
    ///
    /// Returns 401-mapped errors for missing or invalid credentials.
    pub fn authenticate(&self, headers: &HeaderMap) -> AppResult<AuthenticatedUser> {
        let token = bearer_token(headers).ok_or_else(AppError::auth_required)?;
        let claims = self.verify(token)?;
        Ok(AuthenticatedUser {
            user_id: claims.sub,
            email: claims.email,
        })
    }

    /// Optional policy: invalid or missing credentials degrade to anonymous
    #[must_use]
    pub fn authenticate_optional(&self, headers: &HeaderMap) -> Option<AuthenticatedUser> {
        let token = bearer_token(headers)?;
        match self.verify(token) {
            Ok(claims) => Some(AuthenticatedUser {
                user_id: claims.sub,
                email: claims.email,
            }),
            Err(e) => {
                tracing::debug!("ignoring invalid bearer token: {e}");
                None
            }
        }
    }

    /// Strict policy with subject consistency check
    ///
    /// # Errors
    ///
    /// As [`Self::authenticate`], plus an internal error when the token is
    /// valid but carries an empty subject.
    pub fn authenticate_detailed(&self, headers: &HeaderMap) -> AppResult<AuthenticatedUser> {
        let user = self.authenticate(headers)?;
        if user.user_id.is_empty() {
            return Err(AppError::internal("authenticated token has empty subject"));
        }
        Ok(user)
    }
}

/// Extract the token from an `Authorization: Bearer ...` header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const TEST_SECRET: &str = "test-secret";

    fn manager() -> AuthManager {
        AuthManager::new(&AuthConfig {
            jwt_secret: TEST_SECRET.to_owned(),
            jwt_audience: "authenticated".to_owned(),
        })
    }

    fn make_token(sub: &str, aud: &str, exp_offset_secs: i64) -> String {
        let exp = chrono::Utc::now().timestamp() + exp_offset_secs;
        let claims = Claims {
            sub: sub.to_owned(),
            email: Some("user@example.com".to_owned()),
            aud: aud.to_owned(),
            role: Some("authenticated".to_owned()),
            exp: usize::try_from(exp).unwrap(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn headers_with_token(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn test_valid_token_authenticates() {
        let token = make_token("user-123", "authenticated", 3600);
        let user = manager().authenticate(&headers_with_token(&token)).unwrap();
        assert_eq!(user.user_id, "user-123");
        assert_eq!(user.email.as_deref(), Some("user@example.com"));
    }

    #[test]
    fn test_missing_header_is_auth_required() {
        let err = manager().authenticate(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.http_status(), 401);
    }

    #[test]
    fn test_expired_token_maps_to_expired_error() {
        let token = make_token("user-123", "authenticated", -3600);
        let err = manager()
            .authenticate(&headers_with_token(&token))
            .unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::AuthExpired);
    }

    #[test]
    fn test_wrong_audience_is_rejected() {
        let token = make_token("user-123", "other-audience", 3600);
        assert!(manager().verify(&token).is_err());
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let result = manager().verify("not-a-jwt");
        assert!(matches!(result, Err(JwtValidationError::TokenMalformed)));
    }

    #[test]
    fn test_optional_policy_never_fails() {
        let manager = manager();
        assert!(manager.authenticate_optional(&HeaderMap::new()).is_none());
        assert!(manager
            .authenticate_optional(&headers_with_token("garbage"))
            .is_none());

        let token = make_token("user-123", "authenticated", 3600);
        assert!(manager
            .authenticate_optional(&headers_with_token(&token))
            .is_some());
    }

    #[test]
    fn test_detailed_policy_rejects_empty_subject() {
        let token = make_token("", "authenticated", 3600);
        let err = manager()
            .authenticate_detailed(&headers_with_token(&token))
            .unwrap_err();
        assert_eq!(err.http_status(), 500);
    }
}
