//! Bearer credentials.
//!
//! A token is `<user_id>.<signature>` where the signature is the hex SHA-256
//! of `secret ":" user_id`. Verification yields the owner id every task read
//! and write is scoped by.

use std::fmt::Write as _;

use axum::extract::{FromRef, FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tempo_core::OwnerId;
use tracing::debug;

use crate::error::AppError;
use crate::server::AppState;

/// Why a credential was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("malformed bearer token")]
    Malformed,
    #[error("invalid token signature")]
    BadSignature,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        Self::Unauthorized(err.to_string())
    }
}

/// Verifies a bearer credential and yields the user it belongs to.
pub trait TokenVerifier: Send + Sync {
    /// Verify `token`.
    ///
    /// # Errors
    ///
    /// Returns an `AuthError` when the token is malformed or not genuine.
    fn verify(&self, token: &str) -> Result<OwnerId, AuthError>;
}

/// Tokens signed with a shared secret.
#[derive(Clone)]
pub struct SignedTokenVerifier {
    secret: String,
}

impl SignedTokenVerifier {
    /// Create a verifier for `secret`.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Issue a token for `user_id`.
    #[must_use]
    pub fn issue(&self, user_id: &str) -> String {
        format!("{user_id}.{}", self.signature(user_id))
    }

    fn signature(&self, user_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b":");
        hasher.update(user_id.as_bytes());

        let mut hex = String::with_capacity(64);
        for byte in hasher.finalize() {
            let _ = write!(hex, "{byte:02x}");
        }
        hex
    }
}

impl std::fmt::Debug for SignedTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedTokenVerifier").finish_non_exhaustive()
    }
}

impl TokenVerifier for SignedTokenVerifier {
    fn verify(&self, token: &str) -> Result<OwnerId, AuthError> {
        let (user_id, signature) = token.rsplit_once('.').ok_or(AuthError::Malformed)?;
        if user_id.is_empty() || signature.is_empty() {
            return Err(AuthError::Malformed);
        }

        if !constant_time_eq(signature.as_bytes(), self.signature(user_id).as_bytes()) {
            return Err(AuthError::BadSignature);
        }
        Ok(OwnerId::new(user_id))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Extract the raw bearer token from the `Authorization` header, falling
/// back to the `token` query parameter.
fn bearer_token(parts: &Parts) -> Result<String, AuthError> {
    if let Some(value) = parts.headers.get(AUTHORIZATION) {
        let value = value.to_str().map_err(|_| AuthError::Malformed)?;
        return value
            .strip_prefix("Bearer ")
            .map(|token| token.trim().to_string())
            .ok_or(AuthError::Malformed);
    }

    Query::<TokenQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(query)| query.token)
        .ok_or(AuthError::Missing)
}

/// The verified user making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedOwner(pub OwnerId);

impl<S> FromRequestParts<S> for AuthenticatedOwner
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        let token = bearer_token(parts)?;
        let owner = app.verifier.verify(&token).inspect_err(|e| {
            debug!(error = %e, path = %parts.uri.path(), "Rejected credential");
        })?;
        Ok(Self(owner))
    }
}
