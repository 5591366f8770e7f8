//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use super::bearer::bearer_token;
use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthState;
use crate::token::{Identity, Payload};

/// Extractor for API endpoints that require authentication.
///
/// Verifies the bearer access token and resolves the caller's identity.
/// Opaque tokens verify cryptographically but carry no identity, so
/// they are rejected here.
pub struct ApiAuth(pub Identity);

impl<S> FromRequestParts<S> for ApiAuth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiAuthError::new(AuthErrorKind::NotAuthenticated))?;

        let payload = state.tokens().verify_access(token).map_err(|e| {
            debug!(error = %e, "Access token failed verification");
            ApiAuthError::new(AuthErrorKind::InvalidToken)
        })?;

        match payload {
            Payload::Identity(identity) => Ok(ApiAuth(identity)),
            Payload::Opaque(_) => Err(ApiAuthError::new(AuthErrorKind::InvalidToken)),
        }
    }
}
