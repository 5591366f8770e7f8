//! Session token API endpoints.
//!
//! - POST `/refresh` - Exchange a refresh token for a new access token

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::ApiError;
use crate::auth::{ApiAuth, HasAuthState};
use crate::db::Database;
use crate::exchange::{self, Outcome, Reject};
use crate::token::SessionTokens;

#[derive(Clone)]
pub struct SessionState {
    pub db: Database,
    pub tokens: Arc<SessionTokens>,
}

impl HasAuthState for SessionState {
    fn tokens(&self) -> &SessionTokens {
        &self.tokens
    }
}

pub fn router(state: SessionState) -> Router {
    Router::new()
        .route("/refresh", post(refresh_token))
        .with_state(state)
}

#[derive(Deserialize)]
struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    refresh_token: Option<String>,
}

/// Exchange the presented refresh token for a new access token.
///
/// The caller must already hold a valid access token; the upstream
/// extractor resolves their identity before this handler runs. The
/// three verification failures share one client-facing message so a
/// caller cannot probe which check failed.
async fn refresh_token(
    State(state): State<SessionState>,
    ApiAuth(caller): ApiAuth,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // A missing or malformed body is treated as a missing token
    let presented = body.ok().and_then(|Json(request)| request.refresh_token);

    let outcome = exchange::exchange(&state.db, &state.tokens, &caller, presented.as_deref())
        .await
        .map_err(|e| ApiError::internal_error("Refresh exchange failed", e))?;

    match outcome {
        Outcome::Issued(token) => Ok((
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "data": { "token": token } })),
        )),
        Outcome::Rejected(Reject::MissingToken) => {
            Err(ApiError::bad_request("Missing refresh token"))
        }
        Outcome::Rejected(_) => Err(ApiError::unauthorized("Invalid refresh token")),
    }
}
