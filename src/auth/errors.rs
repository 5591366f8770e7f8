//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Why authentication failed. Logged server-side; the response message
/// is deliberately coarse.
#[derive(Debug)]
pub enum AuthErrorKind {
    /// No bearer token on the request
    NotAuthenticated,
    /// The access token failed verification or carries no identity
    InvalidToken,
}

/// API authentication error. Rejects the request with a 401 before the
/// handler runs.
#[derive(Debug)]
pub struct ApiAuthError {
    kind: AuthErrorKind,
}

impl ApiAuthError {
    pub(super) fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::NotAuthenticated => "Not authenticated",
            AuthErrorKind::InvalidToken => "Invalid or expired access token",
        }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            success: bool,
            message: &'static str,
        }

        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                success: false,
                message: self.message(),
            }),
        )
            .into_response()
    }
}
