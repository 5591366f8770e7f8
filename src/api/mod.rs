mod error;
mod session;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::token::SessionTokens;

pub use session::SessionState;

/// Create the API router.
pub fn create_api_router(db: Database, tokens: Arc<SessionTokens>) -> Router {
    let session_state = session::SessionState { db, tokens };

    Router::new().nest("/session", session::router(session_state))
}
