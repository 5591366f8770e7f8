pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod exchange;
pub mod token;

use api::create_api_router;
use axum::Router;
use db::Database;
use std::sync::Arc;
use std::time::Duration;
use token::SessionTokens;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret for signing access tokens
    pub access_secret: Vec<u8>,
    /// Secret for signing refresh tokens (must differ from access_secret)
    pub refresh_secret: Vec<u8>,
    /// Access token lifetime; None issues non-expiring tokens
    pub access_ttl: Option<Duration>,
    /// Refresh token lifetime; None issues non-expiring tokens
    pub refresh_ttl: Option<Duration>,
}

impl ServerConfig {
    /// Build the token configuration from the configured secrets and
    /// lifetimes.
    pub fn session_tokens(&self) -> SessionTokens {
        SessionTokens::new(
            &self.access_secret,
            &self.refresh_secret,
            self.access_ttl,
            self.refresh_ttl,
        )
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let tokens = Arc::new(config.session_tokens());

    Router::new().nest("/api", create_api_router(config.db.clone(), tokens))
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    axum::serve(listener, app).await
}
