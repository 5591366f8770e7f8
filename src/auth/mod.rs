//! Access-token authentication for API endpoints.
//!
//! Callers authenticate with a short-lived access token in the
//! `Authorization: Bearer` header. The extractor verifies the token and
//! attaches the resolved identity to the request; requests that fail
//! verification are rejected before any handler runs.

mod bearer;
mod errors;
mod extractors;
mod state;

pub use errors::ApiAuthError;
pub use extractors::ApiAuth;
pub use state::HasAuthState;
