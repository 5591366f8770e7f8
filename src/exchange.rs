//! Refresh token exchange.
//!
//! Exchanges a long-lived refresh token for a new short-lived access
//! token. A token is exchangeable only when it verifies against the
//! refresh secret, its embedded identity matches the caller's
//! authenticated identity, and it is byte-identical to the token on
//! file for that user. The last check closes the replay window: a
//! superseded token stays cryptographically valid but is unusable.
//!
//! The exchange never mutates the user record; only the access token
//! changes hands.

use tracing::warn;

use crate::db::Database;
use crate::token::{Identity, Payload, SessionTokens, TokenError};

/// Why an exchange was rejected.
///
/// Every cause is logged distinctly for auditing, but the client-facing
/// 401 response is identical across the three verification causes so a
/// caller cannot probe which check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reject {
    /// No refresh token in the request body
    MissingToken,
    /// The refresh token failed cryptographic verification
    InvalidToken,
    /// The decoded identity differs from the caller's authenticated identity
    IdentityMismatch,
    /// The token verified but is not the one on file for the user
    StaleOrUnknownToken,
}

impl Reject {
    /// Stable cause label for audit logs.
    pub fn cause(&self) -> &'static str {
        match self {
            Reject::MissingToken => "missing_token",
            Reject::InvalidToken => "invalid_token",
            Reject::IdentityMismatch => "identity_mismatch",
            Reject::StaleOrUnknownToken => "stale_or_unknown_token",
        }
    }
}

/// Terminal outcome of one exchange.
#[derive(Debug)]
pub enum Outcome {
    /// A new access token was issued
    Issued(String),
    Rejected(Reject),
}

/// Failures that abort an exchange without reaching a terminal outcome.
/// These surface as internal errors, never as a rejection.
#[derive(Debug)]
pub enum ExchangeError {
    Store(sqlx::Error),
    Issue(TokenError),
}

impl std::fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeError::Store(e) => write!(f, "User store lookup failed: {}", e),
            ExchangeError::Issue(e) => write!(f, "Failed to issue access token: {}", e),
        }
    }
}

impl std::error::Error for ExchangeError {}

fn rejected(caller: &Identity, reject: Reject) -> Outcome {
    warn!(
        user_id = caller.id,
        cause = reject.cause(),
        "Refresh exchange rejected"
    );
    Outcome::Rejected(reject)
}

/// Run one refresh exchange for an authenticated caller.
///
/// `caller` is the identity resolved from the access token by the
/// upstream middleware; `refresh_token` is the value presented in the
/// request body, if any.
pub async fn exchange(
    db: &Database,
    tokens: &SessionTokens,
    caller: &Identity,
    refresh_token: Option<&str>,
) -> Result<Outcome, ExchangeError> {
    let Some(refresh_token) = refresh_token else {
        return Ok(rejected(caller, Reject::MissingToken));
    };

    let payload = match tokens.verify_refresh(refresh_token) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(user_id = caller.id, error = %e, "Refresh token failed verification");
            return Ok(rejected(caller, Reject::InvalidToken));
        }
    };

    // A valid refresh token for user A must not be exchangeable while
    // authenticated as user B. Opaque payloads carry no identity and
    // can never match.
    let identity = match payload {
        Payload::Identity(identity) if identity.matches(caller) => identity,
        _ => return Ok(rejected(caller, Reject::IdentityMismatch)),
    };

    // The token must be the one currently on file, byte for byte.
    let user = db
        .users()
        .find_by_identity_and_refresh_token(identity.id, &identity.email, refresh_token)
        .await
        .map_err(ExchangeError::Store)?;

    let Some(user) = user else {
        return Ok(rejected(caller, Reject::StaleOrUnknownToken));
    };

    let token = tokens
        .issue_access(&Identity::new(user.id, user.email))
        .map_err(ExchangeError::Issue)?;

    Ok(Outcome::Issued(token))
}
