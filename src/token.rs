//! Token issuance and verification.
//!
//! Stateless codec for signed, expiring tokens carrying an identity
//! payload. One codec per token class (access, refresh), each with its
//! own secret so compromise of one class does not compromise the other.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The identity claims embedded in a token.
///
/// `extra` carries any additional application-defined claims and is
/// flattened into the token body. Equality is field-wise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// User identifier
    pub id: i64,
    /// User email
    pub email: String,
    /// Additional application-defined claims
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Identity {
    pub fn new(id: i64, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Whether two identities refer to the same principal.
    /// Compares id and email; extra claims do not participate.
    pub fn matches(&self, other: &Identity) -> bool {
        self.id == other.id && self.email == other.email
    }
}

/// Payload accepted at the codec boundary.
///
/// Most tokens carry an [`Identity`]. Opaque string payloads exist for
/// degenerate uses (e.g. confirmation tokens); they carry no time
/// claims and never satisfy an identity match.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Identity(Identity),
    Opaque(String),
}

/// Wire format for identity tokens: the identity claims plus the
/// issue timestamp and optional expiry.
#[derive(Serialize, Deserialize)]
struct IdentityClaims {
    id: i64,
    email: String,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
    /// Issued at (Unix timestamp)
    iat: u64,
    /// Expiration time (Unix timestamp); absent for non-expiring tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<u64>,
}

/// Errors that can occur during token operations.
#[derive(Debug)]
pub enum TokenError {
    /// Signature valid, but current time is past the embedded expiry
    Expired,
    /// Signature mismatch, tampered payload, or malformed structure
    Invalid(String),
    /// The payload could not be signed
    Encoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Expired => write!(f, "Token has expired"),
            TokenError::Invalid(e) => write!(f, "Invalid token: {}", e),
            TokenError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            TokenError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Codec for one token class: issues and verifies signed tokens with
/// a single HS256 secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    /// Create a codec with the given secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Sign a payload, producing an opaque token string.
    ///
    /// Identity payloads are stamped with `iat` and, when `expires_in`
    /// is set, `exp`. Issuing without an expiry produces a non-expiring
    /// token. Opaque payloads are signed as-is with no time claims.
    ///
    /// Two calls with identical inputs at different seconds produce
    /// different tokens (the `iat` claim varies); callers must not rely
    /// on token strings being stable across issuance.
    pub fn issue(
        &self,
        payload: &Payload,
        expires_in: Option<Duration>,
    ) -> Result<String, TokenError> {
        match payload {
            Payload::Identity(identity) => {
                let now = unix_now()?;
                let claims = IdentityClaims {
                    id: identity.id,
                    email: identity.email.clone(),
                    extra: identity.extra.clone(),
                    iat: now,
                    exp: expires_in.map(|d| now + d.as_secs()),
                };
                jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
                    .map_err(TokenError::Encoding)
            }
            Payload::Opaque(value) => {
                jsonwebtoken::encode(&Header::default(), value, &self.encoding_key)
                    .map_err(TokenError::Encoding)
            }
        }
    }

    /// Verify a token and return its payload.
    ///
    /// Signature and expiry are checked together; no partial result is
    /// ever returned. Fails with [`TokenError::Expired`] when the
    /// signature is valid but the expiry has passed, and
    /// [`TokenError::Invalid`] for everything else (wrong secret,
    /// tampering, malformed structure).
    pub fn verify(&self, token: &str) -> Result<Payload, TokenError> {
        // Expiry is enforced below so that tokens without an exp claim
        // (opaque or non-expiring) still decode.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_required_spec_claims::<&str>(&[]);

        let data =
            jsonwebtoken::decode::<serde_json::Value>(token, &self.decoding_key, &validation)
                .map_err(|e| TokenError::Invalid(e.to_string()))?;

        match data.claims {
            serde_json::Value::String(value) => Ok(Payload::Opaque(value)),
            claims @ serde_json::Value::Object(_) => {
                let claims: IdentityClaims = serde_json::from_value(claims)
                    .map_err(|e| TokenError::Invalid(e.to_string()))?;

                if let Some(exp) = claims.exp {
                    if unix_now()? > exp {
                        return Err(TokenError::Expired);
                    }
                }

                Ok(Payload::Identity(Identity {
                    id: claims.id,
                    email: claims.email,
                    extra: claims.extra,
                }))
            }
            other => Err(TokenError::Invalid(format!(
                "unsupported claim set: {}",
                other
            ))),
        }
    }
}

/// Process-wide token configuration: one codec per token class plus the
/// expiry applied at issuance. Constructed once at startup and injected
/// wherever tokens are issued or verified.
pub struct SessionTokens {
    access: TokenCodec,
    refresh: TokenCodec,
    access_ttl: Option<Duration>,
    refresh_ttl: Option<Duration>,
}

impl SessionTokens {
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl: Option<Duration>,
        refresh_ttl: Option<Duration>,
    ) -> Self {
        Self {
            access: TokenCodec::new(access_secret),
            refresh: TokenCodec::new(refresh_secret),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Issue a short-lived access token for the given identity.
    pub fn issue_access(&self, identity: &Identity) -> Result<String, TokenError> {
        self.access
            .issue(&Payload::Identity(identity.clone()), self.access_ttl)
    }

    /// Issue a long-lived refresh token for the given identity.
    pub fn issue_refresh(&self, identity: &Identity) -> Result<String, TokenError> {
        self.refresh
            .issue(&Payload::Identity(identity.clone()), self.refresh_ttl)
    }

    pub fn verify_access(&self, token: &str) -> Result<Payload, TokenError> {
        self.access.verify(token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Payload, TokenError> {
        self.refresh.verify(token)
    }
}

fn unix_now() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| TokenError::TimeError)
}
