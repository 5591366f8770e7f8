//! Authentication state trait.

use crate::token::SessionTokens;

/// Trait for router state types that provide token configuration for
/// authentication.
pub trait HasAuthState {
    fn tokens(&self) -> &SessionTokens;
}
