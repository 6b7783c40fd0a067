//! Sign-in and sign-out actions.

use crate::paths;
use crate::provider::{IdentityProvider, OAuthProvider, ProviderError};

/// OAuth redirect target for an application origin.
#[must_use]
pub fn callback_url(origin: &str) -> String {
    format!("{}{}", origin.trim_end_matches('/'), paths::AUTH_CALLBACK)
}

/// Begin Google sign-in, returning the provider URL to send the user to.
///
/// # Errors
///
/// Propagates the provider's error unchanged.
pub async fn sign_in_with_google(provider: &dyn IdentityProvider, origin: &str) -> Result<String, ProviderError> {
    provider
        .begin_oauth_sign_in(OAuthProvider::Google, &callback_url(origin))
        .await
}

/// Terminate the current session.
///
/// # Errors
///
/// Propagates the provider's error unchanged.
pub async fn sign_out(provider: &dyn IdentityProvider) -> Result<(), ProviderError> {
    provider.sign_out().await
}

#[cfg(test)]
#[path = "actions_test.rs"]
mod tests;
