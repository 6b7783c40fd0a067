//! Sign-in view state.
//!
//! The sign-in button is disabled while an attempt is in flight. A failure is
//! shown inline and re-enables the button; starting a new attempt clears the
//! previous error. Success leaves the form busy because the user agent is
//! about to leave for the provider.

use crate::actions;
use crate::provider::{IdentityProvider, ProviderError};

const FALLBACK_ERROR: &str = "Failed to sign in";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInView {
    pub error: Option<String>,
    pub button_label: &'static str,
    pub disabled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SignInForm {
    busy: bool,
    error: Option<String>,
}

impl SignInForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Form showing a previous failure, e.g. after a redirect back.
    #[must_use]
    pub fn with_error(message: impl Into<String>) -> Self {
        let message = message.into();
        let error = if message.trim().is_empty() { FALLBACK_ERROR.to_owned() } else { message };
        Self { busy: false, error: Some(error) }
    }

    /// Returns `false` if an attempt is already in flight.
    pub fn begin(&mut self) -> bool {
        if self.busy {
            return false;
        }
        self.busy = true;
        self.error = None;
        true
    }

    pub fn fail(&mut self, err: &ProviderError) {
        tracing::warn!(error = %err, "sign-in failed");
        *self = Self::with_error(err.to_string());
    }

    /// Run one sign-in attempt. Returns the provider URL on success.
    pub async fn submit(&mut self, provider: &dyn IdentityProvider, origin: &str) -> Option<String> {
        if !self.begin() {
            return None;
        }
        match actions::sign_in_with_google(provider, origin).await {
            Ok(url) => Some(url),
            Err(e) => {
                self.fail(&e);
                None
            }
        }
    }

    #[must_use]
    pub fn view(&self) -> SignInView {
        SignInView {
            error: self.error.clone(),
            button_label: if self.busy { "Signing in..." } else { "Sign in with Google" },
            disabled: self.busy,
        }
    }
}

#[cfg(test)]
#[path = "sign_in_test.rs"]
mod tests;
