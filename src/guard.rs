//! Access guard for protected content.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every protected page sits behind an [`AccessGuard`]. The guard derives a
//! [`GuardState`] from each [`AuthState`] it observes, decides what to show,
//! and sends the user to the sign-in page when the session is confirmed
//! absent. It is continuously reactive: every new state is re-evaluated.
//!
//! A failed session fetch is not treated as "signed out": the guard shows the
//! error and stays put instead of redirecting on an ambiguous result.

use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;

use crate::{actions, paths};
use crate::provider::{Identity, IdentityProvider, ProviderError};
use crate::store::AuthState;

// =============================================================================
// NAVIGATION
// =============================================================================

/// Host-side navigation (router push, HTTP redirect, ...).
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

impl<N: Navigator + ?Sized> Navigator for &N {
    fn navigate(&self, path: &str) {
        (**self).navigate(path);
    }
}

/// Navigator that records requested destinations instead of acting on them.
/// HTTP handlers turn the last entry into a redirect response.
#[derive(Debug, Default)]
pub struct CapturedNavigation {
    paths: Mutex<Vec<String>>,
}

impl CapturedNavigation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<String> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }
}

impl Navigator for CapturedNavigation {
    fn navigate(&self, path: &str) {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_owned());
    }
}

// =============================================================================
// STATE MACHINE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Initializing,
    Authenticated,
    Unauthenticated,
    Failed,
}

/// Classify an auth snapshot. Loading wins over everything, then errors.
#[must_use]
pub fn evaluate(auth: &AuthState) -> GuardState {
    if auth.loading() {
        GuardState::Initializing
    } else if auth.error().is_some() {
        GuardState::Failed
    } else if auth.user().is_none() {
        GuardState::Unauthenticated
    } else {
        GuardState::Authenticated
    }
}

/// What the guard renders for its current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView {
    Loading,
    Error { message: String },
    /// Redirecting away; nothing is rendered.
    Empty,
    Protected { user: Identity, signing_out: bool },
}

pub struct AccessGuard<N> {
    navigator: N,
    state: GuardState,
    auth: AuthState,
    signing_out: bool,
}

impl<N: Navigator> AccessGuard<N> {
    #[must_use]
    pub fn new(navigator: N) -> Self {
        Self { navigator, state: GuardState::Initializing, auth: AuthState::initial(), signing_out: false }
    }

    #[must_use]
    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Re-evaluate against a new snapshot. Entering `Unauthenticated` triggers
    /// exactly one navigation to the sign-in page; staying there does not.
    pub fn observe(&mut self, auth: &AuthState) -> GuardState {
        let next = evaluate(auth);
        if next == GuardState::Unauthenticated && self.state != GuardState::Unauthenticated {
            tracing::info!(from = ?self.state, "no session; redirecting to sign-in");
            self.navigator.navigate(paths::SIGN_IN);
        }
        if next != GuardState::Authenticated {
            self.signing_out = false;
        }
        self.state = next;
        self.auth = auth.clone();
        next
    }

    #[must_use]
    pub fn view(&self) -> GuardView {
        match self.state {
            GuardState::Initializing => GuardView::Loading,
            GuardState::Failed => GuardView::Error {
                message: self.auth.error().map(ToString::to_string).unwrap_or_default(),
            },
            GuardState::Unauthenticated => GuardView::Empty,
            GuardState::Authenticated => match self.auth.user() {
                Some(user) => GuardView::Protected { user: user.clone(), signing_out: self.signing_out },
                None => GuardView::Empty,
            },
        }
    }

    /// Disable the sign-out action. Returns `false` if it is already in flight.
    pub fn begin_sign_out(&mut self) -> bool {
        if self.signing_out {
            return false;
        }
        self.signing_out = true;
        true
    }

    /// Complete a sign-out attempt: navigate away on success, re-enable the
    /// action on failure so the user can retry.
    pub fn finish_sign_out(&mut self, result: &Result<(), ProviderError>) {
        match result {
            Ok(()) => {
                // Already leaving; a trailing signed-out event must not navigate again.
                self.signing_out = false;
                self.state = GuardState::Unauthenticated;
                self.navigator.navigate(paths::SIGN_IN);
            }
            Err(e) => {
                tracing::warn!(error = %e, "sign-out failed");
                self.signing_out = false;
            }
        }
    }

    /// Run a full sign-out through `provider`.
    ///
    /// # Errors
    ///
    /// Returns the provider's error after re-enabling the action.
    pub async fn sign_out(&mut self, provider: &dyn IdentityProvider) -> Result<(), ProviderError> {
        if !self.begin_sign_out() {
            return Ok(());
        }
        let result = actions::sign_out(provider).await;
        self.finish_sign_out(&result);
        result
    }

    /// Follow a store's state until its channel closes, which happens when the
    /// store's scope is stopped.
    pub async fn run(mut self, mut rx: watch::Receiver<AuthState>) -> Self {
        let current = rx.borrow_and_update().clone();
        self.observe(&current);
        while rx.changed().await.is_ok() {
            let next = rx.borrow_and_update().clone();
            self.observe(&next);
        }
        self
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
