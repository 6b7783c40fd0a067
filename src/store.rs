//! Session store: the single live view of authentication state.
//!
//! SYSTEM CONTEXT
//! ==============
//! One `SessionStore` backs every reader in the application shell. It mirrors
//! the identity provider's session into an [`AuthState`] that route guards and
//! handlers read via [`SessionStore::snapshot`] or watch via
//! [`SessionStore::watch`].
//!
//! LIFECYCLE
//! =========
//! `start()` opens a scope: a fresh state channel starts at loading, a
//! one-shot `fetch_current_session` is spawned, and one change subscription
//! is opened without waiting for the fetch. `stop()` closes the scope,
//! releases the subscription exactly once, and drops the scope's channel so
//! every watcher sees it close. Reading state outside an open scope is an
//! error.
//!
//! ORDERING
//! ========
//! Every scope gets a new generation number. The fetch task and the listener
//! carry the generation they were created for and are ignored once it is no
//! longer current, so nothing is written after `stop()`.
//!
//! A change notification is authoritative: once one has been applied in a
//! scope, a late result from the initial fetch is dropped rather than allowed
//! to overwrite newer state with stale data.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;

use crate::provider::{AuthChangeEvent, Identity, IdentityProvider, ProviderError, Session, Subscription};

// =============================================================================
// AUTH STATE
// =============================================================================

/// Snapshot of authentication state.
///
/// The identity is always derived from the session, so "identity present iff
/// session present" holds by construction, and an error is only ever stored
/// alongside an absent session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    session: Option<Session>,
    loading: bool,
    error: Option<ProviderError>,
}

impl AuthState {
    /// Fresh scope: loading, nothing else known.
    #[must_use]
    pub fn initial() -> Self {
        Self { session: None, loading: true, error: None }
    }

    /// Settled with a session (or with none).
    #[must_use]
    pub fn resolved(session: Option<Session>) -> Self {
        Self { session, loading: false, error: None }
    }

    /// Settled with a fetch failure.
    #[must_use]
    pub fn failed(error: ProviderError) -> Self {
        Self { session: None, loading: false, error: Some(error) }
    }

    #[must_use]
    pub fn user(&self) -> Option<&Identity> {
        self.session.as_ref().map(|s| &s.user)
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&ProviderError> {
        self.error.as_ref()
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::initial()
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("auth state accessed outside an active SessionStore scope; call SessionStore::start first")]
    NoActiveScope,
    #[error("SessionStore scope is already active")]
    AlreadyActive,
    #[error("SessionStore::start requires a running Tokio runtime")]
    NoRuntime,
}

// =============================================================================
// SESSION STORE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Active,
    Stopped,
}

struct Scope {
    phase: Phase,
    generation: u64,
    change_applied: bool,
    subscription: Option<Subscription>,
    /// Present only while the scope is active.
    state: Option<watch::Sender<AuthState>>,
}

impl Scope {
    fn is_current(&self, generation: u64) -> bool {
        self.phase == Phase::Active && self.generation == generation
    }

    fn publish(&self, next: AuthState) {
        if let Some(state) = &self.state {
            state.send_replace(next);
        }
    }
}

struct Shared {
    scope: Mutex<Scope>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Scope> {
        self.scope.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply the one-shot fetch result if its scope is still current and no
    /// change notification has superseded it.
    fn apply_fetch(&self, generation: u64, result: Result<Option<Session>, ProviderError>) {
        let scope = self.lock();
        if !scope.is_current(generation) {
            tracing::debug!(generation, "discarding session fetch for closed scope");
            return;
        }
        if scope.change_applied {
            tracing::debug!(generation, "discarding session fetch superseded by change notification");
            return;
        }
        let next = match result {
            Ok(session) => AuthState::resolved(session),
            Err(e) => {
                tracing::warn!(error = %e, "session fetch failed");
                AuthState::failed(e)
            }
        };
        scope.publish(next);
    }

    /// Apply a change notification. Always clears any error and settles loading.
    fn apply_change(&self, generation: u64, event: AuthChangeEvent, session: Option<Session>) {
        let mut scope = self.lock();
        if !scope.is_current(generation) {
            tracing::debug!(generation, %event, "ignoring auth change for closed scope");
            return;
        }
        scope.change_applied = true;
        tracing::info!(%event, signed_in = session.is_some(), "auth state changed");
        scope.publish(AuthState::resolved(session));
    }
}

/// Owner of the authentication state and its provider subscription.
pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    shared: Arc<Shared>,
}

impl SessionStore {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let scope = Scope { phase: Phase::Idle, generation: 0, change_applied: false, subscription: None, state: None };
        Self { provider, shared: Arc::new(Shared { scope: Mutex::new(scope) }) }
    }

    /// Open a scope: reset to loading, spawn the initial fetch, and subscribe
    /// to session changes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyActive`] if a scope is open, or
    /// [`StoreError::NoRuntime`] when called outside a Tokio runtime.
    pub fn start(&self) -> Result<(), StoreError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StoreError::NoRuntime)?;

        let generation = {
            let mut scope = self.shared.lock();
            if scope.phase == Phase::Active {
                return Err(StoreError::AlreadyActive);
            }
            scope.phase = Phase::Active;
            scope.generation += 1;
            scope.change_applied = false;
            scope.state = Some(watch::channel(AuthState::initial()).0);
            scope.generation
        };

        let provider = self.provider.clone();
        let weak = Arc::downgrade(&self.shared);
        runtime.spawn(async move {
            let result = provider.fetch_current_session().await;
            if let Some(shared) = weak.upgrade() {
                shared.apply_fetch(generation, result);
            }
        });

        // Subscribe without holding the scope lock: providers may notify
        // synchronously from inside `subscribe`.
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let subscription = self.provider.subscribe(Arc::new(move |event: AuthChangeEvent, session: Option<Session>| {
            if let Some(shared) = weak.upgrade() {
                shared.apply_change(generation, event, session);
            }
        }));

        let mut scope = self.shared.lock();
        if scope.is_current(generation) {
            scope.subscription = Some(subscription);
            tracing::info!(generation, "session store started");
        } else {
            drop(scope);
            subscription.unsubscribe();
        }
        Ok(())
    }

    /// Close the scope, release the subscription, and close the scope's
    /// state channel. Returns `false` when no scope was open.
    pub fn stop(&self) -> bool {
        let (subscription, state) = {
            let mut scope = self.shared.lock();
            if scope.phase != Phase::Active {
                return false;
            }
            scope.phase = Phase::Stopped;
            (scope.subscription.take(), scope.state.take())
        };
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        drop(state);
        tracing::info!("session store stopped");
        true
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.lock().phase == Phase::Active
    }

    /// Current state of the open scope.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoActiveScope`] before `start()` or after `stop()`.
    pub fn snapshot(&self) -> Result<AuthState, StoreError> {
        self.with_state(|state| state.borrow().clone())
    }

    /// Receiver that observes every state the open scope publishes. The
    /// receiver closes when the scope is stopped; a later `start()` opens a
    /// new channel.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoActiveScope`] before `start()` or after `stop()`.
    pub fn watch(&self) -> Result<watch::Receiver<AuthState>, StoreError> {
        self.with_state(watch::Sender::subscribe)
    }

    fn with_state<T>(&self, f: impl FnOnce(&watch::Sender<AuthState>) -> T) -> Result<T, StoreError> {
        let scope = self.shared.lock();
        match (&scope.state, scope.phase) {
            (Some(state), Phase::Active) => Ok(f(state)),
            _ => Err(StoreError::NoActiveScope),
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
