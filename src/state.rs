//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! carries the identity provider, the session store that mirrors it, and the
//! public origin used for OAuth redirect targets. Everything is constructed
//! in `main` and passed in explicitly; there is no process-wide client.

use std::sync::Arc;

use crate::provider::IdentityProvider;
use crate::store::SessionStore;

/// Shared application state. Clone is required by Axum; fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn IdentityProvider>,
    pub store: Arc<SessionStore>,
    /// Public origin without trailing slash, e.g. `http://localhost:3000`.
    pub origin: String,
}

impl AppState {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<SessionStore>, origin: impl Into<String>) -> Self {
        Self { provider, store, origin: origin.into() }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tokio::sync::oneshot;

    use super::*;
    use crate::provider::{
        AuthChangeEvent, Identity, ListenerRegistry, OAuthProvider, ProviderError, Session, SessionListener,
        Subscription,
    };

    pub type FetchResult = Result<Option<Session>, ProviderError>;

    /// Scriptable identity provider. The initial fetch blocks until the test
    /// sends a result through the paired `oneshot::Sender`; dropping the
    /// sender leaves the fetch pending forever.
    pub struct FakeProvider {
        fetch_gate: Mutex<Option<oneshot::Receiver<FetchResult>>>,
        listeners: ListenerRegistry,
        sign_in_error: Mutex<Option<ProviderError>>,
        sign_out_results: Mutex<VecDeque<Result<(), ProviderError>>>,
        exchange_error: Mutex<Option<ProviderError>>,
        calls: Mutex<Vec<String>>,
        subscribes: Mutex<usize>,
    }

    impl FakeProvider {
        /// Provider whose initial fetch waits on the returned sender.
        #[must_use]
        pub fn gated() -> (Arc<Self>, oneshot::Sender<FetchResult>) {
            let (tx, rx) = oneshot::channel();
            let provider = Self {
                fetch_gate: Mutex::new(Some(rx)),
                listeners: ListenerRegistry::new(),
                sign_in_error: Mutex::new(None),
                sign_out_results: Mutex::new(VecDeque::new()),
                exchange_error: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
                subscribes: Mutex::new(0),
            };
            (Arc::new(provider), tx)
        }

        /// Provider whose initial fetch resolves immediately with `result`.
        #[must_use]
        pub fn resolved(result: FetchResult) -> Arc<Self> {
            let (provider, tx) = Self::gated();
            let _ = tx.send(result);
            provider
        }

        pub fn emit(&self, event: AuthChangeEvent, session: Option<Session>) {
            self.listeners.emit(event, session.as_ref());
        }

        #[must_use]
        pub fn listener_count(&self) -> usize {
            self.listeners.len()
        }

        #[must_use]
        pub fn subscribe_count(&self) -> usize {
            *self.subscribes.lock().unwrap()
        }

        #[must_use]
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn fail_sign_in(&self, message: &str) {
            *self.sign_in_error.lock().unwrap() = Some(ProviderError::Api(message.into()));
        }

        /// Queue the outcome of the next `sign_out` call (default `Ok`).
        pub fn push_sign_out_result(&self, result: Result<(), ProviderError>) {
            self.sign_out_results.lock().unwrap().push_back(result);
        }

        pub fn fail_exchange(&self, message: &str) {
            *self.exchange_error.lock().unwrap() = Some(ProviderError::Api(message.into()));
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait::async_trait]
    impl IdentityProvider for FakeProvider {
        async fn fetch_current_session(&self) -> FetchResult {
            self.record("fetch".into());
            let gate = self.fetch_gate.lock().unwrap().take();
            match gate {
                Some(rx) => match rx.await {
                    Ok(result) => result,
                    Err(_) => std::future::pending().await,
                },
                None => Ok(None),
            }
        }

        fn subscribe(&self, listener: SessionListener) -> Subscription {
            *self.subscribes.lock().unwrap() += 1;
            self.listeners.add(listener)
        }

        async fn begin_oauth_sign_in(
            &self,
            provider: OAuthProvider,
            redirect_to: &str,
        ) -> Result<String, ProviderError> {
            self.record(format!("sign_in:{}:{redirect_to}", provider.as_str()));
            if let Some(err) = self.sign_in_error.lock().unwrap().clone() {
                return Err(err);
            }
            Ok(format!("https://idp.test/authorize?provider={}", provider.as_str()))
        }

        async fn exchange_code_for_session(&self, code: &str) -> Result<(), ProviderError> {
            self.record(format!("exchange:{code}"));
            let error = self.exchange_error.lock().unwrap().clone();
            match error {
                Some(err) => Err(err),
                None => {
                    let session = test_session("user-123");
                    self.listeners.emit(AuthChangeEvent::SignedIn, Some(&session));
                    Ok(())
                }
            }
        }

        async fn sign_out(&self) -> Result<(), ProviderError> {
            self.record("sign_out".into());
            let result = self.sign_out_results.lock().unwrap().pop_front().unwrap_or(Ok(()));
            if result.is_ok() {
                self.listeners.emit(AuthChangeEvent::SignedOut, None);
            }
            result
        }
    }

    /// Session for a user with a deterministic email.
    #[must_use]
    pub fn test_session(user_id: &str) -> Session {
        Session {
            access_token: format!("access-{user_id}"),
            refresh_token: Some(format!("refresh-{user_id}")),
            token_type: "bearer".into(),
            expires_in: Some(3600),
            expires_at: None,
            user: Identity { id: user_id.into(), email: Some(format!("{user_id}@example.com")) },
        }
    }

    /// Let spawned tasks on the current-thread test runtime make progress.
    pub async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    /// `AppState` over a fake provider with an already-started store.
    #[must_use]
    pub fn test_app_state(provider: Arc<FakeProvider>) -> AppState {
        let store = Arc::new(SessionStore::new(provider.clone()));
        store.start().expect("store starts inside the test runtime");
        AppState::new(provider, store, "http://localhost:3000")
    }
}
