//! Identity provider: the capability surface this application consumes.
//!
//! SYSTEM CONTEXT
//! ==============
//! Authentication, token issuance, and session persistence all belong to an
//! external identity provider. The application only needs five operations:
//! fetch the current session, watch for session changes, begin an OAuth
//! sign-in, exchange the returned authorization code, and sign out.
//!
//! [`IdentityProvider`] is the seam. [`supabase::SupabaseAuthClient`] talks to
//! a Supabase-compatible auth REST API; tests substitute their own fake.

pub mod listeners;
pub mod supabase;
pub mod types;

pub use listeners::{ListenerRegistry, SessionListener, Subscription};
pub use types::{AuthChangeEvent, Identity, OAuthProvider, ProviderError, Session};

/// Operations the application consumes from an identity provider.
///
/// Implementations are passed around explicitly as `Arc<dyn IdentityProvider>`.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Return the current session, or `None` when signed out.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the provider cannot determine the session.
    async fn fetch_current_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Register a listener for session changes. Events are delivered in
    /// emission order until the returned [`Subscription`] is released.
    fn subscribe(&self, listener: SessionListener) -> Subscription;

    /// Begin an OAuth sign-in and return the provider URL the user agent must
    /// be sent to. The provider redirects back to `redirect_to` afterwards.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the sign-in cannot be started.
    async fn begin_oauth_sign_in(&self, provider: OAuthProvider, redirect_to: &str) -> Result<String, ProviderError>;

    /// Exchange an authorization code (from the OAuth redirect) for a session.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the exchange is rejected or fails.
    async fn exchange_code_for_session(&self, code: &str) -> Result<(), ProviderError>;

    /// Terminate the current session.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the provider refuses or the request fails.
    async fn sign_out(&self) -> Result<(), ProviderError>;
}
