//! Supabase-compatible auth REST client.
//!
//! Thin HTTP wrapper for the `/auth/v1` endpoints used by the OAuth PKCE flow.
//! The current session is held in memory for the lifetime of the client;
//! persistence and token refresh are left to the provider.
//!
//! PKCE
//! ====
//! `begin_oauth_sign_in` generates a random verifier and sends its S256
//! challenge with the authorize URL. `exchange_code_for_session` consumes the
//! verifier, so each sign-in attempt can be exchanged at most once.

use std::sync::{Mutex, PoisonError, RwLock};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use reqwest::Url;
use sha2::{Digest, Sha256};

use super::listeners::{ListenerRegistry, SessionListener, Subscription};
use super::types::{AuthChangeEvent, OAuthProvider, ProviderError, Session};
use super::IdentityProvider;
use crate::config::ProviderConfig;

const AUTH_PATH: &str = "/auth/v1";

// =============================================================================
// CLIENT
// =============================================================================

pub struct SupabaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
    pending_verifier: Mutex<Option<String>>,
    listeners: ListenerRegistry,
}

impl SupabaseAuthClient {
    /// Build a client from resolved provider configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] if the base URL does not parse or the
    /// HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Url::parse(&config.url).map_err(|e| ProviderError::Config(format!("{}: {e}", config.url)))?;
        let http = reqwest::Client::builder()
            .timeout(config.timeouts.request())
            .connect_timeout(config.timeouts.connect())
            .build()
            .map_err(|e| ProviderError::Config(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_owned(),
            anon_key: config.anon_key.clone(),
            session: RwLock::new(None),
            pending_verifier: Mutex::new(None),
            listeners: ListenerRegistry::new(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{AUTH_PATH}{path}", self.base_url)
    }

    fn current(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_session(&self, session: Option<Session>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    fn take_verifier(&self) -> Option<String> {
        self.pending_verifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[async_trait::async_trait]
impl IdentityProvider for SupabaseAuthClient {
    async fn fetch_current_session(&self) -> Result<Option<Session>, ProviderError> {
        Ok(self.current())
    }

    fn subscribe(&self, listener: SessionListener) -> Subscription {
        let initial = self.current();
        let subscription = self.listeners.add(listener.clone());
        listener(AuthChangeEvent::InitialSession, initial);
        subscription
    }

    async fn begin_oauth_sign_in(&self, provider: OAuthProvider, redirect_to: &str) -> Result<String, ProviderError> {
        let verifier = generate_code_verifier();
        let challenge = code_challenge(&verifier);
        let url = authorize_url(&self.base_url, provider, redirect_to, &challenge)?;
        *self
            .pending_verifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(verifier);
        tracing::info!(provider = provider.as_str(), %redirect_to, "oauth sign-in started");
        Ok(url)
    }

    async fn exchange_code_for_session(&self, code: &str) -> Result<(), ProviderError> {
        let verifier = self.take_verifier().ok_or(ProviderError::MissingCodeVerifier)?;

        let response = self
            .http
            .post(self.endpoint("/token?grant_type=pkce"))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "auth_code": code, "code_verifier": verifier }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_error_body(status.as_u16(), &body));
        }

        let session = parse_session(&body)?;
        tracing::info!(user_id = %session.user.id, "authorization code exchanged");
        self.replace_session(Some(session.clone()));
        self.listeners.emit(AuthChangeEvent::SignedIn, Some(&session));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        if let Some(session) = self.current() {
            let response = self
                .http
                .post(self.endpoint("/logout"))
                .header("apikey", &self.anon_key)
                .bearer_auth(&session.access_token)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(parse_error_body(status.as_u16(), &body));
            }
        }

        self.replace_session(None);
        self.listeners.emit(AuthChangeEvent::SignedOut, None);
        Ok(())
    }
}

// =============================================================================
// PKCE
// =============================================================================

/// Random 32-byte verifier encoded as unpadded base64url (43 chars).
#[must_use]
pub fn generate_code_verifier() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// `base64url(SHA-256(verifier))` per RFC 7636 §4.2.
#[must_use]
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

// =============================================================================
// WIRE HELPERS
// =============================================================================

/// Build the provider authorize URL for an S256 PKCE sign-in.
///
/// # Errors
///
/// Returns [`ProviderError::Config`] if `base_url` is not a valid URL.
pub fn authorize_url(
    base_url: &str,
    provider: OAuthProvider,
    redirect_to: &str,
    challenge: &str,
) -> Result<String, ProviderError> {
    let url = Url::parse_with_params(
        &format!("{}{AUTH_PATH}/authorize", base_url.trim_end_matches('/')),
        &[
            ("provider", provider.as_str()),
            ("redirect_to", redirect_to),
            ("code_challenge", challenge),
            ("code_challenge_method", "s256"),
        ],
    )
    .map_err(|e| ProviderError::Config(e.to_string()))?;
    Ok(url.into())
}

fn parse_session(body: &str) -> Result<Session, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Pick the most descriptive message from an auth API error body.
fn parse_error_body(status: u16, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|e| e.error_description.or(e.msg).or(e.message).or(e.error))
        .unwrap_or_else(|| format!("{status}: {body}"));
    ProviderError::Api(message)
}

#[cfg(test)]
#[path = "supabase_test.rs"]
mod tests;
