//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the protected home page, the sign-in page, and the OAuth endpoints
//! under a single Axum router. Every page handler reads the shared
//! `SessionStore`; none of them holds per-request auth state.

pub mod auth;
pub mod pages;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::paths;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route(paths::HOME, get(pages::home))
        .route(paths::SIGN_IN, get(pages::sign_in))
        .route(paths::AUTH_GOOGLE, get(auth::google).post(auth::google))
        .route(paths::AUTH_CALLBACK, get(auth::callback))
        .route(paths::AUTH_SIGN_OUT, post(auth::sign_out))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
