//! Auth routes: Google OAuth start, provider callback, sign-out.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::guard::{AccessGuard, CapturedNavigation, GuardState};
use crate::paths;
use crate::sign_in::SignInForm;
use crate::state::AppState;
use crate::views;

/// `GET|POST /auth/google`: send the user agent to the provider.
///
/// On failure the sign-in page is rendered again with the error inline and
/// the button enabled for a retry.
pub async fn google(State(state): State<AppState>) -> Response {
    let mut form = SignInForm::new();
    match form.submit(state.provider.as_ref(), &state.origin).await {
        Some(url) => Redirect::to(&url).into_response(),
        None => (StatusCode::BAD_GATEWAY, Html(views::sign_in_page(&form.view()))).into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// `GET /auth/callback`: exchange the authorization code, then redirect to
/// the application root whatever the outcome. Exchange failures are logged
/// only; the guard on `/` sends the user back to sign-in if no session exists.
///
/// The redirect target is relative, so it resolves against the origin the
/// callback request arrived on.
pub async fn callback(State(state): State<AppState>, Query(params): Query<CallbackQuery>) -> Redirect {
    match params.code.as_deref().filter(|c| !c.is_empty()) {
        Some(code) => {
            if let Err(e) = state.provider.exchange_code_for_session(code).await {
                tracing::warn!(error = %e, "oauth code exchange failed");
            }
        }
        None => {
            if let Some(error) = params.error.as_deref() {
                tracing::warn!(
                    %error,
                    description = params.error_description.as_deref().unwrap_or_default(),
                    "provider returned oauth error"
                );
            }
        }
    }
    Redirect::temporary(paths::HOME)
}

/// `POST /auth/sign-out`: sign out through the guard. Success lands on the
/// sign-in page; failure returns to `/` with the button re-enabled.
pub async fn sign_out(State(state): State<AppState>) -> Response {
    let auth = match state.store.snapshot() {
        Ok(auth) => auth,
        Err(e) => {
            tracing::error!(error = %e, "sign-out requested without a session scope");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let nav = CapturedNavigation::new();
    let mut guard = AccessGuard::new(&nav);
    if guard.observe(&auth) == GuardState::Authenticated {
        let _ = guard.sign_out(state.provider.as_ref()).await;
    }

    let target = nav.last().unwrap_or_else(|| paths::HOME.to_owned());
    Redirect::to(&target).into_response()
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
