//! Page routes: the guarded home page and the sign-in page.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};

use crate::guard::{AccessGuard, CapturedNavigation};
use crate::sign_in::SignInForm;
use crate::state::AppState;
use crate::views;

/// `GET /`: protected home page behind the access guard.
pub async fn home(State(state): State<AppState>) -> Response {
    let auth = match state.store.snapshot() {
        Ok(auth) => auth,
        Err(e) => {
            tracing::error!(error = %e, "page rendered without a session scope");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let nav = CapturedNavigation::new();
    let mut guard = AccessGuard::new(&nav);
    guard.observe(&auth);
    if let Some(path) = nav.last() {
        return Redirect::temporary(&path).into_response();
    }

    Html(views::home_page(&guard.view())).into_response()
}

/// `GET /sign-in`: unauthenticated landing page. Sign-in failures are shown
/// inline by `POST /auth/google`, so this page always starts clean.
pub async fn sign_in() -> Html<String> {
    Html(views::sign_in_page(&SignInForm::new().view()))
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
