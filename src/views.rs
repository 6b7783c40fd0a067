//! Server-rendered pages for the guard and sign-in views.
//!
//! Views are built with Leptos `view!` and rendered to HTML strings on the
//! server. There is no hydration: the pages are plain documents whose only
//! interactivity is form posts to the auth routes.

use leptos::prelude::*;

use crate::guard::GuardView;
use crate::paths;
use crate::sign_in::SignInView;

pub const APP_TITLE: &str = "Vibe List";
pub const APP_DESCRIPTION: &str = "Shared shopping list web app";

const SIGN_IN_PROMPT: &str = "Sign in with Google to access your shopping lists";

// =============================================================================
// PAGES
// =============================================================================

/// Full document for the guarded home page.
#[must_use]
pub fn home_page(view: &GuardView) -> String {
    document(guard_fragment(view))
}

/// Full document for the sign-in page.
#[must_use]
pub fn sign_in_page(view: &SignInView) -> String {
    document(sign_in_fragment(view))
}

fn document(body: impl IntoView + 'static) -> String {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                <meta name="description" content=APP_DESCRIPTION/>
                <title>{APP_TITLE}</title>
            </head>
            <body>{body}</body>
        </html>
    }
    .to_html()
}

// =============================================================================
// FRAGMENTS
// =============================================================================

/// Markup for a guard view. `Empty` renders nothing.
#[must_use]
pub fn guard_fragment(view: &GuardView) -> Option<AnyView> {
    match view {
        GuardView::Loading => Some(
            view! {
                <main>
                    <p>"Loading..."</p>
                </main>
            }
            .into_any(),
        ),
        GuardView::Error { message } => {
            let alert = format!("Error: {message}");
            Some(
                view! {
                    <main>
                        <p role="alert">{alert}</p>
                    </main>
                }
                .into_any(),
            )
        }
        GuardView::Empty => None,
        GuardView::Protected { user, signing_out } => {
            let label = if *signing_out { "Signing out..." } else { "Sign out" };
            let disabled = *signing_out;
            let email = user.email.clone();
            Some(
                view! {
                    <header>
                        <nav>
                            <span class="user">{email}</span>
                            <form method="post" action=paths::AUTH_SIGN_OUT>
                                <button type="submit" disabled=disabled>{label}</button>
                            </form>
                        </nav>
                    </header>
                    {home_content()}
                }
                .into_any(),
            )
        }
    }
}

/// Protected home content.
fn home_content() -> impl IntoView {
    view! {
        <main>
            <h1>{APP_TITLE}</h1>
            <p>{APP_DESCRIPTION}</p>
        </main>
    }
}

/// Markup for the sign-in view.
#[must_use]
pub fn sign_in_fragment(view: &SignInView) -> AnyView {
    let alert = view.error.as_ref().map(|error| {
        let text = format!("Error: {error}");
        view! { <p role="alert">{text}</p> }
    });
    let label = view.button_label;
    let disabled = view.disabled;
    view! {
        <main>
            <h1>"Sign In"</h1>
            <p>{SIGN_IN_PROMPT}</p>
            {alert}
            <form method="post" action=paths::AUTH_GOOGLE>
                <button type="submit" disabled=disabled>{label}</button>
            </form>
        </main>
    }
    .into_any()
}

#[cfg(test)]
#[path = "views_test.rs"]
mod tests;
