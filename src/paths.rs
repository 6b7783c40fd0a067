//! Navigation destinations shared by the guard, actions, and router.

/// Unauthenticated landing page.
pub const SIGN_IN: &str = "/sign-in";
/// Post-authentication landing page.
pub const HOME: &str = "/";
/// OAuth redirect target registered with the identity provider.
pub const AUTH_CALLBACK: &str = "/auth/callback";
/// Starts the Google OAuth flow.
pub const AUTH_GOOGLE: &str = "/auth/google";
/// Terminates the current session.
pub const AUTH_SIGN_OUT: &str = "/auth/sign-out";
