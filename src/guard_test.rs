use std::sync::Arc;

use super::*;
use crate::provider::AuthChangeEvent;
use crate::state::test_helpers::{FakeProvider, settle, test_session};
use crate::store::SessionStore;

fn signed_in(id: &str) -> AuthState {
    AuthState::resolved(Some(test_session(id)))
}

// =============================================================================
// evaluate
// =============================================================================

#[test]
fn evaluate_loading_is_initializing() {
    assert_eq!(evaluate(&AuthState::initial()), GuardState::Initializing);
}

#[test]
fn evaluate_error_is_failed() {
    let auth = AuthState::failed(ProviderError::Api("nope".into()));
    assert_eq!(evaluate(&auth), GuardState::Failed);
}

#[test]
fn evaluate_no_user_is_unauthenticated() {
    assert_eq!(evaluate(&AuthState::resolved(None)), GuardState::Unauthenticated);
}

#[test]
fn evaluate_user_is_authenticated() {
    assert_eq!(evaluate(&signed_in("u1")), GuardState::Authenticated);
}

// =============================================================================
// observe / view
// =============================================================================

#[test]
fn loading_renders_indicator_without_redirect() {
    let nav = CapturedNavigation::new();
    let mut guard = AccessGuard::new(&nav);
    guard.observe(&AuthState::initial());
    assert_eq!(guard.view(), GuardView::Loading);
    assert!(nav.paths().is_empty());
}

#[test]
fn failure_renders_error_without_redirect() {
    let nav = CapturedNavigation::new();
    let mut guard = AccessGuard::new(&nav);
    guard.observe(&AuthState::failed(ProviderError::Api("Session fetch failed".into())));
    assert_eq!(guard.view(), GuardView::Error { message: "Session fetch failed".into() });
    assert!(nav.paths().is_empty());
}

#[test]
fn unauthenticated_redirects_exactly_once() {
    let nav = CapturedNavigation::new();
    let mut guard = AccessGuard::new(&nav);
    guard.observe(&AuthState::initial());
    guard.observe(&AuthState::resolved(None));
    guard.observe(&AuthState::resolved(None));
    assert_eq!(nav.paths(), vec![paths::SIGN_IN.to_owned()]);
    assert_eq!(guard.view(), GuardView::Empty);
}

#[test]
fn authenticated_renders_protected_content() {
    let nav = CapturedNavigation::new();
    let mut guard = AccessGuard::new(&nav);
    guard.observe(&signed_in("user-123"));
    match guard.view() {
        GuardView::Protected { user, signing_out } => {
            assert_eq!(user.id, "user-123");
            assert!(!signing_out);
        }
        other => panic!("expected protected view, got {other:?}"),
    }
    assert!(nav.paths().is_empty());
}

#[test]
fn losing_session_while_authenticated_redirects() {
    let nav = CapturedNavigation::new();
    let mut guard = AccessGuard::new(&nav);
    guard.observe(&signed_in("u1"));
    guard.observe(&AuthState::resolved(None));
    assert_eq!(guard.state(), GuardState::Unauthenticated);
    assert_eq!(nav.last().as_deref(), Some(paths::SIGN_IN));
}

#[test]
fn guard_reenters_evaluation_after_terminal_states() {
    let nav = CapturedNavigation::new();
    let mut guard = AccessGuard::new(&nav);
    guard.observe(&AuthState::failed(ProviderError::Api("x".into())));
    guard.observe(&signed_in("u1"));
    assert_eq!(guard.state(), GuardState::Authenticated);
    guard.observe(&AuthState::resolved(None));
    guard.observe(&signed_in("u2"));
    guard.observe(&AuthState::resolved(None));
    assert_eq!(nav.paths().len(), 2);
}

#[test]
fn protected_iff_settled_authenticated_without_error() {
    let cases = [
        (AuthState::initial(), false),
        (AuthState::resolved(None), false),
        (AuthState::failed(ProviderError::Api("e".into())), false),
        (signed_in("u"), true),
    ];
    for (auth, protected) in cases {
        let nav = CapturedNavigation::new();
        let mut guard = AccessGuard::new(&nav);
        guard.observe(&auth);
        assert_eq!(matches!(guard.view(), GuardView::Protected { .. }), protected, "{auth:?}");
    }
}

// =============================================================================
// sign-out
// =============================================================================

#[tokio::test]
async fn sign_out_success_navigates_to_sign_in() {
    let provider = FakeProvider::resolved(Ok(None));
    let nav = CapturedNavigation::new();
    let mut guard = AccessGuard::new(&nav);
    guard.observe(&signed_in("u1"));

    guard.sign_out(&*provider).await.unwrap();

    assert_eq!(nav.paths(), vec![paths::SIGN_IN.to_owned()]);
    assert_eq!(provider.calls(), vec!["sign_out".to_owned()]);

    // The provider's trailing signed-out notification must not redirect twice.
    guard.observe(&AuthState::resolved(None));
    assert_eq!(nav.paths().len(), 1);
}

#[tokio::test]
async fn sign_out_failure_stays_and_reenables() {
    let provider = FakeProvider::resolved(Ok(None));
    provider.push_sign_out_result(Err(ProviderError::Api("Sign out failed".into())));
    let nav = CapturedNavigation::new();
    let mut guard = AccessGuard::new(&nav);
    guard.observe(&signed_in("u1"));

    let err = guard.sign_out(&*provider).await.unwrap_err();

    assert_eq!(err.to_string(), "Sign out failed");
    assert!(nav.paths().is_empty());
    assert_eq!(guard.state(), GuardState::Authenticated);
    assert!(matches!(guard.view(), GuardView::Protected { signing_out: false, .. }));

    // Retry succeeds.
    guard.sign_out(&*provider).await.unwrap();
    assert_eq!(nav.paths(), vec![paths::SIGN_IN.to_owned()]);
}

#[tokio::test]
async fn sign_out_again_after_signing_back_in() {
    let provider = FakeProvider::resolved(Ok(None));
    let nav = CapturedNavigation::new();
    let mut guard = AccessGuard::new(&nav);
    guard.observe(&signed_in("u1"));
    guard.sign_out(&*provider).await.unwrap();

    guard.observe(&signed_in("u1"));
    assert!(matches!(guard.view(), GuardView::Protected { signing_out: false, .. }));

    guard.sign_out(&*provider).await.unwrap();
    assert_eq!(provider.calls(), vec!["sign_out".to_owned(), "sign_out".to_owned()]);
    assert_eq!(nav.paths(), vec![paths::SIGN_IN.to_owned(), paths::SIGN_IN.to_owned()]);
}

#[test]
fn leaving_authenticated_mid_sign_out_reenables_action() {
    let nav = CapturedNavigation::new();
    let mut guard = AccessGuard::new(&nav);
    guard.observe(&signed_in("u1"));
    assert!(guard.begin_sign_out());

    guard.observe(&AuthState::resolved(None));
    guard.observe(&signed_in("u2"));

    assert!(matches!(guard.view(), GuardView::Protected { signing_out: false, .. }));
    assert!(guard.begin_sign_out());
}

#[test]
fn sign_out_button_disabled_while_in_flight() {
    let nav = CapturedNavigation::new();
    let mut guard = AccessGuard::new(&nav);
    guard.observe(&signed_in("u1"));

    assert!(guard.begin_sign_out());
    assert!(matches!(guard.view(), GuardView::Protected { signing_out: true, .. }));
    assert!(!guard.begin_sign_out(), "second click ignored while in flight");

    guard.finish_sign_out(&Err(ProviderError::Http("timeout".into())));
    assert!(matches!(guard.view(), GuardView::Protected { signing_out: false, .. }));
}

// =============================================================================
// run (reactive)
// =============================================================================

#[tokio::test]
async fn run_redirects_once_when_fetch_finds_no_session() {
    let (provider, tx) = FakeProvider::gated();
    let store = SessionStore::new(provider.clone());
    store.start().unwrap();
    let nav = Arc::new(CapturedNavigation::new());

    let rx = store.watch().unwrap();
    let nav_task = nav.clone();
    let task = tokio::spawn(async move {
        let guard = AccessGuard::new(&*nav_task);
        guard.run(rx).await.state()
    });

    settle().await;
    assert!(nav.paths().is_empty(), "no redirect while loading");

    tx.send(Ok(None)).unwrap();
    settle().await;
    assert_eq!(nav.paths(), vec![paths::SIGN_IN.to_owned()]);

    drop(store);
    assert_eq!(task.await.unwrap(), GuardState::Unauthenticated);
}

#[tokio::test]
async fn run_follows_sign_in_then_expiry() {
    let provider = FakeProvider::resolved(Ok(Some(test_session("u1"))));
    let store = SessionStore::new(provider.clone());
    store.start().unwrap();
    settle().await;

    let nav = Arc::new(CapturedNavigation::new());
    let rx = store.watch().unwrap();
    let nav_task = nav.clone();
    let task = tokio::spawn(async move { AccessGuard::new(&*nav_task).run(rx).await.state() });

    settle().await;
    assert!(nav.paths().is_empty());

    provider.emit(AuthChangeEvent::SignedOut, None);
    settle().await;
    assert_eq!(nav.paths(), vec![paths::SIGN_IN.to_owned()]);

    drop(store);
    assert_eq!(task.await.unwrap(), GuardState::Unauthenticated);
}

#[tokio::test]
async fn run_stays_loading_when_fetch_never_resolves() {
    let (provider, tx) = FakeProvider::gated();
    drop(tx);
    let store = SessionStore::new(provider);
    store.start().unwrap();

    let nav = Arc::new(CapturedNavigation::new());
    let rx = store.watch().unwrap();
    let nav_task = nav.clone();
    let task = tokio::spawn(async move { AccessGuard::new(&*nav_task).run(rx).await.state() });

    settle().await;
    assert!(nav.paths().is_empty());

    drop(store);
    assert_eq!(task.await.unwrap(), GuardState::Initializing);
}

#[tokio::test]
async fn run_returns_when_store_stops() {
    let provider = FakeProvider::resolved(Ok(Some(test_session("u1"))));
    let store = SessionStore::new(provider);
    store.start().unwrap();
    settle().await;

    let nav = Arc::new(CapturedNavigation::new());
    let rx = store.watch().unwrap();
    let nav_task = nav.clone();
    let task = tokio::spawn(async move { AccessGuard::new(&*nav_task).run(rx).await.state() });
    settle().await;

    assert!(store.stop());
    let state = tokio::time::timeout(std::time::Duration::from_secs(1), task)
        .await
        .expect("guard task ends once the scope closes")
        .unwrap();

    assert_eq!(state, GuardState::Authenticated);
    assert!(nav.paths().is_empty());
}
