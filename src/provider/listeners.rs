//! Session-change listener registry and subscription handles.
//!
//! DESIGN
//! ======
//! Providers keep registered listeners in a map keyed by a monotonically
//! increasing id. `add` hands back a [`Subscription`] whose release closure
//! removes that id; the closure runs at most once, either through
//! [`Subscription::unsubscribe`] or when the handle is dropped.
//!
//! `emit` snapshots the listeners before calling them so a listener may
//! subscribe or unsubscribe from inside its own callback.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use super::types::{AuthChangeEvent, Session};

/// Callback invoked for every session change, in provider emission order.
pub type SessionListener = Arc<dyn Fn(AuthChangeEvent, Option<Session>) + Send + Sync>;

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Handle for a live session-change subscription.
#[must_use = "dropping a Subscription releases it immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self { release: Some(Box::new(release)) }
    }

    /// Release the subscription. Consumes the handle so it cannot run twice.
    pub fn unsubscribe(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Default)]
struct Listeners {
    next_id: AtomicU64,
    entries: Mutex<BTreeMap<u64, SessionListener>>,
}

/// Fan-out of session changes to any number of listeners.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Listeners>,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: SessionListener) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.entries).insert(id, listener);

        let weak: Weak<Listeners> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner.entries).remove(&id);
            }
        })
    }

    /// Deliver one change to every registered listener.
    pub fn emit(&self, event: AuthChangeEvent, session: Option<&Session>) {
        let snapshot: Vec<SessionListener> = lock(&self.inner.entries).values().cloned().collect();
        tracing::debug!(event = %event, listeners = snapshot.len(), "emitting auth change");
        for listener in snapshot {
            listener(event, session.cloned());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.inner.entries).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock(entries: &Mutex<BTreeMap<u64, SessionListener>>) -> std::sync::MutexGuard<'_, BTreeMap<u64, SessionListener>> {
    entries
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
#[path = "listeners_test.rs"]
mod tests;
