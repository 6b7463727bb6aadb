//! Identity observer contract.
//!
//! Authentication itself happens in an external identity provider. The
//! storefront only needs to know who is signed in right now and to be told
//! when that changes. [`IdentityObserver`] is that contract;
//! [`IdentityProvider`] is an in-process implementation the UI shell feeds
//! after its provider resolves a sign-in or sign-out.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use dukicks_core::{Identity, UserId};
use tracing::info;

use crate::error::{clear_sentry_user, set_sentry_user};

/// Callback invoked with the new identity on every change.
pub type IdentityCallback = Box<dyn Fn(&Identity) + Send + Sync>;

/// Source of authentication state changes.
pub trait IdentityObserver: Send + Sync {
    /// The identity at this moment.
    fn current_identity(&self) -> Identity;

    /// Register `callback` for identity changes.
    ///
    /// The callback is invoked once immediately with the current identity,
    /// then on every change, until the returned [`Subscription`] is dropped
    /// or unsubscribed.
    fn on_identity_change(&self, callback: IdentityCallback) -> Subscription;
}

/// Handle that detaches an identity callback when dropped.
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Create a subscription that runs `unsubscribe` when released.
    pub fn new(unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Detach the callback now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

// =============================================================================
// IdentityProvider
// =============================================================================

/// In-process identity observer driven by the UI shell.
///
/// Cheaply cloneable; clones share state.
#[derive(Clone, Default)]
pub struct IdentityProvider {
    inner: Arc<ProviderInner>,
}

#[derive(Default)]
struct ProviderInner {
    /// Held across storing a change and notifying listeners, so listeners
    /// see changes in the order they were stored.
    notify: Mutex<()>,
    current: RwLock<Identity>,
    listeners: RwLock<BTreeMap<u64, Arc<IdentityCallback>>>,
    next_listener: AtomicU64,
}

impl IdentityProvider {
    /// Create a provider with no signed-in user.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `user_id` signed in.
    pub fn sign_in(&self, user_id: UserId) {
        self.set_identity(Identity::Authenticated(user_id));
    }

    /// Record that the user signed out.
    pub fn sign_out(&self) {
        self.set_identity(Identity::Anonymous);
    }

    /// Replace the current identity and notify listeners if it changed.
    ///
    /// Concurrent calls are serialized. Listeners must not call back into
    /// the provider.
    pub fn set_identity(&self, identity: Identity) {
        let _notifying = self
            .inner
            .notify
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        {
            let mut current = self
                .inner
                .current
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if *current == identity {
                return;
            }
            current.clone_from(&identity);
        }

        match &identity {
            Identity::Authenticated(user_id) => {
                info!(user_id = %user_id, "User signed in");
                set_sentry_user(user_id);
            }
            Identity::Anonymous => {
                info!("User signed out");
                clear_sentry_user();
            }
        }

        // Snapshot listeners so callbacks run without holding the lock.
        let listeners: Vec<Arc<IdentityCallback>> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener(&identity);
        }
    }

    /// Number of attached callbacks.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl IdentityObserver for IdentityProvider {
    fn current_identity(&self) -> Identity {
        self.inner
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn on_identity_change(&self, callback: IdentityCallback) -> Subscription {
        let notifying = self
            .inner
            .notify
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        let callback = Arc::new(callback);
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&callback));

        callback(&self.current_identity());
        drop(notifying);

        let weak: Weak<ProviderInner> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .listeners
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&id);
            }
        })
    }
}

impl std::fmt::Debug for IdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityProvider")
            .field("current", &self.current_identity())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<Identity>>>, IdentityCallback) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: IdentityCallback = Box::new(move |identity| {
            sink.lock().unwrap().push(identity.clone());
        });
        (seen, callback)
    }

    #[test]
    fn test_callback_receives_current_then_changes() {
        let provider = IdentityProvider::new();
        let (seen, callback) = recorder();
        let _subscription = provider.on_identity_change(callback);

        let user = UserId::parse("uid_1").unwrap();
        provider.sign_in(user.clone());
        provider.sign_out();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                Identity::Anonymous,
                Identity::Authenticated(user),
                Identity::Anonymous
            ]
        );
    }

    #[test]
    fn test_unchanged_identity_is_not_renotified() {
        let provider = IdentityProvider::new();
        let (seen, callback) = recorder();
        let _subscription = provider.on_identity_change(callback);

        provider.sign_out();
        let user = UserId::parse("uid_1").unwrap();
        provider.sign_in(user.clone());
        provider.sign_in(user);

        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_unsubscribe_detaches() {
        let provider = IdentityProvider::new();
        let (seen, callback) = recorder();
        let subscription = provider.on_identity_change(callback);
        assert_eq!(provider.listener_count(), 1);

        subscription.unsubscribe();
        assert_eq!(provider.listener_count(), 0);

        provider.sign_in(UserId::parse("uid_1").unwrap());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_drop_detaches() {
        let provider = IdentityProvider::new();
        let (_, callback) = recorder();
        {
            let _subscription = provider.on_identity_change(callback);
            assert_eq!(provider.listener_count(), 1);
        }
        assert_eq!(provider.listener_count(), 0);
    }

    #[test]
    fn test_concurrent_changes_notify_in_store_order() {
        let provider = IdentityProvider::new();
        let (seen, callback) = recorder();
        let _subscription = provider.on_identity_change(callback);
        let user = UserId::parse("uid_1").unwrap();

        std::thread::scope(|scope| {
            for i in 0..8 {
                let provider = provider.clone();
                let user = user.clone();
                scope.spawn(move || {
                    for _ in 0..200 {
                        if i % 2 == 0 {
                            provider.sign_in(user.clone());
                        } else {
                            provider.sign_out();
                        }
                    }
                });
            }
        });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.last(), Some(&provider.current_identity()));
        // Only changes are delivered, so neighbours always differ.
        assert!(seen.windows(2).all(|pair| pair.first() != pair.last()));
    }

    #[test]
    fn test_current_identity() {
        let provider = IdentityProvider::new();
        assert_eq!(provider.current_identity(), Identity::Anonymous);
        let user = UserId::parse("uid_9").unwrap();
        provider.sign_in(user.clone());
        assert_eq!(provider.current_identity(), Identity::Authenticated(user));
    }
}
