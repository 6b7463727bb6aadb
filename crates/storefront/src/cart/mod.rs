//! Cart reconciliation engine.
//!
//! [`CartStore`] owns the in-memory cart and decides where it is persisted:
//!
//! - **Anonymous**: every mutation is written synchronously to the local
//!   key-value store.
//! - **Authenticated**: every mutation is queued for the remote per-user
//!   document; the call returns without waiting for the write.
//! - **Migrating**: transient state while the remote cart of a user who
//!   just signed in is read. Mutations wait for it to finish.
//!
//! On sign-in, an existing remote cart replaces the anonymous one (remote
//! wins). If the user has no remote cart yet, the anonymous cart is
//! uploaded as their initial cart. On sign-out the anonymous cart is
//! reloaded from local storage and the remote cart is left for next time.
//!
//! Identity changes are processed one at a time, in arrival order, by a
//! background task; a second sign-in never interleaves with a migration
//! that is still in flight.
//!
//! # Example
//!
//! ```rust,ignore
//! let cart = CartStore::new(local, remote, &config.cart);
//! let _subscription = cart.attach(&identity_provider);
//!
//! cart.add_to_cart(AddToCart::new("air-max-90", dec!(2499)).size("27")).await?;
//! let totals = cart.totals().await;
//! ```

mod error;
mod request;
mod writer;

pub use error::CartError;
pub use request::AddToCart;
pub use writer::{Backend, PersistenceStatus, RetryPolicy};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use dukicks_core::{CartSnapshot, CartTotals, Identity, LineKey, Quantity, UserId};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};

use crate::config::CartConfig;
use crate::error::{add_breadcrumb, capture_persistence_failure};
use crate::identity::{IdentityObserver, Subscription};
use crate::storage::{CartDocumentStore, LocalCartStore};
use writer::RemoteWriter;

/// Which store is authoritative for the cart right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Anonymous,
    /// Reading the remote cart of a user who just signed in.
    Migrating(UserId),
    Authenticated(UserId),
}

impl SyncState {
    /// The user whose remote document receives writes, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Anonymous => None,
            Self::Migrating(user_id) | Self::Authenticated(user_id) => Some(user_id),
        }
    }
}

enum Transition {
    Identity {
        identity: Identity,
        done: Option<oneshot::Sender<()>>,
    },
    Barrier(oneshot::Sender<()>),
}

struct CartState {
    sync: SyncState,
    snapshot: CartSnapshot,
}

struct CartStoreInner {
    state: Mutex<CartState>,
    local: LocalCartStore,
    remote: Arc<dyn CartDocumentStore>,
    writer: RemoteWriter,
    status: Arc<watch::Sender<PersistenceStatus>>,
    transitions: mpsc::UnboundedSender<Transition>,
    loading: AtomicBool,
}

/// Handle to the cart engine.
///
/// Cheaply cloneable via `Arc`; every clone refers to the same cart. The
/// application root creates one and passes clones to consumers.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

impl CartStore {
    /// Start a cart engine.
    ///
    /// Loads the anonymous cart from `local` before any identity is known,
    /// then spawns the identity-transition and remote-writer tasks on the
    /// current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn new(
        local: LocalCartStore,
        remote: Arc<dyn CartDocumentStore>,
        config: &CartConfig,
    ) -> Self {
        let snapshot = local.load();
        info!(
            namespace = %local.namespace(),
            lines = snapshot.len(),
            "Cart store started"
        );

        let status = Arc::new(watch::channel(PersistenceStatus::Idle).0);
        let writer = RemoteWriter::spawn(
            Arc::clone(&remote),
            Arc::clone(&status),
            RetryPolicy::from(config),
        );
        let (transitions, transition_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(CartStoreInner {
            state: Mutex::new(CartState {
                sync: SyncState::Anonymous,
                snapshot,
            }),
            local,
            remote,
            writer,
            status,
            transitions,
            loading: AtomicBool::new(false),
        });

        tokio::spawn(run_transitions(Arc::downgrade(&inner), transition_rx));

        Self { inner }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add a product to the cart.
    ///
    /// Merges into an existing line with the same product and size
    /// (quantity saturates at 99) or appends a new line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidArgument` if the request is malformed; the
    /// cart is left untouched.
    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn add_to_cart(&self, request: AddToCart) -> Result<CartSnapshot, CartError> {
        let item = request.into_line_item()?;
        let product_id = item.product_id.to_string();

        Ok(self
            .mutate("Added to cart", &product_id, move |snapshot| {
                let line = snapshot.merge(item);
                debug!(quantity = line.quantity.get(), "Merged line item");
                true
            })
            .await)
    }

    /// Set the quantity of an existing line.
    ///
    /// A key with no line is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::OutOfRange` if `quantity` is outside `1..=99`;
    /// the cart is left untouched.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn update_quantity(
        &self,
        key: &LineKey,
        quantity: u32,
    ) -> Result<CartSnapshot, CartError> {
        let quantity = Quantity::new(quantity)?;

        Ok(self
            .mutate("Updated quantity", key.product_id.as_str(), |snapshot| {
                snapshot.set_quantity(key, quantity)
            })
            .await)
    }

    /// Remove a line. Removing a missing line is not an error.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn remove_from_cart(&self, key: &LineKey) -> CartSnapshot {
        self.mutate("Removed from cart", key.product_id.as_str(), |snapshot| {
            snapshot.remove(key).is_some()
        })
        .await
    }

    /// Empty the cart.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> CartSnapshot {
        self.mutate("Cleared cart", "", |snapshot| {
            let changed = !snapshot.is_empty();
            snapshot.clear();
            changed
        })
        .await
    }

    /// Apply `change` under the state lock and persist if it reports a change.
    async fn mutate(
        &self,
        action: &str,
        product_id: &str,
        change: impl FnOnce(&mut CartSnapshot) -> bool,
    ) -> CartSnapshot {
        let mut state = self.inner.state.lock().await;
        if change(&mut state.snapshot) {
            let data = [("product_id", product_id)];
            add_breadcrumb("cart", action, (!product_id.is_empty()).then_some(&data[..]));
            self.inner.persist(&state);
        }
        state.snapshot.clone()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current cart contents.
    pub async fn snapshot(&self) -> CartSnapshot {
        self.inner.state.lock().await.snapshot.clone()
    }

    /// Derived aggregates of the current cart.
    pub async fn totals(&self) -> CartTotals {
        self.inner.state.lock().await.snapshot.totals()
    }

    /// Which store is currently authoritative.
    pub async fn sync_state(&self) -> SyncState {
        self.inner.state.lock().await.sync.clone()
    }

    /// Whether a remote cart read is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    /// Subscribe to the outcome of cart writes.
    #[must_use]
    pub fn persistence_status(&self) -> watch::Receiver<PersistenceStatus> {
        self.inner.status.subscribe()
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Follow `observer`: every identity it reports is queued as a
    /// transition. Keep the returned subscription alive for as long as the
    /// cart should follow the observer.
    pub fn attach(&self, observer: &dyn IdentityObserver) -> Subscription {
        let weak = Arc::downgrade(&self.inner);
        observer.on_identity_change(Box::new(move |identity| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let transition = Transition::Identity {
                identity: identity.clone(),
                done: None,
            };
            if inner.transitions.send(transition).is_err() {
                warn!("Cart store stopped; identity change dropped");
            }
        }))
    }

    /// Queue an identity transition and wait until it has been applied.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Shutdown` if the transition task is gone.
    pub async fn sync_identity(&self, identity: Identity) -> Result<(), CartError> {
        let (done, wait) = oneshot::channel();
        self.inner
            .transitions
            .send(Transition::Identity {
                identity,
                done: Some(done),
            })
            .map_err(|_| CartError::Shutdown)?;
        wait.await.map_err(|_| CartError::Shutdown)
    }

    /// Wait until every queued identity transition has been applied and
    /// every queued remote write has been attempted.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Shutdown` if the transition task is gone.
    pub async fn settle(&self) -> Result<(), CartError> {
        let (done, wait) = oneshot::channel();
        self.inner
            .transitions
            .send(Transition::Barrier(done))
            .map_err(|_| CartError::Shutdown)?;
        wait.await.map_err(|_| CartError::Shutdown)?;
        self.flush().await;
        Ok(())
    }

    /// Wait until every queued remote write has been attempted.
    pub async fn flush(&self) {
        self.inner.writer.flush().await;
    }
}

impl CartStoreInner {
    /// Write the current snapshot to the authoritative store.
    fn persist(&self, state: &CartState) {
        match state.sync.user_id() {
            None => match self.local.save(&state.snapshot) {
                Ok(()) => {
                    self.status.send_replace(PersistenceStatus::Saved {
                        backend: Backend::Local,
                        at: Utc::now(),
                    });
                }
                Err(e) => {
                    capture_persistence_failure(&e, Backend::Local.as_str());
                    self.status.send_replace(PersistenceStatus::Failed {
                        backend: Backend::Local,
                        error: e.to_string(),
                    });
                }
            },
            Some(user_id) => {
                self.writer.enqueue(user_id.clone(), state.snapshot.clone());
            }
        }
    }

    async fn apply_identity(&self, identity: Identity) {
        let mut state = self.state.lock().await;
        let current = state.sync.clone();

        match (current, identity) {
            (SyncState::Anonymous, Identity::Anonymous) => {}
            (
                SyncState::Authenticated(current) | SyncState::Migrating(current),
                Identity::Authenticated(next),
            ) if current == next => {}
            (SyncState::Authenticated(_) | SyncState::Migrating(_), Identity::Anonymous) => {
                self.restore_local(&mut state);
            }
            (SyncState::Authenticated(_) | SyncState::Migrating(_), Identity::Authenticated(next)) => {
                self.restore_local(&mut state);
                self.migrate(&mut state, next).await;
            }
            (SyncState::Anonymous, Identity::Authenticated(next)) => {
                self.migrate(&mut state, next).await;
            }
        }
    }

    /// Reload the anonymous cart after sign-out.
    fn restore_local(&self, state: &mut CartState) {
        state.snapshot = self.local.load();
        state.sync = SyncState::Anonymous;
        info!(lines = state.snapshot.len(), "Restored anonymous cart");
    }

    /// Reconcile the anonymous cart with `user_id`'s remote cart.
    ///
    /// Runs with the state lock held, so mutations and reads queue behind
    /// the remote read. An unreadable remote cart is treated as absent: the
    /// current cart becomes the user's cart and is uploaded. The upload is
    /// queued like any other write-through and never awaited here.
    async fn migrate(&self, state: &mut CartState, user_id: UserId) {
        state.sync = SyncState::Migrating(user_id.clone());
        self.loading.store(true, Ordering::SeqCst);

        let document = match self.remote.load(&user_id).await {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    error = %e,
                    "Remote cart read failed; treating it as empty"
                );
                None
            }
        };

        match document {
            Some(document) => {
                info!(
                    user_id = %user_id,
                    remote_lines = document.items.len(),
                    discarded_lines = state.snapshot.len(),
                    "Remote cart found; replacing anonymous cart"
                );
                state.snapshot = document.items;
            }
            None => {
                info!(
                    user_id = %user_id,
                    lines = state.snapshot.len(),
                    "No remote cart; uploading anonymous cart"
                );
                self.writer.enqueue(user_id.clone(), state.snapshot.clone());
            }
        }

        state.sync = SyncState::Authenticated(user_id);
        self.loading.store(false, Ordering::SeqCst);
    }
}

async fn run_transitions(
    inner: Weak<CartStoreInner>,
    mut transitions: mpsc::UnboundedReceiver<Transition>,
) {
    while let Some(transition) = transitions.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        match transition {
            Transition::Identity { identity, done } => {
                debug!(identity = %identity, "Applying identity transition");
                inner.apply_identity(identity).await;
                if let Some(done) = done {
                    let _ = done.send(());
                }
            }
            Transition::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Cart identity task stopped");
}
