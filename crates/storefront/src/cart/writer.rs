//! Background write-through to the remote cart document store.
//!
//! Mutations hand the writer their latest snapshot tagged with a monotonic
//! sequence number and return immediately. Pending writes are coalesced per
//! user: a newer snapshot replaces that user's queued one, but never another
//! user's. A single task drains the queue oldest first, so writes complete
//! in sequence order and an older snapshot can never land after a newer one.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dukicks_core::{CartSnapshot, UserId};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::CartConfig;
use crate::error::capture_persistence_failure;
use crate::storage::{CartDocument, CartDocumentStore, StorageError};

/// Which store a persistence outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Local,
    Remote,
}

impl Backend {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// Outcome of the most recent cart write, for "changes not saved" banners.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PersistenceStatus {
    /// Nothing has been written since the store started.
    #[default]
    Idle,
    Saved {
        backend: Backend,
        at: DateTime<Utc>,
    },
    Failed {
        backend: Backend,
        error: String,
    },
}

impl PersistenceStatus {
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Retry behavior for failed remote writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub retries: u32,
    /// Delay before each extra attempt.
    pub backoff: Duration,
}

impl From<&CartConfig> for RetryPolicy {
    fn from(config: &CartConfig) -> Self {
        Self {
            retries: config.remote_write_retries,
            backoff: config.remote_retry_backoff,
        }
    }
}

#[derive(Debug)]
struct PendingWrite {
    seq: u64,
    user_id: UserId,
    snapshot: CartSnapshot,
}

/// Newest unwritten snapshot per user.
type PendingWrites = HashMap<UserId, PendingWrite>;

/// Handle to the remote writer task.
///
/// Dropping the handle closes the queue and stops the task once the
/// in-flight write (if any) finishes; writes still queued are dropped.
pub(crate) struct RemoteWriter {
    pending: Arc<watch::Sender<PendingWrites>>,
    written: watch::Receiver<u64>,
    next_seq: AtomicU64,
}

impl RemoteWriter {
    /// Spawn the writer task on the current Tokio runtime.
    pub(crate) fn spawn(
        remote: Arc<dyn CartDocumentStore>,
        status: Arc<watch::Sender<PersistenceStatus>>,
        retry: RetryPolicy,
    ) -> Self {
        let (pending_tx, pending_rx) = watch::channel(PendingWrites::new());
        let pending_tx = Arc::new(pending_tx);
        let (written_tx, written_rx) = watch::channel(0);

        tokio::spawn(run_writer(
            remote,
            Arc::downgrade(&pending_tx),
            pending_rx,
            written_tx,
            status,
            retry,
        ));

        Self {
            pending: pending_tx,
            written: written_rx,
            next_seq: AtomicU64::new(0),
        }
    }

    /// Queue `snapshot` as the newest state of `user_id`'s cart.
    ///
    /// Replaces a write still queued for the same user; writes queued for
    /// other users are kept. Returns the sequence number assigned to the
    /// write.
    pub(crate) fn enqueue(&self, user_id: UserId, snapshot: CartSnapshot) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(seq, user_id = %user_id, lines = snapshot.len(), "Queued remote cart write");
        self.pending.send_modify(|pending| {
            pending.insert(
                user_id.clone(),
                PendingWrite {
                    seq,
                    user_id,
                    snapshot,
                },
            );
        });
        seq
    }

    /// Wait until every write queued so far has been attempted.
    ///
    /// Never resolves if the remote store hangs.
    pub(crate) async fn flush(&self) {
        let target = self.next_seq.load(Ordering::SeqCst);
        let mut written = self.written.clone();
        // An error means the task is gone; nothing more will be written.
        let _ = written.wait_for(|seq| *seq >= target).await;
    }
}

/// Take the oldest queued write, if any.
///
/// Does not notify the queue's receiver; only `enqueue` wakes the task.
fn take_oldest(queue: &Weak<watch::Sender<PendingWrites>>) -> Option<PendingWrite> {
    let queue = queue.upgrade()?;
    let mut oldest = None;
    queue.send_if_modified(|pending| {
        let user_id = pending
            .values()
            .min_by_key(|write| write.seq)
            .map(|write| write.user_id.clone());
        oldest = user_id.and_then(|user_id| pending.remove(&user_id));
        false
    });
    oldest
}

async fn run_writer(
    remote: Arc<dyn CartDocumentStore>,
    queue: Weak<watch::Sender<PendingWrites>>,
    mut changes: watch::Receiver<PendingWrites>,
    written: watch::Sender<u64>,
    status: Arc<watch::Sender<PersistenceStatus>>,
    retry: RetryPolicy,
) {
    loop {
        // Mark the queue seen before draining so a later enqueue wakes us.
        drop(changes.borrow_and_update());
        while let Some(write) = take_oldest(&queue) {
            write_one(remote.as_ref(), &write, &status, retry).await;
            written.send_replace(write.seq);
        }
        if changes.changed().await.is_err() {
            break;
        }
    }

    debug!("Remote cart writer stopped");
}

async fn write_one(
    remote: &dyn CartDocumentStore,
    write: &PendingWrite,
    status: &watch::Sender<PersistenceStatus>,
    retry: RetryPolicy,
) {
    match save_with_retry(remote, &write.user_id, &write.snapshot, retry).await {
        Ok(document) => {
            debug!(seq = write.seq, user_id = %write.user_id, "Remote cart saved");
            status.send_replace(PersistenceStatus::Saved {
                backend: Backend::Remote,
                at: document.updated_at,
            });
        }
        Err(e) => {
            capture_persistence_failure(&e, Backend::Remote.as_str());
            status.send_replace(PersistenceStatus::Failed {
                backend: Backend::Remote,
                error: e.to_string(),
            });
        }
    }
}

async fn save_with_retry(
    remote: &dyn CartDocumentStore,
    user_id: &UserId,
    snapshot: &CartSnapshot,
    retry: RetryPolicy,
) -> Result<CartDocument, StorageError> {
    let mut attempt = 0;
    loop {
        match remote.save(user_id, snapshot).await {
            Ok(document) => return Ok(document),
            Err(e) if attempt < retry.retries => {
                attempt += 1;
                warn!(
                    error = %e,
                    attempt,
                    max_retries = retry.retries,
                    "Remote cart write failed, retrying"
                );
                tokio::time::sleep(retry.backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}
