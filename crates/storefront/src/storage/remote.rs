//! Remote per-user cart documents.
//!
//! Each authenticated user owns one document at `users/{userId}/cart/items`
//! holding their full cart and the time it was last written. Writes are
//! unconditional upserts: the last writer wins.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dukicks_core::{CartSnapshot, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::StorageError;

/// Address of the cart document for `user_id`.
#[must_use]
pub fn document_path(user_id: &UserId) -> String {
    format!("users/{user_id}/cart/items")
}

/// A user's persisted cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDocument {
    pub user_id: UserId,
    pub items: CartSnapshot,
    pub updated_at: DateTime<Utc>,
}

/// Storage for per-user cart documents.
#[async_trait]
pub trait CartDocumentStore: Send + Sync {
    /// Fetch the cart document for `user_id`.
    ///
    /// Returns `None` if the user has never had a cart saved.
    async fn load(&self, user_id: &UserId) -> Result<Option<CartDocument>, StorageError>;

    /// Upsert the cart document for `user_id` with a fresh timestamp.
    async fn save(
        &self,
        user_id: &UserId,
        snapshot: &CartSnapshot,
    ) -> Result<CartDocument, StorageError>;
}

/// In-process document store keyed by document path.
#[derive(Debug, Default)]
pub struct MemoryCartDocumentStore {
    documents: RwLock<HashMap<String, CartDocument>>,
}

impl MemoryCartDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document directly, bypassing timestamps. Useful for fixtures.
    pub async fn insert(&self, document: CartDocument) {
        let path = document_path(&document.user_id);
        self.documents.write().await.insert(path, document);
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether no documents are stored.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl CartDocumentStore for MemoryCartDocumentStore {
    async fn load(&self, user_id: &UserId) -> Result<Option<CartDocument>, StorageError> {
        Ok(self
            .documents
            .read()
            .await
            .get(&document_path(user_id))
            .cloned())
    }

    async fn save(
        &self,
        user_id: &UserId,
        snapshot: &CartSnapshot,
    ) -> Result<CartDocument, StorageError> {
        let document = CartDocument {
            user_id: user_id.clone(),
            items: snapshot.clone(),
            updated_at: Utc::now(),
        };
        self.documents
            .write()
            .await
            .insert(document_path(user_id), document.clone());
        Ok(document)
    }
}
