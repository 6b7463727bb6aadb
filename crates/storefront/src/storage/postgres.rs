//! `PostgreSQL` cart document store.
//!
//! # Table: `storefront.cart_document`
//!
//! | column          | type          |
//! |-----------------|---------------|
//! | `document_path` | `text` PK     |
//! | `user_id`       | `text`        |
//! | `items`         | `jsonb`       |
//! | `updated_at`    | `timestamptz` |
//!
//! Created by `migrations/20250301000000_cart_documents.sql`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dukicks_core::{CartSnapshot, UserId};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;

use super::StorageError;
use super::remote::{CartDocument, CartDocumentStore, document_path};

/// Cart document store backed by a `jsonb` column.
#[derive(Debug, Clone)]
pub struct PgCartDocumentStore {
    pool: PgPool,
}

impl PgCartDocumentStore {
    /// Create a store using `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartDocumentStore for PgCartDocumentStore {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn load(&self, user_id: &UserId) -> Result<Option<CartDocument>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, items, updated_at
            FROM storefront.cart_document
            WHERE document_path = $1
            ",
        )
        .bind(document_path(user_id))
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let stored_user: String = row.try_get("user_id")?;
        let stored_user = UserId::parse(stored_user).map_err(|e| {
            StorageError::DataCorruption(format!("invalid user id in cart document: {e}"))
        })?;
        let Json(items): Json<CartSnapshot> = row.try_get("items")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

        Ok(Some(CartDocument {
            user_id: stored_user,
            items,
            updated_at,
        }))
    }

    #[instrument(skip(self, snapshot), fields(user_id = %user_id, lines = snapshot.len()))]
    async fn save(
        &self,
        user_id: &UserId,
        snapshot: &CartSnapshot,
    ) -> Result<CartDocument, StorageError> {
        let updated_at = Utc::now();

        sqlx::query(
            r"
            INSERT INTO storefront.cart_document (document_path, user_id, items, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (document_path)
            DO UPDATE SET items = EXCLUDED.items, updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(document_path(user_id))
        .bind(user_id.as_str())
        .bind(Json(snapshot))
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(CartDocument {
            user_id: user_id.clone(),
            items: snapshot.clone(),
            updated_at,
        })
    }
}
