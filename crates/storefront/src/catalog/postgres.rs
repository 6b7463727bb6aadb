//! `PostgreSQL` product source.
//!
//! Reads the `storefront.product` table created by
//! `migrations/20250301000100_products.sql`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dukicks_core::ProductId;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use super::{CatalogError, Product, ProductSource};

const PRODUCT_COLUMNS: &str = "id, brand, model, category, price, discount, description, \
     image, images, sizes, is_new, is_featured, product_type, created_at";

/// Product source backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgProductSource {
    pool: PgPool,
}

impl PgProductSource {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(
        &self,
        clause: &str,
        bind: Option<&str>,
    ) -> Result<Vec<Product>, CatalogError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product {clause} ORDER BY created_at DESC"
        );
        let mut query = sqlx::query(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(product_from_row).collect()
    }
}

fn product_from_row(row: &PgRow) -> Result<Product, CatalogError> {
    let id: String = row.try_get("id")?;
    let id = ProductId::parse(id)
        .map_err(|e| CatalogError::DataCorruption(format!("invalid product id: {e}")))?;

    let discount: i16 = row.try_get("discount")?;
    let discount = u8::try_from(discount)
        .ok()
        .filter(|d| *d <= 100)
        .ok_or_else(|| {
            CatalogError::DataCorruption(format!("invalid discount for product {id}: {discount}"))
        })?;

    let price: Decimal = row.try_get("price")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(Product {
        id,
        brand: row.try_get("brand")?,
        model: row.try_get("model")?,
        category: row.try_get("category")?,
        price,
        discount,
        description: row.try_get("description")?,
        image: row.try_get("image")?,
        images: row.try_get("images")?,
        sizes: row.try_get("sizes")?,
        is_new: row.try_get("is_new")?,
        is_featured: row.try_get("is_featured")?,
        product_type: row.try_get("product_type")?,
        created_at,
    })
}

#[async_trait]
impl ProductSource for PgProductSource {
    #[instrument(skip(self))]
    async fn all_products(&self) -> Result<Vec<Product>, CatalogError> {
        self.fetch_where("", None).await
    }

    #[instrument(skip(self))]
    async fn product_by_id(&self, id: &str) -> Result<Option<Product>, CatalogError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn products_by_category(&self, category: &str) -> Result<Vec<Product>, CatalogError> {
        self.fetch_where("WHERE category = $1", Some(category)).await
    }

    #[instrument(skip(self))]
    async fn featured_products(&self) -> Result<Vec<Product>, CatalogError> {
        let mut products = self.fetch_where("WHERE is_featured", None).await?;
        products.truncate(super::FEATURED_LIMIT);
        Ok(products)
    }

    #[instrument(skip(self))]
    async fn new_products(&self) -> Result<Vec<Product>, CatalogError> {
        self.fetch_where("WHERE is_new", None).await
    }
}
