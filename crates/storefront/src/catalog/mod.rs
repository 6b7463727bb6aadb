//! Read-only product catalog.
//!
//! [`ProductSource`] abstracts where products come from; [`CatalogService`]
//! wraps a source with a `moka` cache (5-minute TTL by default). Listing
//! helpers for brand filters and sort menus live in [`filters`] and
//! [`sorting`].

mod cache;
pub mod filters;
mod postgres;
mod product;
pub mod sorting;

pub use filters::{BrandFilter, ProductFilter, apply_filters, unique_brands};
pub use postgres::PgProductSource;
pub use product::{DEFAULT_PRODUCT_TYPE, Product};
pub use sorting::{SortStrategy, sort_products};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument};

use cache::{CacheKey, CacheValue};

/// Maximum number of products on the featured shelf.
pub const FEATURED_LIMIT: usize = 4;

/// Errors from catalog queries.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found: {0}")]
    NotFound(String),

    #[error("Size {size} is not offered for product {product_id}")]
    InvalidSize { product_id: String, size: String },

    #[error("A size must be selected for product {0}")]
    SizeRequired(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Data corruption: {0}")]
    DataCorruption(String),
}

/// Where catalog products come from.
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Every product, newest first.
    async fn all_products(&self) -> Result<Vec<Product>, CatalogError>;

    /// The product with `id`, if any.
    async fn product_by_id(&self, id: &str) -> Result<Option<Product>, CatalogError>;

    /// Products in `category`.
    async fn products_by_category(&self, category: &str) -> Result<Vec<Product>, CatalogError>;

    /// Up to [`FEATURED_LIMIT`] featured products.
    async fn featured_products(&self) -> Result<Vec<Product>, CatalogError>;

    /// Products flagged as new arrivals.
    async fn new_products(&self) -> Result<Vec<Product>, CatalogError>;
}

// =============================================================================
// StaticCatalog
// =============================================================================

/// In-memory product source.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    products: Vec<Product>,
}

impl StaticCatalog {
    /// Create a catalog; products are kept newest first.
    #[must_use]
    pub fn new(mut products: Vec<Product>) -> Self {
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self { products }
    }

    fn matching(&self, predicate: impl Fn(&Product) -> bool) -> Vec<Product> {
        self.products
            .iter()
            .filter(|p| predicate(p))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ProductSource for StaticCatalog {
    async fn all_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.clone())
    }

    async fn product_by_id(&self, id: &str) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.iter().find(|p| p.id.as_str() == id).cloned())
    }

    async fn products_by_category(&self, category: &str) -> Result<Vec<Product>, CatalogError> {
        Ok(self.matching(|p| p.category == category))
    }

    async fn featured_products(&self) -> Result<Vec<Product>, CatalogError> {
        let mut products = self.matching(|p| p.is_featured);
        products.truncate(FEATURED_LIMIT);
        Ok(products)
    }

    async fn new_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.matching(|p| p.is_new))
    }
}

// =============================================================================
// CatalogService
// =============================================================================

/// Cached access to a [`ProductSource`].
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogServiceInner>,
}

struct CatalogServiceInner {
    source: Arc<dyn ProductSource>,
    cache: Cache<String, CacheValue>,
}

impl CatalogService {
    /// Wrap `source` with a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(source: Arc<dyn ProductSource>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();

        Self {
            inner: Arc::new(CatalogServiceInner { source, cache }),
        }
    }

    /// Every product, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the source query fails.
    #[instrument(skip(self))]
    pub async fn all_products(&self) -> Result<Vec<Product>, CatalogError> {
        self.cached_list(CacheKey::AllProducts, || self.inner.source.all_products())
            .await
    }

    /// Products in `category`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source query fails.
    #[instrument(skip(self))]
    pub async fn products_by_category(&self, category: &str) -> Result<Vec<Product>, CatalogError> {
        self.cached_list(CacheKey::Category(category.to_string()), || {
            self.inner.source.products_by_category(category)
        })
        .await
    }

    /// Featured products for the home page.
    ///
    /// # Errors
    ///
    /// Returns an error if the source query fails.
    #[instrument(skip(self))]
    pub async fn featured_products(&self) -> Result<Vec<Product>, CatalogError> {
        self.cached_list(CacheKey::Featured, || self.inner.source.featured_products())
            .await
    }

    /// New arrivals.
    ///
    /// # Errors
    ///
    /// Returns an error if the source query fails.
    #[instrument(skip(self))]
    pub async fn new_products(&self) -> Result<Vec<Product>, CatalogError> {
        self.cached_list(CacheKey::New, || self.inner.source.new_products())
            .await
    }

    /// The product with `id`, if any. Misses are cached too.
    ///
    /// # Errors
    ///
    /// Returns an error if the source query fails.
    #[instrument(skip(self))]
    pub async fn product_by_id(&self, id: &str) -> Result<Option<Product>, CatalogError> {
        let cache_key = CacheKey::Product(id.to_string()).as_key();

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(product.map(|p| *p));
        }

        let product = self.inner.source.product_by_id(id).await?;

        self.inner
            .cache
            .insert(
                cache_key,
                CacheValue::Product(product.clone().map(Box::new)),
            )
            .await;

        Ok(product)
    }

    /// Like [`product_by_id`](Self::product_by_id) but a missing product is
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has `id`.
    pub async fn require_product(&self, id: &str) -> Result<Product, CatalogError> {
        self.product_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    /// Products in `category` matching `filter`, ordered by `sort`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source query fails.
    pub async fn category_listing(
        &self,
        category: &str,
        filter: &ProductFilter,
        sort: SortStrategy,
    ) -> Result<Vec<Product>, CatalogError> {
        let products = self.products_by_category(category).await?;
        Ok(sort.sort(&apply_filters(&products, filter)))
    }

    /// Drop a cached product.
    pub async fn invalidate_product(&self, id: &str) {
        let cache_key = CacheKey::Product(id.to_string()).as_key();
        self.inner.cache.invalidate(&cache_key).await;
    }

    /// Drop every cached entry.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    async fn cached_list<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<Vec<Product>, CatalogError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Product>, CatalogError>>,
    {
        let cache_key = key.as_key();

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!(key = %cache_key, "Cache hit for products");
            return Ok(products);
        }

        let products = fetch().await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("cached_entries", &self.inner.cache.entry_count())
            .finish_non_exhaustive()
    }
}
