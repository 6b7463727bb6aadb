//! Application state owned by the UI shell.

use std::sync::Arc;

use dukicks_core::CartSnapshot;
use sqlx::PgPool;
use tracing::info;

use crate::cart::CartStore;
use crate::catalog::{CatalogService, PgProductSource, ProductSource, StaticCatalog};
use crate::config::StorefrontConfig;
use crate::db;
use crate::error::Result;
use crate::identity::{IdentityProvider, Subscription};
use crate::storage::{
    CartDocumentStore, FileKeyValueStore, KeyValueStore, LocalCartStore, MemoryCartDocumentStore,
    MemoryKeyValueStore, PgCartDocumentStore,
};

/// Application state shared across the UI.
///
/// This struct is cheaply cloneable via `Arc` and ties the cart engine to
/// the identity provider for as long as it lives.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: Option<PgPool>,
    cart: CartStore,
    catalog: CatalogService,
    identity: IdentityProvider,
    _identity_subscription: Subscription,
}

impl AppState {
    /// Build the state from explicit backends.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        local: Arc<dyn KeyValueStore>,
        remote: Arc<dyn CartDocumentStore>,
        products: Arc<dyn ProductSource>,
    ) -> Self {
        Self::with_pool(config, None, local, remote, products)
    }

    fn with_pool(
        config: StorefrontConfig,
        pool: Option<PgPool>,
        local: Arc<dyn KeyValueStore>,
        remote: Arc<dyn CartDocumentStore>,
        products: Arc<dyn ProductSource>,
    ) -> Self {
        let cart = CartStore::new(
            LocalCartStore::new(local, config.cart.namespace.clone()),
            remote,
            &config.cart,
        );
        let catalog = CatalogService::new(products, config.catalog_cache_ttl);
        let identity = IdentityProvider::new();
        let subscription = cart.attach(&identity);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                cart,
                catalog,
                identity,
                _identity_subscription: subscription,
            }),
        }
    }

    /// Build the state from configuration.
    ///
    /// Uses a file-backed local store when `data_dir` is set and
    /// `PostgreSQL` for cart documents and products when a database URL is
    /// set; otherwise both fall back to in-memory backends. Pending
    /// migrations are applied on connect.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created or the
    /// database cannot be reached or migrated.
    pub async fn bootstrap(config: StorefrontConfig) -> Result<Self> {
        let local: Arc<dyn KeyValueStore> = match &config.cart.data_dir {
            Some(dir) => {
                info!(dir = %dir.display(), "Using file-backed cart storage");
                Arc::new(FileKeyValueStore::open(dir.clone())?)
            }
            None => Arc::new(MemoryKeyValueStore::new()),
        };

        let Some(database_url) = config.database_url.clone() else {
            info!("No database configured; using in-memory cart documents and catalog");
            return Ok(Self::new(
                config,
                local,
                Arc::new(MemoryCartDocumentStore::new()),
                Arc::new(StaticCatalog::default()),
            ));
        };

        let pool = db::create_pool(&database_url).await?;
        info!("Database pool created");
        db::run_migrations(&pool).await?;

        Ok(Self::with_pool(
            config,
            Some(pool.clone()),
            local,
            Arc::new(PgCartDocumentStore::new(pool.clone())),
            Arc::new(PgProductSource::new(pool)),
        ))
    }

    /// Look up a product and add one unit of it to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist, the size is not
    /// offered, or the cart rejects the request.
    pub async fn add_product_to_cart(
        &self,
        product_id: &str,
        size: Option<&str>,
    ) -> Result<CartSnapshot> {
        let product = self.inner.catalog.require_product(product_id).await?;
        let request = product.to_cart_item(size)?;
        Ok(self.inner.cart.add_to_cart(request).await?)
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The database pool, when one is configured.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// The identity provider the cart follows.
    #[must_use]
    pub fn identity(&self) -> &IdentityProvider {
        &self.inner.identity
    }
}
