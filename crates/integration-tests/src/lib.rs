//! Integration tests for the DUKICKS storefront.
//!
//! Scenario tests live in `tests/`; this library holds the shared fixtures.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p dukicks-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_identity` - sign-in, sign-out and user switches
//! - `cart_operations` - mutations and derived totals
//! - `cart_persistence` - local storage and remote write ordering/failures
//! - `catalog_listing` - catalog queries, filters and sort menus

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use dukicks_core::{CartSnapshot, LineItem, LineKey, ProductId, Quantity, Size, UserId};
use dukicks_storefront::CartStore;
use dukicks_storefront::catalog::Product;
use dukicks_storefront::config::{CartConfig, DEFAULT_CART_NAMESPACE};
use dukicks_storefront::storage::{
    CartDocument, CartDocumentStore, LocalCartStore, MemoryCartDocumentStore, MemoryKeyValueStore,
    StorageError,
};
use rust_decimal::Decimal;

/// Remote document store with switchable failures and latency.
#[derive(Debug, Default)]
pub struct FlakyDocumentStore {
    pub inner: MemoryCartDocumentStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    /// Delay applied to the next save only, in milliseconds.
    next_save_delay_ms: AtomicU32,
    saves: AtomicU32,
}

impl FlakyDocumentStore {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn delay_next_save(&self, delay: Duration) {
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        self.next_save_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Number of save attempts, failed ones included.
    #[must_use]
    pub fn save_attempts(&self) -> u32 {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CartDocumentStore for FlakyDocumentStore {
    async fn load(&self, user_id: &UserId) -> Result<Option<CartDocument>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("remote read refused".to_string()));
        }
        self.inner.load(user_id).await
    }

    async fn save(
        &self,
        user_id: &UserId,
        snapshot: &CartSnapshot,
    ) -> Result<CartDocument, StorageError> {
        self.saves.fetch_add(1, Ordering::SeqCst);

        let delay = self.next_save_delay_ms.swap(0, Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(u64::from(delay))).await;
        }

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("remote write refused".to_string()));
        }
        self.inner.save(user_id, snapshot).await
    }
}

/// A cart engine wired to in-memory local storage and a flaky remote.
pub struct TestCart {
    pub kv: Arc<MemoryKeyValueStore>,
    pub remote: Arc<FlakyDocumentStore>,
    pub cart: CartStore,
}

impl TestCart {
    /// Fresh engine with empty stores.
    #[must_use]
    pub fn new() -> Self {
        Self::with_local(Arc::new(MemoryKeyValueStore::new()))
    }

    /// Engine over an existing local store, as after a page reload.
    #[must_use]
    pub fn with_local(kv: Arc<MemoryKeyValueStore>) -> Self {
        let remote = FlakyDocumentStore::new();
        let cart = CartStore::new(
            LocalCartStore::new(kv.clone(), DEFAULT_CART_NAMESPACE),
            remote.clone(),
            &CartConfig::default(),
        );
        Self { kv, remote, cart }
    }

    /// A separate handle on the same local storage key.
    #[must_use]
    pub fn local(&self) -> LocalCartStore {
        LocalCartStore::new(self.kv.clone(), DEFAULT_CART_NAMESPACE)
    }

    /// Seed a remote cart for `user_id`.
    pub async fn seed_remote(&self, user_id: &UserId, items: Vec<LineItem>) {
        self.remote
            .inner
            .insert(CartDocument {
                user_id: user_id.clone(),
                items: CartSnapshot::from(items),
                updated_at: Utc::now(),
            })
            .await;
    }

    /// The remote cart stored for `user_id`.
    pub async fn remote_cart(&self, user_id: &UserId) -> Option<CartSnapshot> {
        self.remote
            .inner
            .load(user_id)
            .await
            .unwrap()
            .map(|doc| doc.items)
    }
}

impl Default for TestCart {
    fn default() -> Self {
        Self::new()
    }
}

#[must_use]
pub fn user(id: &str) -> UserId {
    UserId::parse(id).unwrap()
}

#[must_use]
pub fn key(product_id: &str, size: Option<&str>) -> LineKey {
    LineKey::new(
        ProductId::parse(product_id).unwrap(),
        size.map(|s| Size::parse(s).unwrap()),
    )
}

/// A line item with no display metadata.
#[must_use]
pub fn line(product_id: &str, size: Option<&str>, unit_price: i64, quantity: u32) -> LineItem {
    LineItem {
        product_id: ProductId::parse(product_id).unwrap(),
        size: size.map(|s| Size::parse(s).unwrap()),
        unit_price: Decimal::from(unit_price),
        quantity: Quantity::new(quantity).unwrap(),
        name: None,
        image: None,
    }
}

/// A catalog product created on `day` of January 2025.
#[must_use]
pub fn product(id: &str, brand: &str, model: &str, price: i64, day: u32) -> Product {
    Product {
        id: ProductId::parse(id).unwrap(),
        brand: brand.to_string(),
        model: model.to_string(),
        category: "hombre".to_string(),
        price: Decimal::from(price),
        discount: 0,
        description: format!("{brand} {model}"),
        image: format!("https://img.example/{id}.jpg"),
        images: Vec::new(),
        sizes: vec!["25".to_string(), "26".to_string(), "27".to_string()],
        is_new: false,
        is_featured: false,
        product_type: dukicks_storefront::catalog::DEFAULT_PRODUCT_TYPE.to_string(),
        created_at: Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap(),
    }
}
