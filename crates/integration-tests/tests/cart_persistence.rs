//! Local storage round trips and remote write ordering/failures.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use dukicks_core::{CartSnapshot, Identity};
use dukicks_integration_tests::{FlakyDocumentStore, TestCart, key, line, user};
use dukicks_storefront::cart::Backend;
use dukicks_storefront::config::{CartConfig, DEFAULT_CART_NAMESPACE};
use dukicks_storefront::storage::{
    CartDocument, FileKeyValueStore, KeyValueStore, LocalCartStore, MemoryKeyValueStore,
};
use dukicks_storefront::{AddToCart, CartStore, PersistenceStatus};
use rust_decimal::Decimal;

// =============================================================================
// Local store
// =============================================================================

#[tokio::test]
async fn test_save_of_load_is_a_fixed_point() {
    let t = TestCart::new();
    t.cart
        .add_to_cart(AddToCart::new("A", Decimal::new(129_950, 2)).size("27").quantity(2))
        .await
        .unwrap();
    t.cart
        .add_to_cart(
            AddToCart::new("cap", Decimal::from(50))
                .name("Jordan Cap")
                .image("https://img.example/cap.jpg"),
        )
        .await
        .unwrap();

    let stored = t.kv.get(DEFAULT_CART_NAMESPACE).unwrap().unwrap();
    let local = t.local();
    local.save(&local.load()).unwrap();
    assert_eq!(t.kv.get(DEFAULT_CART_NAMESPACE).unwrap().unwrap(), stored);
}

#[tokio::test]
async fn test_reload_restores_anonymous_cart() {
    let first = TestCart::new();
    first
        .cart
        .add_to_cart(AddToCart::new("A", Decimal::from(100)).quantity(3))
        .await
        .unwrap();

    let reloaded = TestCart::with_local(first.kv.clone());
    assert_eq!(reloaded.cart.snapshot().await, first.cart.snapshot().await);
}

#[tokio::test]
async fn test_corrupt_local_entry_loads_empty_and_is_overwritten() {
    let kv = Arc::new(MemoryKeyValueStore::new());
    kv.set(DEFAULT_CART_NAMESPACE, "{not json").unwrap();

    let t = TestCart::with_local(kv);
    assert!(t.cart.snapshot().await.is_empty());

    t.cart
        .add_to_cart(AddToCart::new("A", Decimal::from(100)))
        .await
        .unwrap();
    assert_eq!(t.local().try_load().unwrap().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_stored_lines_are_treated_as_corrupt() {
    for stored in [
        r#"[{"productId":"A","unitPrice":"100","quantity":0}]"#,
        r#"[{"productId":"","unitPrice":"100","quantity":1}]"#,
        r#"[{"productId":"A","size":"","unitPrice":"100","quantity":1}]"#,
        r#"[{"productId":"A","unitPrice":"-5","quantity":1}]"#,
    ] {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set(DEFAULT_CART_NAMESPACE, stored).unwrap();

        let t = TestCart::with_local(kv);
        assert!(t.cart.snapshot().await.is_empty(), "{stored}");
    }
}

#[tokio::test]
async fn test_numeric_unit_price_from_older_builds_is_accepted() {
    let kv = Arc::new(MemoryKeyValueStore::new());
    kv.set(
        DEFAULT_CART_NAMESPACE,
        r#"[{"productId":"A","size":"M","unitPrice":100,"quantity":2},{"productId":"cap","unitPrice":50.5,"quantity":1}]"#,
    )
    .unwrap();

    let t = TestCart::with_local(kv);
    assert_eq!(t.cart.totals().await.subtotal, Decimal::new(2505, 1));
}

#[tokio::test]
async fn test_file_backed_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = Arc::new(FileKeyValueStore::open(dir.path()).unwrap());
        let cart = CartStore::new(
            LocalCartStore::new(store, DEFAULT_CART_NAMESPACE),
            FlakyDocumentStore::new(),
            &CartConfig::default(),
        );
        cart.add_to_cart(AddToCart::new("A", Decimal::from(100)).size("M"))
            .await
            .unwrap();
    }

    let store = Arc::new(FileKeyValueStore::open(dir.path()).unwrap());
    let cart = CartStore::new(
        LocalCartStore::new(store, DEFAULT_CART_NAMESPACE),
        FlakyDocumentStore::new(),
        &CartConfig::default(),
    );
    assert!(cart.snapshot().await.get(&key("A", Some("M"))).is_some());
}

#[tokio::test]
async fn test_local_quota_failure_reports_status_without_rollback() {
    let kv = Arc::new(MemoryKeyValueStore::with_quota(16));
    let t = TestCart::with_local(kv);
    let status = t.cart.persistence_status();

    let snapshot = t
        .cart
        .add_to_cart(AddToCart::new("A", Decimal::from(100)))
        .await
        .unwrap();

    assert_eq!(snapshot.len(), 1);
    assert!(status.borrow().is_failed());
    assert!(t.local().try_load().unwrap().is_none());
}

// =============================================================================
// Remote writes
// =============================================================================

#[tokio::test]
async fn test_slow_earlier_write_never_overwrites_later_one() {
    let t = TestCart::new();
    t.seed_remote(&user("u"), Vec::new()).await;
    t.cart
        .sync_identity(Identity::Authenticated(user("u")))
        .await
        .unwrap();

    t.remote.delay_next_save(Duration::from_millis(100));
    t.cart
        .add_to_cart(AddToCart::new("A", Decimal::from(100)))
        .await
        .unwrap();
    // Give the writer time to pick up the first snapshot.
    tokio::time::sleep(Duration::from_millis(10)).await;
    t.cart
        .add_to_cart(AddToCart::new("B", Decimal::from(100)))
        .await
        .unwrap();
    t.cart
        .update_quantity(&key("A", None), 5)
        .await
        .unwrap();
    t.cart.flush().await;

    let remote = t.remote_cart(&user("u")).await.unwrap();
    assert_eq!(remote, t.cart.snapshot().await);
    assert_eq!(remote.totals().item_count, 6);
}

#[tokio::test]
async fn test_switching_users_keeps_queued_write_for_previous_user() {
    let t = TestCart::new();
    t.seed_remote(&user("u"), Vec::new()).await;
    t.cart
        .sync_identity(Identity::Authenticated(user("u")))
        .await
        .unwrap();

    t.remote.delay_next_save(Duration::from_millis(100));
    t.cart
        .add_to_cart(AddToCart::new("A", Decimal::from(100)))
        .await
        .unwrap();
    // Let the writer start the slow save so the next one stays queued.
    tokio::time::sleep(Duration::from_millis(10)).await;
    let before_switch = t
        .cart
        .add_to_cart(AddToCart::new("B", Decimal::from(100)))
        .await
        .unwrap();

    // v has no remote cart, so switching queues v's initial upload.
    t.cart
        .sync_identity(Identity::Authenticated(user("v")))
        .await
        .unwrap();
    t.cart.flush().await;

    assert_eq!(t.remote_cart(&user("u")).await.unwrap(), before_switch);
    assert_eq!(before_switch.len(), 2);
    assert!(t.remote_cart(&user("v")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remote_write_failure_keeps_memory_state() {
    let t = TestCart::new();
    t.cart
        .sync_identity(Identity::Authenticated(user("u")))
        .await
        .unwrap();
    t.cart.flush().await;
    let mut status = t.cart.persistence_status();

    t.remote.fail_writes(true);
    let snapshot = t
        .cart
        .add_to_cart(AddToCart::new("A", Decimal::from(100)))
        .await
        .unwrap();
    t.cart.flush().await;

    assert_eq!(snapshot.len(), 1);
    assert_eq!(t.cart.snapshot().await.len(), 1);
    assert!(matches!(
        &*status.borrow_and_update(),
        PersistenceStatus::Failed {
            backend: Backend::Remote,
            ..
        }
    ));
    assert_eq!(t.remote_cart(&user("u")).await.unwrap(), CartSnapshot::empty());

    // The next mutation after recovery writes the whole cart.
    t.remote.fail_writes(false);
    t.cart
        .add_to_cart(AddToCart::new("B", Decimal::from(100)))
        .await
        .unwrap();
    t.cart.flush().await;

    assert!(matches!(
        &*status.borrow_and_update(),
        PersistenceStatus::Saved {
            backend: Backend::Remote,
            ..
        }
    ));
    assert_eq!(t.remote_cart(&user("u")).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_configured_retries_recover_remote_write() {
    let remote = FlakyDocumentStore::new();
    let config = CartConfig {
        remote_write_retries: 2,
        remote_retry_backoff: Duration::from_millis(20),
        ..CartConfig::default()
    };
    let cart = CartStore::new(
        LocalCartStore::new(Arc::new(MemoryKeyValueStore::new()), DEFAULT_CART_NAMESPACE),
        remote.clone(),
        &config,
    );
    remote
        .inner
        .insert(CartDocument {
            user_id: user("u"),
            items: CartSnapshot::from(vec![line("X", None, 10, 1)]),
            updated_at: chrono::Utc::now(),
        })
        .await;
    cart.sync_identity(Identity::Authenticated(user("u")))
        .await
        .unwrap();

    remote.fail_writes(true);
    cart.add_to_cart(AddToCart::new("A", Decimal::from(100)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    remote.fail_writes(false);
    cart.flush().await;

    assert!(!cart.persistence_status().borrow().is_failed());
    assert!(remote.save_attempts() >= 2);
}
