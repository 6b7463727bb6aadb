//! Cart mutations and derived totals.

#![allow(clippy::unwrap_used)]

use dukicks_integration_tests::{TestCart, key};
use dukicks_storefront::{AddToCart, CartError};
use rust_decimal::Decimal;

// =============================================================================
// addToCart
// =============================================================================

#[tokio::test]
async fn test_repeated_adds_collapse_into_one_line() {
    let t = TestCart::new();
    for delta in [1, 5, 40, 60] {
        t.cart
            .add_to_cart(AddToCart::new("A", Decimal::from(100)).size("M").quantity(delta))
            .await
            .unwrap();
    }

    let snapshot = t.cart.snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.get(&key("A", Some("M"))).unwrap().quantity.get(), 99);
}

#[tokio::test]
async fn test_large_delta_clamps_to_99() {
    let t = TestCart::new();
    t.cart
        .add_to_cart(AddToCart::new("A", Decimal::from(100)).size("M"))
        .await
        .unwrap();
    let snapshot = t
        .cart
        .add_to_cart(AddToCart::new("A", Decimal::from(100)).size("M").quantity(200))
        .await
        .unwrap();

    assert_eq!(snapshot.get(&key("A", Some("M"))).unwrap().quantity.get(), 99);

    let fresh = TestCart::new();
    let snapshot = fresh
        .cart
        .add_to_cart(AddToCart::new("B", Decimal::from(10)).quantity(500))
        .await
        .unwrap();
    assert_eq!(snapshot.get(&key("B", None)).unwrap().quantity.get(), 99);
}

#[tokio::test]
async fn test_sizes_are_distinct_lines() {
    let t = TestCart::new();
    t.cart
        .add_to_cart(AddToCart::new("A", Decimal::from(100)).size("M"))
        .await
        .unwrap();
    t.cart
        .add_to_cart(AddToCart::new("A", Decimal::from(100)).size("L"))
        .await
        .unwrap();
    let snapshot = t
        .cart
        .add_to_cart(AddToCart::new("A", Decimal::from(100)))
        .await
        .unwrap();

    let keys: Vec<String> = snapshot.items().iter().map(|i| i.key().to_string()).collect();
    assert_eq!(keys, ["A/M", "A/L", "A"]);
}

#[tokio::test]
async fn test_first_captured_price_is_kept() {
    let t = TestCart::new();
    t.cart
        .add_to_cart(AddToCart::new("A", Decimal::from(100)))
        .await
        .unwrap();
    let snapshot = t
        .cart
        .add_to_cart(AddToCart::new("A", Decimal::from(80)))
        .await
        .unwrap();

    let line = snapshot.get(&key("A", None)).unwrap();
    assert_eq!(line.unit_price, Decimal::from(100));
    assert_eq!(line.quantity.get(), 2);
}

#[tokio::test]
async fn test_invalid_adds_are_rejected() {
    let t = TestCart::new();

    for request in [
        AddToCart::new("", Decimal::from(100)),
        AddToCart::new("A", Decimal::ZERO),
        AddToCart::new("A", Decimal::from(-5)),
        AddToCart::new("A", Decimal::from(100)).quantity(0),
    ] {
        let err = t.cart.add_to_cart(request).await.unwrap_err();
        assert!(matches!(err, CartError::InvalidArgument(_)), "{err}");
    }

    assert!(t.cart.snapshot().await.is_empty());
}

// =============================================================================
// updateQuantity / removeFromCart / clearCart
// =============================================================================

#[tokio::test]
async fn test_update_quantity_rejects_out_of_range() {
    let t = TestCart::new();
    t.cart
        .add_to_cart(AddToCart::new("A", Decimal::from(100)).size("M").quantity(4))
        .await
        .unwrap();
    let before = t.cart.snapshot().await;

    for value in [0, 100] {
        assert_eq!(
            t.cart
                .update_quantity(&key("A", Some("M")), value)
                .await
                .unwrap_err(),
            CartError::OutOfRange { value }
        );
    }
    assert_eq!(t.cart.snapshot().await, before);
}

#[tokio::test]
async fn test_update_quantity_sets_exact_value() {
    let t = TestCart::new();
    t.cart
        .add_to_cart(AddToCart::new("A", Decimal::from(100)).quantity(4))
        .await
        .unwrap();

    for value in [1, 99, 12] {
        let snapshot = t.cart.update_quantity(&key("A", None), value).await.unwrap();
        assert_eq!(snapshot.get(&key("A", None)).unwrap().quantity.get(), value);
    }
}

#[tokio::test]
async fn test_remove_then_add_yields_fresh_line() {
    let t = TestCart::new();
    t.cart
        .add_to_cart(AddToCart::new("A", Decimal::from(100)).size("M").quantity(7))
        .await
        .unwrap();
    t.cart.remove_from_cart(&key("A", Some("M"))).await;
    let snapshot = t
        .cart
        .add_to_cart(AddToCart::new("A", Decimal::from(100)).size("M"))
        .await
        .unwrap();

    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.get(&key("A", Some("M"))).unwrap().quantity.get(), 1);
}

#[tokio::test]
async fn test_remove_missing_and_clear_empty_are_noops() {
    let t = TestCart::new();
    assert!(t.cart.remove_from_cart(&key("ghost", None)).await.is_empty());
    assert!(t.cart.clear_cart().await.is_empty());
    assert!(t.local().try_load().unwrap().is_none());
}

// =============================================================================
// Totals
// =============================================================================

#[tokio::test]
async fn test_reference_cart_totals() {
    let t = TestCart::new();
    t.cart
        .add_to_cart(AddToCart::new("A", Decimal::from(100)).size("M").quantity(2))
        .await
        .unwrap();
    t.cart
        .add_to_cart(AddToCart::new("cap", Decimal::from(50)))
        .await
        .unwrap();

    let totals = t.cart.totals().await;
    assert_eq!(totals.item_count, 3);
    assert_eq!(totals.subtotal, Decimal::from(250));
    assert_eq!(totals.total, totals.subtotal);
    assert!(!totals.is_empty);

    t.cart.clear_cart().await;
    let totals = t.cart.totals().await;
    assert_eq!(totals.item_count, 0);
    assert_eq!(totals.subtotal, Decimal::ZERO);
    assert!(totals.is_empty);
}
