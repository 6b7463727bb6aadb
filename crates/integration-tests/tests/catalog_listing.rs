//! Catalog queries, brand filters and sort menus, end to end through
//! `AppState`.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use dukicks_integration_tests::{key, product};
use dukicks_storefront::catalog::filters::brand_count;
use dukicks_storefront::catalog::sorting::sort_label;
use dukicks_storefront::catalog::{
    BrandFilter, CatalogError, Product, ProductFilter, SortStrategy, StaticCatalog,
    apply_filters, sort_products, unique_brands,
};
use dukicks_storefront::config::StorefrontConfig;
use dukicks_storefront::storage::{MemoryCartDocumentStore, MemoryKeyValueStore};
use dukicks_storefront::{AppState, StorefrontError};
use rust_decimal::Decimal;

fn products() -> Vec<Product> {
    let mut dunk = product("dunk-low", "Nike", "Dunk Low", 2299, 3);
    dunk.is_featured = true;
    dunk.discount = 20;

    let mut samba = product("samba-og", "Adidas", "Samba OG", 2199, 5);
    samba.is_new = true;
    samba.is_featured = true;

    let mut suede = product("suede", "Puma", "Suede Classic", 1599, 1);
    suede.category = "mujer".to_string();

    let mut pegasus = product("pegasus-41", "Nike", "Pegasus 41", 2899, 6);
    pegasus.is_new = true;

    let mut cap = product("jordan-cap", "Jordan", "cap", 599, 2);
    cap.sizes.clear();
    cap.product_type = "Gorra".to_string();

    vec![dunk, samba, suede, pegasus, cap]
}

fn state() -> AppState {
    AppState::new(
        StorefrontConfig::default(),
        Arc::new(MemoryKeyValueStore::new()),
        Arc::new(MemoryCartDocumentStore::new()),
        Arc::new(StaticCatalog::new(products())),
    )
}

fn ids(products: &[Product]) -> Vec<&str> {
    products.iter().map(|p| p.id.as_str()).collect()
}

#[tokio::test]
async fn test_catalog_queries() {
    let state = state();
    let catalog = state.catalog();

    let all = catalog.all_products().await.unwrap();
    assert_eq!(
        ids(&all),
        ["pegasus-41", "samba-og", "dunk-low", "jordan-cap", "suede"]
    );
    assert_eq!(ids(&catalog.new_products().await.unwrap()), ["pegasus-41", "samba-og"]);
    assert_eq!(ids(&catalog.featured_products().await.unwrap()), ["samba-og", "dunk-low"]);
    assert_eq!(catalog.products_by_category("mujer").await.unwrap().len(), 1);
    assert!(catalog.product_by_id("air-force-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_category_page_filters_and_sorts() {
    let state = state();
    let hombre = state.catalog().products_by_category("hombre").await.unwrap();

    assert_eq!(unique_brands(&hombre, true), ["Todas", "Adidas", "Jordan", "Nike"]);
    assert_eq!(brand_count(&hombre, &BrandFilter::from_selection("Nike")), 2);

    let nike = apply_filters(&hombre, &ProductFilter::brand(BrandFilter::from_selection("Nike")));
    assert_eq!(ids(&sort_products(&nike, "price-high")), ["pegasus-41", "dunk-low"]);

    let listing = state
        .catalog()
        .category_listing("hombre", &ProductFilter::default(), SortStrategy::NameAsc)
        .await
        .unwrap();
    assert_eq!(
        ids(&listing),
        ["jordan-cap", "dunk-low", "pegasus-41", "samba-og"]
    );

    // Unknown keys fall back to the input order.
    assert_eq!(ids(&sort_products(&hombre, "best-selling")), ids(&hombre));
    assert_eq!(sort_label("price-low"), "Precio: Menor a Mayor");
}

#[tokio::test]
async fn test_adding_catalog_products_to_cart() {
    let state = state();

    state
        .add_product_to_cart("dunk-low", Some("26"))
        .await
        .unwrap();
    state.add_product_to_cart("jordan-cap", None).await.unwrap();
    let snapshot = state
        .add_product_to_cart("dunk-low", Some("26"))
        .await
        .unwrap();

    let dunk = snapshot.get(&key("dunk-low", Some("26"))).unwrap();
    assert_eq!(dunk.quantity.get(), 2);
    assert_eq!(dunk.unit_price, Decimal::new(183_920, 2));
    assert_eq!(dunk.name.as_deref(), Some("Nike Dunk Low"));
    assert_eq!(
        state.cart().totals().await.subtotal,
        Decimal::new(183_920, 2) * Decimal::from(2) + Decimal::from(599)
    );

    assert!(matches!(
        state.add_product_to_cart("dunk-low", None).await,
        Err(StorefrontError::Catalog(CatalogError::SizeRequired(_)))
    ));
    assert!(matches!(
        state.add_product_to_cart("air-force-1", Some("26")).await,
        Err(StorefrontError::Catalog(CatalogError::NotFound(_)))
    ));
}
