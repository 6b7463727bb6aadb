//! Listing filters.

use std::collections::BTreeSet;

use super::Product;

/// Label of the entry that matches every brand.
pub const ALL_BRANDS: &str = "Todas";

/// Brand selection on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BrandFilter {
    #[default]
    All,
    Only(String),
}

impl BrandFilter {
    /// Parse a brand menu selection; the "all" label or a blank value
    /// selects every brand.
    #[must_use]
    pub fn from_selection(selection: &str) -> Self {
        let selection = selection.trim();
        if selection.is_empty() || selection == ALL_BRANDS {
            Self::All
        } else {
            Self::Only(selection.to_string())
        }
    }

    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            Self::All => true,
            Self::Only(brand) => product.brand == *brand,
        }
    }
}

/// Filters applied to a product listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductFilter {
    pub brand: BrandFilter,
}

impl ProductFilter {
    #[must_use]
    pub fn brand(brand: BrandFilter) -> Self {
        Self { brand }
    }

    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.brand.matches(product)
    }
}

/// Distinct brands in `products`, sorted. With `include_all`, the
/// [`ALL_BRANDS`] entry comes first.
#[must_use]
pub fn unique_brands(products: &[Product], include_all: bool) -> Vec<String> {
    let brands: BTreeSet<&str> = products
        .iter()
        .map(|p| p.brand.as_str())
        .filter(|b| !b.is_empty())
        .collect();

    include_all
        .then(|| ALL_BRANDS.to_string())
        .into_iter()
        .chain(brands.into_iter().map(str::to_string))
        .collect()
}

/// Products matching `filter`, in their original order.
#[must_use]
pub fn apply_filters(products: &[Product], filter: &ProductFilter) -> Vec<Product> {
    products
        .iter()
        .filter(|p| filter.matches(p))
        .cloned()
        .collect()
}

/// Number of products carrying the brand selected by `filter`.
#[must_use]
pub fn brand_count(products: &[Product], filter: &BrandFilter) -> usize {
    products.iter().filter(|p| filter.matches(p)).count()
}
