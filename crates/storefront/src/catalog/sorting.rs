//! Product sort strategies for listing pages.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

use super::Product;

/// How a product listing is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortStrategy {
    /// Cheapest first.
    #[default]
    PriceLow,
    /// Most expensive first.
    PriceHigh,
    /// Model name, A to Z.
    NameAsc,
    /// Model name, Z to A.
    NameDesc,
}

/// Error for an unrecognized sort key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort strategy: {0:?}")]
pub struct UnknownSortStrategy(pub String);

impl SortStrategy {
    /// Every strategy, in menu order.
    pub const ALL: [Self; 4] = [Self::PriceLow, Self::PriceHigh, Self::NameAsc, Self::NameDesc];

    /// Key used in URLs and forms.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
            Self::NameAsc => "name-asc",
            Self::NameDesc => "name-desc",
        }
    }

    /// Menu label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PriceLow => "Precio: Menor a Mayor",
            Self::PriceHigh => "Precio: Mayor a Menor",
            Self::NameAsc => "Nombre (A-Z)",
            Self::NameDesc => "Nombre (Z-A)",
        }
    }

    /// `(key, label)` pairs for a sort menu.
    #[must_use]
    pub fn options() -> Vec<(&'static str, &'static str)> {
        Self::ALL.iter().map(|s| (s.key(), s.label())).collect()
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::PriceLow => a.price.cmp(&b.price),
            Self::PriceHigh => b.price.cmp(&a.price),
            Self::NameAsc => compare_names(&a.model, &b.model),
            Self::NameDesc => compare_names(&b.model, &a.model),
        }
    }

    /// Return a sorted copy of `products`. Equal elements keep their order.
    #[must_use]
    pub fn sort(self, products: &[Product]) -> Vec<Product> {
        let mut sorted = products.to_vec();
        sorted.sort_by(|a, b| self.compare(a, b));
        sorted
    }
}

/// Case-insensitive comparison, falling back to the raw text for ties.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

impl FromStr for SortStrategy {
    type Err = UnknownSortStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.key() == s)
            .ok_or_else(|| UnknownSortStrategy(s.to_string()))
    }
}

impl fmt::Display for SortStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Sort `products` by the strategy named `key`.
///
/// An unknown key logs a warning and returns the products in their
/// original order.
#[must_use]
pub fn sort_products(products: &[Product], key: &str) -> Vec<Product> {
    match key.parse::<SortStrategy>() {
        Ok(strategy) => strategy.sort(products),
        Err(e) => {
            warn!(error = %e, "Leaving products unsorted");
            products.to_vec()
        }
    }
}

/// Label for the strategy named `key`.
#[must_use]
pub fn sort_label(key: &str) -> &'static str {
    key.parse::<SortStrategy>()
        .map_or("Ordenamiento desconocido", SortStrategy::label)
}
