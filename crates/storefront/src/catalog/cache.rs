//! Cache types for catalog queries.

use super::Product;

/// Cache key for catalog queries.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    AllProducts,
    Product(String),
    Category(String),
    Featured,
    New,
}

impl CacheKey {
    /// String form used as the `moka` key.
    #[must_use]
    pub fn as_key(&self) -> String {
        match self {
            Self::AllProducts => "products:all".to_string(),
            Self::Product(id) => format!("product:{id}"),
            Self::Category(category) => format!("category:{category}"),
            Self::Featured => "products:featured".to_string(),
            Self::New => "products:new".to_string(),
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    /// `None` records a lookup that found nothing.
    Product(Option<Box<Product>>),
    Products(Vec<Product>),
}
