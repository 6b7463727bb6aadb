//! Catalog product model.

use chrono::{DateTime, Utc};
use dukicks_core::{CurrencyCode, Price, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CatalogError;
use crate::cart::AddToCart;

/// Product type assigned when none is recorded.
pub const DEFAULT_PRODUCT_TYPE: &str = "Tenis";

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub brand: String,
    pub model: String,
    pub category: String,
    /// List price before discount.
    pub price: Decimal,
    /// Discount percentage, 0 to 100.
    #[serde(default)]
    pub discount: u8,
    #[serde(default)]
    pub description: String,
    pub image: String,
    #[serde(default)]
    pub images: Vec<String>,
    /// Sizes on offer, in display order. Empty for one-size products.
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(rename = "type", default = "default_product_type")]
    pub product_type: String,
    pub created_at: DateTime<Utc>,
}

fn default_product_type() -> String {
    DEFAULT_PRODUCT_TYPE.to_string()
}

impl Product {
    /// Display name, e.g. "Nike Air Max 90".
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.brand, self.model)
    }

    /// List price in `currency`.
    #[must_use]
    pub const fn list_price(&self, currency: CurrencyCode) -> Price {
        Price::new(self.price, currency)
    }

    /// Price after the product discount, rounded to cents.
    #[must_use]
    pub fn sale_price(&self, currency: CurrencyCode) -> Price {
        self.list_price(currency).discounted(self.discount)
    }

    /// Whether the product is on sale.
    #[must_use]
    pub const fn has_discount(&self) -> bool {
        self.discount > 0
    }

    /// Whether `size` is offered.
    #[must_use]
    pub fn offers_size(&self, size: &str) -> bool {
        self.sizes.iter().any(|s| s == size)
    }

    /// Build an add-to-cart request for one unit at the sale price.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::SizeRequired` if the product has sizes and none
    /// was given, or `CatalogError::InvalidSize` if `size` is not offered.
    pub fn to_cart_item(&self, size: Option<&str>) -> Result<AddToCart, CatalogError> {
        let size = size.map(str::trim).filter(|s| !s.is_empty());

        let request = AddToCart::new(self.id.as_str(), self.sale_price(CurrencyCode::default()).amount)
            .name(self.display_name())
            .image(self.image.clone());

        match size {
            Some(size) if self.offers_size(size) => Ok(request.size(size)),
            Some(size) => Err(CatalogError::InvalidSize {
                product_id: self.id.to_string(),
                size: size.to_string(),
            }),
            None if self.sizes.is_empty() => Ok(request),
            None => Err(CatalogError::SizeRequired(self.id.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fixtures {
    use chrono::TimeZone;

    use super::*;

    /// Build a product with sensible defaults.
    pub(crate) fn product(id: &str, brand: &str, model: &str, price: i64) -> Product {
        Product {
            id: ProductId::parse(id).unwrap(),
            brand: brand.to_string(),
            model: model.to_string(),
            category: "hombre".to_string(),
            price: Decimal::from(price),
            discount: 0,
            description: String::new(),
            image: format!("https://img.example/{id}.jpg"),
            images: Vec::new(),
            sizes: vec!["26".to_string(), "27".to_string()],
            is_new: false,
            is_featured: false,
            product_type: DEFAULT_PRODUCT_TYPE.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }
}
