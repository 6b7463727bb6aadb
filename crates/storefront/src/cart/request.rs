//! Input for adding a product to the cart.

use dukicks_core::{LineItem, ProductId, Quantity, Size};
use rust_decimal::Decimal;

use super::CartError;

/// A request to add `quantity` units of a product (and size) to the cart.
///
/// Built with [`AddToCart::new`] and the chained setters. Inputs are
/// validated when the request is applied, not when it is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddToCart {
    pub product_id: String,
    pub size: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub name: Option<String>,
    pub image: Option<String>,
}

impl AddToCart {
    /// Add one unit of `product_id` at `unit_price`.
    pub fn new(product_id: impl Into<String>, unit_price: Decimal) -> Self {
        Self {
            product_id: product_id.into(),
            size: None,
            unit_price,
            quantity: 1,
            name: None,
            image: None,
        }
    }

    /// Select a size. Blank sizes are treated as "no size".
    #[must_use]
    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    /// Number of units to add.
    #[must_use]
    pub const fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Display name captured with the line.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Image URL captured with the line.
    #[must_use]
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Validate the request and build the line item to merge.
    ///
    /// The quantity is clamped to 99; merging then saturates the sum.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidArgument` for an empty product ID, a
    /// non-positive unit price, or a zero quantity.
    pub fn into_line_item(self) -> Result<LineItem, CartError> {
        let product_id = ProductId::parse(self.product_id)
            .map_err(|e| CartError::InvalidArgument(e.to_string()))?;

        let size = self
            .size
            .filter(|s| !s.trim().is_empty())
            .map(Size::parse)
            .transpose()
            .map_err(|e| CartError::InvalidArgument(e.to_string()))?;

        if self.unit_price <= Decimal::ZERO {
            return Err(CartError::InvalidArgument(format!(
                "unit price must be positive (got {})",
                self.unit_price
            )));
        }

        if self.quantity == 0 {
            return Err(CartError::InvalidArgument(
                "quantity to add must be at least 1".to_string(),
            ));
        }

        Ok(LineItem {
            product_id,
            size,
            unit_price: self.unit_price,
            quantity: Quantity::clamped(self.quantity),
            name: self.name,
            image: self.image,
        })
    }
}
