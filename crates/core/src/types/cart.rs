//! Cart line items and snapshots.
//!
//! A [`CartSnapshot`] is the ordered list of [`LineItem`]s a shopper has
//! selected. At most one line item exists per [`LineKey`]; repeated adds to
//! the same key merge into the existing line instead of appending.
//!
//! The snapshot serializes as a bare JSON array so that it can be stored
//! as-is under a single key-value entry.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

crate::define_string_id!(Size);

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// The requested quantity falls outside `1..=99`.
    #[error("quantity must be between {min} and {max} (got {value})", min = Quantity::MIN, max = Quantity::MAX)]
    OutOfRange {
        /// The rejected value.
        value: u32,
    },
}

/// Quantity of a single line item.
///
/// ## Constraints
///
/// - Always in `1..=99`
/// - Arithmetic saturates at 99 instead of failing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u8);

impl Quantity {
    /// Smallest quantity a line item can hold.
    pub const MIN: u32 = 1;
    /// Largest quantity a line item can hold.
    pub const MAX: u32 = 99;

    /// A single unit.
    pub const ONE: Self = Self(1);

    /// Create a quantity, rejecting values outside `1..=99`.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::OutOfRange` for 0 or anything above 99.
    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            // In range, so the narrowing cannot fail.
            u8::try_from(value)
                .map(Self)
                .map_err(|_| QuantityError::OutOfRange { value })
        } else {
            Err(QuantityError::OutOfRange { value })
        }
    }

    /// Create a quantity, clamping into `1..=99`.
    #[must_use]
    pub fn clamped(value: u32) -> Self {
        let value = value.clamp(Self::MIN, Self::MAX);
        Self(u8::try_from(value).unwrap_or(u8::MAX))
    }

    /// Add `delta` units, saturating at 99.
    #[must_use]
    pub fn saturating_add(self, delta: u32) -> Self {
        Self::clamped(u32::from(self.0).saturating_add(delta))
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0 as u32
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity key of a line item: product plus optional size.
///
/// Sizeless products (caps, accessories) collapse to the product alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub product_id: ProductId,
    pub size: Option<Size>,
}

impl LineKey {
    /// Create a new key.
    #[must_use]
    pub const fn new(product_id: ProductId, size: Option<Size>) -> Self {
        Self { product_id, size }
    }

    /// Whether `item` belongs to this key.
    #[must_use]
    pub fn matches(&self, item: &LineItem) -> bool {
        item.product_id == self.product_id && item.size == self.size
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.size {
            Some(size) => write!(f, "{}/{size}", self.product_id),
            None => write!(f, "{}", self.product_id),
        }
    }
}

/// One product + size selection in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    /// Unit price captured when the item was added; never repriced.
    #[serde(deserialize_with = "non_negative_price")]
    pub unit_price: Decimal,
    pub quantity: Quantity,
    /// Display name (brand and model) captured at add time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Product image URL captured at add time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Reject negative stored prices so a tampered entry loads as corrupt.
fn non_negative_price<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let price = <Decimal as Deserialize>::deserialize(deserializer)?;
    if price < Decimal::ZERO {
        return Err(serde::de::Error::custom(format!(
            "unit price cannot be negative (got {price})"
        )));
    }
    Ok(price)
}

impl LineItem {
    /// The identity key of this line.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id.clone(), self.size.clone())
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity.get())
    }
}

/// Aggregates derived from a snapshot. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartTotals {
    /// Sum of quantities.
    pub item_count: u32,
    /// Sum of `unit_price × quantity`.
    pub subtotal: Decimal,
    /// Equal to `subtotal`; there is no tax or shipping model.
    pub total: Decimal,
    pub is_empty: bool,
}

/// The full ordered set of line items at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartSnapshot {
    items: Vec<LineItem>,
}

impl CartSnapshot {
    /// Create an empty snapshot.
    #[must_use]
    pub const fn empty() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a snapshot from stored items, merging any duplicate keys.
    ///
    /// Stored data written by this crate never contains duplicates, but a
    /// hand-edited or legacy entry might; the first occurrence keeps its
    /// position and later duplicates add to it.
    #[must_use]
    pub fn from_items(items: Vec<LineItem>) -> Self {
        let mut snapshot = Self::empty();
        for item in items {
            match snapshot.position(&item.key()) {
                Some(index) => {
                    if let Some(existing) = snapshot.items.get_mut(index) {
                        existing.quantity = existing.quantity.saturating_add(item.quantity.get());
                    }
                }
                None => snapshot.items.push(item),
            }
        }
        snapshot
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find the line for `key`.
    #[must_use]
    pub fn get(&self, key: &LineKey) -> Option<&LineItem> {
        self.items.iter().find(|item| key.matches(item))
    }

    fn position(&self, key: &LineKey) -> Option<usize> {
        self.items.iter().position(|item| key.matches(item))
    }

    /// Merge `item` into the cart.
    ///
    /// If a line with the same key exists its quantity grows by
    /// `item.quantity`, saturating at 99, and its captured price and metadata
    /// are kept. Otherwise `item` is appended.
    pub fn merge(&mut self, item: LineItem) -> &LineItem {
        let index = match self.position(&item.key()) {
            Some(index) => {
                if let Some(existing) = self.items.get_mut(index) {
                    existing.quantity = existing.quantity.saturating_add(item.quantity.get());
                }
                index
            }
            None => {
                self.items.push(item);
                self.items.len() - 1
            }
        };
        // `index` always points at a live element here.
        #[allow(clippy::indexing_slicing)]
        &self.items[index]
    }

    /// Replace the quantity of the line for `key`.
    ///
    /// Returns `false` if no such line exists.
    pub fn set_quantity(&mut self, key: &LineKey, quantity: Quantity) -> bool {
        match self.items.iter_mut().find(|item| key.matches(item)) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove the line for `key`, returning it if present.
    pub fn remove(&mut self, key: &LineKey) -> Option<LineItem> {
        self.position(key).map(|index| self.items.remove(index))
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Compute derived aggregates.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        let item_count = self.items.iter().map(|item| item.quantity.get()).sum();
        let subtotal = self.items.iter().map(LineItem::line_total).sum();
        CartTotals {
            item_count,
            subtotal,
            total: subtotal,
            is_empty: self.items.is_empty(),
        }
    }
}

impl From<Vec<LineItem>> for CartSnapshot {
    fn from(items: Vec<LineItem>) -> Self {
        Self::from_items(items)
    }
}
