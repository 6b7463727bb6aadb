//! Core types for the DUKICKS storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod identity;
pub mod price;

pub use cart::{CartSnapshot, CartTotals, LineItem, LineKey, Quantity, QuantityError, Size};
pub use id::*;
pub use identity::Identity;
pub use price::{CurrencyCode, Price};
