//! DUKICKS Core - Shared types library.
//!
//! This crate provides the domain types used by the storefront library and
//! its tests:
//! - cart line items, snapshots and derived totals
//! - type-safe product, user and size identifiers
//! - the authentication principal the cart reacts to
//!
//! # Architecture
//!
//! The core crate contains only types and pure cart arithmetic - no I/O, no
//! database access, no storage backends. Persistence and identity
//! reconciliation live in `dukicks-storefront`.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, quantities, prices, and carts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
