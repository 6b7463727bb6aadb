//! DUKICKS storefront library.
//!
//! Embedded cart reconciliation engine plus read-only catalog access for
//! the DUKICKS sneaker storefront UI.
//!
//! # Architecture
//!
//! - [`cart`]: cart engine deciding between local and per-user remote storage
//! - [`storage`]: key-value and remote document persistence adapters
//! - [`identity`]: identity observer the cart follows across sign-in/out
//! - [`catalog`]: cached product queries, brand filters and sort menus
//! - [`state`]: wires everything together for the application root
//!
//! # Example
//!
//! ```rust,ignore
//! let config = StorefrontConfig::from_env()?;
//! let _sentry_guard = telemetry::init(&config);
//! let state = AppState::bootstrap(config).await?;
//!
//! state.add_product_to_cart("air-max-90", Some("27")).await?;
//! state.identity().sign_in(UserId::parse("uid_123")?);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod state;
pub mod storage;
pub mod telemetry;

pub use cart::{AddToCart, CartError, CartStore, PersistenceStatus, SyncState};
pub use config::StorefrontConfig;
pub use error::{Result, StorefrontError};
pub use identity::{IdentityObserver, IdentityProvider, Subscription};
pub use state::AppState;
