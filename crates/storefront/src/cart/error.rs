//! Cart operation error types.

use dukicks_core::{Quantity, QuantityError};
use thiserror::Error;

/// Errors returned by cart operations.
///
/// Every variant is raised before the cart is mutated. Persistence failures
/// are not errors here: they are reported through
/// [`PersistenceStatus`](super::PersistenceStatus) and never undo a change.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Malformed operation input (missing product, non-positive price, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Requested quantity is outside `1..=99`.
    #[error("quantity {value} is out of range ({min}..={max})", min = Quantity::MIN, max = Quantity::MAX)]
    OutOfRange {
        /// The rejected quantity.
        value: u32,
    },

    /// The cart store's background tasks are gone.
    #[error("cart store has shut down")]
    Shutdown,
}

impl From<QuantityError> for CartError {
    fn from(err: QuantityError) -> Self {
        match err {
            QuantityError::OutOfRange { value } => Self::OutOfRange { value },
        }
    }
}
