//! Inventory error model.

use thiserror::Error;

use atelier_catalog::ProductId;

/// Failure raised by a stock ledger implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockStoreError {
    /// The referenced product has no ledger entry.
    #[error("product not found: {0}")]
    NotFound(ProductId),

    /// Oversell prevention rejected a deduction batch. The whole batch is
    /// aborted; no line was applied.
    #[error("insufficient stock for \"{name}\": requested {requested}, available {available}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Internal lock poisoning (a writer panicked mid-update).
    #[error("stock store lock poisoned")]
    Poisoned,
}

/// Inventory-level failure surfaced to hook dispatch and the route layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// Oversell prevention triggered for one order line; the entire order
    /// is rejected, not partially fulfilled.
    #[error("insufficient stock for \"{name}\": requested {requested}, available {available}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    #[error("stock store failure: {0}")]
    Store(String),
}

impl From<StockStoreError> for InventoryError {
    fn from(value: StockStoreError) -> Self {
        match value {
            StockStoreError::NotFound(id) => InventoryError::ProductNotFound(id),
            StockStoreError::InsufficientStock {
                name,
                available,
                requested,
            } => InventoryError::InsufficientStock {
                name,
                available,
                requested,
            },
            StockStoreError::Poisoned => {
                InventoryError::Store("stock store lock poisoned".to_string())
            }
        }
    }
}
