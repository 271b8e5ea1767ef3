//! Stock ledger abstraction.

use atelier_catalog::{Product, ProductId};
use atelier_core::TenantId;

use crate::error::StockStoreError;

/// One order line's demand against the ledger.
///
/// Quantities are positive; order validation upstream guarantees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDemand {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Stock ledger accessor: atomic read-modify-write of product quantities.
///
/// Every mutation maintains `in_stock == (quantity > 0)` in the same write
/// (the one exception being [`restore`](Self::restore), whose contract
/// forces the flag). Implementations own whatever concurrency control they
/// need; `deduct_all` is the transactional seam — its feasibility check
/// and its writes must happen atomically, so two concurrent orders racing
/// for the last unit cannot both pass the check.
pub trait StockStore: Send + Sync {
    /// Fetch a product's ledger entry. `NotFound` when absent.
    fn get(&self, tenant_id: TenantId, product_id: ProductId) -> Result<Product, StockStoreError>;

    /// Insert or replace a ledger entry (admin CRUD and seeding).
    fn upsert(&self, product: Product) -> Result<(), StockStoreError>;

    /// Apply a signed delta to one product: `new = max(0, current + delta)`.
    ///
    /// Always clamps at zero — negative stock is never persisted even when
    /// the request that caused it was rejected upstream. Returns the
    /// updated product.
    fn adjust(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        delta: i64,
    ) -> Result<Product, StockStoreError>;

    /// Restore stock from a cancelled order item: additive increment,
    /// `in_stock` forced true (last-write-wins, no reconciliation).
    fn restore(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Product, StockStoreError>;

    /// Deduct a whole order's demands as one unit.
    ///
    /// All demands are validated against the ledger before any is applied:
    /// with `prevent_overselling`, an infeasible line aborts the entire
    /// batch with `InsufficientStock` and nothing is written; without it,
    /// every line applies and clamps at zero. Duplicate product ids in the
    /// batch are accounted cumulatively. Returns the updated products in
    /// demand order.
    fn deduct_all(
        &self,
        tenant_id: TenantId,
        demands: &[StockDemand],
        prevent_overselling: bool,
    ) -> Result<Vec<Product>, StockStoreError>;

    /// All ledger entries for a tenant, ordered by SKU.
    fn list(&self, tenant_id: TenantId) -> Result<Vec<Product>, StockStoreError>;
}

impl<S> StockStore for std::sync::Arc<S>
where
    S: StockStore + ?Sized,
{
    fn get(&self, tenant_id: TenantId, product_id: ProductId) -> Result<Product, StockStoreError> {
        (**self).get(tenant_id, product_id)
    }

    fn upsert(&self, product: Product) -> Result<(), StockStoreError> {
        (**self).upsert(product)
    }

    fn adjust(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        delta: i64,
    ) -> Result<Product, StockStoreError> {
        (**self).adjust(tenant_id, product_id, delta)
    }

    fn restore(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Product, StockStoreError> {
        (**self).restore(tenant_id, product_id, quantity)
    }

    fn deduct_all(
        &self,
        tenant_id: TenantId,
        demands: &[StockDemand],
        prevent_overselling: bool,
    ) -> Result<Vec<Product>, StockStoreError> {
        (**self).deduct_all(tenant_id, demands, prevent_overselling)
    }

    fn list(&self, tenant_id: TenantId) -> Result<Vec<Product>, StockStoreError> {
        (**self).list(tenant_id)
    }
}
