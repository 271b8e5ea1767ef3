//! In-memory stock ledger for tests/dev.

use std::collections::HashMap;
use std::sync::RwLock;

use atelier_catalog::{Product, ProductId};
use atelier_core::TenantId;

use crate::error::StockStoreError;
use crate::store::{StockDemand, StockStore};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct LedgerKey {
    tenant_id: TenantId,
    product_id: ProductId,
}

/// In-memory stock ledger.
///
/// All mutations serialize behind one `RwLock`; `deduct_all` runs its
/// feasibility check and its writes inside a single write guard, which is
/// this store's transaction. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    products: RwLock<HashMap<LedgerKey, Product>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StockStore for InMemoryStockStore {
    fn get(&self, tenant_id: TenantId, product_id: ProductId) -> Result<Product, StockStoreError> {
        let products = self.products.read().map_err(|_| StockStoreError::Poisoned)?;
        products
            .get(&LedgerKey {
                tenant_id,
                product_id,
            })
            .cloned()
            .ok_or(StockStoreError::NotFound(product_id))
    }

    fn upsert(&self, product: Product) -> Result<(), StockStoreError> {
        let key = LedgerKey {
            tenant_id: product.tenant_id(),
            product_id: product.id_typed(),
        };
        let mut products = self.products.write().map_err(|_| StockStoreError::Poisoned)?;
        products.insert(key, product);
        Ok(())
    }

    fn adjust(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        delta: i64,
    ) -> Result<Product, StockStoreError> {
        let mut products = self.products.write().map_err(|_| StockStoreError::Poisoned)?;
        let product = products
            .get_mut(&LedgerKey {
                tenant_id,
                product_id,
            })
            .ok_or(StockStoreError::NotFound(product_id))?;

        product.apply_delta(delta);
        Ok(product.clone())
    }

    fn restore(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Product, StockStoreError> {
        let mut products = self.products.write().map_err(|_| StockStoreError::Poisoned)?;
        let product = products
            .get_mut(&LedgerKey {
                tenant_id,
                product_id,
            })
            .ok_or(StockStoreError::NotFound(product_id))?;

        product.restore(quantity);
        Ok(product.clone())
    }

    fn deduct_all(
        &self,
        tenant_id: TenantId,
        demands: &[StockDemand],
        prevent_overselling: bool,
    ) -> Result<Vec<Product>, StockStoreError> {
        let mut products = self.products.write().map_err(|_| StockStoreError::Poisoned)?;

        // Validate pass: project the post-deduction quantity per product so
        // duplicate product ids in one order are accounted cumulatively.
        let mut projected: HashMap<ProductId, i64> = HashMap::new();
        for demand in demands {
            let product = products
                .get(&LedgerKey {
                    tenant_id,
                    product_id: demand.product_id,
                })
                .ok_or(StockStoreError::NotFound(demand.product_id))?;

            let available = *projected
                .get(&demand.product_id)
                .unwrap_or(&product.quantity());

            if prevent_overselling && available - demand.quantity < 0 {
                return Err(StockStoreError::InsufficientStock {
                    name: product.name().to_string(),
                    available,
                    requested: demand.quantity,
                });
            }

            projected.insert(demand.product_id, (available - demand.quantity).max(0));
        }

        // Apply pass: every demand validated, still under the same guard.
        let mut updated = Vec::with_capacity(demands.len());
        for demand in demands {
            if let Some(product) = products.get_mut(&LedgerKey {
                tenant_id,
                product_id: demand.product_id,
            }) {
                product.apply_delta(-demand.quantity);
                updated.push(product.clone());
            }
        }

        Ok(updated)
    }

    fn list(&self, tenant_id: TenantId) -> Result<Vec<Product>, StockStoreError> {
        let products = self.products.read().map_err(|_| StockStoreError::Poisoned)?;
        let mut entries: Vec<Product> = products
            .iter()
            .filter(|(key, _)| key.tenant_id == tenant_id)
            .map(|(_, product)| product.clone())
            .collect();
        entries.sort_by(|a, b| a.sku().cmp(b.sku()));
        Ok(entries)
    }
}
