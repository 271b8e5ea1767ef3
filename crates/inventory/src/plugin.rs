//! The inventory plugin: order lifecycle hooks over the stock ledger.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use atelier_catalog::{Product, ProductId};
use atelier_core::TenantId;
use atelier_orders::Order;
use atelier_plugins::{Criticality, HookResult, Plugin};

use crate::error::InventoryError;
use crate::policy::{InventoryPolicy, StockLevel};
use crate::store::{StockDemand, StockStore};

/// Registry name of the inventory plugin.
pub const INVENTORY_PLUGIN_NAME: &str = "inventory";

/// Inventory extension: deducts stock when orders are created, restores it
/// when they are cancelled, and answers stock queries for the route layer.
///
/// Registered as a `Critical` plugin — an oversell rejection must abort
/// order creation, not vanish into a log line.
///
/// Deduction is validate-all-then-apply-all: every order line is checked
/// against the policy before any line is written, and the ledger re-checks
/// feasibility inside its own transaction, so an order that fails one line
/// deducts nothing at all.
pub struct InventoryPlugin<S> {
    store: S,
    policy: InventoryPolicy,
}

impl<S: StockStore> InventoryPlugin<S> {
    pub fn new(store: S, policy: InventoryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &InventoryPolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether `requested` units of a product could be deducted right now.
    pub fn check_stock(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        requested: i64,
    ) -> Result<bool, InventoryError> {
        let product = self.store.get(tenant_id, product_id)?;
        Ok(self.policy.can_deduct(product.quantity(), requested))
    }

    /// Products at or below the low-stock threshold (but above zero).
    pub fn low_stock_products(&self, tenant_id: TenantId) -> Result<Vec<Product>, InventoryError> {
        Ok(self
            .store
            .list(tenant_id)?
            .into_iter()
            .filter(|p| self.policy.classify(p.quantity()) == StockLevel::Low)
            .collect())
    }

    /// Products with no stock left.
    pub fn out_of_stock_products(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<Product>, InventoryError> {
        Ok(self
            .store
            .list(tenant_id)?
            .into_iter()
            .filter(|p| self.policy.classify(p.quantity()) == StockLevel::Out)
            .collect())
    }

    /// Manual (admin) stock adjustment, clamp-at-zero.
    ///
    /// The reason is recorded in the log stream only; there is no durable
    /// audit table.
    pub fn adjust_stock(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        delta: i64,
        reason: &str,
    ) -> Result<Product, InventoryError> {
        let product = self.store.adjust(tenant_id, product_id, delta)?;
        info!(
            product = %product_id,
            delta,
            reason,
            new_quantity = product.quantity(),
            "manual stock adjustment applied"
        );
        self.log_stock_level(&product);
        Ok(product)
    }

    fn deduct_for_order(&self, order: &Order) -> Result<(), InventoryError> {
        let tenant_id = order.tenant_id();

        // Pre-validate every line so a rejection names the offending
        // product before anything is written.
        let mut demands = Vec::with_capacity(order.items().len());
        for item in order.items() {
            let product = self.store.get(tenant_id, item.product_id)?;
            if !self.policy.can_deduct(product.quantity(), item.quantity) {
                return Err(InventoryError::InsufficientStock {
                    name: product.name().to_string(),
                    available: product.quantity(),
                    requested: item.quantity,
                });
            }
            demands.push(StockDemand {
                product_id: item.product_id,
                quantity: item.quantity,
            });
        }

        // The ledger re-checks feasibility under its own lock, which closes
        // the window between the reads above and the writes here.
        let updated = self
            .store
            .deduct_all(tenant_id, &demands, self.policy.prevent_overselling)?;

        info!(
            order_number = order.order_number(),
            lines = updated.len(),
            "stock deducted for order"
        );
        for product in &updated {
            self.log_stock_level(product);
        }
        Ok(())
    }

    fn restore_for_order(&self, order: &Order) -> Result<(), InventoryError> {
        let tenant_id = order.tenant_id();
        for item in order.items() {
            let product = self
                .store
                .restore(tenant_id, item.product_id, item.quantity)?;
            debug!(
                order_number = order.order_number(),
                product = %item.product_id,
                restored = item.quantity,
                new_quantity = product.quantity(),
                "stock restored from cancelled order"
            );
        }
        info!(
            order_number = order.order_number(),
            lines = order.items().len(),
            "stock restored for cancelled order"
        );
        Ok(())
    }

    fn log_stock_level(&self, product: &Product) {
        match self.policy.classify(product.quantity()) {
            StockLevel::Out => {
                warn!(
                    product = %product.id_typed(),
                    sku = product.sku(),
                    "product is out of stock"
                );
            }
            StockLevel::Low if self.policy.notify_on_low_stock => {
                warn!(
                    product = %product.id_typed(),
                    sku = product.sku(),
                    quantity = product.quantity(),
                    threshold = self.policy.low_stock_threshold,
                    "product stock is low"
                );
            }
            _ => {}
        }
    }
}

#[async_trait]
impl<S: StockStore> Plugin for InventoryPlugin<S> {
    fn name(&self) -> &str {
        INVENTORY_PLUGIN_NAME
    }

    fn criticality(&self) -> Criticality {
        Criticality::Critical
    }

    async fn initialize(&self) -> HookResult {
        info!(
            enabled = self.policy.enabled,
            low_stock_threshold = self.policy.low_stock_threshold,
            prevent_overselling = self.policy.prevent_overselling,
            notify_on_low_stock = self.policy.notify_on_low_stock,
            "inventory plugin initialized"
        );
        Ok(())
    }

    async fn on_order_created(&self, order: &Order) -> HookResult {
        if !self.policy.enabled {
            debug!(
                order_number = order.order_number(),
                "inventory plugin disabled; order create ignored"
            );
            return Ok(());
        }
        self.deduct_for_order(order)?;
        Ok(())
    }

    async fn on_order_cancelled(&self, order: &Order) -> HookResult {
        if !self.policy.enabled {
            debug!(
                order_number = order.order_number(),
                "inventory plugin disabled; order cancel ignored"
            );
            return Ok(());
        }
        self.restore_for_order(order)?;
        Ok(())
    }
}
