//! Checkout orchestration: the order-event producer.
//!
//! This is the code path the hook contract holds against: it validates the
//! cart lines, computes the total server-side (client-supplied prices are
//! never accepted — lines don't even carry one), persists the order, and
//! dispatches `OrderHook::Created` exactly once per successful creation.
//! A critical hook failure (oversell rejection) aborts the creation: the
//! persisted order is removed again and the failure is surfaced.
//!
//! Duplicate hook invocation is NOT defended against downstream — the
//! inventory plugin is not idempotent, and a double-fired hook
//! double-deducts. Firing exactly once is this module's responsibility.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use atelier_catalog::ProductId;
use atelier_core::{DomainError, EntityId, TenantId};
use atelier_inventory::{InventoryError, StockStore, StockStoreError};
use atelier_orders::{Order, OrderId, OrderItem};
use atelier_plugins::{DispatchError, OrderHook, PluginManager};

use crate::order_store::{OrderStore, OrderStoreError};

/// One validated cart line. Quantities only — unit prices come from the
/// catalog at checkout time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid cart line: {0}")]
    Validation(String),

    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// Oversell prevention rejected the order; nothing was deducted and
    /// the order was not kept.
    #[error("insufficient stock for \"{name}\": requested {requested}, available {available}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("stock store failure: {0}")]
    Stock(StockStoreError),

    #[error("order store failure: {0}")]
    Store(#[from] OrderStoreError),

    /// A critical plugin failed for a reason other than an inventory
    /// policy decision.
    #[error("order hook dispatch failed: {0}")]
    Hook(DispatchError),
}

/// Order creation/cancellation orchestration over injected stores and the
/// plugin registry.
pub struct CheckoutService<S, O> {
    stock: Arc<S>,
    orders: Arc<O>,
    plugins: Arc<PluginManager>,
}

impl<S, O> CheckoutService<S, O>
where
    S: StockStore,
    O: OrderStore,
{
    pub fn new(stock: Arc<S>, orders: Arc<O>, plugins: Arc<PluginManager>) -> Self {
        Self {
            stock,
            orders,
            plugins,
        }
    }

    /// Place an order from validated cart lines.
    ///
    /// Persists the order, then fires the creation hook exactly once. When
    /// a critical plugin rejects the order, the persisted record is
    /// removed again (compensation) so a policy violation aborts order
    /// persistence as a whole.
    pub async fn place_order(
        &self,
        tenant_id: TenantId,
        lines: &[CartLine],
    ) -> Result<Order, CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            if line.quantity <= 0 {
                return Err(CheckoutError::Validation(format!(
                    "quantity for product {} must be positive",
                    line.product_id
                )));
            }

            let product = self
                .stock
                .get(tenant_id, line.product_id)
                .map_err(|e| match e {
                    StockStoreError::NotFound(id) => CheckoutError::ProductNotFound(id),
                    other => CheckoutError::Stock(other),
                })?;

            // Unit price snapshot, taken from the catalog right now.
            items.push(OrderItem {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: product.price(),
            });
        }

        let order = Order::place(
            OrderId::new(EntityId::new()),
            tenant_id,
            next_order_number(),
            items,
            Utc::now(),
        )?;

        self.orders.insert(order.clone())?;
        info!(
            order_number = order.order_number(),
            total = order.total(),
            lines = order.items().len(),
            "order persisted; dispatching creation hook"
        );

        if let Err(dispatch_err) = self.plugins.trigger(OrderHook::Created, &order).await {
            warn!(
                order_number = order.order_number(),
                error = %dispatch_err,
                "order creation aborted by critical hook failure; compensating"
            );
            if let Err(remove_err) = self.orders.remove(tenant_id, order.id_typed()) {
                // The order record is now orphaned; this needs operator
                // attention, since retrying the removal has no caller.
                error!(
                    order_number = order.order_number(),
                    error = %remove_err,
                    "failed to remove order after critical hook failure"
                );
            }
            return Err(map_dispatch_error(dispatch_err));
        }

        Ok(order)
    }

    /// Cancel an order and release its stock.
    ///
    /// The domain state machine decides legality (pending/processing
    /// only); the cancellation hook fires exactly once, after the status
    /// change is persisted.
    pub async fn cancel_order(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
    ) -> Result<Order, CheckoutError> {
        let mut order = self.orders.get(tenant_id, order_id)?;
        order.cancel()?;
        self.orders.update(order.clone())?;
        info!(
            order_number = order.order_number(),
            "order cancelled; dispatching cancellation hook"
        );

        if let Err(dispatch_err) = self.plugins.trigger(OrderHook::Cancelled, &order).await {
            // The cancellation itself stands; the caller learns the
            // restock did not happen.
            warn!(
                order_number = order.order_number(),
                error = %dispatch_err,
                "cancellation hook failed after status change"
            );
            return Err(map_dispatch_error(dispatch_err));
        }

        Ok(order)
    }
}

/// Surface inventory policy decisions buried in a dispatch failure.
fn map_dispatch_error(err: DispatchError) -> CheckoutError {
    if let Some(inv) = err
        .hook_error()
        .and_then(|e| e.downcast_ref::<InventoryError>())
    {
        match inv {
            InventoryError::InsufficientStock {
                name,
                available,
                requested,
            } => {
                return CheckoutError::InsufficientStock {
                    name: name.clone(),
                    available: *available,
                    requested: *requested,
                };
            }
            InventoryError::ProductNotFound(id) => {
                return CheckoutError::ProductNotFound(*id);
            }
            InventoryError::Store(_) => {}
        }
    }
    CheckoutError::Hook(err)
}

/// Unique, human-readable order number.
///
/// The tail is the random section of a v7 uuid; the timestamp section is
/// dropped so two orders placed in the same millisecond cannot collide on
/// a shared prefix alone.
fn next_order_number() -> String {
    let uuid = Uuid::now_v7().simple().to_string();
    format!("ORD-{}", uuid[20..].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_are_prefixed_and_distinct() {
        let first = next_order_number();
        let second = next_order_number();
        assert!(first.starts_with("ORD-"));
        assert_eq!(first.len(), "ORD-".len() + 12);
        assert_ne!(first, second);
    }
}
