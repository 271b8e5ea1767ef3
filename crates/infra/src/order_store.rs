//! Order persistence abstraction + in-memory implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use atelier_core::TenantId;
use atelier_orders::{Order, OrderId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderStoreError {
    #[error("order not found")]
    NotFound,

    /// Order numbers are unique per tenant; a collision is a caller bug.
    #[error("duplicate order number: {0}")]
    DuplicateOrderNumber(String),

    #[error("order store lock poisoned")]
    Poisoned,
}

/// Order persistence seam for the checkout path.
pub trait OrderStore: Send + Sync {
    /// Persist a new order. Rejects duplicate order numbers per tenant.
    fn insert(&self, order: Order) -> Result<(), OrderStoreError>;

    fn get(&self, tenant_id: TenantId, order_id: OrderId) -> Result<Order, OrderStoreError>;

    /// Replace an existing order record (status updates).
    fn update(&self, order: Order) -> Result<(), OrderStoreError>;

    /// Remove an order (compensation after a failed creation hook).
    fn remove(&self, tenant_id: TenantId, order_id: OrderId) -> Result<Order, OrderStoreError>;

    /// All orders for a tenant, newest first.
    fn list(&self, tenant_id: TenantId) -> Result<Vec<Order>, OrderStoreError>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct OrderKey {
    tenant_id: TenantId,
    order_id: OrderId,
}

/// In-memory order store. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderKey, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn insert(&self, order: Order) -> Result<(), OrderStoreError> {
        let mut orders = self.orders.write().map_err(|_| OrderStoreError::Poisoned)?;

        let tenant_id = order.tenant_id();
        if orders.values().any(|existing| {
            existing.tenant_id() == tenant_id && existing.order_number() == order.order_number()
        }) {
            return Err(OrderStoreError::DuplicateOrderNumber(
                order.order_number().to_string(),
            ));
        }

        orders.insert(
            OrderKey {
                tenant_id,
                order_id: order.id_typed(),
            },
            order,
        );
        Ok(())
    }

    fn get(&self, tenant_id: TenantId, order_id: OrderId) -> Result<Order, OrderStoreError> {
        let orders = self.orders.read().map_err(|_| OrderStoreError::Poisoned)?;
        orders
            .get(&OrderKey {
                tenant_id,
                order_id,
            })
            .cloned()
            .ok_or(OrderStoreError::NotFound)
    }

    fn update(&self, order: Order) -> Result<(), OrderStoreError> {
        let key = OrderKey {
            tenant_id: order.tenant_id(),
            order_id: order.id_typed(),
        };
        let mut orders = self.orders.write().map_err(|_| OrderStoreError::Poisoned)?;
        match orders.get_mut(&key) {
            Some(existing) => {
                *existing = order;
                Ok(())
            }
            None => Err(OrderStoreError::NotFound),
        }
    }

    fn remove(&self, tenant_id: TenantId, order_id: OrderId) -> Result<Order, OrderStoreError> {
        let mut orders = self.orders.write().map_err(|_| OrderStoreError::Poisoned)?;
        orders
            .remove(&OrderKey {
                tenant_id,
                order_id,
            })
            .ok_or(OrderStoreError::NotFound)
    }

    fn list(&self, tenant_id: TenantId) -> Result<Vec<Order>, OrderStoreError> {
        let orders = self.orders.read().map_err(|_| OrderStoreError::Poisoned)?;
        let mut entries: Vec<Order> = orders
            .iter()
            .filter(|(key, _)| key.tenant_id == tenant_id)
            .map(|(_, order)| order.clone())
            .collect();
        entries.sort_by(|a, b| b.placed_at().cmp(&a.placed_at()));
        Ok(entries)
    }
}

impl<O> OrderStore for std::sync::Arc<O>
where
    O: OrderStore + ?Sized,
{
    fn insert(&self, order: Order) -> Result<(), OrderStoreError> {
        (**self).insert(order)
    }

    fn get(&self, tenant_id: TenantId, order_id: OrderId) -> Result<Order, OrderStoreError> {
        (**self).get(tenant_id, order_id)
    }

    fn update(&self, order: Order) -> Result<(), OrderStoreError> {
        (**self).update(order)
    }

    fn remove(&self, tenant_id: TenantId, order_id: OrderId) -> Result<Order, OrderStoreError> {
        (**self).remove(tenant_id, order_id)
    }

    fn list(&self, tenant_id: TenantId) -> Result<Vec<Order>, OrderStoreError> {
        (**self).list(tenant_id)
    }
}
