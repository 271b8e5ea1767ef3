use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_catalog::ProductId;
use atelier_core::{DomainError, Entity, EntityId, TenantId, ValueObject};

/// Order identifier (tenant-scoped via the `tenant_id` field on the record).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub EntityId);

impl OrderId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Order status lifecycle.
///
/// Forward path: pending → processing → shipped → delivered.
/// Cancellation branches off before shipment. Delivered and cancelled are
/// terminal: no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
        )
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Order line: product, quantity, unit price snapshot.
///
/// The unit price is captured at order time and never recomputed from the
/// current catalog price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents), frozen at order time.
    pub unit_price: u64,
}

impl ValueObject for OrderItem {}

/// Entity: Order.
///
/// Items are immutable once the order is placed; only the status moves,
/// and only along the edges `OrderStatus::can_transition_to` allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    tenant_id: TenantId,
    order_number: String,
    status: OrderStatus,
    /// Total in smallest currency unit, computed from the item snapshots.
    total: u64,
    items: Vec<OrderItem>,
    placed_at: DateTime<Utc>,
}

impl Order {
    /// Place a new order in `Pending` status.
    ///
    /// The total is computed here, from the snapshots — never accepted from
    /// the outside.
    pub fn place(
        id: OrderId,
        tenant_id: TenantId,
        order_number: impl Into<String>,
        items: Vec<OrderItem>,
        placed_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let order_number = order_number.into();

        if order_number.trim().is_empty() {
            return Err(DomainError::validation("order number cannot be empty"));
        }
        if items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }
        for item in &items {
            if item.quantity <= 0 {
                return Err(DomainError::validation("item quantity must be positive"));
            }
        }

        let total = Self::compute_total(&items)?;

        Ok(Self {
            id,
            tenant_id,
            order_number,
            status: OrderStatus::Pending,
            total,
            items,
            placed_at,
        })
    }

    fn compute_total(items: &[OrderItem]) -> Result<u64, DomainError> {
        items.iter().try_fold(0u64, |acc, item| {
            (item.quantity as u64)
                .checked_mul(item.unit_price)
                .and_then(|line| acc.checked_add(line))
                .ok_or_else(|| DomainError::validation("order total overflows"))
        })
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn placed_at(&self) -> DateTime<Utc> {
        self.placed_at
    }

    /// Whether the order may still be cancelled (not yet shipped).
    pub fn is_cancellable(&self) -> bool {
        self.status.can_transition_to(OrderStatus::Cancelled)
    }

    /// Move the order to `next`, rejecting illegal edges.
    pub fn transition(&mut self, next: OrderStatus) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::invariant(format!(
                "order in terminal status '{}' cannot change",
                self.status
            )));
        }
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "illegal order status transition '{}' -> '{}'",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Cancel the order (legal from pending and processing only).
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition(OrderStatus::Cancelled)
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
