use serde::{Deserialize, Serialize};

use atelier_core::{DomainError, Entity, EntityId, TenantId};

/// Product identifier (tenant-scoped via `tenant_id` fields on records).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub EntityId);

impl ProductId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Entity: Product.
///
/// `in_stock` is derived state: it must equal `quantity > 0` after every
/// inventory-affecting operation. All mutators on this type maintain that
/// invariant; the one deliberate exception is [`Product::restore`], which
/// follows the cancellation contract and sets the flag unconditionally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    tenant_id: TenantId,
    sku: String,
    name: String,
    /// Price in smallest currency unit (e.g., cents).
    price: u64,
    quantity: i64,
    in_stock: bool,
}

impl Product {
    /// Create a product with zero stock.
    pub fn new(
        id: ProductId,
        tenant_id: TenantId,
        sku: impl Into<String>,
        name: impl Into<String>,
        price: u64,
    ) -> Result<Self, DomainError> {
        let sku = sku.into();
        let name = name.into();

        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if sku.trim().is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }

        Ok(Self {
            id,
            tenant_id,
            sku,
            name,
            price,
            quantity: 0,
            in_stock: false,
        })
    }

    /// Builder-style initial stock level (negative input clamps to zero).
    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.set_quantity(quantity);
        self
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn in_stock(&self) -> bool {
        self.in_stock
    }

    /// Overwrite the stock level, clamping at zero and re-deriving `in_stock`.
    pub fn set_quantity(&mut self, quantity: i64) {
        self.quantity = quantity.max(0);
        self.in_stock = self.quantity > 0;
    }

    /// Apply a signed stock delta: `new = max(0, current + delta)`.
    ///
    /// Negative stock is never persisted even when the request that caused
    /// it was rejected upstream. Returns the new quantity.
    pub fn apply_delta(&mut self, delta: i64) -> i64 {
        self.set_quantity(self.quantity + delta);
        self.quantity
    }

    /// Restore stock from a cancelled order item.
    ///
    /// Additive, and sets `in_stock = true` unconditionally (last-write-wins
    /// under concurrent cancellations, no reconciliation).
    pub fn restore(&mut self, quantity: i64) -> i64 {
        self.quantity += quantity.max(0);
        self.in_stock = true;
        self.quantity
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
