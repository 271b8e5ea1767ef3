use async_trait::async_trait;

use atelier_orders::Order;

/// Opaque error type plugin hooks may return.
///
/// Plugins are arbitrary extension code; their failures are reported, not
/// modeled. `anyhow::Error` keeps the seam open while still letting the
/// dispatcher (or a caller) downcast to a concrete error when it matters.
pub type HookError = anyhow::Error;

/// Result type for plugin hooks.
pub type HookResult = Result<(), HookError>;

/// How the dispatcher treats a plugin's failures.
///
/// Best-effort failures are swallowed-and-logged so an optional plugin can
/// never break the checkout path. Critical failures are surfaced to the
/// caller after the dispatch pass completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criticality {
    Critical,
    BestEffort,
}

/// A named order lifecycle extension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderHook {
    Created,
    Cancelled,
}

impl OrderHook {
    /// Stable hook name used in log records.
    pub fn name(self) -> &'static str {
        match self {
            OrderHook::Created => "on_order_created",
            OrderHook::Cancelled => "on_order_cancelled",
        }
    }
}

/// A registered unit of extension logic.
///
/// Hooks default to no-ops; a plugin opts into a hook by overriding the
/// corresponding method. Implementations must be safe to share across
/// tasks — the manager holds them behind `Arc` and dispatches `&self`.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique registry key. Duplicate names are rejected at registration.
    fn name(&self) -> &str;

    /// Failure handling class for this plugin's hooks.
    fn criticality(&self) -> Criticality {
        Criticality::BestEffort
    }

    /// One-time setup, run by [`PluginManager::initialize_all`].
    ///
    /// A failure here leaves the plugin registered but uninitialized; it is
    /// not retried.
    async fn initialize(&self) -> HookResult {
        Ok(())
    }

    /// Invoked once per successfully created order.
    async fn on_order_created(&self, order: &Order) -> HookResult {
        let _ = order;
        Ok(())
    }

    /// Invoked once per cancelled order.
    async fn on_order_cancelled(&self, order: &Order) -> HookResult {
        let _ = order;
        Ok(())
    }
}