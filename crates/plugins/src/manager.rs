//! Plugin registry + hook dispatcher.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use atelier_orders::Order;

use crate::plugin::{Criticality, HookError, OrderHook, Plugin};

/// Default bound on a single hook invocation.
const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Dispatch failure surfaced to the caller.
///
/// Only failures of `Critical` plugins reach this type; best-effort
/// failures are logged and swallowed inside the dispatch loop.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("critical plugin '{plugin}' failed during {hook}: {cause}")]
    CriticalHookFailed {
        plugin: String,
        hook: &'static str,
        cause: HookError,
    },

    #[error("critical plugin '{plugin}' timed out during {hook} after {timeout:?}")]
    CriticalHookTimeout {
        plugin: String,
        hook: &'static str,
        timeout: Duration,
    },
}

impl DispatchError {
    /// The underlying hook error, when the failure was not a timeout.
    pub fn hook_error(&self) -> Option<&HookError> {
        match self {
            DispatchError::CriticalHookFailed { cause, .. } => Some(cause),
            DispatchError::CriticalHookTimeout { .. } => None,
        }
    }
}

/// Runtime registry entry for one plugin. Never persisted.
///
/// Lifecycle per plugin: Unregistered → Registered → Initialized. A plugin
/// whose `initialize` fails stays in Registered (no retry).
pub struct PluginRegistration {
    plugin: Arc<dyn Plugin>,
    enabled: bool,
    initialized: bool,
}

impl PluginRegistration {
    pub fn name(&self) -> &str {
        self.plugin.name()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }
}

impl core::fmt::Debug for PluginRegistration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PluginRegistration")
            .field("name", &self.plugin.name())
            .field("enabled", &self.enabled)
            .field("initialized", &self.initialized)
            .finish()
    }
}

/// Owns the set of registered plugins and fans order lifecycle events out
/// to all of them.
///
/// Construct one at process startup, register plugins, run
/// [`initialize_all`](Self::initialize_all), then share it immutably
/// (`Arc<PluginManager>`). Registration and initialization take `&mut
/// self`, so the set of plugins is fixed once the manager is shared.
///
/// Dispatch guarantees:
/// - plugins run **sequentially in registration order**, each awaited
///   before the next — deterministic ordering, no parallelism;
/// - each invocation is bounded by the per-hook timeout, so one stalled
///   plugin cannot hang order creation indefinitely;
/// - a plugin failure never stops dispatch to the remaining plugins and
///   never rolls back effects already applied by earlier plugins;
/// - after the full pass, the first failure of a `Critical` plugin is
///   returned to the caller; best-effort failures are only logged.
pub struct PluginManager {
    registrations: Vec<PluginRegistration>,
    initialized: bool,
    hook_timeout: Duration,
}

impl PluginManager {
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
            initialized: false,
            hook_timeout: DEFAULT_HOOK_TIMEOUT,
        }
    }

    /// Override the per-hook timeout (applies to initialization too).
    pub fn with_hook_timeout(mut self, hook_timeout: Duration) -> Self {
        self.hook_timeout = hook_timeout;
        self
    }

    /// Add a plugin to the registry, keyed by its unique name.
    ///
    /// A duplicate name is logged and ignored — registration is not fatal
    /// for the process just because two plugins collide.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        if self
            .registrations
            .iter()
            .any(|r| r.plugin.name() == plugin.name())
        {
            warn!(plugin = plugin.name(), "duplicate plugin registration ignored");
            return;
        }

        info!(plugin = plugin.name(), "plugin registered");
        self.registrations.push(PluginRegistration {
            plugin,
            enabled: true,
            initialized: false,
        });
    }

    /// Enable or disable a registration. Disabled plugins are skipped by
    /// dispatch. Returns false when no plugin has that name.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.registrations.iter_mut().find(|r| r.plugin.name() == name) {
            Some(reg) => {
                reg.enabled = enabled;
                info!(plugin = name, enabled, "plugin enabled flag changed");
                true
            }
            None => {
                warn!(plugin = name, "cannot change enabled flag: plugin not registered");
                false
            }
        }
    }

    /// Registry contents, in registration order.
    pub fn registrations(&self) -> &[PluginRegistration] {
        &self.registrations
    }

    /// Run every plugin's `initialize` hook, sequentially, in registration
    /// order.
    ///
    /// Per-plugin failure (error or timeout) is caught and logged; the
    /// failed plugin stays registered-but-uninitialized, with no retry, and
    /// later plugins still initialize. Idempotent: a repeat call warns and
    /// does nothing.
    pub async fn initialize_all(&mut self) {
        if self.initialized {
            warn!("plugin initialization already ran; repeat call ignored");
            return;
        }
        self.initialized = true;

        for reg in &mut self.registrations {
            let name = reg.plugin.name().to_string();
            match timeout(self.hook_timeout, reg.plugin.initialize()).await {
                Ok(Ok(())) => {
                    reg.initialized = true;
                    info!(plugin = %name, "plugin initialized");
                }
                Ok(Err(e)) => {
                    error!(
                        plugin = %name,
                        error = %e,
                        "plugin initialization failed; plugin left uninitialized"
                    );
                }
                Err(_) => {
                    error!(
                        plugin = %name,
                        timeout = ?self.hook_timeout,
                        "plugin initialization timed out; plugin left uninitialized"
                    );
                }
            }
        }
    }

    /// Dispatch an order lifecycle hook to every enabled plugin.
    ///
    /// Failures of best-effort plugins are swallowed here; the first
    /// critical failure is returned after every plugin has been given its
    /// turn, so a critical error never starves the plugins registered
    /// after the failing one.
    pub async fn trigger(&self, hook: OrderHook, order: &Order) -> Result<(), DispatchError> {
        let mut first_critical: Option<DispatchError> = None;

        for reg in &self.registrations {
            let name = reg.plugin.name();
            if !reg.enabled {
                debug!(plugin = name, hook = hook.name(), "plugin disabled; skipped");
                continue;
            }

            let invocation = match hook {
                OrderHook::Created => reg.plugin.on_order_created(order),
                OrderHook::Cancelled => reg.plugin.on_order_cancelled(order),
            };

            match timeout(self.hook_timeout, invocation).await {
                Ok(Ok(())) => {
                    debug!(plugin = name, hook = hook.name(), "hook completed");
                }
                Ok(Err(e)) => {
                    warn!(
                        plugin = name,
                        hook = hook.name(),
                        error = %e,
                        "hook dispatch failed; continuing with remaining plugins"
                    );
                    if reg.plugin.criticality() == Criticality::Critical
                        && first_critical.is_none()
                    {
                        first_critical = Some(DispatchError::CriticalHookFailed {
                            plugin: name.to_string(),
                            hook: hook.name(),
                            cause: e,
                        });
                    }
                }
                Err(_) => {
                    warn!(
                        plugin = name,
                        hook = hook.name(),
                        timeout = ?self.hook_timeout,
                        "hook dispatch timed out; continuing with remaining plugins"
                    );
                    if reg.plugin.criticality() == Criticality::Critical
                        && first_critical.is_none()
                    {
                        first_critical = Some(DispatchError::CriticalHookTimeout {
                            plugin: name.to_string(),
                            hook: hook.name(),
                            timeout: self.hook_timeout,
                        });
                    }
                }
            }
        }

        match first_critical {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use atelier_catalog::ProductId;
    use atelier_core::{EntityId, TenantId};
    use atelier_orders::{OrderId, OrderItem};

    use crate::plugin::HookResult;

    struct RecordingPlugin {
        name: String,
        criticality: Criticality,
        fail_init: bool,
        fail_hooks: bool,
        hook_delay: Option<Duration>,
        init_count: AtomicUsize,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingPlugin {
        fn new(name: &str, calls: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name: name.to_string(),
                criticality: Criticality::BestEffort,
                fail_init: false,
                fail_hooks: false,
                hook_delay: None,
                init_count: AtomicUsize::new(0),
                calls,
            }
        }

        fn critical(mut self) -> Self {
            self.criticality = Criticality::Critical;
            self
        }

        fn failing_init(mut self) -> Self {
            self.fail_init = true;
            self
        }

        fn failing_hooks(mut self) -> Self {
            self.fail_hooks = true;
            self
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.hook_delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl Plugin for RecordingPlugin {
        fn name(&self) -> &str {
            &self.name
        }

        fn criticality(&self) -> Criticality {
            self.criticality
        }

        async fn initialize(&self) -> HookResult {
            self.init_count.fetch_add(1, Ordering::SeqCst);
            if self.fail_init {
                anyhow::bail!("init exploded");
            }
            Ok(())
        }

        async fn on_order_created(&self, _order: &Order) -> HookResult {
            if let Some(delay) = self.hook_delay {
                tokio::time::sleep(delay).await;
            }
            self.calls.lock().unwrap().push(self.name.clone());
            if self.fail_hooks {
                anyhow::bail!("hook exploded");
            }
            Ok(())
        }

        async fn on_order_cancelled(&self, _order: &Order) -> HookResult {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}:cancel", self.name));
            Ok(())
        }
    }

    fn test_order() -> Order {
        Order::place(
            OrderId::new(EntityId::new()),
            TenantId::new(),
            "ORD-100001",
            vec![OrderItem {
                product_id: ProductId::new(EntityId::new()),
                quantity: 1,
                unit_price: 100,
            }],
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_registration_is_ignored() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut manager = PluginManager::new();
        manager.register(Arc::new(RecordingPlugin::new("inventory", calls.clone())));
        manager.register(Arc::new(RecordingPlugin::new("inventory", calls.clone())));

        assert_eq!(manager.registrations().len(), 1);

        // The surviving registration is the first one; dispatch reaches it once.
        manager.trigger(OrderHook::Created, &test_order()).await.unwrap();
        assert_eq!(*calls.lock().unwrap(), ["inventory"]);
    }

    #[tokio::test]
    async fn initialize_all_is_idempotent() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let plugin = Arc::new(RecordingPlugin::new("inventory", calls));
        let mut manager = PluginManager::new();
        manager.register(plugin.clone());

        manager.initialize_all().await;
        manager.initialize_all().await;

        assert_eq!(plugin.init_count.load(Ordering::SeqCst), 1);
        assert!(manager.registrations()[0].initialized());
    }

    #[tokio::test]
    async fn failed_initialization_does_not_abort_later_plugins() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let broken = Arc::new(RecordingPlugin::new("broken", calls.clone()).failing_init());
        let healthy = Arc::new(RecordingPlugin::new("healthy", calls));

        let mut manager = PluginManager::new();
        manager.register(broken.clone());
        manager.register(healthy.clone());
        manager.initialize_all().await;

        assert_eq!(healthy.init_count.load(Ordering::SeqCst), 1);
        assert!(!manager.registrations()[0].initialized());
        assert!(manager.registrations()[1].initialized());

        // No retry on a later (ignored) initialize_all call.
        manager.initialize_all().await;
        assert_eq!(broken.init_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dispatch_continues_past_failing_plugin() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut manager = PluginManager::new();
        manager.register(Arc::new(
            RecordingPlugin::new("first", calls.clone()).failing_hooks(),
        ));
        manager.register(Arc::new(RecordingPlugin::new("second", calls.clone())));

        // Both best-effort: the failure is swallowed and both plugins ran.
        manager.trigger(OrderHook::Created, &test_order()).await.unwrap();
        assert_eq!(*calls.lock().unwrap(), ["first", "second"]);
    }

    #[tokio::test]
    async fn critical_failure_propagates_after_full_pass() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut manager = PluginManager::new();
        manager.register(Arc::new(
            RecordingPlugin::new("inventory", calls.clone())
                .critical()
                .failing_hooks(),
        ));
        manager.register(Arc::new(RecordingPlugin::new("analytics", calls.clone())));

        let err = manager
            .trigger(OrderHook::Created, &test_order())
            .await
            .unwrap_err();

        match err {
            DispatchError::CriticalHookFailed { plugin, hook, .. } => {
                assert_eq!(plugin, "inventory");
                assert_eq!(hook, "on_order_created");
            }
            _ => panic!("Expected CriticalHookFailed"),
        }

        // The plugin after the critical failure still got its turn.
        assert_eq!(*calls.lock().unwrap(), ["inventory", "analytics"]);
    }

    #[tokio::test]
    async fn disabled_plugin_is_skipped() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut manager = PluginManager::new();
        manager.register(Arc::new(RecordingPlugin::new("first", calls.clone())));
        manager.register(Arc::new(RecordingPlugin::new("second", calls.clone())));
        assert!(manager.set_enabled("first", false));

        manager.trigger(OrderHook::Created, &test_order()).await.unwrap();
        assert_eq!(*calls.lock().unwrap(), ["second"]);

        assert!(!manager.set_enabled("ghost", false));
    }

    #[tokio::test]
    async fn dispatch_runs_in_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut manager = PluginManager::new();
        for name in ["a", "b", "c"] {
            manager.register(Arc::new(RecordingPlugin::new(name, calls.clone())));
        }

        manager.trigger(OrderHook::Created, &test_order()).await.unwrap();
        assert_eq!(*calls.lock().unwrap(), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn cancel_hook_reaches_plugins() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut manager = PluginManager::new();
        manager.register(Arc::new(RecordingPlugin::new("inventory", calls.clone())));

        manager
            .trigger(OrderHook::Cancelled, &test_order())
            .await
            .unwrap();
        assert_eq!(*calls.lock().unwrap(), ["inventory:cancel"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_critical_plugin_times_out() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut manager =
            PluginManager::new().with_hook_timeout(Duration::from_millis(50));
        manager.register(Arc::new(
            RecordingPlugin::new("stalled", calls.clone())
                .critical()
                .slow(Duration::from_secs(60)),
        ));
        manager.register(Arc::new(RecordingPlugin::new("after", calls.clone())));

        let err = manager
            .trigger(OrderHook::Created, &test_order())
            .await
            .unwrap_err();

        match err {
            DispatchError::CriticalHookTimeout { plugin, .. } => {
                assert_eq!(plugin, "stalled")
            }
            _ => panic!("Expected CriticalHookTimeout"),
        }

        // The stalled plugin never recorded a call; the next one still ran.
        assert_eq!(*calls.lock().unwrap(), ["after"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_best_effort_plugin_is_swallowed() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut manager =
            PluginManager::new().with_hook_timeout(Duration::from_millis(50));
        manager.register(Arc::new(
            RecordingPlugin::new("stalled", calls.clone()).slow(Duration::from_secs(60)),
        ));
        manager.register(Arc::new(RecordingPlugin::new("after", calls.clone())));

        manager.trigger(OrderHook::Created, &test_order()).await.unwrap();
        assert_eq!(*calls.lock().unwrap(), ["after"]);
    }
}
