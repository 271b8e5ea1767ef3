//! Plugin hook dispatch for order lifecycle events.
//!
//! This crate provides the **extension seam** of the platform: optional
//! units of logic (inventory, notifications, analytics, ...) register with
//! a [`PluginManager`] and receive order lifecycle hooks. The manager is an
//! explicitly constructed registry — built and populated at process
//! startup, then shared behind an `Arc` — not a module-level singleton.
//!
//! Dispatch is sequential and awaited: plugins run in registration order,
//! one at a time, each bounded by a per-hook timeout. A misbehaving plugin
//! is isolated (its failure is caught and logged) and never prevents the
//! remaining plugins from running.

pub mod manager;
pub mod plugin;

pub use manager::{DispatchError, PluginManager, PluginRegistration};
pub use plugin::{Criticality, HookError, HookResult, OrderHook, Plugin};
