//! Catalog domain module.
//!
//! This crate contains the product entity and its stock-level invariants,
//! implemented purely as deterministic domain logic (no IO, no HTTP,
//! no storage).

pub mod product;

pub use product::{Product, ProductId};
