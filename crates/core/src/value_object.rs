//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values;
/// they have no identity of their own. An order line is the canonical
/// example here: once an order is placed, its lines are frozen facts.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
