//! Deduction policy + stock level classification.

use serde::{Deserialize, Serialize};

/// Stock level classification, in priority order: out, then low, then ok.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    Ok,
    Low,
    Out,
}

/// Process-wide inventory policy.
///
/// Set once at plugin construction and immutable afterward; every hook
/// invocation reads it. There is no live-reconfiguration path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryPolicy {
    /// Master switch: when false, the plugin ignores order events entirely.
    pub enabled: bool,
    /// Quantity at or below which (but above zero) a product is flagged
    /// for restocking attention.
    pub low_stock_threshold: i64,
    /// Reject any deduction that would drive stock negative.
    pub prevent_overselling: bool,
    /// Emit a log record when a deduction leaves a product low.
    pub notify_on_low_stock: bool,
}

impl Default for InventoryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            low_stock_threshold: 10,
            prevent_overselling: true,
            notify_on_low_stock: true,
        }
    }
}

impl InventoryPolicy {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Negative thresholds clamp to zero (a threshold below "out" is
    /// meaningless).
    pub fn with_low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = threshold.max(0);
        self
    }

    pub fn with_prevent_overselling(mut self, prevent: bool) -> Self {
        self.prevent_overselling = prevent;
        self
    }

    pub fn with_notify_on_low_stock(mut self, notify: bool) -> Self {
        self.notify_on_low_stock = notify;
        self
    }

    /// Whether a deduction of `requested` from `available` is permitted.
    ///
    /// False only when oversell prevention is on and the deduction would
    /// go negative. With prevention off, deduction always proceeds (and the
    /// ledger clamps the result at zero).
    pub fn can_deduct(&self, available: i64, requested: i64) -> bool {
        !(self.prevent_overselling && available - requested < 0)
    }

    /// Classify a (post-operation) quantity.
    ///
    /// `Out` when `q <= 0`; `Low` when `0 < q <= low_stock_threshold`;
    /// otherwise `Ok`. Mutually exclusive, evaluated in that order — a
    /// quantity of zero is out, never low.
    pub fn classify(&self, quantity: i64) -> StockLevel {
        if quantity <= 0 {
            StockLevel::Out
        } else if quantity <= self.low_stock_threshold {
            StockLevel::Low
        } else {
            StockLevel::Ok
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_boundaries() {
        let policy = InventoryPolicy::default().with_low_stock_threshold(10);
        assert_eq!(policy.classify(0), StockLevel::Out);
        assert_eq!(policy.classify(-3), StockLevel::Out);
        assert_eq!(policy.classify(1), StockLevel::Low);
        assert_eq!(policy.classify(10), StockLevel::Low);
        assert_eq!(policy.classify(11), StockLevel::Ok);
    }

    #[test]
    fn zero_is_out_not_low() {
        let policy = InventoryPolicy::default().with_low_stock_threshold(10);
        assert_ne!(policy.classify(0), StockLevel::Low);
    }

    #[test]
    fn can_deduct_honors_oversell_prevention() {
        let policy = InventoryPolicy::default().with_prevent_overselling(true);
        assert!(policy.can_deduct(5, 5));
        assert!(!policy.can_deduct(5, 6));
    }

    #[test]
    fn can_deduct_always_allows_when_prevention_off() {
        let policy = InventoryPolicy::default().with_prevent_overselling(false);
        assert!(policy.can_deduct(0, 100));
    }

    #[test]
    fn negative_threshold_clamps_to_zero() {
        let policy = InventoryPolicy::default().with_low_stock_threshold(-5);
        assert_eq!(policy.low_stock_threshold, 0);
        // With a zero threshold nothing is ever "low".
        assert_eq!(policy.classify(1), StockLevel::Ok);
    }
}
