//! Dry-run cost model.
//!
//! The estimate is a fixed per-TiB rate applied to the bytes the warehouse
//! reports it would scan. It is not a live pricing lookup; the rate is
//! configuration.

use crate::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};

/// 2^40 bytes.
pub const BYTES_PER_TIB: f64 = 1_099_511_627_776.0;

/// On-demand price in currency units per TiB scanned.
pub const DEFAULT_COST_PER_TIB: f64 = 5.0;

/// Bytes a query would scan and what that would cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub bytes_processed: u64,
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    cost_per_tib: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            cost_per_tib: DEFAULT_COST_PER_TIB,
        }
    }
}

impl CostModel {
    pub fn new(cost_per_tib: f64) -> Result<Self> {
        if !cost_per_tib.is_finite() || cost_per_tib < 0.0 {
            return Err(AnalyticsError::Configuration(format!(
                "cost per TiB must be a finite, non-negative number (got {})",
                cost_per_tib
            )));
        }
        Ok(Self { cost_per_tib })
    }

    pub fn cost_per_tib(&self) -> f64 {
        self.cost_per_tib
    }

    /// `bytes / 2^40 * rate`
    pub fn cost_for(&self, bytes: u64) -> f64 {
        bytes as f64 / BYTES_PER_TIB * self.cost_per_tib
    }

    pub fn estimate(&self, bytes_processed: u64) -> CostEstimate {
        CostEstimate {
            bytes_processed,
            estimated_cost: self.cost_for(bytes_processed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_tib_costs_rate() {
        let model = CostModel::default();
        assert_eq!(model.cost_for(1 << 40), 5.0);
        assert_eq!(model.cost_for(0), 0.0);
    }

    #[test]
    fn test_exact_formula() {
        let model = CostModel::default();
        let bytes: u64 = 123_456_789_012;
        assert_eq!(
            model.cost_for(bytes),
            bytes as f64 / 1_099_511_627_776.0 * 5.0
        );
    }

    #[test]
    fn test_doubling_bytes_doubles_cost() {
        let model = CostModel::default();
        for bytes in [1u64, 10_485_760, 987_654_321, 3 << 40] {
            assert_eq!(model.cost_for(bytes * 2), 2.0 * model.cost_for(bytes));
        }
    }

    #[test]
    fn test_custom_rate() {
        let model = CostModel::new(6.25).unwrap();
        let estimate = model.estimate(1 << 39);
        assert_eq!(estimate.bytes_processed, 1 << 39);
        assert_eq!(estimate.estimated_cost, 3.125);
    }

    #[test]
    fn test_invalid_rates() {
        assert!(CostModel::new(-1.0).is_err());
        assert!(CostModel::new(f64::NAN).is_err());
        assert!(CostModel::new(f64::INFINITY).is_err());
        assert!(CostModel::new(0.0).is_ok());
    }

    #[test]
    fn test_estimate_json_shape() {
        let json = serde_json::to_value(CostModel::default().estimate(1 << 40)).unwrap();
        assert_eq!(json["bytes_processed"], 1_099_511_627_776u64);
        assert_eq!(json["estimated_cost"], 5.0);
    }
}
