//! Unit cost table per severity category.
//!
//! Costs are currency per pixel of affected area. Area is not converted through
//! a ground sampling distance first; callers wanting a calibrated figure supply
//! their own table.

use serde::{Deserialize, Serialize};

use crate::domain::SeverityCategory;
use crate::error::AppError;

pub const DEFAULT_COST_NO_DAMAGE: f64 = 0.0;
pub const DEFAULT_COST_MINOR_DAMAGE: f64 = 0.12;
pub const DEFAULT_COST_MAJOR_DAMAGE: f64 = 0.35;
pub const DEFAULT_COST_DESTROYED: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostTable {
    pub no_damage: f64,
    pub minor_damage: f64,
    pub major_damage: f64,
    pub destroyed: f64,
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            no_damage: DEFAULT_COST_NO_DAMAGE,
            minor_damage: DEFAULT_COST_MINOR_DAMAGE,
            major_damage: DEFAULT_COST_MAJOR_DAMAGE,
            destroyed: DEFAULT_COST_DESTROYED,
        }
    }
}

impl CostTable {
    pub fn unit_cost(&self, category: SeverityCategory) -> f64 {
        match category {
            SeverityCategory::NoDamage => self.no_damage,
            SeverityCategory::MinorDamage => self.minor_damage,
            SeverityCategory::MajorDamage => self.major_damage,
            SeverityCategory::Destroyed => self.destroyed,
        }
    }

    /// Check that costs are finite, non-negative and strictly increase with severity
    /// from minor damage upwards.
    pub fn validate(&self) -> Result<(), AppError> {
        for category in SeverityCategory::ALL {
            let cost = self.unit_cost(category);
            if !(cost.is_finite() && cost >= 0.0) {
                return Err(AppError::new(
                    2,
                    format!("Invalid unit cost for {}: {cost} (must be finite and >= 0).", category.key()),
                ));
            }
        }
        if !(self.minor_damage < self.major_damage && self.major_damage < self.destroyed) {
            return Err(AppError::new(
                2,
                format!(
                    "Unit costs must satisfy minor < major < destroyed (got {} / {} / {}).",
                    self.minor_damage, self.major_damage, self.destroyed
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_valid() {
        let table = CostTable::default();
        assert!(table.validate().is_ok());
        assert_eq!(table.unit_cost(SeverityCategory::NoDamage), 0.0);
        assert_eq!(table.unit_cost(SeverityCategory::Destroyed), 0.75);
    }

    #[test]
    fn out_of_order_table_is_rejected() {
        let table = CostTable {
            major_damage: 0.8,
            ..CostTable::default()
        };
        let err = table.validate().unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn negative_cost_is_rejected() {
        let table = CostTable {
            no_damage: -0.01,
            ..CostTable::default()
        };
        assert!(table.validate().is_err());
    }
}
