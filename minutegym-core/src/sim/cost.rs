//! Transaction cost model.
//!
//! Linear in the size of the position change: switching long to short pays
//! twice the rate of opening from flat. No slippage, no tick rounding.

use super::action::Position;
use super::SimError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Fraction of notional charged per unit of position change.
    rate: f64,
}

impl CostModel {
    pub fn new(rate: f64) -> Result<Self, SimError> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(SimError::InvalidCost(rate));
        }
        Ok(Self { rate })
    }

    pub fn frictionless() -> Self {
        Self { rate: 0.0 }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Cost of moving from `from` to `to`; zero when they are equal.
    pub fn cost(&self, from: Position, to: Position) -> f64 {
        if from == to {
            return 0.0;
        }
        f64::from(from.change_magnitude(to)) * self.rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_scales_with_change() {
        let m = CostModel::new(0.01).unwrap();
        assert_eq!(m.cost(Position::Flat, Position::Flat), 0.0);
        assert_eq!(m.cost(Position::Flat, Position::Long), 0.01);
        assert_eq!(m.cost(Position::Long, Position::Short), 0.02);
    }

    #[test]
    fn frictionless_is_free() {
        let m = CostModel::frictionless();
        assert_eq!(m.cost(Position::Short, Position::Long), 0.0);
    }

    #[test]
    fn rejects_negative_and_nan_rates() {
        assert!(CostModel::new(-0.1).is_err());
        assert!(CostModel::new(f64::NAN).is_err());
    }
}
