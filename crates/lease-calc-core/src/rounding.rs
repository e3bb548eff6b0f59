use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Midpoint handling when amounts are rounded to currency precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundingMode {
    /// 0.005 -> 0.01 (commercial rounding)
    #[default]
    HalfUp,
    /// 0.005 -> 0.00, 0.015 -> 0.02
    HalfEven,
    /// Drop digits beyond the precision
    Truncate,
}

impl From<RoundingMode> for RoundingStrategy {
    fn from(mode: RoundingMode) -> Self {
        match mode {
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
            RoundingMode::Truncate => RoundingStrategy::ToZero,
        }
    }
}

/// How per-period amounts are rounded. Residue from rounding is always
/// absorbed by the final period's principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundingPolicy {
    pub decimal_places: u32,
    #[serde(default)]
    pub mode: RoundingMode,
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        RoundingPolicy {
            decimal_places: 2,
            mode: RoundingMode::HalfUp,
        }
    }
}

impl RoundingPolicy {
    pub fn apply(&self, amount: Money) -> Money {
        amount.round_dp_with_strategy(self.decimal_places, self.mode.into())
    }

    /// Smallest representable currency unit at this precision.
    pub fn unit(&self) -> Money {
        Decimal::new(1, self.decimal_places)
    }
}
