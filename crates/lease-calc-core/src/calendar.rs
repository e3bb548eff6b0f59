//! Date arithmetic for payment grids and day-count conventions.
//!
//! Period dates are always derived from the anchor date (`anchor + k * interval`)
//! rather than chained from the previous period, so a 31 January start yields
//! 28/29 February and then 31 March again instead of drifting to the 28th.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LeaseCalcError;
use crate::types::Years;
use crate::LeaseCalcResult;

/// Day-count basis used to turn a day span into a year fraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayCountConvention {
    /// ACT/360 money market convention
    #[default]
    Actual360,
    /// ACT/365 fixed
    Actual365,
}

impl DayCountConvention {
    /// Days in the denominator of the year fraction.
    pub fn basis_days(self) -> Decimal {
        match self {
            DayCountConvention::Actual360 => dec!(360),
            DayCountConvention::Actual365 => dec!(365),
        }
    }

    /// Year fraction for a span of actual days.
    pub fn year_fraction_days(self, days: u32) -> Years {
        Decimal::from(days) / self.basis_days()
    }

    pub fn label(self) -> &'static str {
        match self {
            DayCountConvention::Actual360 => "ACT/360",
            DayCountConvention::Actual365 => "ACT/365",
        }
    }
}

/// Add calendar months, clamping to the last day of the target month.
pub fn add_months(date: NaiveDate, months: u32) -> LeaseCalcResult<NaiveDate> {
    date.checked_add_months(Months::new(months)).ok_or_else(|| {
        LeaseCalcError::DateError(format!("{date} + {months} months is out of range"))
    })
}

/// End date of period `k` (1-based) on a grid anchored at `anchor`.
pub fn period_end(anchor: NaiveDate, interval_months: u32, k: u32) -> LeaseCalcResult<NaiveDate> {
    let months = interval_months.checked_mul(k).ok_or_else(|| {
        LeaseCalcError::DateError(format!(
            "period {k} with a {interval_months}-month interval overflows the calendar"
        ))
    })?;
    add_months(anchor, months)
}

/// Actual days from `start` to `end`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> LeaseCalcResult<u32> {
    let days = (end - start).num_days();
    if days < 0 {
        return Err(LeaseCalcError::DateError(format!(
            "{end} is before {start}"
        )));
    }
    u32::try_from(days)
        .map_err(|_| LeaseCalcError::DateError(format!("{days} days is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        assert_eq!(add_months(d(2024, 1, 31), 1).unwrap(), d(2024, 2, 29));
        assert_eq!(add_months(d(2023, 1, 31), 1).unwrap(), d(2023, 2, 28));
        assert_eq!(add_months(d(2024, 8, 31), 6).unwrap(), d(2025, 2, 28));
    }

    #[test]
    fn test_period_end_does_not_drift() {
        let anchor = d(2024, 1, 31);
        assert_eq!(period_end(anchor, 1, 1).unwrap(), d(2024, 2, 29));
        assert_eq!(period_end(anchor, 1, 2).unwrap(), d(2024, 3, 31));
        assert_eq!(period_end(anchor, 6, 2).unwrap(), d(2025, 1, 31));
    }

    #[test]
    fn test_year_fraction_basis() {
        assert_eq!(
            DayCountConvention::Actual360.year_fraction_days(180),
            dec!(0.5)
        );
        assert_eq!(
            DayCountConvention::Actual365.year_fraction_days(73),
            dec!(0.2)
        );
    }

    #[test]
    fn test_days_between_rejects_reversed_dates() {
        assert_eq!(days_between(d(2024, 1, 1), d(2024, 3, 1)).unwrap(), 60);
        assert!(days_between(d(2024, 3, 1), d(2024, 1, 1)).is_err());
    }
}
