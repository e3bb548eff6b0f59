//! Discounting primitives on a regular period grid: compounding, level
//! payments, NPV, and the IRR solver behind the comprehensive rate.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LeaseCalcError;
use crate::types::{Money, Rate};
use crate::LeaseCalcResult;

/// Whether a level payment falls at the end or the start of each period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentTiming {
    Arrears,
    Advance,
}

/// Explicit knobs for the IRR root finder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Converged once |NPV| or the rate step falls to this value.
    pub tolerance: Decimal,
    /// Iteration cap applied to each of the Newton and bisection phases.
    pub max_iterations: u32,
    /// Bisection bracket, expressed as a periodic rate.
    pub lower_bound: Rate,
    pub upper_bound: Rate,
    /// Newton starting point.
    pub initial_guess: Rate,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            tolerance: dec!(0.00000001),
            max_iterations: 100,
            lower_bound: dec!(-0.99),
            upper_bound: dec!(10),
            initial_guess: dec!(0.01),
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> LeaseCalcResult<()> {
        if self.tolerance <= Decimal::ZERO {
            return Err(LeaseCalcError::invalid(
                "tolerance",
                "Solver tolerance must be positive",
            ));
        }
        if self.max_iterations == 0 {
            return Err(LeaseCalcError::invalid(
                "max_iterations",
                "Solver needs at least one iteration",
            ));
        }
        if self.lower_bound <= dec!(-1) {
            return Err(LeaseCalcError::invalid(
                "lower_bound",
                "Lower bound must be greater than -100%",
            ));
        }
        if self.lower_bound >= self.upper_bound {
            return Err(LeaseCalcError::invalid(
                "upper_bound",
                "Upper bound must exceed lower bound",
            ));
        }
        if self.initial_guess < self.lower_bound || self.initial_guess > self.upper_bound {
            return Err(LeaseCalcError::invalid(
                "initial_guess",
                "Initial guess must lie inside the bracket",
            ));
        }
        Ok(())
    }
}

/// Which phase of the solver produced the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverMethod {
    Newton,
    Bisection,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrrSolution {
    pub rate: Rate,
    pub iterations: u32,
    pub method: SolverMethod,
}

/// (1 + rate)^periods by repeated multiplication.
pub fn compound_factor(rate: Rate, periods: u32) -> LeaseCalcResult<Decimal> {
    let one_plus_r = Decimal::ONE + rate;
    let mut factor = Decimal::ONE;
    for _ in 0..periods {
        factor = factor
            .checked_mul(one_plus_r)
            .ok_or_else(|| LeaseCalcError::overflow(format!("(1 + {rate})^{periods}")))?;
    }
    Ok(factor)
}

/// Level payment that amortises `principal` over `periods` at `rate` per period.
///
/// Arrears: P·r / (1 − (1+r)^−n). Advance: the arrears payment discounted one period.
pub fn level_payment(
    principal: Money,
    rate: Rate,
    periods: u32,
    timing: PaymentTiming,
) -> LeaseCalcResult<Money> {
    if periods == 0 {
        return Err(LeaseCalcError::DivisionByZero {
            context: "level payment over zero periods".into(),
        });
    }
    if rate.is_zero() {
        return Ok(principal / Decimal::from(periods));
    }

    let factor = compound_factor(rate, periods)?;
    let denominator = factor - Decimal::ONE;
    if denominator.is_zero() {
        return Err(LeaseCalcError::DivisionByZero {
            context: "annuity factor".into(),
        });
    }

    let arrears = principal
        .checked_mul(rate)
        .and_then(|v| v.checked_mul(factor))
        .and_then(|v| v.checked_div(denominator))
        .ok_or_else(|| LeaseCalcError::overflow("level payment"))?;

    match timing {
        PaymentTiming::Arrears => Ok(arrears),
        PaymentTiming::Advance => Ok(arrears / (Decimal::ONE + rate)),
    }
}

/// Net present value of flows where `flows[t]` falls `t` periods from now.
pub fn npv(rate: Rate, flows: &[Money]) -> LeaseCalcResult<Money> {
    if rate <= dec!(-1) {
        return Err(LeaseCalcError::invalid(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }
    discounted(rate, flows)
        .map(|(value, _)| value)
        .ok_or_else(|| LeaseCalcError::overflow(format!("NPV at rate {rate}")))
}

/// NPV and its derivative with respect to the rate. `None` on overflow.
fn discounted(rate: Rate, flows: &[Money]) -> Option<(Money, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }

    let mut value = Decimal::ZERO;
    let mut derivative = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in flows.iter().enumerate() {
        if t > 0 {
            match discount.checked_mul(one_plus_r) {
                Some(d) => discount = d,
                // Remaining terms are below Decimal precision.
                None => break,
            }
        }
        let term = cf.checked_div(discount)?;
        value = value.checked_add(term)?;
        let slope = term
            .checked_mul(Decimal::from(t as u64))?
            .checked_div(one_plus_r)?;
        derivative = derivative.checked_sub(slope)?;
    }

    Some((value, derivative))
}

/// A function with the same roots and sign as NPV that stays finite across
/// the whole bracket: discounted form for r ≥ 0, compounded (Horner) form
/// for r < 0.
fn bracket_value(rate: Rate, flows: &[Money]) -> Option<Money> {
    if rate >= Decimal::ZERO {
        return discounted(rate, flows).map(|(value, _)| value);
    }
    let one_plus_r = Decimal::ONE + rate;
    let mut acc = Decimal::ZERO;
    for cf in flows {
        acc = acc.checked_mul(one_plus_r)?.checked_add(*cf)?;
    }
    Some(acc)
}

/// Periodic internal rate of return of `flows` (indexed by period offset).
///
/// Newton–Raphson from `config.initial_guess`; if it stalls, leaves the
/// bracket, or runs out of iterations, bisection over
/// `[config.lower_bound, config.upper_bound]` takes over.
pub fn irr(flows: &[Money], config: &SolverConfig) -> LeaseCalcResult<IrrSolution> {
    config.validate()?;
    if flows.len() < 2 {
        return Err(LeaseCalcError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }
    let has_inflow = flows.iter().any(|cf| *cf > Decimal::ZERO);
    let has_outflow = flows.iter().any(|cf| *cf < Decimal::ZERO);
    if !(has_inflow && has_outflow) {
        return Err(LeaseCalcError::InsufficientData(
            "IRR requires both positive and negative cash flows".into(),
        ));
    }

    if let Some(solution) = newton(flows, config) {
        return Ok(solution);
    }
    debug!("IRR Newton phase did not converge, falling back to bisection");
    bisection(flows, config)
}

fn newton(flows: &[Money], config: &SolverConfig) -> Option<IrrSolution> {
    let mut rate = config.initial_guess;

    for i in 0..config.max_iterations {
        let (value, slope) = discounted(rate, flows)?;

        if value.abs() <= config.tolerance {
            return Some(IrrSolution {
                rate,
                iterations: i,
                method: SolverMethod::Newton,
            });
        }
        if slope.is_zero() {
            debug!(iteration = i, %rate, "IRR Newton derivative vanished");
            return None;
        }

        let step = value.checked_div(slope)?;
        let next = rate - step;
        if next < config.lower_bound || next > config.upper_bound {
            debug!(iteration = i, %next, "IRR Newton step left the bracket");
            return None;
        }
        rate = next;

        if step.abs() <= config.tolerance {
            return Some(IrrSolution {
                rate,
                iterations: i + 1,
                method: SolverMethod::Newton,
            });
        }
    }

    None
}

fn bisection(flows: &[Money], config: &SolverConfig) -> LeaseCalcResult<IrrSolution> {
    let eval = |rate: Rate| {
        bracket_value(rate, flows)
            .ok_or_else(|| LeaseCalcError::overflow(format!("IRR bracket value at {rate}")))
    };

    let mut lo = config.lower_bound;
    let mut hi = config.upper_bound;
    let mut f_lo = eval(lo)?;
    let f_hi = eval(hi)?;

    if f_lo.is_zero() {
        return Ok(IrrSolution {
            rate: lo,
            iterations: 0,
            method: SolverMethod::Bisection,
        });
    }
    if f_hi.is_zero() {
        return Ok(IrrSolution {
            rate: hi,
            iterations: 0,
            method: SolverMethod::Bisection,
        });
    }
    if f_lo.is_sign_negative() == f_hi.is_sign_negative() {
        return Err(LeaseCalcError::ConvergenceFailure {
            function: "IRR (no sign change in bracket)".into(),
            iterations: 0,
            last_delta: f_lo,
        });
    }

    let mut last = f_lo;
    for i in 1..=config.max_iterations {
        let mid = (lo + hi) / dec!(2);
        let f_mid = eval(mid)?;
        last = f_mid;

        if f_mid.abs() <= config.tolerance || (hi - lo) / dec!(2) <= config.tolerance {
            return Ok(IrrSolution {
                rate: mid,
                iterations: i,
                method: SolverMethod::Bisection,
            });
        }

        if f_mid.is_sign_negative() == f_lo.is_sign_negative() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    Err(LeaseCalcError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: config.max_iterations,
        last_delta: last,
    })
}
