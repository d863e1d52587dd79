//! Pure money math for the Payroll Financial Engine.
//!
//! This module contains the side-effect-free calculators: overtime rate
//! and pay from the fixed multiplier table, loan amortization schedules,
//! and pay slip totals with the non-negative net pay guard. Everything
//! here is deterministic given its inputs, which is what makes
//! recompute-on-edit semantics and the test suite possible.

mod loan_schedule;
mod overtime_rate;
mod pay_slip_totals;

pub use loan_schedule::{LoanSchedule, loan_installments};
pub use overtime_rate::{overtime_multiplier, overtime_pay, overtime_rate};
pub use pay_slip_totals::{PaySlipTotals, compute_totals};

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a monetary amount to 2 decimal places, half-up at the cent.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::round_to_cents;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let amount = Decimal::from_str("10.005").unwrap();
/// assert_eq!(round_to_cents(amount), Decimal::from_str("10.01").unwrap());
/// ```
pub fn round_to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
