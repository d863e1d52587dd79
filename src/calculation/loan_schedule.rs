//! Loan amortization schedule calculation.
//!
//! Computes the fixed monthly installment for an employee loan using the
//! standard annuity formula. Inputs are validated by the caller (term of
//! at least one month, non-negative rate); this module does not
//! re-validate them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::round_to_cents;

/// The computed repayment schedule for a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanSchedule {
    /// Fixed monthly installment, rounded to cents.
    pub installment: Decimal,
    /// Total repayable amount over the full term.
    pub total: Decimal,
    /// Interest portion of the total (`total - principal`).
    pub interest: Decimal,
}

/// Computes the fixed-installment schedule for a loan.
///
/// For a zero rate the loan is interest-free: the installment is the
/// principal divided evenly over the term and the total repayable equals
/// the principal. Otherwise the monthly rate is
/// `annual_rate_percent / 100 / 12` and the installment follows the
/// annuity formula `P * r * (1+r)^n / ((1+r)^n - 1)`. The installment is
/// rounded to cents first; the total is the rounded installment times
/// the term, so the figures an employee sees always add up.
///
/// # Arguments
///
/// * `principal` - The amount advanced (`P`)
/// * `term_months` - The repayment term in months (`n`, at least 1)
/// * `annual_rate_percent` - The annual interest rate in percent (0 or more)
///
/// # Examples
///
/// ## Interest-free loan
///
/// ```
/// use payroll_engine::calculation::loan_installments;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let schedule = loan_installments(Decimal::from_str("12000").unwrap(), 12, Decimal::ZERO);
/// assert_eq!(schedule.installment, Decimal::from_str("1000.00").unwrap());
/// assert_eq!(schedule.total, Decimal::from_str("12000.00").unwrap());
/// assert_eq!(schedule.interest, Decimal::from_str("0.00").unwrap());
/// ```
///
/// ## Amortized loan
///
/// ```
/// use payroll_engine::calculation::loan_installments;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// // 12% annually is a 1% monthly rate.
/// let schedule = loan_installments(Decimal::from_str("10000").unwrap(), 10, Decimal::from_str("12").unwrap());
/// assert_eq!(schedule.installment, Decimal::from_str("1055.82").unwrap());
/// ```
pub fn loan_installments(
    principal: Decimal,
    term_months: u32,
    annual_rate_percent: Decimal,
) -> LoanSchedule {
    let months = Decimal::from(term_months);

    if annual_rate_percent.is_zero() {
        let installment = round_to_cents(principal / months);
        return LoanSchedule {
            installment,
            total: round_to_cents(principal),
            interest: Decimal::new(0, 2),
        };
    }

    let monthly_rate = annual_rate_percent / Decimal::ONE_HUNDRED / Decimal::from(12u32);

    // (1 + r)^n by repeated multiplication; n is at most 120.
    let base = Decimal::ONE + monthly_rate;
    let mut factor = Decimal::ONE;
    for _ in 0..term_months {
        factor *= base;
    }

    let installment = round_to_cents(principal * monthly_rate * factor / (factor - Decimal::ONE));
    let total = round_to_cents(installment * months);
    let interest = round_to_cents(total - principal);

    LoanSchedule {
        installment,
        total,
        interest,
    }
}
