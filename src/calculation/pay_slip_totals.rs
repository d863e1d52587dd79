//! Pay slip totals aggregation.
//!
//! Computes gross pay, total deductions and net pay from the earning and
//! deduction line items, enforcing the non-negative net pay invariant.
//! Violations reject the whole computation; nothing is clamped.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::PayComponent;

use super::round_to_cents;

/// The consistent totals snapshot for a pay slip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaySlipTotals {
    /// Sum of earning amounts.
    pub gross_pay: Decimal,
    /// Sum of deduction amounts.
    pub total_deductions: Decimal,
    /// `gross_pay - total_deductions`. Never negative.
    pub net_pay: Decimal,
}

/// Computes pay slip totals from its line items.
///
/// Every component amount must be non-negative (deductions are
/// subtracted by the list they appear in, not by sign). A recomputed net
/// pay below zero rejects the whole computation with
/// [`EngineError::NegativeNetPay`].
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::compute_totals;
/// use payroll_engine::models::{CalcType, PayComponent};
/// use rust_decimal::Decimal;
///
/// let earnings = vec![PayComponent {
///     name: "Basic Salary".to_string(),
///     calc_type: CalcType::Fixed,
///     amount: Decimal::new(100000, 2),
/// }];
/// let deductions = vec![PayComponent {
///     name: "Income Tax".to_string(),
///     calc_type: CalcType::Percentage,
///     amount: Decimal::new(20000, 2),
/// }];
///
/// let totals = compute_totals(&earnings, &deductions).unwrap();
/// assert_eq!(totals.net_pay, Decimal::new(80000, 2));
/// ```
pub fn compute_totals(
    earnings: &[PayComponent],
    deductions: &[PayComponent],
) -> EngineResult<PaySlipTotals> {
    for component in earnings.iter().chain(deductions.iter()) {
        if component.amount < Decimal::ZERO {
            return Err(EngineError::validation(
                "amount",
                format!("component '{}' has a negative amount", component.name),
            ));
        }
    }

    let gross_pay = round_to_cents(earnings.iter().map(|c| c.amount).sum());
    let total_deductions = round_to_cents(deductions.iter().map(|c| c.amount).sum());
    let net_pay = gross_pay - total_deductions;

    if net_pay < Decimal::ZERO {
        return Err(EngineError::NegativeNetPay {
            gross: gross_pay,
            deductions: total_deductions,
        });
    }

    Ok(PaySlipTotals {
        gross_pay,
        total_deductions,
        net_pay,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CalcType;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn component(name: &str, amount: &str) -> PayComponent {
        PayComponent {
            name: name.to_string(),
            calc_type: CalcType::Fixed,
            amount: dec(amount),
        }
    }

    #[test]
    fn test_net_is_gross_minus_deductions() {
        let earnings = vec![component("Basic Salary", "2500"), component("Allowance", "300")];
        let deductions = vec![component("Income Tax", "400"), component("Pension", "150")];

        let totals = compute_totals(&earnings, &deductions).unwrap();

        assert_eq!(totals.gross_pay, dec("2800"));
        assert_eq!(totals.total_deductions, dec("550"));
        assert_eq!(totals.net_pay, dec("2250"));
    }

    #[test]
    fn test_empty_lists_produce_zero_totals() {
        let totals = compute_totals(&[], &[]).unwrap();

        assert_eq!(totals.gross_pay, Decimal::ZERO);
        assert_eq!(totals.total_deductions, Decimal::ZERO);
        assert_eq!(totals.net_pay, Decimal::ZERO);
    }

    #[test]
    fn test_deductions_exceeding_gross_rejected() {
        let earnings = vec![component("Basic Salary", "1000")];
        let deductions = vec![component("Loan Repayment", "1200")];

        let err = compute_totals(&earnings, &deductions).unwrap_err();

        match err {
            EngineError::NegativeNetPay { gross, deductions } => {
                assert_eq!(gross, dec("1000"));
                assert_eq!(deductions, dec("1200"));
            }
            other => panic!("expected NegativeNetPay, got {other:?}"),
        }
    }

    #[test]
    fn test_net_of_exactly_zero_allowed() {
        let earnings = vec![component("Basic Salary", "1000")];
        let deductions = vec![component("Garnishment", "1000")];

        let totals = compute_totals(&earnings, &deductions).unwrap();
        assert_eq!(totals.net_pay, Decimal::ZERO);
    }

    #[test]
    fn test_negative_component_amount_rejected() {
        let earnings = vec![component("Adjustment", "-50")];

        let err = compute_totals(&earnings, &[]).unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
    }

    #[test]
    fn test_fractional_amounts_round_to_cents() {
        let earnings = vec![component("Hourly", "1234.567")];
        let deductions = vec![component("Tax", "234.561")];

        let totals = compute_totals(&earnings, &deductions).unwrap();

        assert_eq!(totals.gross_pay, dec("1234.57"));
        assert_eq!(totals.total_deductions, dec("234.56"));
        assert_eq!(totals.net_pay, dec("1000.01"));
    }

    proptest! {
        /// For any combination of non-negative line items the computation
        /// either yields consistent totals or rejects with NegativeNetPay;
        /// it never produces a negative net pay.
        #[test]
        fn prop_net_pay_never_negative(
            earning_cents in proptest::collection::vec(0u64..10_000_000, 0..8),
            deduction_cents in proptest::collection::vec(0u64..10_000_000, 0..8),
        ) {
            let earnings: Vec<PayComponent> = earning_cents
                .iter()
                .map(|&c| PayComponent {
                    name: "earning".to_string(),
                    calc_type: CalcType::Fixed,
                    amount: Decimal::new(c as i64, 2),
                })
                .collect();
            let deductions: Vec<PayComponent> = deduction_cents
                .iter()
                .map(|&c| PayComponent {
                    name: "deduction".to_string(),
                    calc_type: CalcType::Fixed,
                    amount: Decimal::new(c as i64, 2),
                })
                .collect();

            match compute_totals(&earnings, &deductions) {
                Ok(totals) => {
                    prop_assert!(totals.net_pay >= Decimal::ZERO);
                    prop_assert_eq!(
                        totals.net_pay,
                        totals.gross_pay - totals.total_deductions
                    );
                }
                Err(EngineError::NegativeNetPay { gross, deductions }) => {
                    prop_assert!(gross < deductions);
                }
                Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
            }
        }
    }
}
