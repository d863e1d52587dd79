//! Employee loan model and related types.
//!
//! An employee loan is an amortized advance repaid via fixed monthly
//! installments. The installment schedule is computed once from
//! principal, term and annual rate (see
//! [`crate::calculation::loan_schedule`]) and recomputed whenever those
//! inputs change while the loan is still pending.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an employee loan.
///
/// The allowed transitions are `Pending → Approved → Disbursed → Closed`
/// and `Pending → Rejected`. `Closed` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Requested and awaiting an approval decision.
    Pending,
    /// Approved but not yet paid out to the employee.
    Approved,
    /// Rejected. Terminal.
    Rejected,
    /// Funds paid out; repayments are being recorded.
    Disbursed,
    /// Fully repaid (or written off). Terminal.
    Closed,
}

impl LoanStatus {
    /// Returns true if the requested status change is in the allowed
    /// transition table.
    pub fn can_transition_to(self, to: LoanStatus) -> bool {
        use LoanStatus::*;
        matches!(
            (self, to),
            (Pending, Approved) | (Pending, Rejected) | (Approved, Disbursed) | (Disbursed, Closed)
        )
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, LoanStatus::Closed | LoanStatus::Rejected)
    }

    /// Returns true if the loan terms may still be edited. The schedule
    /// is fixed once an approver has seen it.
    pub fn allows_field_edits(self) -> bool {
        matches!(self, LoanStatus::Pending)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
            LoanStatus::Disbursed => "disbursed",
            LoanStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// An amortized advance to an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeLoan {
    /// Unique identifier for the loan.
    pub id: String,
    /// The employee the loan was advanced to.
    pub employee_id: String,
    /// Human-facing loan number (e.g. "LN-2026-014").
    pub loan_number: String,
    /// The amount advanced. Always positive.
    pub principal: Decimal,
    /// Annual interest rate in percent. Valid range is 0 to 50.
    pub interest_rate: Decimal,
    /// Repayment term in months. Valid range is 1 to 120.
    pub term_months: u32,
    /// Fixed monthly installment, rounded to cents.
    pub monthly_installment: Decimal,
    /// Total repayable amount (`monthly_installment * term_months`).
    pub total_amount: Decimal,
    /// Amount repaid so far. Capped at `total_amount`.
    pub amount_paid: Decimal,
    /// Current lifecycle status.
    pub status: LoanStatus,
    /// Who decided the loan. Stamped at most once.
    pub approved_by: Option<String>,
    /// When the loan was decided. Stamped at most once.
    pub approved_at: Option<DateTime<Utc>>,
    /// Free-form notes from the approver.
    pub approval_notes: Option<String>,
    /// When funds were paid out.
    pub disbursed_at: Option<DateTime<Utc>>,
    /// When the loan reached `Closed`.
    pub closed_at: Option<DateTime<Utc>>,
    /// Why the employee requested the loan.
    pub reason: Option<String>,
    /// Guarantor details, if any.
    pub guarantor: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped on every successful write.
    pub version: u64,
}

impl EmployeeLoan {
    /// The outstanding balance (`total_amount - amount_paid`).
    pub fn remaining_balance(&self) -> Decimal {
        self.total_amount - self.amount_paid
    }
}
