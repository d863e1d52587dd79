//! Pay slip model and related types.
//!
//! A pay slip is one employee's computed compensation for a period. It is
//! optionally linked to a pay run; a slip without a run reference is a
//! standalone slip that goes through approval on its own.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a pay component's amount was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalcType {
    /// A fixed monetary amount.
    Fixed,
    /// An amount derived as a percentage of another figure; the stored
    /// amount is the already-resolved monetary value.
    Percentage,
}

/// A single earning or deduction line item on a pay slip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayComponent {
    /// Display name of the component (e.g. "Basic Salary", "Income Tax").
    pub name: String,
    /// How the amount was calculated.
    pub calc_type: CalcType,
    /// The monetary amount. Always non-negative; deductions are
    /// subtracted by position (the list they appear in), not by sign.
    pub amount: Decimal,
}

/// Lifecycle status of a pay slip.
///
/// The allowed transitions are `Draft → Processed → Approved → Paid`,
/// plus `Processed → Draft` when a standalone slip is rejected during
/// approval. `Paid` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaySlipStatus {
    /// Being prepared; fully editable.
    Draft,
    /// Computed and awaiting approval (standalone slips) or its pay
    /// run's approval.
    Processed,
    /// Approved; only the transition to `Paid` remains.
    Approved,
    /// Paid out. Terminal.
    Paid,
}

impl PaySlipStatus {
    /// Returns true if the requested status change is in the allowed
    /// transition table.
    pub fn can_transition_to(self, to: PaySlipStatus) -> bool {
        use PaySlipStatus::*;
        matches!(
            (self, to),
            (Draft, Processed) | (Processed, Approved) | (Approved, Paid) | (Processed, Draft)
        )
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, PaySlipStatus::Paid)
    }

    /// Returns true if non-status fields may still be edited.
    pub fn allows_field_edits(self) -> bool {
        matches!(self, PaySlipStatus::Draft | PaySlipStatus::Processed)
    }
}

impl fmt::Display for PaySlipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaySlipStatus::Draft => "draft",
            PaySlipStatus::Processed => "processed",
            PaySlipStatus::Approved => "approved",
            PaySlipStatus::Paid => "paid",
        };
        f.write_str(s)
    }
}

/// One employee's compensation record for a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaySlip {
    /// Unique identifier for the slip.
    pub id: String,
    /// The employee this slip belongs to.
    pub employee_id: String,
    /// The owning pay run, if any. `None` marks a standalone slip.
    pub pay_run_id: Option<String>,
    /// First day of the pay period.
    pub period_start: NaiveDate,
    /// Last day of the pay period.
    pub period_end: NaiveDate,
    /// Number of days worked in the period.
    pub working_days: u32,
    /// Ordered earning line items.
    pub earnings: Vec<PayComponent>,
    /// Ordered deduction line items.
    pub deductions: Vec<PayComponent>,
    /// Sum of earning amounts.
    pub gross_pay: Decimal,
    /// Sum of deduction amounts.
    pub total_deductions: Decimal,
    /// `gross_pay - total_deductions`. Never negative.
    pub net_pay: Decimal,
    /// Current lifecycle status.
    pub status: PaySlipStatus,
    /// Who approved the slip, once approved. Stamped at most once.
    pub approved_by: Option<String>,
    /// When the slip was approved. Stamped at most once.
    pub approved_at: Option<DateTime<Utc>>,
    /// When the slip was paid out.
    pub paid_at: Option<DateTime<Utc>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped on every successful write.
    pub version: u64,
}
