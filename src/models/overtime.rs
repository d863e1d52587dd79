//! Overtime record model and related types.
//!
//! An overtime record captures hours worked beyond schedule for one
//! employee on one date, with a premium pay computed from a fixed
//! multiplier table (see [`crate::calculation::overtime_rate`]).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of overtime worked, which selects the rate multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OvertimeType {
    /// Ordinary weekday overtime (1.50x).
    Regular,
    /// Weekend overtime (2.00x).
    Weekend,
    /// Public holiday overtime (2.50x).
    Holiday,
    /// Night shift overtime (1.75x).
    NightShift,
}

impl Default for OvertimeType {
    /// Absent or unrecognized types fall back to regular overtime.
    fn default() -> Self {
        OvertimeType::Regular
    }
}

/// Lifecycle status of an overtime record.
///
/// The allowed transitions are `Pending → Approved → Paid` and
/// `Pending → Rejected`. `Paid` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OvertimeStatus {
    /// Submitted and awaiting an approval decision.
    Pending,
    /// Approved; only the transition to `Paid` remains.
    Approved,
    /// Rejected. Terminal.
    Rejected,
    /// Paid out. Terminal.
    Paid,
}

impl OvertimeStatus {
    /// Returns true if the requested status change is in the allowed
    /// transition table.
    pub fn can_transition_to(self, to: OvertimeStatus) -> bool {
        use OvertimeStatus::*;
        matches!(
            (self, to),
            (Pending, Approved) | (Pending, Rejected) | (Approved, Paid)
        )
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, OvertimeStatus::Paid | OvertimeStatus::Rejected)
    }

    /// Returns true if non-status fields may still be edited. The
    /// computed amounts are fixed once an approver has seen them.
    pub fn allows_field_edits(self) -> bool {
        matches!(self, OvertimeStatus::Pending)
    }
}

impl fmt::Display for OvertimeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OvertimeStatus::Pending => "pending",
            OvertimeStatus::Approved => "approved",
            OvertimeStatus::Rejected => "rejected",
            OvertimeStatus::Paid => "paid",
        };
        f.write_str(s)
    }
}

/// Hours worked beyond schedule for one employee on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvertimeRecord {
    /// Unique identifier for the record.
    pub id: String,
    /// The employee who worked the overtime.
    pub employee_id: String,
    /// The date the overtime was worked.
    pub work_date: NaiveDate,
    /// Overtime hours worked. Valid range is 0.5 to 24.
    pub hours: Decimal,
    /// The category of overtime, selecting the multiplier.
    pub overtime_type: OvertimeType,
    /// The employee's basic hourly rate at submission time.
    pub hourly_rate: Decimal,
    /// `hourly_rate` times the type multiplier.
    pub overtime_rate: Decimal,
    /// `hours` times `overtime_rate`, rounded to cents.
    pub overtime_pay: Decimal,
    /// Current lifecycle status.
    pub status: OvertimeStatus,
    /// Who decided the record. Stamped at most once.
    pub approved_by: Option<String>,
    /// When the record was decided. Stamped at most once.
    pub approved_at: Option<DateTime<Utc>>,
    /// Free-form notes from the approver.
    pub approval_notes: Option<String>,
    /// When the overtime was paid out.
    pub paid_at: Option<DateTime<Utc>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped on every successful write.
    pub version: u64,
}
