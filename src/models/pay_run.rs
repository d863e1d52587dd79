//! Pay run model and related types.
//!
//! A pay run is a scheduled batch of pay slips for one period. Its totals
//! are denormalized aggregates over the slips that reference it and are
//! kept recomputable at all times.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a pay run.
///
/// The allowed transitions are `Draft → Processing → Completed → Approved
/// → Paid`, plus `Completed → Draft` when the run is rejected during
/// approval. `Paid` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayRunStatus {
    /// Being assembled; fully editable, deletable while it owns no slips.
    Draft,
    /// Slips are being generated/computed.
    Processing,
    /// All slips processed; the run is awaiting approval.
    Completed,
    /// Approved; owned slips have been cascade-approved.
    Approved,
    /// Paid out. Terminal.
    Paid,
}

impl PayRunStatus {
    /// Returns true if the requested status change is in the allowed
    /// transition table.
    pub fn can_transition_to(self, to: PayRunStatus) -> bool {
        use PayRunStatus::*;
        matches!(
            (self, to),
            (Draft, Processing)
                | (Processing, Completed)
                | (Completed, Approved)
                | (Approved, Paid)
                | (Completed, Draft)
        )
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, PayRunStatus::Paid)
    }

    /// Returns true if non-status fields may still be edited. Once a run
    /// is approved only forward status transitions remain.
    pub fn allows_field_edits(self) -> bool {
        !matches!(self, PayRunStatus::Approved | PayRunStatus::Paid)
    }
}

impl fmt::Display for PayRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PayRunStatus::Draft => "draft",
            PayRunStatus::Processing => "processing",
            PayRunStatus::Completed => "completed",
            PayRunStatus::Approved => "approved",
            PayRunStatus::Paid => "paid",
        };
        f.write_str(s)
    }
}

/// A scheduled batch of pay slips for a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayRun {
    /// Unique identifier for the run.
    pub id: String,
    /// Human-facing run number (e.g. "PR-2026-001").
    pub run_number: String,
    /// First day of the pay period.
    pub period_start: NaiveDate,
    /// Last day of the pay period.
    pub period_end: NaiveDate,
    /// The scheduled payment date.
    pub pay_date: NaiveDate,
    /// Current lifecycle status.
    pub status: PayRunStatus,
    /// Number of distinct employees across owned slips.
    pub total_employees: u32,
    /// Sum of gross pay across owned slips.
    pub total_gross: Decimal,
    /// Sum of net pay across owned slips.
    pub total_net: Decimal,
    /// Who approved the run. Stamped at most once.
    pub approved_by: Option<String>,
    /// When the run was approved. Stamped at most once.
    pub approved_at: Option<DateTime<Utc>>,
    /// When processing of all slips finished.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the run was paid out.
    pub paid_at: Option<DateTime<Utc>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped on every successful write.
    pub version: u64,
}
