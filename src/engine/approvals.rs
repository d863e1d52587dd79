//! The unified approval queue.
//!
//! Four entity kinds wait for an approval decision in their own status
//! vocabulary: pay runs at `Completed`, standalone pay slips at
//! `Processed`, overtime records and loans at `Pending`. This module
//! projects them into one queue of [`ApprovalItem`]s and routes a
//! single approve/reject decision back to the owning entity's
//! transition rules. Rejection is asymmetric: runs and slips return to
//! `Draft` for rework, while overtime and loans land in the terminal
//! `Rejected` status.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tracing::info;

use crate::audit::AuditEntry;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    EmployeeLoan, LoanStatus, OvertimeRecord, OvertimeStatus, PayRun, PayRunStatus, PaySlip,
    PaySlipStatus,
};
use crate::store::Gateway;

use super::{Engine, LoanPatch, OvertimePatch, PayRunPatch, PaySlipPatch};

/// The kind of entity behind an approval item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKind {
    /// A pay run awaiting approval at `Completed`.
    PayRun,
    /// A standalone pay slip awaiting approval at `Processed`.
    PaySlip,
    /// An overtime record awaiting a decision at `Pending`.
    Overtime,
    /// An employee loan awaiting a decision at `Pending`.
    Loan,
}

impl fmt::Display for ApprovalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApprovalKind::PayRun => "pay_run",
            ApprovalKind::PaySlip => "pay_slip",
            ApprovalKind::Overtime => "overtime",
            ApprovalKind::Loan => "loan",
        };
        f.write_str(s)
    }
}

/// The decision taken on a pending item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    /// Accept the item, moving it forward in its lifecycle.
    Approve,
    /// Decline the item. Runs and slips return to `Draft`; overtime and
    /// loans become terminally `Rejected`.
    Reject,
}

/// Queue ordering weight. Higher sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Individual overtime records.
    Low,
    /// Standalone pay slips and loans.
    Medium,
    /// Whole pay runs.
    High,
}

fn priority_for(kind: ApprovalKind) -> Priority {
    match kind {
        ApprovalKind::PayRun => Priority::High,
        ApprovalKind::PaySlip | ApprovalKind::Loan => Priority::Medium,
        ApprovalKind::Overtime => Priority::Low,
    }
}

/// One entry in the unified pending-approval queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalItem {
    /// The kind of entity behind this item.
    pub kind: ApprovalKind,
    /// The entity's id; pass it back to [`Engine::decide_approval`].
    pub id: String,
    /// Short human-facing label.
    pub title: String,
    /// One-line summary of what is being approved.
    pub description: String,
    /// The monetary amount at stake.
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// How many employees the decision affects.
    pub related_employee_count: u32,
    /// When the underlying entity was created.
    pub created_at: DateTime<Utc>,
    /// Queue ordering weight derived from the kind.
    pub priority: Priority,
}

/// The entity returned after a decision, in its post-decision state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecidedEntity {
    /// A decided pay run.
    PayRun(PayRun),
    /// A decided pay slip.
    PaySlip(PaySlip),
    /// A decided overtime record.
    Overtime(OvertimeRecord),
    /// A decided employee loan.
    Loan(EmployeeLoan),
}

impl<G: Gateway> Engine<G> {
    /// Lists everything currently awaiting an approval decision,
    /// optionally filtered to one kind.
    ///
    /// The queue is ordered by priority (highest first), then by
    /// creation time (newest first), then by id for a stable order.
    /// Slips owned by a pay run never appear individually; their run
    /// represents them.
    pub fn list_pending_approvals(&self, filter: Option<ApprovalKind>) -> Vec<ApprovalItem> {
        let mut items = self.gateway().snapshot(|records| {
            let mut items = Vec::new();

            if matches!(filter, None | Some(ApprovalKind::PayRun)) {
                for run in records.pay_runs() {
                    if run.status != PayRunStatus::Completed {
                        continue;
                    }
                    items.push(ApprovalItem {
                        kind: ApprovalKind::PayRun,
                        id: run.id.clone(),
                        title: format!("Pay run {}", run.run_number),
                        description: format!(
                            "{} to {}, {} employees",
                            run.period_start, run.period_end, run.total_employees
                        ),
                        amount: run.total_net,
                        related_employee_count: run.total_employees,
                        created_at: run.created_at,
                        priority: priority_for(ApprovalKind::PayRun),
                    });
                }
            }

            if matches!(filter, None | Some(ApprovalKind::PaySlip)) {
                for slip in records.pay_slips() {
                    if slip.status != PaySlipStatus::Processed || slip.pay_run_id.is_some() {
                        continue;
                    }
                    items.push(ApprovalItem {
                        kind: ApprovalKind::PaySlip,
                        id: slip.id.clone(),
                        title: format!("Pay slip for {}", slip.employee_id),
                        description: format!("{} to {}", slip.period_start, slip.period_end),
                        amount: slip.net_pay,
                        related_employee_count: 1,
                        created_at: slip.created_at,
                        priority: priority_for(ApprovalKind::PaySlip),
                    });
                }
            }

            if matches!(filter, None | Some(ApprovalKind::Overtime)) {
                for record in records.overtime_records() {
                    if record.status != OvertimeStatus::Pending {
                        continue;
                    }
                    items.push(ApprovalItem {
                        kind: ApprovalKind::Overtime,
                        id: record.id.clone(),
                        title: format!("Overtime for {}", record.employee_id),
                        description: format!("{} hours on {}", record.hours, record.work_date),
                        amount: record.overtime_pay,
                        related_employee_count: 1,
                        created_at: record.created_at,
                        priority: priority_for(ApprovalKind::Overtime),
                    });
                }
            }

            if matches!(filter, None | Some(ApprovalKind::Loan)) {
                for loan in records.loans() {
                    if loan.status != LoanStatus::Pending {
                        continue;
                    }
                    items.push(ApprovalItem {
                        kind: ApprovalKind::Loan,
                        id: loan.id.clone(),
                        title: format!("Loan {}", loan.loan_number),
                        description: format!(
                            "{} over {} months",
                            loan.principal, loan.term_months
                        ),
                        amount: loan.principal,
                        related_employee_count: 1,
                        created_at: loan.created_at,
                        priority: priority_for(ApprovalKind::Loan),
                    });
                }
            }

            items
        });

        items.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.created_at.cmp(&a.created_at))
                .then(a.id.cmp(&b.id))
        });
        items
    }

    /// Routes one approve/reject decision to the owning entity.
    ///
    /// The entity must currently be in its awaiting-approval status;
    /// otherwise [`EngineError::NotAwaitingApproval`] reports where it
    /// actually is. Approving a pay run cascades approval to its owned
    /// slips. Notes land on entities that carry them (overtime, loans)
    /// and in the audit trail for all four kinds.
    pub fn decide_approval(
        &self,
        actor: &str,
        kind: ApprovalKind,
        id: &str,
        action: ApprovalAction,
        notes: Option<String>,
    ) -> EngineResult<DecidedEntity> {
        let decided = match kind {
            ApprovalKind::PayRun => {
                let current = self.pay_run(id)?;
                if current.status != PayRunStatus::Completed {
                    return Err(EngineError::NotAwaitingApproval {
                        current: current.status.to_string(),
                    });
                }
                let status = match action {
                    ApprovalAction::Approve => PayRunStatus::Approved,
                    ApprovalAction::Reject => PayRunStatus::Draft,
                };
                let patch = PayRunPatch {
                    status: Some(status),
                    ..Default::default()
                };
                DecidedEntity::PayRun(self.update_pay_run(actor, id, patch)?)
            }
            ApprovalKind::PaySlip => {
                let current = self.pay_slip(id)?;
                if current.status != PaySlipStatus::Processed {
                    return Err(EngineError::NotAwaitingApproval {
                        current: current.status.to_string(),
                    });
                }
                let status = match action {
                    ApprovalAction::Approve => PaySlipStatus::Approved,
                    ApprovalAction::Reject => PaySlipStatus::Draft,
                };
                let patch = PaySlipPatch {
                    status: Some(status),
                    ..Default::default()
                };
                DecidedEntity::PaySlip(self.update_pay_slip(actor, id, patch)?)
            }
            ApprovalKind::Overtime => {
                let current = self.overtime_record(id)?;
                if current.status != OvertimeStatus::Pending {
                    return Err(EngineError::NotAwaitingApproval {
                        current: current.status.to_string(),
                    });
                }
                let status = match action {
                    ApprovalAction::Approve => OvertimeStatus::Approved,
                    ApprovalAction::Reject => OvertimeStatus::Rejected,
                };
                let patch = OvertimePatch {
                    status: Some(status),
                    approval_notes: notes.clone(),
                    ..Default::default()
                };
                DecidedEntity::Overtime(self.update_overtime(actor, id, patch)?)
            }
            ApprovalKind::Loan => {
                let current = self.loan(id)?;
                if current.status != LoanStatus::Pending {
                    return Err(EngineError::NotAwaitingApproval {
                        current: current.status.to_string(),
                    });
                }
                let status = match action {
                    ApprovalAction::Approve => LoanStatus::Approved,
                    ApprovalAction::Reject => LoanStatus::Rejected,
                };
                let patch = LoanPatch {
                    status: Some(status),
                    approval_notes: notes.clone(),
                    ..Default::default()
                };
                DecidedEntity::Loan(self.update_loan(actor, id, patch)?)
            }
        };

        info!(kind = %kind, entity_id = %id, action = ?action, "Approval decided");
        self.record_audit(AuditEntry::new(
            actor,
            &kind.to_string(),
            id,
            "decide",
            json!({
                "action": action,
                "notes": notes,
            }),
        ));
        Ok(decided)
    }
}
