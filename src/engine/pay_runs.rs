//! Pay run operations.
//!
//! A pay run batches pay slips for one period. Its denormalized totals
//! are refreshed from the owned slips on every slip mutation while the
//! run is still editable, and approving or paying a run cascades the
//! matching status to every owned slip inside the same transaction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeSet;
use tracing::info;
use uuid::Uuid;

use crate::audit::AuditEntry;
use crate::error::{EngineError, EngineResult};
use crate::models::{PayRun, PayRunStatus, PaySlipStatus};
use crate::store::{Gateway, Records};

use super::Engine;

/// Input for creating a pay run.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPayRun {
    /// Human-facing run number.
    pub run_number: String,
    /// First day of the pay period.
    pub period_start: NaiveDate,
    /// Last day of the pay period.
    pub period_end: NaiveDate,
    /// The scheduled payment date.
    pub pay_date: NaiveDate,
}

/// A partial update to a pay run. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayRunPatch {
    /// New run number.
    pub run_number: Option<String>,
    /// New period start.
    pub period_start: Option<NaiveDate>,
    /// New period end.
    pub period_end: Option<NaiveDate>,
    /// New pay date.
    pub pay_date: Option<NaiveDate>,
    /// Requested status transition.
    pub status: Option<PayRunStatus>,
}

impl PayRunPatch {
    fn has_field_edits(&self) -> bool {
        self.run_number.is_some()
            || self.period_start.is_some()
            || self.period_end.is_some()
            || self.pay_date.is_some()
    }
}

/// Which cascade a run status change triggers on its slips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cascade {
    Approve,
    Pay,
}

impl<G: Gateway> Engine<G> {
    /// Fetches one pay run by id.
    pub fn pay_run(&self, id: &str) -> EngineResult<PayRun> {
        self.gateway()
            .snapshot(|records| records.pay_run(id).cloned())
            .ok_or_else(|| EngineError::not_found("pay_run", id))
    }

    /// Creates a pay run in `Draft` status with zeroed totals.
    pub fn create_pay_run(&self, actor: &str, new: NewPayRun) -> EngineResult<PayRun> {
        if new.period_end < new.period_start {
            return Err(EngineError::validation(
                "period_end",
                "period end must not be before period start",
            ));
        }

        let now = Utc::now();
        let run = PayRun {
            id: Uuid::new_v4().to_string(),
            run_number: new.run_number,
            period_start: new.period_start,
            period_end: new.period_end,
            pay_date: new.pay_date,
            status: PayRunStatus::Draft,
            total_employees: 0,
            total_gross: rust_decimal::Decimal::ZERO,
            total_net: rust_decimal::Decimal::ZERO,
            approved_by: None,
            approved_at: None,
            completed_at: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let stored = self
            .gateway()
            .commit(|records| Ok(records.insert_pay_run(run.clone())))?;

        info!(pay_run_id = %stored.id, run_number = %stored.run_number, "Pay run created");
        self.record_audit(AuditEntry::new(
            actor,
            "pay_run",
            &stored.id,
            "create",
            json!({ "run_number": stored.run_number }),
        ));
        Ok(stored)
    }

    /// Applies a partial update to a pay run.
    ///
    /// Status changes follow the allowed-transition table; moving to
    /// `Approved` or `Paid` cascades the matching status to every owned
    /// slip with the same approver and timestamp, inside the same
    /// transaction as the run's own write.
    pub fn update_pay_run(&self, actor: &str, id: &str, patch: PayRunPatch) -> EngineResult<PayRun> {
        let current = self.pay_run(id)?;
        let now = Utc::now();
        let updated = apply_patch(&current, &patch, actor, now)?;

        let cascade = match updated.status {
            PayRunStatus::Approved if current.status != PayRunStatus::Approved => {
                Some(Cascade::Approve)
            }
            PayRunStatus::Paid if current.status != PayRunStatus::Paid => Some(Cascade::Pay),
            _ => None,
        };

        let stored = self.gateway().commit(|records| {
            let stored = records.put_pay_run_if(updated.clone(), current.version)?;
            match cascade {
                Some(Cascade::Approve) => {
                    let approver = stored.approved_by.as_deref().unwrap_or(actor).to_string();
                    let at = stored.approved_at.unwrap_or(now);
                    cascade_approve_slips(records, &stored.id, &approver, at)?;
                }
                Some(Cascade::Pay) => {
                    let at = stored.paid_at.unwrap_or(now);
                    cascade_pay_slips(records, &stored.id, at)?;
                }
                None => {}
            }
            Ok(stored)
        })?;

        info!(
            pay_run_id = %stored.id,
            from = %current.status,
            to = %stored.status,
            "Pay run updated"
        );
        self.record_audit(
            AuditEntry::new(actor, "pay_run", &stored.id, "update", json!({}))
                .with_statuses(current.status, stored.status),
        );
        Ok(stored)
    }

    /// Deletes a pay run. Allowed only while it is in `Draft` status and
    /// owns no pay slips.
    pub fn delete_pay_run(&self, actor: &str, id: &str) -> EngineResult<()> {
        let current = self.pay_run(id)?;
        if current.status != PayRunStatus::Draft {
            return Err(EngineError::ImmutableRecord {
                kind: "pay_run".to_string(),
                id: id.to_string(),
            });
        }

        self.gateway().commit(|records| {
            match records.pay_run(id) {
                Some(run) if run.version == current.version => {}
                _ => {
                    return Err(EngineError::ConcurrentModification {
                        kind: "pay_run".to_string(),
                        id: id.to_string(),
                    });
                }
            }
            if !records.pay_slips_for_run(id).is_empty() {
                return Err(EngineError::validation(
                    "pay_run_id",
                    "cannot delete a pay run that owns pay slips",
                ));
            }
            records.remove_pay_run(id);
            Ok(())
        })?;

        info!(pay_run_id = %id, "Pay run deleted");
        self.record_audit(AuditEntry::new(actor, "pay_run", id, "delete", json!({})));
        Ok(())
    }
}

fn apply_patch(
    current: &PayRun,
    patch: &PayRunPatch,
    actor: &str,
    now: DateTime<Utc>,
) -> EngineResult<PayRun> {
    if current.status.is_terminal() {
        return Err(EngineError::ImmutableRecord {
            kind: "pay_run".to_string(),
            id: current.id.clone(),
        });
    }
    if patch.has_field_edits() && !current.status.allows_field_edits() {
        return Err(EngineError::ImmutableRecord {
            kind: "pay_run".to_string(),
            id: current.id.clone(),
        });
    }

    let mut updated = current.clone();
    if let Some(run_number) = &patch.run_number {
        updated.run_number = run_number.clone();
    }
    if let Some(period_start) = patch.period_start {
        updated.period_start = period_start;
    }
    if let Some(period_end) = patch.period_end {
        updated.period_end = period_end;
    }
    if let Some(pay_date) = patch.pay_date {
        updated.pay_date = pay_date;
    }
    if updated.period_end < updated.period_start {
        return Err(EngineError::validation(
            "period_end",
            "period end must not be before period start",
        ));
    }

    if let Some(to) = patch.status {
        if to != current.status {
            if !current.status.can_transition_to(to) {
                return Err(EngineError::InvalidTransition {
                    from: current.status.to_string(),
                    to: to.to_string(),
                });
            }
            updated.status = to;
            match to {
                PayRunStatus::Completed => {
                    if updated.completed_at.is_none() {
                        updated.completed_at = Some(now);
                    }
                }
                PayRunStatus::Approved => {
                    if updated.approved_at.is_none() {
                        updated.approved_by = Some(actor.to_string());
                        updated.approved_at = Some(now);
                    }
                }
                PayRunStatus::Paid => {
                    if updated.paid_at.is_none() {
                        updated.paid_at = Some(now);
                    }
                }
                _ => {}
            }
        }
    }

    updated.updated_at = now;
    Ok(updated)
}

/// Force-transitions every slip owned by the run to `Approved`, stamping
/// the run's approver and timestamp. Slips already approved keep their
/// original stamps; paid slips are left alone.
pub(crate) fn cascade_approve_slips(
    records: &mut Records,
    run_id: &str,
    approver: &str,
    at: DateTime<Utc>,
) -> EngineResult<()> {
    let ids: Vec<String> = records
        .pay_slips_for_run(run_id)
        .iter()
        .map(|slip| slip.id.clone())
        .collect();

    for id in ids {
        let Some(slip) = records.pay_slip(&id).cloned() else {
            continue;
        };
        if matches!(slip.status, PaySlipStatus::Approved | PaySlipStatus::Paid) {
            continue;
        }
        let mut updated = slip.clone();
        updated.status = PaySlipStatus::Approved;
        if updated.approved_at.is_none() {
            updated.approved_by = Some(approver.to_string());
            updated.approved_at = Some(at);
        }
        updated.updated_at = at;
        records.put_pay_slip_if(updated, slip.version)?;
    }
    Ok(())
}

/// Force-transitions every slip owned by the run to `Paid`.
pub(crate) fn cascade_pay_slips(
    records: &mut Records,
    run_id: &str,
    at: DateTime<Utc>,
) -> EngineResult<()> {
    let ids: Vec<String> = records
        .pay_slips_for_run(run_id)
        .iter()
        .map(|slip| slip.id.clone())
        .collect();

    for id in ids {
        let Some(slip) = records.pay_slip(&id).cloned() else {
            continue;
        };
        if slip.status == PaySlipStatus::Paid {
            continue;
        }
        let mut updated = slip.clone();
        updated.status = PaySlipStatus::Paid;
        if updated.paid_at.is_none() {
            updated.paid_at = Some(at);
        }
        updated.updated_at = at;
        records.put_pay_slip_if(updated, slip.version)?;
    }
    Ok(())
}

/// Recomputes a run's denormalized totals from its owned slips. A run
/// past its edit window keeps the totals it was approved with.
pub(crate) fn refresh_run_aggregates(
    records: &mut Records,
    run_id: &str,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    let Some(run) = records.pay_run(run_id).cloned() else {
        return Ok(());
    };
    if !run.status.allows_field_edits() {
        return Ok(());
    }

    let slips = records.pay_slips_for_run(run_id);
    let employees: BTreeSet<&str> = slips.iter().map(|s| s.employee_id.as_str()).collect();
    let total_gross = slips.iter().map(|s| s.gross_pay).sum();
    let total_net = slips.iter().map(|s| s.net_pay).sum();
    let total_employees = employees.len() as u32;

    let mut updated = run.clone();
    updated.total_employees = total_employees;
    updated.total_gross = total_gross;
    updated.total_net = total_net;
    updated.updated_at = now;
    records.put_pay_run_if(updated, run.version)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::engine::pay_slips::NewPaySlip;
    use crate::engine::PaySlipPatch;
    use crate::models::{CalcType, PayComponent};
    use crate::store::MemoryGateway;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Arc;

    fn engine() -> Engine<MemoryGateway> {
        Engine::new(MemoryGateway::new(), Arc::new(MemoryAuditSink::new()))
    }

    fn new_run() -> NewPayRun {
        NewPayRun {
            run_number: "PR-2026-001".to_string(),
            period_start: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            pay_date: NaiveDate::from_ymd_opt(2026, 2, 5).unwrap(),
        }
    }

    fn earning(amount: &str) -> PayComponent {
        PayComponent {
            name: "Basic Salary".to_string(),
            calc_type: CalcType::Fixed,
            amount: Decimal::from_str(amount).unwrap(),
        }
    }

    fn new_slip(employee: &str, run_id: &str, amount: &str) -> NewPaySlip {
        NewPaySlip {
            employee_id: employee.to_string(),
            pay_run_id: Some(run_id.to_string()),
            period_start: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            working_days: 22,
            earnings: vec![earning(amount)],
            deductions: vec![],
        }
    }

    fn status_patch(status: PayRunStatus) -> PayRunPatch {
        PayRunPatch {
            status: Some(status),
            ..Default::default()
        }
    }

    fn run_to_completed(engine: &Engine<MemoryGateway>, id: &str) {
        engine
            .update_pay_run("system", id, status_patch(PayRunStatus::Processing))
            .unwrap();
        engine
            .update_pay_run("system", id, status_patch(PayRunStatus::Completed))
            .unwrap();
    }

    #[test]
    fn test_create_starts_in_draft_with_zero_totals() {
        let engine = engine();
        let run = engine.create_pay_run("alice", new_run()).unwrap();

        assert_eq!(run.status, PayRunStatus::Draft);
        assert_eq!(run.total_employees, 0);
        assert_eq!(run.total_gross, Decimal::ZERO);
        assert_eq!(run.version, 1);
    }

    #[test]
    fn test_create_rejects_inverted_period() {
        let engine = engine();
        let mut new = new_run();
        new.period_end = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();

        let err = engine.create_pay_run("alice", new).unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
    }

    #[test]
    fn test_slip_creation_refreshes_run_totals() {
        let engine = engine();
        let run = engine.create_pay_run("alice", new_run()).unwrap();
        engine
            .create_pay_slip("alice", new_slip("emp_001", &run.id, "2500"))
            .unwrap();
        engine
            .create_pay_slip("alice", new_slip("emp_002", &run.id, "1800"))
            .unwrap();

        let run = engine.pay_run(&run.id).unwrap();
        assert_eq!(run.total_employees, 2);
        assert_eq!(run.total_gross, Decimal::from_str("4300").unwrap());
        assert_eq!(run.total_net, Decimal::from_str("4300").unwrap());
    }

    #[test]
    fn test_lifecycle_transitions_and_stamps() {
        let engine = engine();
        let run = engine.create_pay_run("alice", new_run()).unwrap();
        run_to_completed(&engine, &run.id);

        let completed = engine.pay_run(&run.id).unwrap();
        assert_eq!(completed.status, PayRunStatus::Completed);
        assert!(completed.completed_at.is_some());

        let approved = engine
            .update_pay_run("boss", &run.id, status_patch(PayRunStatus::Approved))
            .unwrap();
        assert_eq!(approved.approved_by.as_deref(), Some("boss"));
        assert!(approved.approved_at.is_some());

        let paid = engine
            .update_pay_run("boss", &run.id, status_patch(PayRunStatus::Paid))
            .unwrap();
        assert!(paid.paid_at.is_some());
    }

    #[test]
    fn test_transition_skipping_states_rejected() {
        let engine = engine();
        let run = engine.create_pay_run("alice", new_run()).unwrap();

        let err = engine
            .update_pay_run("alice", &run.id, status_patch(PayRunStatus::Approved))
            .unwrap_err();
        match err {
            EngineError::InvalidTransition { from, to } => {
                assert_eq!(from, "draft");
                assert_eq!(to, "approved");
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }

    #[test]
    fn test_approval_cascades_to_all_slips_with_same_stamp() {
        let engine = engine();
        let run = engine.create_pay_run("alice", new_run()).unwrap();
        let mut slip_ids = Vec::new();
        for (employee, amount) in [("emp_001", "2500"), ("emp_002", "1800"), ("emp_003", "2100")] {
            let slip = engine
                .create_pay_slip("alice", new_slip(employee, &run.id, amount))
                .unwrap();
            engine
                .update_pay_slip(
                    "alice",
                    &slip.id,
                    PaySlipPatch {
                        status: Some(PaySlipStatus::Processed),
                        ..Default::default()
                    },
                )
                .unwrap();
            slip_ids.push(slip.id);
        }
        run_to_completed(&engine, &run.id);

        let approved = engine
            .update_pay_run("boss", &run.id, status_patch(PayRunStatus::Approved))
            .unwrap();

        for slip_id in &slip_ids {
            let slip = engine.pay_slip(slip_id).unwrap();
            assert_eq!(slip.status, PaySlipStatus::Approved);
            assert_eq!(slip.approved_by.as_deref(), Some("boss"));
            assert_eq!(slip.approved_at, approved.approved_at);
        }
    }

    #[test]
    fn test_paying_run_cascades_paid_to_slips() {
        let engine = engine();
        let run = engine.create_pay_run("alice", new_run()).unwrap();
        let slip = engine
            .create_pay_slip("alice", new_slip("emp_001", &run.id, "2500"))
            .unwrap();
        run_to_completed(&engine, &run.id);
        engine
            .update_pay_run("boss", &run.id, status_patch(PayRunStatus::Approved))
            .unwrap();
        engine
            .update_pay_run("boss", &run.id, status_patch(PayRunStatus::Paid))
            .unwrap();

        let slip = engine.pay_slip(&slip.id).unwrap();
        assert_eq!(slip.status, PaySlipStatus::Paid);
        assert!(slip.paid_at.is_some());
    }

    #[test]
    fn test_field_edits_blocked_after_approval() {
        let engine = engine();
        let run = engine.create_pay_run("alice", new_run()).unwrap();
        run_to_completed(&engine, &run.id);
        engine
            .update_pay_run("boss", &run.id, status_patch(PayRunStatus::Approved))
            .unwrap();

        let err = engine
            .update_pay_run(
                "alice",
                &run.id,
                PayRunPatch {
                    run_number: Some("PR-2026-099".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::ImmutableRecord { .. }));
    }

    #[test]
    fn test_delete_allowed_only_for_empty_draft() {
        let engine = engine();
        let run = engine.create_pay_run("alice", new_run()).unwrap();
        engine
            .create_pay_slip("alice", new_slip("emp_001", &run.id, "2500"))
            .unwrap();

        let err = engine.delete_pay_run("alice", &run.id).unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));

        let empty = engine.create_pay_run("alice", new_run()).unwrap();
        engine.delete_pay_run("alice", &empty.id).unwrap();
        assert!(matches!(
            engine.pay_run(&empty.id),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_blocked_outside_draft() {
        let engine = engine();
        let run = engine.create_pay_run("alice", new_run()).unwrap();
        engine
            .update_pay_run("alice", &run.id, status_patch(PayRunStatus::Processing))
            .unwrap();

        let err = engine.delete_pay_run("alice", &run.id).unwrap_err();
        assert!(matches!(err, EngineError::ImmutableRecord { .. }));
    }

    #[test]
    fn test_totals_frozen_after_approval() {
        let engine = engine();
        let run = engine.create_pay_run("alice", new_run()).unwrap();
        engine
            .create_pay_slip("alice", new_slip("emp_001", &run.id, "2500"))
            .unwrap();
        run_to_completed(&engine, &run.id);
        engine
            .update_pay_run("boss", &run.id, status_patch(PayRunStatus::Approved))
            .unwrap();

        let before = engine.pay_run(&run.id).unwrap();
        // Paying the run cascades to slips but must not rewrite totals.
        engine
            .update_pay_run("boss", &run.id, status_patch(PayRunStatus::Paid))
            .unwrap();
        let after = engine.pay_run(&run.id).unwrap();
        assert_eq!(before.total_gross, after.total_gross);
        assert_eq!(before.total_employees, after.total_employees);
    }
}
