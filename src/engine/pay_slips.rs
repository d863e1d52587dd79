//! Pay slip operations.
//!
//! The pay slip aggregator: given a slip's current earnings and
//! deductions plus a partial update, it produces a new consistent
//! snapshot or rejects the whole update. Totals are recomputed whenever
//! line items are replaced, the non-negative net pay guard is applied on
//! every recompute, and approval/payment stamps are written at most
//! once.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::audit::AuditEntry;
use crate::calculation::compute_totals;
use crate::error::{EngineError, EngineResult};
use crate::models::{PayComponent, PaySlip, PaySlipStatus};
use crate::store::Gateway;

use super::Engine;
use super::pay_runs::refresh_run_aggregates;

/// Input for creating a pay slip.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPaySlip {
    /// The employee the slip is for.
    pub employee_id: String,
    /// The owning pay run, if any. `None` creates a standalone slip.
    pub pay_run_id: Option<String>,
    /// First day of the pay period.
    pub period_start: NaiveDate,
    /// Last day of the pay period.
    pub period_end: NaiveDate,
    /// Number of days worked in the period.
    pub working_days: u32,
    /// Earning line items.
    #[serde(default)]
    pub earnings: Vec<PayComponent>,
    /// Deduction line items.
    #[serde(default)]
    pub deductions: Vec<PayComponent>,
}

/// A partial update to a pay slip. Absent fields are left unchanged;
/// replacing earnings or deductions recomputes all totals.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaySlipPatch {
    /// Requested status transition.
    pub status: Option<PaySlipStatus>,
    /// New number of working days.
    pub working_days: Option<u32>,
    /// Replacement earning line items.
    pub earnings: Option<Vec<PayComponent>>,
    /// Replacement deduction line items.
    pub deductions: Option<Vec<PayComponent>>,
}

impl PaySlipPatch {
    fn has_field_edits(&self) -> bool {
        self.working_days.is_some() || self.earnings.is_some() || self.deductions.is_some()
    }

    fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.status.is_some() {
            fields.push("status");
        }
        if self.working_days.is_some() {
            fields.push("working_days");
        }
        if self.earnings.is_some() {
            fields.push("earnings");
        }
        if self.deductions.is_some() {
            fields.push("deductions");
        }
        fields
    }
}

impl<G: Gateway> Engine<G> {
    /// Fetches one pay slip by id.
    pub fn pay_slip(&self, id: &str) -> EngineResult<PaySlip> {
        self.gateway()
            .snapshot(|records| records.pay_slip(id).cloned())
            .ok_or_else(|| EngineError::not_found("pay_slip", id))
    }

    /// Creates a pay slip in `Draft` status with computed totals.
    ///
    /// A slip linked to a pay run refreshes that run's denormalized
    /// totals in the same transaction; the run must still be editable.
    pub fn create_pay_slip(&self, actor: &str, new: NewPaySlip) -> EngineResult<PaySlip> {
        if new.period_end < new.period_start {
            return Err(EngineError::validation(
                "period_end",
                "period end must not be before period start",
            ));
        }
        let totals = compute_totals(&new.earnings, &new.deductions)?;

        let now = Utc::now();
        let slip = PaySlip {
            id: Uuid::new_v4().to_string(),
            employee_id: new.employee_id,
            pay_run_id: new.pay_run_id,
            period_start: new.period_start,
            period_end: new.period_end,
            working_days: new.working_days,
            earnings: new.earnings,
            deductions: new.deductions,
            gross_pay: totals.gross_pay,
            total_deductions: totals.total_deductions,
            net_pay: totals.net_pay,
            status: PaySlipStatus::Draft,
            approved_by: None,
            approved_at: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let stored = self.gateway().commit(|records| {
            if let Some(run_id) = &slip.pay_run_id {
                let run = records
                    .pay_run(run_id)
                    .ok_or_else(|| EngineError::not_found("pay_run", run_id))?;
                if !run.status.allows_field_edits() {
                    return Err(EngineError::ImmutableRecord {
                        kind: "pay_run".to_string(),
                        id: run_id.clone(),
                    });
                }
            }
            let stored = records.insert_pay_slip(slip.clone());
            if let Some(run_id) = &stored.pay_run_id {
                refresh_run_aggregates(records, run_id, now)?;
            }
            Ok(stored)
        })?;

        info!(
            pay_slip_id = %stored.id,
            employee_id = %stored.employee_id,
            net_pay = %stored.net_pay,
            "Pay slip created"
        );
        self.record_audit(AuditEntry::new(
            actor,
            "pay_slip",
            &stored.id,
            "create",
            json!({
                "employee_id": stored.employee_id,
                "net_pay": stored.net_pay.to_string(),
            }),
        ));
        Ok(stored)
    }

    /// Applies a partial update to a pay slip.
    ///
    /// Rejections leave the stored record untouched: a recomputed
    /// negative net pay fails with `NegativeNetPay`, any edit on a paid
    /// slip fails with `ImmutableRecord`, and a status change outside
    /// the transition table fails with `InvalidTransition`.
    pub fn update_pay_slip(
        &self,
        actor: &str,
        id: &str,
        patch: PaySlipPatch,
    ) -> EngineResult<PaySlip> {
        let current = self.pay_slip(id)?;
        let updated = apply_patch(&current, &patch, actor, Utc::now())?;

        let stored = self.gateway().commit(|records| {
            let stored = records.put_pay_slip_if(updated.clone(), current.version)?;
            if let Some(run_id) = &stored.pay_run_id {
                refresh_run_aggregates(records, run_id, stored.updated_at)?;
            }
            Ok(stored)
        })?;

        info!(
            pay_slip_id = %stored.id,
            from = %current.status,
            to = %stored.status,
            net_pay = %stored.net_pay,
            "Pay slip updated"
        );
        self.record_audit(
            AuditEntry::new(
                actor,
                "pay_slip",
                &stored.id,
                "update",
                json!({ "changed": patch.changed_fields() }),
            )
            .with_statuses(current.status, stored.status),
        );
        Ok(stored)
    }

    /// Deletes a pay slip. Blocked once the slip is approved or paid.
    pub fn delete_pay_slip(&self, actor: &str, id: &str) -> EngineResult<()> {
        let current = self.pay_slip(id)?;
        if matches!(
            current.status,
            PaySlipStatus::Approved | PaySlipStatus::Paid
        ) {
            return Err(EngineError::ImmutableRecord {
                kind: "pay_slip".to_string(),
                id: id.to_string(),
            });
        }

        self.gateway().commit(|records| {
            match records.pay_slip(id) {
                Some(slip) if slip.version == current.version => {}
                _ => {
                    return Err(EngineError::ConcurrentModification {
                        kind: "pay_slip".to_string(),
                        id: id.to_string(),
                    });
                }
            }
            records.remove_pay_slip(id);
            if let Some(run_id) = &current.pay_run_id {
                refresh_run_aggregates(records, run_id, Utc::now())?;
            }
            Ok(())
        })?;

        info!(pay_slip_id = %id, "Pay slip deleted");
        self.record_audit(AuditEntry::new(actor, "pay_slip", id, "delete", json!({})));
        Ok(())
    }
}

fn apply_patch(
    current: &PaySlip,
    patch: &PaySlipPatch,
    actor: &str,
    now: DateTime<Utc>,
) -> EngineResult<PaySlip> {
    if current.status.is_terminal() {
        return Err(EngineError::ImmutableRecord {
            kind: "pay_slip".to_string(),
            id: current.id.clone(),
        });
    }
    if patch.has_field_edits() && !current.status.allows_field_edits() {
        return Err(EngineError::ImmutableRecord {
            kind: "pay_slip".to_string(),
            id: current.id.clone(),
        });
    }

    let mut updated = current.clone();
    if let Some(working_days) = patch.working_days {
        updated.working_days = working_days;
    }
    if let Some(earnings) = &patch.earnings {
        updated.earnings = earnings.clone();
    }
    if let Some(deductions) = &patch.deductions {
        updated.deductions = deductions.clone();
    }
    if patch.earnings.is_some() || patch.deductions.is_some() {
        let totals = compute_totals(&updated.earnings, &updated.deductions)?;
        updated.gross_pay = totals.gross_pay;
        updated.total_deductions = totals.total_deductions;
        updated.net_pay = totals.net_pay;
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
                PaySlipStatus::Approved => {
                    if updated.approved_at.is_none() {
                        updated.approved_by = Some(actor.to_string());
                        updated.approved_at = Some(now);
                    }
                }
                PaySlipStatus::Paid => {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::models::CalcType;
    use crate::store::MemoryGateway;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Arc;

    fn engine() -> (Engine<MemoryGateway>, MemoryAuditSink) {
        let sink = MemoryAuditSink::new();
        let engine = Engine::new(MemoryGateway::new(), Arc::new(sink.clone()));
        (engine, sink)
    }

    fn component(name: &str, amount: &str) -> PayComponent {
        PayComponent {
            name: name.to_string(),
            calc_type: CalcType::Fixed,
            amount: Decimal::from_str(amount).unwrap(),
        }
    }

    fn standalone_slip(amount: &str) -> NewPaySlip {
        NewPaySlip {
            employee_id: "emp_001".to_string(),
            pay_run_id: None,
            period_start: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            working_days: 22,
            earnings: vec![component("Basic Salary", amount)],
            deductions: vec![],
        }
    }

    fn status_patch(status: PaySlipStatus) -> PaySlipPatch {
        PaySlipPatch {
            status: Some(status),
            ..Default::default()
        }
    }

    fn slip_to_paid(engine: &Engine<MemoryGateway>, id: &str) -> PaySlip {
        engine
            .update_pay_slip("alice", id, status_patch(PaySlipStatus::Processed))
            .unwrap();
        engine
            .update_pay_slip("boss", id, status_patch(PaySlipStatus::Approved))
            .unwrap();
        engine
            .update_pay_slip("boss", id, status_patch(PaySlipStatus::Paid))
            .unwrap()
    }

    #[test]
    fn test_create_computes_totals() {
        let (engine, _) = engine();
        let mut new = standalone_slip("2500");
        new.deductions = vec![component("Income Tax", "400")];

        let slip = engine.create_pay_slip("alice", new).unwrap();

        assert_eq!(slip.status, PaySlipStatus::Draft);
        assert_eq!(slip.gross_pay, Decimal::from_str("2500").unwrap());
        assert_eq!(slip.total_deductions, Decimal::from_str("400").unwrap());
        assert_eq!(slip.net_pay, Decimal::from_str("2100").unwrap());
    }

    #[test]
    fn test_create_rejects_negative_net() {
        let (engine, _) = engine();
        let mut new = standalone_slip("1000");
        new.deductions = vec![component("Loan Repayment", "1200")];

        let err = engine.create_pay_slip("alice", new).unwrap_err();
        assert!(matches!(err, EngineError::NegativeNetPay { .. }));
    }

    #[test]
    fn test_create_linked_to_missing_run_rejected() {
        let (engine, _) = engine();
        let mut new = standalone_slip("1000");
        new.pay_run_id = Some("run_missing".to_string());

        let err = engine.create_pay_slip("alice", new).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn test_replacing_deductions_recomputes_totals() {
        let (engine, _) = engine();
        let slip = engine
            .create_pay_slip("alice", standalone_slip("2500"))
            .unwrap();

        let updated = engine
            .update_pay_slip(
                "alice",
                &slip.id,
                PaySlipPatch {
                    deductions: Some(vec![component("Income Tax", "500")]),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.total_deductions, Decimal::from_str("500").unwrap());
        assert_eq!(updated.net_pay, Decimal::from_str("2000").unwrap());
        assert_eq!(updated.version, slip.version + 1);
    }

    #[test]
    fn test_negative_net_update_leaves_record_unchanged() {
        let (engine, _) = engine();
        let slip = engine
            .create_pay_slip("alice", standalone_slip("1000"))
            .unwrap();

        let err = engine
            .update_pay_slip(
                "alice",
                &slip.id,
                PaySlipPatch {
                    deductions: Some(vec![component("Garnishment", "1200")]),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::NegativeNetPay { .. }));

        let stored = engine.pay_slip(&slip.id).unwrap();
        assert_eq!(stored, slip);
    }

    #[test]
    fn test_approval_stamps_are_idempotent() {
        let (engine, _) = engine();
        let slip = engine
            .create_pay_slip("alice", standalone_slip("2500"))
            .unwrap();
        engine
            .update_pay_slip("alice", &slip.id, status_patch(PaySlipStatus::Processed))
            .unwrap();
        let first = engine
            .update_pay_slip("boss", &slip.id, status_patch(PaySlipStatus::Approved))
            .unwrap();

        // Re-approving must not overwrite the original stamps.
        let second = engine
            .update_pay_slip("other_boss", &slip.id, status_patch(PaySlipStatus::Approved))
            .unwrap();

        assert_eq!(second.approved_by.as_deref(), Some("boss"));
        assert_eq!(second.approved_at, first.approved_at);
    }

    #[test]
    fn test_paid_slip_rejects_any_edit_unchanged() {
        let (engine, _) = engine();
        let slip = engine
            .create_pay_slip("alice", standalone_slip("2500"))
            .unwrap();
        let paid = slip_to_paid(&engine, &slip.id);

        let err = engine
            .update_pay_slip(
                "alice",
                &slip.id,
                PaySlipPatch {
                    working_days: Some(20),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::ImmutableRecord { .. }));

        // Status-only transitions past Paid are equally rejected.
        let err = engine
            .update_pay_slip("alice", &slip.id, status_patch(PaySlipStatus::Draft))
            .unwrap_err();
        assert!(matches!(err, EngineError::ImmutableRecord { .. }));

        assert_eq!(engine.pay_slip(&slip.id).unwrap(), paid);
    }

    #[test]
    fn test_field_edits_blocked_once_approved() {
        let (engine, _) = engine();
        let slip = engine
            .create_pay_slip("alice", standalone_slip("2500"))
            .unwrap();
        engine
            .update_pay_slip("alice", &slip.id, status_patch(PaySlipStatus::Processed))
            .unwrap();
        engine
            .update_pay_slip("boss", &slip.id, status_patch(PaySlipStatus::Approved))
            .unwrap();

        let err = engine
            .update_pay_slip(
                "alice",
                &slip.id,
                PaySlipPatch {
                    earnings: Some(vec![component("Basic Salary", "9999")]),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::ImmutableRecord { .. }));
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let (engine, _) = engine();
        let slip = engine
            .create_pay_slip("alice", standalone_slip("2500"))
            .unwrap();

        let err = engine
            .update_pay_slip("alice", &slip.id, status_patch(PaySlipStatus::Paid))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[test]
    fn test_delete_blocked_after_approval() {
        let (engine, _) = engine();
        let slip = engine
            .create_pay_slip("alice", standalone_slip("2500"))
            .unwrap();
        engine
            .update_pay_slip("alice", &slip.id, status_patch(PaySlipStatus::Processed))
            .unwrap();
        engine
            .update_pay_slip("boss", &slip.id, status_patch(PaySlipStatus::Approved))
            .unwrap();

        let err = engine.delete_pay_slip("alice", &slip.id).unwrap_err();
        assert!(matches!(err, EngineError::ImmutableRecord { .. }));
    }

    #[test]
    fn test_delete_draft_slip() {
        let (engine, _) = engine();
        let slip = engine
            .create_pay_slip("alice", standalone_slip("2500"))
            .unwrap();

        engine.delete_pay_slip("alice", &slip.id).unwrap();
        assert!(matches!(
            engine.pay_slip(&slip.id),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn test_update_appends_audit_entry_with_statuses() {
        let (engine, sink) = engine();
        let slip = engine
            .create_pay_slip("alice", standalone_slip("2500"))
            .unwrap();
        engine
            .update_pay_slip("alice", &slip.id, status_patch(PaySlipStatus::Processed))
            .unwrap();

        let entries = sink.entries();
        let update = entries.last().unwrap();
        assert_eq!(update.action, "update");
        assert_eq!(update.actor, "alice");
        assert_eq!(update.from_status.as_deref(), Some("draft"));
        assert_eq!(update.to_status.as_deref(), Some("processed"));
    }
}
