//! Employee loan operations.
//!
//! Loan terms are validated at the edges (principal positive, rate
//! 0-50%, term 1-120 months); the amortization itself lives in
//! [`crate::calculation::loan_schedule`]. Payments accumulate against
//! the total repayable amount and auto-close the loan when it is fully
//! repaid. An overpayment is capped at the total; the excess is
//! dropped, matching the observed payroll policy.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::audit::AuditEntry;
use crate::calculation::loan_installments;
use crate::error::{EngineError, EngineResult};
use crate::models::{EmployeeLoan, LoanStatus};
use crate::store::Gateway;

use super::Engine;

/// Maximum annual interest rate in percent.
const MAX_INTEREST_RATE: Decimal = Decimal::from_parts(50, 0, 0, false, 0);
/// Maximum repayment term in months.
const MAX_TERM_MONTHS: u32 = 120;

/// Input for requesting a loan.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLoan {
    /// The employee requesting the loan.
    pub employee_id: String,
    /// Human-facing loan number.
    pub loan_number: String,
    /// The amount to advance.
    pub principal: Decimal,
    /// Annual interest rate in percent, 0 to 50.
    pub interest_rate: Decimal,
    /// Repayment term in months, 1 to 120.
    pub term_months: u32,
    /// Why the employee requested the loan.
    pub reason: Option<String>,
    /// Guarantor details, if any.
    pub guarantor: Option<String>,
}

/// A partial update to a loan. Absent fields are left unchanged;
/// changing principal, rate or term recomputes the schedule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoanPatch {
    /// Requested status transition.
    pub status: Option<LoanStatus>,
    /// New principal.
    pub principal: Option<Decimal>,
    /// New annual interest rate in percent.
    pub interest_rate: Option<Decimal>,
    /// New repayment term in months.
    pub term_months: Option<u32>,
    /// New reason.
    pub reason: Option<String>,
    /// New guarantor details.
    pub guarantor: Option<String>,
    /// Approver notes.
    pub approval_notes: Option<String>,
}

impl LoanPatch {
    fn has_field_edits(&self) -> bool {
        self.principal.is_some()
            || self.interest_rate.is_some()
            || self.term_months.is_some()
            || self.reason.is_some()
            || self.guarantor.is_some()
    }

    fn reschedules(&self) -> bool {
        self.principal.is_some() || self.interest_rate.is_some() || self.term_months.is_some()
    }
}

fn validate_terms(principal: Decimal, interest_rate: Decimal, term_months: u32) -> EngineResult<()> {
    if principal <= Decimal::ZERO {
        return Err(EngineError::validation(
            "principal",
            "loan amount must be positive",
        ));
    }
    if interest_rate < Decimal::ZERO || interest_rate > MAX_INTEREST_RATE {
        return Err(EngineError::validation(
            "interest_rate",
            "interest rate must be between 0 and 50 percent",
        ));
    }
    if term_months < 1 || term_months > MAX_TERM_MONTHS {
        return Err(EngineError::validation(
            "term_months",
            "repayment term must be between 1 and 120 months",
        ));
    }
    Ok(())
}

impl<G: Gateway> Engine<G> {
    /// Fetches one loan by id.
    pub fn loan(&self, id: &str) -> EngineResult<EmployeeLoan> {
        self.gateway()
            .snapshot(|records| records.loan(id).cloned())
            .ok_or_else(|| EngineError::not_found("employee_loan", id))
    }

    /// Creates a loan request in `Pending` status with its computed
    /// repayment schedule.
    pub fn create_loan(&self, actor: &str, new: NewLoan) -> EngineResult<EmployeeLoan> {
        validate_terms(new.principal, new.interest_rate, new.term_months)?;

        let schedule = loan_installments(new.principal, new.term_months, new.interest_rate);
        let now = Utc::now();
        let loan = EmployeeLoan {
            id: Uuid::new_v4().to_string(),
            employee_id: new.employee_id,
            loan_number: new.loan_number,
            principal: new.principal,
            interest_rate: new.interest_rate,
            term_months: new.term_months,
            monthly_installment: schedule.installment,
            total_amount: schedule.total,
            amount_paid: Decimal::ZERO,
            status: LoanStatus::Pending,
            approved_by: None,
            approved_at: None,
            approval_notes: None,
            disbursed_at: None,
            closed_at: None,
            reason: new.reason,
            guarantor: new.guarantor,
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let stored = self
            .gateway()
            .commit(|records| Ok(records.insert_loan(loan.clone())))?;

        info!(
            loan_id = %stored.id,
            employee_id = %stored.employee_id,
            principal = %stored.principal,
            installment = %stored.monthly_installment,
            "Loan requested"
        );
        self.record_audit(AuditEntry::new(
            actor,
            "employee_loan",
            &stored.id,
            "create",
            json!({
                "employee_id": stored.employee_id,
                "principal": stored.principal.to_string(),
                "total_amount": stored.total_amount.to_string(),
            }),
        ));
        Ok(stored)
    }

    /// Applies a partial update to a loan.
    pub fn update_loan(&self, actor: &str, id: &str, patch: LoanPatch) -> EngineResult<EmployeeLoan> {
        let current = self.loan(id)?;
        let updated = apply_patch(&current, &patch, actor, Utc::now())?;

        let stored = self
            .gateway()
            .commit(|records| records.put_loan_if(updated.clone(), current.version))?;

        info!(
            loan_id = %stored.id,
            from = %current.status,
            to = %stored.status,
            "Loan updated"
        );
        self.record_audit(
            AuditEntry::new(actor, "employee_loan", &stored.id, "update", json!({}))
                .with_statuses(current.status, stored.status),
        );
        Ok(stored)
    }

    /// Records a repayment against a disbursed loan.
    ///
    /// The paid amount is capped at the total repayable amount; any
    /// excess is dropped. Reaching the total closes the loan and stamps
    /// `closed_at`. The status and balance are re-checked inside the
    /// transaction, so two concurrent payments cannot both apply
    /// against the same starting balance.
    pub fn record_loan_payment(
        &self,
        actor: &str,
        id: &str,
        amount: Decimal,
    ) -> EngineResult<EmployeeLoan> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::validation(
                "amount",
                "payment amount must be positive",
            ));
        }
        let current = self.loan(id)?;
        if current.status != LoanStatus::Disbursed {
            return Err(EngineError::validation(
                "status",
                "payments can only be recorded against a disbursed loan",
            ));
        }

        let now = Utc::now();
        let mut updated = current.clone();
        updated.amount_paid = (current.amount_paid + amount).min(current.total_amount);
        if updated.amount_paid >= updated.total_amount {
            updated.status = LoanStatus::Closed;
            updated.closed_at = Some(now);
        }
        updated.updated_at = now;

        let stored = self
            .gateway()
            .commit(|records| records.put_loan_if(updated.clone(), current.version))?;

        info!(
            loan_id = %stored.id,
            amount = %amount,
            amount_paid = %stored.amount_paid,
            status = %stored.status,
            "Loan payment recorded"
        );
        self.record_audit(
            AuditEntry::new(
                actor,
                "employee_loan",
                &stored.id,
                "record_payment",
                json!({
                    "amount": amount.to_string(),
                    "amount_paid": stored.amount_paid.to_string(),
                }),
            )
            .with_statuses(current.status, stored.status),
        );
        Ok(stored)
    }

    /// Deletes a loan. Blocked once any payment has been recorded.
    pub fn delete_loan(&self, actor: &str, id: &str) -> EngineResult<()> {
        let current = self.loan(id)?;
        if current.amount_paid > Decimal::ZERO {
            return Err(EngineError::ImmutableRecord {
                kind: "employee_loan".to_string(),
                id: id.to_string(),
            });
        }

        self.gateway().commit(|records| {
            match records.loan(id) {
                Some(loan) if loan.version == current.version => {}
                _ => {
                    return Err(EngineError::ConcurrentModification {
                        kind: "employee_loan".to_string(),
                        id: id.to_string(),
                    });
                }
            }
            records.remove_loan(id);
            Ok(())
        })?;

        info!(loan_id = %id, "Loan deleted");
        self.record_audit(AuditEntry::new(
            actor,
            "employee_loan",
            id,
            "delete",
            json!({}),
        ));
        Ok(())
    }
}

fn apply_patch(
    current: &EmployeeLoan,
    patch: &LoanPatch,
    actor: &str,
    now: DateTime<Utc>,
) -> EngineResult<EmployeeLoan> {
    if current.status.is_terminal() {
        return Err(EngineError::ImmutableRecord {
            kind: "employee_loan".to_string(),
            id: current.id.clone(),
        });
    }
    if patch.has_field_edits() && !current.status.allows_field_edits() {
        return Err(EngineError::ImmutableRecord {
            kind: "employee_loan".to_string(),
            id: current.id.clone(),
        });
    }

    let mut updated = current.clone();
    if let Some(principal) = patch.principal {
        updated.principal = principal;
    }
    if let Some(interest_rate) = patch.interest_rate {
        updated.interest_rate = interest_rate;
    }
    if let Some(term_months) = patch.term_months {
        updated.term_months = term_months;
    }
    if patch.reschedules() {
        validate_terms(updated.principal, updated.interest_rate, updated.term_months)?;
        let schedule =
            loan_installments(updated.principal, updated.term_months, updated.interest_rate);
        updated.monthly_installment = schedule.installment;
        updated.total_amount = schedule.total;
    }
    if let Some(reason) = &patch.reason {
        updated.reason = Some(reason.clone());
    }
    if let Some(guarantor) = &patch.guarantor {
        updated.guarantor = Some(guarantor.clone());
    }
    if let Some(notes) = &patch.approval_notes {
        updated.approval_notes = Some(notes.clone());
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
                LoanStatus::Approved | LoanStatus::Rejected => {
                    if updated.approved_at.is_none() {
                        updated.approved_by = Some(actor.to_string());
                        updated.approved_at = Some(now);
                    }
                }
                LoanStatus::Disbursed => {
                    if updated.disbursed_at.is_none() {
                        updated.disbursed_at = Some(now);
                    }
                }
                LoanStatus::Closed => {
                    if updated.closed_at.is_none() {
                        updated.closed_at = Some(now);
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
    use crate::store::MemoryGateway;
    use std::str::FromStr;
    use std::sync::Arc;

    fn engine() -> Engine<MemoryGateway> {
        Engine::new(MemoryGateway::new(), Arc::new(MemoryAuditSink::new()))
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn new_loan(principal: &str, rate: &str, months: u32) -> NewLoan {
        NewLoan {
            employee_id: "emp_001".to_string(),
            loan_number: "LN-2026-001".to_string(),
            principal: dec(principal),
            interest_rate: dec(rate),
            term_months: months,
            reason: Some("medical".to_string()),
            guarantor: None,
        }
    }

    fn status_patch(status: LoanStatus) -> LoanPatch {
        LoanPatch {
            status: Some(status),
            ..Default::default()
        }
    }

    fn disbursed_loan(engine: &Engine<MemoryGateway>, principal: &str) -> EmployeeLoan {
        let loan = engine
            .create_loan("alice", new_loan(principal, "0", 12))
            .unwrap();
        engine
            .update_loan("boss", &loan.id, status_patch(LoanStatus::Approved))
            .unwrap();
        engine
            .update_loan("finance", &loan.id, status_patch(LoanStatus::Disbursed))
            .unwrap()
    }

    #[test]
    fn test_create_computes_schedule() {
        let engine = engine();
        let loan = engine.create_loan("alice", new_loan("12000", "0", 12)).unwrap();

        assert_eq!(loan.status, LoanStatus::Pending);
        assert_eq!(loan.monthly_installment, dec("1000.00"));
        assert_eq!(loan.total_amount, dec("12000.00"));
        assert_eq!(loan.amount_paid, Decimal::ZERO);
    }

    #[test]
    fn test_create_rejects_out_of_range_terms() {
        let engine = engine();

        for bad in [
            new_loan("0", "10", 12),
            new_loan("5000", "51", 12),
            new_loan("5000", "-1", 12),
            new_loan("5000", "10", 0),
            new_loan("5000", "10", 121),
        ] {
            let err = engine.create_loan("alice", bad).unwrap_err();
            assert!(matches!(err, EngineError::Validation { .. }));
        }
    }

    #[test]
    fn test_editing_terms_recomputes_schedule() {
        let engine = engine();
        let loan = engine.create_loan("alice", new_loan("12000", "0", 12)).unwrap();

        let updated = engine
            .update_loan(
                "alice",
                &loan.id,
                LoanPatch {
                    term_months: Some(24),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.monthly_installment, dec("500.00"));
        assert_eq!(updated.total_amount, dec("12000.00"));
    }

    #[test]
    fn test_pending_to_closed_rejected() {
        let engine = engine();
        let loan = engine.create_loan("alice", new_loan("6000", "0", 12)).unwrap();

        let err = engine
            .update_loan("alice", &loan.id, status_patch(LoanStatus::Closed))
            .unwrap_err();
        match err {
            EngineError::InvalidTransition { from, to } => {
                assert_eq!(from, "pending");
                assert_eq!(to, "closed");
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }

    #[test]
    fn test_disbursement_stamps_timestamp() {
        let engine = engine();
        let loan = disbursed_loan(&engine, "6000");

        assert_eq!(loan.status, LoanStatus::Disbursed);
        assert!(loan.disbursed_at.is_some());
    }

    #[test]
    fn test_payment_accumulates() {
        let engine = engine();
        let loan = disbursed_loan(&engine, "6000");

        let after = engine.record_loan_payment("payroll", &loan.id, dec("500")).unwrap();
        assert_eq!(after.amount_paid, dec("500"));
        assert_eq!(after.status, LoanStatus::Disbursed);
        assert_eq!(after.remaining_balance(), dec("5500.00"));
    }

    #[test]
    fn test_overpayment_caps_and_auto_closes() {
        let engine = engine();
        let loan = disbursed_loan(&engine, "6000");
        engine.record_loan_payment("payroll", &loan.id, dec("5500")).unwrap();

        let closed = engine.record_loan_payment("payroll", &loan.id, dec("600")).unwrap();

        assert_eq!(closed.amount_paid, dec("6000.00"));
        assert_eq!(closed.status, LoanStatus::Closed);
        assert!(closed.closed_at.is_some());
    }

    #[test]
    fn test_exact_final_payment_closes() {
        let engine = engine();
        let loan = disbursed_loan(&engine, "6000");

        let closed = engine.record_loan_payment("payroll", &loan.id, dec("6000")).unwrap();
        assert_eq!(closed.status, LoanStatus::Closed);
    }

    #[test]
    fn test_payment_rejected_before_disbursement() {
        let engine = engine();
        let loan = engine.create_loan("alice", new_loan("6000", "0", 12)).unwrap();

        let err = engine
            .record_loan_payment("payroll", &loan.id, dec("500"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
    }

    #[test]
    fn test_payment_rejected_after_close() {
        let engine = engine();
        let loan = disbursed_loan(&engine, "6000");
        engine.record_loan_payment("payroll", &loan.id, dec("6000")).unwrap();

        let err = engine
            .record_loan_payment("payroll", &loan.id, dec("100"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
    }

    #[test]
    fn test_delete_blocked_once_payments_exist() {
        let engine = engine();
        let loan = disbursed_loan(&engine, "6000");
        engine.record_loan_payment("payroll", &loan.id, dec("500")).unwrap();

        let err = engine.delete_loan("alice", &loan.id).unwrap_err();
        assert!(matches!(err, EngineError::ImmutableRecord { .. }));
    }

    #[test]
    fn test_delete_allowed_before_payments() {
        let engine = engine();
        let loan = engine.create_loan("alice", new_loan("6000", "0", 12)).unwrap();

        engine.delete_loan("alice", &loan.id).unwrap();
        assert!(matches!(
            engine.loan(&loan.id),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn test_terms_frozen_after_approval() {
        let engine = engine();
        let loan = engine.create_loan("alice", new_loan("6000", "0", 12)).unwrap();
        engine
            .update_loan("boss", &loan.id, status_patch(LoanStatus::Approved))
            .unwrap();

        let err = engine
            .update_loan(
                "alice",
                &loan.id,
                LoanPatch {
                    principal: Some(dec("9000")),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::ImmutableRecord { .. }));
    }
}
