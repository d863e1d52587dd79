//! Overtime record operations.
//!
//! Overtime pay is derived, never stored directly: the rate is the
//! basic hourly rate times the fixed type multiplier and the pay is
//! hours times that rate. Any edit to hours, type or rate recomputes
//! both.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::audit::AuditEntry;
use crate::calculation::{overtime_pay, overtime_rate};
use crate::error::{EngineError, EngineResult};
use crate::models::{OvertimeRecord, OvertimeStatus, OvertimeType};
use crate::store::Gateway;

use super::Engine;

/// Minimum overtime hours per record.
const MIN_HOURS: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
/// Maximum overtime hours per record.
const MAX_HOURS: Decimal = Decimal::from_parts(24, 0, 0, false, 0);

/// Input for recording overtime.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOvertime {
    /// The employee who worked the overtime.
    pub employee_id: String,
    /// The date the overtime was worked.
    pub work_date: NaiveDate,
    /// Overtime hours worked, between 0.5 and 24.
    pub hours: Decimal,
    /// The overtime category. Defaults to regular when absent.
    #[serde(default)]
    pub overtime_type: OvertimeType,
    /// The employee's basic hourly rate.
    pub hourly_rate: Decimal,
}

/// A partial update to an overtime record. Absent fields are left
/// unchanged; changing hours, type or rate recomputes the pay.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OvertimePatch {
    /// Requested status transition.
    pub status: Option<OvertimeStatus>,
    /// New work date.
    pub work_date: Option<NaiveDate>,
    /// New hours worked.
    pub hours: Option<Decimal>,
    /// New overtime category.
    pub overtime_type: Option<OvertimeType>,
    /// New basic hourly rate.
    pub hourly_rate: Option<Decimal>,
    /// Approver notes.
    pub approval_notes: Option<String>,
}

impl OvertimePatch {
    fn has_field_edits(&self) -> bool {
        self.work_date.is_some()
            || self.hours.is_some()
            || self.overtime_type.is_some()
            || self.hourly_rate.is_some()
    }
}

fn validate_hours(hours: Decimal) -> EngineResult<()> {
    if hours < MIN_HOURS || hours > MAX_HOURS {
        return Err(EngineError::validation(
            "hours",
            "overtime hours must be between 0.5 and 24",
        ));
    }
    Ok(())
}

fn validate_hourly_rate(rate: Decimal) -> EngineResult<()> {
    if rate <= Decimal::ZERO {
        return Err(EngineError::validation(
            "hourly_rate",
            "hourly rate must be positive",
        ));
    }
    Ok(())
}

impl<G: Gateway> Engine<G> {
    /// Fetches one overtime record by id.
    pub fn overtime_record(&self, id: &str) -> EngineResult<OvertimeRecord> {
        self.gateway()
            .snapshot(|records| records.overtime_record(id).cloned())
            .ok_or_else(|| EngineError::not_found("overtime_record", id))
    }

    /// Records overtime in `Pending` status with the premium pay
    /// computed from the fixed multiplier table.
    pub fn create_overtime(&self, actor: &str, new: NewOvertime) -> EngineResult<OvertimeRecord> {
        validate_hours(new.hours)?;
        validate_hourly_rate(new.hourly_rate)?;

        let rate = overtime_rate(new.overtime_type, new.hourly_rate);
        let pay = overtime_pay(new.hours, rate);
        let now = Utc::now();
        let record = OvertimeRecord {
            id: Uuid::new_v4().to_string(),
            employee_id: new.employee_id,
            work_date: new.work_date,
            hours: new.hours,
            overtime_type: new.overtime_type,
            hourly_rate: new.hourly_rate,
            overtime_rate: rate,
            overtime_pay: pay,
            status: OvertimeStatus::Pending,
            approved_by: None,
            approved_at: None,
            approval_notes: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let stored = self
            .gateway()
            .commit(|records| Ok(records.insert_overtime(record.clone())))?;

        info!(
            overtime_id = %stored.id,
            employee_id = %stored.employee_id,
            overtime_pay = %stored.overtime_pay,
            "Overtime recorded"
        );
        self.record_audit(AuditEntry::new(
            actor,
            "overtime_record",
            &stored.id,
            "create",
            json!({
                "employee_id": stored.employee_id,
                "overtime_pay": stored.overtime_pay.to_string(),
            }),
        ));
        Ok(stored)
    }

    /// Applies a partial update to an overtime record.
    pub fn update_overtime(
        &self,
        actor: &str,
        id: &str,
        patch: OvertimePatch,
    ) -> EngineResult<OvertimeRecord> {
        let current = self.overtime_record(id)?;
        let updated = apply_patch(&current, &patch, actor, Utc::now())?;

        let stored = self
            .gateway()
            .commit(|records| records.put_overtime_if(updated.clone(), current.version))?;

        info!(
            overtime_id = %stored.id,
            from = %current.status,
            to = %stored.status,
            "Overtime record updated"
        );
        self.record_audit(
            AuditEntry::new(
                actor,
                "overtime_record",
                &stored.id,
                "update",
                json!({ "overtime_pay": stored.overtime_pay.to_string() }),
            )
            .with_statuses(current.status, stored.status),
        );
        Ok(stored)
    }

    /// Deletes an overtime record. Blocked once the record is paid.
    pub fn delete_overtime(&self, actor: &str, id: &str) -> EngineResult<()> {
        let current = self.overtime_record(id)?;
        if current.status == OvertimeStatus::Paid {
            return Err(EngineError::ImmutableRecord {
                kind: "overtime_record".to_string(),
                id: id.to_string(),
            });
        }

        self.gateway().commit(|records| {
            match records.overtime_record(id) {
                Some(record) if record.version == current.version => {}
                _ => {
                    return Err(EngineError::ConcurrentModification {
                        kind: "overtime_record".to_string(),
                        id: id.to_string(),
                    });
                }
            }
            records.remove_overtime(id);
            Ok(())
        })?;

        info!(overtime_id = %id, "Overtime record deleted");
        self.record_audit(AuditEntry::new(
            actor,
            "overtime_record",
            id,
            "delete",
            json!({}),
        ));
        Ok(())
    }
}

fn apply_patch(
    current: &OvertimeRecord,
    patch: &OvertimePatch,
    actor: &str,
    now: DateTime<Utc>,
) -> EngineResult<OvertimeRecord> {
    if current.status.is_terminal() {
        return Err(EngineError::ImmutableRecord {
            kind: "overtime_record".to_string(),
            id: current.id.clone(),
        });
    }
    if patch.has_field_edits() && !current.status.allows_field_edits() {
        return Err(EngineError::ImmutableRecord {
            kind: "overtime_record".to_string(),
            id: current.id.clone(),
        });
    }

    let mut updated = current.clone();
    if let Some(work_date) = patch.work_date {
        updated.work_date = work_date;
    }
    if let Some(hours) = patch.hours {
        validate_hours(hours)?;
        updated.hours = hours;
    }
    if let Some(overtime_type) = patch.overtime_type {
        updated.overtime_type = overtime_type;
    }
    if let Some(hourly_rate) = patch.hourly_rate {
        validate_hourly_rate(hourly_rate)?;
        updated.hourly_rate = hourly_rate;
    }
    if patch.has_field_edits() {
        updated.overtime_rate = overtime_rate(updated.overtime_type, updated.hourly_rate);
        updated.overtime_pay = overtime_pay(updated.hours, updated.overtime_rate);
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
                OvertimeStatus::Approved | OvertimeStatus::Rejected => {
                    if updated.approved_at.is_none() {
                        updated.approved_by = Some(actor.to_string());
                        updated.approved_at = Some(now);
                    }
                }
                OvertimeStatus::Paid => {
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
