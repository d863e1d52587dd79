//! The persistence gateway seam.
//!
//! The engine treats storage as a transactional record store queried by
//! entity id and filters. [`Records`] is the typed record set; the
//! [`Gateway`] trait provides snapshot reads and transactional commits
//! over it. Every record carries a version number, and conditional puts
//! (`put_*_if`) are the optimistic-concurrency guard: a version that
//! moved since the caller's read aborts the whole transaction.

mod memory;

pub use memory::MemoryGateway;

use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};
use crate::models::{EmployeeLoan, OvertimeRecord, PayRun, PaySlip};

/// Gives transactional read-modify-write access to the record store.
///
/// `commit` runs the closure against a mutable view of the records and
/// makes its writes durable only if the closure returns `Ok`; an `Err`
/// rolls back everything the closure did. Cascades (pay run to pay
/// slips) rely on this to never leave partial state behind.
pub trait Gateway: Send + Sync {
    /// Runs a read-only closure against a consistent snapshot.
    fn snapshot<R>(&self, f: impl FnOnce(&Records) -> R) -> R
    where
        Self: Sized;

    /// Runs a read-modify-write closure as one transaction. Writes are
    /// applied only if the closure returns `Ok`.
    fn commit<R>(&self, f: impl FnOnce(&mut Records) -> EngineResult<R>) -> EngineResult<R>
    where
        Self: Sized;
}

/// The typed record set held by the gateway.
///
/// One map per entity kind, keyed by id. The `put_*_if` methods are the
/// only way to overwrite an existing record; they enforce the version
/// precondition and bump the version on success.
#[derive(Debug, Clone, Default)]
pub struct Records {
    pay_runs: BTreeMap<String, PayRun>,
    pay_slips: BTreeMap<String, PaySlip>,
    overtime: BTreeMap<String, OvertimeRecord>,
    loans: BTreeMap<String, EmployeeLoan>,
}

macro_rules! record_accessors {
    ($kind:literal, $map:ident, $ty:ty, $get:ident, $iter:ident, $insert:ident, $put_if:ident, $remove:ident) => {
        /// Looks up one record by id.
        pub fn $get(&self, id: &str) -> Option<&$ty> {
            self.$map.get(id)
        }

        /// Iterates all records of this kind in id order.
        pub fn $iter(&self) -> impl Iterator<Item = &$ty> {
            self.$map.values()
        }

        /// Inserts a newly created record at version 1.
        pub fn $insert(&mut self, mut record: $ty) -> $ty {
            record.version = 1;
            self.$map.insert(record.id.clone(), record.clone());
            record
        }

        /// Overwrites an existing record if its stored version still
        /// matches `expected_version`; bumps the version on success.
        pub fn $put_if(&mut self, mut record: $ty, expected_version: u64) -> EngineResult<$ty> {
            let stale = EngineError::ConcurrentModification {
                kind: $kind.to_string(),
                id: record.id.clone(),
            };
            match self.$map.get(&record.id) {
                Some(current) if current.version == expected_version => {
                    record.version = expected_version + 1;
                    self.$map.insert(record.id.clone(), record.clone());
                    Ok(record)
                }
                _ => Err(stale),
            }
        }

        /// Removes a record by id, returning it if present.
        pub fn $remove(&mut self, id: &str) -> Option<$ty> {
            self.$map.remove(id)
        }
    };
}

impl Records {
    record_accessors!(
        "pay_run", pay_runs, PayRun, pay_run, pay_runs, insert_pay_run, put_pay_run_if,
        remove_pay_run
    );
    record_accessors!(
        "pay_slip", pay_slips, PaySlip, pay_slip, pay_slips, insert_pay_slip, put_pay_slip_if,
        remove_pay_slip
    );
    record_accessors!(
        "overtime_record", overtime, OvertimeRecord, overtime_record, overtime_records,
        insert_overtime, put_overtime_if, remove_overtime
    );
    record_accessors!(
        "employee_loan", loans, EmployeeLoan, loan, loans, insert_loan, put_loan_if, remove_loan
    );

    /// All pay slips owned by one pay run, in id order.
    pub fn pay_slips_for_run(&self, run_id: &str) -> Vec<&PaySlip> {
        self.pay_slips
            .values()
            .filter(|slip| slip.pay_run_id.as_deref() == Some(run_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PayRunStatus;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    fn sample_run(id: &str) -> PayRun {
        PayRun {
            id: id.to_string(),
            run_number: "PR-2026-001".to_string(),
            period_start: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            pay_date: NaiveDate::from_ymd_opt(2026, 2, 5).unwrap(),
            status: PayRunStatus::Draft,
            total_employees: 0,
            total_gross: Decimal::ZERO,
            total_net: Decimal::ZERO,
            approved_by: None,
            approved_at: None,
            completed_at: None,
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn test_insert_starts_at_version_one() {
        let mut records = Records::default();
        let stored = records.insert_pay_run(sample_run("run_001"));

        assert_eq!(stored.version, 1);
        assert_eq!(records.pay_run("run_001").unwrap().version, 1);
    }

    #[test]
    fn test_put_if_bumps_version_on_match() {
        let mut records = Records::default();
        records.insert_pay_run(sample_run("run_001"));

        let mut updated = records.pay_run("run_001").unwrap().clone();
        updated.status = PayRunStatus::Processing;
        let stored = records.put_pay_run_if(updated, 1).unwrap();

        assert_eq!(stored.version, 2);
        assert_eq!(
            records.pay_run("run_001").unwrap().status,
            PayRunStatus::Processing
        );
    }

    #[test]
    fn test_put_if_rejects_stale_version() {
        let mut records = Records::default();
        records.insert_pay_run(sample_run("run_001"));

        let updated = records.pay_run("run_001").unwrap().clone();
        records.put_pay_run_if(updated.clone(), 1).unwrap();

        // A second writer still holding version 1 must be turned away.
        let err = records.put_pay_run_if(updated, 1).unwrap_err();
        assert!(matches!(err, EngineError::ConcurrentModification { .. }));
    }

    #[test]
    fn test_put_if_rejects_deleted_record() {
        let mut records = Records::default();
        let stored = records.insert_pay_run(sample_run("run_001"));
        records.remove_pay_run("run_001");

        let err = records.put_pay_run_if(stored, 1).unwrap_err();
        assert!(matches!(err, EngineError::ConcurrentModification { .. }));
    }
}
