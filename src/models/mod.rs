//! Core data models for the Payroll Financial Engine.
//!
//! This module contains the four payroll entities and their status
//! enums. Every status enum carries its own allowed-transition table;
//! status writes outside those tables are rejected by the engine.

mod loan;
mod overtime;
mod pay_run;
mod pay_slip;

pub use loan::{EmployeeLoan, LoanStatus};
pub use overtime::{OvertimeRecord, OvertimeStatus, OvertimeType};
pub use pay_run::{PayRun, PayRunStatus};
pub use pay_slip::{CalcType, PayComponent, PaySlip, PaySlipStatus};
