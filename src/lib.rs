//! Payroll Financial Engine
//!
//! This crate implements the monetary core of a payroll system: overtime
//! premiums and loan amortization, pay slip aggregation, entity lifecycle
//! state machines, and a unified approval workflow over pay runs, pay
//! slips, overtime records and employee loans, with an audit trail of
//! every decision.

#![warn(missing_docs)]

pub mod api;
pub mod audit;
pub mod calculation;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;
