//! The payroll engine operations.
//!
//! [`Engine`] ties the persistence gateway and the audit sink together
//! and exposes the operation-level contracts consumed by the HTTP
//! handlers: pay slip and pay run maintenance, overtime and loan
//! handling, and the unified approval queue. Every mutating operation
//! is a single synchronous request-response unit that loads the current
//! entity, validates the transition, recomputes derived monetary
//! fields, persists inside one transaction, and appends one best-effort
//! audit entry.

mod approvals;
mod loans;
mod overtime;
mod pay_runs;
mod pay_slips;

pub use approvals::{ApprovalAction, ApprovalItem, ApprovalKind, DecidedEntity, Priority};
pub use loans::{LoanPatch, NewLoan};
pub use overtime::{NewOvertime, OvertimePatch};
pub use pay_runs::{NewPayRun, PayRunPatch};
pub use pay_slips::{NewPaySlip, PaySlipPatch};

use std::sync::Arc;

use crate::audit::{self, AuditEntry, AuditSink};
use crate::store::Gateway;

/// The payroll financial engine.
///
/// Generic over the persistence gateway so tests and deployments can
/// swap the storage backend behind the same operations.
pub struct Engine<G: Gateway> {
    gateway: G,
    audit_sink: Arc<dyn AuditSink>,
}

impl<G: Gateway> Engine<G> {
    /// Creates an engine over the given gateway and audit sink.
    pub fn new(gateway: G, audit_sink: Arc<dyn AuditSink>) -> Self {
        Self {
            gateway,
            audit_sink,
        }
    }

    pub(crate) fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Appends an audit entry, logging and swallowing sink failures.
    pub(crate) fn record_audit(&self, entry: AuditEntry) {
        audit::append_best_effort(self.audit_sink.as_ref(), entry);
    }
}
