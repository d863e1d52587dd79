//! Request types for the Payroll Financial Engine API.
//!
//! Entity create and patch bodies deserialize directly into the engine's
//! input types ([`crate::engine::NewPayRun`], [`crate::engine::PaySlipPatch`]
//! and friends); this module only holds the request shapes with no engine
//! counterpart.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::engine::{ApprovalAction, ApprovalKind};

/// Query parameters for listing pending approvals.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApprovalQuery {
    /// Restricts the queue to one entity kind.
    pub kind: Option<ApprovalKind>,
}

/// Body for deciding a pending approval.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionRequest {
    /// The kind of entity being decided.
    pub kind: ApprovalKind,
    /// The entity's id.
    pub id: String,
    /// Approve or reject.
    pub action: ApprovalAction,
    /// Optional approver notes.
    pub notes: Option<String>,
}

/// Body for recording a loan repayment.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    /// The amount repaid. Must be positive.
    pub amount: Decimal,
}
