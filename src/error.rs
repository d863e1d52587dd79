//! Error types for the Payroll Financial Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all failure conditions that can occur while computing pay, moving
//! entities through their lifecycles, or applying approval decisions.

use rust_decimal::Decimal;
use thiserror::Error;

/// The main error type for the Payroll Financial Engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently throughout the application. No variant
/// is retried internally; `ConcurrentModification` is the only one a
/// caller should treat as retryable (re-fetch and retry once).
///
/// # Example
///
/// ```
/// use payroll_engine::error::EngineError;
///
/// let error = EngineError::NotFound {
///     kind: "pay_slip".to_string(),
///     id: "ps_missing".to_string(),
/// };
/// assert_eq!(error.to_string(), "pay_slip not found: ps_missing");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or out-of-range input (e.g. loan term over 120 months).
    #[error("Invalid value for '{field}': {message}")]
    Validation {
        /// The input field that failed validation.
        field: String,
        /// A description of what made the value invalid.
        message: String,
    },

    /// A referenced entity id does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// The entity kind that was looked up.
        kind: String,
        /// The id that was not found.
        id: String,
    },

    /// The requested status change is not in the allowed-transition table.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The entity's current status.
        from: String,
        /// The requested target status.
        to: String,
    },

    /// An approval decision was made on an entity that is not in a
    /// decidable state for its kind.
    #[error("Entity is not awaiting approval (current status: {current})")]
    NotAwaitingApproval {
        /// The entity's current status.
        current: String,
    },

    /// A pay slip recompute would produce a negative net pay.
    #[error("Net pay would be negative: gross {gross} minus deductions {deductions}")]
    NegativeNetPay {
        /// The recomputed gross pay.
        gross: Decimal,
        /// The recomputed total deductions.
        deductions: Decimal,
    },

    /// An edit was attempted on a record in a terminal state.
    #[error("{kind} {id} is no longer editable")]
    ImmutableRecord {
        /// The entity kind.
        kind: String,
        /// The id of the immutable record.
        id: String,
    },

    /// The optimistic-concurrency precondition failed at write time.
    /// The caller should re-fetch the record and retry once.
    #[error("{kind} {id} was modified concurrently")]
    ConcurrentModification {
        /// The entity kind.
        kind: String,
        /// The id of the contested record.
        id: String,
    },
}

impl EngineError {
    /// Convenience constructor for validation failures.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for missing entities.
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
