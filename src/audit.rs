//! The audit sink seam.
//!
//! The engine appends one entry per completed operation describing who
//! did what and which status change happened. Appends are best-effort:
//! a sink failure is logged and swallowed, it never fails the business
//! operation that already succeeded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// An append-only activity log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique identifier for the entry.
    pub id: Uuid,
    /// The caller identity resolved upstream.
    pub actor: String,
    /// The entity kind the operation touched.
    pub entity_kind: String,
    /// The id of the touched entity.
    pub entity_id: String,
    /// The operation name (e.g. "update", "approve", "record_payment").
    pub action: String,
    /// The entity status before the operation, where applicable.
    pub from_status: Option<String>,
    /// The entity status after the operation, where applicable.
    pub to_status: Option<String>,
    /// Operation-specific detail (changed fields, amounts, notes).
    pub detail: serde_json::Value,
    /// When the entry was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Builds an entry for an operation on one entity, stamped now.
    pub fn new(
        actor: &str,
        entity_kind: &str,
        entity_id: &str,
        action: &str,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: actor.to_string(),
            entity_kind: entity_kind.to_string(),
            entity_id: entity_id.to_string(),
            action: action.to_string(),
            from_status: None,
            to_status: None,
            detail,
            recorded_at: Utc::now(),
        }
    }

    /// Attaches the before/after status pair to the entry.
    pub fn with_statuses(
        mut self,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        self.from_status = Some(from.to_string());
        self.to_status = Some(to.to_string());
        self
    }
}

/// Error raised by a failing audit sink.
#[derive(Debug, Error)]
#[error("audit sink failure: {0}")]
pub struct AuditSinkError(pub String);

/// An append-only activity log the engine writes to.
pub trait AuditSink: Send + Sync {
    /// Appends one entry to the log.
    fn append(&self, entry: AuditEntry) -> Result<(), AuditSinkError>;
}

/// Appends an entry, logging and swallowing any sink failure.
pub(crate) fn append_best_effort(sink: &dyn AuditSink, entry: AuditEntry) {
    let entity_kind = entry.entity_kind.clone();
    let entity_id = entry.entity_id.clone();
    if let Err(err) = sink.append(entry) {
        warn!(
            entity_kind = %entity_kind,
            entity_id = %entity_id,
            error = %err,
            "Failed to append audit entry"
        );
    }
}

/// A thread-safe in-memory audit sink, used by tests and the bundled
/// API wiring.
#[derive(Default, Clone)]
pub struct MemoryAuditSink {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditSink {
    /// Creates a new, empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded entries in append order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, entry: AuditEntry) -> Result<(), AuditSinkError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
        Ok(())
    }
}
