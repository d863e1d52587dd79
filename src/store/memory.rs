//! In-memory gateway implementation.
//!
//! Backs the bundled API and the test suite. Commit closures run
//! against a working copy of the record set and are swapped in only on
//! success, so a failed precondition anywhere in a cascade rolls the
//! whole transaction back.

use std::sync::{Arc, RwLock};

use crate::error::EngineResult;

use super::{Gateway, Records};

/// A thread-safe in-memory record store.
///
/// Clones share the same underlying records, which is what the axum
/// state layer needs.
#[derive(Default, Clone)]
pub struct MemoryGateway {
    records: Arc<RwLock<Records>>,
}

impl MemoryGateway {
    /// Creates a new, empty in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Gateway for MemoryGateway {
    fn snapshot<R>(&self, f: impl FnOnce(&Records) -> R) -> R {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        f(&records)
    }

    fn commit<R>(&self, f: impl FnOnce(&mut Records) -> EngineResult<R>) -> EngineResult<R> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let mut working = records.clone();
        let result = f(&mut working)?;
        *records = working;
        Ok(result)
    }
}
