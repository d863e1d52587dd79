//! Application state for the Payroll Financial Engine API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::engine::Engine;
use crate::store::MemoryGateway;

/// Shared application state.
///
/// Contains resources that are shared across all request handlers,
/// currently just the payroll engine over its storage gateway.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<Engine<MemoryGateway>>,
}

impl AppState {
    /// Creates a new application state over the given engine.
    pub fn new(engine: Engine<MemoryGateway>) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Returns a reference to the payroll engine.
    pub fn engine(&self) -> &Engine<MemoryGateway> {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        // Required for axum state
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
