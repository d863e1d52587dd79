//! HTTP API module for the Payroll Financial Engine.
//!
//! This module provides the REST API endpoints for maintaining pay
//! runs, pay slips, overtime records and employee loans, and for
//! working the unified approval queue.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{ApprovalQuery, DecisionRequest, PaymentRequest};
pub use response::ApiError;
pub use state::AppState;
