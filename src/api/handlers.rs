//! HTTP request handlers for the Payroll Financial Engine API.
//!
//! This module contains the handler functions for all API endpoints.
//! Every mutating endpoint requires an `X-Actor-Id` header identifying
//! the requesting user; the actor is stamped onto approvals and the
//! audit trail.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::{
    LoanPatch, NewLoan, NewOvertime, NewPayRun, NewPaySlip, OvertimePatch, PayRunPatch,
    PaySlipPatch,
};

use super::request::{ApprovalQuery, DecisionRequest, PaymentRequest};
use super::response::{ApiError, ApiErrorResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/pay-runs", post(create_pay_run))
        .route(
            "/pay-runs/:id",
            get(get_pay_run).patch(update_pay_run).delete(delete_pay_run),
        )
        .route("/pay-slips", post(create_pay_slip))
        .route(
            "/pay-slips/:id",
            get(get_pay_slip)
                .patch(update_pay_slip)
                .delete(delete_pay_slip),
        )
        .route("/overtime", post(create_overtime))
        .route(
            "/overtime/:id",
            get(get_overtime).patch(update_overtime).delete(delete_overtime),
        )
        .route("/loans", post(create_loan))
        .route(
            "/loans/:id",
            get(get_loan).patch(update_loan).delete(delete_loan),
        )
        .route("/loans/:id/payments", post(record_loan_payment))
        .route("/approvals", get(list_approvals))
        .route("/approvals/decide", post(decide_approval))
        .with_state(state)
}

/// Extracts the acting user from the `X-Actor-Id` header.
fn actor(headers: &HeaderMap) -> Result<String, ApiErrorResponse> {
    headers
        .get("x-actor-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiErrorResponse::bad_request(ApiError::missing_actor()))
}

/// Unwraps a JSON body, mapping axum's rejection into the API error shape.
fn parse_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiErrorResponse> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            let correlation_id = Uuid::new_v4();
            let error = match rejection {
                JsonRejection::JsonDataError(err) => {
                    // The body text carries the detailed error from serde
                    let body_text = err.body_text();
                    warn!(
                        correlation_id = %correlation_id,
                        error = %body_text,
                        "JSON data error"
                    );
                    if body_text.contains("missing field") {
                        ApiError::validation_error(body_text)
                    } else {
                        ApiError::malformed_json(body_text)
                    }
                }
                JsonRejection::JsonSyntaxError(err) => {
                    warn!(
                        correlation_id = %correlation_id,
                        error = %err,
                        "JSON syntax error"
                    );
                    ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
                }
                JsonRejection::MissingJsonContentType(_) => {
                    ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
                }
                _ => ApiError::malformed_json("Failed to parse request body"),
            };
            Err(ApiErrorResponse::bad_request(error))
        }
    }
}

async fn create_pay_run(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NewPayRun>, JsonRejection>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let actor = actor(&headers)?;
    let new = parse_json(payload)?;
    let run = state.engine().create_pay_run(&actor, new)?;
    Ok((StatusCode::CREATED, Json(run)))
}

async fn get_pay_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    Ok(Json(state.engine().pay_run(&id)?))
}

async fn update_pay_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<PayRunPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let actor = actor(&headers)?;
    let patch = parse_json(payload)?;
    Ok(Json(state.engine().update_pay_run(&actor, &id, patch)?))
}

async fn delete_pay_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let actor = actor(&headers)?;
    state.engine().delete_pay_run(&actor, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_pay_slip(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NewPaySlip>, JsonRejection>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let actor = actor(&headers)?;
    let new = parse_json(payload)?;
    let slip = state.engine().create_pay_slip(&actor, new)?;
    Ok((StatusCode::CREATED, Json(slip)))
}

async fn get_pay_slip(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    Ok(Json(state.engine().pay_slip(&id)?))
}

async fn update_pay_slip(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<PaySlipPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let actor = actor(&headers)?;
    let patch = parse_json(payload)?;
    Ok(Json(state.engine().update_pay_slip(&actor, &id, patch)?))
}

async fn delete_pay_slip(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let actor = actor(&headers)?;
    state.engine().delete_pay_slip(&actor, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_overtime(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NewOvertime>, JsonRejection>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let actor = actor(&headers)?;
    let new = parse_json(payload)?;
    let record = state.engine().create_overtime(&actor, new)?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_overtime(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    Ok(Json(state.engine().overtime_record(&id)?))
}

async fn update_overtime(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<OvertimePatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let actor = actor(&headers)?;
    let patch = parse_json(payload)?;
    Ok(Json(state.engine().update_overtime(&actor, &id, patch)?))
}

async fn delete_overtime(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let actor = actor(&headers)?;
    state.engine().delete_overtime(&actor, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_loan(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NewLoan>, JsonRejection>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let actor = actor(&headers)?;
    let new = parse_json(payload)?;
    let loan = state.engine().create_loan(&actor, new)?;
    Ok((StatusCode::CREATED, Json(loan)))
}

async fn get_loan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    Ok(Json(state.engine().loan(&id)?))
}

async fn update_loan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<LoanPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let actor = actor(&headers)?;
    let patch = parse_json(payload)?;
    Ok(Json(state.engine().update_loan(&actor, &id, patch)?))
}

async fn delete_loan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let actor = actor(&headers)?;
    state.engine().delete_loan(&actor, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn record_loan_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let actor = actor(&headers)?;
    let payment = parse_json(payload)?;
    let loan = state
        .engine()
        .record_loan_payment(&actor, &id, payment.amount)?;
    Ok(Json(loan))
}

async fn list_approvals(
    State(state): State<AppState>,
    Query(query): Query<ApprovalQuery>,
) -> impl IntoResponse {
    let items = state.engine().list_pending_approvals(query.kind);
    info!(count = items.len(), "Listed pending approvals");
    Json(items)
}

async fn decide_approval(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<DecisionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let actor = actor(&headers)?;
    let decision = parse_json(payload)?;
    let decided = state.engine().decide_approval(
        &actor,
        decision.kind,
        &decision.id,
        decision.action,
        decision.notes,
    )?;
    Ok(Json(decided))
}
