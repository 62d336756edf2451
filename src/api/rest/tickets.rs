use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Serialize;
use serde_json::json;

use crate::engine::completion::{cancel_ticket, complete_ticket, report_progress};
use crate::engine::dispatch::{dispatch_ticket, DispatchOutcome};
use crate::engine::queue::enqueue_ticket;
use crate::error::AppError;
use crate::models::dispatch::DispatchRecord;
use crate::models::ticket::{Ticket, TicketIntake, VerificationVerdict};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets", post(create_ticket))
        .route("/tickets/:id", get(get_ticket))
        .route("/tickets/:id/dispatch", post(redispatch_ticket))
        .route("/tickets/:id/progress", post(ticket_progress))
        .route("/tickets/:id/verification", post(ticket_verification))
        .route("/tickets/:id/cancel", post(ticket_cancel))
        .route("/dispatches", get(list_dispatches))
}

async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TicketIntake>,
) -> Result<Json<Ticket>, AppError> {
    if !(1..=5).contains(&payload.priority) {
        return Err(AppError::BadRequest(
            "priority must be between 1 and 5".to_string(),
        ));
    }

    if payload.victim_info.people_count == 0 {
        return Err(AppError::BadRequest(
            "people_count must be > 0".to_string(),
        ));
    }

    if !(-90.0..=90.0).contains(&payload.location.lat)
        || !(-180.0..=180.0).contains(&payload.location.lng)
    {
        return Err(AppError::BadRequest(
            "location is not a valid coordinate".to_string(),
        ));
    }

    let ticket = state.tickets.create(payload);
    enqueue_ticket(&state, ticket.id.clone()).await?;

    Ok(Json(ticket))
}

async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, AppError> {
    let ticket = state.tickets.get(&id)?;
    Ok(Json(ticket))
}

#[derive(Serialize)]
struct RedispatchResponse {
    outcome: &'static str,
    detail: serde_json::Value,
}

/// Retry-later path after an exhausted search: run a fresh dispatch attempt
/// inline so the caller sees the outcome.
async fn redispatch_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RedispatchResponse>, AppError> {
    let response = match dispatch_ticket(&state, &id)? {
        DispatchOutcome::Assigned(record) => RedispatchResponse {
            outcome: "assigned",
            detail: json!(record),
        },
        DispatchOutcome::Exhausted { searched_km } => RedispatchResponse {
            outcome: "exhausted",
            detail: json!({ "searched_km": searched_km }),
        },
        DispatchOutcome::Skipped { status } => RedispatchResponse {
            outcome: "skipped",
            detail: json!({ "status": status }),
        },
    };

    Ok(Json(response))
}

async fn ticket_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, AppError> {
    let ticket = report_progress(&state, &id)?;
    Ok(Json(ticket))
}

async fn ticket_verification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(verdict): Json<VerificationVerdict>,
) -> Result<Json<Ticket>, AppError> {
    if !(0.0..=1.0).contains(&verdict.confidence) {
        return Err(AppError::BadRequest(
            "confidence must be between 0 and 1".to_string(),
        ));
    }

    let ticket = complete_ticket(&state, &id, verdict)?;
    Ok(Json(ticket))
}

async fn ticket_cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, AppError> {
    let ticket = cancel_ticket(&state, &id)?;
    Ok(Json(ticket))
}

async fn list_dispatches(State(state): State<Arc<AppState>>) -> Json<Vec<DispatchRecord>> {
    let dispatches = state
        .dispatches
        .iter()
        .map(|entry| entry.value().clone())
        .collect();

    Json(dispatches)
}
