use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::rescuer::{GeoPoint, RegistrationStatus, Rescuer, RescuerRegistration, RescuerStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rescuers", post(register_rescuer).get(list_rescuers))
        .route("/rescuers/:id/status", patch(update_rescuer_status))
        .route("/rescuers/:id/location", patch(update_rescuer_location))
        .route("/rescuers/:id/registration", patch(update_registration))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: RescuerStatus,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct UpdateRegistrationRequest {
    pub registration: RegistrationStatus,
}

async fn register_rescuer(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RescuerRegistration>,
) -> Result<Json<Rescuer>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if payload.capacity == 0 {
        return Err(AppError::BadRequest("capacity must be > 0".to_string()));
    }

    if !(-90.0..=90.0).contains(&payload.location.lat)
        || !(-180.0..=180.0).contains(&payload.location.lng)
    {
        return Err(AppError::BadRequest(
            "location is not a valid coordinate".to_string(),
        ));
    }

    let rescuer = state.rescuers.register(payload);
    Ok(Json(rescuer))
}

async fn list_rescuers(State(state): State<Arc<AppState>>) -> Json<Vec<Rescuer>> {
    Json(state.rescuers.list())
}

async fn update_rescuer_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Rescuer>, AppError> {
    let rescuer = state.rescuers.set_status(&id, payload.status)?;
    Ok(Json(rescuer))
}

async fn update_rescuer_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Rescuer>, AppError> {
    let rescuer = state.rescuers.update_location(&id, payload.location)?;
    Ok(Json(rescuer))
}

async fn update_registration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateRegistrationRequest>,
) -> Result<Json<Rescuer>, AppError> {
    let rescuer = state.rescuers.set_registration(&id, payload.registration)?;
    Ok(Json(rescuer))
}
