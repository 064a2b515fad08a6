use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::dispatch::NewRequest;
use crate::error::EngineError;
use crate::models::provider::GeoPoint;
use crate::models::request::ServiceRequest;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/requests", post(create_request))
        .route("/requests/:id", get(get_status))
        .route("/requests/:id/accept", post(accept))
        .route("/requests/:id/verify", post(verify_start))
        .route("/requests/:id/complete", post(complete))
        .route("/requests/:id/cancel", post(cancel))
        .route("/requests/:id/feedback", post(submit_feedback))
        .route("/requests/:id/provider-location", patch(update_provider_location))
}

#[derive(Deserialize)]
pub struct CreateRequestRequest {
    pub requester_id: Uuid,
    pub vehicle: String,
    pub service: String,
    #[serde(default)]
    pub description: String,
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct AcceptRequest {
    pub provider_id: Uuid,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub code: String,
}

#[derive(Deserialize)]
pub struct RequesterAction {
    pub requester_id: Uuid,
}

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub rating: u8,
    pub feedback: Option<String>,
}

#[derive(Deserialize)]
pub struct ProviderLocationRequest {
    pub provider_id: Uuid,
    pub location: GeoPoint,
}

#[derive(Serialize)]
pub struct RequestStatusResponse {
    #[serde(flatten)]
    pub request: ServiceRequest,
    pub can_cancel: bool,
    pub can_complete: bool,
    pub awaiting_verification: bool,
}

impl From<ServiceRequest> for RequestStatusResponse {
    fn from(request: ServiceRequest) -> Self {
        let can_cancel = request.can_cancel();
        let can_complete = request.can_complete();
        let awaiting_verification = request.awaiting_verification();
        Self {
            request,
            can_cancel,
            can_complete,
            awaiting_verification,
        }
    }
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRequestRequest>,
) -> Result<Json<ServiceRequest>, EngineError> {
    let request = state.engine.create_request(NewRequest {
        requester_id: payload.requester_id,
        vehicle: payload.vehicle.parse()?,
        service: payload.service.parse()?,
        description: payload.description,
        location: payload.location,
    })?;
    Ok(Json(request))
}

async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RequestStatusResponse>, EngineError> {
    Ok(Json(state.engine.get_status(id)?.into()))
}

async fn accept(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AcceptRequest>,
) -> Result<Json<ServiceRequest>, EngineError> {
    Ok(Json(state.engine.accept(id, payload.provider_id)?))
}

async fn verify_start(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<ServiceRequest>, EngineError> {
    Ok(Json(state.engine.verify_start(id, &payload.code)?))
}

async fn complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RequesterAction>,
) -> Result<Json<ServiceRequest>, EngineError> {
    Ok(Json(state.engine.complete(id, payload.requester_id)?))
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RequesterAction>,
) -> Result<Json<ServiceRequest>, EngineError> {
    Ok(Json(state.engine.cancel(id, payload.requester_id)?))
}

async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Json<ServiceRequest>, EngineError> {
    Ok(Json(state.engine.submit_feedback(
        id,
        payload.rating,
        payload.feedback,
    )?))
}

async fn update_provider_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProviderLocationRequest>,
) -> Result<Json<RequestStatusResponse>, EngineError> {
    state
        .engine
        .update_provider_location(id, payload.provider_id, payload.location)?;
    Ok(Json(state.engine.get_status(id)?.into()))
}
