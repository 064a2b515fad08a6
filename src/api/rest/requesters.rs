use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::request::ServiceRequest;
use crate::models::requester::Requester;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/requesters", post(register_requester))
        .route("/requesters/:id", get(requester_profile))
        .route("/requesters/:id/history", get(requester_history))
}

#[derive(Deserialize)]
pub struct RegisterRequesterRequest {
    pub name: String,
}

async fn register_requester(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequesterRequest>,
) -> Result<Json<Requester>, EngineError> {
    Ok(Json(state.engine.register_requester(payload.name)?))
}

async fn requester_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Requester>, EngineError> {
    Ok(Json(state.engine.requester_profile(id)?))
}

async fn requester_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ServiceRequest>>, EngineError> {
    Ok(Json(state.engine.requester_history(id)?))
}
