use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::matcher::RequestMatch;
use crate::error::EngineError;
use crate::models::provider::{GeoPoint, Provider, SkillSet};
use crate::models::request::ServiceRequest;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/providers", post(register_provider))
        .route("/providers/:id", get(provider_profile))
        .route("/providers/:id/verified", patch(set_verified))
        .route("/providers/:id/availability", patch(set_availability))
        .route("/providers/:id/skills", patch(configure_skills))
        .route("/providers/:id/matches", get(search_matches))
        .route("/providers/:id/history", get(provider_history))
}

#[derive(Deserialize)]
pub struct RegisterProviderRequest {
    pub name: String,
    pub vehicles: Vec<String>,
    pub services: Vec<String>,
}

#[derive(Deserialize)]
pub struct SetVerifiedRequest {
    pub verified: bool,
}

#[derive(Deserialize)]
pub struct SetAvailabilityRequest {
    pub available: bool,
    pub location: Option<GeoPoint>,
}

#[derive(Deserialize)]
pub struct ConfigureSkillsRequest {
    pub vehicles: Vec<String>,
    pub services: Vec<String>,
}

/// Categories arrive as free-form strings and are normalized exactly once,
/// here at the boundary.
fn parse_skills(vehicles: &[String], services: &[String]) -> Result<SkillSet, EngineError> {
    Ok(SkillSet {
        vehicles: vehicles
            .iter()
            .map(|raw| raw.parse())
            .collect::<Result<_, _>>()?,
        services: services
            .iter()
            .map(|raw| raw.parse())
            .collect::<Result<_, _>>()?,
    })
}

async fn register_provider(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterProviderRequest>,
) -> Result<Json<Provider>, EngineError> {
    let skills = parse_skills(&payload.vehicles, &payload.services)?;
    let provider = state.engine.register_provider(payload.name, skills)?;
    Ok(Json(provider))
}

async fn provider_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Provider>, EngineError> {
    Ok(Json(state.engine.provider_profile(id)?))
}

async fn set_verified(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetVerifiedRequest>,
) -> Result<Json<Provider>, EngineError> {
    Ok(Json(state.engine.set_verified(id, payload.verified)?))
}

async fn set_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetAvailabilityRequest>,
) -> Result<Json<Provider>, EngineError> {
    Ok(Json(state.engine.set_availability(
        id,
        payload.available,
        payload.location,
    )?))
}

async fn configure_skills(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfigureSkillsRequest>,
) -> Result<Json<Provider>, EngineError> {
    let skills = parse_skills(&payload.vehicles, &payload.services)?;
    Ok(Json(state.engine.configure_skills(id, skills)?))
}

async fn search_matches(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RequestMatch>>, EngineError> {
    Ok(Json(state.engine.search_matches(id)?))
}

async fn provider_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ServiceRequest>>, EngineError> {
    Ok(Json(state.engine.provider_history(id)?))
}
