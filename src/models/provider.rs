use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::category::{ServiceCategory, VehicleCategory};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// What a provider is able to work on. Both lists must be non-empty for the
/// provider to appear in match results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillSet {
    pub vehicles: Vec<VehicleCategory>,
    pub services: Vec<ServiceCategory>,
}

impl SkillSet {
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty() || self.services.is_empty()
    }

    pub fn covers(&self, vehicle: VehicleCategory, service: ServiceCategory) -> bool {
        self.vehicles.contains(&vehicle) && self.services.contains(&service)
    }
}

/// A service agent (mechanic). `verified` is written by the moderation
/// collaborator; `active_request` is written only by the assignment
/// coordinator and terminal-transition handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: Uuid,
    pub name: String,
    pub verified: bool,
    pub available: bool,
    pub location: Option<GeoPoint>,
    pub skills: SkillSet,
    pub active_request: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
