use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::category::{ServiceCategory, VehicleCategory};
use crate::models::provider::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Searching,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
    Timeout,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Completed | RequestStatus::Cancelled | RequestStatus::Timeout
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestStatus::Searching => "SEARCHING",
            RequestStatus::Accepted => "ACCEPTED",
            RequestStatus::InProgress => "IN_PROGRESS",
            RequestStatus::Completed => "COMPLETED",
            RequestStatus::Cancelled => "CANCELLED",
            RequestStatus::Timeout => "TIMEOUT",
        };
        f.write_str(name)
    }
}

/// One service episode, from creation to a terminal status. Never deleted.
///
/// Status and radius fields are written only by the dispatch engine; the
/// verification code exists only while the request is `ACCEPTED`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub provider_id: Option<Uuid>,
    pub vehicle: VehicleCategory,
    pub service: ServiceCategory,
    pub description: String,
    pub requester_location: GeoPoint,
    pub provider_location: Option<GeoPoint>,
    pub search_radius_km: f64,
    pub radius_expansions: u32,
    pub escalation_deadline: DateTime<Utc>,
    pub verification_code: Option<String>,
    pub code_verified: bool,
    pub rating: Option<u8>,
    pub feedback: Option<String>,
    pub status: RequestStatus,
    pub cancelled_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub timed_out_at: Option<DateTime<Utc>>,
    pub rated_at: Option<DateTime<Utc>>,
}

impl ServiceRequest {
    pub fn can_cancel(&self) -> bool {
        matches!(self.status, RequestStatus::Searching | RequestStatus::Accepted)
    }

    pub fn can_complete(&self) -> bool {
        self.status == RequestStatus::InProgress
    }

    pub fn awaiting_verification(&self) -> bool {
        self.status == RequestStatus::Accepted && !self.code_verified
    }
}
