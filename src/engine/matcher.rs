//! Skill and distance matching of `SEARCHING` requests against a provider.

use serde::Serialize;
use uuid::Uuid;

use crate::geo::haversine_km;
use crate::models::category::{ServiceCategory, VehicleCategory};
use crate::models::provider::{GeoPoint, SkillSet};
use crate::models::request::{RequestStatus, ServiceRequest};

#[derive(Debug, Clone, Serialize)]
pub struct RequestMatch {
    pub request_id: Uuid,
    pub vehicle: VehicleCategory,
    pub service: ServiceCategory,
    pub description: String,
    pub requester_location: GeoPoint,
    pub distance_km: f64,
}

/// Pure matching pass: candidates must still be `SEARCHING`, within the
/// provider's skill set, and within the request's current (post-escalation)
/// search radius. Results are sorted nearest-first.
pub fn eligible_matches(
    origin: GeoPoint,
    skills: &SkillSet,
    candidates: &[ServiceRequest],
) -> Vec<RequestMatch> {
    let mut matches: Vec<RequestMatch> = candidates
        .iter()
        .filter(|request| request.status == RequestStatus::Searching)
        .filter(|request| skills.covers(request.vehicle, request.service))
        .filter_map(|request| {
            let distance_km = haversine_km(&origin, &request.requester_location);
            (distance_km <= request.search_radius_km).then(|| RequestMatch {
                request_id: request.id,
                vehicle: request.vehicle,
                service: request.service,
                description: request.description.clone(),
                requester_location: request.requester_location,
                distance_km,
            })
        })
        .collect();

    matches.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    matches
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::eligible_matches;
    use crate::models::category::{ServiceCategory, VehicleCategory};
    use crate::models::provider::{GeoPoint, SkillSet};
    use crate::models::request::{RequestStatus, ServiceRequest};

    fn skills() -> SkillSet {
        SkillSet {
            vehicles: vec![VehicleCategory::Car, VehicleCategory::Bike],
            services: vec![ServiceCategory::Battery, ServiceCategory::Puncture],
        }
    }

    fn request_at(lng: f64, radius_km: f64) -> ServiceRequest {
        let now = Utc::now();
        ServiceRequest {
            id: Uuid::new_v4(),
            requester_id: Uuid::new_v4(),
            provider_id: None,
            vehicle: VehicleCategory::Car,
            service: ServiceCategory::Battery,
            description: "battery flat".to_string(),
            requester_location: GeoPoint { lat: 0.0, lng },
            provider_location: None,
            search_radius_km: radius_km,
            radius_expansions: 0,
            escalation_deadline: now,
            verification_code: None,
            code_verified: false,
            rating: None,
            feedback: None,
            status: RequestStatus::Searching,
            cancelled_by: None,
            created_at: now,
            accepted_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            timed_out_at: None,
            rated_at: None,
        }
    }

    const ORIGIN: GeoPoint = GeoPoint { lat: 0.0, lng: 0.0 };

    #[test]
    fn request_inside_radius_matches_with_distance() {
        // 0.0265 degrees along the equator is just under 2.95 km
        let candidates = [request_at(0.0265, 3.0)];

        let matches = eligible_matches(ORIGIN, &skills(), &candidates);

        assert_eq!(matches.len(), 1);
        assert!((matches[0].distance_km - 2.947).abs() < 1e-2);
    }

    #[test]
    fn shrinking_the_radius_excludes_the_same_request() {
        let candidates = [request_at(0.0265, 2.0)];

        let matches = eligible_matches(ORIGIN, &skills(), &candidates);

        assert!(matches.is_empty());
    }

    #[test]
    fn skill_mismatch_is_rejected_before_distance() {
        let mut vehicle_miss = request_at(0.001, 3.0);
        vehicle_miss.vehicle = VehicleCategory::Lorry;
        let mut service_miss = request_at(0.001, 3.0);
        service_miss.service = ServiceCategory::Transmission;

        let matches = eligible_matches(ORIGIN, &skills(), &[vehicle_miss, service_miss]);

        assert!(matches.is_empty());
    }

    #[test]
    fn non_searching_candidates_are_skipped() {
        let mut accepted = request_at(0.001, 3.0);
        accepted.status = RequestStatus::Accepted;

        let matches = eligible_matches(ORIGIN, &skills(), &[accepted]);

        assert!(matches.is_empty());
    }

    #[test]
    fn results_are_sorted_nearest_first() {
        let far = request_at(0.02, 5.0);
        let near = request_at(0.005, 5.0);
        let far_id = far.id;
        let near_id = near.id;

        let matches = eligible_matches(ORIGIN, &skills(), &[far, near]);

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].request_id, near_id);
        assert_eq!(matches[1].request_id, far_id);
    }
}
