//! Atomic acceptance of a request by a provider.
//!
//! Accept is the one operation that must touch three records at once: the
//! request gains a provider and a verification code, the provider loses its
//! availability, and the requester's active-request pointer is synced. All
//! three commit together through one store transaction; a racing accept on
//! the same request loses the version check and surfaces as `Conflict`.

use chrono::Utc;
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use crate::engine::lifecycle;
use crate::error::EngineError;
use crate::models::request::ServiceRequest;
use crate::store::{Store, Transaction};

/// Six-digit numeric code shared in person before work starts.
fn generate_code() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

pub fn accept<S: Store + ?Sized>(
    store: &S,
    request_id: Uuid,
    provider_id: Uuid,
) -> Result<ServiceRequest, EngineError> {
    let mut provider = store
        .provider(provider_id)
        .ok_or_else(|| EngineError::NotFound(format!("provider {provider_id} not found")))?;

    if !provider.record.verified {
        return Err(EngineError::NotEligible("provider is not verified".to_string()));
    }
    if !provider.record.available {
        return Err(EngineError::NotEligible("provider is not available".to_string()));
    }
    if provider.record.active_request.is_some() {
        return Err(EngineError::NotEligible(
            "provider already has an active job".to_string(),
        ));
    }

    let mut request = store
        .request(request_id)
        .ok_or_else(|| EngineError::NotFound(format!("request {request_id} not found")))?;

    let mut requester = store.requester(request.record.requester_id).ok_or_else(|| {
        EngineError::Internal(format!(
            "requester {} missing for request {request_id}",
            request.record.requester_id
        ))
    })?;

    let now = Utc::now();
    lifecycle::begin_acceptance(&mut request.record, provider_id, generate_code(), now)?;

    provider.record.active_request = Some(request_id);
    provider.record.available = false;
    provider.record.updated_at = now;
    requester.record.active_request = Some(request_id);

    let accepted = request.record.clone();
    store.commit(Transaction {
        request: Some(request),
        provider: Some(provider),
        requester: Some(requester),
    })?;

    info!(request_id = %request_id, provider_id = %provider_id, "request accepted");
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::accept;
    use crate::error::EngineError;
    use crate::models::category::{ServiceCategory, VehicleCategory};
    use crate::models::provider::{GeoPoint, Provider, SkillSet};
    use crate::models::request::{RequestStatus, ServiceRequest};
    use crate::models::requester::Requester;
    use crate::store::memory::MemoryStore;
    use crate::store::{Store, Versioned};

    fn seeded_store() -> (MemoryStore, Uuid, Uuid) {
        let store = MemoryStore::new();
        let now = Utc::now();

        let owner = Requester {
            id: Uuid::new_v4(),
            name: "stranded owner".to_string(),
            active_request: None,
            created_at: now,
        };
        let request = ServiceRequest {
            id: Uuid::new_v4(),
            requester_id: owner.id,
            provider_id: None,
            vehicle: VehicleCategory::Car,
            service: ServiceCategory::Battery,
            description: "battery flat".to_string(),
            requester_location: GeoPoint { lat: 0.0, lng: 0.0 },
            provider_location: None,
            search_radius_km: 3.0,
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
        };
        let request_id = request.id;
        let owner_id = owner.id;

        store.update_requester(Versioned::new(owner)).unwrap();
        store.update_request(Versioned::new(request)).unwrap();
        (store, request_id, owner_id)
    }

    fn seeded_provider(store: &MemoryStore) -> Uuid {
        let now = Utc::now();
        let provider = Provider {
            id: Uuid::new_v4(),
            name: "mobile mechanic".to_string(),
            verified: true,
            available: true,
            location: Some(GeoPoint { lat: 0.0, lng: 0.01 }),
            skills: SkillSet {
                vehicles: vec![VehicleCategory::Car],
                services: vec![ServiceCategory::Battery],
            },
            active_request: None,
            created_at: now,
            updated_at: now,
        };
        let id = provider.id;
        store.update_provider(Versioned::new(provider)).unwrap();
        id
    }

    #[test]
    fn accept_updates_all_three_records() {
        let (store, request_id, owner_id) = seeded_store();
        let provider_id = seeded_provider(&store);

        let accepted = accept(&store, request_id, provider_id).unwrap();

        assert_eq!(accepted.status, RequestStatus::Accepted);
        assert_eq!(accepted.provider_id, Some(provider_id));
        let code = accepted.verification_code.unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));

        let provider = store.provider(provider_id).unwrap().record;
        assert!(!provider.available);
        assert_eq!(provider.active_request, Some(request_id));

        let owner = store.requester(owner_id).unwrap().record;
        assert_eq!(owner.active_request, Some(request_id));
    }

    #[test]
    fn unverified_or_unavailable_provider_is_not_eligible() {
        let (store, request_id, _) = seeded_store();
        let provider_id = seeded_provider(&store);

        let mut provider = store.provider(provider_id).unwrap();
        provider.record.verified = false;
        store.update_provider(provider).unwrap();
        assert!(matches!(
            accept(&store, request_id, provider_id),
            Err(EngineError::NotEligible(_))
        ));

        let mut provider = store.provider(provider_id).unwrap();
        provider.record.verified = true;
        provider.record.available = false;
        store.update_provider(provider).unwrap();
        assert!(matches!(
            accept(&store, request_id, provider_id),
            Err(EngineError::NotEligible(_))
        ));
    }

    #[test]
    fn assigned_provider_cannot_accept_a_second_request() {
        let (store, request_id, _) = seeded_store();
        let provider_id = seeded_provider(&store);
        accept(&store, request_id, provider_id).unwrap();

        // force availability back on; the active assignment must still block
        let mut provider = store.provider(provider_id).unwrap();
        provider.record.available = true;
        store.update_provider(provider).unwrap();

        let other_owner = Requester {
            id: Uuid::new_v4(),
            name: "second owner".to_string(),
            active_request: None,
            created_at: Utc::now(),
        };
        let mut other_request = store.request(request_id).unwrap().record;
        other_request.id = Uuid::new_v4();
        other_request.requester_id = other_owner.id;
        other_request.provider_id = None;
        other_request.status = RequestStatus::Searching;
        other_request.verification_code = None;
        other_request.accepted_at = None;
        let other_request_id = other_request.id;

        store.update_requester(Versioned::new(other_owner)).unwrap();
        store.update_request(Versioned::new(other_request)).unwrap();

        assert!(matches!(
            accept(&store, other_request_id, provider_id),
            Err(EngineError::NotEligible(_))
        ));
    }

    #[test]
    fn second_accept_on_same_request_conflicts() {
        let (store, request_id, _) = seeded_store();
        let first = seeded_provider(&store);
        let second = seeded_provider(&store);

        accept(&store, request_id, first).unwrap();

        assert!(matches!(
            accept(&store, request_id, second),
            Err(EngineError::Conflict(_))
        ));
        assert!(store.provider(second).unwrap().record.available);
    }

    #[test]
    fn racing_accepts_resolve_to_exactly_one_winner() {
        for _ in 0..20 {
            let (store, request_id, _) = seeded_store();
            let first = seeded_provider(&store);
            let second = seeded_provider(&store);

            let (a, b) = std::thread::scope(|scope| {
                let a = scope.spawn(|| accept(&store, request_id, first));
                let b = scope.spawn(|| accept(&store, request_id, second));
                (a.join().unwrap(), b.join().unwrap())
            });

            let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
            assert_eq!(successes, 1);
            for result in [a, b] {
                if let Err(err) = result {
                    assert!(matches!(err, EngineError::Conflict(_)));
                }
            }
            assert_eq!(
                store.request(request_id).unwrap().record.status,
                RequestStatus::Accepted
            );
        }
    }
}
