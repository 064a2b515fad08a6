//! Legal transitions of a single request.
//!
//! Every guarded transition rejects with `Conflict` carrying the current
//! status; callers surface that to the end user instead of silently ignoring
//! the call. Terminal statuses (`COMPLETED`, `CANCELLED`, `TIMEOUT`) absorb
//! everything.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::request::{RequestStatus, ServiceRequest};

/// `SEARCHING -> ACCEPTED`. The provider-side eligibility guards live in the
/// assignment coordinator; this checks only the request side and installs the
/// fresh verification code.
pub fn begin_acceptance(
    request: &mut ServiceRequest,
    provider_id: Uuid,
    code: String,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    if request.status != RequestStatus::Searching {
        return Err(EngineError::Conflict(format!(
            "request cannot be accepted, current status: {}",
            request.status
        )));
    }

    request.status = RequestStatus::Accepted;
    request.provider_id = Some(provider_id);
    request.verification_code = Some(code);
    request.code_verified = false;
    request.accepted_at = Some(now);
    Ok(())
}

/// `ACCEPTED -> IN_PROGRESS`, gated on the one-time code. The stored code is
/// cleared on success so it never outlives the `ACCEPTED` status.
pub fn verify_start(
    request: &mut ServiceRequest,
    code: &str,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    if request.status != RequestStatus::Accepted {
        return Err(EngineError::Conflict(format!(
            "verification is not possible, current status: {}",
            request.status
        )));
    }
    if request.code_verified {
        return Err(EngineError::Conflict(
            "verification code already verified".to_string(),
        ));
    }

    match request.verification_code.as_deref() {
        Some(expected) if expected == code => {
            request.verification_code = None;
            request.code_verified = true;
            request.status = RequestStatus::InProgress;
            request.started_at = Some(now);
            Ok(())
        }
        _ => Err(EngineError::InvalidInput(
            "verification code does not match".to_string(),
        )),
    }
}

/// `IN_PROGRESS -> COMPLETED`, requester only.
pub fn complete(
    request: &mut ServiceRequest,
    requester_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    if request.status != RequestStatus::InProgress {
        return Err(EngineError::Conflict(format!(
            "request cannot be completed, current status: {}",
            request.status
        )));
    }
    if request.requester_id != requester_id {
        return Err(EngineError::NotEligible(
            "only the requesting owner can complete this request".to_string(),
        ));
    }

    request.status = RequestStatus::Completed;
    request.completed_at = Some(now);
    Ok(())
}

/// `{SEARCHING, ACCEPTED} -> CANCELLED`, requester only. Forbidden once the
/// service is physically underway.
pub fn cancel(
    request: &mut ServiceRequest,
    requester_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    if request.status == RequestStatus::InProgress {
        return Err(EngineError::Conflict(
            "cannot cancel once service is underway".to_string(),
        ));
    }
    if request.status.is_terminal() {
        return Err(EngineError::Conflict(format!(
            "request already closed, current status: {}",
            request.status
        )));
    }
    if request.requester_id != requester_id {
        return Err(EngineError::NotEligible(
            "only the requesting owner can cancel this request".to_string(),
        ));
    }

    request.status = RequestStatus::Cancelled;
    request.cancelled_by = Some(requester_id);
    request.cancelled_at = Some(now);
    request.verification_code = None;
    request.code_verified = false;
    Ok(())
}

/// `SEARCHING -> TIMEOUT`. Triggered only by the escalation policy, which
/// guards the status itself, so this transition is infallible.
pub fn time_out(request: &mut ServiceRequest, now: DateTime<Utc>) {
    request.status = RequestStatus::Timeout;
    request.timed_out_at = Some(now);
}

/// One feedback submission, only after completion, rating in 1..=5.
pub fn record_feedback(
    request: &mut ServiceRequest,
    rating: u8,
    feedback: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    if !(1..=5).contains(&rating) {
        return Err(EngineError::InvalidInput(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    if request.status != RequestStatus::Completed {
        return Err(EngineError::Conflict(format!(
            "feedback is only accepted after completion, current status: {}",
            request.status
        )));
    }
    if request.rating.is_some() {
        return Err(EngineError::Conflict(
            "feedback already submitted".to_string(),
        ));
    }

    request.rating = Some(rating);
    request.feedback = feedback;
    request.rated_at = Some(now);
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::category::{ServiceCategory, VehicleCategory};
    use crate::models::provider::GeoPoint;

    fn searching_request(requester_id: Uuid) -> ServiceRequest {
        let now = Utc::now();
        ServiceRequest {
            id: Uuid::new_v4(),
            requester_id,
            provider_id: None,
            vehicle: VehicleCategory::Bike,
            service: ServiceCategory::Puncture,
            description: "flat rear tyre".to_string(),
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
        }
    }

    fn accepted_request(requester_id: Uuid, code: &str) -> ServiceRequest {
        let mut request = searching_request(requester_id);
        begin_acceptance(&mut request, Uuid::new_v4(), code.to_string(), Utc::now()).unwrap();
        request
    }

    #[test]
    fn acceptance_installs_code_and_provider() {
        let mut request = searching_request(Uuid::new_v4());
        let provider_id = Uuid::new_v4();

        begin_acceptance(&mut request, provider_id, "123456".to_string(), Utc::now()).unwrap();

        assert_eq!(request.status, RequestStatus::Accepted);
        assert_eq!(request.provider_id, Some(provider_id));
        assert_eq!(request.verification_code.as_deref(), Some("123456"));
        assert!(!request.code_verified);
        assert!(request.accepted_at.is_some());
    }

    #[test]
    fn acceptance_requires_searching_status() {
        let mut request = accepted_request(Uuid::new_v4(), "123456");

        let result =
            begin_acceptance(&mut request, Uuid::new_v4(), "654321".to_string(), Utc::now());

        assert!(matches!(result, Err(EngineError::Conflict(_))));
        assert_eq!(request.verification_code.as_deref(), Some("123456"));
    }

    #[test]
    fn verify_with_matching_code_starts_service() {
        let mut request = accepted_request(Uuid::new_v4(), "123456");

        verify_start(&mut request, "123456", Utc::now()).unwrap();

        assert_eq!(request.status, RequestStatus::InProgress);
        assert!(request.code_verified);
        assert!(request.verification_code.is_none());
        assert!(request.started_at.is_some());
    }

    #[test]
    fn verify_with_wrong_code_is_invalid_input() {
        let mut request = accepted_request(Uuid::new_v4(), "123456");

        let result = verify_start(&mut request, "000000", Utc::now());

        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
        assert_eq!(request.status, RequestStatus::Accepted);
    }

    #[test]
    fn second_verify_conflicts() {
        let mut request = accepted_request(Uuid::new_v4(), "123456");
        verify_start(&mut request, "123456", Utc::now()).unwrap();

        let result = verify_start(&mut request, "123456", Utc::now());

        assert!(matches!(result, Err(EngineError::Conflict(_))));
    }

    #[test]
    fn complete_requires_in_progress_and_owner() {
        let owner = Uuid::new_v4();
        let mut request = accepted_request(owner, "123456");

        assert!(matches!(
            complete(&mut request, owner, Utc::now()),
            Err(EngineError::Conflict(_))
        ));

        verify_start(&mut request, "123456", Utc::now()).unwrap();

        assert!(matches!(
            complete(&mut request, Uuid::new_v4(), Utc::now()),
            Err(EngineError::NotEligible(_))
        ));

        complete(&mut request, owner, Utc::now()).unwrap();
        assert_eq!(request.status, RequestStatus::Completed);
        assert!(request.completed_at.is_some());
    }

    #[test]
    fn cancel_is_forbidden_once_in_progress() {
        let owner = Uuid::new_v4();
        let mut request = accepted_request(owner, "123456");
        verify_start(&mut request, "123456", Utc::now()).unwrap();

        let result = cancel(&mut request, owner, Utc::now());

        assert!(matches!(result, Err(EngineError::Conflict(_))));
        assert_eq!(request.status, RequestStatus::InProgress);
    }

    #[test]
    fn cancel_from_accepted_clears_code() {
        let owner = Uuid::new_v4();
        let mut request = accepted_request(owner, "123456");

        cancel(&mut request, owner, Utc::now()).unwrap();

        assert_eq!(request.status, RequestStatus::Cancelled);
        assert_eq!(request.cancelled_by, Some(owner));
        assert!(request.verification_code.is_none());
    }

    #[test]
    fn terminal_states_absorb_everything() {
        let owner = Uuid::new_v4();
        let mut request = searching_request(owner);
        cancel(&mut request, owner, Utc::now()).unwrap();

        assert!(matches!(
            begin_acceptance(&mut request, Uuid::new_v4(), "1".into(), Utc::now()),
            Err(EngineError::Conflict(_))
        ));
        assert!(matches!(
            verify_start(&mut request, "1", Utc::now()),
            Err(EngineError::Conflict(_))
        ));
        assert!(matches!(
            complete(&mut request, owner, Utc::now()),
            Err(EngineError::Conflict(_))
        ));
        assert!(matches!(
            cancel(&mut request, owner, Utc::now()),
            Err(EngineError::Conflict(_))
        ));
        assert_eq!(request.status, RequestStatus::Cancelled);
    }

    #[test]
    fn feedback_rules() {
        let owner = Uuid::new_v4();
        let mut request = accepted_request(owner, "123456");

        assert!(matches!(
            record_feedback(&mut request, 4, None, Utc::now()),
            Err(EngineError::Conflict(_))
        ));

        verify_start(&mut request, "123456", Utc::now()).unwrap();
        complete(&mut request, owner, Utc::now()).unwrap();

        assert!(matches!(
            record_feedback(&mut request, 6, None, Utc::now()),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            record_feedback(&mut request, 0, None, Utc::now()),
            Err(EngineError::InvalidInput(_))
        ));

        record_feedback(&mut request, 5, Some("quick fix".to_string()), Utc::now()).unwrap();
        assert_eq!(request.rating, Some(5));

        assert!(matches!(
            record_feedback(&mut request, 4, None, Utc::now()),
            Err(EngineError::Conflict(_))
        ));
    }
}
