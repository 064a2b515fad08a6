//! Composition root. Exposes the operations consumed by the API layer and
//! wires the matcher, escalation policy and assignment coordinator onto the
//! injected store.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::assignment;
use crate::engine::escalation::{EscalationOutcome, EscalationPolicy};
use crate::engine::lifecycle;
use crate::engine::matcher::{self, RequestMatch};
use crate::error::EngineError;
use crate::models::category::{ServiceCategory, VehicleCategory};
use crate::models::provider::{GeoPoint, Provider, SkillSet};
use crate::models::request::{RequestStatus, ServiceRequest};
use crate::models::requester::Requester;
use crate::observability::metrics::Metrics;
use crate::store::{Store, Transaction, Versioned};

pub struct NewRequest {
    pub requester_id: Uuid,
    pub vehicle: VehicleCategory,
    pub service: ServiceCategory,
    pub description: String,
    pub location: GeoPoint,
}

pub struct DispatchEngine<S> {
    store: Arc<S>,
    policy: EscalationPolicy,
    metrics: Metrics,
}

impl<S: Store> DispatchEngine<S> {
    pub fn new(store: Arc<S>, policy: EscalationPolicy, metrics: Metrics) -> Self {
        Self {
            store,
            policy,
            metrics,
        }
    }

    /// Creates a request and points the requester at it, atomically: a
    /// requester with a non-terminal request cannot create a second one.
    pub fn create_request(&self, new: NewRequest) -> Result<ServiceRequest, EngineError> {
        let mut requester = self.store.requester(new.requester_id).ok_or_else(|| {
            EngineError::NotFound(format!("requester {} not found", new.requester_id))
        })?;

        if let Some(active) = requester.record.active_request {
            return Err(EngineError::Conflict(format!(
                "requester already has an active request {active}"
            )));
        }

        let now = Utc::now();
        let request = ServiceRequest {
            id: Uuid::new_v4(),
            requester_id: new.requester_id,
            provider_id: None,
            vehicle: new.vehicle,
            service: new.service,
            description: new.description,
            requester_location: new.location,
            provider_location: None,
            search_radius_km: self.policy.initial_radius_km(),
            radius_expansions: 0,
            escalation_deadline: self.policy.first_deadline(now),
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

        requester.record.active_request = Some(request.id);
        self.store.commit(Transaction {
            request: Some(Versioned::new(request.clone())),
            requester: Some(requester),
            ..Transaction::default()
        })?;

        self.metrics.requests_created_total.inc();
        info!(
            request_id = %request.id,
            requester_id = %request.requester_id,
            radius_km = request.search_radius_km,
            "request created"
        );
        Ok(request)
    }

    /// Eligible `SEARCHING` requests for a provider, each refreshed through
    /// the escalation policy before matching.
    pub fn search_matches(&self, provider_id: Uuid) -> Result<Vec<RequestMatch>, EngineError> {
        let started = Instant::now();

        let provider = self
            .store
            .provider(provider_id)
            .ok_or_else(|| EngineError::NotFound(format!("provider {provider_id} not found")))?
            .record;

        if !provider.verified {
            return Err(EngineError::NotEligible("provider is not verified".to_string()));
        }
        if !provider.available {
            return Err(EngineError::NotEligible("provider is not available".to_string()));
        }
        let origin = provider.location.ok_or_else(|| {
            EngineError::NotEligible("provider location not set".to_string())
        })?;
        if provider.skills.is_empty() {
            return Err(EngineError::NotEligible(
                "provider skills not configured".to_string(),
            ));
        }

        let now = Utc::now();
        let mut candidates = Vec::new();
        for versioned in self.store.requests_with_status(RequestStatus::Searching) {
            let refreshed = self.refresh(versioned, now)?;
            if refreshed.record.status == RequestStatus::Searching {
                candidates.push(refreshed.record);
            }
        }

        let matches = matcher::eligible_matches(origin, &provider.skills, &candidates);
        self.metrics
            .match_latency_seconds
            .observe(started.elapsed().as_secs_f64());
        Ok(matches)
    }

    pub fn accept(&self, request_id: Uuid, provider_id: Uuid) -> Result<ServiceRequest, EngineError> {
        let result = assignment::accept(self.store.as_ref(), request_id, provider_id);
        let outcome = match &result {
            Ok(_) => "success",
            Err(EngineError::Conflict(_)) => "conflict",
            Err(_) => "rejected",
        };
        self.metrics
            .acceptances_total
            .with_label_values(&[outcome])
            .inc();
        result
    }

    pub fn verify_start(&self, request_id: Uuid, code: &str) -> Result<ServiceRequest, EngineError> {
        let mut request = self
            .store
            .request(request_id)
            .ok_or_else(|| EngineError::NotFound(format!("request {request_id} not found")))?;

        lifecycle::verify_start(&mut request.record, code, Utc::now())?;
        let snapshot = request.record.clone();
        self.store.update_request(request)?;

        info!(request_id = %request_id, "code verified, service started");
        Ok(snapshot)
    }

    pub fn complete(
        &self,
        request_id: Uuid,
        requester_id: Uuid,
    ) -> Result<ServiceRequest, EngineError> {
        let mut request = self
            .store
            .request(request_id)
            .ok_or_else(|| EngineError::NotFound(format!("request {request_id} not found")))?;

        lifecycle::complete(&mut request.record, requester_id, Utc::now())?;
        let snapshot = request.record.clone();
        self.store.update_request(request)?;

        if let Some(provider_id) = snapshot.provider_id {
            self.release_provider(provider_id, request_id)?;
        }
        self.release_requester(snapshot.requester_id, request_id)?;

        self.metrics
            .request_outcomes_total
            .with_label_values(&["completed"])
            .inc();
        info!(request_id = %request_id, "request completed");
        Ok(snapshot)
    }

    pub fn cancel(
        &self,
        request_id: Uuid,
        requester_id: Uuid,
    ) -> Result<ServiceRequest, EngineError> {
        let mut request = self
            .store
            .request(request_id)
            .ok_or_else(|| EngineError::NotFound(format!("request {request_id} not found")))?;

        lifecycle::cancel(&mut request.record, requester_id, Utc::now())?;
        let snapshot = request.record.clone();
        self.store.update_request(request)?;

        if let Some(provider_id) = snapshot.provider_id {
            self.release_provider(provider_id, request_id)?;
        }
        self.release_requester(snapshot.requester_id, request_id)?;

        self.metrics
            .request_outcomes_total
            .with_label_values(&["cancelled"])
            .inc();
        info!(request_id = %request_id, requester_id = %requester_id, "request cancelled");
        Ok(snapshot)
    }

    pub fn submit_feedback(
        &self,
        request_id: Uuid,
        rating: u8,
        feedback: Option<String>,
    ) -> Result<ServiceRequest, EngineError> {
        let mut request = self
            .store
            .request(request_id)
            .ok_or_else(|| EngineError::NotFound(format!("request {request_id} not found")))?;

        lifecycle::record_feedback(&mut request.record, rating, feedback, Utc::now())?;
        let snapshot = request.record.clone();
        self.store.update_request(request)?;
        Ok(snapshot)
    }

    /// Current snapshot of a request, refreshed through the escalation policy
    /// first so owner polling alone is enough to drive radius expansion and
    /// timeout.
    pub fn get_status(&self, request_id: Uuid) -> Result<ServiceRequest, EngineError> {
        let request = self
            .store
            .request(request_id)
            .ok_or_else(|| EngineError::NotFound(format!("request {request_id} not found")))?;

        let refreshed = self.refresh(request, Utc::now())?;
        Ok(refreshed.record)
    }

    /// Provider-reported position while a job is live, kept as a snapshot on
    /// the request so the owner can track the approach.
    pub fn update_provider_location(
        &self,
        request_id: Uuid,
        provider_id: Uuid,
        location: GeoPoint,
    ) -> Result<(), EngineError> {
        let mut request = self
            .store
            .request(request_id)
            .ok_or_else(|| EngineError::NotFound(format!("request {request_id} not found")))?;

        if request.record.provider_id != Some(provider_id) {
            return Err(EngineError::NotEligible(
                "only the assigned provider can report location".to_string(),
            ));
        }
        if !matches!(
            request.record.status,
            RequestStatus::Accepted | RequestStatus::InProgress
        ) {
            return Err(EngineError::Conflict(format!(
                "location tracking not active, current status: {}",
                request.record.status
            )));
        }

        request.record.provider_location = Some(location);
        self.store.update_request(request)
    }

    pub fn register_provider(&self, name: String, skills: SkillSet) -> Result<Provider, EngineError> {
        if name.trim().is_empty() {
            return Err(EngineError::InvalidInput("name cannot be empty".to_string()));
        }
        if skills.is_empty() {
            return Err(EngineError::InvalidInput(
                "at least one vehicle and one service skill are required".to_string(),
            ));
        }

        let now = Utc::now();
        let provider = Provider {
            id: Uuid::new_v4(),
            name,
            verified: false,
            available: false,
            location: None,
            skills,
            active_request: None,
            created_at: now,
            updated_at: now,
        };
        self.store.commit(Transaction {
            provider: Some(Versioned::new(provider.clone())),
            ..Transaction::default()
        })?;

        info!(provider_id = %provider.id, "provider registered, awaiting verification");
        Ok(provider)
    }

    pub fn register_requester(&self, name: String) -> Result<Requester, EngineError> {
        if name.trim().is_empty() {
            return Err(EngineError::InvalidInput("name cannot be empty".to_string()));
        }

        let requester = Requester {
            id: Uuid::new_v4(),
            name,
            active_request: None,
            created_at: Utc::now(),
        };
        self.store.commit(Transaction {
            requester: Some(Versioned::new(requester.clone())),
            ..Transaction::default()
        })?;
        Ok(requester)
    }

    /// Moderation hook. The engine itself only ever reads `verified`.
    pub fn set_verified(&self, provider_id: Uuid, verified: bool) -> Result<Provider, EngineError> {
        let mut provider = self
            .store
            .provider(provider_id)
            .ok_or_else(|| EngineError::NotFound(format!("provider {provider_id} not found")))?;

        provider.record.verified = verified;
        provider.record.updated_at = Utc::now();
        let snapshot = provider.record.clone();
        self.store.update_provider(provider)?;
        Ok(snapshot)
    }

    pub fn set_availability(
        &self,
        provider_id: Uuid,
        available: bool,
        location: Option<GeoPoint>,
    ) -> Result<Provider, EngineError> {
        let mut provider = self
            .store
            .provider(provider_id)
            .ok_or_else(|| EngineError::NotFound(format!("provider {provider_id} not found")))?;

        if !provider.record.verified {
            return Err(EngineError::NotEligible("provider is not verified".to_string()));
        }

        if available {
            if provider.record.active_request.is_some() {
                return Err(EngineError::Conflict(
                    "provider has an active job".to_string(),
                ));
            }
            let location = location.ok_or_else(|| {
                EngineError::InvalidInput("location is required to go available".to_string())
            })?;
            provider.record.location = Some(location);
        }

        provider.record.available = available;
        provider.record.updated_at = Utc::now();
        let snapshot = provider.record.clone();
        self.store.update_provider(provider)?;
        Ok(snapshot)
    }

    pub fn configure_skills(
        &self,
        provider_id: Uuid,
        skills: SkillSet,
    ) -> Result<Provider, EngineError> {
        if skills.is_empty() {
            return Err(EngineError::InvalidInput(
                "at least one vehicle and one service skill are required".to_string(),
            ));
        }

        let mut provider = self
            .store
            .provider(provider_id)
            .ok_or_else(|| EngineError::NotFound(format!("provider {provider_id} not found")))?;

        provider.record.skills = skills;
        provider.record.updated_at = Utc::now();
        let snapshot = provider.record.clone();
        self.store.update_provider(provider)?;
        Ok(snapshot)
    }

    pub fn provider_profile(&self, provider_id: Uuid) -> Result<Provider, EngineError> {
        self.store
            .provider(provider_id)
            .map(|versioned| versioned.record)
            .ok_or_else(|| EngineError::NotFound(format!("provider {provider_id} not found")))
    }

    pub fn requester_profile(&self, requester_id: Uuid) -> Result<Requester, EngineError> {
        self.store
            .requester(requester_id)
            .map(|versioned| versioned.record)
            .ok_or_else(|| EngineError::NotFound(format!("requester {requester_id} not found")))
    }

    /// Completed jobs served by a provider, most recent first.
    pub fn provider_history(&self, provider_id: Uuid) -> Result<Vec<ServiceRequest>, EngineError> {
        self.provider_profile(provider_id)?;

        let mut jobs: Vec<ServiceRequest> = self
            .store
            .requests_for_provider(provider_id)
            .into_iter()
            .filter(|request| request.status == RequestStatus::Completed)
            .collect();
        jobs.sort_by_key(|request| std::cmp::Reverse(request.completed_at));
        Ok(jobs)
    }

    /// A requester's closed episodes, most recent first.
    pub fn requester_history(&self, requester_id: Uuid) -> Result<Vec<ServiceRequest>, EngineError> {
        self.requester_profile(requester_id)?;

        let mut episodes: Vec<ServiceRequest> = self
            .store
            .requests_for_requester(requester_id)
            .into_iter()
            .filter(|request| request.status.is_terminal())
            .collect();
        episodes.sort_by_key(|request| std::cmp::Reverse(request.created_at));
        Ok(episodes)
    }

    /// Lazy escalation check every read path goes through. Returns the fresh
    /// snapshot; when a concurrent reader escalated the same request first,
    /// its result wins and the lost write is not an error.
    fn refresh(
        &self,
        mut request: Versioned<ServiceRequest>,
        now: DateTime<Utc>,
    ) -> Result<Versioned<ServiceRequest>, EngineError> {
        let outcome = self.policy.evaluate(&mut request.record, now);
        if outcome == EscalationOutcome::Unchanged {
            return Ok(request);
        }

        match self.store.update_request(request.clone()) {
            Ok(()) => {}
            Err(EngineError::Conflict(_)) => {
                return self.store.request(request.record.id).ok_or_else(|| {
                    EngineError::Internal(format!("request {} disappeared", request.record.id))
                });
            }
            Err(err) => return Err(err),
        }
        request.version += 1;

        match outcome {
            EscalationOutcome::Expanded => {
                self.metrics.radius_escalations_total.inc();
                info!(
                    request_id = %request.record.id,
                    radius_km = request.record.search_radius_km,
                    expansions = request.record.radius_expansions,
                    "search radius expanded"
                );
            }
            EscalationOutcome::TimedOut => {
                self.release_requester(request.record.requester_id, request.record.id)?;
                self.metrics
                    .request_outcomes_total
                    .with_label_values(&["timeout"])
                    .inc();
                warn!(request_id = %request.record.id, "request timed out with no acceptance");
            }
            EscalationOutcome::Unchanged => unreachable!(),
        }

        Ok(request)
    }

    /// Idempotent: makes the provider available again once, no matter how
    /// many terminal paths race over it.
    fn release_provider(&self, provider_id: Uuid, request_id: Uuid) -> Result<(), EngineError> {
        loop {
            let Some(mut provider) = self.store.provider(provider_id) else {
                return Ok(());
            };
            if provider.record.active_request != Some(request_id) {
                return Ok(());
            }

            provider.record.active_request = None;
            provider.record.available = true;
            provider.record.updated_at = Utc::now();
            match self.store.update_provider(provider) {
                Ok(()) => return Ok(()),
                Err(EngineError::Conflict(_)) => continue,
                Err(err) => return Err(err),
            }
        }
    }

    fn release_requester(&self, requester_id: Uuid, request_id: Uuid) -> Result<(), EngineError> {
        loop {
            let Some(mut requester) = self.store.requester(requester_id) else {
                return Ok(());
            };
            if requester.record.active_request != Some(request_id) {
                return Ok(());
            }

            requester.record.active_request = None;
            match self.store.update_requester(requester) {
                Ok(()) => return Ok(()),
                Err(EngineError::Conflict(_)) => continue,
                Err(err) => return Err(err),
            }
        }
    }
}
