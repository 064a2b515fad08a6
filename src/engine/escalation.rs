//! Progressive-radius search policy.
//!
//! There is no background timer. The policy is evaluated lazily whenever a
//! `SEARCHING` request is read or matched against, so staleness is bounded by
//! the read-poll interval of the owner and of searching providers.

use chrono::{DateTime, Duration, Utc};

use crate::engine::lifecycle;
use crate::error::EngineError;
use crate::models::request::{RequestStatus, ServiceRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationOutcome {
    Unchanged,
    Expanded,
    TimedOut,
}

/// Ordered radius steps, expansion bound and check interval. The step
/// sequence is external configuration, validated once at startup.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    steps_km: Vec<f64>,
    max_expansions: u32,
    interval: Duration,
}

impl EscalationPolicy {
    pub fn new(
        steps_km: Vec<f64>,
        max_expansions: u32,
        interval: Duration,
    ) -> Result<Self, EngineError> {
        if steps_km.is_empty() {
            return Err(EngineError::InvalidInput(
                "at least one radius step is required".to_string(),
            ));
        }
        if !steps_km.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(EngineError::InvalidInput(
                "radius steps must be strictly increasing".to_string(),
            ));
        }
        if max_expansions as usize >= steps_km.len() {
            return Err(EngineError::InvalidInput(format!(
                "{max_expansions} expansions need {} radius steps, {} configured",
                max_expansions as usize + 1,
                steps_km.len()
            )));
        }

        Ok(Self {
            steps_km,
            max_expansions,
            interval,
        })
    }

    pub fn initial_radius_km(&self) -> f64 {
        self.steps_km[0]
    }

    pub fn first_deadline(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.interval
    }

    /// Advances the radius state of a `SEARCHING` request in place, one step
    /// per evaluation. The caller persists the snapshot and, on `TimedOut`,
    /// releases the requester's active-request id.
    pub fn evaluate(&self, request: &mut ServiceRequest, now: DateTime<Utc>) -> EscalationOutcome {
        if request.status != RequestStatus::Searching {
            return EscalationOutcome::Unchanged;
        }
        if now < request.escalation_deadline {
            return EscalationOutcome::Unchanged;
        }

        if request.radius_expansions < self.max_expansions {
            let next_step = request.radius_expansions as usize + 1;
            request.search_radius_km = self.steps_km[next_step];
            request.radius_expansions += 1;
            request.escalation_deadline = now + self.interval;
            EscalationOutcome::Expanded
        } else {
            lifecycle::time_out(request, now);
            EscalationOutcome::TimedOut
        }
    }
}
