use std::sync::Arc;

use chrono::Duration;

use crate::config::DispatchConfig;
use crate::engine::dispatch::DispatchEngine;
use crate::engine::escalation::EscalationPolicy;
use crate::error::EngineError;
use crate::observability::metrics::Metrics;
use crate::store::memory::MemoryStore;

pub struct AppState {
    pub engine: DispatchEngine<MemoryStore>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(dispatch: &DispatchConfig) -> Result<Self, EngineError> {
        let policy = EscalationPolicy::new(
            dispatch.radius_steps_km.clone(),
            dispatch.max_expansions,
            Duration::seconds(dispatch.escalation_interval_secs as i64),
        )?;
        let metrics = Metrics::new();
        let engine = DispatchEngine::new(Arc::new(MemoryStore::new()), policy, metrics.clone());

        Ok(Self { engine, metrics })
    }
}
