use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::provider::Provider;
use crate::models::request::{RequestStatus, ServiceRequest};
use crate::models::requester::Requester;
use crate::store::{Store, Transaction, Versioned};

/// In-memory store for a single engine instance and for tests. Each record
/// carries a monotonically increasing version; commits validate every staged
/// version while holding the affected entries, then apply all writes.
#[derive(Default)]
pub struct MemoryStore {
    requests: DashMap<Uuid, Versioned<ServiceRequest>>,
    providers: DashMap<Uuid, Versioned<Provider>>,
    requesters: DashMap<Uuid, Versioned<Requester>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn stage<'a, T>(
    map: &'a DashMap<Uuid, Versioned<T>>,
    kind: &str,
    id: Uuid,
    expected: u64,
) -> Result<Entry<'a, Uuid, Versioned<T>>, EngineError> {
    let entry = map.entry(id);
    let stored = match &entry {
        Entry::Occupied(occupied) => Some(occupied.get().version),
        Entry::Vacant(_) => None,
    };

    match (stored, expected) {
        (None, 0) => Ok(entry),
        (Some(version), expected) if expected > 0 && version == expected => Ok(entry),
        (Some(_), 0) => Err(EngineError::Conflict(format!("{kind} {id} already exists"))),
        _ => Err(EngineError::Conflict(format!(
            "{kind} {id} was modified concurrently"
        ))),
    }
}

impl Store for MemoryStore {
    fn request(&self, id: Uuid) -> Option<Versioned<ServiceRequest>> {
        self.requests.get(&id).map(|entry| entry.value().clone())
    }

    fn provider(&self, id: Uuid) -> Option<Versioned<Provider>> {
        self.providers.get(&id).map(|entry| entry.value().clone())
    }

    fn requester(&self, id: Uuid) -> Option<Versioned<Requester>> {
        self.requesters.get(&id).map(|entry| entry.value().clone())
    }

    fn requests_with_status(&self, status: RequestStatus) -> Vec<Versioned<ServiceRequest>> {
        self.requests
            .iter()
            .filter(|entry| entry.value().record.status == status)
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn requests_for_provider(&self, provider_id: Uuid) -> Vec<ServiceRequest> {
        self.requests
            .iter()
            .filter(|entry| entry.value().record.provider_id == Some(provider_id))
            .map(|entry| entry.value().record.clone())
            .collect()
    }

    fn requests_for_requester(&self, requester_id: Uuid) -> Vec<ServiceRequest> {
        self.requests
            .iter()
            .filter(|entry| entry.value().record.requester_id == requester_id)
            .map(|entry| entry.value().record.clone())
            .collect()
    }

    fn commit(&self, txn: Transaction) -> Result<(), EngineError> {
        let Transaction {
            request,
            provider,
            requester,
        } = txn;

        // Entries are acquired in a fixed order (request, provider, requester)
        // so concurrent commits cannot deadlock. All versions are validated
        // while every affected entry is held; only then are writes applied.
        let request_entry = match &request {
            Some(write) => Some(stage(&self.requests, "request", write.record.id, write.version)?),
            None => None,
        };
        let provider_entry = match &provider {
            Some(write) => Some(stage(
                &self.providers,
                "provider",
                write.record.id,
                write.version,
            )?),
            None => None,
        };
        let requester_entry = match &requester {
            Some(write) => Some(stage(
                &self.requesters,
                "requester",
                write.record.id,
                write.version,
            )?),
            None => None,
        };

        if let (Some(entry), Some(write)) = (request_entry, request) {
            entry.insert(Versioned {
                version: write.version + 1,
                record: write.record,
            });
        }
        if let (Some(entry), Some(write)) = (provider_entry, provider) {
            entry.insert(Versioned {
                version: write.version + 1,
                record: write.record,
            });
        }
        if let (Some(entry), Some(write)) = (requester_entry, requester) {
            entry.insert(Versioned {
                version: write.version + 1,
                record: write.record,
            });
        }

        Ok(())
    }
}
