//! Store-access interface the engine is written against.
//!
//! The engine never talks to a concrete database; it reads versioned record
//! snapshots and commits staged writes back through [`Store`]. A commit is
//! all-or-nothing: every staged record must still be at the version it was
//! read at, otherwise the whole commit fails with `Conflict` and nothing is
//! applied. That compare-and-swap is the only isolation primitive the engine
//! needs: exactly one of two racing accepts can commit.

pub mod memory;

use uuid::Uuid;

use crate::error::EngineError;
use crate::models::provider::Provider;
use crate::models::request::{RequestStatus, ServiceRequest};
use crate::models::requester::Requester;

/// A record snapshot together with the version it was read at.
///
/// Version 0 marks a record that has not been persisted yet; committing it
/// inserts the record and fails `Conflict` if the id is already taken.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub version: u64,
    pub record: T,
}

impl<T> Versioned<T> {
    pub fn new(record: T) -> Self {
        Self { version: 0, record }
    }
}

/// Staged writes applied atomically. At most one record per entity kind;
/// no engine operation touches more than that.
#[derive(Debug, Default)]
pub struct Transaction {
    pub request: Option<Versioned<ServiceRequest>>,
    pub provider: Option<Versioned<Provider>>,
    pub requester: Option<Versioned<Requester>>,
}

pub trait Store: Send + Sync {
    fn request(&self, id: Uuid) -> Option<Versioned<ServiceRequest>>;
    fn provider(&self, id: Uuid) -> Option<Versioned<Provider>>;
    fn requester(&self, id: Uuid) -> Option<Versioned<Requester>>;

    fn requests_with_status(&self, status: RequestStatus) -> Vec<Versioned<ServiceRequest>>;
    fn requests_for_provider(&self, provider_id: Uuid) -> Vec<ServiceRequest>;
    fn requests_for_requester(&self, requester_id: Uuid) -> Vec<ServiceRequest>;

    /// Applies all staged writes together or none of them. Fails `Conflict`
    /// if any staged record moved past the version it was read at.
    fn commit(&self, txn: Transaction) -> Result<(), EngineError>;

    fn update_request(&self, request: Versioned<ServiceRequest>) -> Result<(), EngineError> {
        self.commit(Transaction {
            request: Some(request),
            ..Transaction::default()
        })
    }

    fn update_provider(&self, provider: Versioned<Provider>) -> Result<(), EngineError> {
        self.commit(Transaction {
            provider: Some(provider),
            ..Transaction::default()
        })
    }

    fn update_requester(&self, requester: Versioned<Requester>) -> Result<(), EngineError> {
        self.commit(Transaction {
            requester: Some(requester),
            ..Transaction::default()
        })
    }
}
