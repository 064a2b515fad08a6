use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A service consumer (vehicle owner). At most one non-terminal request at a
/// time, tracked by `active_request` and enforced at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requester {
    pub id: Uuid,
    pub name: String,
    pub active_request: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
