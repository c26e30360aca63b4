//! Ports (driven side) for the collaborators the dispatcher depends on.
//!
//! Implementations live outside this crate in production; [`crate::adapter`]
//! provides in-memory versions for tests and simulation.

use async_trait::async_trait;

use crate::domain::{AlertRecord, AlertStatus, Contact, HistoryRecord, RecordId};
use crate::error::{GuardianError, StoreError};

/// Read-only source of a user's emergency contacts
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// All contacts configured by `user_id`
    async fn list_contacts(&self, user_id: &str) -> Result<Vec<Contact>, GuardianError>;
}

/// Durable storage for dispatched alerts
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Write the public record responders see
    async fn put_active_alert(&self, record: &AlertRecord) -> Result<RecordId, StoreError>;

    /// Append to the initiating user's private history
    async fn append_history(&self, user_id: &str, record: &HistoryRecord) -> Result<(), StoreError>;

    /// Close a public record as resolved or cancelled
    async fn update_status(&self, id: RecordId, status: AlertStatus) -> Result<(), StoreError>;
}
