//! Persistence layer for the portal.
//!
//! Storage is split per concern behind async traits; [`PortalStorage`] sums
//! them into the single handle the engine injects. Two backends ship: an
//! in-process map for development and tests, and PostgreSQL for deployments.
//!
//! Step writes are conditional: [`ApplicationStorage::advance_step`] and
//! [`ApplicationStorage::issue_note`] apply only while the stored row still
//! matches the caller's expectation, and report [`StepAdvance::Conflict`]
//! otherwise. That check-and-set is what keeps a doubled click or a racing
//! webhook from advancing an application twice.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::PortalResult;
use crate::types::{
    Account, ActivityRecord, ActorRole, ConsultationRequest, ContactMessage, DocumentRequest,
    DocumentRequestStatus, InvestmentApplication, Notification, PaymentRecord,
};
use crate::workflow::WorkflowStep;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;

/// Persistence backend selection.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// Keep every record in process memory. State is lost on restart.
    Memory,
    /// Persist records in PostgreSQL.
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

impl StorageConfig {
    pub fn memory() -> Self {
        Self::Memory
    }

    pub fn postgres(database_url: impl Into<String>, max_connections: u32) -> Self {
        Self::Postgres {
            database_url: database_url.into(),
            max_connections,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres { .. } => "postgres",
        }
    }

    /// Connect the configured backend, run idempotent schema setup, and hand
    /// back the shared storage handle.
    pub async fn bootstrap(&self) -> PortalResult<Arc<dyn PortalStorage>> {
        match self {
            Self::Memory => Ok(Arc::new(MemoryStorage::new())),
            Self::Postgres {
                database_url,
                max_connections,
            } => {
                let store =
                    PostgresStorage::connect(database_url, (*max_connections).max(1)).await?;
                Ok(Arc::new(store))
            }
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Memory
    }
}

/// Outcome of a conditional step write.
#[derive(Debug, Clone)]
pub enum StepAdvance {
    /// The guard matched; the updated application is returned.
    Applied(InvestmentApplication),
    /// The application exists but no longer satisfies the guard. Carries the
    /// step the row actually holds.
    Conflict(WorkflowStep),
    /// No application with that id.
    Missing,
}

#[async_trait]
pub trait AccountStorage {
    async fn insert_account(&self, account: &Account) -> PortalResult<()>;
    async fn fetch_account(&self, id: Uuid) -> PortalResult<Option<Account>>;
    async fn fetch_account_by_email(&self, email: &str) -> PortalResult<Option<Account>>;
    async fn list_accounts(&self) -> PortalResult<Vec<Account>>;
    async fn delete_account(&self, id: Uuid) -> PortalResult<bool>;
}

#[async_trait]
pub trait ApplicationStorage {
    async fn insert_application(&self, application: &InvestmentApplication) -> PortalResult<()>;
    async fn fetch_application(&self, id: Uuid) -> PortalResult<Option<InvestmentApplication>>;
    async fn list_applications(&self) -> PortalResult<Vec<InvestmentApplication>>;
    async fn list_applications_for(
        &self,
        investor_id: Uuid,
    ) -> PortalResult<Vec<InvestmentApplication>>;

    /// Move `current_step` from `expected` to `next` iff the row still sits at
    /// `expected`.
    async fn advance_step(
        &self,
        id: Uuid,
        expected: WorkflowStep,
        next: WorkflowStep,
    ) -> PortalResult<StepAdvance>;

    /// Stamp `note_issued_at` iff the row sits at `promissory_note_pending`
    /// with no note issued yet. Does not move the step.
    async fn issue_note(&self, id: Uuid, issued_at: DateTime<Utc>) -> PortalResult<StepAdvance>;

    async fn delete_application(&self, id: Uuid) -> PortalResult<bool>;
}

#[async_trait]
pub trait NotificationStorage {
    async fn insert_notification(&self, notification: &Notification) -> PortalResult<()>;

    /// Notifications for `role`, newest first, capped at `limit`. When
    /// `account` is set, only notices addressed to that account are returned.
    async fn list_notifications(
        &self,
        role: ActorRole,
        account: Option<Uuid>,
        limit: usize,
    ) -> PortalResult<Vec<Notification>>;

    async fn mark_read(&self, id: Uuid) -> PortalResult<Option<Notification>>;
    async fn mark_all_read(&self, role: ActorRole, account: Option<Uuid>) -> PortalResult<u64>;
    async fn unread_count(&self, role: ActorRole, account: Option<Uuid>) -> PortalResult<u64>;
    async fn delete_notifications_for(&self, application_id: Uuid) -> PortalResult<u64>;
}

#[async_trait]
pub trait ActivityStorage {
    /// Append the entry; the store assigns and returns its sequence number.
    async fn record_activity(&self, entry: &ActivityRecord) -> PortalResult<u64>;

    /// Entries in ascending sequence order. With `after_sequence` set, only
    /// entries past that cursor; otherwise the newest `limit` entries.
    async fn list_activity(
        &self,
        after_sequence: Option<u64>,
        limit: usize,
    ) -> PortalResult<Vec<ActivityRecord>>;
}

#[async_trait]
pub trait ConsultationStorage {
    async fn insert_consultation(&self, request: &ConsultationRequest) -> PortalResult<()>;
    async fn list_consultations(&self) -> PortalResult<Vec<ConsultationRequest>>;
    async fn delete_consultation(&self, id: Uuid) -> PortalResult<bool>;
}

#[async_trait]
pub trait ContactStorage {
    async fn insert_contact_message(&self, message: &ContactMessage) -> PortalResult<()>;
    async fn list_contact_messages(&self) -> PortalResult<Vec<ContactMessage>>;
}

#[async_trait]
pub trait DocumentStorage {
    async fn insert_document_request(&self, request: &DocumentRequest) -> PortalResult<()>;
    async fn fetch_document_request(&self, id: Uuid) -> PortalResult<Option<DocumentRequest>>;
    async fn list_document_requests(
        &self,
        account: Option<Uuid>,
    ) -> PortalResult<Vec<DocumentRequest>>;

    /// One-shot resolution: applies iff the request is still pending, and
    /// returns `None` otherwise.
    async fn resolve_document_request(
        &self,
        id: Uuid,
        status: DocumentRequestStatus,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> PortalResult<Option<DocumentRequest>>;

    async fn delete_document_requests_for(&self, account_id: Uuid) -> PortalResult<u64>;
}

#[async_trait]
pub trait PaymentStorage {
    async fn insert_payment(&self, payment: &PaymentRecord) -> PortalResult<()>;
    async fn list_payments_for(&self, application_id: Uuid) -> PortalResult<Vec<PaymentRecord>>;
    async fn delete_payments_for(&self, application_id: Uuid) -> PortalResult<u64>;
}

/// Everything the portal persists, behind one injectable handle.
pub trait PortalStorage:
    AccountStorage
    + ApplicationStorage
    + NotificationStorage
    + ActivityStorage
    + ConsultationStorage
    + ContactStorage
    + DocumentStorage
    + PaymentStorage
    + Send
    + Sync
{
    fn backend_label(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_memory() {
        assert_eq!(StorageConfig::default().label(), "memory");
    }

    #[test]
    fn postgres_config_reports_its_label() {
        let config = StorageConfig::postgres("postgres://localhost/oakline", 8);
        assert_eq!(config.label(), "postgres");
    }

    #[tokio::test]
    async fn bootstrap_memory_backend() {
        let store = StorageConfig::memory().bootstrap().await.unwrap();
        assert_eq!(store.backend_label(), "memory");
        assert!(store.list_accounts().await.unwrap().is_empty());
    }
}
