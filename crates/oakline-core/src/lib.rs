//! # Oakline Core
//!
//! Domain engine for the Oakline private-lending investor portal. The crate
//! owns the investment application workflow, a ten-step signing and funding
//! chain walked by conditional writes, plus the notification fan-out, intake
//! records, document requests, payouts, and the audit trail behind the admin
//! console.
//!
//! Presentation is derived, never stored: milestone flags, display labels,
//! progress, and action badges are all computed from `current_step` on the
//! way out, so a replayed or repaired application can never disagree with
//! its own checklist.
//!
//! Storage is pluggable through [`PortalStorage`], with an in-memory backend
//! for tests and development and a PostgreSQL backend for deployment.
//!
//! ## Example
//!
//! ```no_run
//! use oakline_core::{
//!     ActorRole, InvestmentTerms, PaymentFrequency, PortalEngine, StorageConfig,
//! };
//!
//! # async fn run() -> oakline_core::PortalResult<()> {
//! let engine = PortalEngine::bootstrap(StorageConfig::memory()).await?;
//!
//! let investor = engine
//!     .register_account("ava@example.com", "Ava Chen", ActorRole::User)
//!     .await?;
//! let application = engine
//!     .submit_application(
//!         investor.id,
//!         InvestmentTerms {
//!             investment_amount: 250_000,
//!             annual_percentage: 12.0,
//!             payment_frequency: PaymentFrequency::Monthly,
//!             term_months: 24,
//!         },
//!     )
//!     .await?;
//!
//! engine
//!     .sign_subscription(application.application.id, investor.id)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod engine;
pub mod error;
pub mod notify;
pub mod store;
pub mod types;
pub mod workflow;

pub use engine::PortalEngine;
pub use error::{PortalError, PortalResult};
pub use store::{
    AccountStorage, ActivityStorage, ApplicationStorage, ConsultationStorage, ContactStorage,
    DocumentStorage, MemoryStorage, NotificationStorage, PaymentStorage, PortalStorage,
    PostgresStorage, StepAdvance, StorageConfig,
};
pub use types::{
    Account, ActivityRecord, ActorRole, ApplicationView, ConsultationRequest, ContactMessage,
    DeletionReport, DocumentRequest, DocumentRequestStatus, InvestmentApplication,
    InvestmentTerms, Notification, NotificationKind, PaymentFrequency, PaymentRecord,
};
pub use workflow::{MilestoneFlags, WorkflowStep, FORWARD_CHAIN, UNKNOWN_STEP_LABEL};
