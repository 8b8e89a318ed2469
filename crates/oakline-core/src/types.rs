//! Records persisted by the portal: accounts, applications, notifications,
//! and the intake/back-office entities around them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::{self, MilestoneFlags, WorkflowStep};

/// The two actor roles the portal distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    User,
    Admin,
}

impl ActorRole {
    pub fn name(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// The role notified when this role completes a workflow step.
    pub fn counterpart(self) -> Self {
        match self {
            Self::User => Self::Admin,
            Self::Admin => Self::User,
        }
    }
}

/// A registered portal account, investor or administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: ActorRole,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(email: impl Into<String>, full_name: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            full_name: full_name.into(),
            role,
            created_at: Utc::now(),
        }
    }
}

/// Payout cadence fixed at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFrequency {
    Monthly,
    Quarterly,
    AtMaturity,
}

/// Investment terms captured once by the onboarding wizard and immutable
/// afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentTerms {
    /// Principal in whole dollars.
    pub investment_amount: u64,
    /// Annual rate in percent, in (0, 100].
    pub annual_percentage: f64,
    pub payment_frequency: PaymentFrequency,
    pub term_months: u32,
}

/// One investor's application walking the onboarding workflow.
///
/// Milestone flags are never stored here; they derive from `current_step`
/// (see [`MilestoneFlags::for_step`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentApplication {
    pub id: Uuid,
    pub investor_id: Uuid,
    #[serde(flatten)]
    pub terms: InvestmentTerms,
    pub current_step: WorkflowStep,
    /// Set once when the admin issues the promissory note for countersigning.
    pub note_issued_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvestmentApplication {
    pub fn new(investor_id: Uuid, terms: InvestmentTerms) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            investor_id,
            terms,
            current_step: WorkflowStep::SubscriptionPending,
            note_issued_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn milestones(&self) -> MilestoneFlags {
        MilestoneFlags::for_step(self.current_step)
    }

    /// Attach the derived presentation fields the dashboards render.
    pub fn into_view(self) -> ApplicationView {
        let step = self.current_step;
        ApplicationView {
            milestones: self.milestones(),
            display_text: workflow::display_text(step).to_string(),
            progress_percentage: workflow::progress_percentage(step),
            user_action_required: workflow::is_user_action_required(step),
            admin_action_required: workflow::is_admin_action_required(step),
            application: self,
        }
    }
}

/// An application together with every derived presentation value. This is the
/// shape the REST surface serializes; nothing in it is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: InvestmentApplication,
    #[serde(flatten)]
    pub milestones: MilestoneFlags,
    pub display_text: String,
    pub progress_percentage: u8,
    pub user_action_required: bool,
    pub admin_action_required: bool,
}

/// Event tags carried by notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ApplicationSubmitted,
    SubscriptionSigned,
    SubscriptionCountersigned,
    PromissoryNoteIssued,
    PromissoryNoteSigned,
    WireTransferCompleted,
    FundsConfirmed,
    BankAccountConnected,
    SetupCompleted,
    InvestmentCompleted,
    ApplicationCancelled,
    DocumentApproved,
    PaymentRecorded,
}

impl NotificationKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::ApplicationSubmitted => "application_submitted",
            Self::SubscriptionSigned => "subscription_signed",
            Self::SubscriptionCountersigned => "subscription_countersigned",
            Self::PromissoryNoteIssued => "promissory_note_issued",
            Self::PromissoryNoteSigned => "promissory_note_signed",
            Self::WireTransferCompleted => "wire_transfer_completed",
            Self::FundsConfirmed => "funds_confirmed",
            Self::BankAccountConnected => "bank_account_connected",
            Self::SetupCompleted => "setup_completed",
            Self::InvestmentCompleted => "investment_completed",
            Self::ApplicationCancelled => "application_cancelled",
            Self::DocumentApproved => "document_approved",
            Self::PaymentRecorded => "payment_recorded",
        }
    }
}

/// A persisted bell notification addressed to one actor role, optionally
/// narrowed to a single account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub application_id: Option<Uuid>,
    pub recipient_role: ActorRole,
    /// `None` broadcasts to every account holding `recipient_role`.
    pub recipient_account: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient_role: ActorRole,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            application_id: None,
            recipient_role,
            recipient_account: None,
            title: title.into(),
            message: message.into(),
            kind,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_application(mut self, application_id: Uuid) -> Self {
        self.application_id = Some(application_id);
        self
    }

    pub fn with_recipient_account(mut self, account_id: Uuid) -> Self {
        self.recipient_account = Some(account_id);
        self
    }
}

/// One append-only audit trail entry. `sequence` is assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub sequence: u64,
    pub actor: String,
    pub action: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            sequence: 0,
            actor: actor.into(),
            action: action.into(),
            detail: detail.into(),
            created_at: Utc::now(),
        }
    }
}

/// A prospective investor asking to speak with the team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationRequest {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub topic: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ConsultationRequest {
    pub fn new(
        full_name: impl Into<String>,
        email: impl Into<String>,
        topic: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name: full_name.into(),
            email: email.into(),
            phone: None,
            topic: topic.into(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// A message submitted through the public contact form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl ContactMessage {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            subject: subject.into(),
            body: body.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRequestStatus {
    Pending,
    Approved,
    Denied,
}

impl DocumentRequestStatus {
    pub fn name(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }
}

/// An investor's request for a statement or tax document. Resolution is
/// one-shot: a request leaves `pending` exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub id: Uuid,
    pub account_id: Uuid,
    pub document_name: String,
    pub status: DocumentRequestStatus,
    pub requested_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
}

impl DocumentRequest {
    pub fn new(account_id: Uuid, document_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            document_name: document_name.into(),
            status: DocumentRequestStatus::Pending,
            requested_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
        }
    }
}

/// A payout recorded against an active investment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub application_id: Uuid,
    /// Amount in whole dollars.
    pub amount: u64,
    pub memo: String,
    pub paid_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn new(application_id: Uuid, amount: u64, memo: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            application_id,
            amount,
            memo: memo.into(),
            paid_at: Utc::now(),
        }
    }
}

/// Counts returned by the privileged cascade deletes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionReport {
    pub deleted_id: Uuid,
    pub applications_removed: u64,
    pub payments_removed: u64,
    pub notifications_removed: u64,
    pub document_requests_removed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_terms() -> InvestmentTerms {
        InvestmentTerms {
            investment_amount: 250_000,
            annual_percentage: 12.0,
            payment_frequency: PaymentFrequency::Monthly,
            term_months: 24,
        }
    }

    #[test]
    fn new_application_starts_at_subscription_pending() {
        let application = InvestmentApplication::new(Uuid::new_v4(), sample_terms());
        assert_eq!(application.current_step, WorkflowStep::SubscriptionPending);
        assert!(application.note_issued_at.is_none());
        assert_eq!(application.milestones().count_set(), 0);
    }

    #[test]
    fn view_serializes_terms_and_flags_at_the_top_level() {
        let application = InvestmentApplication::new(Uuid::new_v4(), sample_terms());
        let encoded = serde_json::to_value(application.into_view()).unwrap();
        assert_eq!(encoded["investment_amount"], 250_000);
        assert_eq!(encoded["current_step"], "subscription_pending");
        assert_eq!(encoded["subscription_signed_by_user"], false);
        assert_eq!(encoded["display_text"], "Pending Your Signature");
        assert_eq!(encoded["progress_percentage"], 10);
        assert_eq!(encoded["user_action_required"], true);
        assert_eq!(encoded["admin_action_required"], false);
    }

    #[test]
    fn notification_builders_set_targeting() {
        let application_id = Uuid::new_v4();
        let account_id = Uuid::new_v4();
        let notification = Notification::new(
            ActorRole::User,
            NotificationKind::FundsConfirmed,
            "Funds Received",
            "We confirmed receipt of your funds.",
        )
        .with_application(application_id)
        .with_recipient_account(account_id);

        assert_eq!(notification.application_id, Some(application_id));
        assert_eq!(notification.recipient_account, Some(account_id));
        assert!(!notification.is_read);
    }

    #[test]
    fn roles_notify_their_counterpart() {
        assert_eq!(ActorRole::User.counterpart(), ActorRole::Admin);
        assert_eq!(ActorRole::Admin.counterpart(), ActorRole::User);
    }

    #[test]
    fn kind_names_match_wire_encoding() {
        for kind in [
            NotificationKind::ApplicationSubmitted,
            NotificationKind::PromissoryNoteSigned,
            NotificationKind::SetupCompleted,
            NotificationKind::DocumentApproved,
        ] {
            let encoded = serde_json::to_value(kind).unwrap();
            assert_eq!(encoded, serde_json::json!(kind.name()));
        }
    }
}
