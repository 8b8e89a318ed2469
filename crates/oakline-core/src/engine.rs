//! Portal engine: every workflow, notification, intake, and admin operation,
//! executed over injected storage.
//!
//! Role checks fail closed. An unknown actor, a role mismatch, or a storage
//! failure during the role lookup all reject the call before anything is
//! written. Step transitions go through the storage layer's conditional
//! writes, so two racing calls can never both advance an application.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{PortalError, PortalResult};
use crate::notify;
use crate::store::{PortalStorage, StepAdvance, StorageConfig};
use crate::types::{
    Account, ActivityRecord, ActorRole, ApplicationView, ConsultationRequest, ContactMessage,
    DeletionReport, DocumentRequest, DocumentRequestStatus, InvestmentApplication,
    InvestmentTerms, Notification, NotificationKind, PaymentRecord,
};
use crate::workflow::WorkflowStep;

pub struct PortalEngine {
    store: Arc<dyn PortalStorage>,
}

impl PortalEngine {
    pub fn new(store: Arc<dyn PortalStorage>) -> Self {
        Self { store }
    }

    /// Connect the configured storage backend and build the engine on it.
    pub async fn bootstrap(config: StorageConfig) -> PortalResult<Self> {
        let store = config.bootstrap().await?;
        Ok(Self::new(store))
    }

    pub fn backend_label(&self) -> &'static str {
        self.store.backend_label()
    }

    // ── Accounts ────────────────────────────────────────────────────────

    pub async fn register_account(
        &self,
        email: impl Into<String>,
        full_name: impl Into<String>,
        role: ActorRole,
    ) -> PortalResult<Account> {
        let email = email.into();
        if email.trim().is_empty() || !email.contains('@') {
            return Err(PortalError::Validation(
                "a valid email address is required".to_string(),
            ));
        }
        let full_name = full_name.into();
        if full_name.trim().is_empty() {
            return Err(PortalError::Validation(
                "full_name must not be empty".to_string(),
            ));
        }
        if self.store.fetch_account_by_email(&email).await?.is_some() {
            return Err(PortalError::Validation(format!(
                "an account with email '{email}' already exists"
            )));
        }

        let account = Account::new(email, full_name, role);
        self.store.insert_account(&account).await?;
        info!(account_id = %account.id, role = account.role.name(), "account registered");
        Ok(account)
    }

    pub async fn get_account(&self, account_id: Uuid) -> PortalResult<Account> {
        self.store
            .fetch_account(account_id)
            .await?
            .ok_or_else(|| PortalError::not_found("account", account_id))
    }

    pub async fn list_accounts(&self, actor_id: Uuid) -> PortalResult<Vec<Account>> {
        self.require_role(actor_id, ActorRole::Admin).await?;
        self.store.list_accounts().await
    }

    // ── Applications ────────────────────────────────────────────────────

    pub async fn submit_application(
        &self,
        investor_id: Uuid,
        terms: InvestmentTerms,
    ) -> PortalResult<ApplicationView> {
        let investor = self.get_account(investor_id).await?;
        if investor.role != ActorRole::User {
            return Err(PortalError::Validation(
                "applications can only be opened for investor accounts".to_string(),
            ));
        }
        validate_terms(&terms)?;

        let application = InvestmentApplication::new(investor_id, terms);
        self.store.insert_application(&application).await?;
        self.store
            .insert_notification(&notify::notice_for(
                &application,
                NotificationKind::ApplicationSubmitted,
            ))
            .await?;
        self.record(
            investor_id.to_string(),
            "application_submitted",
            format!(
                "application {} opened for ${} over {} months",
                application.id, application.terms.investment_amount, application.terms.term_months
            ),
        )
        .await?;
        info!(
            application_id = %application.id,
            investor_id = %investor_id,
            amount = application.terms.investment_amount,
            "investment application submitted"
        );
        Ok(application.into_view())
    }

    pub async fn get_application(&self, application_id: Uuid) -> PortalResult<ApplicationView> {
        Ok(self.fetch_required(application_id).await?.into_view())
    }

    /// Applications visible to `actor_id`: admins see every application,
    /// investors see their own.
    pub async fn list_applications(&self, actor_id: Uuid) -> PortalResult<Vec<ApplicationView>> {
        let account = self.store.fetch_account(actor_id).await?.ok_or_else(|| {
            PortalError::Unauthorized(format!("account '{actor_id}' is not registered"))
        })?;
        let applications = match account.role {
            ActorRole::Admin => self.store.list_applications().await?,
            ActorRole::User => self.store.list_applications_for(account.id).await?,
        };
        Ok(applications
            .into_iter()
            .map(InvestmentApplication::into_view)
            .collect())
    }

    // ── Workflow transitions ────────────────────────────────────────────

    pub async fn sign_subscription(
        &self,
        application_id: Uuid,
        actor_id: Uuid,
    ) -> PortalResult<ApplicationView> {
        self.transition(
            application_id,
            actor_id,
            ActorRole::User,
            WorkflowStep::SubscriptionPending,
            WorkflowStep::SubscriptionAdminReview,
            NotificationKind::SubscriptionSigned,
            "subscription_signed",
        )
        .await
    }

    pub async fn admin_sign_subscription(
        &self,
        application_id: Uuid,
        actor_id: Uuid,
    ) -> PortalResult<ApplicationView> {
        self.transition(
            application_id,
            actor_id,
            ActorRole::Admin,
            WorkflowStep::SubscriptionAdminReview,
            WorkflowStep::PromissoryNotePending,
            NotificationKind::SubscriptionCountersigned,
            "subscription_countersigned",
        )
        .await
    }

    /// Issue the promissory note for investor countersigning. Stamps
    /// `note_issued_at` without moving the step; the application advances when
    /// the investor signs.
    pub async fn create_promissory_note(
        &self,
        application_id: Uuid,
        actor_id: Uuid,
    ) -> PortalResult<ApplicationView> {
        let actor = self.require_role(actor_id, ActorRole::Admin).await?;
        let application = self.fetch_required(application_id).await?;
        if application.current_step != WorkflowStep::PromissoryNotePending {
            return Err(PortalError::step_conflict(
                WorkflowStep::PromissoryNotePending.name(),
                application.current_step.name(),
            ));
        }
        if application.note_issued_at.is_some() {
            return Err(PortalError::InvalidTransition(
                "the promissory note has already been issued".to_string(),
            ));
        }

        let updated = match self.store.issue_note(application_id, Utc::now()).await? {
            StepAdvance::Applied(application) => application,
            StepAdvance::Conflict(_) => {
                return Err(PortalError::InvalidTransition(
                    "the promissory note has already been issued".to_string(),
                ))
            }
            StepAdvance::Missing => {
                return Err(PortalError::not_found("application", application_id))
            }
        };
        self.store
            .insert_notification(&notify::notice_for(
                &updated,
                NotificationKind::PromissoryNoteIssued,
            ))
            .await?;
        self.record(
            actor.id.to_string(),
            "promissory_note_issued",
            format!("promissory note issued for application {}", updated.id),
        )
        .await?;
        info!(application_id = %updated.id, actor = %actor.id, "promissory note issued");
        Ok(updated.into_view())
    }

    pub async fn sign_promissory_note(
        &self,
        application_id: Uuid,
        actor_id: Uuid,
    ) -> PortalResult<ApplicationView> {
        let actor = self.require_role(actor_id, ActorRole::User).await?;
        let application = self.fetch_required(application_id).await?;
        if application.investor_id != actor.id {
            return Err(PortalError::Unauthorized(
                "only the owning investor may perform this step".to_string(),
            ));
        }
        if application.note_issued_at.is_none() {
            return Err(PortalError::InvalidTransition(
                "the promissory note has not been issued yet".to_string(),
            ));
        }

        let updated = self
            .apply_advance(
                application_id,
                WorkflowStep::PromissoryNotePending,
                WorkflowStep::FundsPending,
            )
            .await?;
        self.store
            .insert_notification(&notify::notice_for(
                &updated,
                NotificationKind::PromissoryNoteSigned,
            ))
            .await?;
        self.record(
            actor.id.to_string(),
            "promissory_note_signed",
            format!("application {} moved to {}", updated.id, updated.current_step.name()),
        )
        .await?;
        info!(
            application_id = %updated.id,
            from = WorkflowStep::PromissoryNotePending.name(),
            to = updated.current_step.name(),
            actor = %actor.id,
            "workflow step advanced"
        );
        Ok(updated.into_view())
    }

    pub async fn complete_wire_transfer(
        &self,
        application_id: Uuid,
        actor_id: Uuid,
    ) -> PortalResult<ApplicationView> {
        self.transition(
            application_id,
            actor_id,
            ActorRole::User,
            WorkflowStep::FundsPending,
            WorkflowStep::FundsAdminConfirm,
            NotificationKind::WireTransferCompleted,
            "wire_transfer_completed",
        )
        .await
    }

    pub async fn confirm_funds_received(
        &self,
        application_id: Uuid,
        actor_id: Uuid,
    ) -> PortalResult<ApplicationView> {
        self.transition(
            application_id,
            actor_id,
            ActorRole::Admin,
            WorkflowStep::FundsAdminConfirm,
            WorkflowStep::PlaidPending,
            NotificationKind::FundsConfirmed,
            "funds_confirmed",
        )
        .await
    }

    pub async fn connect_bank_account(
        &self,
        application_id: Uuid,
        actor_id: Uuid,
    ) -> PortalResult<ApplicationView> {
        self.transition(
            application_id,
            actor_id,
            ActorRole::User,
            WorkflowStep::PlaidPending,
            WorkflowStep::PlaidAdminComplete,
            NotificationKind::BankAccountConnected,
            "bank_account_connected",
        )
        .await
    }

    pub async fn complete_admin_setup(
        &self,
        application_id: Uuid,
        actor_id: Uuid,
    ) -> PortalResult<ApplicationView> {
        self.transition(
            application_id,
            actor_id,
            ActorRole::Admin,
            WorkflowStep::PlaidAdminComplete,
            WorkflowStep::Active,
            NotificationKind::SetupCompleted,
            "admin_setup_completed",
        )
        .await
    }

    pub async fn mark_completed(
        &self,
        application_id: Uuid,
        actor_id: Uuid,
    ) -> PortalResult<ApplicationView> {
        self.transition(
            application_id,
            actor_id,
            ActorRole::Admin,
            WorkflowStep::Active,
            WorkflowStep::Completed,
            NotificationKind::InvestmentCompleted,
            "investment_completed",
        )
        .await
    }

    /// Cancel from any non-terminal step, active applications included. The
    /// conditional write runs against the step observed here, so a concurrent
    /// move surfaces as a conflict instead of a silent double-cancel.
    pub async fn cancel_application(
        &self,
        application_id: Uuid,
        actor_id: Uuid,
    ) -> PortalResult<ApplicationView> {
        let actor = self.require_role(actor_id, ActorRole::Admin).await?;
        let application = self.fetch_required(application_id).await?;
        if application.current_step.is_terminal() {
            return Err(PortalError::InvalidTransition(format!(
                "application is already {}",
                application.current_step.name()
            )));
        }

        let updated = self
            .apply_advance(
                application_id,
                application.current_step,
                WorkflowStep::Cancelled,
            )
            .await?;
        self.store
            .insert_notification(&notify::notice_for(
                &updated,
                NotificationKind::ApplicationCancelled,
            ))
            .await?;
        self.record(
            actor.id.to_string(),
            "application_cancelled",
            format!("application {} cancelled", updated.id),
        )
        .await?;
        info!(application_id = %updated.id, actor = %actor.id, "application cancelled");
        Ok(updated.into_view())
    }

    // ── Notifications ───────────────────────────────────────────────────

    pub async fn list_notifications(
        &self,
        role: ActorRole,
        account: Option<Uuid>,
        limit: usize,
    ) -> PortalResult<Vec<Notification>> {
        self.store.list_notifications(role, account, limit).await
    }

    pub async fn unread_count(&self, role: ActorRole, account: Option<Uuid>) -> PortalResult<u64> {
        self.store.unread_count(role, account).await
    }

    /// Idempotent: marking an already-read notification succeeds and changes
    /// nothing.
    pub async fn mark_notification_read(&self, notification_id: Uuid) -> PortalResult<Notification> {
        self.store
            .mark_read(notification_id)
            .await?
            .ok_or_else(|| PortalError::not_found("notification", notification_id))
    }

    pub async fn mark_all_notifications_read(
        &self,
        role: ActorRole,
        account: Option<Uuid>,
    ) -> PortalResult<u64> {
        self.store.mark_all_read(role, account).await
    }

    /// Entry point for trusted internal callers (the signing webhook, admin
    /// tooling) turning an external event into a persisted notification.
    ///
    /// `promissory_note_signed` doubles as the signing webhook's completion
    /// signal, so it also advances the application to `funds_pending`; a
    /// duplicate delivery fails the conditional write and reports a conflict
    /// instead of advancing twice.
    pub async fn dispatch_notification(
        &self,
        application_id: Uuid,
        kind: NotificationKind,
    ) -> PortalResult<Notification> {
        let application = self.fetch_required(application_id).await?;
        if self
            .store
            .fetch_account(application.investor_id)
            .await?
            .is_none()
        {
            return Err(PortalError::not_found("account", application.investor_id));
        }

        let application = if kind == NotificationKind::PromissoryNoteSigned {
            self.apply_advance(
                application_id,
                WorkflowStep::PromissoryNotePending,
                WorkflowStep::FundsPending,
            )
            .await?
        } else {
            application
        };

        let notification = notify::notice_for(&application, kind);
        self.store.insert_notification(&notification).await?;
        self.record(
            "system",
            "notification_dispatched",
            format!("dispatched {} for application {}", kind.name(), application.id),
        )
        .await?;
        info!(application_id = %application.id, kind = kind.name(), "notification dispatched");
        Ok(notification)
    }

    // ── Intake ──────────────────────────────────────────────────────────

    pub async fn submit_consultation(
        &self,
        request: ConsultationRequest,
    ) -> PortalResult<ConsultationRequest> {
        if request.full_name.trim().is_empty() || request.topic.trim().is_empty() {
            return Err(PortalError::Validation(
                "full_name and topic must not be empty".to_string(),
            ));
        }
        if !request.email.contains('@') {
            return Err(PortalError::Validation(
                "a valid email address is required".to_string(),
            ));
        }
        self.store.insert_consultation(&request).await?;
        self.record(
            "public",
            "consultation_requested",
            format!("consultation {} on '{}'", request.id, request.topic),
        )
        .await?;
        info!(consultation_id = %request.id, "consultation requested");
        Ok(request)
    }

    pub async fn list_consultations(&self, actor_id: Uuid) -> PortalResult<Vec<ConsultationRequest>> {
        self.require_role(actor_id, ActorRole::Admin).await?;
        self.store.list_consultations().await
    }

    pub async fn submit_contact_message(
        &self,
        message: ContactMessage,
    ) -> PortalResult<ContactMessage> {
        if message.name.trim().is_empty() || message.subject.trim().is_empty() {
            return Err(PortalError::Validation(
                "name and subject must not be empty".to_string(),
            ));
        }
        if !message.email.contains('@') {
            return Err(PortalError::Validation(
                "a valid email address is required".to_string(),
            ));
        }
        self.store.insert_contact_message(&message).await?;
        self.record(
            "public",
            "contact_message_received",
            format!("contact message {} re '{}'", message.id, message.subject),
        )
        .await?;
        info!(contact_id = %message.id, "contact message received");
        Ok(message)
    }

    pub async fn list_contact_messages(&self, actor_id: Uuid) -> PortalResult<Vec<ContactMessage>> {
        self.require_role(actor_id, ActorRole::Admin).await?;
        self.store.list_contact_messages().await
    }

    // ── Documents ───────────────────────────────────────────────────────

    pub async fn request_document(
        &self,
        account_id: Uuid,
        document_name: impl Into<String>,
    ) -> PortalResult<DocumentRequest> {
        let account = self.get_account(account_id).await?;
        let document_name = document_name.into();
        if document_name.trim().is_empty() {
            return Err(PortalError::Validation(
                "document_name must not be empty".to_string(),
            ));
        }

        let request = DocumentRequest::new(account.id, document_name);
        self.store.insert_document_request(&request).await?;
        self.record(
            account.id.to_string(),
            "document_requested",
            format!("document request {} for '{}'", request.id, request.document_name),
        )
        .await?;
        info!(request_id = %request.id, account_id = %account.id, "document requested");
        Ok(request)
    }

    pub async fn list_document_requests(
        &self,
        account: Option<Uuid>,
    ) -> PortalResult<Vec<DocumentRequest>> {
        self.store.list_document_requests(account).await
    }

    /// One-shot: the request leaves `pending` exactly once. Approval notifies
    /// the requesting investor; denial stays silent.
    pub async fn resolve_document_request(
        &self,
        actor_id: Uuid,
        request_id: Uuid,
        approve: bool,
    ) -> PortalResult<DocumentRequest> {
        let actor = self.require_privileged(actor_id).await?;
        let request = self
            .store
            .fetch_document_request(request_id)
            .await?
            .ok_or_else(|| PortalError::not_found("document request", request_id))?;
        if request.status != DocumentRequestStatus::Pending {
            return Err(PortalError::InvalidTransition(format!(
                "document request is already {}",
                request.status.name()
            )));
        }

        let status = if approve {
            DocumentRequestStatus::Approved
        } else {
            DocumentRequestStatus::Denied
        };
        let resolved = self
            .store
            .resolve_document_request(request_id, status, actor.id, Utc::now())
            .await?
            .ok_or_else(|| {
                PortalError::InvalidTransition(
                    "document request was resolved concurrently".to_string(),
                )
            })?;
        if approve {
            self.store
                .insert_notification(&notify::document_notice(&resolved))
                .await?;
        }
        self.record(
            actor.id.to_string(),
            "document_request_resolved",
            format!("document request {} {}", resolved.id, resolved.status.name()),
        )
        .await?;
        info!(
            request_id = %resolved.id,
            status = resolved.status.name(),
            actor = %actor.id,
            "document request resolved"
        );
        Ok(resolved)
    }

    // ── Payments ────────────────────────────────────────────────────────

    pub async fn record_payment(
        &self,
        actor_id: Uuid,
        application_id: Uuid,
        amount: u64,
        memo: impl Into<String>,
    ) -> PortalResult<PaymentRecord> {
        let actor = self.require_privileged(actor_id).await?;
        if amount == 0 {
            return Err(PortalError::Validation(
                "amount must be greater than zero".to_string(),
            ));
        }
        let application = self.fetch_required(application_id).await?;
        if application.current_step != WorkflowStep::Active {
            return Err(PortalError::InvalidTransition(format!(
                "payouts require an active investment, application is {}",
                application.current_step.name()
            )));
        }

        let payment = PaymentRecord::new(application_id, amount, memo);
        self.store.insert_payment(&payment).await?;
        self.store
            .insert_notification(&notify::notice_for(
                &application,
                NotificationKind::PaymentRecorded,
            ))
            .await?;
        self.record(
            actor.id.to_string(),
            "payment_recorded",
            format!("payment {} of ${} against application {}", payment.id, amount, application.id),
        )
        .await?;
        info!(payment_id = %payment.id, application_id = %application.id, amount, "payment recorded");
        Ok(payment)
    }

    pub async fn list_payments(&self, application_id: Uuid) -> PortalResult<Vec<PaymentRecord>> {
        self.fetch_required(application_id).await?;
        self.store.list_payments_for(application_id).await
    }

    // ── Activity ────────────────────────────────────────────────────────

    pub async fn list_activity(
        &self,
        actor_id: Uuid,
        after_sequence: Option<u64>,
        limit: usize,
    ) -> PortalResult<Vec<ActivityRecord>> {
        self.require_role(actor_id, ActorRole::Admin).await?;
        self.store.list_activity(after_sequence, limit).await
    }

    // ── Privileged deletes ──────────────────────────────────────────────

    /// Remove an investor account and everything hanging off it:
    /// applications, their payments and notifications, and document requests.
    pub async fn delete_user(&self, actor_id: Uuid, user_id: Uuid) -> PortalResult<DeletionReport> {
        let actor = self.require_privileged(actor_id).await?;
        let target = self.get_account(user_id).await?;
        if target.id == actor.id {
            return Err(PortalError::Validation(
                "admins cannot delete their own account".to_string(),
            ));
        }

        let applications = self.store.list_applications_for(user_id).await?;
        let mut payments_removed = 0;
        let mut notifications_removed = 0;
        for application in &applications {
            payments_removed += self.store.delete_payments_for(application.id).await?;
            notifications_removed += self.store.delete_notifications_for(application.id).await?;
            self.store.delete_application(application.id).await?;
        }
        let document_requests_removed = self.store.delete_document_requests_for(user_id).await?;
        self.store.delete_account(user_id).await?;

        self.record(
            actor.id.to_string(),
            "user_deleted",
            format!(
                "account {} removed with {} application(s)",
                user_id,
                applications.len()
            ),
        )
        .await?;
        info!(
            account_id = %user_id,
            applications = applications.len(),
            actor = %actor.id,
            "user deleted"
        );
        Ok(DeletionReport {
            deleted_id: user_id,
            applications_removed: applications.len() as u64,
            payments_removed,
            notifications_removed,
            document_requests_removed,
        })
    }

    /// Remove a single application with its payments and notifications. The
    /// investor account stays.
    pub async fn delete_investment(
        &self,
        actor_id: Uuid,
        application_id: Uuid,
    ) -> PortalResult<DeletionReport> {
        let actor = self.require_privileged(actor_id).await?;
        let application = self.fetch_required(application_id).await?;

        let payments_removed = self.store.delete_payments_for(application_id).await?;
        let notifications_removed = self.store.delete_notifications_for(application_id).await?;
        self.store.delete_application(application_id).await?;

        self.record(
            actor.id.to_string(),
            "investment_deleted",
            format!(
                "application {} for investor {} removed",
                application.id, application.investor_id
            ),
        )
        .await?;
        info!(application_id = %application_id, actor = %actor.id, "investment deleted");
        Ok(DeletionReport {
            deleted_id: application_id,
            applications_removed: 1,
            payments_removed,
            notifications_removed,
            document_requests_removed: 0,
        })
    }

    pub async fn delete_consultation(
        &self,
        actor_id: Uuid,
        consultation_id: Uuid,
    ) -> PortalResult<()> {
        let actor = self.require_privileged(actor_id).await?;
        if !self.store.delete_consultation(consultation_id).await? {
            return Err(PortalError::not_found("consultation", consultation_id));
        }
        self.record(
            actor.id.to_string(),
            "consultation_deleted",
            format!("consultation {consultation_id} removed"),
        )
        .await?;
        info!(consultation_id = %consultation_id, actor = %actor.id, "consultation deleted");
        Ok(())
    }

    // ── Internal helpers ────────────────────────────────────────────────

    /// Resolve the acting account and require an exact role match. Absence or
    /// a storage failure during the lookup rejects the call.
    async fn require_role(&self, actor_id: Uuid, required: ActorRole) -> PortalResult<Account> {
        let account = match self.store.fetch_account(actor_id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                return Err(PortalError::Unauthorized(format!(
                    "account '{actor_id}' is not registered"
                )))
            }
            Err(err) => {
                warn!(actor = %actor_id, error = %err, "role lookup failed, rejecting call");
                return Err(PortalError::Unauthorized(
                    "role verification unavailable".to_string(),
                ));
            }
        };
        if account.role != required {
            return Err(PortalError::Unauthorized(format!(
                "this operation requires the {} role",
                required.name()
            )));
        }
        Ok(account)
    }

    /// Admin check for the destructive operations; rejections are logged.
    async fn require_privileged(&self, actor_id: Uuid) -> PortalResult<Account> {
        match self.require_role(actor_id, ActorRole::Admin).await {
            Ok(account) => Ok(account),
            Err(err) => {
                warn!(actor = %actor_id, error = %err, "rejected privileged call");
                Err(err)
            }
        }
    }

    async fn fetch_required(&self, application_id: Uuid) -> PortalResult<InvestmentApplication> {
        self.store
            .fetch_application(application_id)
            .await?
            .ok_or_else(|| PortalError::not_found("application", application_id))
    }

    async fn apply_advance(
        &self,
        application_id: Uuid,
        expected: WorkflowStep,
        next: WorkflowStep,
    ) -> PortalResult<InvestmentApplication> {
        match self.store.advance_step(application_id, expected, next).await? {
            StepAdvance::Applied(application) => Ok(application),
            StepAdvance::Conflict(actual) => {
                Err(PortalError::step_conflict(expected.name(), actual.name()))
            }
            StepAdvance::Missing => Err(PortalError::not_found("application", application_id)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn transition(
        &self,
        application_id: Uuid,
        actor_id: Uuid,
        required_role: ActorRole,
        expected: WorkflowStep,
        next: WorkflowStep,
        kind: NotificationKind,
        action: &'static str,
    ) -> PortalResult<ApplicationView> {
        let actor = self.require_role(actor_id, required_role).await?;
        if required_role == ActorRole::User {
            let application = self.fetch_required(application_id).await?;
            if application.investor_id != actor.id {
                return Err(PortalError::Unauthorized(
                    "only the owning investor may perform this step".to_string(),
                ));
            }
        }

        let updated = self.apply_advance(application_id, expected, next).await?;
        self.store
            .insert_notification(&notify::notice_for(&updated, kind))
            .await?;
        self.record(
            actor.id.to_string(),
            action,
            format!("application {} moved to {}", updated.id, updated.current_step.name()),
        )
        .await?;
        info!(
            application_id = %updated.id,
            from = expected.name(),
            to = next.name(),
            actor = %actor.id,
            "workflow step advanced"
        );
        Ok(updated.into_view())
    }

    async fn record(
        &self,
        actor: impl Into<String>,
        action: &'static str,
        detail: impl Into<String>,
    ) -> PortalResult<()> {
        let entry = ActivityRecord::new(actor, action, detail);
        self.store.record_activity(&entry).await?;
        Ok(())
    }
}

fn validate_terms(terms: &InvestmentTerms) -> PortalResult<()> {
    if terms.investment_amount == 0 {
        return Err(PortalError::Validation(
            "investment_amount must be greater than zero".to_string(),
        ));
    }
    if terms.term_months == 0 {
        return Err(PortalError::Validation(
            "term_months must be at least one".to_string(),
        ));
    }
    if !(terms.annual_percentage > 0.0 && terms.annual_percentage <= 100.0) {
        return Err(PortalError::Validation(
            "annual_percentage must be within (0, 100]".to_string(),
        ));
    }
    Ok(())
}
