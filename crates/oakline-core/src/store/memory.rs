//! In-memory storage backend for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AccountStorage, ActivityStorage, ApplicationStorage, ConsultationStorage, ContactStorage,
    DocumentStorage, NotificationStorage, PaymentStorage, PortalStorage, StepAdvance,
};
use crate::error::PortalResult;
use crate::types::{
    Account, ActivityRecord, ActorRole, ConsultationRequest, ContactMessage, DocumentRequest,
    DocumentRequestStatus, InvestmentApplication, Notification, PaymentRecord,
};
use crate::workflow::WorkflowStep;

#[derive(Default)]
pub struct MemoryStorage {
    accounts: RwLock<HashMap<Uuid, Account>>,
    applications: RwLock<HashMap<Uuid, InvestmentApplication>>,
    notifications: RwLock<HashMap<Uuid, Notification>>,
    activity: RwLock<Vec<ActivityRecord>>,
    consultations: RwLock<HashMap<Uuid, ConsultationRequest>>,
    contact_messages: RwLock<Vec<ContactMessage>>,
    documents: RwLock<HashMap<Uuid, DocumentRequest>>,
    payments: RwLock<HashMap<Uuid, PaymentRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStorage for MemoryStorage {
    async fn insert_account(&self, account: &Account) -> PortalResult<()> {
        self.accounts
            .write()
            .await
            .insert(account.id, account.clone());
        Ok(())
    }

    async fn fetch_account(&self, id: Uuid) -> PortalResult<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn fetch_account_by_email(&self, email: &str) -> PortalResult<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|account| account.email == email)
            .cloned())
    }

    async fn list_accounts(&self) -> PortalResult<Vec<Account>> {
        let mut accounts: Vec<Account> = self.accounts.read().await.values().cloned().collect();
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(accounts)
    }

    async fn delete_account(&self, id: Uuid) -> PortalResult<bool> {
        Ok(self.accounts.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl ApplicationStorage for MemoryStorage {
    async fn insert_application(&self, application: &InvestmentApplication) -> PortalResult<()> {
        self.applications
            .write()
            .await
            .insert(application.id, application.clone());
        Ok(())
    }

    async fn fetch_application(&self, id: Uuid) -> PortalResult<Option<InvestmentApplication>> {
        Ok(self.applications.read().await.get(&id).cloned())
    }

    async fn list_applications(&self) -> PortalResult<Vec<InvestmentApplication>> {
        let mut applications: Vec<InvestmentApplication> =
            self.applications.read().await.values().cloned().collect();
        applications.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(applications)
    }

    async fn list_applications_for(
        &self,
        investor_id: Uuid,
    ) -> PortalResult<Vec<InvestmentApplication>> {
        let mut applications: Vec<InvestmentApplication> = self
            .applications
            .read()
            .await
            .values()
            .filter(|application| application.investor_id == investor_id)
            .cloned()
            .collect();
        applications.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(applications)
    }

    async fn advance_step(
        &self,
        id: Uuid,
        expected: WorkflowStep,
        next: WorkflowStep,
    ) -> PortalResult<StepAdvance> {
        let mut applications = self.applications.write().await;
        match applications.get_mut(&id) {
            None => Ok(StepAdvance::Missing),
            Some(application) if application.current_step != expected => {
                Ok(StepAdvance::Conflict(application.current_step))
            }
            Some(application) => {
                application.current_step = next;
                application.updated_at = Utc::now();
                Ok(StepAdvance::Applied(application.clone()))
            }
        }
    }

    async fn issue_note(&self, id: Uuid, issued_at: DateTime<Utc>) -> PortalResult<StepAdvance> {
        let mut applications = self.applications.write().await;
        match applications.get_mut(&id) {
            None => Ok(StepAdvance::Missing),
            Some(application)
                if application.current_step != WorkflowStep::PromissoryNotePending
                    || application.note_issued_at.is_some() =>
            {
                Ok(StepAdvance::Conflict(application.current_step))
            }
            Some(application) => {
                application.note_issued_at = Some(issued_at);
                application.updated_at = issued_at;
                Ok(StepAdvance::Applied(application.clone()))
            }
        }
    }

    async fn delete_application(&self, id: Uuid) -> PortalResult<bool> {
        Ok(self.applications.write().await.remove(&id).is_some())
    }
}

fn addressed_to(notification: &Notification, role: ActorRole, account: Option<Uuid>) -> bool {
    if notification.recipient_role != role {
        return false;
    }
    match account {
        Some(account_id) => notification.recipient_account == Some(account_id),
        None => true,
    }
}

#[async_trait]
impl NotificationStorage for MemoryStorage {
    async fn insert_notification(&self, notification: &Notification) -> PortalResult<()> {
        self.notifications
            .write()
            .await
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn list_notifications(
        &self,
        role: ActorRole,
        account: Option<Uuid>,
        limit: usize,
    ) -> PortalResult<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self
            .notifications
            .read()
            .await
            .values()
            .filter(|notification| addressed_to(notification, role, account))
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications.truncate(limit);
        Ok(notifications)
    }

    async fn mark_read(&self, id: Uuid) -> PortalResult<Option<Notification>> {
        let mut notifications = self.notifications.write().await;
        match notifications.get_mut(&id) {
            None => Ok(None),
            Some(notification) => {
                notification.is_read = true;
                Ok(Some(notification.clone()))
            }
        }
    }

    async fn mark_all_read(&self, role: ActorRole, account: Option<Uuid>) -> PortalResult<u64> {
        let mut notifications = self.notifications.write().await;
        let mut updated = 0;
        for notification in notifications.values_mut() {
            if !notification.is_read && addressed_to(notification, role, account) {
                notification.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn unread_count(&self, role: ActorRole, account: Option<Uuid>) -> PortalResult<u64> {
        Ok(self
            .notifications
            .read()
            .await
            .values()
            .filter(|notification| {
                !notification.is_read && addressed_to(notification, role, account)
            })
            .count() as u64)
    }

    async fn delete_notifications_for(&self, application_id: Uuid) -> PortalResult<u64> {
        let mut notifications = self.notifications.write().await;
        let before = notifications.len();
        notifications.retain(|_, notification| notification.application_id != Some(application_id));
        Ok((before - notifications.len()) as u64)
    }
}

#[async_trait]
impl ActivityStorage for MemoryStorage {
    async fn record_activity(&self, entry: &ActivityRecord) -> PortalResult<u64> {
        let mut activity = self.activity.write().await;
        let sequence = activity.len() as u64 + 1;
        let mut stored = entry.clone();
        stored.sequence = sequence;
        activity.push(stored);
        Ok(sequence)
    }

    async fn list_activity(
        &self,
        after_sequence: Option<u64>,
        limit: usize,
    ) -> PortalResult<Vec<ActivityRecord>> {
        let activity = self.activity.read().await;
        let entries = match after_sequence {
            Some(after) => activity
                .iter()
                .filter(|entry| entry.sequence > after)
                .take(limit)
                .cloned()
                .collect(),
            None => {
                let start = activity.len().saturating_sub(limit);
                activity[start..].to_vec()
            }
        };
        Ok(entries)
    }
}

#[async_trait]
impl ConsultationStorage for MemoryStorage {
    async fn insert_consultation(&self, request: &ConsultationRequest) -> PortalResult<()> {
        self.consultations
            .write()
            .await
            .insert(request.id, request.clone());
        Ok(())
    }

    async fn list_consultations(&self) -> PortalResult<Vec<ConsultationRequest>> {
        let mut requests: Vec<ConsultationRequest> =
            self.consultations.read().await.values().cloned().collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn delete_consultation(&self, id: Uuid) -> PortalResult<bool> {
        Ok(self.consultations.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl ContactStorage for MemoryStorage {
    async fn insert_contact_message(&self, message: &ContactMessage) -> PortalResult<()> {
        self.contact_messages.write().await.push(message.clone());
        Ok(())
    }

    async fn list_contact_messages(&self) -> PortalResult<Vec<ContactMessage>> {
        let mut messages = self.contact_messages.read().await.clone();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages)
    }
}

#[async_trait]
impl DocumentStorage for MemoryStorage {
    async fn insert_document_request(&self, request: &DocumentRequest) -> PortalResult<()> {
        self.documents
            .write()
            .await
            .insert(request.id, request.clone());
        Ok(())
    }

    async fn fetch_document_request(&self, id: Uuid) -> PortalResult<Option<DocumentRequest>> {
        Ok(self.documents.read().await.get(&id).cloned())
    }

    async fn list_document_requests(
        &self,
        account: Option<Uuid>,
    ) -> PortalResult<Vec<DocumentRequest>> {
        let mut requests: Vec<DocumentRequest> = self
            .documents
            .read()
            .await
            .values()
            .filter(|request| account.map_or(true, |account_id| request.account_id == account_id))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(requests)
    }

    async fn resolve_document_request(
        &self,
        id: Uuid,
        status: DocumentRequestStatus,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> PortalResult<Option<DocumentRequest>> {
        let mut documents = self.documents.write().await;
        match documents.get_mut(&id) {
            Some(request) if request.status == DocumentRequestStatus::Pending => {
                request.status = status;
                request.resolved_at = Some(resolved_at);
                request.resolved_by = Some(resolved_by);
                Ok(Some(request.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_document_requests_for(&self, account_id: Uuid) -> PortalResult<u64> {
        let mut documents = self.documents.write().await;
        let before = documents.len();
        documents.retain(|_, request| request.account_id != account_id);
        Ok((before - documents.len()) as u64)
    }
}

#[async_trait]
impl PaymentStorage for MemoryStorage {
    async fn insert_payment(&self, payment: &PaymentRecord) -> PortalResult<()> {
        self.payments
            .write()
            .await
            .insert(payment.id, payment.clone());
        Ok(())
    }

    async fn list_payments_for(&self, application_id: Uuid) -> PortalResult<Vec<PaymentRecord>> {
        let mut payments: Vec<PaymentRecord> = self
            .payments
            .read()
            .await
            .values()
            .filter(|payment| payment.application_id == application_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.paid_at.cmp(&a.paid_at));
        Ok(payments)
    }

    async fn delete_payments_for(&self, application_id: Uuid) -> PortalResult<u64> {
        let mut payments = self.payments.write().await;
        let before = payments.len();
        payments.retain(|_, payment| payment.application_id != application_id);
        Ok((before - payments.len()) as u64)
    }
}

impl PortalStorage for MemoryStorage {
    fn backend_label(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InvestmentTerms, NotificationKind, PaymentFrequency};
    use chrono::Duration;

    fn sample_application() -> InvestmentApplication {
        InvestmentApplication::new(
            Uuid::new_v4(),
            InvestmentTerms {
                investment_amount: 100_000,
                annual_percentage: 10.0,
                payment_frequency: PaymentFrequency::Quarterly,
                term_months: 12,
            },
        )
    }

    #[tokio::test]
    async fn conditional_step_write_applies_once() {
        let store = MemoryStorage::new();
        let application = sample_application();
        store.insert_application(&application).await.unwrap();

        let first = store
            .advance_step(
                application.id,
                WorkflowStep::SubscriptionPending,
                WorkflowStep::SubscriptionAdminReview,
            )
            .await
            .unwrap();
        assert!(matches!(first, StepAdvance::Applied(ref app)
            if app.current_step == WorkflowStep::SubscriptionAdminReview));

        let second = store
            .advance_step(
                application.id,
                WorkflowStep::SubscriptionPending,
                WorkflowStep::SubscriptionAdminReview,
            )
            .await
            .unwrap();
        assert!(matches!(
            second,
            StepAdvance::Conflict(WorkflowStep::SubscriptionAdminReview)
        ));
    }

    #[tokio::test]
    async fn advance_reports_missing_application() {
        let store = MemoryStorage::new();
        let outcome = store
            .advance_step(
                Uuid::new_v4(),
                WorkflowStep::SubscriptionPending,
                WorkflowStep::SubscriptionAdminReview,
            )
            .await
            .unwrap();
        assert!(matches!(outcome, StepAdvance::Missing));
    }

    #[tokio::test]
    async fn note_issue_is_one_shot_and_keeps_the_step() {
        let store = MemoryStorage::new();
        let mut application = sample_application();
        application.current_step = WorkflowStep::PromissoryNotePending;
        store.insert_application(&application).await.unwrap();

        let first = store.issue_note(application.id, Utc::now()).await.unwrap();
        match first {
            StepAdvance::Applied(app) => {
                assert!(app.note_issued_at.is_some());
                assert_eq!(app.current_step, WorkflowStep::PromissoryNotePending);
            }
            other => panic!("expected Applied, got {other:?}"),
        }

        let second = store.issue_note(application.id, Utc::now()).await.unwrap();
        assert!(matches!(second, StepAdvance::Conflict(_)));
    }

    #[tokio::test]
    async fn note_issue_requires_the_promissory_step() {
        let store = MemoryStorage::new();
        let application = sample_application();
        store.insert_application(&application).await.unwrap();

        let outcome = store.issue_note(application.id, Utc::now()).await.unwrap();
        assert!(matches!(
            outcome,
            StepAdvance::Conflict(WorkflowStep::SubscriptionPending)
        ));
    }

    #[tokio::test]
    async fn notifications_list_newest_first_with_limit() {
        let store = MemoryStorage::new();
        let base = Utc::now();
        for age_minutes in [30, 20, 10] {
            let mut notification = Notification::new(
                ActorRole::Admin,
                NotificationKind::SubscriptionSigned,
                "Subscription Agreement Signed",
                format!("signed {age_minutes} minutes ago"),
            );
            notification.created_at = base - Duration::minutes(age_minutes);
            store.insert_notification(&notification).await.unwrap();
        }

        let listed = store
            .list_notifications(ActorRole::Admin, None, 2)
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].message.contains("10 minutes"));
        assert!(listed[1].message.contains("20 minutes"));
    }

    #[tokio::test]
    async fn account_filter_scopes_user_notifications() {
        let store = MemoryStorage::new();
        let ava = Uuid::new_v4();
        let noor = Uuid::new_v4();
        for account in [ava, ava, noor] {
            let notification = Notification::new(
                ActorRole::User,
                NotificationKind::FundsConfirmed,
                "Funds Received",
                "funds confirmed",
            )
            .with_recipient_account(account);
            store.insert_notification(&notification).await.unwrap();
        }

        let for_ava = store
            .list_notifications(ActorRole::User, Some(ava), 50)
            .await
            .unwrap();
        assert_eq!(for_ava.len(), 2);
        assert_eq!(store.unread_count(ActorRole::User, Some(noor)).await.unwrap(), 1);
        assert_eq!(store.unread_count(ActorRole::Admin, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unread_count_drops_once_on_repeated_mark_read() {
        let store = MemoryStorage::new();
        let notification = Notification::new(
            ActorRole::Admin,
            NotificationKind::WireTransferCompleted,
            "Wire Transfer Submitted",
            "wire sent",
        );
        store.insert_notification(&notification).await.unwrap();
        assert_eq!(store.unread_count(ActorRole::Admin, None).await.unwrap(), 1);

        let marked = store.mark_read(notification.id).await.unwrap().unwrap();
        assert!(marked.is_read);
        let again = store.mark_read(notification.id).await.unwrap().unwrap();
        assert!(again.is_read);
        assert_eq!(store.unread_count(ActorRole::Admin, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mark_all_read_scopes_to_role() {
        let store = MemoryStorage::new();
        let investor = Uuid::new_v4();
        let admin_note = Notification::new(
            ActorRole::Admin,
            NotificationKind::SubscriptionSigned,
            "Subscription Agreement Signed",
            "signed",
        );
        let user_note = Notification::new(
            ActorRole::User,
            NotificationKind::FundsConfirmed,
            "Funds Received",
            "confirmed",
        )
        .with_recipient_account(investor);
        store.insert_notification(&admin_note).await.unwrap();
        store.insert_notification(&user_note).await.unwrap();

        let updated = store.mark_all_read(ActorRole::Admin, None).await.unwrap();
        assert_eq!(updated, 1);
        assert_eq!(store.unread_count(ActorRole::Admin, None).await.unwrap(), 0);
        assert_eq!(
            store.unread_count(ActorRole::User, Some(investor)).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn activity_sequences_increase_and_cursor_filters() {
        let store = MemoryStorage::new();
        for action in ["application_submitted", "subscription_signed", "user_deleted"] {
            let entry = ActivityRecord::new("system", action, "detail");
            store.record_activity(&entry).await.unwrap();
        }

        let all = store.list_activity(None, 50).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].sequence, 1);
        assert_eq!(all[2].sequence, 3);

        let tail = store.list_activity(Some(1), 50).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].action, "subscription_signed");

        let newest = store.list_activity(None, 1).await.unwrap();
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].sequence, 3);
    }

    #[tokio::test]
    async fn document_resolution_only_applies_to_pending() {
        let store = MemoryStorage::new();
        let request = DocumentRequest::new(Uuid::new_v4(), "Q2 Statement");
        store.insert_document_request(&request).await.unwrap();

        let admin = Uuid::new_v4();
        let resolved = store
            .resolve_document_request(request.id, DocumentRequestStatus::Approved, admin, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.status, DocumentRequestStatus::Approved);
        assert_eq!(resolved.resolved_by, Some(admin));

        let second = store
            .resolve_document_request(request.id, DocumentRequestStatus::Denied, admin, Utc::now())
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn cascades_report_removed_counts() {
        let store = MemoryStorage::new();
        let application = sample_application();
        store.insert_application(&application).await.unwrap();
        for _ in 0..2 {
            let payment = PaymentRecord::new(application.id, 1_000, "monthly payout");
            store.insert_payment(&payment).await.unwrap();
        }
        let notification = Notification::new(
            ActorRole::User,
            NotificationKind::PaymentRecorded,
            "Payout Recorded",
            "recorded",
        )
        .with_application(application.id)
        .with_recipient_account(application.investor_id);
        store.insert_notification(&notification).await.unwrap();

        assert_eq!(store.delete_payments_for(application.id).await.unwrap(), 2);
        assert_eq!(
            store.delete_notifications_for(application.id).await.unwrap(),
            1
        );
        assert!(store.delete_application(application.id).await.unwrap());
        assert!(!store.delete_application(application.id).await.unwrap());
    }
}
