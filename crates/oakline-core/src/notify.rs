//! Composition of the bell notifications each portal event leaves behind.
//!
//! Workflow transitions always notify the counterpart of the actor who moved
//! the application: investor signatures raise admin notifications, admin
//! confirmations raise investor notifications. Investor-directed notices are
//! narrowed to the owning account; admin-directed notices broadcast to the
//! whole admin role.

use crate::types::{
    ActorRole, DocumentRequest, InvestmentApplication, Notification, NotificationKind,
};

/// Build the notification for an application-scoped event.
pub fn notice_for(application: &InvestmentApplication, kind: NotificationKind) -> Notification {
    let amount = application.terms.investment_amount;
    let months = application.terms.term_months;

    let (recipient, title, message) = match kind {
        NotificationKind::ApplicationSubmitted => (
            ActorRole::Admin,
            "New Investment Application".to_string(),
            format!(
                "A new ${amount} application over {months} months is awaiting the subscription signature."
            ),
        ),
        NotificationKind::SubscriptionSigned => (
            ActorRole::Admin,
            "Subscription Agreement Signed".to_string(),
            format!("The subscription agreement for the ${amount} application is ready for countersignature."),
        ),
        NotificationKind::SubscriptionCountersigned => (
            ActorRole::User,
            "Subscription Countersigned".to_string(),
            "Your subscription agreement has been countersigned. The promissory note is being prepared."
                .to_string(),
        ),
        NotificationKind::PromissoryNoteIssued => (
            ActorRole::User,
            "Promissory Note Ready".to_string(),
            format!("Your promissory note for ${amount} has been issued and is ready to sign."),
        ),
        NotificationKind::PromissoryNoteSigned => (
            ActorRole::Admin,
            "Promissory Note Signed".to_string(),
            format!("The promissory note for the ${amount} application has been signed; wire instructions were released."),
        ),
        NotificationKind::WireTransferCompleted => (
            ActorRole::Admin,
            "Wire Transfer Submitted".to_string(),
            format!("The investor reports the ${amount} wire transfer as sent."),
        ),
        NotificationKind::FundsConfirmed => (
            ActorRole::User,
            "Funds Received".to_string(),
            "We confirmed receipt of your funds. Connect a bank account to receive payouts."
                .to_string(),
        ),
        NotificationKind::BankAccountConnected => (
            ActorRole::Admin,
            "Bank Account Connected".to_string(),
            "The investor connected a payout account; the investment is ready for final setup."
                .to_string(),
        ),
        NotificationKind::SetupCompleted => (
            ActorRole::User,
            "Investment Active".to_string(),
            format!("Setup is complete. Your ${amount} investment is now active."),
        ),
        NotificationKind::InvestmentCompleted => (
            ActorRole::User,
            "Investment Term Completed".to_string(),
            format!("Your {months}-month investment term has completed."),
        ),
        NotificationKind::ApplicationCancelled => (
            ActorRole::User,
            "Application Cancelled".to_string(),
            format!("Your ${amount} investment application has been cancelled."),
        ),
        NotificationKind::PaymentRecorded => (
            ActorRole::User,
            "Payout Recorded".to_string(),
            "A payout was recorded against your investment.".to_string(),
        ),
        NotificationKind::DocumentApproved => (
            ActorRole::User,
            "Document Request Approved".to_string(),
            "Your requested document has been approved and is available for download.".to_string(),
        ),
    };

    let notification =
        Notification::new(recipient, kind, title, message).with_application(application.id);
    match recipient {
        ActorRole::User => notification.with_recipient_account(application.investor_id),
        ActorRole::Admin => notification,
    }
}

/// Build the notification raised when an admin approves a document request.
pub fn document_notice(request: &DocumentRequest) -> Notification {
    Notification::new(
        ActorRole::User,
        NotificationKind::DocumentApproved,
        "Document Request Approved",
        format!("Your requested document '{}' has been approved.", request.document_name),
    )
    .with_recipient_account(request.account_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InvestmentTerms, PaymentFrequency};
    use uuid::Uuid;

    fn application() -> InvestmentApplication {
        InvestmentApplication::new(
            Uuid::new_v4(),
            InvestmentTerms {
                investment_amount: 250_000,
                annual_percentage: 12.0,
                payment_frequency: PaymentFrequency::Monthly,
                term_months: 24,
            },
        )
    }

    #[test]
    fn investor_signatures_notify_the_admin_role() {
        let app = application();
        for kind in [
            NotificationKind::SubscriptionSigned,
            NotificationKind::PromissoryNoteSigned,
            NotificationKind::WireTransferCompleted,
            NotificationKind::BankAccountConnected,
        ] {
            let notice = notice_for(&app, kind);
            assert_eq!(notice.recipient_role, ActorRole::Admin);
            assert_eq!(notice.recipient_account, None, "admin notices broadcast");
            assert_eq!(notice.application_id, Some(app.id));
        }
    }

    #[test]
    fn admin_confirmations_notify_the_owning_investor() {
        let app = application();
        for kind in [
            NotificationKind::SubscriptionCountersigned,
            NotificationKind::PromissoryNoteIssued,
            NotificationKind::FundsConfirmed,
            NotificationKind::SetupCompleted,
            NotificationKind::ApplicationCancelled,
        ] {
            let notice = notice_for(&app, kind);
            assert_eq!(notice.recipient_role, ActorRole::User);
            assert_eq!(notice.recipient_account, Some(app.investor_id));
        }
    }

    #[test]
    fn messages_carry_the_investment_amount() {
        let app = application();
        let notice = notice_for(&app, NotificationKind::PromissoryNoteIssued);
        assert!(notice.message.contains("250000"));
    }

    #[test]
    fn document_notice_names_the_document() {
        let request = DocumentRequest::new(Uuid::new_v4(), "2025 K-1 Statement");
        let notice = document_notice(&request);
        assert!(notice.message.contains("2025 K-1 Statement"));
        assert_eq!(notice.recipient_account, Some(request.account_id));
        assert_eq!(notice.kind, NotificationKind::DocumentApproved);
    }
}
