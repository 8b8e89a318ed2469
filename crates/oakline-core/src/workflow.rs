//! Investment application workflow machine.
//!
//! Applications walk a fixed forward chain from `subscription_pending` to
//! `completed`; `cancelled` is a sideways terminal reachable from any
//! non-terminal step. Every presentation value the portal renders (labels,
//! progress, action badges, milestone flags) derives from [`WorkflowStep`]
//! alone, so stored state can never disagree with what a dashboard shows.

use serde::{Deserialize, Serialize};

use crate::types::ActorRole;

/// Current position of an investment application in the onboarding workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    SubscriptionPending,
    SubscriptionAdminReview,
    PromissoryNotePending,
    FundsPending,
    FundsAdminConfirm,
    PlaidPending,
    PlaidAdminComplete,
    Active,
    Completed,
    Cancelled,
}

/// Canonical forward order of the machine. `Cancelled` sits outside it.
pub const FORWARD_CHAIN: [WorkflowStep; 9] = [
    WorkflowStep::SubscriptionPending,
    WorkflowStep::SubscriptionAdminReview,
    WorkflowStep::PromissoryNotePending,
    WorkflowStep::FundsPending,
    WorkflowStep::FundsAdminConfirm,
    WorkflowStep::PlaidPending,
    WorkflowStep::PlaidAdminComplete,
    WorkflowStep::Active,
    WorkflowStep::Completed,
];

impl WorkflowStep {
    pub fn name(self) -> &'static str {
        match self {
            Self::SubscriptionPending => "subscription_pending",
            Self::SubscriptionAdminReview => "subscription_admin_review",
            Self::PromissoryNotePending => "promissory_note_pending",
            Self::FundsPending => "funds_pending",
            Self::FundsAdminConfirm => "funds_admin_confirm",
            Self::PlaidPending => "plaid_pending",
            Self::PlaidAdminComplete => "plaid_admin_complete",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse a stored step string. Accepts the short aliases written by the
    /// portal's earlier status enumeration so old rows keep loading.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "subscription_pending" | "pending" => Some(Self::SubscriptionPending),
            "subscription_admin_review" | "admin_review" => Some(Self::SubscriptionAdminReview),
            "promissory_note_pending" | "promissory_pending" => Some(Self::PromissoryNotePending),
            "funds_pending" => Some(Self::FundsPending),
            "funds_admin_confirm" | "admin_confirm" => Some(Self::FundsAdminConfirm),
            "plaid_pending" => Some(Self::PlaidPending),
            "plaid_admin_complete" | "admin_complete" => Some(Self::PlaidAdminComplete),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Terminal steps accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Position in the forward chain, `None` for the sideways terminal.
    fn chain_position(self) -> Option<usize> {
        FORWARD_CHAIN.iter().position(|step| *step == self)
    }

    /// True once the forward chain has moved strictly past `other`. Always
    /// false for cancelled applications, which never report progress.
    pub fn has_passed(self, other: WorkflowStep) -> bool {
        match (self.chain_position(), other.chain_position()) {
            (Some(current), Some(other)) => current > other,
            _ => false,
        }
    }
}

/// Short status label rendered on investor and admin dashboards.
pub fn display_text(step: WorkflowStep) -> &'static str {
    match step {
        WorkflowStep::SubscriptionPending => "Pending Your Signature",
        WorkflowStep::SubscriptionAdminReview => "Under Admin Review",
        WorkflowStep::PromissoryNotePending => "Promissory Note Signature Required",
        WorkflowStep::FundsPending => "Awaiting Wire Transfer",
        WorkflowStep::FundsAdminConfirm => "Confirming Funds Receipt",
        WorkflowStep::PlaidPending => "Connect Your Bank Account",
        WorkflowStep::PlaidAdminComplete => "Finalizing Account Setup",
        WorkflowStep::Active => "Investment Active",
        WorkflowStep::Completed => "Investment Completed",
        WorkflowStep::Cancelled => "Investment Cancelled",
    }
}

/// Label used when storage carries a step string this build does not know.
pub const UNKNOWN_STEP_LABEL: &str = "Processing";

/// Label for a raw stored step string, falling back to
/// [`UNKNOWN_STEP_LABEL`] so dashboards keep rendering across rollouts.
pub fn display_text_for_raw(raw: &str) -> &'static str {
    match WorkflowStep::parse(raw) {
        Some(step) => display_text(step),
        None => UNKNOWN_STEP_LABEL,
    }
}

/// Progress bar percentage for a step. Strictly increasing along the forward
/// chain; cancelled applications report zero.
pub fn progress_percentage(step: WorkflowStep) -> u8 {
    match step {
        WorkflowStep::SubscriptionPending => 10,
        WorkflowStep::SubscriptionAdminReview => 25,
        WorkflowStep::PromissoryNotePending => 40,
        WorkflowStep::FundsPending => 55,
        WorkflowStep::FundsAdminConfirm => 70,
        WorkflowStep::PlaidPending => 80,
        WorkflowStep::PlaidAdminComplete => 90,
        WorkflowStep::Active | WorkflowStep::Completed => 100,
        WorkflowStep::Cancelled => 0,
    }
}

/// Whether `role` owes an action at `step`. The promissory note step needs
/// both sides: the admin issues the note, then the investor signs it.
pub fn action_required_for(step: WorkflowStep, role: ActorRole) -> bool {
    match step {
        WorkflowStep::SubscriptionPending
        | WorkflowStep::FundsPending
        | WorkflowStep::PlaidPending => role == ActorRole::User,
        WorkflowStep::SubscriptionAdminReview
        | WorkflowStep::FundsAdminConfirm
        | WorkflowStep::PlaidAdminComplete => role == ActorRole::Admin,
        WorkflowStep::PromissoryNotePending => true,
        WorkflowStep::Active | WorkflowStep::Completed | WorkflowStep::Cancelled => false,
    }
}

pub fn is_user_action_required(step: WorkflowStep) -> bool {
    action_required_for(step, ActorRole::User)
}

pub fn is_admin_action_required(step: WorkflowStep) -> bool {
    action_required_for(step, ActorRole::Admin)
}

/// Per-milestone booleans the dashboard renders alongside the step label.
///
/// Never stored: each flag derives from the step via [`MilestoneFlags::for_step`],
/// so a flag cannot contradict the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneFlags {
    pub subscription_signed_by_user: bool,
    pub subscription_signed_by_admin: bool,
    pub promissory_note_signed: bool,
    pub wire_transfer_completed: bool,
    pub funds_received: bool,
    pub bank_account_connected: bool,
    pub admin_setup_completed: bool,
}

impl MilestoneFlags {
    pub fn for_step(step: WorkflowStep) -> Self {
        Self {
            subscription_signed_by_user: step.has_passed(WorkflowStep::SubscriptionPending),
            subscription_signed_by_admin: step.has_passed(WorkflowStep::SubscriptionAdminReview),
            promissory_note_signed: step.has_passed(WorkflowStep::PromissoryNotePending),
            wire_transfer_completed: step.has_passed(WorkflowStep::FundsPending),
            funds_received: step.has_passed(WorkflowStep::FundsAdminConfirm),
            bank_account_connected: step.has_passed(WorkflowStep::PlaidPending),
            admin_setup_completed: step.has_passed(WorkflowStep::PlaidAdminComplete),
        }
    }

    pub fn count_set(self) -> usize {
        [
            self.subscription_signed_by_user,
            self.subscription_signed_by_admin,
            self.promissory_note_signed,
            self.wire_transfer_completed,
            self.funds_received,
            self.bank_account_connected,
            self.admin_setup_completed,
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}
