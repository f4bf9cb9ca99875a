// Access guard for transition requests
//
// Maps an actor's role to the set of transitions it may request, before the
// transition engine is invoked. Role strings are owned by the platform auth
// subsystem; unknown strings fail the parse and surface as Forbidden at the
// boundary rather than defaulting to any privilege level.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{MembershipEntity, Stage};
use crate::error::{Result, WorkflowError};

/// Closed set of roles the workflow recognizes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    FinancialReviewer,
    MembershipApprover,
    Admin,
    SuperAdmin,
}

impl ActorRole {
    /// Parse one of the external role strings. Both dot- and underscore-
    /// separated spellings are in circulation; `national` is the legacy name
    /// for the national-level super admin.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "financial_reviewer" | "financial.approver" => Some(ActorRole::FinancialReviewer),
            "membership_approver" | "membership.approver" => Some(ActorRole::MembershipApprover),
            "admin" => Some(ActorRole::Admin),
            "super_admin" | "national" => Some(ActorRole::SuperAdmin),
            _ => None,
        }
    }

    /// Canonical role string, as recorded in the audit trail
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::FinancialReviewer => "financial_reviewer",
            ActorRole::MembershipApprover => "membership_approver",
            ActorRole::Admin => "admin",
            ActorRole::SuperAdmin => "super_admin",
        }
    }

    fn is_admin(&self) -> bool {
        matches!(self, ActorRole::Admin | ActorRole::SuperAdmin)
    }

    /// Static role -> allowed-transition map.
    ///
    /// Draft -> Submitted is requested on behalf of the applicant and is open
    /// to every authenticated role; the transition engine still enforces the
    /// required-fields precondition.
    fn may_request(&self, from: Stage, to: Stage) -> bool {
        if self.is_admin() {
            return true;
        }
        match (from, to) {
            (Stage::Draft, Stage::Submitted) => true,
            (Stage::Submitted, Stage::FinancialReview)
            | (Stage::FinancialReview, Stage::PaymentApproved)
            | (Stage::FinancialReview, Stage::Rejected) => {
                *self == ActorRole::FinancialReviewer
            }
            (Stage::PaymentApproved, Stage::FinalReview)
            | (Stage::FinalReview, Stage::Approved)
            | (Stage::FinalReview, Stage::Rejected) => *self == ActorRole::MembershipApprover,
            _ => false,
        }
    }
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authorize a transition request against the role map and the
/// separation-of-duties rule.
///
/// Separation of duties is enforced here as a guard rule, not merely as a
/// data invariant: the financial reviewer of an entity may never move it into
/// final review, regardless of role.
pub fn authorize(
    entity: &MembershipEntity,
    role: ActorRole,
    actor_id: Uuid,
    to_stage: Stage,
) -> Result<()> {
    let from_stage = entity.stage;

    if !role.may_request(from_stage, to_stage) {
        return Err(WorkflowError::forbidden(format!(
            "role '{role}' may not request '{from_stage}' -> '{to_stage}'"
        )));
    }

    if from_stage == Stage::PaymentApproved
        && to_stage == Stage::FinalReview
        && entity.financial_reviewer_id == Some(actor_id)
    {
        return Err(WorkflowError::separation_of_duties(format!(
            "actor {actor_id} performed the financial review of entity {} and may not act as final approver",
            entity.id
        )));
    }

    Ok(())
}
