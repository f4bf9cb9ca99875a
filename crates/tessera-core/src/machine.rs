// Workflow transition engine
//
// Pure function of (current entity snapshot, transition request) -> new
// snapshot + audit entry, or a typed error. Performs no I/O; the workflow
// service loads and saves the snapshot around it under an optimistic
// concurrency guard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::audit::{action_name, AuditEntry};
use crate::entity::{MembershipEntity, ReviewStatus, Stage};
use crate::error::{Result, WorkflowError};
use crate::guard::ActorRole;

/// A request to move an entity to another stage. Not persisted; on success it
/// is converted into an [`AuditEntry`].
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub entity_id: Uuid,
    pub to_stage: Stage,
    pub actor_id: Uuid,
    pub actor_role: ActorRole,
    pub notes: Option<String>,
    pub requested_at: DateTime<Utc>,
}

/// Snapshot of workflow state returned to the caller after a transition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct TransitionOutcome {
    pub entity_id: Uuid,
    pub stage: Stage,
    pub financial_status: ReviewStatus,
    pub final_status: ReviewStatus,
    pub revision: i64,
}

impl From<&MembershipEntity> for TransitionOutcome {
    fn from(entity: &MembershipEntity) -> Self {
        Self {
            entity_id: entity.id,
            stage: entity.stage,
            financial_status: entity.financial_status,
            final_status: entity.final_status,
            revision: entity.revision,
        }
    }
}

/// Result of applying a transition request to a snapshot
#[derive(Debug, Clone)]
pub enum Applied {
    /// Re-request of the stage the entity already holds; nothing to persist,
    /// no audit entry. Guards against double-submit from retried requests.
    Unchanged,
    /// The transition is legal; the caller must persist `entity` and append
    /// `audit` as one atomic unit.
    Transitioned {
        entity: MembershipEntity,
        audit: AuditEntry,
    },
}

/// Whether (from, to) is in the transition table
fn is_legal(from: Stage, to: Stage) -> bool {
    matches!(
        (from, to),
        (Stage::Draft, Stage::Submitted)
            | (Stage::Submitted, Stage::FinancialReview)
            | (Stage::FinancialReview, Stage::PaymentApproved)
            | (Stage::FinancialReview, Stage::Rejected)
            | (Stage::PaymentApproved, Stage::FinalReview)
            | (Stage::FinalReview, Stage::Approved)
            | (Stage::FinalReview, Stage::Rejected)
    )
}

fn rejection_reason(request: &TransitionRequest) -> Result<String> {
    request
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or_else(|| WorkflowError::validation("a rejection reason is required"))
}

/// Apply a transition request to an entity snapshot.
///
/// Access control has already happened in the guard; this function enforces
/// stage legality and the data preconditions of each transition, then
/// produces the mutated snapshot and its audit entry.
pub fn apply(
    entity: &MembershipEntity,
    request: &TransitionRequest,
    now: DateTime<Utc>,
) -> Result<Applied> {
    let from = entity.stage;
    let to = request.to_stage;

    // Re-requesting the held stage is idempotent, terminal stages included.
    if from == to {
        return Ok(Applied::Unchanged);
    }

    if from.is_terminal() {
        return Err(WorkflowError::TerminalState {
            entity_id: entity.id,
            stage: from,
        });
    }

    if !is_legal(from, to) {
        return Err(WorkflowError::InvalidTransition { from, to });
    }

    let mut next = entity.clone();

    match (from, to) {
        (Stage::Draft, Stage::Submitted) => {
            if !entity.has_required_fields() {
                return Err(WorkflowError::validation(
                    "applicant name, contact and payment details are required before submission",
                ));
            }
        }
        (Stage::Submitted, Stage::FinancialReview) => {
            // Write-once: the first reviewer to pick the entity up keeps it
            next.financial_reviewer_id.get_or_insert(request.actor_id);
            next.financial_status = ReviewStatus::UnderReview;
        }
        (Stage::FinancialReview, Stage::PaymentApproved) => {
            let amount_ok = entity.payment_amount.is_some_and(|a| a > 0);
            let reference_ok = entity
                .payment_reference
                .as_deref()
                .is_some_and(|r| !r.trim().is_empty());
            if !amount_ok || !reference_ok {
                return Err(WorkflowError::validation(
                    "a positive payment amount and a payment reference are required",
                ));
            }
            next.financial_status = ReviewStatus::Approved;
        }
        (Stage::FinancialReview, Stage::Rejected) => {
            let reason = rejection_reason(request)?;
            next.financial_status = ReviewStatus::Rejected;
            next.rejection_reason = Some(reason);
        }
        (Stage::PaymentApproved, Stage::FinalReview) => {
            // Also checked by the access guard; kept here so the data
            // invariant holds no matter how the engine is driven.
            if entity.financial_reviewer_id == Some(request.actor_id) {
                return Err(WorkflowError::separation_of_duties(format!(
                    "actor {} performed the financial review of entity {}",
                    request.actor_id, entity.id
                )));
            }
            next.final_approver_id.get_or_insert(request.actor_id);
            next.final_status = ReviewStatus::UnderReview;
        }
        (Stage::FinalReview, Stage::Approved) => {
            if entity.financial_status != ReviewStatus::Approved {
                return Err(WorkflowError::validation(
                    "final approval requires an approved financial review",
                ));
            }
            next.final_status = ReviewStatus::Approved;
        }
        (Stage::FinalReview, Stage::Rejected) => {
            let reason = rejection_reason(request)?;
            next.final_status = ReviewStatus::Rejected;
            next.rejection_reason = Some(reason);
        }
        _ => unreachable!("checked by is_legal"),
    }

    next.stage = to;
    next.updated_at = now;

    let audit = AuditEntry {
        id: Uuid::now_v7(),
        entity_id: entity.id,
        action: action_name(from, to).to_string(),
        actor_id: request.actor_id,
        actor_role: request.actor_role.as_str().to_string(),
        from_stage: from,
        to_stage: to,
        occurred_at: now,
        notes: request.notes.clone(),
    };

    Ok(Applied::Transitioned {
        entity: next,
        audit,
    })
}
