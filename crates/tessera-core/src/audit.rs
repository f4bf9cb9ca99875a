// Audit trail types
//
// Audit entries are append-only. They are created by the workflow service as
// a side effect of a successful transition and never updated or removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::entity::Stage;

/// Immutable record of one successful transition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct AuditEntry {
    pub id: Uuid,
    pub entity_id: Uuid,
    /// Human-readable transition name, e.g. "financial_review_started"
    pub action: String,
    pub actor_id: Uuid,
    /// Canonical role string of the acting user
    pub actor_role: String,
    pub from_stage: Stage,
    pub to_stage: Stage,
    pub occurred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Transition name recorded in the audit trail for a legal (from, to) pair
pub fn action_name(from: Stage, to: Stage) -> &'static str {
    match (from, to) {
        (Stage::Draft, Stage::Submitted) => "submitted",
        (Stage::Submitted, Stage::FinancialReview) => "financial_review_started",
        (Stage::FinancialReview, Stage::PaymentApproved) => "payment_approved",
        (Stage::FinancialReview, Stage::Rejected) => "financial_rejected",
        (Stage::PaymentApproved, Stage::FinalReview) => "final_review_started",
        (Stage::FinalReview, Stage::Approved) => "membership_approved",
        (Stage::FinalReview, Stage::Rejected) => "membership_rejected",
        _ => "transition",
    }
}
