// Membership entity domain types
//
// These types represent an application or renewal moving through the
// two-tier approval workflow. Used by both the API and storage crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Workflow stage of a membership entity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Draft,
    Submitted,
    FinancialReview,
    PaymentApproved,
    FinalReview,
    Approved,
    Rejected,
}

impl Stage {
    /// Terminal stages admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Approved | Stage::Rejected)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Draft => write!(f, "draft"),
            Stage::Submitted => write!(f, "submitted"),
            Stage::FinancialReview => write!(f, "financial_review"),
            Stage::PaymentApproved => write!(f, "payment_approved"),
            Stage::FinalReview => write!(f, "final_review"),
            Stage::Approved => write!(f, "approved"),
            Stage::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Stage::Draft),
            "submitted" => Ok(Stage::Submitted),
            "financial_review" => Ok(Stage::FinancialReview),
            "payment_approved" => Ok(Stage::PaymentApproved),
            "final_review" => Ok(Stage::FinalReview),
            "approved" => Ok(Stage::Approved),
            "rejected" => Ok(Stage::Rejected),
            other => Err(format!("unknown stage: {other}")),
        }
    }
}

/// Kind of entity under review; applications and renewals move through
/// the same workflow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Application,
    Renewal,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Application => write!(f, "application"),
            EntityKind::Renewal => write!(f, "renewal"),
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "application" => Ok(EntityKind::Application),
            "renewal" => Ok(EntityKind::Renewal),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

/// Per-tier review status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewStatus::Pending => write!(f, "pending"),
            ReviewStatus::UnderReview => write!(f, "under_review"),
            ReviewStatus::Approved => write!(f, "approved"),
            ReviewStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "under_review" => Ok(ReviewStatus::UnderReview),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            other => Err(format!("unknown review status: {other}")),
        }
    }
}

/// A membership application or renewal moving through the workflow.
///
/// `stage`, `financial_status` and `final_status` are mutated only by the
/// transition engine; the reviewer id fields are write-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct MembershipEntity {
    pub id: Uuid,
    pub kind: EntityKind,
    pub applicant_name: String,
    pub applicant_contact: String,
    pub stage: Stage,
    pub financial_status: ReviewStatus,
    pub final_status: ReviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_reviewer_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_approver_id: Option<Uuid>,
    /// Payment amount in minor currency units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Optimistic concurrency token; incremented on every successful transition
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MembershipEntity {
    /// Create a new draft entity as captured from the applicant form
    pub fn new_draft(
        kind: EntityKind,
        applicant_name: String,
        applicant_contact: String,
        payment_amount: Option<i64>,
        payment_reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            applicant_name,
            applicant_contact,
            stage: Stage::Draft,
            financial_status: ReviewStatus::Pending,
            final_status: ReviewStatus::Pending,
            financial_reviewer_id: None,
            final_approver_id: None,
            payment_amount,
            payment_reference,
            rejection_reason: None,
            revision: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the entity carries everything submission requires:
    /// applicant name, contact, and payment details
    pub fn has_required_fields(&self) -> bool {
        !self.applicant_name.trim().is_empty()
            && !self.applicant_contact.trim().is_empty()
            && self.payment_amount.is_some()
            && self
                .payment_reference
                .as_deref()
                .is_some_and(|r| !r.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> MembershipEntity {
        MembershipEntity::new_draft(
            EntityKind::Application,
            "Ada Lovelace".to_string(),
            "ada@example.org".to_string(),
            Some(25_000),
            Some("PAY-001".to_string()),
            Utc::now(),
        )
    }

    #[test]
    fn test_stage_round_trip() {
        for stage in [
            Stage::Draft,
            Stage::Submitted,
            Stage::FinancialReview,
            Stage::PaymentApproved,
            Stage::FinalReview,
            Stage::Approved,
            Stage::Rejected,
        ] {
            assert_eq!(stage.to_string().parse::<Stage>(), Ok(stage));
        }
    }

    #[test]
    fn test_stage_parse_unknown() {
        assert!("escalated".parse::<Stage>().is_err());
    }

    #[test]
    fn test_terminal_stages() {
        assert!(Stage::Approved.is_terminal());
        assert!(Stage::Rejected.is_terminal());
        assert!(!Stage::FinalReview.is_terminal());
    }

    #[test]
    fn test_new_draft_initial_state() {
        let entity = draft();
        assert_eq!(entity.stage, Stage::Draft);
        assert_eq!(entity.financial_status, ReviewStatus::Pending);
        assert_eq!(entity.final_status, ReviewStatus::Pending);
        assert_eq!(entity.revision, 1);
        assert!(entity.financial_reviewer_id.is_none());
        assert!(entity.final_approver_id.is_none());
    }

    #[test]
    fn test_required_fields_present() {
        assert!(draft().has_required_fields());
    }

    #[test]
    fn test_required_fields_missing_contact() {
        let mut entity = draft();
        entity.applicant_contact = "  ".to_string();
        assert!(!entity.has_required_fields());
    }

    #[test]
    fn test_required_fields_missing_payment_reference() {
        let mut entity = draft();
        entity.payment_reference = Some(String::new());
        assert!(!entity.has_required_fields());
    }
}
