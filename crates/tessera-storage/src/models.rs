// Database row models (internal, may differ from public DTOs)
//
// Stage/status enums are stored as their canonical text form; conversion back
// into domain enums fails loudly on unknown values instead of defaulting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use tessera_core::{AuditEntry, EntityKind, MembershipEntity, ReviewStatus, Stage};

// ============================================
// Membership entity rows
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct MembershipRow {
    pub id: Uuid,
    pub kind: String,
    pub applicant_name: String,
    pub applicant_contact: String,
    pub stage: String,
    pub financial_status: String,
    pub final_status: String,
    pub financial_reviewer_id: Option<Uuid>,
    pub final_approver_id: Option<Uuid>,
    pub payment_amount: Option<i64>,
    pub payment_reference: Option<String>,
    pub rejection_reason: Option<String>,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MembershipRow {
    pub fn into_entity(self) -> Result<MembershipEntity> {
        Ok(MembershipEntity {
            id: self.id,
            kind: self.kind.parse::<EntityKind>().map_err(anyhow::Error::msg)?,
            applicant_name: self.applicant_name,
            applicant_contact: self.applicant_contact,
            stage: self.stage.parse::<Stage>().map_err(anyhow::Error::msg)?,
            financial_status: self
                .financial_status
                .parse::<ReviewStatus>()
                .map_err(anyhow::Error::msg)?,
            final_status: self
                .final_status
                .parse::<ReviewStatus>()
                .map_err(anyhow::Error::msg)?,
            financial_reviewer_id: self.financial_reviewer_id,
            final_approver_id: self.final_approver_id,
            payment_amount: self.payment_amount,
            payment_reference: self.payment_reference,
            rejection_reason: self.rejection_reason,
            revision: self.revision,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// ============================================
// Audit entry rows
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct AuditEntryRow {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub action: String,
    pub actor_id: Uuid,
    pub actor_role: String,
    pub from_stage: String,
    pub to_stage: String,
    pub occurred_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl AuditEntryRow {
    pub fn into_entry(self) -> Result<AuditEntry> {
        Ok(AuditEntry {
            id: self.id,
            entity_id: self.entity_id,
            action: self.action,
            actor_id: self.actor_id,
            actor_role: self.actor_role,
            from_stage: self
                .from_stage
                .parse::<Stage>()
                .map_err(anyhow::Error::msg)?,
            to_stage: self.to_stage.parse::<Stage>().map_err(anyhow::Error::msg)?,
            occurred_at: self.occurred_at,
            notes: self.notes,
        })
    }
}

// ============================================
// Dashboard aggregation rows
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct StageCountRow {
    pub kind: String,
    pub stage: String,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> MembershipRow {
        MembershipRow {
            id: Uuid::now_v7(),
            kind: "application".to_string(),
            applicant_name: "Ada Lovelace".to_string(),
            applicant_contact: "ada@example.org".to_string(),
            stage: "financial_review".to_string(),
            financial_status: "under_review".to_string(),
            final_status: "pending".to_string(),
            financial_reviewer_id: Some(Uuid::now_v7()),
            final_approver_id: None,
            payment_amount: Some(25_000),
            payment_reference: Some("REF1".to_string()),
            rejection_reason: None,
            revision: 2,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_into_entity() {
        let entity = row().into_entity().unwrap();
        assert_eq!(entity.kind, EntityKind::Application);
        assert_eq!(entity.stage, Stage::FinancialReview);
        assert_eq!(entity.financial_status, ReviewStatus::UnderReview);
        assert_eq!(entity.revision, 2);
    }

    #[test]
    fn test_row_with_unknown_stage_fails() {
        let mut bad = row();
        bad.stage = "escalated".to_string();
        assert!(bad.into_entity().is_err());
    }

    #[test]
    fn test_audit_row_into_entry() {
        let row = AuditEntryRow {
            id: Uuid::now_v7(),
            entity_id: Uuid::now_v7(),
            action: "payment_approved".to_string(),
            actor_id: Uuid::now_v7(),
            actor_role: "financial_reviewer".to_string(),
            from_stage: "financial_review".to_string(),
            to_stage: "payment_approved".to_string(),
            occurred_at: Utc::now(),
            notes: None,
        };
        let entry = row.into_entry().unwrap();
        assert_eq!(entry.from_stage, Stage::FinancialReview);
        assert_eq!(entry.to_stage, Stage::PaymentApproved);
    }
}
