// Repository layer for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tessera_core::{AuditEntry, MembershipEntity};

use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Run pending migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ============================================
    // Membership entities
    // ============================================

    pub async fn create_entity(&self, entity: &MembershipEntity) -> Result<MembershipRow> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            INSERT INTO membership_entities
                (id, kind, applicant_name, applicant_contact, stage,
                 financial_status, final_status, payment_amount, payment_reference,
                 revision, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, kind, applicant_name, applicant_contact, stage,
                      financial_status, final_status, financial_reviewer_id,
                      final_approver_id, payment_amount, payment_reference,
                      rejection_reason, revision, created_at, updated_at
            "#,
        )
        .bind(entity.id)
        .bind(entity.kind.to_string())
        .bind(&entity.applicant_name)
        .bind(&entity.applicant_contact)
        .bind(entity.stage.to_string())
        .bind(entity.financial_status.to_string())
        .bind(entity.final_status.to_string())
        .bind(entity.payment_amount)
        .bind(&entity.payment_reference)
        .bind(entity.revision)
        .bind(entity.created_at)
        .bind(entity.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_entity(&self, id: Uuid) -> Result<Option<MembershipRow>> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, kind, applicant_name, applicant_contact, stage,
                   financial_status, final_status, financial_reviewer_id,
                   final_approver_id, payment_amount, payment_reference,
                   rejection_reason, revision, created_at, updated_at
            FROM membership_entities
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_entities(
        &self,
        kind: &str,
        stage: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MembershipRow>> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, kind, applicant_name, applicant_contact, stage,
                   financial_status, final_status, financial_reviewer_id,
                   final_approver_id, payment_amount, payment_reference,
                   rejection_reason, revision, created_at, updated_at
            FROM membership_entities
            WHERE kind = $1 AND ($2::text IS NULL OR stage = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(kind)
        .bind(stage)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Persist a transitioned snapshot if the stored revision is unchanged.
    ///
    /// Returns `None` when zero rows matched, i.e. the entity is gone or the
    /// revision moved underneath the caller; the store layer distinguishes
    /// the two.
    pub async fn update_entity_with_revision(
        &self,
        entity: &MembershipEntity,
        expected_revision: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<MembershipRow>> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            UPDATE membership_entities
            SET
                stage = $3,
                financial_status = $4,
                final_status = $5,
                financial_reviewer_id = $6,
                final_approver_id = $7,
                rejection_reason = $8,
                revision = revision + 1,
                updated_at = $9
            WHERE id = $1 AND revision = $2
            RETURNING id, kind, applicant_name, applicant_contact, stage,
                      financial_status, final_status, financial_reviewer_id,
                      final_approver_id, payment_amount, payment_reference,
                      rejection_reason, revision, created_at, updated_at
            "#,
        )
        .bind(entity.id)
        .bind(expected_revision)
        .bind(entity.stage.to_string())
        .bind(entity.financial_status.to_string())
        .bind(entity.final_status.to_string())
        .bind(entity.financial_reviewer_id)
        .bind(entity.final_approver_id)
        .bind(&entity.rejection_reason)
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    // ============================================
    // Audit entries (append-only)
    // ============================================

    pub async fn append_audit_entry(&self, entry: &AuditEntry) -> Result<AuditEntryRow> {
        let row = sqlx::query_as::<_, AuditEntryRow>(
            r#"
            INSERT INTO audit_entries
                (id, entity_id, action, actor_id, actor_role,
                 from_stage, to_stage, occurred_at, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, entity_id, action, actor_id, actor_role,
                      from_stage, to_stage, occurred_at, notes
            "#,
        )
        .bind(entry.id)
        .bind(entry.entity_id)
        .bind(&entry.action)
        .bind(entry.actor_id)
        .bind(&entry.actor_role)
        .bind(entry.from_stage.to_string())
        .bind(entry.to_stage.to_string())
        .bind(entry.occurred_at)
        .bind(&entry.notes)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_audit_entries(&self, entity_id: Uuid) -> Result<Vec<AuditEntryRow>> {
        let rows = sqlx::query_as::<_, AuditEntryRow>(
            r#"
            SELECT id, entity_id, action, actor_id, actor_role,
                   from_stage, to_stage, occurred_at, notes
            FROM audit_entries
            WHERE entity_id = $1
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============================================
    // Dashboard aggregation (read-only consumer)
    // ============================================

    pub async fn stage_counts(&self) -> Result<Vec<StageCountRow>> {
        let rows = sqlx::query_as::<_, StageCountRow>(
            r#"
            SELECT kind, stage, COUNT(*) AS count
            FROM membership_entities
            GROUP BY kind, stage
            ORDER BY kind, stage
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
