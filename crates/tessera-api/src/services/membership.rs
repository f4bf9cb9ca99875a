// Membership service for entity CRUD business logic
//
// Only draft creation and reads go through here; every stage/status mutation
// goes through the workflow service instead.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use tessera_core::{EntityKind, MembershipEntity, Stage};
use tessera_storage::Database;

use crate::memberships::CreateMembershipRequest;

pub struct MembershipService {
    db: Arc<Database>,
}

impl MembershipService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        kind: EntityKind,
        req: CreateMembershipRequest,
    ) -> Result<MembershipEntity> {
        let entity = MembershipEntity::new_draft(
            kind,
            req.applicant_name,
            req.applicant_contact,
            req.payment_amount,
            req.payment_reference,
            Utc::now(),
        );
        let row = self.db.create_entity(&entity).await?;
        row.into_entity()
    }

    /// Fetch one entity; an id that exists under the other kind is treated
    /// as not found so /applications and /renewals stay disjoint
    pub async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Option<MembershipEntity>> {
        let row = self.db.get_entity(id).await?;
        let entity = row.map(|r| r.into_entity()).transpose()?;
        Ok(entity.filter(|e| e.kind == kind))
    }

    pub async fn list(
        &self,
        kind: EntityKind,
        stage: Option<Stage>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MembershipEntity>> {
        let stage = stage.map(|s| s.to_string());
        let rows = self
            .db
            .list_entities(&kind.to_string(), stage.as_deref(), limit, offset)
            .await?;
        rows.into_iter().map(|r| r.into_entity()).collect()
    }
}
