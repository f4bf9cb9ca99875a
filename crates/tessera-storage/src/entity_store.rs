// Database-backed EntityStore implementation
//
// Optimistic concurrency: the UPDATE carries `WHERE revision = $expected`;
// zero rows affected means another reviewer committed first and the caller
// gets ConcurrentModification rather than a silent overwrite.

use async_trait::async_trait;
use uuid::Uuid;

use tessera_core::{EntityStore, MembershipEntity, Result, WorkflowError};

use crate::repositories::Database;

/// Postgres-backed entity store
#[derive(Clone)]
pub struct PgEntityStore {
    db: Database,
}

impl PgEntityStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EntityStore for PgEntityStore {
    async fn load(&self, id: Uuid) -> Result<Option<MembershipEntity>> {
        let row = self
            .db
            .get_entity(id)
            .await
            .map_err(WorkflowError::Store)?;
        row.map(|r| r.into_entity().map_err(WorkflowError::Store))
            .transpose()
    }

    async fn save_with_revision_check(
        &self,
        entity: &MembershipEntity,
        expected_revision: i64,
    ) -> Result<MembershipEntity> {
        let row = self
            .db
            .update_entity_with_revision(entity, expected_revision, entity.updated_at)
            .await
            .map_err(WorkflowError::Store)?;

        match row {
            Some(row) => row.into_entity().map_err(WorkflowError::Store),
            None => {
                // Distinguish a vanished row from a lost race
                let exists = self
                    .db
                    .get_entity(entity.id)
                    .await
                    .map_err(WorkflowError::Store)?
                    .is_some();
                if exists {
                    Err(WorkflowError::ConcurrentModification(entity.id))
                } else {
                    Err(WorkflowError::NotFound(entity.id))
                }
            }
        }
    }
}
