// Database-backed AuditStore implementation
//
// The audit_entries table has no UPDATE or DELETE path anywhere in this
// crate; entries are written once by the workflow service and only ever read
// back in occurrence order.

use async_trait::async_trait;
use uuid::Uuid;

use tessera_core::{AuditEntry, AuditStore, Result, WorkflowError};

use crate::repositories::Database;

/// Postgres-backed audit store
#[derive(Clone)]
pub struct PgAuditStore {
    db: Database,
}

impl PgAuditStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        self.db
            .append_audit_entry(entry)
            .await
            .map_err(|e| WorkflowError::audit(e.to_string()))?;
        Ok(())
    }

    async fn list_for_entity(&self, entity_id: Uuid) -> Result<Vec<AuditEntry>> {
        let rows = self
            .db
            .list_audit_entries(entity_id)
            .await
            .map_err(WorkflowError::Store)?;

        rows.into_iter()
            .map(|r| r.into_entry().map_err(WorkflowError::Store))
            .collect()
    }
}
