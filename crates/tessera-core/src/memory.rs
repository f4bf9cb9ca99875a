// In-memory implementations for examples and testing
//
// These implementations keep all data in memory, making them perfect for:
// - Deterministic unit tests of the workflow service
// - Failure injection (audit append failures, revision races)
// - Quick prototyping without a database

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::audit::AuditEntry;
use crate::entity::MembershipEntity;
use crate::error::{Result, WorkflowError};
use crate::notify::TerminalOutcome;
use crate::traits::{AuditStore, EntityStore, NotificationDispatcher};

// ============================================================================
// InMemoryEntityStore - Entities in a HashMap
// ============================================================================

/// In-memory entity store keyed by entity id.
///
/// Honors the same revision contract as the database store: a save only
/// succeeds when the stored revision matches, and bumps it by one.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEntityStore {
    entities: Arc<RwLock<HashMap<Uuid, MembershipEntity>>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity as-is (useful for seeding tests)
    pub async fn insert(&self, entity: MembershipEntity) {
        self.entities.write().await.insert(entity.id, entity);
    }

    /// All stored entity ids
    pub async fn ids(&self) -> Vec<Uuid> {
        self.entities.read().await.keys().copied().collect()
    }

    /// Clear all entities
    pub async fn clear(&self) {
        self.entities.write().await.clear();
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn load(&self, id: Uuid) -> Result<Option<MembershipEntity>> {
        Ok(self.entities.read().await.get(&id).cloned())
    }

    async fn save_with_revision_check(
        &self,
        entity: &MembershipEntity,
        expected_revision: i64,
    ) -> Result<MembershipEntity> {
        let mut entities = self.entities.write().await;
        let stored = entities
            .get_mut(&entity.id)
            .ok_or(WorkflowError::NotFound(entity.id))?;

        if stored.revision != expected_revision {
            return Err(WorkflowError::ConcurrentModification(entity.id));
        }

        let mut next = entity.clone();
        next.revision = expected_revision + 1;
        *stored = next.clone();
        Ok(next)
    }
}

// ============================================================================
// InMemoryAuditStore - Append-only Vec per entity
// ============================================================================

/// In-memory audit store with failure injection.
///
/// `fail_next_append` makes exactly the next append fail, which is how the
/// entity-write rollback path is exercised in tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuditStore {
    entries: Arc<RwLock<HashMap<Uuid, Vec<AuditEntry>>>>,
    fail_next: Arc<AtomicBool>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next append fail once
    pub fn fail_next_append(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Number of entries recorded for an entity
    pub async fn count(&self, entity_id: Uuid) -> usize {
        self.entries
            .read()
            .await
            .get(&entity_id)
            .map(|e| e.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(WorkflowError::audit("injected audit append failure"));
        }
        self.entries
            .write()
            .await
            .entry(entry.entity_id)
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn list_for_entity(&self, entity_id: Uuid) -> Result<Vec<AuditEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .get(&entity_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// RecordingDispatcher - Collects notifications for assertions
// ============================================================================

/// Dispatcher that records every terminal notification; can be made to fail
/// to verify that dispatch failures never affect the transition result.
#[derive(Debug, Default, Clone)]
pub struct RecordingDispatcher {
    notified: Arc<RwLock<Vec<(Uuid, TerminalOutcome)>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every dispatch fail
    pub fn fail_dispatch(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Everything dispatched so far
    pub async fn notifications(&self) -> Vec<(Uuid, TerminalOutcome)> {
        self.notified.read().await.clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn on_terminal_transition(
        &self,
        entity_id: Uuid,
        outcome: TerminalOutcome,
    ) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("injected dispatch failure");
        }
        self.notified.write().await.push((entity_id, outcome));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;
    use chrono::Utc;

    fn draft() -> MembershipEntity {
        MembershipEntity::new_draft(
            EntityKind::Renewal,
            "Mary Seacole".to_string(),
            "mary@example.org".to_string(),
            Some(10_000),
            Some("REF-9".to_string()),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_save_with_matching_revision_increments() {
        let store = InMemoryEntityStore::new();
        let entity = draft();
        store.insert(entity.clone()).await;

        let saved = store.save_with_revision_check(&entity, 1).await.unwrap();
        assert_eq!(saved.revision, 2);

        let loaded = store.load(entity.id).await.unwrap().unwrap();
        assert_eq!(loaded.revision, 2);
    }

    #[tokio::test]
    async fn test_save_with_stale_revision_fails() {
        let store = InMemoryEntityStore::new();
        let entity = draft();
        store.insert(entity.clone()).await;

        store.save_with_revision_check(&entity, 1).await.unwrap();
        let err = store.save_with_revision_check(&entity, 1).await.unwrap_err();
        assert!(matches!(err, WorkflowError::ConcurrentModification(_)));
    }

    #[tokio::test]
    async fn test_save_unknown_entity_fails() {
        let store = InMemoryEntityStore::new();
        let entity = draft();
        let err = store.save_with_revision_check(&entity, 1).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_audit_failure_injection_fires_once() {
        let store = InMemoryAuditStore::new();
        store.fail_next_append();

        let entry = AuditEntry {
            id: Uuid::now_v7(),
            entity_id: Uuid::now_v7(),
            action: "submitted".to_string(),
            actor_id: Uuid::now_v7(),
            actor_role: "admin".to_string(),
            from_stage: crate::entity::Stage::Draft,
            to_stage: crate::entity::Stage::Submitted,
            occurred_at: Utc::now(),
            notes: None,
        };

        assert!(store.append(&entry).await.is_err());
        assert!(store.append(&entry).await.is_ok());
        assert_eq!(store.count(entry.entity_id).await, 1);
    }
}
