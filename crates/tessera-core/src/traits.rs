// Core traits for pluggable backends
//
// These traits allow the workflow service to be used with different backends:
// - In-memory implementations for examples and testing
// - Database implementations for production
// - Channel-based implementations for notification fan-out

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::audit::AuditEntry;
use crate::entity::MembershipEntity;
use crate::error::Result;
use crate::notify::TerminalOutcome;

// ============================================================================
// EntityStore - Durable membership entity records
// ============================================================================

/// Trait for loading and saving membership entities.
///
/// `save_with_revision_check` is the only write path the workflow uses: it
/// must persist the snapshot only if the stored revision still equals
/// `expected_revision`, increment the revision by one, and return the
/// persisted row. A mismatch surfaces as
/// [`WorkflowError::ConcurrentModification`](crate::WorkflowError::ConcurrentModification).
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Load an entity snapshot by id
    async fn load(&self, id: Uuid) -> Result<Option<MembershipEntity>>;

    /// Persist a snapshot if the stored revision is unchanged
    async fn save_with_revision_check(
        &self,
        entity: &MembershipEntity,
        expected_revision: i64,
    ) -> Result<MembershipEntity>;
}

// ============================================================================
// AuditStore - Append-only transition history
// ============================================================================

/// Trait for the append-only audit trail.
///
/// Entries are never updated or removed; `list_for_entity` returns them in
/// occurrence order for trail reconstruction.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one entry
    async fn append(&self, entry: &AuditEntry) -> Result<()>;

    /// All entries for an entity, oldest first
    async fn list_for_entity(&self, entity_id: Uuid) -> Result<Vec<AuditEntry>>;
}

// ============================================================================
// NotificationDispatcher - Fire-and-forget terminal events
// ============================================================================

/// Trait for informing the notification subsystem of terminal transitions.
///
/// Implementations can:
/// - Push onto a channel consumed by a delivery task
/// - Collect notifications in memory for testing
/// - Do nothing (no-op implementation)
///
/// Dispatch is best-effort: the workflow never waits on delivery and a
/// dispatch failure never affects the transition result, so errors here are
/// deliberately untyped.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn on_terminal_transition(
        &self,
        entity_id: Uuid,
        outcome: TerminalOutcome,
    ) -> anyhow::Result<()>;
}

// ============================================================================
// Clock - Injected time source
// ============================================================================

/// Time source for transition timestamps; injected so tests are deterministic
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
