// Error types for the approval workflow

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::entity::Stage;

/// Result type alias for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors that can occur while processing a transition request.
///
/// Every variant is a distinct, user-surfaceable kind; the API layer maps
/// them to HTTP statuses. None of these are thrown across the core boundary.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Requested (from, to) pair is not in the transition table
    #[error("invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: Stage, to: Stage },

    /// Entity is already in a terminal stage
    #[error("entity {entity_id} is in terminal stage '{stage}' and cannot transition")]
    TerminalState { entity_id: Uuid, stage: Stage },

    /// Actor role is not permitted to request this transition
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Actor already acted on the other review tier of this entity
    #[error("separation of duties violation: {0}")]
    SeparationOfDuties(String),

    /// Precondition on entity data not met
    #[error("validation failed: {0}")]
    Validation(String),

    /// Entity id is unknown
    #[error("entity not found: {0}")]
    NotFound(Uuid),

    /// Optimistic revision check failed; the caller should re-read and retry
    #[error("entity {0} was modified concurrently; reload and retry")]
    ConcurrentModification(Uuid),

    /// Store operation exceeded its deadline; the entity is unchanged
    #[error("store operation timed out after {0:?}")]
    StoreTimeout(Duration),

    /// Entity write succeeded but the audit append failed; the entity write
    /// is rolled back and the request fails
    #[error("audit write failed: {0}")]
    AuditWriteFailed(String),

    /// Infrastructure failure in the underlying store
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl WorkflowError {
    /// Create a forbidden error
    pub fn forbidden(msg: impl Into<String>) -> Self {
        WorkflowError::Forbidden(msg.into())
    }

    /// Create a separation-of-duties error
    pub fn separation_of_duties(msg: impl Into<String>) -> Self {
        WorkflowError::SeparationOfDuties(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        WorkflowError::Validation(msg.into())
    }

    /// Create an audit write failure
    pub fn audit(msg: impl Into<String>) -> Self {
        WorkflowError::AuditWriteFailed(msg.into())
    }

    /// Whether the caller may safely retry the same request after a re-read.
    /// Only concurrent-modification failures are retry-safe; everything else
    /// will fail again unless the underlying condition changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkflowError::ConcurrentModification(_))
    }
}
