// Two-Tier Approval Workflow
//
// This crate provides a DB-agnostic implementation of the membership approval
// workflow: financial review first, then final membership review.
//
// Key design decisions:
// - Uses traits (EntityStore, AuditStore, NotificationDispatcher, Clock) for
//   pluggable backends
// - The transition engine is a pure function of (snapshot, request); all I/O
//   happens in WorkflowService around it
// - Access control (role map + separation of duties) runs before the engine
// - Every successful transition appends exactly one immutable audit entry
// - Optimistic revision checks replace row locks for racing reviewers
// - Error handling surfaces a distinct, typed kind per failure mode

// Domain entity types
// These are DB-agnostic entity types used by both API and storage
pub mod audit;
pub mod entity;

pub mod error;
pub mod guard;
pub mod machine;
pub mod notify;
pub mod service;
pub mod traits;

// In-memory implementations for examples and testing
pub mod memory;

// Re-exports for convenience
pub use audit::AuditEntry;
pub use entity::{EntityKind, MembershipEntity, ReviewStatus, Stage};
pub use error::{Result, WorkflowError};
pub use guard::ActorRole;
pub use machine::{Applied, TransitionOutcome, TransitionRequest};
pub use notify::{ChannelDispatcher, NoopDispatcher, TerminalNotification, TerminalOutcome};
pub use service::WorkflowService;
pub use traits::{AuditStore, Clock, EntityStore, NotificationDispatcher, SystemClock};
