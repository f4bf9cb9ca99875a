// Notification dispatch for terminal transitions
//
// The workflow only emits an event when an entity reaches a terminal stage;
// delivery (SMS/email) is the notification subsystem's concern and failures
// here never roll back a transition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::entity::Stage;
use crate::traits::NotificationDispatcher;

/// Final disposition of an entity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TerminalOutcome {
    Approved,
    Rejected,
}

impl TerminalOutcome {
    /// The outcome for a terminal stage, if the stage is terminal
    pub fn from_stage(stage: Stage) -> Option<Self> {
        match stage {
            Stage::Approved => Some(TerminalOutcome::Approved),
            Stage::Rejected => Some(TerminalOutcome::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for TerminalOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminalOutcome::Approved => write!(f, "approved"),
            TerminalOutcome::Rejected => write!(f, "rejected"),
        }
    }
}

/// One terminal transition, as handed to the notification consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalNotification {
    pub entity_id: Uuid,
    pub outcome: TerminalOutcome,
}

// ============================================================================
// NoopDispatcher - Drops every notification
// ============================================================================

/// Dispatcher that does nothing; useful in tests that don't care about
/// notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDispatcher;

#[async_trait]
impl NotificationDispatcher for NoopDispatcher {
    async fn on_terminal_transition(
        &self,
        _entity_id: Uuid,
        _outcome: TerminalOutcome,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

// ============================================================================
// ChannelDispatcher - Pushes onto an mpsc channel
// ============================================================================

/// Dispatcher backed by a bounded tokio channel.
///
/// `try_send` keeps dispatch non-blocking: a full or closed channel is an
/// error for the caller to log, not to propagate into the transition result.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::Sender<TerminalNotification>,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the receiving end for a consumer task
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<TerminalNotification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationDispatcher for ChannelDispatcher {
    async fn on_terminal_transition(
        &self,
        entity_id: Uuid,
        outcome: TerminalOutcome,
    ) -> anyhow::Result<()> {
        self.tx
            .try_send(TerminalNotification { entity_id, outcome })
            .map_err(|e| anyhow::anyhow!("notification channel unavailable: {e}"))
    }
}
