// Workflow service: the single entry point for transition requests
//
// Drives one request through load -> guard -> transition engine -> persist ->
// audit -> notify. Stage and status fields are never written outside this
// path; the stores only see snapshots this service produced.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::audit::AuditEntry;
use crate::entity::MembershipEntity;
use crate::error::{Result, WorkflowError};
use crate::guard;
use crate::machine::{self, Applied, TransitionOutcome, TransitionRequest};
use crate::notify::TerminalOutcome;
use crate::traits::{AuditStore, Clock, EntityStore, NotificationDispatcher};

const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Orchestrates the two-tier approval workflow over injected collaborators
#[derive(Clone)]
pub struct WorkflowService {
    entities: Arc<dyn EntityStore>,
    audit: Arc<dyn AuditStore>,
    notifier: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl WorkflowService {
    pub fn new(
        entities: Arc<dyn EntityStore>,
        audit: Arc<dyn AuditStore>,
        notifier: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            entities,
            audit,
            notifier,
            clock,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Override the per-call store deadline
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Bound a store operation by the configured deadline. On expiry the
    /// operation is abandoned and the entity is left as the store last
    /// committed it; nothing is partially applied.
    async fn store_call<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        with_deadline(self.store_timeout, fut).await
    }

    /// Process one transition request.
    ///
    /// On success the entity write and the audit append have both committed;
    /// if the audit append fails after the entity write, the entity write is
    /// compensated and the request fails with `AuditWriteFailed`.
    pub async fn request_transition(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome> {
        let entity = self
            .store_call(self.entities.load(request.entity_id))
            .await?
            .ok_or(WorkflowError::NotFound(request.entity_id))?;

        guard::authorize(&entity, request.actor_role, request.actor_id, request.to_stage)?;

        match machine::apply(&entity, &request, self.clock.now())? {
            Applied::Unchanged => {
                tracing::debug!(
                    entity_id = %entity.id,
                    stage = %entity.stage,
                    "re-request of held stage; returning snapshot unchanged"
                );
                Ok(TransitionOutcome::from(&entity))
            }
            Applied::Transitioned {
                entity: next,
                audit: entry,
            } => {
                // The write phase runs on its own task: a caller that
                // disconnects mid-request can cancel validation above, but
                // never an in-flight entity/audit write pair.
                let commit = Commit {
                    entities: self.entities.clone(),
                    audit: self.audit.clone(),
                    store_timeout: self.store_timeout,
                };
                let before = entity.clone();
                let action = entry.action.clone();
                let persisted = tokio::spawn(commit.run(before, next, entry))
                    .await
                    .map_err(|e| {
                        WorkflowError::Store(anyhow::anyhow!("commit task failed: {e}"))
                    })??;

                tracing::info!(
                    entity_id = %persisted.id,
                    action = %action,
                    stage = %persisted.stage,
                    "transition applied"
                );

                if let Some(outcome) = TerminalOutcome::from_stage(persisted.stage) {
                    if let Err(e) = self
                        .notifier
                        .on_terminal_transition(persisted.id, outcome)
                        .await
                    {
                        tracing::warn!(
                            entity_id = %persisted.id,
                            "terminal notification dispatch failed: {e}"
                        );
                    }
                }

                Ok(TransitionOutcome::from(&persisted))
            }
        }
    }

    /// Ordered audit trail for an entity, oldest entry first
    pub async fn get_audit_trail(&self, entity_id: Uuid) -> Result<Vec<AuditEntry>> {
        self.store_call(self.entities.load(entity_id))
            .await?
            .ok_or(WorkflowError::NotFound(entity_id))?;
        self.store_call(self.audit.list_for_entity(entity_id)).await
    }
}

/// Owns the write phase of one transition so it can outlive the request
struct Commit {
    entities: Arc<dyn EntityStore>,
    audit: Arc<dyn AuditStore>,
    store_timeout: Duration,
}

impl Commit {
    async fn run(
        self,
        before: MembershipEntity,
        next: MembershipEntity,
        entry: AuditEntry,
    ) -> Result<MembershipEntity> {
        let persisted = with_deadline(
            self.store_timeout,
            self.entities
                .save_with_revision_check(&next, before.revision),
        )
        .await?;

        if let Err(append_err) =
            with_deadline(self.store_timeout, self.audit.append(&entry)).await
        {
            // Compensating write: restore the pre-transition snapshot at the
            // now-current revision so no committed state lacks an audit entry
            match with_deadline(
                self.store_timeout,
                self.entities
                    .save_with_revision_check(&before, persisted.revision),
            )
            .await
            {
                Ok(_) => tracing::warn!(
                    entity_id = %before.id,
                    "entity write rolled back after audit append failure"
                ),
                Err(e) => tracing::error!(
                    entity_id = %before.id,
                    "entity write could not be rolled back after audit failure, \
                     stage and audit trail disagree: {e}"
                ),
            }
            return Err(WorkflowError::audit(append_err.to_string()));
        }

        Ok(persisted)
    }
}

async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(WorkflowError::StoreTimeout(deadline)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKind, ReviewStatus, Stage};
    use crate::guard::ActorRole;
    use crate::memory::{InMemoryAuditStore, InMemoryEntityStore, RecordingDispatcher};
    use crate::traits::SystemClock;
    use async_trait::async_trait;
    use chrono::Utc;

    struct Fixture {
        entities: Arc<InMemoryEntityStore>,
        audit: Arc<InMemoryAuditStore>,
        dispatcher: Arc<RecordingDispatcher>,
        service: WorkflowService,
    }

    fn fixture() -> Fixture {
        let entities = Arc::new(InMemoryEntityStore::new());
        let audit = Arc::new(InMemoryAuditStore::new());
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let service = WorkflowService::new(
            entities.clone(),
            audit.clone(),
            dispatcher.clone(),
            Arc::new(SystemClock),
        );
        Fixture {
            entities,
            audit,
            dispatcher,
            service,
        }
    }

    async fn seed(fixture: &Fixture, stage: Stage) -> MembershipEntity {
        let mut entity = MembershipEntity::new_draft(
            EntityKind::Application,
            "Ada Lovelace".to_string(),
            "ada@example.org".to_string(),
            Some(25_000),
            Some("REF1".to_string()),
            Utc::now(),
        );
        entity.stage = stage;
        fixture.entities.insert(entity.clone()).await;
        entity
    }

    fn req(
        entity: &MembershipEntity,
        to: Stage,
        actor_id: Uuid,
        role: ActorRole,
        notes: Option<&str>,
    ) -> TransitionRequest {
        TransitionRequest {
            entity_id: entity.id,
            to_stage: to,
            actor_id,
            actor_role: role,
            notes: notes.map(str::to_string),
            requested_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_two_tier_walkthrough() {
        let f = fixture();
        let entity = seed(&f, Stage::Submitted).await;
        let u1 = Uuid::now_v7();
        let u2 = Uuid::now_v7();

        // U1 picks up the financial review
        let out = f
            .service
            .request_transition(req(
                &entity,
                Stage::FinancialReview,
                u1,
                ActorRole::FinancialReviewer,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(out.stage, Stage::FinancialReview);

        // U1 approves the payment
        let out = f
            .service
            .request_transition(req(
                &entity,
                Stage::PaymentApproved,
                u1,
                ActorRole::FinancialReviewer,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(out.financial_status, ReviewStatus::Approved);

        // U2 opens the final review
        let out = f
            .service
            .request_transition(req(
                &entity,
                Stage::FinalReview,
                u2,
                ActorRole::MembershipApprover,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(out.stage, Stage::FinalReview);

        // U2 approves membership
        let out = f
            .service
            .request_transition(req(
                &entity,
                Stage::Approved,
                u2,
                ActorRole::MembershipApprover,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(out.stage, Stage::Approved);
        assert_eq!(out.final_status, ReviewStatus::Approved);

        // One audit entry per successful transition, in stage order
        let trail = f.service.get_audit_trail(entity.id).await.unwrap();
        assert_eq!(trail.len(), 4);
        let stages: Vec<Stage> = trail.iter().map(|e| e.to_stage).collect();
        assert_eq!(
            stages,
            vec![
                Stage::FinancialReview,
                Stage::PaymentApproved,
                Stage::FinalReview,
                Stage::Approved
            ]
        );

        // Terminal outcome was dispatched once
        let notifications = f.dispatcher.notifications().await;
        assert_eq!(notifications, vec![(entity.id, TerminalOutcome::Approved)]);

        // Reviewer identities stayed distinct
        let stored = f.entities.load(entity.id).await.unwrap().unwrap();
        assert_eq!(stored.financial_reviewer_id, Some(u1));
        assert_eq!(stored.final_approver_id, Some(u2));
    }

    #[tokio::test]
    async fn test_financial_reviewer_blocked_from_final_review() {
        let f = fixture();
        let u1 = Uuid::now_v7();
        let mut entity = seed(&f, Stage::PaymentApproved).await;
        entity.financial_reviewer_id = Some(u1);
        entity.financial_status = ReviewStatus::Approved;
        f.entities.insert(entity.clone()).await;

        let err = f
            .service
            .request_transition(req(
                &entity,
                Stage::FinalReview,
                u1,
                ActorRole::MembershipApprover,
                None,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::SeparationOfDuties(_)));

        // Entity unchanged, no audit entry added
        let stored = f.entities.load(entity.id).await.unwrap().unwrap();
        assert_eq!(stored.stage, Stage::PaymentApproved);
        assert!(stored.final_approver_id.is_none());
        assert_eq!(f.audit.count(entity.id).await, 0);
    }

    #[tokio::test]
    async fn test_re_request_is_idempotent_and_unaudited() {
        let f = fixture();
        let entity = seed(&f, Stage::Submitted).await;
        let u1 = Uuid::now_v7();

        let first = f
            .service
            .request_transition(req(
                &entity,
                Stage::FinancialReview,
                u1,
                ActorRole::FinancialReviewer,
                None,
            ))
            .await
            .unwrap();

        // Retried double-submit of the same target stage
        let second = f
            .service
            .request_transition(req(
                &entity,
                Stage::FinancialReview,
                u1,
                ActorRole::FinancialReviewer,
                None,
            ))
            .await
            .unwrap();

        assert_eq!(second.stage, first.stage);
        assert_eq!(second.revision, first.revision);
        assert_eq!(f.audit.count(entity.id).await, 1);
    }

    #[tokio::test]
    async fn test_terminal_entity_is_immutable() {
        let f = fixture();
        let entity = seed(&f, Stage::Rejected).await;

        let err = f
            .service
            .request_transition(req(
                &entity,
                Stage::FinancialReview,
                Uuid::now_v7(),
                ActorRole::SuperAdmin,
                None,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::TerminalState { .. }));

        let stored = f.entities.load(entity.id).await.unwrap().unwrap();
        assert_eq!(stored.stage, Stage::Rejected);
        assert_eq!(stored.revision, entity.revision);
    }

    #[tokio::test]
    async fn test_unknown_entity_is_not_found() {
        let f = fixture();
        let ghost = MembershipEntity::new_draft(
            EntityKind::Renewal,
            "Nobody".to_string(),
            "nobody@example.org".to_string(),
            Some(1),
            Some("X".to_string()),
            Utc::now(),
        );
        let err = f
            .service
            .request_transition(req(
                &ghost,
                Stage::Submitted,
                Uuid::now_v7(),
                ActorRole::Admin,
                None,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_revision_increments_by_one_per_transition() {
        let f = fixture();
        let entity = seed(&f, Stage::Submitted).await;
        assert_eq!(entity.revision, 1);

        let out = f
            .service
            .request_transition(req(
                &entity,
                Stage::FinancialReview,
                Uuid::now_v7(),
                ActorRole::FinancialReviewer,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(out.revision, 2);

        let out = f
            .service
            .request_transition(req(
                &entity,
                Stage::PaymentApproved,
                Uuid::now_v7(),
                ActorRole::FinancialReviewer,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(out.revision, 3);
    }

    // Entity store wrapper that hands out a stale snapshot on every load,
    // simulating a second reviewer committing between our read and write.
    struct StaleReadStore {
        inner: Arc<InMemoryEntityStore>,
        stale: MembershipEntity,
    }

    #[async_trait]
    impl EntityStore for StaleReadStore {
        async fn load(&self, _id: Uuid) -> Result<Option<MembershipEntity>> {
            Ok(Some(self.stale.clone()))
        }

        async fn save_with_revision_check(
            &self,
            entity: &MembershipEntity,
            expected_revision: i64,
        ) -> Result<MembershipEntity> {
            self.inner
                .save_with_revision_check(entity, expected_revision)
                .await
        }
    }

    #[tokio::test]
    async fn test_racing_reviewers_surface_concurrent_modification() {
        let f = fixture();
        let u1 = Uuid::now_v7();
        let mut entity = seed(&f, Stage::FinancialReview).await;
        entity.financial_reviewer_id = Some(u1);
        entity.financial_status = ReviewStatus::UnderReview;
        f.entities.insert(entity.clone()).await;
        let stale = entity.clone();

        // First reviewer commits; stored revision moves to 2
        f.service
            .request_transition(req(
                &entity,
                Stage::PaymentApproved,
                u1,
                ActorRole::FinancialReviewer,
                None,
            ))
            .await
            .unwrap();

        // Second caller still holds the revision-1 snapshot
        let racing = WorkflowService::new(
            Arc::new(StaleReadStore {
                inner: f.entities.clone(),
                stale,
            }),
            f.audit.clone(),
            f.dispatcher.clone(),
            Arc::new(SystemClock),
        );
        let err = racing
            .request_transition(req(
                &entity,
                Stage::PaymentApproved,
                u1,
                ActorRole::FinancialReviewer,
                None,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ConcurrentModification(_)));
        assert!(err.is_retryable());

        // Only the winning commit was audited
        assert_eq!(f.audit.count(entity.id).await, 1);
    }

    #[tokio::test]
    async fn test_audit_failure_rolls_back_entity_write() {
        let f = fixture();
        let entity = seed(&f, Stage::Submitted).await;
        f.audit.fail_next_append();

        let err = f
            .service
            .request_transition(req(
                &entity,
                Stage::FinancialReview,
                Uuid::now_v7(),
                ActorRole::FinancialReviewer,
                None,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::AuditWriteFailed(_)));

        // No orphan committed state: persisted stage is back to Submitted
        // and no audit entry exists
        let stored = f.entities.load(entity.id).await.unwrap().unwrap();
        assert_eq!(stored.stage, Stage::Submitted);
        assert!(stored.financial_reviewer_id.is_none());
        assert_eq!(f.audit.count(entity.id).await, 0);
    }

    #[tokio::test]
    async fn test_dispatch_failure_does_not_fail_transition() {
        let f = fixture();
        let u2 = Uuid::now_v7();
        let mut entity = seed(&f, Stage::FinalReview).await;
        entity.financial_status = ReviewStatus::Approved;
        entity.final_approver_id = Some(u2);
        f.entities.insert(entity.clone()).await;
        f.dispatcher.fail_dispatch();

        let out = f
            .service
            .request_transition(req(
                &entity,
                Stage::Approved,
                u2,
                ActorRole::MembershipApprover,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(out.stage, Stage::Approved);
        assert_eq!(f.audit.count(entity.id).await, 1);
    }

    // Entity store wrapper whose load never completes in time
    struct SlowStore {
        inner: Arc<InMemoryEntityStore>,
    }

    #[async_trait]
    impl EntityStore for SlowStore {
        async fn load(&self, id: Uuid) -> Result<Option<MembershipEntity>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            self.inner.load(id).await
        }

        async fn save_with_revision_check(
            &self,
            entity: &MembershipEntity,
            expected_revision: i64,
        ) -> Result<MembershipEntity> {
            self.inner
                .save_with_revision_check(entity, expected_revision)
                .await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_timeout_surfaces_and_leaves_entity_unchanged() {
        let f = fixture();
        let entity = seed(&f, Stage::Submitted).await;

        let slow = WorkflowService::new(
            Arc::new(SlowStore {
                inner: f.entities.clone(),
            }),
            f.audit.clone(),
            f.dispatcher.clone(),
            Arc::new(SystemClock),
        )
        .with_store_timeout(Duration::from_millis(50));

        let err = slow
            .request_transition(req(
                &entity,
                Stage::FinancialReview,
                Uuid::now_v7(),
                ActorRole::FinancialReviewer,
                None,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::StoreTimeout(_)));

        let stored = f.entities.load(entity.id).await.unwrap().unwrap();
        assert_eq!(stored.stage, Stage::Submitted);
        assert_eq!(stored.revision, 1);
    }

    #[tokio::test]
    async fn test_rejection_dispatches_rejected_outcome() {
        let f = fixture();
        let u1 = Uuid::now_v7();
        let mut entity = seed(&f, Stage::FinancialReview).await;
        entity.financial_reviewer_id = Some(u1);
        f.entities.insert(entity.clone()).await;

        f.service
            .request_transition(req(
                &entity,
                Stage::Rejected,
                u1,
                ActorRole::FinancialReviewer,
                Some("duplicate application"),
            ))
            .await
            .unwrap();

        let notifications = f.dispatcher.notifications().await;
        assert_eq!(notifications, vec![(entity.id, TerminalOutcome::Rejected)]);
    }

    #[tokio::test]
    async fn test_audit_trail_for_unknown_entity_is_not_found() {
        let f = fixture();
        let err = f.service.get_audit_trail(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }
}
