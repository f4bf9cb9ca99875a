// Workflow transition HTTP routes
//
// The only write path for stage/status fields. Both entity kinds share the
// same workflow; the kind segment in the path is for API symmetry and the
// entity id alone identifies the record, mirroring the CRUD routes.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use tessera_core::{
    AuditEntry, Stage, TransitionOutcome, TransitionRequest, WorkflowService,
};

use crate::auth::Actor;
use crate::common::ListResponse;
use crate::error::ApiError;

/// Request to move an entity to another workflow stage
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransitionRequestBody {
    /// Target stage.
    #[schema(example = "financial_review")]
    pub to_stage: Stage,
    /// Reviewer notes; required for rejections (the rejection reason).
    #[serde(default)]
    pub notes: Option<String>,
}

/// App state for workflow routes
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<WorkflowService>,
}

impl AppState {
    pub fn new(workflow: Arc<WorkflowService>) -> Self {
        Self { workflow }
    }
}

/// Create workflow routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/applications/:id/transitions",
            post(request_application_transition),
        )
        .route("/v1/applications/:id/audit", get(application_audit_trail))
        .route(
            "/v1/renewals/:id/transitions",
            post(request_renewal_transition),
        )
        .route("/v1/renewals/:id/audit", get(renewal_audit_trail))
        .with_state(state)
}

async fn request_transition(
    state: AppState,
    id: Uuid,
    actor: Actor,
    body: TransitionRequestBody,
) -> Result<Json<TransitionOutcome>, ApiError> {
    let outcome = state
        .workflow
        .request_transition(TransitionRequest {
            entity_id: id,
            to_stage: body.to_stage,
            actor_id: actor.id,
            actor_role: actor.role,
            notes: body.notes,
            requested_at: Utc::now(),
        })
        .await?;

    Ok(Json(outcome))
}

async fn audit_trail(
    state: AppState,
    id: Uuid,
) -> Result<Json<ListResponse<AuditEntry>>, ApiError> {
    let trail = state.workflow.get_audit_trail(id).await?;
    Ok(Json(ListResponse::new(trail)))
}

/// POST /v1/applications/{id}/transitions - Request a workflow transition
#[utoipa::path(
    post,
    path = "/v1/applications/{id}/transitions",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    request_body = TransitionRequestBody,
    responses(
        (status = 200, description = "Transition applied", body = TransitionOutcome),
        (status = 403, description = "Role not permitted or separation of duties violated"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Terminal stage or concurrent modification"),
        (status = 422, description = "Illegal transition or failed precondition"),
        (status = 500, description = "Internal server error")
    ),
    tag = "workflow"
)]
pub async fn request_application_transition(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(body): Json<TransitionRequestBody>,
) -> Result<Json<TransitionOutcome>, ApiError> {
    request_transition(state, id, actor, body).await
}

/// GET /v1/applications/{id}/audit - Review & history trail
#[utoipa::path(
    get,
    path = "/v1/applications/{id}/audit",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Audit trail, oldest entry first", body = ListResponse<AuditEntry>),
        (status = 404, description = "Application not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "workflow"
)]
pub async fn application_audit_trail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListResponse<AuditEntry>>, ApiError> {
    audit_trail(state, id).await
}

/// POST /v1/renewals/{id}/transitions - Request a workflow transition
#[utoipa::path(
    post,
    path = "/v1/renewals/{id}/transitions",
    params(
        ("id" = Uuid, Path, description = "Renewal ID")
    ),
    request_body = TransitionRequestBody,
    responses(
        (status = 200, description = "Transition applied", body = TransitionOutcome),
        (status = 403, description = "Role not permitted or separation of duties violated"),
        (status = 404, description = "Renewal not found"),
        (status = 409, description = "Terminal stage or concurrent modification"),
        (status = 422, description = "Illegal transition or failed precondition"),
        (status = 500, description = "Internal server error")
    ),
    tag = "workflow"
)]
pub async fn request_renewal_transition(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    Json(body): Json<TransitionRequestBody>,
) -> Result<Json<TransitionOutcome>, ApiError> {
    request_transition(state, id, actor, body).await
}

/// GET /v1/renewals/{id}/audit - Review & history trail
#[utoipa::path(
    get,
    path = "/v1/renewals/{id}/audit",
    params(
        ("id" = Uuid, Path, description = "Renewal ID")
    ),
    responses(
        (status = 200, description = "Audit trail, oldest entry first", body = ListResponse<AuditEntry>),
        (status = 404, description = "Renewal not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "workflow"
)]
pub async fn renewal_audit_trail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListResponse<AuditEntry>>, ApiError> {
    audit_trail(state, id).await
}
