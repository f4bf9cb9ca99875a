// Membership application/renewal CRUD HTTP routes
//
// Applications and renewals are structurally identical for workflow purposes;
// the handlers share one implementation parameterized by entity kind.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use tessera_core::{EntityKind, MembershipEntity, Stage};
use tessera_storage::Database;

use crate::common::ListResponse;
use crate::services::MembershipService;

/// Request to create a draft application or renewal
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateMembershipRequest {
    /// Full name of the applicant.
    #[schema(example = "Ada Lovelace")]
    pub applicant_name: String,
    /// Contact address (phone or email) for notifications.
    #[schema(example = "ada@example.org")]
    pub applicant_contact: String,
    /// Membership fee in minor currency units, if already paid.
    #[serde(default)]
    #[schema(example = 25000)]
    pub payment_amount: Option<i64>,
    /// Reference of the payment transaction.
    #[serde(default)]
    #[schema(example = "PAY-2024-0042")]
    pub payment_reference: Option<String>,
}

/// Query parameters for listing memberships
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListMembershipsParams {
    /// Filter by workflow stage.
    pub stage: Option<Stage>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

/// App state for membership routes
#[derive(Clone)]
pub struct AppState {
    pub memberships: Arc<MembershipService>,
}

impl AppState {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            memberships: Arc::new(MembershipService::new(db)),
        }
    }
}

/// Create membership routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/applications",
            post(create_application).get(list_applications),
        )
        .route("/v1/applications/:id", get(get_application))
        .route("/v1/renewals", post(create_renewal).get(list_renewals))
        .route("/v1/renewals/:id", get(get_renewal))
        .with_state(state)
}

async fn create(
    state: AppState,
    kind: EntityKind,
    req: CreateMembershipRequest,
) -> Result<(StatusCode, Json<MembershipEntity>), StatusCode> {
    let entity = state.memberships.create(kind, req).await.map_err(|e| {
        tracing::error!("Failed to create {kind}: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok((StatusCode::CREATED, Json(entity)))
}

async fn list(
    state: AppState,
    kind: EntityKind,
    params: ListMembershipsParams,
) -> Result<Json<ListResponse<MembershipEntity>>, StatusCode> {
    let entities = state
        .memberships
        .list(kind, params.stage, params.limit, params.offset)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list {kind}s: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(ListResponse::new(entities)))
}

async fn get_one(
    state: AppState,
    kind: EntityKind,
    id: Uuid,
) -> Result<Json<MembershipEntity>, StatusCode> {
    let entity = state
        .memberships
        .get(kind, id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get {kind}: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(entity))
}

/// POST /v1/applications - Create a draft application
#[utoipa::path(
    post,
    path = "/v1/applications",
    request_body = CreateMembershipRequest,
    responses(
        (status = 201, description = "Application created", body = MembershipEntity),
        (status = 500, description = "Internal server error")
    ),
    tag = "applications"
)]
pub async fn create_application(
    State(state): State<AppState>,
    Json(req): Json<CreateMembershipRequest>,
) -> Result<(StatusCode, Json<MembershipEntity>), StatusCode> {
    create(state, EntityKind::Application, req).await
}

/// GET /v1/applications - List applications
#[utoipa::path(
    get,
    path = "/v1/applications",
    params(
        ("stage" = Option<Stage>, Query, description = "Filter by workflow stage"),
        ("limit" = Option<i64>, Query, description = "Max number of results (default 20)"),
        ("offset" = Option<i64>, Query, description = "Offset for pagination")
    ),
    responses(
        (status = 200, description = "List of applications", body = ListResponse<MembershipEntity>),
        (status = 500, description = "Internal server error")
    ),
    tag = "applications"
)]
pub async fn list_applications(
    State(state): State<AppState>,
    Query(params): Query<ListMembershipsParams>,
) -> Result<Json<ListResponse<MembershipEntity>>, StatusCode> {
    list(state, EntityKind::Application, params).await
}

/// GET /v1/applications/{id} - Get application
#[utoipa::path(
    get,
    path = "/v1/applications/{id}",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Application found", body = MembershipEntity),
        (status = 404, description = "Application not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "applications"
)]
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MembershipEntity>, StatusCode> {
    get_one(state, EntityKind::Application, id).await
}

/// POST /v1/renewals - Create a draft renewal
#[utoipa::path(
    post,
    path = "/v1/renewals",
    request_body = CreateMembershipRequest,
    responses(
        (status = 201, description = "Renewal created", body = MembershipEntity),
        (status = 500, description = "Internal server error")
    ),
    tag = "renewals"
)]
pub async fn create_renewal(
    State(state): State<AppState>,
    Json(req): Json<CreateMembershipRequest>,
) -> Result<(StatusCode, Json<MembershipEntity>), StatusCode> {
    create(state, EntityKind::Renewal, req).await
}

/// GET /v1/renewals - List renewals
#[utoipa::path(
    get,
    path = "/v1/renewals",
    params(
        ("stage" = Option<Stage>, Query, description = "Filter by workflow stage"),
        ("limit" = Option<i64>, Query, description = "Max number of results (default 20)"),
        ("offset" = Option<i64>, Query, description = "Offset for pagination")
    ),
    responses(
        (status = 200, description = "List of renewals", body = ListResponse<MembershipEntity>),
        (status = 500, description = "Internal server error")
    ),
    tag = "renewals"
)]
pub async fn list_renewals(
    State(state): State<AppState>,
    Query(params): Query<ListMembershipsParams>,
) -> Result<Json<ListResponse<MembershipEntity>>, StatusCode> {
    list(state, EntityKind::Renewal, params).await
}

/// GET /v1/renewals/{id} - Get renewal
#[utoipa::path(
    get,
    path = "/v1/renewals/{id}",
    params(
        ("id" = Uuid, Path, description = "Renewal ID")
    ),
    responses(
        (status = 200, description = "Renewal found", body = MembershipEntity),
        (status = 404, description = "Renewal not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "renewals"
)]
pub async fn get_renewal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MembershipEntity>, StatusCode> {
    get_one(state, EntityKind::Renewal, id).await
}
