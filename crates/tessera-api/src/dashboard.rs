// Dashboard aggregation HTTP routes
//
// Read-only consumer of workflow state; never writes and never participates
// in the per-entity optimistic guard, so a slightly stale view is fine.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use tessera_storage::Database;

/// Entity count for one (kind, stage) bucket
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StageCount {
    #[schema(example = "application")]
    pub kind: String,
    #[schema(example = "financial_review")]
    pub stage: String,
    pub count: i64,
}

/// Aggregated workflow metrics
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    /// Total number of entities across all stages.
    pub total: i64,
    /// Entities currently in a terminal stage.
    pub terminal: i64,
    /// Per (kind, stage) counts.
    pub counts: Vec<StageCount>,
}

/// App state for dashboard routes
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

impl AppState {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

/// Create dashboard routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/dashboard/stats", get(get_stats))
        .with_state(state)
}

/// GET /v1/dashboard/stats - Workflow metrics
#[utoipa::path(
    get,
    path = "/v1/dashboard/stats",
    responses(
        (status = 200, description = "Aggregated workflow metrics", body = DashboardStats),
        (status = 500, description = "Internal server error")
    ),
    tag = "dashboard"
)]
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, StatusCode> {
    let rows = state.db.stage_counts().await.map_err(|e| {
        tracing::error!("Failed to aggregate stage counts: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let total = rows.iter().map(|r| r.count).sum();
    let terminal = rows
        .iter()
        .filter(|r| r.stage == "approved" || r.stage == "rejected")
        .map(|r| r.count)
        .sum();
    let counts = rows
        .into_iter()
        .map(|r| StageCount {
            kind: r.kind,
            stage: r.stage,
            count: r.count,
        })
        .collect();

    Ok(Json(DashboardStats {
        total,
        terminal,
        counts,
    }))
}
