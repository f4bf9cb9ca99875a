// Tessera API server
// Decision: the workflow service is the only write path for stage fields;
// routes wire it up with Postgres-backed stores
// Decision: terminal notifications drain through a channel consumer so
// delivery can never block or fail a transition

mod auth;
mod common;
mod dashboard;
mod error;
mod memberships;
mod services;
mod workflow;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tessera_core::{
    AuditEntry, ChannelDispatcher, EntityKind, MembershipEntity, ReviewStatus, Stage, SystemClock,
    TerminalNotification, TransitionOutcome, WorkflowService,
};
use tessera_storage::{Database, PgAuditStore, PgEntityStore};

use common::ListResponse;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        memberships::create_application,
        memberships::list_applications,
        memberships::get_application,
        memberships::create_renewal,
        memberships::list_renewals,
        memberships::get_renewal,
        workflow::request_application_transition,
        workflow::application_audit_trail,
        workflow::request_renewal_transition,
        workflow::renewal_audit_trail,
        dashboard::get_stats,
    ),
    components(
        schemas(
            MembershipEntity, Stage, EntityKind, ReviewStatus,
            TransitionOutcome, AuditEntry,
            memberships::CreateMembershipRequest,
            workflow::TransitionRequestBody,
            dashboard::DashboardStats, dashboard::StageCount,
            ListResponse<MembershipEntity>,
            ListResponse<AuditEntry>,
        )
    ),
    tags(
        (name = "applications", description = "Membership application endpoints"),
        (name = "renewals", description = "Membership renewal endpoints"),
        (name = "workflow", description = "Two-tier approval workflow endpoints"),
        (name = "dashboard", description = "Read-only aggregation endpoints")
    ),
    info(
        title = "Tessera API",
        version = "0.3.0",
        description = "API for membership applications, renewals and the two-tier approval workflow",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

/// Drain terminal notifications; this is where SMS/email delivery plugs in.
/// Runs outside the request path on purpose.
async fn run_notification_consumer(mut rx: mpsc::Receiver<TerminalNotification>) {
    while let Some(notification) = rx.recv().await {
        tracing::info!(
            entity_id = %notification.entity_id,
            outcome = %notification.outcome,
            "membership decision ready for applicant notification"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tessera_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("tessera-api starting...");

    // Initialize database
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable required")?;
    let db = Database::from_url(&database_url)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to run migrations")?;
    tracing::info!("Connected to database");

    let db = Arc::new(db);

    // Terminal notification channel with a logging consumer
    let (dispatcher, rx) = ChannelDispatcher::new(256);
    tokio::spawn(run_notification_consumer(rx));

    // Workflow service over Postgres-backed stores
    let mut workflow_service = WorkflowService::new(
        Arc::new(PgEntityStore::new((*db).clone())),
        Arc::new(PgAuditStore::new((*db).clone())),
        Arc::new(dispatcher),
        Arc::new(SystemClock),
    );
    if let Ok(ms) = std::env::var("STORE_TIMEOUT_MS") {
        let ms: u64 = ms.parse().context("STORE_TIMEOUT_MS must be an integer")?;
        workflow_service = workflow_service.with_store_timeout(Duration::from_millis(ms));
    }
    let workflow_service = Arc::new(workflow_service);

    // Create module-specific states
    let memberships_state = memberships::AppState::new(db.clone());
    let workflow_state = workflow::AppState::new(workflow_service);
    let dashboard_state = dashboard::AppState::new(db.clone());

    // Load API prefix from environment (default: empty)
    // Example: API_PREFIX="/api" results in routes like /api/v1/applications
    let api_prefix = std::env::var("API_PREFIX").unwrap_or_default();
    if !api_prefix.is_empty() {
        tracing::info!(prefix = %api_prefix, "API prefix configured");
    }

    // Load CORS allowed origins from environment (optional)
    // Only needed when the admin UI is served from a different origin
    let cors_origins: Vec<HeaderValue> = std::env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .filter(|s| !s.is_empty())
        .map(|s| s.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();

    if cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
    } else {
        tracing::info!(origins = ?cors_origins, "CORS origins configured");
    }

    // Build API routes
    let api_routes = Router::new()
        .merge(memberships::routes(memberships_state))
        .merge(workflow::routes(workflow_state))
        .merge(dashboard::routes(dashboard_state));

    // Build main router with health (not prefixed) and prefixed API routes
    let mut app = Router::new().route("/health", get(health));
    app = app.merge(build_router_with_prefix(api_routes, &api_prefix));

    // Add Swagger UI
    let app =
        app.merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    // Add CORS layer only if origins are configured
    let app = if !cors_origins.is_empty() {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    header::ACCEPT,
                    header::ORIGIN,
                    header::HeaderName::from_static(auth::ACTOR_ID_HEADER),
                    header::HeaderName::from_static(auth::ACTOR_ROLE_HEADER),
                ])
                .allow_credentials(true),
        )
    } else {
        app
    };

    // Add tracing
    let app = app.layer(TraceLayer::new_for_http());

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:9000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Build router with optional API prefix (extracted for testing)
fn build_router_with_prefix<S: Clone + Send + Sync + 'static>(
    api_routes: Router<S>,
    api_prefix: &str,
) -> Router<S> {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}
