// Workflow error -> HTTP translation
//
// Every WorkflowError kind maps to a distinct status so clients can react
// (retry on concurrent_modification, surface validation messages, etc.).
// The workflow core never panics across this boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use tessera_core::WorkflowError;

/// Wrapper that turns a [`WorkflowError`] into an HTTP response
#[derive(Debug)]
pub struct ApiError(pub WorkflowError);

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            WorkflowError::InvalidTransition { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_transition")
            }
            WorkflowError::TerminalState { .. } => (StatusCode::CONFLICT, "terminal_state"),
            WorkflowError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            WorkflowError::SeparationOfDuties(_) => {
                (StatusCode::FORBIDDEN, "separation_of_duties")
            }
            WorkflowError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed"),
            WorkflowError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            WorkflowError::ConcurrentModification(_) => {
                (StatusCode::CONFLICT, "concurrent_modification")
            }
            WorkflowError::StoreTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, "store_timeout"),
            WorkflowError::AuditWriteFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "audit_write_failed")
            }
            WorkflowError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
        };

        if status.is_server_error() {
            tracing::error!("workflow request failed: {}", self.0);
        }

        let message = match &self.0 {
            // Infrastructure details stay in the logs
            WorkflowError::Store(_) => "internal storage error".to_string(),
            other => other.to_string(),
        };

        let body = json!({
            "error": {
                "kind": kind,
                "message": message,
                "retryable": self.0.is_retryable(),
            }
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tessera_core::Stage;
    use uuid::Uuid;

    fn status_of(err: WorkflowError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(WorkflowError::InvalidTransition {
                from: Stage::Draft,
                to: Stage::Approved
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(WorkflowError::TerminalState {
                entity_id: Uuid::now_v7(),
                stage: Stage::Rejected
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(WorkflowError::forbidden("nope")),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(WorkflowError::separation_of_duties("dual role")),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(WorkflowError::NotFound(Uuid::now_v7())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(WorkflowError::ConcurrentModification(Uuid::now_v7())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(WorkflowError::StoreTimeout(Duration::from_secs(5))),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(WorkflowError::audit("append failed")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
