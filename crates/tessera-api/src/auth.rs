// Actor identity extraction
// Decision: identity and role come from the platform auth layer as trusted
// headers on the internal network; this service never mints or validates
// credentials itself
// Decision: role strings are opaque here and parsed into the closed
// workflow role set; unknown roles are rejected, never defaulted

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use tessera_core::ActorRole;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// The authenticated user behind a request
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

/// Why actor extraction failed
#[derive(Debug)]
pub enum AuthRejection {
    /// Identity headers missing or malformed
    Unauthenticated(String),
    /// Role string is not one the workflow recognizes
    UnknownRole(String),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            AuthRejection::Unauthenticated(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthenticated", msg)
            }
            AuthRejection::UnknownRole(role) => (
                StatusCode::FORBIDDEN,
                "forbidden",
                format!("unknown role '{role}'"),
            ),
        };
        let body = json!({"error": {"kind": kind, "message": message}});
        (status, Json(body)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(ACTOR_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AuthRejection::Unauthenticated(format!("missing {ACTOR_ID_HEADER} header"))
            })?;
        let id: Uuid = id.parse().map_err(|_| {
            AuthRejection::Unauthenticated(format!("{ACTOR_ID_HEADER} is not a valid UUID"))
        })?;

        let role = parts
            .headers
            .get(ACTOR_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AuthRejection::Unauthenticated(format!("missing {ACTOR_ROLE_HEADER} header"))
            })?;
        let role = ActorRole::parse(role)
            .ok_or_else(|| AuthRejection::UnknownRole(role.to_string()))?;

        Ok(Actor { id, role })
    }
}
