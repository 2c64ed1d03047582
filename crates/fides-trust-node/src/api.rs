//! HTTP API of the trust graph service.

use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use fides_discovery::IdentityRecord;
use fides_trust::{CreateTrustRequest, CreateTrustResponse, PathResult, TrustScoreResponse};

use crate::error::TrustError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: bool,
}

impl TrustError {
    /// Status-code mapping for the endpoint table.
    fn status(&self) -> StatusCode {
        match self {
            TrustError::Validation(_)
            | TrustError::SignatureInvalid(_)
            | TrustError::IdentityNotFound(_) => StatusCode::BAD_REQUEST,
            TrustError::CircuitOpen => StatusCode::SERVICE_UNAVAILABLE,
            TrustError::Database(_) | TrustError::Discovery(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for TrustError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Internal faults get a correlation id in the log and a generic
            // body; details never reach the client.
            let correlation_id = Uuid::new_v4();
            tracing::error!(%correlation_id, error = %self, "internal error");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

async fn handle_create_trust(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateTrustRequest>,
) -> Result<(StatusCode, Json<CreateTrustResponse>), TrustError> {
    let created = state.engine.create_trust(&request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn handle_score(
    State(state): State<Arc<AppState>>,
    Path(did): Path<String>,
) -> Result<Json<TrustScoreResponse>, TrustError> {
    Ok(Json(state.engine.get_score(&did).await?))
}

async fn handle_path(
    State(state): State<Arc<AppState>>,
    Path((from, to)): Path<(String, String)>,
) -> Result<Json<PathResult>, TrustError> {
    // Always 200; `found` carries the outcome.
    Ok(Json(state.engine.path(&from, &to).await?))
}

async fn handle_identity(
    State(state): State<Arc<AppState>>,
    Path(did): Path<String>,
) -> Result<Json<IdentityRecord>, Response> {
    match state.engine.identity(&did).await {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "identity not found".into(),
            }),
        )
            .into_response()),
        Err(e) => Err(e.into_response()),
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Response {
    let database = state.engine.ping().await;
    let status = if database { "ok" } else { "degraded" };
    let code = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            database,
        }),
    )
        .into_response()
}

/// Reject new requests while the service drains.
async fn shutdown_guard(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.is_shutting_down() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "shutting down".into(),
            }),
        )
            .into_response();
    }
    next.run(request).await
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/trust", post(handle_create_trust))
        .route("/v1/trust/{did}/score", get(handle_score))
        .route("/v1/trust/{from}/{to}", get(handle_path))
        .route("/v1/identities/{did}", get(handle_identity))
        .route("/health", get(handle_health))
        .layer(from_fn_with_state(Arc::clone(&state), shutdown_guard))
        .with_state(state)
}
