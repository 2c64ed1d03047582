//! HTTP API of the identity registry.

use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use fides_crypto::{constant_time_eq, hex_decode, PUBLIC_KEY_LENGTH};
use fides_discovery::{DiscoveryDocument, IdentityRecord, RegisterIdentityRequest};
use fides_identity::Did;

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

#[derive(Deserialize)]
pub struct ListQuery {
    pub domain: Option<String>,
}

/// Uniform error → `{"error": "<message>"}` with a status code.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Internal fault: log the cause under a correlation id, return a
    /// generic body.
    fn internal(err: impl std::fmt::Display) -> Self {
        let correlation_id = Uuid::new_v4();
        tracing::error!(%correlation_id, error = %err, "internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

async fn handle_register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterIdentityRequest>,
) -> Result<(StatusCode, Json<IdentityRecord>), ApiError> {
    // Syntactic checks: prefix, base58 suffix, hex key of the right size.
    let did_key = Did::public_key_of(&req.did)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    if req.public_key.len() != PUBLIC_KEY_LENGTH * 2 {
        return Err(ApiError::bad_request(format!(
            "publicKey must be {} hex characters",
            PUBLIC_KEY_LENGTH * 2
        )));
    }
    let submitted_key = hex_decode(&req.public_key)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    // Hijack defense: the submitted key must be the key the identifier
    // certifies.
    if !constant_time_eq(did_key.as_bytes(), &submitted_key) {
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "identifier does not match public key",
        ));
    }

    let metadata = req.metadata.unwrap_or_else(|| serde_json::json!({}));
    let inserted = state
        .store
        .insert(&req.did, &req.public_key, &metadata, req.domain.as_deref())
        .await
        .map_err(ApiError::internal)?;

    match inserted {
        Some(record) => {
            tracing::info!(did = %record.did, domain = ?record.domain, "identity registered");
            Ok((StatusCode::CREATED, Json(record)))
        }
        None => Err(ApiError::new(
            StatusCode::CONFLICT,
            "identity already registered",
        )),
    }
}

async fn handle_get_identity(
    State(state): State<Arc<AppState>>,
    Path(did): Path<String>,
) -> Result<Json<IdentityRecord>, ApiError> {
    let record = state
        .store
        .get(&did)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "identity not found"))?;
    Ok(Json(record))
}

async fn handle_list_identities(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<IdentityRecord>>, ApiError> {
    let domain = query
        .domain
        .ok_or_else(|| ApiError::bad_request("domain query parameter is required"))?;
    let records = state
        .store
        .list_by_domain(&domain)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(records))
}

async fn handle_well_known(State(state): State<Arc<AppState>>) -> Json<DiscoveryDocument> {
    Json(state.document.clone())
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Response {
    let database = state.store.ping().await;
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
        .route("/identities", post(handle_register).get(handle_list_identities))
        .route("/identities/{did}", get(handle_get_identity))
        .route("/.well-known/fides.json", get(handle_well_known))
        .route("/health", get(handle_health))
        .layer(from_fn_with_state(Arc::clone(&state), shutdown_guard))
        .with_state(state)
}
