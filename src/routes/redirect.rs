//! Public, unauthenticated redirect endpoints.

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::{info, instrument, warn};

use uuid::Uuid;

use crate::{analytics::RequestInfo, errors::ApiError, startup::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/qr/{id}", get(qr_by_id))
        .route("/qr-redirect/{key}", get(qr_by_key))
        .route("/s/{code}", get(short_url))
}

/// `302 Found` to `target`.
pub fn found(target: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, target.to_string())]).into_response()
}

fn respond(key: &str, result: Result<String, ApiError>) -> Response {
    match result {
        Ok(target) => {
            info!(key, "Redirecting to {}", target);
            found(&target)
        }
        Err(e) => {
            warn!(key, "Redirect refused: {}", e);
            e.into_response()
        }
    }
}

#[instrument(name = "HTTP: QR redirect by id", skip(state, request))]
pub async fn qr_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: RequestInfo,
) -> Response {
    // Malformed ids on the public path are simply unknown codes.
    let result = match Uuid::parse_str(&id) {
        Ok(uuid) => state.qr_service.resolve_by_id(uuid, request).await,
        Err(_) => Err(ApiError::not_found("QR code")),
    };
    respond(&id, result)
}

#[instrument(name = "HTTP: QR redirect by key", skip(state, request))]
pub async fn qr_by_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
    request: RequestInfo,
) -> Response {
    let result = state.qr_service.resolve_by_key(&key, request).await;
    respond(&key, result)
}

#[instrument(name = "HTTP: Redirect request", skip(state, request))]
pub async fn short_url(
    State(state): State<AppState>,
    Path(code): Path<String>,
    request: RequestInfo,
) -> Response {
    let result = state.url_service.resolve(&code, request).await;
    respond(&code, result)
}
