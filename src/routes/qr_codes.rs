use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use tracing::instrument;

use crate::{
    errors::ApiError,
    models::{
        analytics::SummaryQuery,
        qr_code::{NewQrCode, QrCodeFilter, UpdateQrCode},
    },
    routes::extractors::{ApiJson, ApiQuery, ValidUuid},
    services::auth::Claims,
    startup::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/qr-codes", get(list_qr_codes).post(create_qr_code))
        .route(
            "/api/qr-codes/{id}",
            get(get_qr_code).put(update_qr_code).delete(delete_qr_code),
        )
        .route("/api/qr-codes/{id}/image.svg", get(qr_code_image))
        .route("/api/qr-codes/{id}/analytics", get(qr_code_analytics))
}

#[instrument(name = "HTTP: Create QR code", skip(state, claims, payload), fields(user_id = %claims.sub))]
pub async fn create_qr_code(
    State(state): State<AppState>,
    claims: Claims,
    ApiJson(payload): ApiJson<NewQrCode>,
) -> Result<impl IntoResponse, ApiError> {
    let qr = state
        .qr_service
        .create(claims.user_id()?, claims.scope()?, payload)
        .await?;
    tracing::info!(qr_code_id = %qr.id, "QR code created");
    Ok((StatusCode::CREATED, Json(qr)))
}

pub async fn list_qr_codes(
    State(state): State<AppState>,
    claims: Claims,
    ApiQuery(filter): ApiQuery<QrCodeFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.qr_service.list(claims.scope()?, &filter).await?;
    Ok(Json(rows))
}

pub async fn get_qr_code(
    State(state): State<AppState>,
    claims: Claims,
    ValidUuid(id): ValidUuid,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.qr_service.get(claims.scope()?, id).await?))
}

#[instrument(name = "HTTP: Update QR code", skip(state, claims, payload))]
pub async fn update_qr_code(
    State(state): State<AppState>,
    claims: Claims,
    ValidUuid(id): ValidUuid,
    ApiJson(payload): ApiJson<UpdateQrCode>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state.qr_service.update(claims.scope()?, id, &payload).await?,
    ))
}

#[instrument(name = "HTTP: Delete QR code", skip(state, claims))]
pub async fn delete_qr_code(
    State(state): State<AppState>,
    claims: Claims,
    ValidUuid(id): ValidUuid,
) -> Result<impl IntoResponse, ApiError> {
    state.qr_service.delete(claims.scope()?, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn qr_code_image(
    State(state): State<AppState>,
    claims: Claims,
    ValidUuid(id): ValidUuid,
) -> Result<impl IntoResponse, ApiError> {
    let svg = state.qr_service.image(claims.scope()?, id).await?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

pub async fn qr_code_analytics(
    State(state): State<AppState>,
    claims: Claims,
    ValidUuid(id): ValidUuid,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let analytics = state
        .qr_service
        .analytics(claims.scope()?, id, query.window_days())
        .await?;
    Ok(Json(analytics))
}
