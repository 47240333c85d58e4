use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tracing::instrument;

use crate::{
    errors::ApiError,
    models::{
        analytics::SummaryQuery,
        short_url::{NewShortUrl, UpdateShortUrl},
    },
    routes::extractors::{ApiJson, ApiQuery, ValidUuid},
    services::auth::Claims,
    startup::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/short-urls", get(list_short_urls).post(shorten))
        .route(
            "/api/short-urls/{id}",
            get(get_short_url)
                .put(update_short_url)
                .delete(delete_short_url),
        )
        .route("/api/short-urls/{id}/analytics", get(short_url_analytics))
}

#[instrument(
    name = "HTTP: Shorten request",
    skip(state, claims, payload),
    fields(user_id = %claims.sub)
)]
pub async fn shorten(
    State(state): State<AppState>,
    claims: Claims,
    ApiJson(payload): ApiJson<NewShortUrl>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state
        .url_service
        .shorten(claims.user_id()?, claims.scope()?, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_short_urls(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.url_service.list(claims.scope()?).await?))
}

pub async fn get_short_url(
    State(state): State<AppState>,
    claims: Claims,
    ValidUuid(id): ValidUuid,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.url_service.get(claims.scope()?, id).await?))
}

#[instrument(name = "HTTP: Update short url", skip(state, claims, payload))]
pub async fn update_short_url(
    State(state): State<AppState>,
    claims: Claims,
    ValidUuid(id): ValidUuid,
    ApiJson(payload): ApiJson<UpdateShortUrl>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state.url_service.update(claims.scope()?, id, &payload).await?,
    ))
}

#[instrument(name = "HTTP: Delete short url", skip(state, claims))]
pub async fn delete_short_url(
    State(state): State<AppState>,
    claims: Claims,
    ValidUuid(id): ValidUuid,
) -> Result<impl IntoResponse, ApiError> {
    state.url_service.delete(claims.scope()?, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn short_url_analytics(
    State(state): State<AppState>,
    claims: Claims,
    ValidUuid(id): ValidUuid,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state
            .url_service
            .analytics(claims.scope()?, id, query.window_days())
            .await?,
    ))
}
