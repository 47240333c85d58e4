use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};

use crate::{
    errors::ApiError, models::category::CategoryPayload, routes::extractors::{ApiJson, ValidUuid},
    services::auth::Claims, startup::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
}

pub async fn create_category(
    State(state): State<AppState>,
    claims: Claims,
    ApiJson(payload): ApiJson<CategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .category_service
        .create(claims.user_id()?, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_categories(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.category_service.list(claims.scope()?).await?))
}

pub async fn get_category(
    State(state): State<AppState>,
    claims: Claims,
    ValidUuid(id): ValidUuid,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.category_service.get(claims.scope()?, id).await?))
}

pub async fn update_category(
    State(state): State<AppState>,
    claims: Claims,
    ValidUuid(id): ValidUuid,
    ApiJson(payload): ApiJson<CategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state
            .category_service
            .update(claims.scope()?, id, &payload)
            .await?,
    ))
}

pub async fn delete_category(
    State(state): State<AppState>,
    claims: Claims,
    ValidUuid(id): ValidUuid,
) -> Result<impl IntoResponse, ApiError> {
    state.category_service.delete(claims.scope()?, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
