use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};

use crate::{
    errors::ApiError, models::group::GroupPayload, routes::auth::AdminClaims,
    routes::extractors::{ApiJson, ValidUuid}, startup::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/groups", get(list_groups).post(create_group))
        .route(
            "/api/groups/{id}",
            get(get_group).put(update_group).delete(delete_group),
        )
        .route("/api/groups/{id}/users", get(group_members))
}

pub async fn create_group(
    State(state): State<AppState>,
    _admin: AdminClaims,
    ApiJson(payload): ApiJson<GroupPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let group = state.admin_service.create_group(&payload).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn list_groups(
    State(state): State<AppState>,
    _admin: AdminClaims,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.admin_service.list_groups().await?))
}

pub async fn get_group(
    State(state): State<AppState>,
    _admin: AdminClaims,
    ValidUuid(id): ValidUuid,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.admin_service.get_group(id).await?))
}

pub async fn update_group(
    State(state): State<AppState>,
    _admin: AdminClaims,
    ValidUuid(id): ValidUuid,
    ApiJson(payload): ApiJson<GroupPayload>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.admin_service.update_group(id, &payload).await?))
}

pub async fn delete_group(
    State(state): State<AppState>,
    _admin: AdminClaims,
    ValidUuid(id): ValidUuid,
) -> Result<impl IntoResponse, ApiError> {
    state.admin_service.delete_group(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn group_members(
    State(state): State<AppState>,
    _admin: AdminClaims,
    ValidUuid(id): ValidUuid,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.admin_service.group_members(id).await?))
}
