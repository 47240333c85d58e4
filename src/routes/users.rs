use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use tracing::instrument;

use crate::{
    errors::ApiError,
    models::user::UpdateUser,
    routes::{auth::AdminClaims, extractors::{ApiJson, ValidUuid}},
    services::auth::Claims,
    startup::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(me))
        .route("/api/users", get(list_users))
        .route(
            "/api/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}

pub async fn me(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.admin_service.me(claims.user_id()?).await?))
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminClaims,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.admin_service.list_users().await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminClaims,
    ValidUuid(id): ValidUuid,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.admin_service.get_user(id).await?))
}

#[instrument(name = "HTTP: Update user", skip(state, admin, payload), fields(admin = %admin.0))]
pub async fn update_user(
    State(state): State<AppState>,
    admin: AdminClaims,
    ValidUuid(id): ValidUuid,
    ApiJson(payload): ApiJson<UpdateUser>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.admin_service.update_user(id, &payload).await?))
}

#[instrument(name = "HTTP: Delete user", skip(state, admin), fields(admin = %admin.0))]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminClaims,
    ValidUuid(id): ValidUuid,
) -> Result<impl IntoResponse, ApiError> {
    state
        .admin_service
        .delete_user(admin.0.user_id()?, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
