use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde_json::{Map, Value};

use crate::{
    errors::ApiError,
    routes::{auth::AdminClaims, extractors::ApiJson},
    services::auth::Claims,
    startup::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/settings", get(get_settings).put(update_settings))
}

pub async fn get_settings(
    State(state): State<AppState>,
    _claims: Claims,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.settings_service.all().await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    _admin: AdminClaims,
    ApiJson(changes): ApiJson<Map<String, Value>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.settings_service.update(changes).await?))
}
