use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::get,
};

use crate::{
    errors::ApiError, models::analytics::SummaryQuery, routes::extractors::ApiQuery,
    services::auth::Claims, startup::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/analytics/summary", get(summary))
}

pub async fn summary(
    State(state): State<AppState>,
    claims: Claims,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .analytics_service
        .summary(claims.scope()?, query.window_days())
        .await?;
    Ok(Json(summary))
}
