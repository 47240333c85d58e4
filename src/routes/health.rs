use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

use crate::startup::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
