use crate::{
    errors::AuthError,
    models::{
        analytics::{DEFAULT_WINDOW_DAYS, Totals},
        qr_code::{QrCodeFilter, QrCodeModel},
        short_url::ShortUrlModel,
    },
    services::auth::Claims,
    startup::AppState,
};
use askama::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    user: String,
    qr_codes: Vec<QrCodeModel>,
    short_urls: Vec<ShortUrlModel>,
    totals: Totals,
    window_days: i64,
}

pub async fn dashboard_handler(
    State(state): State<AppState>,
    claims: Result<Claims, AuthError>,
) -> Response {
    let claims = match claims {
        Ok(claims) => claims,
        Err(_) => return Redirect::to("/login").into_response(),
    };
    let scope = match claims.scope() {
        Ok(scope) => scope,
        Err(e) => return e.into_response(),
    };

    // 1. Fetch the caller's data; a failing section renders empty
    let qr_codes = state
        .qr_service
        .list(scope, &QrCodeFilter::default())
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Dashboard QR codes unavailable: {:?}", e);
            Vec::new()
        });
    let short_urls = state.url_service.list(scope).await.unwrap_or_else(|e| {
        tracing::warn!("Dashboard short URLs unavailable: {:?}", e);
        Vec::new()
    });
    let totals = state
        .analytics_service
        .summary(scope, DEFAULT_WINDOW_DAYS)
        .await
        .map(|summary| summary.totals)
        .unwrap_or_else(|e| {
            tracing::warn!("Dashboard summary unavailable: {:?}", e);
            Totals::default()
        });
    let user = match claims.user_id() {
        Ok(id) => match state.admin_service.me(id).await {
            Ok(user) => user.name.unwrap_or(user.email),
            Err(_) => claims.sub.clone(),
        },
        Err(e) => return e.into_response(),
    };

    // 2. Render Template
    let template = DashboardTemplate {
        user,
        qr_codes,
        short_urls,
        totals,
        window_days: DEFAULT_WINDOW_DAYS,
    };
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Dashboard rendering failed: {:?}", e);
            AuthError::Internal.into_response()
        }
    }
}
