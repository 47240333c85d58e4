use axum_extra::extract::CookieJar;

use askama::Template;
use axum::Form;
use axum::Json;
use axum::RequestPartsExt;
use axum::extract::{FromRef, FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Redirect;
use axum_extra::extract::TypedHeader;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::headers::{Authorization, authorization::Bearer};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use crate::errors::AuthError;
use crate::routes::extractors::ApiJson;
use crate::services::auth::{AuthService, Claims};
use crate::startup::AppState;

pub const SESSION_COOKIE: &str = "jwt";

#[derive(Template)]
#[template(path = "signup.html")]
struct SignupTemplate {
    email: String,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    email: String,
}

fn render(template: impl Template) -> Result<Html<String>, AuthError> {
    template.render().map(Html).map_err(|e| {
        tracing::error!("Template rendering failed: {:?}", e);
        AuthError::Internal
    })
}

pub async fn signup_page() -> Result<Html<String>, AuthError> {
    render(SignupTemplate { email: "".into() })
}

pub async fn login_page() -> Result<Html<String>, AuthError> {
    render(LoginTemplate { email: "".into() })
}

#[derive(Debug, Serialize)]
pub struct AuthBody {
    access_token: String,
    token_type: String,
}

impl AuthBody {
    fn new(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthPayload {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    email: String,
    password: String,
    name: Option<String>,
}

#[instrument(name = "Web: Login POST", skip(state, jar, payload))]
pub async fn login_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(payload): Form<AuthPayload>,
) -> Result<impl IntoResponse, AuthError> {
    tracing::info!("Request to login user received!");
    // 1. Verify credentials via service
    let user = state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;

    // 2. Create JWT
    let token = state.auth_service.issue_token(&user)?;

    // 3. Set HttpOnly Cookie and Redirect to Dashboard
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    Ok((jar.add(cookie), Redirect::to("/dashboard")))
}

#[instrument(name = "Web: Signup POST", skip(state, payload))]
pub async fn signup_post(
    State(state): State<AppState>,
    Form(payload): Form<RegisterPayload>,
) -> Result<impl IntoResponse, AuthError> {
    state
        .auth_service
        .register(&payload.email, &payload.password, payload.name.as_deref())
        .await?;

    Ok(Redirect::to("/login"))
}

#[instrument(name = "Web: Logout GET", skip(jar))]
pub async fn logout_handler(jar: CookieJar) -> impl IntoResponse {
    let updated_jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (updated_jar, Redirect::to("/login"))
}

#[instrument(name = "HTTP: Register", skip(state, payload), fields(user_email = %payload.email))]
pub async fn register_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterPayload>,
) -> Result<impl IntoResponse, AuthError> {
    let id = state
        .auth_service
        .register(&payload.email, &payload.password, payload.name.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[instrument(
    name = "HTTP: Authorize Handler",
    skip(state, payload),
    fields(user_email = %payload.email)
)]
pub async fn authorize_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<AuthPayload>,
) -> Result<Json<AuthBody>, AuthError> {
    tracing::info!("Received login request");

    let user = state
        .auth_service
        .login(&payload.email, &payload.password)
        .await
        .map_err(|e| {
            tracing::error!("Authorization failed: {:?}", e);
            e
        })?;

    let token = state.auth_service.issue_token(&user)?;

    tracing::info!("JWT issued for user");
    Ok(Json(AuthBody::new(token)))
}

/// Session token from the `jwt` cookie (browser) or a Bearer header (API).
async fn session_token(parts: &mut Parts) -> Result<String, AuthError> {
    // 1. Try to get token from Cookies (for Browser/Dashboard)
    let cookie_token = parts
        .extract::<CookieJar>()
        .await
        .ok()
        .and_then(|jar| jar.get(SESSION_COOKIE).map(|c| c.value().to_string()));
    if let Some(token) = cookie_token {
        return Ok(token);
    }

    // 2. If no cookie, try to get from Authorization Header (for API/Curl)
    let TypedHeader(Authorization(bearer)) = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| {
            tracing::warn!("No JWT found in cookies or headers");
            AuthError::InvalidToken
        })?;
    Ok(bearer.token().to_string())
}

impl<S> FromRequestParts<S> for Claims
where
    AuthService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    #[instrument(name = "Extracting Claims", skip(state, parts))]
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = session_token(parts).await?;
        let auth = AuthService::from_ref(state);

        // 3. Decode the token, then check the account still exists and is active
        let claims = auth.verify_token(&token)?;
        auth.refresh_claims(claims).await
    }
}

/// Claims of an authenticated admin; everyone else gets 403.
pub struct AdminClaims(pub Claims);

impl<S> FromRequestParts<S> for AdminClaims
where
    AuthService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = session_token(parts).await?;
        let auth = AuthService::from_ref(state);

        // Non-admin tokens are refused without a lookup.
        let claims = auth.verify_token(&token)?;
        if !claims.is_admin() {
            tracing::warn!(user = %claims, "Admin route refused");
            return Err(AuthError::Forbidden);
        }

        let claims = auth.refresh_claims(claims).await?;
        if !claims.is_admin() {
            tracing::warn!(user = %claims, "Admin route refused: role revoked");
            return Err(AuthError::Forbidden);
        }
        Ok(Self(claims))
    }
}
