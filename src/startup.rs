use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    extract::FromRef,
    http::HeaderValue,
    routing::{get, post},
};
use redis::Client;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::analytics::AnalyticsCollector;
use crate::configuration::Settings;
use crate::routes::{
    self,
    auth::{
        authorize_handler, login_page, login_post, logout_handler, register_handler, signup_page,
        signup_post,
    },
    dashboard::dashboard_handler,
};
use crate::services::{
    admin::AdminService, analytics::AnalyticsService, auth::AuthService,
    category::CategoryService, qr_code::QrCodeService, settings::SettingsService,
    short_url::ShortUrlService,
};
use crate::store::{
    CacheRepository, CategoryRepository, EventRepository, GroupRepository, QrCodeRepository,
    SettingsRepository, ShortUrlRepository, UserRepository,
};

pub type ConnectionPool = bb8::Pool<Client>;

#[derive(Clone, Debug)]
pub struct AppState {
    pub url_service: ShortUrlService,
    pub qr_service: QrCodeService,
    pub auth_service: AuthService,
    pub analytics_service: AnalyticsService,
    pub category_service: CategoryService,
    pub admin_service: AdminService,
    pub settings_service: SettingsService,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth_service.clone()
    }
}

/// Wires repositories and services over already-created pools.
pub fn build_state(
    cfg: &Settings,
    pg_pool: PgPool,
    redis_pool: ConnectionPool,
) -> anyhow::Result<AppState> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(cfg.analytics.geo_timeout_ms))
        .user_agent(concat!("qrlink/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;
    let collector = AnalyticsCollector::new(http, &cfg.analytics);

    let qr_repo = QrCodeRepository::new(pg_pool.clone());
    let url_repo = ShortUrlRepository::new(pg_pool.clone());
    let cache = CacheRepository::new(redis_pool, cfg.redis.cache_ttl_seconds);

    let analytics_service = AnalyticsService::new(
        EventRepository::new(pg_pool.clone()),
        qr_repo.clone(),
        url_repo.clone(),
        collector,
    );
    let category_service = CategoryService::new(CategoryRepository::new(pg_pool.clone()));
    let settings_service = SettingsService::new(SettingsRepository::new(pg_pool.clone()));
    let base_url = cfg.application.base_url.clone();

    let qr_service = QrCodeService::new(
        qr_repo,
        category_service.clone(),
        settings_service.clone(),
        analytics_service.clone(),
        base_url.clone(),
    );
    let url_service = ShortUrlService::new(
        url_repo,
        cache,
        category_service.clone(),
        analytics_service.clone(),
        base_url,
    );

    let user_repo = UserRepository::new(pg_pool.clone());
    let auth_service = AuthService::new(
        user_repo.clone(),
        &cfg.application.jwt_secret,
        cfg.application.token_ttl_hours,
    );
    let admin_service = AdminService::new(user_repo, GroupRepository::new(pg_pool));

    Ok(AppState {
        url_service,
        qr_service,
        auth_service,
        analytics_service,
        category_service,
        admin_service,
        settings_service,
    })
}

pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let assets = std::env::current_dir()
        .map(|dir| dir.join("public"))
        .unwrap_or_else(|_| "public".into());

    Router::new()
        .route("/", get(|| async { axum::response::Redirect::to("/dashboard") }))
        .route("/dashboard", get(dashboard_handler))
        .route("/login", get(login_page).post(login_post))
        .route("/signup", get(signup_page).post(signup_post))
        .route("/logout", get(logout_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(authorize_handler))
        .merge(routes::health::router())
        .merge(routes::redirect::router())
        .merge(routes::qr_codes::router())
        .merge(routes::short_urls::router())
        .merge(routes::analytics::router())
        .merge(routes::categories::router())
        .merge(routes::groups::router())
        .merge(routes::users::router())
        .merge(routes::settings::router())
        .nest_service("/assets", ServeDir::new(assets))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub async fn connect_redis(url: &str) -> anyhow::Result<ConnectionPool> {
    let client = Client::open(url).context("could not open a client connection to redis")?;
    let redis_pool = bb8::Pool::builder()
        .connection_timeout(Duration::from_secs(2))
        .build_unchecked(client);

    // ping redis before starting; the cache is optional
    match redis_pool.get().await {
        Ok(mut conn) => {
            if let Err(e) = redis::cmd("PING").query_async::<String>(&mut *conn).await {
                warn!("Redis ping failed, short URLs will be served uncached: {}", e);
            }
        }
        Err(e) => warn!("Redis unavailable, short URLs will be served uncached: {}", e),
    }
    Ok(redis_pool)
}

pub async fn run(cfg: Settings) -> anyhow::Result<()> {
    let redis_pool = connect_redis(&cfg.redis.url).await?;

    let pg_pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(2))
        .connect_lazy_with(cfg.database.with_db());

    if cfg.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pg_pool)
            .await
            .context("failed to run database migrations")?;
        info!("Database migrations applied");
    }

    let state = build_state(&cfg, pg_pool, redis_pool)?;
    let app = build_router(state, &cfg.application.cors_origins);

    let address = cfg.application.address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("could not bind {address}"))?;
    info!("Starting qrlink on http://{}", address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("could not start server")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::get_configuration;
    use crate::models::qr_code::{QrCodeDraft, QrCodeModel, QrType};
    use crate::models::short_url::NewShortUrl;
    use crate::models::user::{Role, UpdateUser, UserModel};
    use crate::models::Scope;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn redis_pool() -> ConnectionPool {
        bb8::Pool::builder()
            .connection_timeout(Duration::from_millis(200))
            .build_unchecked(Client::open("redis://127.0.0.1:6379").unwrap())
    }

    /// State over a pool that never connects; enough for paths that fail
    /// before any query runs.
    fn test_state() -> AppState {
        let cfg = get_configuration().unwrap();
        let pg_pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy_with(cfg.database.with_db());
        build_state(&cfg, pg_pool, redis_pool()).unwrap()
    }

    fn state_over(pool: PgPool) -> AppState {
        let cfg = get_configuration().unwrap();
        build_state(&cfg, pool, redis_pool()).unwrap()
    }

    fn token_for(state: &AppState, role: Role) -> String {
        let user = UserModel {
            id: Uuid::new_v4(),
            email: "grace@example.com".into(),
            password_hash: String::new(),
            name: None,
            role,
            group_id: None,
            is_active: true,
            created_at: chrono::Utc::now(),
        };
        state.auth_service.issue_token(&user).unwrap()
    }

    /// Stores an account and returns its id and a session token.
    async fn signed_in(state: &AppState, pool: &PgPool, email: &str) -> (Uuid, String) {
        let users = UserRepository::new(pool.clone());
        let id = users.create_user(email, "hash", None).await.unwrap();
        let user = users.find_by_id(id).await.unwrap().unwrap();
        (id, state.auth_service.issue_token(&user).unwrap())
    }

    async fn seed_qr(
        pool: &PgPool,
        owner: Uuid,
        short_key: &str,
        qr_type: QrType,
        content: &str,
        tweak: impl FnOnce(&mut QrCodeDraft),
    ) -> QrCodeModel {
        let mut draft = QrCodeDraft {
            name: "Flyer".into(),
            content: content.into(),
            qr_type,
            is_dynamic: qr_type == QrType::Url,
            category_id: None,
            expires_at: None,
            max_scans: None,
            foreground_color: "#000000".into(),
            background_color: "#ffffff".into(),
            size: 256,
        };
        tweak(&mut draft);
        QrCodeRepository::new(pool.clone())
            .store(owner, short_key, &draft)
            .await
            .unwrap()
    }

    async fn scan_count(pool: &PgPool, id: Uuid) -> i32 {
        QrCodeRepository::new(pool.clone())
            .find(Scope::All, id)
            .await
            .unwrap()
            .unwrap()
            .scan_count
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn get_as(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> Response {
        app.oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn location(response: &Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = build_router(test_state(), &[]);
        let response = send(app, get("/health")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn api_requires_a_token() {
        let app = build_router(test_state(), &[]);
        let response = send(app, get("/api/qr-codes")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_tokens_are_rejected() {
        let app = build_router(test_state(), &[]);
        let response = send(app, get_as("/api/short-urls", "not-a-jwt")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_routes_refuse_regular_users() {
        let state = test_state();
        let token = token_for(&state, Role::User);
        let app = build_router(state, &[]);

        for uri in ["/api/users", "/api/groups"] {
            let response = send(app.clone(), get_as(uri, &token)).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
        }
    }

    #[tokio::test]
    async fn settings_update_is_admin_only() {
        let state = test_state();
        let token = token_for(&state, Role::User);
        let app = build_router(state, &[]);

        let request = Request::builder()
            .method("PUT")
            .uri("/api/settings")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"default_qr_size":512}"#))
            .unwrap();
        let response = send(app, request).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn malformed_json_bodies_get_json_errors() {
        let app = build_router(test_state(), &[]);

        for body in ["{}", "{not json", r#"{"email": 42}"#] {
            let response = send(app.clone(), post_json("/api/auth/register", None, body)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
            assert!(body_json(response).await["error"].is_string(), "{body}");
        }
    }

    #[tokio::test]
    async fn malformed_qr_redirect_ids_are_not_found() {
        let app = build_router(test_state(), &[]);
        let response = send(app, get("/api/qr/not-a-uuid")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn dashboard_sends_anonymous_visitors_to_login() {
        let app = build_router(test_state(), &[]);
        let response = send(app, get("/dashboard")).await;
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn login_page_renders() {
        let app = build_router(test_state(), &[]);
        let response = send(app, get("/login")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("name=\"password\""));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn malformed_resource_ids_are_bad_requests(pool: PgPool) {
        let state = state_over(pool.clone());
        let (_, token) = signed_in(&state, &pool, "ada@example.com").await;
        let app = build_router(state, &[]);

        let response = send(app, get_as("/api/qr-codes/not-a-uuid", &token)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn dashboard_lists_the_session_owners_codes(pool: PgPool) {
        let state = state_over(pool.clone());
        let (owner, token) = signed_in(&state, &pool, "ada@example.com").await;
        seed_qr(&pool, owner, "menu0009", QrType::Url, "https://example.com/menu", |_| {}).await;
        let app = build_router(state, &[]);

        let request = Request::builder()
            .uri("/dashboard")
            .header(header::COOKIE, format!("jwt={token}"))
            .body(Body::empty())
            .unwrap();
        let response = send(app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("Flyer"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn incomplete_payloads_get_json_errors(pool: PgPool) {
        let state = state_over(pool.clone());
        let (_, token) = signed_in(&state, &pool, "ada@example.com").await;
        let app = build_router(state, &[]);

        let response = send(app.clone(), post_json("/api/qr-codes", Some(&token), "{}")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = body_json(response).await;
        assert!(error["error"].as_str().unwrap().contains("name"));

        let response = send(app, get_as("/api/analytics/summary?days=many", &token)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn created_qr_codes_get_an_id_and_key(pool: PgPool) {
        let state = state_over(pool.clone());
        let (owner, token) = signed_in(&state, &pool, "ada@example.com").await;
        let app = build_router(state, &[]);

        let body = r#"{"name": "Menu", "content": "https://example.com/menu"}"#;
        let response = send(app, post_json("/api/qr-codes", Some(&token), body)).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let created = body_json(response).await;
        let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();
        assert_eq!(created["short_key"].as_str().unwrap().len(), 8);
        assert_eq!(created["user_id"], owner.to_string());
        assert_eq!(scan_count(&pool, id).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn disabled_accounts_are_refused(pool: PgPool) {
        let state = state_over(pool.clone());
        let (id, token) = signed_in(&state, &pool, "ada@example.com").await;
        let app = build_router(state, &[]);

        let response = send(app.clone(), get_as("/api/qr-codes", &token)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let disable = UpdateUser {
            is_active: Some(false),
            ..UpdateUser::default()
        };
        UserRepository::new(pool.clone())
            .update(id, &disable)
            .await
            .unwrap();

        let response = send(app, get_as("/api/qr-codes", &token)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn deleted_accounts_are_unauthorized(pool: PgPool) {
        let state = state_over(pool.clone());
        let (id, token) = signed_in(&state, &pool, "ada@example.com").await;
        UserRepository::new(pool.clone()).delete(id).await.unwrap();
        let app = build_router(state, &[]);

        let body = r#"{"name": "Menu", "content": "https://example.com/menu"}"#;
        let response = send(app, post_json("/api/qr-codes", Some(&token), body)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn demoted_admins_lose_admin_routes(pool: PgPool) {
        let state = state_over(pool.clone());
        // the first account is the admin
        let (id, token) = signed_in(&state, &pool, "root@example.com").await;
        let app = build_router(state, &[]);

        let response = send(app.clone(), get_as("/api/users", &token)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let demote = UpdateUser {
            role: Some(Role::User),
            ..UpdateUser::default()
        };
        UserRepository::new(pool.clone())
            .update(id, &demote)
            .await
            .unwrap();

        let response = send(app, get_as("/api/users", &token)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn each_qr_redirect_counts_exactly_one_scan(pool: PgPool) {
        let state = state_over(pool.clone());
        let (owner, _) = signed_in(&state, &pool, "ada@example.com").await;
        let qr = seed_qr(&pool, owner, "menu0001", QrType::Url, "https://example.com/menu", |_| {}).await;
        let app = build_router(state, &[]);

        let response = send(app.clone(), get(&format!("/api/qr/{}", qr.id))).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "https://example.com/menu");
        assert_eq!(scan_count(&pool, qr.id).await, 1);

        let response = send(app, get("/qr-redirect/menu0001")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "https://example.com/menu");
        assert_eq!(scan_count(&pool, qr.id).await, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn unknown_qr_codes_are_not_found(pool: PgPool) {
        let app = build_router(state_over(pool), &[]);

        let response = send(app.clone(), get(&format!("/api/qr/{}", Uuid::new_v4()))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = send(app, get("/qr-redirect/missing1")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn inactive_qr_codes_are_not_found(pool: PgPool) {
        let state = state_over(pool.clone());
        let (owner, _) = signed_in(&state, &pool, "ada@example.com").await;
        let qr = seed_qr(&pool, owner, "menu0002", QrType::Url, "https://example.com/menu", |_| {}).await;
        sqlx::query("UPDATE qr_codes SET is_active = FALSE WHERE id = $1")
            .bind(qr.id)
            .execute(&pool)
            .await
            .unwrap();
        let app = build_router(state, &[]);

        let response = send(app, get(&format!("/api/qr/{}", qr.id))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(scan_count(&pool, qr.id).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn expired_qr_codes_are_gone(pool: PgPool) {
        let state = state_over(pool.clone());
        let (owner, _) = signed_in(&state, &pool, "ada@example.com").await;
        let qr = seed_qr(&pool, owner, "menu0003", QrType::Url, "https://example.com/menu", |draft| {
            draft.expires_at = Some(chrono::Utc::now() - chrono::Duration::hours(1));
        })
        .await;
        let app = build_router(state, &[]);

        let response = send(app, get(&format!("/api/qr/{}", qr.id))).await;
        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(scan_count(&pool, qr.id).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn exhausted_qr_codes_are_gone(pool: PgPool) {
        let state = state_over(pool.clone());
        let (owner, _) = signed_in(&state, &pool, "ada@example.com").await;
        let qr = seed_qr(&pool, owner, "menu0004", QrType::Url, "https://example.com/menu", |draft| {
            draft.max_scans = Some(1);
        })
        .await;
        let app = build_router(state, &[]);

        let response = send(app.clone(), get("/qr-redirect/menu0004")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        let response = send(app, get("/qr-redirect/menu0004")).await;
        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(scan_count(&pool, qr.id).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn non_url_qr_codes_do_not_redirect(pool: PgPool) {
        let state = state_over(pool.clone());
        let (owner, _) = signed_in(&state, &pool, "ada@example.com").await;
        let qr = seed_qr(&pool, owner, "text0001", QrType::Text, "Table 12", |_| {}).await;
        let app = build_router(state, &[]);

        let response = send(app.clone(), get(&format!("/api/qr/{}", qr.id))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = send(app, get("/qr-redirect/text0001")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(scan_count(&pool, qr.id).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn short_urls_redirect_until_their_limit(pool: PgPool) {
        let state = state_over(pool.clone());
        let (owner, _) = signed_in(&state, &pool, "ada@example.com").await;
        let repo = ShortUrlRepository::new(pool.clone());
        let new = NewShortUrl {
            original_url: "https://example.com/launch".into(),
            title: None,
            custom_code: None,
            category_id: None,
            expires_at: None,
            max_clicks: Some(1),
        };
        repo.store("launch", owner, &new).await.unwrap();
        let app = build_router(state, &[]);

        let response = send(app.clone(), get("/s/launch")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "https://example.com/launch");

        let response = send(app.clone(), get("/s/launch")).await;
        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(repo.fetch("launch").await.unwrap().unwrap().click_count, 1);

        let response = send(app, get("/s/unknown")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires postgres (DATABASE_URL)"]
    async fn expired_short_urls_are_gone(pool: PgPool) {
        let state = state_over(pool.clone());
        let (owner, _) = signed_in(&state, &pool, "ada@example.com").await;
        let repo = ShortUrlRepository::new(pool.clone());
        let new = NewShortUrl {
            original_url: "https://example.com/sale".into(),
            title: None,
            custom_code: None,
            category_id: None,
            expires_at: Some(chrono::Utc::now() - chrono::Duration::minutes(5)),
            max_clicks: None,
        };
        repo.store("sale", owner, &new).await.unwrap();
        let app = build_router(state, &[]);

        let response = send(app, get("/s/sale")).await;
        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(repo.fetch("sale").await.unwrap().unwrap().click_count, 0);
    }
}
