use std::env;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::connect_info::ConnectInfo,
    extract::DefaultBodyLimit,
    extract::State,
    http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue},
    http::Method,
    http::Request,
    middleware,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use bs_common::db::{create_pool_from_url, run_migrations, PgStore};
use bs_common::logging::{init_tracing_subscriber, install_tracing_panic_hook};
use bs_common::{MatchService, MatchStore, MemoryStore, ServiceConfig};
use clap::{Parser, ValueEnum};
use dotenvy::dotenv;
use governor::{
    clock::DefaultClock, middleware::NoOpMiddleware, state::keyed::DashMapStateStore, Quota,
    RateLimiter,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

pub mod auth;
pub mod error;
pub mod handlers;

use auth::{AuthConfig, AuthMode, JwtAlgorithm};
use error::ApiError;
use handlers::{
    callback, connections, daily, deep_links, health, matches, notifications, profiles,
    recommendations, ships,
};

const SHUTDOWN_DRAIN_GRACE: Duration = Duration::from_millis(200);
const BODY_LIMIT_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum StoreKind {
    Postgres,
    /// Process-local tables; data is lost on restart.
    Memory,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "bs-api", about = "HTTP API for the BITSPARK match service")]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Server port
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// Storage backend: postgres | memory
    #[arg(long, env = "BS_STORE", default_value = "postgres", value_enum)]
    store: StoreKind,

    /// API key for X-API-Key authentication
    #[arg(long, env = "BS_API_KEY")]
    api_key: Option<String>,

    /// Authentication mode: api_key | jwt
    #[arg(long, env = "AUTH_MODE", default_value = "api_key", value_enum)]
    auth_mode: AuthMode,

    /// JWT secret for AUTH_MODE=jwt
    #[arg(long, env = "JWT_SECRET")]
    jwt_secret: Option<String>,

    /// Public key for AUTH_MODE=jwt when using an asymmetric algorithm
    #[arg(long, env = "JWT_PUBLIC_KEY")]
    jwt_public_key: Option<String>,

    #[arg(long, env = "JWT_ALGORITHM", default_value = "hs512", value_enum)]
    jwt_algorithm: JwtAlgorithm,

    /// Comma separated list of allowed CORS origins
    #[arg(long, env = "BS_CORS_ORIGINS", default_value = "http://localhost:3000")]
    cors_origins: String,

    /// Web application origin the auth callback redirects into
    #[arg(long, env = "BS_APP_ORIGIN", default_value = "http://localhost:3000")]
    app_origin: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub port: u16,
    pub store: StoreKind,
    pub cors_origins: Vec<String>,
    pub auth: AuthConfig,
    pub app_origin: String,
}

type IpRateLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock, NoOpMiddleware>;

#[derive(Clone)]
pub struct RateLimits {
    global: Arc<IpRateLimiter>,
    generate: Arc<IpRateLimiter>,
}

/// `generate` guards the endpoints that draw candidates or fan out
/// notifications (daily-match generation, ship creation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub global_per_sec: u64,
    pub global_burst: u32,
    pub generate_per_sec: u64,
    pub generate_burst: u32,
}

impl RateLimitConfig {
    fn parse_env_u64(vars: &[&str]) -> Option<u64> {
        vars.iter()
            .find_map(|name| env::var(name).ok())
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
    }

    fn parse_env_u32(vars: &[&str]) -> Option<u32> {
        vars.iter()
            .find_map(|name| env::var(name).ok())
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|value| *value > 0)
    }

    fn from_env() -> Self {
        Self {
            global_per_sec: Self::parse_env_u64(&["BS_RATE_LIMIT_GLOBAL_PER_SEC"]).unwrap_or(20),
            global_burst: Self::parse_env_u32(&["BS_RATE_LIMIT_GLOBAL_BURST"]).unwrap_or(40),
            generate_per_sec: Self::parse_env_u64(&["BS_RATE_LIMIT_GENERATE_PER_SEC"])
                .unwrap_or(1),
            generate_burst: Self::parse_env_u32(&["BS_RATE_LIMIT_GENERATE_BURST"]).unwrap_or(5),
        }
    }
}

impl AppConfig {
    fn from_cli(cli: Cli) -> Result<Self, ApiError> {
        let cors_origins = cli
            .cors_origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect::<Vec<_>>();

        if cors_origins.iter().any(|origin| origin == "*") {
            return Err(ApiError::BadRequest(
                "BS_CORS_ORIGINS must list explicit origins when credentials are enabled".into(),
            ));
        }

        if cli.store == StoreKind::Postgres && cli.database_url.is_none() {
            return Err(ApiError::BadRequest(
                "DATABASE_URL is required when BS_STORE=postgres".into(),
            ));
        }

        let auth = AuthConfig {
            mode: cli.auth_mode,
            api_key: cli.api_key,
            jwt_secret: cli.jwt_secret,
            jwt_public_key: cli.jwt_public_key,
            jwt_algorithm: cli.jwt_algorithm,
        };

        match auth.mode {
            AuthMode::ApiKey if auth.api_key.is_none() => {
                return Err(ApiError::BadRequest(
                    "BS_API_KEY is required when AUTH_MODE=api_key".into(),
                ));
            }
            AuthMode::Jwt => match auth.jwt_algorithm.key_kind() {
                auth::JwtKeyKind::Secret if auth.jwt_secret.is_none() => {
                    return Err(ApiError::BadRequest(
                        "JWT_SECRET is required when AUTH_MODE=jwt with symmetric algorithms"
                            .into(),
                    ));
                }
                auth::JwtKeyKind::Secret => {}
                _ if auth.jwt_public_key.is_none() => {
                    return Err(ApiError::BadRequest(
                        "JWT_PUBLIC_KEY is required when AUTH_MODE=jwt with asymmetric algorithms"
                            .into(),
                    ));
                }
                _ => {}
            },
            _ => {}
        }

        Ok(Self {
            database_url: cli.database_url,
            port: cli.port,
            store: cli.store,
            cors_origins,
            auth,
            app_origin: cli.app_origin.trim_end_matches('/').to_string(),
        })
    }

    pub fn for_tests(auth: AuthConfig) -> Self {
        Self {
            database_url: None,
            port: 3001,
            store: StoreKind::Memory,
            cors_origins: vec!["http://localhost:3000".into()],
            auth,
            app_origin: "http://localhost:3000".into(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MatchService>,
    pub config: AppConfig,
    pub(crate) rate_limits: RateLimits,
    pub readiness: Arc<AtomicBool>,
}

pub type SharedState = Arc<AppState>;

impl axum::extract::FromRef<SharedState> for AuthConfig {
    fn from_ref(input: &SharedState) -> AuthConfig {
        input.config.auth.clone()
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-api-key"),
        ])
        .allow_credentials(true)
}

fn build_ip_limiter(per_second: u64, burst_size: u32) -> Arc<IpRateLimiter> {
    let nanos_per_token = 1_000_000_000u64 / per_second.max(1);
    let burst = NonZeroU32::new(burst_size).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::with_period(Duration::from_nanos(nanos_per_token.max(1)))
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
        .allow_burst(burst);

    Arc::new(RateLimiter::keyed(quota))
}

pub fn default_rate_limits() -> RateLimits {
    let cfg = RateLimitConfig::from_env();
    RateLimits {
        global: build_ip_limiter(cfg.global_per_sec, cfg.global_burst),
        generate: build_ip_limiter(cfg.generate_per_sec, cfg.generate_burst),
    }
}

fn request_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
}

fn enforce_rate_limit(limiter: &IpRateLimiter, ip: Option<IpAddr>) -> Result<(), ApiError> {
    if let Some(client_ip) = ip {
        if limiter.check_key(&client_ip).is_err() {
            return Err(ApiError::TooManyRequests("rate limit exceeded".into()));
        }
    }

    Ok(())
}

async fn global_rate_limit(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    enforce_rate_limit(&state.rate_limits.global, request_ip(&req))?;
    Ok(next.run(req).await)
}

async fn generate_rate_limit(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    enforce_rate_limit(&state.rate_limits.generate, request_ip(&req))?;
    Ok(next.run(req).await)
}

async fn attach_request_id_context(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    Ok(error::with_request_id(request_id, next.run(req)).await)
}

pub fn create_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let request_id_header = HeaderName::from_static("x-request-id");
    let trace_header = request_id_header.clone();

    let trace = TraceLayer::new_for_http().make_span_with(move |request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(&trace_header)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri().path(),
            request_id = %request_id,
            status = tracing::field::Empty,
        )
    });

    let api_routes = Router::new()
        .route("/profiles", post(profiles::create_profile))
        .route(
            "/profiles/:id",
            get(profiles::get_profile).patch(profiles::update_profile),
        )
        .route("/matches", post(matches::get_matches))
        .route("/daily-match", get(daily::todays_match))
        .route(
            "/daily-match/generate",
            post(daily::generate).route_layer(middleware::from_fn_with_state(
                state.clone(),
                generate_rate_limit,
            )),
        )
        .route("/daily-match/history", get(daily::history))
        .route("/daily-match/streak", get(daily::streak))
        .route("/daily-match/stats", get(daily::stats))
        .route("/daily-match/:id/action", post(daily::record_action))
        .route(
            "/connections",
            get(connections::list_connections).post(connections::create_connection),
        )
        .route("/connections/pending", get(connections::pending_requests))
        .route("/connections/stats", get(connections::stats))
        .route("/connections/check", get(connections::check))
        .route("/connections/block", post(connections::block_user))
        .route("/connections/:id/accept", post(connections::accept))
        .route("/connections/:id/decline", post(connections::decline))
        .route("/connections/:id/invite", post(deep_links::invite))
        .route(
            "/ships",
            post(ships::create_ship).route_layer(middleware::from_fn_with_state(
                state.clone(),
                generate_rate_limit,
            )),
        )
        .route("/ships/received", get(ships::received))
        .route("/ships/sent", get(ships::sent))
        .route("/ships/stats", get(ships::stats))
        .route("/ships/:id/respond", post(ships::respond))
        .route("/deep-links", get(deep_links::deep_link))
        .route("/platform-stats", get(deep_links::platform_stats))
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/v1/recommendations",
            post(recommendations::get_recommendations),
        )
        .route("/v1/feedback", post(recommendations::submit_feedback))
        .route("/v1/stats/:user_id", get(recommendations::user_stats));

    Router::new()
        .route("/health", get(health::readyz))
        .route("/livez", get(health::livez))
        .route("/readyz", get(health::readyz))
        .route("/auth/callback", get(callback::auth_callback))
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            global_rate_limit,
        ))
        .layer(middleware::from_fn(attach_request_id_context))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(trace)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(
            request_id_header,
            MakeRequestUuid,
        ))
        .layer(cors)
        .with_state(state)
}

pub fn build_state(store: Arc<dyn MatchStore>, config: AppConfig, service: ServiceConfig) -> SharedState {
    Arc::new(AppState {
        service: Arc::new(MatchService::new(store, service)),
        config,
        rate_limits: default_rate_limits(),
        readiness: Arc::new(AtomicBool::new(true)),
    })
}

/// Router state over a fresh in-memory store, API-key auth.
pub fn test_state(api_key: &str) -> SharedState {
    build_state(
        Arc::new(MemoryStore::new()),
        AppConfig::for_tests(AuthConfig::api_key(api_key)),
        ServiceConfig::default(),
    )
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn MatchStore>, ApiError> {
    match (config.store, config.database_url.as_deref()) {
        (StoreKind::Memory, _) => {
            info!("using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        (StoreKind::Postgres, Some(url)) => {
            let pool = create_pool_from_url(url)
                .map_err(|err| ApiError::Database(format!("failed to create pool: {err}")))?;
            run_migrations(&pool)
                .await
                .map_err(|err| ApiError::Database(format!("failed to run migrations: {err}")))?;
            Ok(Arc::new(PgStore::new(pool)))
        }
        (StoreKind::Postgres, None) => Err(ApiError::BadRequest(
            "DATABASE_URL is required when BS_STORE=postgres".into(),
        )),
    }
}

pub async fn run() -> Result<(), ApiError> {
    dotenv().ok();
    init_tracing_subscriber(env!("CARGO_PKG_NAME"));
    install_tracing_panic_hook(env!("CARGO_PKG_NAME"));

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli)?;
    let store = open_store(&config).await?;
    bs_metrics::init_metrics(bs_metrics::METRICS_PORT_ENV, bs_metrics::DEFAULT_METRICS_PORT);

    let state = build_state(store, config.clone(), ServiceConfig::from_env());

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let app = create_router(state.clone());

    info!(%addr, auth_mode = ?config.auth.mode, store = ?config.store, "bs-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    let service = app.into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    Ok(())
}

async fn shutdown_signal(state: SharedState) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            let _ = sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state.readiness.store(false, Ordering::SeqCst);

    // /readyz reports 503 during this window before new connections stop.
    tokio::time::sleep(SHUTDOWN_DRAIN_GRACE).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::sync::Mutex;
    use tower::ServiceExt;

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    fn with_envs(vars: &[(&str, Option<&str>)], f: impl FnOnce()) {
        let _guard = ENV_GUARD.lock().unwrap();

        let previous: Vec<(&str, Option<String>)> = vars
            .iter()
            .map(|(var, value)| {
                let old = env::var(var).ok();
                match value {
                    Some(v) => env::set_var(var, v),
                    None => env::remove_var(var),
                }
                (*var, old)
            })
            .collect();

        f();

        for (var, previous_value) in previous {
            match previous_value {
                Some(v) => env::set_var(var, v),
                None => env::remove_var(var),
            }
        }
    }

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["bs-api"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn sets_request_id_when_missing() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(SetRequestIdLayer::new(
                HeaderName::from_static("x-request-id"),
                MakeRequestUuid,
            ));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[test]
    fn rate_limit_config_respects_env_overrides() {
        with_envs(
            &[
                ("BS_RATE_LIMIT_GLOBAL_PER_SEC", Some("10")),
                ("BS_RATE_LIMIT_GLOBAL_BURST", Some("25")),
                ("BS_RATE_LIMIT_GENERATE_PER_SEC", Some("2")),
                ("BS_RATE_LIMIT_GENERATE_BURST", Some("0")),
            ],
            || {
                let cfg = RateLimitConfig::from_env();
                assert_eq!(
                    cfg,
                    RateLimitConfig {
                        global_per_sec: 10,
                        global_burst: 25,
                        generate_per_sec: 2,
                        generate_burst: 5,
                    }
                );
            },
        );
    }

    const CONFIG_ENV: &[(&str, Option<&str>)] = &[
        ("DATABASE_URL", None),
        ("BS_STORE", None),
        ("BS_API_KEY", None),
        ("AUTH_MODE", None),
        ("JWT_SECRET", None),
        ("JWT_PUBLIC_KEY", None),
        ("BS_CORS_ORIGINS", None),
        ("BS_APP_ORIGIN", None),
    ];

    #[test]
    fn config_requires_credentials_for_auth_mode() {
        with_envs(CONFIG_ENV, || {
            let missing_key = AppConfig::from_cli(cli(&["--store", "memory"]));
            assert!(matches!(missing_key, Err(ApiError::BadRequest(_))));

            let missing_secret =
                AppConfig::from_cli(cli(&["--store", "memory", "--auth-mode", "jwt"]));
            assert!(matches!(missing_secret, Err(ApiError::BadRequest(_))));

            let ok = AppConfig::from_cli(cli(&[
                "--store",
                "memory",
                "--api-key",
                "k",
                "--app-origin",
                "https://bitspark.app/",
            ]))
            .unwrap();
            assert_eq!(ok.app_origin, "https://bitspark.app");
            assert_eq!(ok.database_url, None);
        });
    }

    #[test]
    fn config_rejects_wildcard_cors_and_missing_database() {
        with_envs(CONFIG_ENV, || {
            let wildcard = AppConfig::from_cli(cli(&[
                "--store",
                "memory",
                "--api-key",
                "k",
                "--cors-origins",
                "*",
            ]));
            assert!(matches!(wildcard, Err(ApiError::BadRequest(_))));

            let no_db = AppConfig::from_cli(cli(&["--store", "postgres", "--api-key", "k"]));
            assert!(matches!(no_db, Err(ApiError::BadRequest(_))));
        });
    }
}
