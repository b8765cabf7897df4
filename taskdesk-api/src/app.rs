/// Application state and router builder
///
/// Defines the shared state handed to every handler and assembles the Axum
/// router with its middleware stack.
///
/// # Example
///
/// ```no_run
/// use taskdesk_api::{app::AppState, config::Config};
/// use taskdesk_shared::cache::{client::{RedisClient, RedisConfig}, task_cache::TaskCache};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let redis = RedisClient::new(RedisConfig {
///     url: config.cache.redis_url.clone(),
///     command_timeout_secs: 5,
/// }).await?;
/// let cache = TaskCache::with_ttl(redis, config.cache.ttl_secs);
/// let state = AppState::new(pool, cache, config);
/// let app = taskdesk_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskdesk_shared::auth::jwt;
use taskdesk_shared::cache::task_cache::TaskCache;
use taskdesk_shared::models::user::User;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned per request via Axum's `State` extractor; the pool, cache, and
/// config are all cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Task cache
    pub cache: TaskCache,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, cache: TaskCache, config: Config) -> Self {
        Self {
            db,
            cache,
            config: Arc::new(config),
        }
    }

    /// JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Raw Redis connection, used by the rate limiter
    pub fn cache_connection(&self) -> redis::aio::ConnectionManager {
        self.cache.client().get_connection()
    }
}

/// Builds the complete Axum router
///
/// # Routes
///
/// ```text
/// /
/// ├── /health                        # Liveness + dependency checks (public)
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /register         # Public
///     │   ├── POST /login            # Public, per-IP rate limited
///     │   ├── POST /refresh          # Public (refresh token in body)
///     │   └── POST /change-password  # Authenticated
///     ├── /users/
///     │   ├── GET  /me
///     │   ├── PUT  /me
///     │   └── POST /:id/deactivate   # Admin only
///     ├── /notifications/
///     │   ├── GET  /                 # Unread for the caller
///     │   └── POST /:id/read
///     └── /tasks/
///         ├── GET    /               # List (cached per user)
///         ├── POST   /
///         ├── GET    /:id            # Detail (cached per task)
///         ├── PUT    /:id
///         ├── DELETE /:id
///         ├── POST   /:id/complete
///         └── GET    /:id/activity   # Recent change log
/// ```
///
/// # Middleware Stack
///
/// Applied outermost first: security headers, CORS, response compression,
/// request tracing, then per-group authentication and (for login) rate
/// limiting.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Public auth endpoints; login additionally goes through the per-IP limiter
    let login_route = Router::new()
        .route("/login", post(routes::auth::login))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::rate_limit::login_rate_limit_layer,
        ));

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/refresh", post(routes::auth::refresh))
        .merge(login_route);

    let authed_auth_routes = Router::new()
        .route("/change-password", post(routes::auth::change_password))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let user_routes = Router::new()
        .route("/me", get(routes::users::me))
        .route("/me", put(routes::users::update_me))
        .route("/:id/deactivate", post(routes::users::deactivate))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let task_routes = Router::new()
        .route("/", get(routes::tasks::list::list_tasks))
        .route("/", post(routes::tasks::create::create_task))
        .route("/:id", get(routes::tasks::detail::get_task))
        .route("/:id", put(routes::tasks::update::update_task))
        .route("/:id", axum::routing::delete(routes::tasks::delete::delete_task))
        .route("/:id/complete", post(routes::tasks::complete::complete_task))
        .route("/:id/activity", get(routes::tasks::activity::task_activity))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let notification_routes = Router::new()
        .route("/", get(routes::notifications::list_unread))
        .route("/:id/read", post(routes::notifications::mark_read))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(authed_auth_routes))
        .nest("/users", user_routes)
        .nest("/notifications", notification_routes)
        .nest("/tasks", task_routes);

    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// JWT authentication middleware
///
/// Validates the bearer token, then loads the user row so authorization
/// always sees the current role and account state, not the one baked into
/// the token. Inactive and locked accounts are rejected here.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::BadRequest("Expected Bearer token".to_string()))?;

    let claims = jwt::validate_access_token(token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is deactivated".to_string()));
    }

    if user.account_locked {
        return Err(ApiError::Unauthorized(
            "Account is locked due to repeated failed logins".to_string(),
        ));
    }

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
