/// Health check endpoint
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// Checks database and cache connectivity. Returns 200 while the database
/// is reachable; a dead cache only degrades the status, since the API
/// serves reads from the database when Redis is down. A dead database
/// returns 503 so load balancers stop routing here.
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "cache": "connected"
/// }
/// ```

use crate::{app::AppState, error::{ApiError, ApiResult}};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status: healthy, degraded
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,

    /// Cache status
    pub cache: String,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database_ok = sqlx::query("SELECT 1").fetch_one(&state.db).await.is_ok();
    let cache_ok = state.cache.ping().await;

    if !database_ok {
        return Err(ApiError::ServiceUnavailable(
            "Database is unreachable".to_string(),
        ));
    }

    Ok(Json(HealthResponse {
        status: if cache_ok { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: "connected".to_string(),
        cache: if cache_ok { "connected" } else { "disconnected" }.to_string(),
    }))
}
