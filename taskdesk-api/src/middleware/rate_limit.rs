/// Per-IP login rate limiting
///
/// Brute-force protection for `POST /v1/auth/login`. Each client IP gets a
/// fixed window of [`MAX_ATTEMPTS`] login attempts; exceeding it locks the
/// IP out for [`LOCKOUT_SECS`] seconds. All state lives in Redis so the
/// limit holds across API replicas.
///
/// # Storage
///
/// - `login:attempts:{ip}`: attempt counter, expires with the window
/// - `login:lockout:{ip}`: lockout marker, expires when the lockout ends
///
/// Check-and-increment runs as one Lua script, so concurrent requests from
/// the same IP cannot slip past the limit between a read and a write.
///
/// # Failure policy
///
/// Fails open: if Redis is unreachable the login proceeds unthrottled.
/// Account-level lockout in the login handler still applies.

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

/// Login attempts allowed per window
pub const MAX_ATTEMPTS: u32 = 5;

/// Attempt counter window in seconds
pub const WINDOW_SECS: u64 = 300;

/// Lockout duration in seconds once the limit is exceeded
pub const LOCKOUT_SECS: u64 = 1800;

/// Atomic check-and-increment for one login attempt
///
/// Returns `{0, retry_after}` when locked out, `{1, remaining}` otherwise.
const RATE_LIMIT_SCRIPT: &str = r#"
local attempts_key = KEYS[1]
local lockout_key = KEYS[2]
local max_attempts = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local lockout = tonumber(ARGV[3])

if redis.call('EXISTS', lockout_key) == 1 then
    return {0, redis.call('TTL', lockout_key)}
end

local attempts = redis.call('INCR', attempts_key)
if attempts == 1 then
    redis.call('EXPIRE', attempts_key, window)
end

if attempts > max_attempts then
    redis.call('SET', lockout_key, '1', 'EX', lockout)
    redis.call('DEL', attempts_key)
    return {0, lockout}
end

return {1, max_attempts - attempts}
"#;

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request may proceed; attempts remaining in the window
    Allowed { remaining: u32 },

    /// IP is locked out; seconds until the lockout expires
    LockedOut { retry_after: u64 },
}

/// Login rate limiting middleware
///
/// Runs before the login handler. A locked-out IP gets 429 with a
/// Retry-After header and never reaches credential checking.
pub async fn login_rate_limit_layer(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = client_ip(request.headers(), addr);

    match check_login_attempt(&state, &ip).await {
        Ok(RateLimitDecision::Allowed { remaining }) => {
            tracing::debug!(ip = %ip, remaining, "Login attempt allowed");
            Ok(next.run(request).await)
        }
        Ok(RateLimitDecision::LockedOut { retry_after }) => {
            tracing::warn!(ip = %ip, retry_after, "Login attempt blocked by rate limit");
            Err(ApiError::RateLimitExceeded {
                retry_after,
                message: format!(
                    "Too many login attempts. Try again in {} seconds",
                    retry_after
                ),
            })
        }
        Err(e) => {
            // Redis down: let the login through rather than lock everyone out
            tracing::warn!(ip = %ip, error = %e, "Rate limit check failed, allowing request");
            Ok(next.run(request).await)
        }
    }
}

/// Records one login attempt for an IP and decides whether it may proceed
async fn check_login_attempt(
    state: &AppState,
    ip: &str,
) -> Result<RateLimitDecision, redis::RedisError> {
    let mut conn = state.cache_connection();

    let script = redis::Script::new(RATE_LIMIT_SCRIPT);
    let result: Vec<i64> = script
        .key(format!("login:attempts:{}", ip))
        .key(format!("login:lockout:{}", ip))
        .arg(MAX_ATTEMPTS)
        .arg(WINDOW_SECS)
        .arg(LOCKOUT_SECS)
        .invoke_async(&mut conn)
        .await?;

    if result.first() == Some(&1) {
        Ok(RateLimitDecision::Allowed {
            remaining: result.get(1).copied().unwrap_or(0).max(0) as u32,
        })
    } else {
        Ok(RateLimitDecision::LockedOut {
            retry_after: result.get(1).copied().unwrap_or(LOCKOUT_SECS as i64).max(1) as u64,
        })
    }
}

/// Drops the attempt counter and lockout marker for an IP
///
/// Called on successful login so earlier typos within the window do not
/// count against the next attempt. Best-effort like the check itself.
pub async fn clear_login_attempts(state: &AppState, ip: &str) {
    let mut conn = state.cache_connection();

    let result: Result<(), redis::RedisError> = redis::pipe()
        .del(format!("login:attempts:{}", ip))
        .ignore()
        .del(format!("login:lockout:{}", ip))
        .ignore()
        .query_async(&mut conn)
        .await;

    if let Err(e) = result {
        tracing::warn!(ip = %ip, error = %e, "Failed to clear login rate limit");
    }
}

/// Client IP, preferring X-Forwarded-For when behind a proxy
pub fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits() {
        assert_eq!(MAX_ATTEMPTS, 5);
        assert_eq!(LOCKOUT_SECS, 1800);
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();

        assert_eq!(client_ip(&headers, addr), "203.0.113.9");
    }

    #[test]
    fn test_client_ip_falls_back_to_socket() {
        let headers = HeaderMap::new();
        let addr: SocketAddr = "192.0.2.7:9999".parse().unwrap();

        assert_eq!(client_ip(&headers, addr), "192.0.2.7");
    }
}
