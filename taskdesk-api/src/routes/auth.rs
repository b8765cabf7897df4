/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register a new user
/// - `POST /v1/auth/login` - Login and get tokens (per-IP rate limited)
/// - `POST /v1/auth/refresh` - Exchange a refresh token for a new access token
/// - `POST /v1/auth/change-password` - Change own password (authenticated)
///
/// Login failures are answered identically for unknown emails and wrong
/// passwords, so the endpoint cannot be used to enumerate accounts. Each
/// failure increments the account's counter; five failures lock the account
/// until an administrator intervenes.

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    Extension, Json,
};
use std::net::SocketAddr;
use serde::{Deserialize, Serialize};
use taskdesk_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, Role, User},
};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (also validated for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Optional display name
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// User ID
    pub user_id: String,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// User ID
    pub user_id: String,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,

    /// Whether the user must change their password before continuing
    pub requires_password_change: bool,
}

/// Refresh token request
#[derive(Debug, Deserialize, Serialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// Change password request
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    /// Current password
    pub current_password: String,

    /// New password
    pub new_password: String,
}

/// Registers a new user
///
/// New accounts always get the regular user role; admins and managers are
/// promoted by an administrator afterwards.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: validation failed or weak password
/// - `409 Conflict`: email already registered
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    req.validate().map_err(validation_details)?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            password_hash,
            name: req.name,
            role: Role::User,
        },
    )
    .await?;

    let access_token = jwt::create_token(
        &jwt::Claims::new(user.id, user.role, jwt::TokenType::Access),
        state.jwt_secret(),
    )?;
    let refresh_token = jwt::create_token(
        &jwt::Claims::new(user.id, user.role, jwt::TokenType::Refresh),
        state.jwt_secret(),
    )?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok(Json(RegisterResponse {
        user_id: user.id.to_string(),
        access_token,
        refresh_token,
    }))
}

/// Authenticates a user and returns JWT tokens
///
/// # Errors
///
/// - `401 Unauthorized`: bad credentials or a deactivated account; the
///   message never reveals which
/// - `403 Forbidden`: account locked after repeated failures, which the
///   legitimate owner needs to know about
/// - `429 Too Many Requests`: IP rate limit exceeded (handled before this
///   handler runs)
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate().map_err(validation_details)?;

    let user = match User::find_by_email(&state.db, &req.email).await? {
        Some(user) => user,
        None => {
            // Hash anyway so response timing matches the wrong-password path
            let _ = password::verify_password(&req.password, DUMMY_HASH);
            return Err(invalid_credentials());
        }
    };

    if !user.is_active {
        return Err(invalid_credentials());
    }

    if user.account_locked {
        return Err(ApiError::Forbidden(
            "Account is locked due to repeated failed logins".to_string(),
        ));
    }

    if !password::verify_password(&req.password, &user.password_hash)? {
        let updated = User::record_failed_login(&state.db, user.id).await?;
        if let Some(updated) = updated {
            if updated.account_locked {
                tracing::warn!(user_id = %user.id, "Account locked after repeated failed logins");
            }
        }
        return Err(invalid_credentials());
    }

    User::reset_login_attempts(&state.db, user.id).await?;

    // Earlier typos from this address no longer count against the window
    let ip = crate::middleware::rate_limit::client_ip(&headers, addr);
    crate::middleware::rate_limit::clear_login_attempts(&state, &ip).await;

    let access_token = jwt::create_token(
        &jwt::Claims::new(user.id, user.role, jwt::TokenType::Access),
        state.jwt_secret(),
    )?;
    let refresh_token = jwt::create_token(
        &jwt::Claims::new(user.id, user.role, jwt::TokenType::Refresh),
        state.jwt_secret(),
    )?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        user_id: user.id.to_string(),
        access_token,
        refresh_token,
        requires_password_change: user.requires_password_change,
    }))
}

/// Exchanges a refresh token for a new access token
///
/// The account is re-checked so deactivated or locked users cannot keep
/// minting access tokens from an old refresh token.
///
/// # Errors
///
/// - `401 Unauthorized`: invalid or expired refresh token, or the account
///   is no longer usable
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

    if !user.is_active || user.account_locked {
        return Err(ApiError::Unauthorized("Account is not usable".to_string()));
    }

    // Issue from the current role, not the role frozen into the old token
    let access_token = jwt::create_token(
        &jwt::Claims::new(user.id, user.role, jwt::TokenType::Access),
        state.jwt_secret(),
    )?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Changes the authenticated user's password
///
/// Requires the current password, enforces strength rules on the new one,
/// and clears any pending forced-change flag.
///
/// # Errors
///
/// - `401 Unauthorized`: current password is wrong
/// - `422 Unprocessable Entity`: new password too weak
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if !password::verify_password(&req.current_password, &user.password_hash)? {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    password::validate_password_strength(&req.new_password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "new_password".to_string(),
            message: e,
        }])
    })?;

    let password_hash = password::hash_password(&req.new_password)?;
    User::update_password(&state.db, user.id, &password_hash).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(Json(serde_json::json!({ "status": "password_changed" })))
}

/// A valid Argon2id hash of an unguessable value, verified against when the
/// email does not exist
const DUMMY_HASH: &str = "$argon2id$v=19$m=65536,t=3,p=4$c29tZXNhbHRzb21lc2FsdA$TGuW2HZbXGIVmYvk9Qmrr0o7DsCM8vakyiB8BpYnFh0";

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid email or password".to_string())
}
