/// User endpoints
///
/// # Endpoints
///
/// - `GET /v1/users/me` - Current user's profile
/// - `PUT /v1/users/me` - Update own profile
/// - `POST /v1/users/:id/deactivate` - Deactivate an account (admin only)

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskdesk_shared::models::user::{Permission, UpdateUser, User};
use uuid::Uuid;
use validator::Validate;

/// Public view of a user, without credential fields
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub requires_password_change: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email,
            name: user.name,
            role: user.role.as_str().to_string(),
            is_active: user.is_active,
            requires_password_change: user.requires_password_change,
        }
    }
}

/// Profile update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    /// New email address
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// New display name; null clears it
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// Returns the authenticated user's profile
pub async fn me(Extension(user): Extension<User>) -> ApiResult<Json<UserResponse>> {
    Ok(Json(user.into()))
}

/// Updates the authenticated user's profile
///
/// # Errors
///
/// - `409 Conflict`: email already in use
/// - `422 Unprocessable Entity`: validation failed
pub async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<UpdateMeRequest>,
) -> ApiResult<Json<UserResponse>> {
    req.validate().map_err(validation_details)?;

    let updated = User::update(
        &state.db,
        user.id,
        UpdateUser {
            email: req.email,
            name: req.name.map(Some),
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(updated.into()))
}

/// Deactivates a user account
///
/// Requires the manage-users permission (admins). Deactivated users fail
/// authentication on their next request; existing tokens stop working
/// because the auth middleware reloads the account.
///
/// # Errors
///
/// - `403 Forbidden`: caller lacks the manage-users permission
/// - `400 Bad Request`: attempting to deactivate own account
/// - `404 Not Found`: no such user
pub async fn deactivate(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    if !actor.role.has_perm(Permission::ManageUsers) {
        return Err(ApiError::Forbidden(
            "Managing users requires administrator rights".to_string(),
        ));
    }

    if actor.id == id {
        return Err(ApiError::BadRequest(
            "Cannot deactivate your own account".to_string(),
        ));
    }

    if !User::deactivate(&state.db, id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %id, actor_id = %actor.id, "User deactivated");

    Ok(Json(serde_json::json!({ "status": "deactivated" })))
}
