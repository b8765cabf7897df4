/// Notification endpoints
///
/// # Endpoints
///
/// - `GET /v1/notifications` - Unread notifications for the caller
/// - `POST /v1/notifications/:id/read` - Mark one as read
///
/// Notifications are created by the task write paths and the worker; this
/// surface only reads and acknowledges them. Read notifications age out via
/// the worker's cleanup job.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use taskdesk_shared::models::notification::Notification;
use taskdesk_shared::models::user::User;

/// One notification as returned to the client
#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub id: String,
    /// Null once the task has been deleted
    pub task_id: Option<String>,
    pub message: String,
    pub created_at: String,
}

impl From<&Notification> for NotificationResponse {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id.to_string(),
            task_id: n.task_id.map(|id| id.to_string()),
            message: n.message.clone(),
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

/// Lists the caller's unread notifications, newest first
pub async fn list_unread(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> ApiResult<Json<Vec<NotificationResponse>>> {
    let notifications = Notification::unread_for_user(&state.db, user.id).await?;
    Ok(Json(
        notifications.iter().map(NotificationResponse::from).collect(),
    ))
}

/// Marks one of the caller's notifications as read
///
/// # Errors
///
/// - `404 Not Found`: no such unread notification for this user
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    if !Notification::mark_read(&state.db, id, user.id).await? {
        return Err(ApiError::NotFound("Notification not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "status": "read" })))
}
