/// Task activity endpoint
///
/// # Endpoint
///
/// ```text
/// GET /v1/tasks/:id/activity
/// ```
///
/// Returns the most recent changes recorded against a task, newest first.
/// Visibility follows the detail endpoint: the task is fetched first and
/// `can_view` decides, so the 403/404 split matches `GET /v1/tasks/:id`.
///
/// # Errors
///
/// - `403 Forbidden`: task exists but the caller may not view it
/// - `404 Not Found`: no such task

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
use taskdesk_shared::auth::policy;
use taskdesk_shared::models::notification::TaskActivity;
use taskdesk_shared::models::task::Task;
use taskdesk_shared::models::user::User;

/// Entries returned per request
const ACTIVITY_LIMIT: i64 = 50;

/// One activity entry as returned to the client
#[derive(Debug, Serialize, Deserialize)]
pub struct ActivityResponse {
    pub id: String,
    pub actor_id: String,
    pub action: String,
    pub detail: String,
    pub created_at: String,
}

impl From<&TaskActivity> for ActivityResponse {
    fn from(a: &TaskActivity) -> Self {
        Self {
            id: a.id.to_string(),
            actor_id: a.actor_id.to_string(),
            action: a.action.as_str().to_string(),
            detail: a.detail.clone(),
            created_at: a.created_at.to_rfc3339(),
        }
    }
}

/// Activity handler
pub async fn task_activity(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ActivityResponse>>> {
    let task = match state.cache.get_detail(id).await {
        Some(task) => task,
        None => {
            let task = Task::find_by_id(&state.db, id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
            state.cache.put_detail(&task).await;
            task
        }
    };

    if !policy::can_view(&task, &user) {
        return Err(ApiError::Forbidden(
            "You do not have permission to view this task".to_string(),
        ));
    }

    let activity = TaskActivity::for_task(&state.db, id, ACTIVITY_LIMIT).await?;
    Ok(Json(activity.iter().map(ActivityResponse::from).collect()))
}
