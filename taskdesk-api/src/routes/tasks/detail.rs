/// Task detail endpoint
///
/// # Endpoint
///
/// ```text
/// GET /v1/tasks/:id
/// ```
///
/// The detail snapshot is cached by task ID alone and shared by every
/// viewer. Authorization runs against the retrieved snapshot, after the
/// cache or database read, which keeps the 403/404 split identical on both
/// paths: an absent task is 404 for everyone, an existing task the caller
/// may not view is 403 for everyone.
///
/// # Errors
///
/// - `403 Forbidden`: task exists but the caller may not view it
/// - `404 Not Found`: no such task

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use taskdesk_shared::auth::policy;
use taskdesk_shared::models::task::Task;
use taskdesk_shared::models::user::User;

use super::TaskResponse;

/// Detail handler
pub async fn get_task(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
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

    super::task_json(&task)
}
