/// Task deletion endpoint
///
/// # Endpoint
///
/// ```text
/// DELETE /v1/tasks/:id
/// ```
///
/// Notifications fan out before the row is deleted; they survive the
/// cascade with a null task reference. The activity row itself cascades
/// away with the task.
///
/// # Errors
///
/// - `403 Forbidden`: caller may not delete this task (assignees cannot)
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
use taskdesk_shared::models::notification::{ActivityAction, TaskActivity};
use taskdesk_shared::models::task::Task;
use taskdesk_shared::models::user::User;

/// Delete handler
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if !policy::can_delete(&task, &user) {
        return Err(ApiError::Forbidden(
            "You do not have permission to delete this task".to_string(),
        ));
    }

    TaskActivity::record(
        &state.db,
        task.id,
        user.id,
        ActivityAction::Deleted,
        &format!("Task \"{}\" was deleted", task.title),
        &task.notification_audience(user.id),
    )
    .await?;

    if !Task::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    state
        .cache
        .invalidate_task(task.id, &task.affected_users())
        .await;

    tracing::info!(task_id = %task.id, user_id = %user.id, "Task deleted");

    Ok(Json(serde_json::json!({ "status": "deleted" })))
}
