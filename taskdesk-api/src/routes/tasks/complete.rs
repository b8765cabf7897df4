/// Task completion endpoint
///
/// # Endpoint
///
/// ```text
/// POST /v1/tasks/:id/complete
/// ```
///
/// Marks a task completed. The status and completion timestamp change in a
/// single UPDATE, so the pair can never be observed out of sync. Completing
/// an already completed task is a no-op that returns the task unchanged.
///
/// # Errors
///
/// - `403 Forbidden`: caller may not change this task's status
/// - `404 Not Found`: no such task
/// - `422 Unprocessable Entity`: task has no assignee

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use taskdesk_shared::auth::policy;
use taskdesk_shared::models::notification::{ActivityAction, TaskActivity};
use taskdesk_shared::models::task::{Task, TaskStatus};
use taskdesk_shared::models::user::User;

use super::TaskResponse;

/// Complete handler
pub async fn complete_task(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if !policy::can_change_status(&task, &user) {
        return Err(ApiError::Forbidden(
            "You do not have permission to change this task's status".to_string(),
        ));
    }

    if task.assigned_to.is_none() {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "status".to_string(),
            message: "Cannot mark a task as completed without an assignee".to_string(),
        }]));
    }

    if task.status.is_completed() {
        return super::task_json(&task);
    }

    let task = Task::set_status(&state.db, id, TaskStatus::Completed)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    TaskActivity::record(
        &state.db,
        task.id,
        user.id,
        ActivityAction::Completed,
        &format!("Task \"{}\" was completed", task.title),
        &task.notification_audience(user.id),
    )
    .await?;

    state
        .cache
        .invalidate_task(task.id, &task.affected_users())
        .await;

    tracing::info!(task_id = %task.id, user_id = %user.id, "Task completed");

    super::task_json(&task)
}
