/// Task update endpoint
///
/// # Endpoint
///
/// ```text
/// PUT /v1/tasks/:id
/// ```
///
/// Full replacement of the editable fields. The task is loaded from the
/// database (never the cache) so the edit decision is made against current
/// state, then the write commits, and only then is the cache invalidated
/// for everyone affected, including a previous assignee who was unassigned
/// by this edit.
///
/// # Errors
///
/// - `403 Forbidden`: caller may not edit this task
/// - `404 Not Found`: no such task
/// - `422 Unprocessable Entity`: field validation failed

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult},
};
use taskdesk_shared::auth::policy;
use taskdesk_shared::models::notification::{ActivityAction, TaskActivity};
use taskdesk_shared::models::task::{
    validate_task_fields, Task, TaskPriority, TaskStatus, UpdateTask,
};
use taskdesk_shared::models::user::User;

use super::TaskResponse;

/// Update request; a full replacement of the editable fields
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub status: TaskStatus,

    pub priority: TaskPriority,

    pub assigned_to: Option<Uuid>,

    pub due_date: Option<NaiveDate>,
}

/// Update handler
pub async fn update_task(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    req.validate().map_err(validation_details)?;

    let existing = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if !policy::can_edit(&existing, &user) {
        return Err(ApiError::Forbidden(
            "You do not have permission to edit this task".to_string(),
        ));
    }

    // Status changes ride along with edits, so they need status rights too
    if req.status != existing.status && !policy::can_change_status(&existing, &user) {
        return Err(ApiError::Forbidden(
            "You do not have permission to change this task's status".to_string(),
        ));
    }

    validate_task_fields(req.status, req.assigned_to, req.due_date, Utc::now().date_naive())?;

    let status_changed = req.status != existing.status;
    let new_status = req.status;

    let task = Task::update(
        &state.db,
        id,
        UpdateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            assigned_to: req.assigned_to,
            due_date: req.due_date,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let (action, detail) = if status_changed && new_status.is_completed() {
        (
            ActivityAction::Completed,
            format!("Task \"{}\" was completed", task.title),
        )
    } else if status_changed {
        (
            ActivityAction::StatusChanged,
            format!("Task \"{}\" moved to {}", task.title, new_status.as_str()),
        )
    } else {
        (
            ActivityAction::Updated,
            format!("Task \"{}\" was updated", task.title),
        )
    };

    TaskActivity::record(
        &state.db,
        task.id,
        user.id,
        action,
        &detail,
        &task.notification_audience(user.id),
    )
    .await?;

    // A reassignment leaves the old assignee's cached lists stale too
    let mut affected = task.affected_users();
    for user_id in existing.affected_users() {
        if !affected.contains(&user_id) {
            affected.push(user_id);
        }
    }
    state.cache.invalidate_task(task.id, &affected).await;

    tracing::info!(task_id = %task.id, user_id = %user.id, "Task updated");

    super::task_json(&task)
}
