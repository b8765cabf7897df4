/// Task creation endpoint
///
/// # Endpoint
///
/// ```text
/// POST /v1/tasks
/// Content-Type: application/json
///
/// {
///   "title": "Write quarterly report",
///   "description": "Numbers from finance are in the shared drive",
///   "status": "todo",
///   "priority": "high",
///   "assigned_to": "uuid",
///   "due_date": "2026-09-15"
/// }
/// ```
///
/// The creator becomes the owner and is seeded into the visibility set
/// along with the assignee. After the insert commits, the creator's and
/// assignee's cached lists are invalidated and the change is fanned out as
/// notifications.

use axum::{extract::State, Extension, Json};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{validation_details, ApiResult},
};
use taskdesk_shared::models::notification::{ActivityAction, TaskActivity};
use taskdesk_shared::models::task::{
    validate_task_fields, CreateTask, Task, TaskPriority, TaskStatus,
};
use taskdesk_shared::models::user::User;

use super::TaskResponse;

/// Create request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Task title
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,

    /// Detailed description
    #[serde(default)]
    pub description: String,

    /// Initial status (default: todo)
    pub status: Option<TaskStatus>,

    /// Priority (default: medium)
    pub priority: Option<TaskPriority>,

    /// Optional assignee
    pub assigned_to: Option<Uuid>,

    /// Optional due date, not in the past
    pub due_date: Option<NaiveDate>,
}

/// Create handler
///
/// # Errors
///
/// - `422 Unprocessable Entity`: empty title, past due date, or completed
///   status without an assignee
pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    req.validate().map_err(validation_details)?;

    let status = req.status.unwrap_or(TaskStatus::Todo);
    let priority = req.priority.unwrap_or(TaskPriority::Medium);

    validate_task_fields(status, req.assigned_to, req.due_date, Utc::now().date_naive())?;

    let task = Task::create(
        &state.db,
        CreateTask {
            title: req.title,
            description: req.description,
            status,
            priority,
            created_by: user.id,
            assigned_to: req.assigned_to,
            due_date: req.due_date,
        },
    )
    .await?;

    TaskActivity::record(
        &state.db,
        task.id,
        user.id,
        ActivityAction::Created,
        &format!("Task \"{}\" was created", task.title),
        &task.notification_audience(user.id),
    )
    .await?;

    state
        .cache
        .invalidate_task(task.id, &task.affected_users())
        .await;

    tracing::info!(task_id = %task.id, user_id = %user.id, "Task created");

    super::task_json(&task)
}
