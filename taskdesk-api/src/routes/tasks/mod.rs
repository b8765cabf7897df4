/// Task endpoints
///
/// One module per operation:
///
/// - [`list`]: `GET /v1/tasks` - filtered, paginated, cached per user
/// - [`create`]: `POST /v1/tasks`
/// - [`detail`]: `GET /v1/tasks/:id` - cached per task
/// - [`update`]: `PUT /v1/tasks/:id`
/// - [`delete`]: `DELETE /v1/tasks/:id`
/// - [`complete`]: `POST /v1/tasks/:id/complete`
/// - [`activity`]: `GET /v1/tasks/:id/activity` - recent change log
///
/// Reads go through the cache; every confirmed write calls
/// `invalidate_task` exactly once, after the database transaction commits.
/// Authorization is always applied to the retrieved task, so a cache hit
/// and a database read give the same 403/404 split.

pub mod activity;
pub mod complete;
pub mod create;
pub mod delete;
pub mod detail;
pub mod list;
pub mod update;

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use taskdesk_shared::models::task::Task;

/// Task payload returned by every task endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub created_by: String,
    pub assigned_to: Option<String>,
    pub owner_id: String,
    pub due_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

impl From<&Task> for TaskResponse {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status.as_str().to_string(),
            priority: task.priority.as_str().to_string(),
            created_by: task.created_by.to_string(),
            assigned_to: task.assigned_to.map(|id| id.to_string()),
            owner_id: task.owner_id.to_string(),
            due_date: task.due_date.map(|d| d.to_string()),
            created_at: task.created_at.to_rfc3339(),
            updated_at: task.updated_at.to_rfc3339(),
            completed_at: task.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

pub(crate) fn task_json(task: &Task) -> ApiResult<Json<TaskResponse>> {
    Ok(Json(task.into()))
}
