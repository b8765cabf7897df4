/// Task list endpoint
///
/// # Endpoint
///
/// ```text
/// GET /v1/tasks?q=report&status=todo&priority=high&page=2
/// ```
///
/// Lists tasks created by the authenticated user, newest first, ten per
/// page. Each distinct combination of user, filters, and page is one cache
/// entry; a miss queries the database and populates the cache.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{app::AppState, error::ApiResult};
use taskdesk_shared::models::task::{Task, TaskFilter, TaskPriority, TaskStatus};
use taskdesk_shared::models::user::User;

use super::TaskResponse;

/// List query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Free-text query against title and description
    #[serde(default)]
    pub q: String,

    /// Status filter
    pub status: Option<TaskStatus>,

    /// Priority filter
    pub priority: Option<TaskPriority>,

    /// 1-based page number
    pub page: Option<u32>,
}

impl ListParams {
    fn into_filter(self) -> TaskFilter {
        TaskFilter {
            query: self.q,
            status: self.status,
            priority: self.priority,
            page: self.page.unwrap_or(1),
        }
    }
}

/// Paginated list response
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub tasks: Vec<TaskResponse>,
    pub page: u32,
    pub num_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
    pub total: i64,
}

/// List handler
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListResponse>> {
    let filter = params.into_filter();

    let page = match state.cache.get_list(user.id, &filter).await {
        Some(page) => page,
        None => {
            let page = Task::list(&state.db, user.id, &filter).await?;
            state.cache.put_list(user.id, &filter, &page).await;
            page
        }
    };

    Ok(Json(ListResponse {
        tasks: page.tasks.iter().map(TaskResponse::from).collect(),
        page: page.number,
        num_pages: page.num_pages,
        has_previous: page.has_previous,
        has_next: page.has_next,
        total: page.total,
    }))
}
