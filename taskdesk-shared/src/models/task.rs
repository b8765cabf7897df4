/// Task model and database operations
///
/// Tasks are the core entity of Taskdesk. Each task has a single creator and
/// owner, an optional assignee, and an explicit visibility set (the users
/// allowed to view it). The visibility set always contains the creator and,
/// when present, the assignee.
///
/// # Invariants
///
/// - `completed_at` is set if and only if `status` is `completed`; every
///   UPDATE that touches status couples `completed_at` in the same statement.
/// - A task cannot become `completed` without an assignee (validated before
///   any write).
/// - `due_date`, when supplied at create/update time, must not be in the past.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in_progress', 'completed');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(200) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     status task_status NOT NULL DEFAULT 'todo',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     created_by UUID NOT NULL REFERENCES users(id),
///     assigned_to UUID REFERENCES users(id),
///     owner_id UUID NOT NULL REFERENCES users(id),
///     due_date DATE,
///     reminder_sent_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     completed_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::models::task::{CreateTask, Task, TaskPriority, TaskStatus};
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     title: "Write quarterly report".to_string(),
///     description: String::new(),
///     status: TaskStatus::Todo,
///     priority: TaskPriority::High,
///     created_by: user_id,
///     assigned_to: None,
///     due_date: None,
/// }).await?;
/// assert!(task.visible_to.contains(&user_id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Tasks per list page
pub const PAGE_SIZE: i64 = 10;

const TASK_COLUMNS: &str = "id, title, description, status, priority, created_by, assigned_to, \
     owner_id, due_date, reminder_sent_at, created_at, updated_at, completed_at, \
     (SELECT COALESCE(array_agg(user_id), ARRAY[]::uuid[]) \
      FROM task_visibility v WHERE v.task_id = tasks.id) AS visible_to";

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started
    Todo,

    /// Being worked on
    InProgress,

    /// Finished; `completed_at` is set
    Completed,
}

impl TaskStatus {
    /// Status as the string stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Whether this is the terminal completed status
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

/// Task priority level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    /// Priority as the string stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

/// Task model representing a task row plus its visibility set
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Task title
    pub title: String,

    /// Detailed description (may be empty)
    pub description: String,

    /// Current workflow status
    pub status: TaskStatus,

    /// Priority level
    pub priority: TaskPriority,

    /// User who created the task
    pub created_by: Uuid,

    /// User assigned to complete the task
    pub assigned_to: Option<Uuid>,

    /// User who owns the task (the creator at creation time)
    pub owner_id: Uuid,

    /// Date the task is due
    pub due_date: Option<NaiveDate>,

    /// When a deadline reminder was sent (idempotence marker for the worker)
    pub reminder_sent_at: Option<DateTime<Utc>>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,

    /// When the task was completed; set iff status is completed
    pub completed_at: Option<DateTime<Utc>>,

    /// Users allowed to view this task; always contains the creator and,
    /// when set, the assignee
    pub visible_to: Vec<Uuid>,
}

impl Task {
    /// Users whose cached list views a mutation of this task can affect:
    /// creator, owner, and assignee.
    pub fn affected_users(&self) -> Vec<Uuid> {
        let mut users = vec![self.created_by, self.owner_id];
        if let Some(assignee) = self.assigned_to {
            users.push(assignee);
        }
        users.sort_unstable();
        users.dedup();
        users
    }

    /// Audience for activity notifications: everyone who can see the task
    /// plus creator/owner/assignee, minus the acting user.
    pub fn notification_audience(&self, actor: Uuid) -> Vec<Uuid> {
        let mut audience = self.visible_to.clone();
        audience.extend(self.affected_users());
        audience.sort_unstable();
        audience.dedup();
        audience.retain(|&u| u != actor);
        audience
    }
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    /// Task title
    pub title: String,

    /// Detailed description
    pub description: String,

    /// Initial status
    pub status: TaskStatus,

    /// Priority level
    pub priority: TaskPriority,

    /// Creating user; also becomes the owner
    pub created_by: Uuid,

    /// Optional assignee
    pub assigned_to: Option<Uuid>,

    /// Optional due date
    pub due_date: Option<NaiveDate>,
}

/// Input for editing a task
///
/// Edits are full replacements of the editable fields, matching the edit
/// form; immutable fields (creator, owner) are not represented.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

/// A field that failed task validation, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidField {
    /// Field name as it appears in the API payload
    pub field: String,

    /// Human-readable reason
    pub message: String,
}

/// Validates task field invariants shared by create and update
///
/// Checks, against `today`:
/// - the due date is not in the past;
/// - a completed task has an assignee.
///
/// Returns every violated field so callers can surface field-level errors.
pub fn validate_task_fields(
    status: TaskStatus,
    assigned_to: Option<Uuid>,
    due_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(), Vec<InvalidField>> {
    let mut errors = Vec::new();

    if let Some(due) = due_date {
        if due < today {
            errors.push(InvalidField {
                field: "due_date".to_string(),
                message: "Due date cannot be in the past".to_string(),
            });
        }
    }

    if status.is_completed() && assigned_to.is_none() {
        errors.push(InvalidField {
            field: "status".to_string(),
            message: "Cannot mark a task as completed without an assignee".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Filters applied to the task list query
///
/// These are exactly the parameters that make up a list cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    /// Free-text query matched against title and description
    #[serde(default)]
    pub query: String,

    /// Restrict to a single status
    pub status: Option<TaskStatus>,

    /// Restrict to a single priority
    pub priority: Option<TaskPriority>,

    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

impl TaskFilter {
    /// Page clamped to at least 1
    pub fn page(&self) -> u32 {
        self.page.max(1)
    }
}

/// One page of task list results, the unit cached by the list cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskListPage {
    /// Tasks on this page, newest first
    pub tasks: Vec<Task>,

    /// 1-based page number
    pub number: u32,

    /// Total number of pages (at least 1)
    pub num_pages: u32,

    /// Whether a previous page exists
    pub has_previous: bool,

    /// Whether a next page exists
    pub has_next: bool,

    /// Total matching tasks across all pages
    pub total: i64,
}

impl Task {
    /// Creates a new task and seeds its visibility set
    ///
    /// The visibility set is seeded with the creator and, when present, the
    /// assignee. The creator also becomes the owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails. Field invariants
    /// must already have been checked via [`validate_task_fields`].
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO tasks (title, description, status, priority, created_by,
                                assigned_to, owner_id, due_date, completed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $5, $7,
                     CASE WHEN $3 = 'completed'::task_status THEN NOW() ELSE NULL END)
             RETURNING {TASK_COLUMNS}"
        );
        let mut task = sqlx::query_as::<_, Task>(&query)
            .bind(&data.title)
            .bind(&data.description)
            .bind(data.status)
            .bind(data.priority)
            .bind(data.created_by)
            .bind(data.assigned_to)
            .bind(data.due_date)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO task_visibility (task_id, user_id)
             SELECT $1, u FROM unnest($2::uuid[]) AS u
             ON CONFLICT DO NOTHING",
        )
        .bind(task.id)
        .bind(seed_visibility(data.created_by, data.assigned_to))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        task.visible_to = seed_visibility(data.created_by, data.assigned_to);
        Ok(task)
    }

    /// Finds a task by ID, including its visibility set
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists tasks created by a user, filtered and paginated
    ///
    /// The free-text query matches title and description case-insensitively.
    /// Results are ordered newest first; pages hold [`PAGE_SIZE`] tasks.
    pub async fn list(
        pool: &PgPool,
        user_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<TaskListPage, sqlx::Error> {
        let page = filter.page();
        let offset = (page as i64 - 1) * PAGE_SIZE;

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM tasks
             WHERE created_by = $1
               AND ($2 = '' OR title ILIKE '%' || $2 || '%' OR description ILIKE '%' || $2 || '%')
               AND ($3::task_status IS NULL OR status = $3)
               AND ($4::task_priority IS NULL OR priority = $4)",
        )
        .bind(user_id)
        .bind(&filter.query)
        .bind(filter.status)
        .bind(filter.priority)
        .fetch_one(pool)
        .await?;

        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE created_by = $1
               AND ($2 = '' OR title ILIKE '%' || $2 || '%' OR description ILIKE '%' || $2 || '%')
               AND ($3::task_status IS NULL OR status = $3)
               AND ($4::task_priority IS NULL OR priority = $4)
             ORDER BY created_at DESC
             LIMIT $5 OFFSET $6"
        );
        let tasks = sqlx::query_as::<_, Task>(&query)
            .bind(user_id)
            .bind(&filter.query)
            .bind(filter.status)
            .bind(filter.priority)
            .bind(PAGE_SIZE)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let num_pages = ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1) as u32;

        Ok(TaskListPage {
            tasks,
            number: page,
            num_pages,
            has_previous: page > 1,
            has_next: page < num_pages,
            total,
        })
    }

    /// Replaces a task's editable fields and re-seeds visibility
    ///
    /// `completed_at` is coupled to the new status in the same statement:
    /// set (preserving an earlier completion time) when the status is
    /// completed, cleared otherwise. The visibility set is extended with the
    /// creator and the new assignee.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE tasks
             SET title = $2,
                 description = $3,
                 status = $4,
                 priority = $5,
                 assigned_to = $6,
                 due_date = $7,
                 completed_at = CASE WHEN $4 = 'completed'::task_status
                                     THEN COALESCE(completed_at, NOW())
                                     ELSE NULL END,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {TASK_COLUMNS}"
        );
        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(&data.title)
            .bind(&data.description)
            .bind(data.status)
            .bind(data.priority)
            .bind(data.assigned_to)
            .bind(data.due_date)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(mut task) = task else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            "INSERT INTO task_visibility (task_id, user_id)
             SELECT $1, u FROM unnest($2::uuid[]) AS u
             ON CONFLICT DO NOTHING",
        )
        .bind(task.id)
        .bind(seed_visibility(task.created_by, task.assigned_to))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        for user in seed_visibility(task.created_by, task.assigned_to) {
            if !task.visible_to.contains(&user) {
                task.visible_to.push(user);
            }
        }
        Ok(Some(task))
    }

    /// Sets a task's status atomically with its completion timestamp
    ///
    /// A single UPDATE sets `completed_at` when the new status is completed
    /// (preserving an earlier completion time) and clears it otherwise, so
    /// the iff-invariant holds even if the process dies mid-request.
    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks
             SET status = $2,
                 completed_at = CASE WHEN $2 = 'completed'::task_status
                                     THEN COALESCE(completed_at, NOW())
                                     ELSE NULL END,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {TASK_COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a task
    ///
    /// Visibility rows, activity, and notifications cascade away with it.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Tasks due within the next `days` days that still need a reminder
    ///
    /// Skips completed tasks and tasks already reminded; used by the
    /// deadline-check job.
    pub async fn due_for_reminder(pool: &PgPool, days: i32) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE due_date IS NOT NULL
               AND due_date >= CURRENT_DATE
               AND due_date <= CURRENT_DATE + $1
               AND status <> 'completed'
               AND reminder_sent_at IS NULL
             ORDER BY due_date ASC"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(days)
            .fetch_all(pool)
            .await
    }

    /// Claims the reminder for a task
    ///
    /// Conditional on `reminder_sent_at` still being unset, so concurrent or
    /// repeated deadline scans send at most one reminder per task. Returns
    /// whether this caller won the claim.
    pub async fn claim_reminder(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks SET reminder_sent_at = NOW()
             WHERE id = $1 AND reminder_sent_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// A user's open tasks ordered by due date (soonest first, undated last)
    ///
    /// Used by the daily digest job.
    pub async fn open_for_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE owner_id = $1 AND status <> 'completed'
             ORDER BY due_date ASC NULLS LAST, created_at DESC"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }
}

/// Visibility rows every task must carry: creator plus assignee when set
fn seed_visibility(created_by: Uuid, assigned_to: Option<Uuid>) -> Vec<Uuid> {
    let mut users = vec![created_by];
    if let Some(assignee) = assigned_to {
        if assignee != created_by {
            users.push(assignee);
        }
    }
    users
}
