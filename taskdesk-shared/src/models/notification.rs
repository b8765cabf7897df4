/// Task activity log and notification fan-out
///
/// Every mutation of a task records one `task_activity` row describing what
/// happened, then fans out `notifications` rows to the task's audience
/// (everyone who can see the task, minus the acting user).
///
/// Activity rows are append-only; old rows are pruned by the cleanup job via
/// [`TaskActivity::delete_older_than`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Kind of change recorded against a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    StatusChanged,
    Completed,
    Deleted,
}

impl ActivityAction {
    /// Action as the string stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Created => "created",
            ActivityAction::Updated => "updated",
            ActivityAction::StatusChanged => "status_changed",
            ActivityAction::Completed => "completed",
            ActivityAction::Deleted => "deleted",
        }
    }
}

/// One recorded change to a task
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskActivity {
    /// Unique activity ID
    pub id: Uuid,

    /// Task the change applies to
    pub task_id: Uuid,

    /// User who made the change
    pub actor_id: Uuid,

    /// What happened
    pub action: ActivityAction,

    /// Human-readable summary, e.g. "status changed to in_progress"
    pub detail: String,

    /// When the change happened
    pub created_at: DateTime<Utc>,
}

/// A per-user notification about a task change
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    /// Unique notification ID
    pub id: Uuid,

    /// Recipient
    pub user_id: Uuid,

    /// Task the notification is about; NULL once the task is deleted
    pub task_id: Option<Uuid>,

    /// Notification text
    pub message: String,

    /// Whether the recipient has read it
    pub read: bool,

    /// When the notification was created
    pub created_at: DateTime<Utc>,
}

impl TaskActivity {
    /// Records an activity row and fans out notifications to the audience
    ///
    /// The two inserts share a transaction so a notification never exists
    /// without its activity row. An empty audience records activity only.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn record(
        pool: &PgPool,
        task_id: Uuid,
        actor_id: Uuid,
        action: ActivityAction,
        detail: &str,
        audience: &[Uuid],
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let activity = sqlx::query_as::<_, TaskActivity>(
            "INSERT INTO task_activity (task_id, actor_id, action, detail)
             VALUES ($1, $2, $3, $4)
             RETURNING id, task_id, actor_id, action, detail, created_at",
        )
        .bind(task_id)
        .bind(actor_id)
        .bind(action)
        .bind(detail)
        .fetch_one(&mut *tx)
        .await?;

        if !audience.is_empty() {
            sqlx::query(
                "INSERT INTO notifications (user_id, task_id, message)
                 SELECT u, $1, $2 FROM unnest($3::uuid[]) AS u",
            )
            .bind(task_id)
            .bind(detail)
            .bind(audience)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(activity)
    }

    /// Recent activity for a task, newest first
    pub async fn for_task(
        pool: &PgPool,
        task_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskActivity>(
            "SELECT id, task_id, actor_id, action, detail, created_at
             FROM task_activity
             WHERE task_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(task_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Deletes activity rows older than the given number of days
    ///
    /// Used by the cleanup job; returns how many rows were removed.
    pub async fn delete_older_than(pool: &PgPool, days: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM task_activity
             WHERE created_at < NOW() - make_interval(days => $1)",
        )
        .bind(days)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

impl Notification {
    /// Unread notifications for a user, newest first
    pub async fn unread_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            "SELECT id, user_id, task_id, message, read, created_at
             FROM notifications
             WHERE user_id = $1 AND read = FALSE
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Marks a user's notification as read; returns whether a row changed
    pub async fn mark_read(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes read notifications older than the given number of days
    pub async fn delete_read_older_than(pool: &PgPool, days: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM notifications
             WHERE read = TRUE AND created_at < NOW() - make_interval(days => $1)",
        )
        .bind(days)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_as_str() {
        assert_eq!(ActivityAction::Created.as_str(), "created");
        assert_eq!(ActivityAction::StatusChanged.as_str(), "status_changed");
        assert_eq!(ActivityAction::Deleted.as_str(), "deleted");
    }

    #[test]
    fn test_action_serde_snake_case() {
        let json = serde_json::to_string(&ActivityAction::StatusChanged).unwrap();
        assert_eq!(json, "\"status_changed\"");
    }
}
