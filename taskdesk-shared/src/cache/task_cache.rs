/// Read-through task cache with write-path invalidation
///
/// Two families of entries, both JSON snapshots with a shared TTL:
///
/// - **Detail snapshots**, keyed by task ID only. Every viewer shares one
///   entry; handlers authorize against the snapshot's fields after
///   retrieval, so a cache hit can still come back Forbidden.
/// - **List pages**, keyed per user by filter, page, and the user's current
///   generation counter. Invalidation bumps the counter instead of deleting
///   list keys, which makes every filter and page variant for that user
///   unreachable in one INCR.
///
/// # Failure policy
///
/// The cache fails open. Read errors are treated as misses and write or
/// invalidation errors are logged and swallowed; no request is ever failed
/// because Redis is down. The TTL bounds how stale a missed invalidation
/// can leave an entry.
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::cache::task_cache::TaskCache;
/// use taskdesk_shared::models::task::Task;
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, cache: TaskCache, id: Uuid) -> Result<(), sqlx::Error> {
/// let task = match cache.get_detail(id).await {
///     Some(task) => Some(task),
///     None => {
///         let task = Task::find_by_id(&pool, id).await?;
///         if let Some(ref task) = task {
///             cache.put_detail(task).await;
///         }
///         task
///     }
/// };
/// # Ok(())
/// # }
/// ```

use redis::AsyncCommands;
use thiserror::Error;
use uuid::Uuid;

use super::client::RedisClient;
use super::keys;
use crate::models::task::{Task, TaskFilter, TaskListPage};

/// Default lifetime of cache entries in seconds
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Errors from the fallible cache internals
///
/// Public methods swallow these (fail-open); they surface only in logs and
/// in tests that exercise the internals directly.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis command failed
    #[error("Redis command failed: {0}")]
    Redis(#[from] redis::RedisError),

    /// Snapshot could not be serialized or deserialized
    #[error("Cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Task cache handle
///
/// Cheap to clone; clones share the underlying connection manager.
#[derive(Clone)]
pub struct TaskCache {
    client: RedisClient,
    ttl_secs: u64,
}

impl TaskCache {
    /// Creates a cache with the default TTL
    pub fn new(client: RedisClient) -> Self {
        Self::with_ttl(client, DEFAULT_TTL_SECS)
    }

    /// Creates a cache with a custom TTL in seconds
    pub fn with_ttl(client: RedisClient, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }

    /// Entry lifetime in seconds
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// The underlying Redis client, for callers with their own key spaces
    pub fn client(&self) -> &RedisClient {
        &self.client
    }

    /// Health check on the underlying connection
    pub async fn ping(&self) -> bool {
        self.client.ping().await.unwrap_or(false)
    }

    /// Cached detail snapshot for a task, if present
    ///
    /// Errors count as misses.
    pub async fn get_detail(&self, task_id: Uuid) -> Option<Task> {
        match self.try_get_detail(task_id).await {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!(task_id = %task_id, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Stores a task's detail snapshot
    pub async fn put_detail(&self, task: &Task) {
        if let Err(e) = self.try_put_detail(task).await {
            tracing::warn!(task_id = %task.id, error = %e, "Cache write failed, skipping");
        }
    }

    /// Cached list page for a user and filter, if present
    pub async fn get_list(&self, user_id: Uuid, filter: &TaskFilter) -> Option<TaskListPage> {
        match self.try_get_list(user_id, filter).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Stores a list page for a user and filter
    pub async fn put_list(&self, user_id: Uuid, filter: &TaskFilter, page: &TaskListPage) {
        if let Err(e) = self.try_put_list(user_id, filter, page).await {
            tracing::warn!(user_id = %user_id, error = %e, "Cache write failed, skipping");
        }
    }

    /// Invalidates everything a task mutation can have made stale
    ///
    /// Deletes the task's detail snapshot and bumps the list generation of
    /// every affected user in one pipeline. Call after the database write
    /// commits; a failure here is logged and bounded by the TTL.
    pub async fn invalidate_task(&self, task_id: Uuid, affected_users: &[Uuid]) {
        if let Err(e) = self.try_invalidate_task(task_id, affected_users).await {
            tracing::warn!(
                task_id = %task_id,
                error = %e,
                "Cache invalidation failed, stale entries expire by TTL"
            );
        }
    }

    async fn try_get_detail(&self, task_id: Uuid) -> Result<Option<Task>, CacheError> {
        let mut conn = self.client.get_connection();

        let raw: Option<String> = conn.get(keys::detail_key(task_id)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn try_put_detail(&self, task: &Task) -> Result<(), CacheError> {
        let mut conn = self.client.get_connection();

        let json = serde_json::to_string(task)?;
        let _: () = conn
            .set_ex(keys::detail_key(task.id), json, self.ttl_secs)
            .await?;
        Ok(())
    }

    async fn try_get_list(
        &self,
        user_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<Option<TaskListPage>, CacheError> {
        let mut conn = self.client.get_connection();

        let generation = self.current_generation(user_id).await?;
        let raw: Option<String> = conn.get(keys::list_key(user_id, generation, filter)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn try_put_list(
        &self,
        user_id: Uuid,
        filter: &TaskFilter,
        page: &TaskListPage,
    ) -> Result<(), CacheError> {
        let mut conn = self.client.get_connection();

        let generation = self.current_generation(user_id).await?;
        let json = serde_json::to_string(page)?;
        let _: () = conn
            .set_ex(keys::list_key(user_id, generation, filter), json, self.ttl_secs)
            .await?;
        Ok(())
    }

    async fn try_invalidate_task(
        &self,
        task_id: Uuid,
        affected_users: &[Uuid],
    ) -> Result<(), CacheError> {
        let mut conn = self.client.get_connection();

        let mut pipe = redis::pipe();
        pipe.del(keys::detail_key(task_id)).ignore();
        for &user_id in affected_users {
            pipe.incr(keys::list_gen_key(user_id), 1).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    /// A user's current list generation; a missing counter is generation 0
    async fn current_generation(&self, user_id: Uuid) -> Result<u64, CacheError> {
        let mut conn = self.client.get_connection();

        let generation: Option<u64> = conn.get(keys::list_gen_key(user_id)).await?;
        Ok(generation.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::client::RedisConfig;
    use crate::models::task::{TaskPriority, TaskStatus};
    use chrono::Utc;

    fn sample_task(creator: Uuid) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: "Cached task".to_string(),
            description: "body".to_string(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            created_by: creator,
            assigned_to: None,
            owner_id: creator,
            due_date: None,
            reminder_sent_at: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            visible_to: vec![creator],
        }
    }

    fn sample_page(task: Task) -> TaskListPage {
        TaskListPage {
            tasks: vec![task],
            number: 1,
            num_pages: 1,
            has_previous: false,
            has_next: false,
            total: 1,
        }
    }

    async fn test_cache() -> TaskCache {
        let client = RedisClient::new(RedisConfig::default_for_test())
            .await
            .expect("connect to Redis");
        TaskCache::with_ttl(client, 60)
    }

    #[test]
    fn test_detail_snapshot_roundtrips_through_json() {
        let task = sample_task(Uuid::new_v4());
        let json = serde_json::to_string(&task).expect("serialize");
        let back: Task = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.id, task.id);
        assert_eq!(back.visible_to, task.visible_to);
        assert_eq!(back.status, task.status);
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_detail_put_get_invalidate() {
        let cache = test_cache().await;
        let creator = Uuid::new_v4();
        let task = sample_task(creator);

        assert!(cache.get_detail(task.id).await.is_none());

        cache.put_detail(&task).await;
        let cached = cache.get_detail(task.id).await.expect("hit");
        assert_eq!(cached.id, task.id);

        cache.invalidate_task(task.id, &[creator]).await;
        assert!(cache.get_detail(task.id).await.is_none());
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_generation_bump_orphans_all_list_variants() {
        let cache = test_cache().await;
        let user_id = Uuid::new_v4();
        let task = sample_task(user_id);

        let page1 = TaskFilter::default();
        let filtered = TaskFilter {
            query: "report".to_string(),
            status: Some(TaskStatus::Todo),
            ..Default::default()
        };

        cache.put_list(user_id, &page1, &sample_page(task.clone())).await;
        cache.put_list(user_id, &filtered, &sample_page(task.clone())).await;
        assert!(cache.get_list(user_id, &page1).await.is_some());
        assert!(cache.get_list(user_id, &filtered).await.is_some());

        cache.invalidate_task(task.id, &[user_id]).await;

        // One bump invalidated both filter variants without touching their keys
        assert!(cache.get_list(user_id, &page1).await.is_none());
        assert!(cache.get_list(user_id, &filtered).await.is_none());
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_invalidation_scoped_to_affected_users() {
        let cache = test_cache().await;
        let writer = Uuid::new_v4();
        let bystander = Uuid::new_v4();
        let task = sample_task(writer);
        let filter = TaskFilter::default();

        cache.put_list(writer, &filter, &sample_page(task.clone())).await;
        cache.put_list(bystander, &filter, &sample_page(task.clone())).await;

        cache.invalidate_task(task.id, &[writer]).await;

        assert!(cache.get_list(writer, &filter).await.is_none());
        assert!(cache.get_list(bystander, &filter).await.is_some());
    }
}
