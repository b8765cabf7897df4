/// Cache key construction
///
/// All Redis keys used by the task cache are built here so the formats live
/// in one place:
///
/// - `task:detail:{task_id}`: one detail snapshot per task, shared by every
///   viewer (authorization is applied after retrieval, not baked into the
///   key).
/// - `task:listgen:{user_id}`: a per-user generation counter. Bumping it
///   orphans every list entry for that user at once, so invalidation never
///   needs to enumerate filter and page combinations.
/// - `task:list:{user_id}:g{gen}:...`: one list page per user, generation,
///   and filter combination.
///
/// Orphaned list entries are unreachable once the generation moves on and
/// are reclaimed by their TTL.

use uuid::Uuid;

use crate::models::task::TaskFilter;

/// Key for a task's cached detail snapshot
pub fn detail_key(task_id: Uuid) -> String {
    format!("task:detail:{}", task_id)
}

/// Key for a user's list generation counter
pub fn list_gen_key(user_id: Uuid) -> String {
    format!("task:listgen:{}", user_id)
}

/// Key for one cached list page
///
/// Embeds the generation so a single INCR of the counter invalidates every
/// page and filter variant for the user.
pub fn list_key(user_id: Uuid, generation: u64, filter: &TaskFilter) -> String {
    let status = filter.status.map(|s| s.as_str()).unwrap_or("any");
    let priority = filter.priority.map(|p| p.as_str()).unwrap_or("any");

    format!(
        "task:list:{}:g{}:q={}:s={}:p={}:page={}",
        user_id,
        generation,
        filter.query,
        status,
        priority,
        filter.page(),
    )
}
