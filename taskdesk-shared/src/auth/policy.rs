/// Task authorization predicates
///
/// Every task-level access decision in Taskdesk goes through the four
/// predicates in this module. They are pure functions of a task and a user:
/// no I/O, no clock, no configuration. Handlers fetch both rows first (the
/// task possibly from cache) and then ask the predicate, so cached and
/// uncached reads are authorized identically.
///
/// # Rules
///
/// - **view**: admins and roles with the view-all permission see everything;
///   otherwise the user must be the creator, owner, or assignee, or appear
///   in the task's visibility set.
/// - **edit**: admins, the creator, the owner, or the assignee.
/// - **delete**: admins, the creator, or the owner. Assignees cannot delete.
/// - **change status**: anyone who can edit, plus roles holding the
///   change-status permission for tasks they can view.
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::auth::policy;
/// use taskdesk_shared::models::{task::Task, user::User};
///
/// fn render(task: &Task, user: &User) {
///     if policy::can_edit(task, user) {
///         // show the edit form
///     }
/// }
/// ```

use crate::models::task::Task;
use crate::models::user::{Permission, User};

/// Whether the user may view the task
pub fn can_view(task: &Task, user: &User) -> bool {
    if user.role.is_superuser() || user.role.has_perm(Permission::ViewAllTasks) {
        return true;
    }

    is_participant(task, user) || task.visible_to.contains(&user.id)
}

/// Whether the user may edit the task's fields
pub fn can_edit(task: &Task, user: &User) -> bool {
    user.role.is_superuser() || is_participant(task, user)
}

/// Whether the user may delete the task
///
/// Stricter than edit: the assignee can work a task but not remove it.
pub fn can_delete(task: &Task, user: &User) -> bool {
    user.role.is_superuser() || task.created_by == user.id || task.owner_id == user.id
}

/// Whether the user may change the task's status
///
/// Editors always can. Roles holding the change-status permission can for
/// any task they are allowed to view, even without edit rights.
pub fn can_change_status(task: &Task, user: &User) -> bool {
    if can_edit(task, user) {
        return true;
    }

    user.role.has_perm(Permission::ChangeTaskStatus) && can_view(task, user)
}

/// Creator, owner, or assignee
fn is_participant(task: &Task, user: &User) -> bool {
    task.created_by == user.id
        || task.owner_id == user.id
        || task.assigned_to == Some(user.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskPriority, TaskStatus};
    use crate::models::user::Role;
    use chrono::Utc;
    use uuid::Uuid;

    fn user_with_role(role: Role) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password_hash: "hash".to_string(),
            name: Some("Test User".to_string()),
            role,
            is_active: true,
            account_locked: false,
            failed_login_attempts: 0,
            last_login_attempt: None,
            requires_password_change: false,
            last_password_change: now,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    fn task_by(creator: Uuid) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: "Test task".to_string(),
            description: String::new(),
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

    #[test]
    fn test_creator_has_all_rights() {
        let user = user_with_role(Role::User);
        let task = task_by(user.id);

        assert!(can_view(&task, &user));
        assert!(can_edit(&task, &user));
        assert!(can_delete(&task, &user));
        assert!(can_change_status(&task, &user));
    }

    #[test]
    fn test_stranger_has_no_rights() {
        let creator = Uuid::new_v4();
        let user = user_with_role(Role::User);
        let task = task_by(creator);

        assert!(!can_view(&task, &user));
        assert!(!can_edit(&task, &user));
        assert!(!can_delete(&task, &user));
        assert!(!can_change_status(&task, &user));
    }

    #[test]
    fn test_assignee_can_edit_but_not_delete() {
        let creator = Uuid::new_v4();
        let user = user_with_role(Role::User);
        let mut task = task_by(creator);
        task.assigned_to = Some(user.id);

        assert!(can_view(&task, &user));
        assert!(can_edit(&task, &user));
        assert!(!can_delete(&task, &user));
        assert!(can_change_status(&task, &user));
    }

    #[test]
    fn test_visibility_set_grants_view_only() {
        let creator = Uuid::new_v4();
        let user = user_with_role(Role::User);
        let mut task = task_by(creator);
        task.visible_to.push(user.id);

        assert!(can_view(&task, &user));
        assert!(!can_edit(&task, &user));
        assert!(!can_delete(&task, &user));
        assert!(!can_change_status(&task, &user));
    }

    #[test]
    fn test_admin_has_all_rights_everywhere() {
        let creator = Uuid::new_v4();
        let admin = user_with_role(Role::Admin);
        let task = task_by(creator);

        assert!(can_view(&task, &admin));
        assert!(can_edit(&task, &admin));
        assert!(can_delete(&task, &admin));
        assert!(can_change_status(&task, &admin));
    }

    #[test]
    fn test_manager_can_change_status_of_visible_tasks() {
        let creator = Uuid::new_v4();
        let manager = user_with_role(Role::Manager);
        let mut task = task_by(creator);

        // Manager cannot see this task, so no status rights either
        assert!(!can_view(&task, &manager));
        assert!(!can_change_status(&task, &manager));

        // Once visible, status change is allowed without edit rights
        task.visible_to.push(manager.id);
        assert!(can_view(&task, &manager));
        assert!(!can_edit(&task, &manager));
        assert!(can_change_status(&task, &manager));
        assert!(!can_delete(&task, &manager));
    }

    #[test]
    fn test_owner_differs_from_creator() {
        let creator = Uuid::new_v4();
        let owner = user_with_role(Role::User);
        let mut task = task_by(creator);
        task.owner_id = owner.id;

        assert!(can_view(&task, &owner));
        assert!(can_edit(&task, &owner));
        assert!(can_delete(&task, &owner));
    }

    #[test]
    fn test_predicates_ignore_task_state() {
        // Status and completion never affect authorization
        let user = user_with_role(Role::User);
        let mut task = task_by(user.id);
        task.status = TaskStatus::Completed;
        task.completed_at = Some(Utc::now());

        assert!(can_view(&task, &user));
        assert!(can_edit(&task, &user));
        assert!(can_delete(&task, &user));
        assert!(can_change_status(&task, &user));
    }
}
