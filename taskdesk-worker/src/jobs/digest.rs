//! Daily digest job
//!
//! Emails each active user a summary of their open tasks, ordered by due
//! date. Users with no open tasks get nothing.

use sqlx::PgPool;
use std::fmt::Write as _;
use taskdesk_shared::models::task::Task;
use taskdesk_shared::models::user::User;
use tracing::{info, warn};

use crate::mailer::{Mailer, OutboundEmail};

/// Runs one digest pass and returns the number of digests sent
pub async fn run(pool: &PgPool, mailer: &dyn Mailer) -> anyhow::Result<usize> {
    let users = User::list_active(pool).await?;

    let mut sent = 0;
    for user in users {
        let open = Task::open_for_owner(pool, user.id).await?;
        if open.is_empty() {
            continue;
        }

        let email = digest_email(&user, &open);
        match mailer.send(email).await {
            Ok(()) => {
                sent += 1;
            }
            Err(err) => {
                warn!(user_id = %user.id, error = %err, "Digest delivery failed");
            }
        }
    }

    info!(sent, "Daily digest pass complete");
    Ok(sent)
}

fn digest_email(user: &User, open: &[Task]) -> OutboundEmail {
    let name = user.name.clone().unwrap_or_else(|| user.email.clone());
    let mut body = format!(
        "Hi {name},\n\nYou have {} open task{}:\n\n",
        open.len(),
        if open.len() == 1 { "" } else { "s" },
    );
    for task in open {
        let due = task
            .due_date
            .map(|d| format!("due {d}"))
            .unwrap_or_else(|| "no due date".to_string());
        let _ = writeln!(
            body,
            "- [{}] {} ({})",
            task.priority.as_str(),
            task.title,
            due
        );
    }

    OutboundEmail {
        to: user.email.clone(),
        subject: format!("Your daily task digest ({} open)", open.len()),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use taskdesk_shared::models::task::{TaskPriority, TaskStatus};
    use taskdesk_shared::models::user::{Role, User};
    use uuid::Uuid;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "owner@example.com".to_string(),
            password_hash: "hash".to_string(),
            name: Some("Owner".to_string()),
            role: Role::User,
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

    fn open_task(title: &str, due: Option<NaiveDate>) -> Task {
        let now = Utc::now();
        let creator = Uuid::new_v4();
        Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: TaskPriority::High,
            created_by: creator,
            assigned_to: None,
            owner_id: creator,
            due_date: due,
            reminder_sent_at: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            visible_to: vec![creator],
        }
    }

    #[test]
    fn test_digest_email_lists_every_task() {
        let user = sample_user();
        let tasks = vec![
            open_task("Ship release", NaiveDate::from_ymd_opt(2025, 3, 1)),
            open_task("Write docs", None),
        ];

        let email = digest_email(&user, &tasks);
        assert_eq!(email.to, "owner@example.com");
        assert!(email.subject.contains("2 open"));
        assert!(email.body.contains("Ship release"));
        assert!(email.body.contains("due 2025-03-01"));
        assert!(email.body.contains("Write docs"));
        assert!(email.body.contains("no due date"));
    }

    #[test]
    fn test_digest_email_singular_count() {
        let user = sample_user();
        let tasks = vec![open_task("Only one", None)];
        let email = digest_email(&user, &tasks);
        assert!(email.body.contains("1 open task:"));
    }
}
